//! Finalization of operator-approved calculation files
//!
//! After review, an operator renames an accepted provisional duplicate
//! file with an `OK_` prefix. Finalizing keeps its index, timestamp and
//! average columns and writes it as a cleaned file.

use crate::config::QaqcConfig;
use crate::constants::{APPROVED_PREFIX, TIMESTAMP_COLUMN_PREFIX, calculation_columns};
use crate::error::{QaqcError, Result};
use crate::reader::{read_text_frame, resolve_column, write_frame};
use crate::report::{IssueKind, RunReport};

use colored::*;
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tracing::{debug, info};

/// Converts approved provisional files into final files
#[derive(Debug)]
pub struct Finalizer {
    input_path: PathBuf,
    output_path: PathBuf,
    config: QaqcConfig,
}

impl Finalizer {
    pub fn new(input_path: PathBuf, output_path: PathBuf) -> Result<Self> {
        if !input_path.is_dir() {
            return Err(QaqcError::InputNotFound { path: input_path });
        }
        Ok(Self {
            input_path,
            output_path,
            config: QaqcConfig::default(),
        })
    }

    pub fn with_config(mut self, config: QaqcConfig) -> Self {
        self.config = config;
        self
    }

    /// Approved files in the review directory, sorted by name
    pub fn approved_files(&self) -> Result<Vec<PathBuf>> {
        let pattern = self.input_path.join(format!("{}*.csv", APPROVED_PREFIX));
        let pattern = pattern.to_string_lossy();

        let mut files = Vec::new();
        for entry in glob::glob(&pattern)
            .map_err(|e| QaqcError::configuration(format!("glob '{}': {}", pattern, e)))?
        {
            files.push(entry.map_err(|e| QaqcError::Io(e.into_error()))?);
        }
        files.sort();
        Ok(files)
    }

    /// Finalize every approved file.
    ///
    /// Files missing a required column are reported and skipped.
    pub async fn finalize(&self) -> Result<RunReport> {
        let start_time = Instant::now();
        let mut report = RunReport::new();

        println!("{}", "Finalizing approved calculations".bright_green().bold());
        println!("  {} {}", "Review:".bright_cyan(), self.input_path.display());
        println!("  {} {}", "Output:".bright_cyan(), self.output_path.display());

        let files = self.approved_files()?;
        report.files_discovered = files.len();
        println!(
            "  {} {} approved files",
            "Found".bright_green(),
            files.len().to_string().bright_white().bold()
        );

        if !files.is_empty() && !self.config.dry_run {
            fs::create_dir_all(&self.output_path).await?;
        }

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            let target = self.output_path.join(final_file_name(&file_name));

            let mut df = match self.final_frame(&path) {
                Ok(df) => df,
                Err(e) => {
                    report.record(IssueKind::UnreadableFile, &file_name, format!("skipped: {}", e));
                    continue;
                }
            };
            report.files_ingested += 1;

            if self.config.dry_run {
                info!("Dry run: would write {}", target.display());
            } else {
                write_frame(&mut df, &target)?;
                debug!("Finalized {} -> {}", path.display(), target.display());
            }
            report.written.push(target);
        }

        report.processing_time_ms = start_time.elapsed().as_millis();
        Ok(report)
    }

    fn final_frame(&self, path: &Path) -> Result<DataFrame> {
        let df = read_text_frame(path, 0)?;
        let columns = &self.config.columns;
        let missing = |column: &str| QaqcError::MissingColumn {
            path: path.to_path_buf(),
            column: column.to_string(),
        };

        let index = resolve_column(&df, &columns.index, None).ok_or_else(|| missing(&columns.index))?;
        let timestamp = resolve_column(&df, &columns.timestamp, Some(TIMESTAMP_COLUMN_PREFIX))
            .ok_or_else(|| missing(&columns.timestamp))?;
        let average = resolve_column(&df, calculation_columns::AVERAGE, None)
            .ok_or_else(|| missing(calculation_columns::AVERAGE))?;

        let mut selected = df.select([index.as_str(), timestamp.as_str(), average.as_str()])?;
        selected.rename(&average, calculation_columns::FINAL_TEMPERATURE.into())?;
        Ok(selected)
    }
}

/// Name of the finalized file for an approved file name
pub fn final_file_name(file_name: &str) -> &str {
    file_name.strip_prefix(APPROVED_PREFIX).unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs as std_fs;
    use tempfile::TempDir;

    const APPROVED: &str = "#,\"Date Time, GMT-04:00\",Temp A,Temp B,Temperature_Difference,Average_temp,Flag\n\
                            1,2024-01-02 00:00:00,10.0,10.1,0.1,10.05,false\n\
                            2,2024-01-02 01:00:00,10.0,12.0,2.0,11.0,true\n";

    #[test]
    fn test_final_file_name() {
        assert_eq!(final_file_name("OK_PD_BT_TCSR41_2210_2304.csv"), "PD_BT_TCSR41_2210_2304.csv");
        assert_eq!(final_file_name("PD_BT_X.csv"), "PD_BT_X.csv");
    }

    #[tokio::test]
    async fn test_finalize_approved_files() {
        let review = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std_fs::write(review.path().join("OK_PD_BT_TCSR41_2210_2304.csv"), APPROVED).unwrap();
        std_fs::write(review.path().join("PD_BT_TCSR41_2304_2310.csv"), APPROVED).unwrap();

        let finalizer =
            Finalizer::new(review.path().to_path_buf(), output.path().to_path_buf()).unwrap();
        let report = finalizer.finalize().await.unwrap();

        assert_eq!(report.files_discovered, 1);
        let target = output.path().join("PD_BT_TCSR41_2210_2304.csv");
        assert_eq!(report.written, vec![target.clone()]);

        let contents = std_fs::read_to_string(&target).unwrap();
        let header = contents.lines().next().unwrap();
        assert_eq!(header, "#,\"Date Time, GMT-04:00\",Temperature");
        assert!(contents.contains("10.05"));
        assert!(!contents.contains("Temp A"));
    }

    #[tokio::test]
    async fn test_finalize_skips_file_without_average() {
        let review = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        std_fs::write(
            review.path().join("OK_broken.csv"),
            "#,\"Date Time, GMT-04:00\",Temp A\n1,2024-01-02 00:00:00,10.0\n",
        )
        .unwrap();

        let finalizer =
            Finalizer::new(review.path().to_path_buf(), output.path().to_path_buf()).unwrap();
        let report = finalizer.finalize().await.unwrap();

        assert!(report.written.is_empty());
        assert_eq!(report.count(IssueKind::UnreadableFile), 1);
    }

    #[test]
    fn test_missing_review_directory() {
        let result = Finalizer::new(PathBuf::from("/nonexistent/review"), PathBuf::from("/tmp"));
        assert!(matches!(result, Err(QaqcError::InputNotFound { .. })));
    }
}
