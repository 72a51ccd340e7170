//! Main processing engine for logger QA/QC runs.
//!
//! Orchestrates the complete workflow: file discovery, ingestion into the
//! pipeline, deployment-window trimming, duplicate reconciliation, offset
//! merging and output writing.

pub mod discovery;
pub mod finalize;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::{discovery::FileDiscovery, writer::OutputWriter};

use crate::config::QaqcConfig;
use crate::deployment::read_deployment_log;
use crate::error::{QaqcError, Result};
use crate::pipeline::Pipeline;
use crate::report::RunReport;

use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tokio::fs;
use tracing::info;

/// Main processor for a directory of logger exports
#[derive(Debug)]
pub struct QaqcProcessor {
    input_path: PathBuf,
    deployment_log: PathBuf,
    output_path: PathBuf,
    config: QaqcConfig,
}

impl QaqcProcessor {
    /// Create a new processor
    pub fn new(
        input_path: PathBuf,
        deployment_log: PathBuf,
        output_path: Option<PathBuf>,
    ) -> Result<Self> {
        if !input_path.is_dir() {
            return Err(QaqcError::InputNotFound { path: input_path });
        }
        if !deployment_log.is_file() {
            return Err(QaqcError::InputNotFound {
                path: deployment_log,
            });
        }

        let output_path = output_path.unwrap_or_else(|| writer::default_output_path(&input_path));

        Ok(Self {
            input_path,
            deployment_log,
            output_path,
            config: QaqcConfig::default(),
        })
    }

    /// Configure the processor
    pub fn with_config(mut self, config: QaqcConfig) -> Self {
        self.config = config;
        self
    }

    pub fn output_path(&self) -> &PathBuf {
        &self.output_path
    }

    /// Main processing entry point
    pub async fn process(&self) -> Result<RunReport> {
        let start_time = Instant::now();
        self.config.validate()?;

        println!("{}", "Starting logger QA/QC processing".bright_green().bold());
        println!("  {} {}", "Input:".bright_cyan(), self.input_path.display());
        println!(
            "  {} {}",
            "Deployment log:".bright_cyan(),
            self.deployment_log.display()
        );
        println!("  {} {}", "Output:".bright_cyan(), self.output_path.display());
        if self.config.dry_run {
            println!("  {}", "Dry run - no files will be written".bright_yellow());
        }

        // Step 1: Discover reading files
        println!("\n{}", "Discovering CSV files...".bright_yellow());
        let mut discovery = FileDiscovery::new(self.input_path.clone())
            .with_excluded(self.deployment_log.clone());
        let csv_files = discovery.discover_csv_files().await?;
        println!(
            "  {} {} CSV files from {} sites",
            "Found".bright_green(),
            csv_files.len().to_string().bright_white().bold(),
            discovery.site_count().to_string().bright_white().bold()
        );

        // The log is required even when there is nothing to trim
        let deployment_rows = read_deployment_log(&self.deployment_log)?;

        let mut pipeline = Pipeline::new(self.config.clone());
        pipeline.report_mut().files_discovered = csv_files.len();

        if csv_files.is_empty() {
            let mut report = pipeline.into_report();
            report.processing_time_ms = start_time.elapsed().as_millis();
            return Ok(report);
        }

        // Step 2: Ingest
        println!("\n{}", "Reading files...".bright_yellow());
        let progress_bar = ProgressBar::new(csv_files.len() as u64);
        progress_bar.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        for path in &csv_files {
            if let Some(name) = path.file_name() {
                progress_bar.set_message(name.to_string_lossy().to_string());
            }
            pipeline.ingest_file(path);
            progress_bar.inc(1);
        }
        progress_bar.finish_and_clear();

        // Step 3: Structure checks and deployment windows
        pipeline.check_primary_variants();
        let attached = pipeline.attach_deployments(&deployment_rows);
        println!(
            "  {} {} deployment windows ({} files without one)",
            "Matched".bright_green(),
            attached.processed.to_string().bright_white().bold(),
            attached.skipped
        );

        // Step 4: Transformation stages
        println!("\n{}", "Processing groups...".bright_yellow());
        let summary = pipeline.run_stages();
        info!(
            "Stages complete: trimmed {}, reconciled {}, merged {}",
            summary.trim.processed, summary.reconcile.processed, summary.merge.processed
        );

        // Step 5: Write outputs
        if !self.config.dry_run {
            fs::create_dir_all(&self.output_path).await?;
        }
        let writer = OutputWriter::new(self.output_path.clone(), self.config.clone());
        let (store, flags, report) = pipeline.export_parts();
        let written = writer.write_outputs(store, flags, report).await?;

        let mut report = pipeline.into_report();
        report.written = written;
        report.processing_time_ms = start_time.elapsed().as_millis();
        Ok(report)
    }
}
