//! Run report and operator summary.
//!
//! Every non-fatal problem met during a run is recorded as an `Issue`
//! under a category, logged as a warning, and listed again in the final
//! summary so the operator can fix inputs before re-running.

use crate::error::QaqcError;
use crate::models::GroupKey;
use colored::*;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use tracing::warn;

/// Category of a reported issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IssueKind {
    MalformedName,
    DuplicateVariant,
    UnknownSiteCode,
    UnreadableFile,
    MissingPrimary,
    UnmatchedDeployment,
    AmbiguousTime,
    InvalidDeploymentTime,
    DuplicateDeployment,
    Untrimmed,
    EmptySeries,
    LengthMismatch,
    MisalignedTimestamps,
    DuplicateTimestamps,
    ExportSkipped,
}

impl IssueKind {
    /// Category for an error surfaced by a pipeline stage
    pub fn from_error(error: &QaqcError) -> Self {
        match error {
            QaqcError::MalformedName { .. } => IssueKind::MalformedName,
            QaqcError::DuplicateVariant { .. } => IssueKind::DuplicateVariant,
            QaqcError::UnmatchedDeployment { .. } => IssueKind::UnmatchedDeployment,
            QaqcError::AmbiguousTime { .. } => IssueKind::AmbiguousTime,
            QaqcError::InvalidDeploymentTime { .. } => IssueKind::InvalidDeploymentTime,
            QaqcError::DuplicateDeployment { .. } => IssueKind::DuplicateDeployment,
            QaqcError::LengthMismatch { .. } => IssueKind::LengthMismatch,
            QaqcError::Io(_)
            | QaqcError::Polars(_)
            | QaqcError::InputNotFound { .. }
            | QaqcError::InvalidTimestamp { .. }
            | QaqcError::MissingColumn { .. }
            | QaqcError::Configuration { .. } => IssueKind::UnreadableFile,
        }
    }

    /// What the operator should do about this category
    pub fn hint(&self) -> &'static str {
        match self {
            IssueKind::MalformedName => "rename to <prefix>_<SITE>_<FILENUMBER>[_a|b|c|d].csv",
            IssueKind::DuplicateVariant => "later file ignored; remove or retag the duplicate",
            IssueKind::UnknownSiteCode => "add the site code to the metadata and known_sites",
            IssueKind::UnreadableFile => "check the export columns and timestamp format",
            IssueKind::MissingPrimary => "no 'a' file; rename the remaining file to _a",
            IssueKind::UnmatchedDeployment => "fix the Offloaded Filename in the deployment log",
            IssueKind::AmbiguousTime => "replace '?' times in the deployment log",
            IssueKind::InvalidDeploymentTime => "correct the dates/times in the deployment log",
            IssueKind::DuplicateDeployment => "remove repeated rows from the deployment log",
            IssueKind::Untrimmed => "series exported without window trimming",
            IssueKind::EmptySeries => "no readings left inside the deployment window",
            IssueKind::LengthMismatch => "duplicate loggers recorded different sample counts",
            IssueKind::MisalignedTimestamps => "duplicate loggers were not launched in sync",
            IssueKind::DuplicateTimestamps => "offset logger repeats timestamps",
            IssueKind::ExportSkipped => "group not exported",
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            IssueKind::MalformedName => "Malformed file names",
            IssueKind::DuplicateVariant => "Duplicate variants",
            IssueKind::UnknownSiteCode => "Unknown site codes",
            IssueKind::UnreadableFile => "Unreadable files",
            IssueKind::MissingPrimary => "Groups without an 'a' file",
            IssueKind::UnmatchedDeployment => "Files missing from the deployment log",
            IssueKind::AmbiguousTime => "Ambiguous deployment times",
            IssueKind::InvalidDeploymentTime => "Invalid deployment windows",
            IssueKind::DuplicateDeployment => "Repeated deployment log rows",
            IssueKind::Untrimmed => "Untrimmed series",
            IssueKind::EmptySeries => "Empty series",
            IssueKind::LengthMismatch => "Duplicate length mismatches",
            IssueKind::MisalignedTimestamps => "Misaligned duplicate timestamps",
            IssueKind::DuplicateTimestamps => "Repeated offset timestamps",
            IssueKind::ExportSkipped => "Skipped exports",
        };
        f.write_str(label)
    }
}

/// One reported problem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    /// File name or group the issue concerns
    pub subject: String,
    pub message: String,
}

/// Group flagged for manual calculation review
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalculationSummary {
    pub key: GroupKey,
    pub source_name: String,
    pub flagged_samples: usize,
    pub total_samples: usize,
}

/// Counters and issues collected across a run
#[derive(Debug, Default)]
pub struct RunReport {
    pub files_discovered: usize,
    pub files_ingested: usize,
    pub series_trimmed: usize,
    pub pairs_reconciled: usize,
    pub offsets_merged: usize,
    pub calculations: Vec<CalculationSummary>,
    pub written: Vec<PathBuf>,
    pub processing_time_ms: u128,
    issues: Vec<Issue>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and log an issue
    pub fn record(
        &mut self,
        kind: IssueKind,
        subject: impl Into<String>,
        message: impl Into<String>,
    ) {
        let issue = Issue {
            kind,
            subject: subject.into(),
            message: message.into(),
        };
        warn!("{}: {}", issue.subject, issue.message);
        self.issues.push(issue);
    }

    /// Record an error as a non-fatal issue
    pub fn record_error(&mut self, subject: impl Into<String>, error: &QaqcError) {
        self.record(IssueKind::from_error(error), subject, error.to_string());
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |issue| issue.kind == kind)
    }

    pub fn count(&self, kind: IssueKind) -> usize {
        self.issues_of(kind).count()
    }

    pub fn has_issues(&self) -> bool {
        !self.issues.is_empty()
    }

    /// Print the end-of-run summary to stdout
    pub fn print_summary(&self) {
        println!("\n{}", "Processing Summary".bright_green().bold());
        println!(
            "  {} {}ms",
            "Time elapsed:".bright_cyan(),
            self.processing_time_ms.to_string().bright_white()
        );
        println!(
            "  {} {} of {}",
            "Files ingested:".bright_cyan(),
            self.files_ingested.to_string().bright_white().bold(),
            self.files_discovered
        );
        println!(
            "  {} {}",
            "Series trimmed:".bright_cyan(),
            self.series_trimmed.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Duplicate pairs reconciled:".bright_cyan(),
            self.pairs_reconciled.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Offset pairs merged:".bright_cyan(),
            self.offsets_merged.to_string().bright_white()
        );
        println!(
            "  {} {}",
            "Files written:".bright_cyan(),
            self.written.len().to_string().bright_white().bold()
        );

        if !self.calculations.is_empty() {
            println!(
                "\n{}",
                "Files that need to be labeled as calculations:"
                    .bright_yellow()
                    .bold()
            );
            for calc in &self.calculations {
                println!(
                    "  {} {} ({}): {} of {} samples differ by more than tolerance",
                    calc.key.site_code.bright_white(),
                    calc.key.file_number.bright_white(),
                    calc.source_name,
                    calc.flagged_samples.to_string().bright_red().bold(),
                    calc.total_samples
                );
            }
        }

        if self.issues.is_empty() {
            println!("\n{}", "No warnings".bright_green());
            return;
        }

        let mut by_kind: BTreeMap<IssueKind, Vec<&Issue>> = BTreeMap::new();
        for issue in &self.issues {
            by_kind.entry(issue.kind).or_default().push(issue);
        }

        println!(
            "\n{} {}",
            "Warnings:".bright_red().bold(),
            self.issues.len().to_string().bright_red().bold()
        );
        for (kind, issues) in by_kind {
            println!(
                "  {} ({}) {}",
                kind.to_string().bright_yellow(),
                issues.len(),
                format!("- {}", kind.hint()).bright_black()
            );
            for issue in issues {
                println!("    {} {}", issue.subject.bright_white(), issue.message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_error_maps_kind() {
        let mut report = RunReport::new();
        report.record_error(
            "BT_TCSR41_2210_b",
            &QaqcError::UnmatchedDeployment {
                file_name: "BT_TCSR41_2210_b".to_string(),
            },
        );
        report.record(IssueKind::MissingPrimary, "TFLTC 2310", "no 'a' file");

        assert!(report.has_issues());
        assert_eq!(report.count(IssueKind::UnmatchedDeployment), 1);
        assert_eq!(report.count(IssueKind::MissingPrimary), 1);
        assert_eq!(report.count(IssueKind::AmbiguousTime), 0);
        assert_eq!(report.issues()[0].subject, "BT_TCSR41_2210_b");
    }

    #[test]
    fn test_io_errors_are_unreadable_files() {
        let error = QaqcError::MissingColumn {
            path: PathBuf::from("x.csv"),
            column: "#".to_string(),
        };
        assert_eq!(IssueKind::from_error(&error), IssueKind::UnreadableFile);
    }

    #[test]
    fn test_print_summary_does_not_panic() {
        let mut report = RunReport::new();
        report.calculations.push(CalculationSummary {
            key: GroupKey::new("TCSR41", "2210"),
            source_name: "BT_TCSR41_2210".to_string(),
            flagged_samples: 3,
            total_samples: 100,
        });
        report.record(IssueKind::EmptySeries, "BT_X_1", "empty");
        report.print_summary();
    }
}
