//! QA/QC pipeline over the grouping store.
//!
//! `Pipeline` owns the store, the deployment index, the calculation flags
//! and the run report. Each stage computes new series with the pure
//! functions of the stage modules and then swaps the results into the
//! store, so a stage never observes a half-updated group.

use crate::config::QaqcConfig;
use crate::deployment::{DeploymentIndex, DeploymentRow};
use crate::error::QaqcError;
use crate::merge::merge_offset;
use crate::models::{
    GroupKey, OffsetMerge, ParsedName, Reading, Reconciliation, SourceSeries, Variant,
};
use crate::naming::{parse_file_name, parse_file_path};
use crate::reader::read_readings;
use crate::reconcile::reconcile_pair;
use crate::report::{CalculationSummary, IssueKind, RunReport};
use crate::store::{CalculationFlags, GroupingStore};
use crate::trim::trim_series;
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{debug, info};

/// Outcome counts of one pipeline stage
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageSummary {
    /// Series or groups the stage changed
    pub processed: usize,
    /// Series or groups the stage had to leave alone
    pub skipped: usize,
}

/// Summaries of the transformation stages in run order
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub trim: StageSummary,
    pub reconcile: StageSummary,
    pub merge: StageSummary,
}

/// Explicit pipeline state for one run
#[derive(Debug)]
pub struct Pipeline {
    config: QaqcConfig,
    store: GroupingStore,
    deployments: Option<DeploymentIndex>,
    flags: CalculationFlags,
    report: RunReport,
}

impl Pipeline {
    pub fn new(config: QaqcConfig) -> Self {
        Self {
            config,
            store: GroupingStore::new(),
            deployments: None,
            flags: CalculationFlags::default(),
            report: RunReport::new(),
        }
    }

    pub fn config(&self) -> &QaqcConfig {
        &self.config
    }

    pub fn store(&self) -> &GroupingStore {
        &self.store
    }

    pub fn flags(&self) -> &CalculationFlags {
        &self.flags
    }

    pub fn deployments(&self) -> Option<&DeploymentIndex> {
        self.deployments.as_ref()
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut RunReport {
        &mut self.report
    }

    /// Borrow the finished store and flags alongside the report
    pub fn export_parts(&mut self) -> (&GroupingStore, &CalculationFlags, &mut RunReport) {
        (&self.store, &self.flags, &mut self.report)
    }

    pub fn into_report(self) -> RunReport {
        self.report
    }

    /// Read one logger file and add it to the store.
    ///
    /// Returns whether the file was stored. Name, read and duplicate
    /// problems are recorded in the report and the file is skipped.
    pub fn ingest_file(&mut self, path: &Path) -> bool {
        let parsed = match parse_file_path(path) {
            Ok(parsed) => parsed,
            Err(e) => {
                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().to_string())
                    .unwrap_or_default();
                self.report.record_error(file_name, &e);
                return false;
            }
        };

        match read_readings(path, &self.config.columns, &self.config.reader) {
            Ok(readings) => self.store_series(parsed, readings),
            Err(e) => {
                self.report.record_error(parsed.source_name, &e);
                false
            }
        }
    }

    /// Add an already-read series under its file name
    pub fn ingest_readings(&mut self, file_name: &str, readings: Vec<Reading>) -> bool {
        match parse_file_name(file_name) {
            Ok(parsed) => self.store_series(parsed, readings),
            Err(e) => {
                self.report.record_error(file_name, &e);
                false
            }
        }
    }

    fn store_series(&mut self, parsed: ParsedName, readings: Vec<Reading>) -> bool {
        if !self.config.is_known_site(&parsed.key.site_code) {
            self.report.record(
                IssueKind::UnknownSiteCode,
                &parsed.source_name,
                format!("site code '{}' is not a known site", parsed.key.site_code),
            );
        }

        let series = SourceSeries::new(parsed.source_name.clone(), readings);
        let source_name = parsed.source_name.clone();
        debug!(
            "Ingesting {} as {} variant {} ({} readings)",
            source_name,
            parsed.key,
            parsed.variant,
            series.len()
        );

        match self.store.insert(parsed, series) {
            Ok(()) => {
                self.report.files_ingested += 1;
                true
            }
            Err(e) => {
                self.report.record_error(source_name, &e);
                false
            }
        }
    }

    /// Report groups that have no primary "a" series
    pub fn check_primary_variants(&mut self) -> StageSummary {
        let missing = self.store.missing_primary();
        for key in &missing {
            let tags = self
                .store
                .get(key)
                .map(|group| {
                    group
                        .variant_tags()
                        .iter()
                        .map(|v| v.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            self.report.record(
                IssueKind::MissingPrimary,
                key.to_string(),
                format!("has variants [{}] but no 'a' file; it will not be exported", tags),
            );
        }

        StageSummary {
            processed: self.store.len() - missing.len(),
            skipped: missing.len(),
        }
    }

    /// Build the deployment index for the ingested files
    pub fn attach_deployments(&mut self, rows: &[DeploymentRow]) -> StageSummary {
        let ingested: BTreeSet<String> = self.store.source_names().into_iter().collect();
        let (index, warnings) = DeploymentIndex::build(rows, &ingested);

        for warning in &warnings {
            self.report.record_error(warning_subject(warning), warning);
        }

        info!(
            "Attached {} deployment windows for {} ingested files",
            index.len(),
            ingested.len()
        );

        let summary = StageSummary {
            processed: index.len(),
            skipped: ingested.len().saturating_sub(index.len()),
        };
        self.deployments = Some(index);
        summary
    }

    /// Window-filter and edge-trim every stored series.
    ///
    /// A series without a usable deployment window is left untrimmed.
    pub fn trim_windows(&mut self) -> StageSummary {
        let mut summary = StageSummary::default();

        let Some(index) = self.deployments.as_ref() else {
            let count = self.store.series_count();
            self.report.record(
                IssueKind::Untrimmed,
                "deployment log",
                format!("no deployment index attached; {} series left untrimmed", count),
            );
            summary.skipped = count;
            return summary;
        };

        let mut updates: Vec<(GroupKey, Variant, Vec<Reading>)> = Vec::new();
        for (key, group) in self.store.iter() {
            for (variant, series) in group.variants() {
                match trim_series(&series.readings, &series.source_name, index, &self.config.trim) {
                    Ok(trimmed) => {
                        if trimmed.is_empty() {
                            self.report.record(
                                IssueKind::EmptySeries,
                                &series.source_name,
                                format!(
                                    "{} readings before trimming, none left after",
                                    series.len()
                                ),
                            );
                        }
                        updates.push((key.clone(), variant, trimmed));
                    }
                    Err(e) => {
                        self.report.record(
                            IssueKind::Untrimmed,
                            &series.source_name,
                            format!("left untrimmed: {}", e),
                        );
                        summary.skipped += 1;
                    }
                }
            }
        }

        for (key, variant, trimmed) in updates {
            if let Some(series) = self
                .store
                .get_mut(&key)
                .and_then(|group| group.get_mut(variant))
            {
                debug!(
                    "Trimmed {}: {} -> {} readings",
                    series.source_name,
                    series.len(),
                    trimmed.len()
                );
                series.readings = trimmed;
                summary.processed += 1;
            }
        }

        self.report.series_trimmed += summary.processed;
        info!(
            "Trimmed {} series, {} left untrimmed",
            summary.processed, summary.skipped
        );
        summary
    }

    /// Reconcile every a/b pair and flag groups that disagree
    pub fn reconcile_duplicates(&mut self) -> StageSummary {
        let mut summary = StageSummary::default();
        let mut updates: Vec<(GroupKey, Reconciliation)> = Vec::new();

        for (key, group) in self.store.iter() {
            let (Some(a), Some(b)) = (group.get(Variant::A), group.get(Variant::B)) else {
                continue;
            };

            let reconciliation =
                match reconcile_pair(key, &a.readings, &b.readings, &self.config.reconcile) {
                    Ok(reconciliation) => reconciliation,
                    Err(e) => {
                        self.report.record(
                            IssueKind::LengthMismatch,
                            key.to_string(),
                            format!("{}; pair left unreconciled", e),
                        );
                        summary.skipped += 1;
                        continue;
                    }
                };

            if let Some((len_a, len_b)) = reconciliation.truncated_from {
                self.report.record(
                    IssueKind::LengthMismatch,
                    key.to_string(),
                    format!(
                        "a has {} readings and b has {}; reconciled the first {}",
                        len_a,
                        len_b,
                        reconciliation.rows.len()
                    ),
                );
            }

            if reconciliation.misaligned > 0 {
                self.report.record(
                    IssueKind::MisalignedTimestamps,
                    key.to_string(),
                    format!(
                        "{} of {} positions have different a/b timestamps",
                        reconciliation.misaligned,
                        reconciliation.rows.len()
                    ),
                );
            }

            if reconciliation.is_flagged() {
                self.flags.record(key.clone(), a.source_name.clone());
                self.report.calculations.push(CalculationSummary {
                    key: key.clone(),
                    source_name: a.source_name.clone(),
                    flagged_samples: reconciliation.flagged_count(),
                    total_samples: reconciliation.rows.len(),
                });
            }

            updates.push((key.clone(), reconciliation));
        }

        for (key, reconciliation) in updates {
            let Some(group) = self.store.get_mut(&key) else {
                continue;
            };
            if let Some(primary) = group.get_mut(Variant::A) {
                primary.readings = reconciliation.reconciled_readings();
            }
            group.set_reconciliation(reconciliation);
            if self.config.retention.drop_duplicate_sources {
                group.remove(Variant::B);
            }
            summary.processed += 1;
        }

        self.report.pairs_reconciled += summary.processed;
        info!(
            "Reconciled {} duplicate pairs, {} flagged for calculation",
            summary.processed,
            self.flags.len()
        );
        summary
    }

    /// Outer-join every c/d pair on timestamp
    pub fn merge_offsets(&mut self) -> StageSummary {
        let mut summary = StageSummary::default();
        let mut updates: Vec<(GroupKey, OffsetMerge)> = Vec::new();

        for (key, group) in self.store.iter() {
            match (group.get(Variant::C), group.get(Variant::D)) {
                (Some(c), Some(d)) => {
                    let merge = merge_offset(&c.readings, &d.readings);
                    if merge.duplicate_timestamps > 0 {
                        self.report.record(
                            IssueKind::DuplicateTimestamps,
                            key.to_string(),
                            format!(
                                "{} repeated timestamps dropped while merging c and d",
                                merge.duplicate_timestamps
                            ),
                        );
                    }
                    updates.push((key.clone(), merge));
                }
                (Some(_), None) | (None, Some(_)) => {
                    debug!("{} has only one offset logger; nothing to merge", key);
                    summary.skipped += 1;
                }
                (None, None) => {}
            }
        }

        for (key, merge) in updates {
            let Some(group) = self.store.get_mut(&key) else {
                continue;
            };
            debug!("Merged offset loggers for {}: {} rows", key, merge.rows.len());
            group.set_offset_merge(merge);
            if self.config.retention.drop_offset_sources {
                group.remove(Variant::C);
                group.remove(Variant::D);
            }
            summary.processed += 1;
        }

        self.report.offsets_merged += summary.processed;
        info!("Merged {} offset logger pairs", summary.processed);
        summary
    }

    /// Trim, reconcile and merge in order
    pub fn run_stages(&mut self) -> PipelineSummary {
        let trim = self.trim_windows();
        let reconcile = self.reconcile_duplicates();
        let merge = self.merge_offsets();
        PipelineSummary {
            trim,
            reconcile,
            merge,
        }
    }
}

fn warning_subject(error: &QaqcError) -> String {
    match error {
        QaqcError::UnmatchedDeployment { file_name }
        | QaqcError::AmbiguousTime { file_name, .. }
        | QaqcError::DuplicateDeployment { file_name }
        | QaqcError::InvalidDeploymentTime { file_name, .. } => file_name.clone(),
        _ => "deployment log".to_string(),
    }
}
