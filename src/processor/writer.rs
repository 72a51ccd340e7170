//! Output writing module for cleaned logger series
//!
//! Plans export file names from each group's first and last timestamps and
//! writes cleaned series, calculation audits and offset merges as CSV via
//! polars.

use crate::config::{ColumnConfig, QaqcConfig};
use crate::constants::{
    FILE_NAME_DATE_FORMAT, INTERNAL_CALCULATIONS_SUFFIX, MERGED_SUFFIX, OUTPUT_PREFIX,
    PROVISIONAL_PREFIX, calculation_columns,
};
use crate::error::Result;
use crate::models::{GroupKey, OffsetMerge, Reading, Reconciliation};
use crate::reader::{format_timestamp, write_frame};
use crate::report::{IssueKind, RunReport};
use crate::store::{CalculationFlags, GroupingStore};

use chrono::NaiveDateTime;
use polars::prelude::{Column, DataFrame};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};

/// Kind of file produced for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    /// Final series of an unflagged group
    Cleaned,
    /// Reconciled series of a flagged group, kept for internal use
    InternalCalculation,
    /// Audit rows of a flagged group awaiting operator approval
    ProvisionalDuplicate,
    /// Outer join of offset loggers
    OffsetMerge,
}

/// One planned output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedExport {
    pub key: GroupKey,
    pub kind: ExportKind,
    pub path: PathBuf,
}

/// CSV writer for processed groups
#[derive(Debug)]
pub struct OutputWriter {
    output_path: PathBuf,
    config: QaqcConfig,
}

impl OutputWriter {
    /// Create a new output writer
    pub fn new(output_path: PathBuf, config: QaqcConfig) -> Self {
        Self {
            output_path,
            config,
        }
    }

    /// Decide which files every group produces.
    ///
    /// Groups without a primary series, or whose primary series is empty,
    /// produce no cleaned file and are reported.
    pub fn plan(
        &self,
        store: &GroupingStore,
        flags: &CalculationFlags,
        report: &mut RunReport,
    ) -> Vec<PlannedExport> {
        let layout = &self.config.output;
        let mut planned = Vec::new();
        let mut used_names = BTreeSet::new();
        let mut used_merge_names = BTreeSet::new();

        for (key, group) in store.iter() {
            match group.primary() {
                Some(primary) => match series_span(&primary.readings) {
                    Some((first, last)) => {
                        let base = unique_name(
                            &mut used_names,
                            export_base_name(&key.site_code, &first, &last),
                            key,
                        );

                        if flags.contains(key) {
                            planned.push(PlannedExport {
                                key: key.clone(),
                                kind: ExportKind::InternalCalculation,
                                path: self
                                    .output_path
                                    .join(&layout.internal_calculations_dir)
                                    .join(format!("{}{}.csv", base, INTERNAL_CALCULATIONS_SUFFIX)),
                            });
                            planned.push(PlannedExport {
                                key: key.clone(),
                                kind: ExportKind::ProvisionalDuplicate,
                                path: self
                                    .output_path
                                    .join(&layout.provisional_duplicates_dir)
                                    .join(format!("{}_{}.csv", PROVISIONAL_PREFIX, base)),
                            });
                        } else {
                            planned.push(PlannedExport {
                                key: key.clone(),
                                kind: ExportKind::Cleaned,
                                path: self.output_path.join(format!("{}.csv", base)),
                            });
                        }
                    }
                    None => report.record(
                        IssueKind::ExportSkipped,
                        &primary.source_name,
                        "primary series is empty after processing",
                    ),
                },
                None => debug!("{} has no primary series; not exported", key),
            }

            if layout.export_offset_merges {
                if let Some((first, last)) = group.offset_merge().and_then(OffsetMerge::time_span) {
                    let base = unique_name(
                        &mut used_merge_names,
                        export_base_name(&key.site_code, &first, &last),
                        key,
                    );
                    planned.push(PlannedExport {
                        key: key.clone(),
                        kind: ExportKind::OffsetMerge,
                        path: self
                            .output_path
                            .join(&layout.offset_merges_dir)
                            .join(format!("{}{}.csv", base, MERGED_SUFFIX)),
                    });
                }
            }
        }

        planned
    }

    /// Write every planned file and return the written paths.
    ///
    /// In dry-run mode the planned paths are returned without touching the
    /// filesystem.
    pub async fn write_outputs(
        &self,
        store: &GroupingStore,
        flags: &CalculationFlags,
        report: &mut RunReport,
    ) -> Result<Vec<PathBuf>> {
        let planned = self.plan(store, flags, report);

        if self.config.dry_run {
            for export in &planned {
                info!("Dry run: would write {}", export.path.display());
            }
            return Ok(planned.into_iter().map(|export| export.path).collect());
        }

        let mut written = Vec::with_capacity(planned.len());
        for export in planned {
            let Some(group) = store.get(&export.key) else {
                continue;
            };

            let frame = match export.kind {
                ExportKind::Cleaned | ExportKind::InternalCalculation => group
                    .primary()
                    .map(|series| readings_frame(&series.readings, &self.config.columns)),
                ExportKind::ProvisionalDuplicate => group
                    .reconciliation()
                    .map(|rec| calculation_frame(rec, &self.config.columns)),
                ExportKind::OffsetMerge => group
                    .offset_merge()
                    .map(|merge| offset_frame(merge, &self.config.columns)),
            };
            let Some(frame) = frame else {
                warn!("{}: nothing to write for {:?}", export.key, export.kind);
                continue;
            };
            let mut df = frame?;

            if let Some(parent) = export.path.parent() {
                fs::create_dir_all(parent).await?;
            }
            write_frame(&mut df, &export.path)?;
            debug!("Wrote {} rows to {}", df.height(), export.path.display());
            written.push(export.path);
        }

        Ok(written)
    }
}

/// `BT_<SITE>_<YYMM first>_<YYMM last>`
pub fn export_base_name(site_code: &str, first: &NaiveDateTime, last: &NaiveDateTime) -> String {
    format!(
        "{}_{}_{}_{}",
        OUTPUT_PREFIX,
        site_code,
        first.format(FILE_NAME_DATE_FORMAT),
        last.format(FILE_NAME_DATE_FORMAT)
    )
}

// Two deployments of one site can span the same months
fn unique_name(used: &mut BTreeSet<String>, base: String, key: &GroupKey) -> String {
    if used.insert(base.clone()) {
        return base;
    }
    let disambiguated = format!("{}_{}", base, key.file_number);
    warn!(
        "Export name {} already used; writing {} as {}",
        base, key, disambiguated
    );
    used.insert(disambiguated.clone());
    disambiguated
}

fn series_span(readings: &[Reading]) -> Option<(NaiveDateTime, NaiveDateTime)> {
    Some((readings.first()?.timestamp, readings.last()?.timestamp))
}

/// Frame with index, timestamp and temperature columns
pub fn readings_frame(readings: &[Reading], columns: &ColumnConfig) -> Result<DataFrame> {
    let indices: Vec<i64> = readings.iter().map(|r| r.index).collect();
    let timestamps: Vec<String> = readings.iter().map(|r| format_timestamp(&r.timestamp)).collect();
    let values: Vec<Option<f64>> = readings.iter().map(|r| r.value).collect();

    Ok(DataFrame::new(vec![
        Column::new(columns.index.as_str().into(), indices),
        Column::new(columns.timestamp.as_str().into(), timestamps),
        Column::new(columns.temperature.as_str().into(), values),
    ])?)
}

/// Audit frame of a duplicate reconciliation
pub fn calculation_frame(reconciliation: &Reconciliation, columns: &ColumnConfig) -> Result<DataFrame> {
    let rows = &reconciliation.rows;
    let indices: Vec<i64> = rows.iter().map(|r| r.index).collect();
    let timestamps: Vec<String> = rows.iter().map(|r| format_timestamp(&r.timestamp)).collect();
    let temp_a: Vec<Option<f64>> = rows.iter().map(|r| r.temp_a).collect();
    let temp_b: Vec<Option<f64>> = rows.iter().map(|r| r.temp_b).collect();
    let differences: Vec<Option<f64>> = rows.iter().map(|r| r.difference).collect();
    let means: Vec<Option<f64>> = rows.iter().map(|r| r.mean).collect();
    let flags: Vec<bool> = rows.iter().map(|r| r.flag).collect();

    Ok(DataFrame::new(vec![
        Column::new(columns.index.as_str().into(), indices),
        Column::new(columns.timestamp.as_str().into(), timestamps),
        Column::new(calculation_columns::TEMP_A.into(), temp_a),
        Column::new(calculation_columns::TEMP_B.into(), temp_b),
        Column::new(calculation_columns::DIFFERENCE.into(), differences),
        Column::new(calculation_columns::AVERAGE.into(), means),
        Column::new(calculation_columns::FLAG.into(), flags),
    ])?)
}

/// Side-by-side frame of an offset merge
pub fn offset_frame(merge: &OffsetMerge, columns: &ColumnConfig) -> Result<DataFrame> {
    let rows = &merge.rows;
    let timestamps: Vec<String> = rows.iter().map(|r| format_timestamp(&r.timestamp)).collect();
    let index_c: Vec<Option<i64>> = rows.iter().map(|r| r.index_c).collect();
    let temp_c: Vec<Option<f64>> = rows.iter().map(|r| r.temp_c).collect();
    let index_d: Vec<Option<i64>> = rows.iter().map(|r| r.index_d).collect();
    let temp_d: Vec<Option<f64>> = rows.iter().map(|r| r.temp_d).collect();

    let suffixed = |name: &str, side: &str| format!("{}_{}", name, side);

    Ok(DataFrame::new(vec![
        Column::new(columns.timestamp.as_str().into(), timestamps),
        Column::new(suffixed(&columns.index, "c").into(), index_c),
        Column::new(suffixed(&columns.temperature, "c").into(), temp_c),
        Column::new(suffixed(&columns.index, "d").into(), index_d),
        Column::new(suffixed(&columns.temperature, "d").into(), temp_d),
    ])?)
}

/// Output directory used when none is given
pub fn default_output_path(input_path: &Path) -> PathBuf {
    input_path.join("processed")
}
