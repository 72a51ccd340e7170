//! Deployment log loading and window resolution.
//!
//! The deployment log is maintained by hand, one row per offloaded file.
//! Dates and times are entered separately and occasionally carry a `?`
//! where a technician did not record the time; such rows are kept
//! unresolved rather than coerced.

use crate::constants::{
    DEPLOYMENT_DATE_FORMATS, DEPLOYMENT_TIME_FORMATS, UNKNOWN_TIME_PLACEHOLDER, deployment_columns,
};
use crate::error::{QaqcError, Result};
use crate::reader::{read_text_frame, text_column};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, warn};

/// Raw deployment log row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentRow {
    pub offloaded_filename: String,
    pub date_in: String,
    pub time_in: String,
    pub date_full: String,
    pub date_out: String,
    pub time_out: String,
}

/// Resolved deployment interval for one offloaded file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub date_full: String,
}

impl DeploymentWindow {
    /// Inclusive on both bounds
    pub fn contains(&self, timestamp: &NaiveDateTime) -> bool {
        self.start <= *timestamp && *timestamp <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Unresolved {
    Ambiguous { time_in: String, time_out: String },
    Invalid { reason: String },
}

/// Deployment windows keyed by offloaded file name
#[derive(Debug, Clone, Default)]
pub struct DeploymentIndex {
    windows: BTreeMap<String, DeploymentWindow>,
    unresolved: BTreeMap<String, Unresolved>,
}

impl DeploymentIndex {
    /// Build the index for the ingested file names.
    ///
    /// Log rows for files that were not ingested are dropped. The returned
    /// warnings cover ambiguous and invalid rows, duplicate rows, and
    /// ingested files that have no row at all.
    pub fn build(
        rows: &[DeploymentRow],
        ingested: &BTreeSet<String>,
    ) -> (Self, Vec<QaqcError>) {
        let mut index = Self::default();
        let mut warnings = Vec::new();
        let mut seen = BTreeSet::new();

        for row in rows {
            let name = row.offloaded_filename.trim();
            if !ingested.contains(name) {
                continue;
            }
            let repeated = !seen.insert(name.to_string());

            match resolve_row(row) {
                Ok(window) => {
                    if index.windows.contains_key(name) {
                        warnings.push(QaqcError::DuplicateDeployment {
                            file_name: name.to_string(),
                        });
                        continue;
                    }
                    if repeated {
                        warnings.push(QaqcError::DuplicateDeployment {
                            file_name: name.to_string(),
                        });
                    }
                    index.unresolved.remove(name);
                    index.windows.insert(name.to_string(), window);
                }
                Err(reason) => {
                    if repeated {
                        warnings.push(QaqcError::DuplicateDeployment {
                            file_name: name.to_string(),
                        });
                    }
                    if index.windows.contains_key(name) {
                        continue;
                    }
                    warnings.push(unresolved_error(name, &reason));
                    index.unresolved.insert(name.to_string(), reason);
                }
            }
        }

        for name in ingested {
            if !seen.contains(name) {
                warnings.push(QaqcError::UnmatchedDeployment {
                    file_name: name.clone(),
                });
            }
        }

        debug!(
            "Deployment index: {} resolved, {} unresolved, {} warnings",
            index.windows.len(),
            index.unresolved.len(),
            warnings.len()
        );

        (index, warnings)
    }

    /// Window for an offloaded file name
    pub fn lookup(&self, file_name: &str) -> Result<&DeploymentWindow> {
        if let Some(window) = self.windows.get(file_name) {
            return Ok(window);
        }
        match self.unresolved.get(file_name) {
            Some(reason) => Err(unresolved_error(file_name, reason)),
            None => Err(QaqcError::UnmatchedDeployment {
                file_name: file_name.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }

    pub fn unresolved_count(&self) -> usize {
        self.unresolved.len()
    }
}

/// Read the deployment log CSV
pub fn read_deployment_log(path: &Path) -> Result<Vec<DeploymentRow>> {
    let df = read_text_frame(path, 0)?;

    let names = df.get_column_names();
    let missing: Vec<&str> = deployment_columns::REQUIRED
        .iter()
        .copied()
        .filter(|required| !names.iter().any(|name| name.as_str() == *required))
        .collect();
    if !missing.is_empty() {
        return Err(QaqcError::MissingColumn {
            path: path.to_path_buf(),
            column: missing.join(", "),
        });
    }

    let filenames = text_column(&df, deployment_columns::OFFLOADED_FILENAME, path)?;
    let dates_in = text_column(&df, deployment_columns::DATE_IN, path)?;
    let times_in = text_column(&df, deployment_columns::TIME_IN, path)?;
    let dates_out = text_column(&df, deployment_columns::DATE_OUT, path)?;
    let times_out = text_column(&df, deployment_columns::TIME_OUT, path)?;
    let dates_full = df
        .column(deployment_columns::DATE_FULL)
        .ok()
        .and_then(|column| column.str().ok());

    let cell = |value: Option<&str>| value.map(|s| s.trim().to_string()).unwrap_or_default();

    let mut rows = Vec::with_capacity(df.height());
    for row in 0..df.height() {
        let offloaded_filename = cell(filenames.get(row));
        if offloaded_filename.is_empty() {
            continue;
        }
        rows.push(DeploymentRow {
            offloaded_filename,
            date_in: cell(dates_in.get(row)),
            time_in: cell(times_in.get(row)),
            date_full: cell(dates_full.and_then(|ca| ca.get(row))),
            date_out: cell(dates_out.get(row)),
            time_out: cell(times_out.get(row)),
        });
    }

    if rows.is_empty() {
        warn!("Deployment log {} has no usable rows", path.display());
    }

    debug!("Read {} deployment log rows from {}", rows.len(), path.display());
    Ok(rows)
}

fn resolve_row(row: &DeploymentRow) -> std::result::Result<DeploymentWindow, Unresolved> {
    if row.time_in.contains(UNKNOWN_TIME_PLACEHOLDER)
        || row.time_out.contains(UNKNOWN_TIME_PLACEHOLDER)
    {
        return Err(Unresolved::Ambiguous {
            time_in: row.time_in.clone(),
            time_out: row.time_out.clone(),
        });
    }

    let start = combine(&row.date_in, &row.time_in)
        .map_err(|reason| Unresolved::Invalid { reason: format!("start {}", reason) })?;
    let end = combine(&row.date_out, &row.time_out)
        .map_err(|reason| Unresolved::Invalid { reason: format!("end {}", reason) })?;

    if end < start {
        return Err(Unresolved::Invalid {
            reason: format!("end {} precedes start {}", end, start),
        });
    }

    Ok(DeploymentWindow {
        start,
        end,
        date_full: row.date_full.clone(),
    })
}

fn combine(date: &str, time: &str) -> std::result::Result<NaiveDateTime, String> {
    let parsed_date = parse_date(date).ok_or_else(|| format!("date '{}' is not m/d/y", date))?;
    let parsed_time =
        parse_time(time).ok_or_else(|| format!("time '{}' is not hh:mm:ss", time))?;
    Ok(parsed_date.and_time(parsed_time))
}

/// Parse a month/day/year log date
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DEPLOYMENT_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse a 24-hour log time
pub fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    DEPLOYMENT_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(value, format).ok())
}

fn unresolved_error(file_name: &str, reason: &Unresolved) -> QaqcError {
    match reason {
        Unresolved::Ambiguous { time_in, time_out } => QaqcError::AmbiguousTime {
            file_name: file_name.to_string(),
            time_in: time_in.clone(),
            time_out: time_out.clone(),
        },
        Unresolved::Invalid { reason } => QaqcError::InvalidDeploymentTime {
            file_name: file_name.to_string(),
            reason: reason.clone(),
        },
    }
}
