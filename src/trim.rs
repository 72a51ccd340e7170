//! Deployment-window filtering and edge trimming.
//!
//! A series is first cut to its logged deployment window (inclusive),
//! then a fixed number of samples is dropped from each end to remove
//! readings disturbed while the logger was handled.

use crate::config::TrimPolicy;
use crate::deployment::{DeploymentIndex, DeploymentWindow};
use crate::error::Result;
use crate::models::Reading;

/// Keep readings inside the deployment window
pub fn filter_window(readings: &[Reading], window: &DeploymentWindow) -> Vec<Reading> {
    readings
        .iter()
        .filter(|reading| window.contains(&reading.timestamp))
        .cloned()
        .collect()
}

/// Drop the leading and trailing edge samples.
///
/// A series no longer than `leading + trailing` trims to nothing.
pub fn trim_edges(readings: Vec<Reading>, policy: &TrimPolicy) -> Vec<Reading> {
    if !policy.edge_trim {
        return readings;
    }

    let total = readings.len();
    if total <= policy.leading.saturating_add(policy.trailing) {
        return Vec::new();
    }

    readings
        .into_iter()
        .skip(policy.leading)
        .take(total - policy.leading - policy.trailing)
        .collect()
}

/// Window-filter then edge-trim the series of one source file
pub fn trim_series(
    readings: &[Reading],
    source_name: &str,
    index: &DeploymentIndex,
    policy: &TrimPolicy,
) -> Result<Vec<Reading>> {
    let window = index.lookup(source_name)?;
    Ok(trim_edges(filter_window(readings, window), policy))
}
