//! Core data structures and types for logger QA/QC processing.
//!
//! Defines variant tags, group keys, reading series and the derived
//! reconciliation and offset-merge records used throughout the library.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sub-file tag of a deployment episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Primary logger (also assigned when the name carries no tag)
    A,
    /// Duplicate of the primary logger at the same site and time
    B,
    /// First of two loggers with offset start times
    C,
    /// Second of two loggers with offset start times
    D,
}

impl Variant {
    /// Every tag a file name may carry
    pub const ALL: [Variant; 4] = [Variant::A, Variant::B, Variant::C, Variant::D];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::A => "a",
            Variant::B => "b",
            Variant::C => "c",
            Variant::D => "d",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "a" => Ok(Variant::A),
            "b" => Ok(Variant::B),
            "c" => Ok(Variant::C),
            "d" => Ok(Variant::D),
            other => Err(format!("unknown variant '{}'", other)),
        }
    }
}

/// Identifies one physical deployment episode
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GroupKey {
    pub site_code: String,
    pub file_number: String,
}

impl GroupKey {
    pub fn new(site_code: impl Into<String>, file_number: impl Into<String>) -> Self {
        Self {
            site_code: site_code.into(),
            file_number: file_number.into(),
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.site_code, self.file_number)
    }
}

/// Fields extracted from a reading-file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedName {
    pub prefix: String,
    pub key: GroupKey,
    pub variant: Variant,
    /// File name without extension, as it appears in the deployment log
    pub source_name: String,
}

/// A single timestamped temperature sample
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub index: i64,
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
}

impl Reading {
    pub fn new(index: i64, timestamp: NaiveDateTime, value: Option<f64>) -> Self {
        Self {
            index,
            timestamp,
            value,
        }
    }
}

/// A reading series together with the file it came from
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSeries {
    pub source_name: String,
    pub readings: Vec<Reading>,
}

impl SourceSeries {
    pub fn new(source_name: impl Into<String>, readings: Vec<Reading>) -> Self {
        Self {
            source_name: source_name.into(),
            readings,
        }
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// First and last timestamp of the series
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.readings.first()?;
        let last = self.readings.last()?;
        Some((first.timestamp, last.timestamp))
    }
}

/// One audited position of an a/b reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciledRow {
    pub index: i64,
    pub timestamp: NaiveDateTime,
    pub temp_a: Option<f64>,
    pub temp_b: Option<f64>,
    pub difference: Option<f64>,
    /// Raw mean of the two readings regardless of tolerance
    pub mean: Option<f64>,
    /// Mean when within tolerance, missing otherwise
    pub value: Option<f64>,
    pub flag: bool,
}

/// Result of reconciling a duplicate logger pair
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    pub rows: Vec<ReconciledRow>,
    /// Original (a, b) lengths when the pair was truncated to a common prefix
    pub truncated_from: Option<(usize, usize)>,
    /// Positions where the a and b timestamps disagree
    pub misaligned: usize,
}

impl Reconciliation {
    pub fn flagged_count(&self) -> usize {
        self.rows.iter().filter(|row| row.flag).count()
    }

    pub fn is_flagged(&self) -> bool {
        self.rows.iter().any(|row| row.flag)
    }

    /// Reconciled series carrying the a-side index and timestamp
    pub fn reconciled_readings(&self) -> Vec<Reading> {
        self.rows
            .iter()
            .map(|row| Reading::new(row.index, row.timestamp, row.value))
            .collect()
    }
}

/// One row of a c/d outer join
#[derive(Debug, Clone, PartialEq)]
pub struct OffsetRow {
    pub timestamp: NaiveDateTime,
    pub index_c: Option<i64>,
    pub temp_c: Option<f64>,
    pub index_d: Option<i64>,
    pub temp_d: Option<f64>,
}

/// Result of merging two offset logger series on timestamp
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OffsetMerge {
    pub rows: Vec<OffsetRow>,
    /// Repeated timestamps within one input that were dropped
    pub duplicate_timestamps: usize,
}

impl OffsetMerge {
    pub fn time_span(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        let first = self.rows.first()?;
        let last = self.rows.last()?;
        Some((first.timestamp, last.timestamp))
    }
}
