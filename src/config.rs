//! Configuration management and validation.
//!
//! Provides configuration structures for trimming, reconciliation,
//! source retention, column naming and output layout. Configuration can
//! be loaded from a TOML file and is then overridden by CLI arguments.

use crate::constants::{
    DEFAULT_LEADING_TRIM, DEFAULT_TOLERANCE, DEFAULT_TRAILING_TRIM, INDEX_COLUMN,
    INTERNAL_CALCULATIONS_DIR, KNOWN_SITE_CODES, OFFSET_MERGES_DIR, PROVISIONAL_DUPLICATES_DIR,
    TEMPERATURE_COLUMN, TIMESTAMP_COLUMN,
};
use crate::error::{QaqcError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Edge trimming applied after window filtering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrimPolicy {
    /// Drop leading/trailing samples disturbed by handling
    pub edge_trim: bool,
    pub leading: usize,
    pub trailing: usize,
}

impl Default for TrimPolicy {
    fn default() -> Self {
        Self {
            edge_trim: true,
            leading: DEFAULT_LEADING_TRIM,
            trailing: DEFAULT_TRAILING_TRIM,
        }
    }
}

/// What to do when a duplicate pair has different lengths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LengthPolicy {
    /// Reconcile the common prefix and report the mismatch
    Truncate,
    /// Report the mismatch and leave the pair unreconciled
    Skip,
}

/// Duplicate reconciliation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcilePolicy {
    pub tolerance: f64,
    pub length_policy: LengthPolicy,
}

impl Default for ReconcilePolicy {
    fn default() -> Self {
        Self {
            tolerance: DEFAULT_TOLERANCE,
            length_policy: LengthPolicy::Truncate,
        }
    }
}

/// Whether source series survive the stages that consume them
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    /// Remove the b series once a/b reconciliation has run
    pub drop_duplicate_sources: bool,
    /// Remove the c and d series once they have been merged
    pub drop_offset_sources: bool,
}

/// Column names of reading files and exports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnConfig {
    pub index: String,
    pub timestamp: String,
    pub temperature: String,
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            index: INDEX_COLUMN.to_string(),
            timestamp: TIMESTAMP_COLUMN.to_string(),
            temperature: TEMPERATURE_COLUMN.to_string(),
        }
    }
}

/// Reading-file CSV options
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// Lines before the header row (HOBOware "Plot Title" line)
    pub skip_rows: usize,
}

/// Sub-directories of the output directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputLayout {
    pub provisional_duplicates_dir: String,
    pub internal_calculations_dir: String,
    pub offset_merges_dir: String,
    /// Export c/d outer joins for manual inspection
    pub export_offset_merges: bool,
}

impl Default for OutputLayout {
    fn default() -> Self {
        Self {
            provisional_duplicates_dir: PROVISIONAL_DUPLICATES_DIR.to_string(),
            internal_calculations_dir: INTERNAL_CALCULATIONS_DIR.to_string(),
            offset_merges_dir: OFFSET_MERGES_DIR.to_string(),
            export_offset_merges: true,
        }
    }
}

/// Global configuration for logger QA/QC processing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaqcConfig {
    pub trim: TrimPolicy,
    pub reconcile: ReconcilePolicy,
    pub retention: RetentionPolicy,
    pub columns: ColumnConfig,
    pub reader: ReaderConfig,
    pub output: OutputLayout,

    /// Site codes expected in file names (empty disables the check)
    pub known_sites: Vec<String>,

    /// Plan outputs without writing files
    pub dry_run: bool,
}

impl Default for QaqcConfig {
    fn default() -> Self {
        Self {
            trim: TrimPolicy::default(),
            reconcile: ReconcilePolicy::default(),
            retention: RetentionPolicy::default(),
            columns: ColumnConfig::default(),
            reader: ReaderConfig::default(),
            output: OutputLayout::default(),
            known_sites: KNOWN_SITE_CODES.iter().map(|s| s.to_string()).collect(),
            dry_run: false,
        }
    }
}

impl QaqcConfig {
    /// Load configuration from a TOML file, filling unset fields with defaults
    pub fn from_toml_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(QaqcError::InputNotFound {
                path: path.to_path_buf(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let config: QaqcConfig = toml::from_str(&contents).map_err(|e| {
            QaqcError::configuration(format!("{}: {}", path.display(), e))
        })?;

        debug!("Loaded configuration from {}", path.display());
        config.validate()?;
        Ok(config)
    }

    /// Set the reconciliation tolerance
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.reconcile.tolerance = tolerance;
        self
    }

    /// Set the edge trim counts
    pub fn with_edge_trim(mut self, leading: usize, trailing: usize) -> Self {
        self.trim.leading = leading;
        self.trim.trailing = trailing;
        self
    }

    /// Disable edge trimming
    pub fn without_edge_trim(mut self) -> Self {
        self.trim.edge_trim = false;
        self
    }

    /// Set the length mismatch policy
    pub fn with_length_policy(mut self, policy: LengthPolicy) -> Self {
        self.reconcile.length_policy = policy;
        self
    }

    /// Configure source retention
    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    /// Replace the known site list
    pub fn with_known_sites(mut self, sites: Vec<String>) -> Self {
        self.known_sites = sites;
        self
    }

    /// Enable dry-run mode
    pub fn with_dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Whether a site code passes the known-site check
    pub fn is_known_site(&self, site_code: &str) -> bool {
        self.known_sites.is_empty() || self.known_sites.iter().any(|s| s == site_code)
    }

    pub fn validate(&self) -> Result<()> {
        let tolerance = self.reconcile.tolerance;
        if !tolerance.is_finite() || tolerance < 0.0 {
            return Err(QaqcError::configuration(format!(
                "tolerance must be a non-negative number, got {}",
                tolerance
            )));
        }

        if self.trim.leading.checked_add(self.trim.trailing).is_none() {
            return Err(QaqcError::configuration(format!(
                "edge trim counts {} + {} overflow",
                self.trim.leading, self.trim.trailing
            )));
        }

        let columns = [
            ("index", &self.columns.index),
            ("timestamp", &self.columns.timestamp),
            ("temperature", &self.columns.temperature),
        ];
        for (label, name) in columns {
            if name.trim().is_empty() {
                return Err(QaqcError::configuration(format!(
                    "{} column name must not be empty",
                    label
                )));
            }
        }

        Ok(())
    }
}
