//! Application constants for the logger QA/QC processor
//!
//! Default policy values, column names, output naming pieces and the
//! site-code registry used throughout the pipeline.

// =============================================================================
// Reconciliation and Trimming Policy
// =============================================================================

/// Maximum acceptable absolute difference between duplicate loggers (°C)
pub const DEFAULT_TOLERANCE: f64 = 0.2;

/// Precision used when comparing a difference against the tolerance
pub const DIFFERENCE_ROUNDING: f64 = 1e9;

/// Samples dropped from the start of a window-filtered series
pub const DEFAULT_LEADING_TRIM: usize = 4;

/// Samples dropped from the end of a window-filtered series
pub const DEFAULT_TRAILING_TRIM: usize = 5;

// =============================================================================
// Input Columns
// =============================================================================

/// Sequence index column written by HOBOware
pub const INDEX_COLUMN: &str = "#";

/// Default timestamp column of HOBO exports
pub const TIMESTAMP_COLUMN: &str = "Date Time, GMT-04:00";

/// Default temperature column of HOBO exports
pub const TEMPERATURE_COLUMN: &str = "Temp, °C";

/// Header prefixes used when the configured column name is absent
pub const TIMESTAMP_COLUMN_PREFIX: &str = "Date Time";
pub const TEMPERATURE_COLUMN_PREFIX: &str = "Temp";

/// Deployment log columns
pub mod deployment_columns {
    pub const OFFLOADED_FILENAME: &str = "Offloaded Filename";
    pub const DATE_IN: &str = "Date In";
    pub const TIME_IN: &str = "Time In";
    pub const DATE_FULL: &str = "Date Full";
    pub const DATE_OUT: &str = "Date Out";
    pub const TIME_OUT: &str = "Time Out";

    /// Columns that must be present in the log
    pub const REQUIRED: &[&str] = &[OFFLOADED_FILENAME, DATE_IN, TIME_IN, DATE_OUT, TIME_OUT];
}

/// Placeholder technicians enter when a time was not recorded
pub const UNKNOWN_TIME_PLACEHOLDER: char = '?';

// =============================================================================
// Timestamp Formats
// =============================================================================

/// Logger timestamp formats, tried in order
pub const READING_TIMESTAMP_FORMATS: &[&str] = &[
    "%m/%d/%y %H:%M:%S",
    "%m/%d/%y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%y %H:%M",
    "%m/%d/%Y %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Deployment log date formats, tried in order
pub const DEPLOYMENT_DATE_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%Y-%m-%d"];

/// Deployment log time formats, tried in order
pub const DEPLOYMENT_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M"];

/// Timestamp format of exported files
pub const EXPORT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Year/month stamp used in output file names
pub const FILE_NAME_DATE_FORMAT: &str = "%y%m";

// =============================================================================
// Output Layout
// =============================================================================

/// Prefix of cleaned output files
pub const OUTPUT_PREFIX: &str = "BT";

/// Prefix of provisional duplicate calculation files
pub const PROVISIONAL_PREFIX: &str = "PD";

/// Prefix an operator adds to an approved provisional file
pub const APPROVED_PREFIX: &str = "OK_";

pub const PROVISIONAL_DUPLICATES_DIR: &str = "Provisional Duplicates";
pub const INTERNAL_CALCULATIONS_DIR: &str = "internal_calculations";
pub const OFFSET_MERGES_DIR: &str = "offset_merges";

pub const INTERNAL_CALCULATIONS_SUFFIX: &str = "_internal_calculations";
pub const MERGED_SUFFIX: &str = "_merged";

/// Calculation-file columns
pub mod calculation_columns {
    pub const TEMP_A: &str = "Temp A";
    pub const TEMP_B: &str = "Temp B";
    pub const DIFFERENCE: &str = "Temperature_Difference";
    pub const AVERAGE: &str = "Average_temp";
    pub const FLAG: &str = "Flag";

    /// Name the average column takes in a finalized file
    pub const FINAL_TEMPERATURE: &str = "Temperature";
}

// =============================================================================
// Site Registry
// =============================================================================

/// TCRMP temperature monitoring site codes
pub const KNOWN_SITE_CODES: &[&str] = &[
    "TCCORB", "TCFSHB", "TCMERI", "TCBKPT", "TCBOTB", "TCBRWB", "TCBKIT", "TCCORK", "TCCLGE",
    "TCFLTC", "TCGB63", "TCGMKT", "TCHB40", "TCHB30", "TCHB20", "TCMAGB", "TCSAVA", "TCSHCS",
    "TCSCAP", "TCSC35", "TCSWAT", "TCLSTJ", "TCBKIX", "TCBX33", "TCCB08", "TCCB40", "TCCB99",
    "TCCB67", "TCCSTL", "TCEAGR", "TCGRPD", "TCJCKB", "TCKNGC", "TCLBEM", "TCLB99", "TCLB67",
    "TCLBRH", "TCMT24", "TCMT40", "TCSR30", "TCSR99", "TCSR41", "TCSR67", "TCSR10", "TCSPTH",
];
