//! Error handling for logger QA/QC operations.
//!
//! Provides error types with context for file naming, deployment log
//! resolution, duplicate reconciliation and CSV I/O failures. Most
//! variants are reported as non-fatal issues by the pipeline; only I/O,
//! configuration and unreadable inputs abort a run.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QaqcError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Input not found at path: {path}")]
    InputNotFound { path: PathBuf },

    #[error("Malformed file name '{name}': {reason}")]
    MalformedName { name: String, reason: String },

    #[error("No deployment record for file '{file_name}'")]
    UnmatchedDeployment { file_name: String },

    #[error("Ambiguous deployment time for '{file_name}': time in '{time_in}', time out '{time_out}'")]
    AmbiguousTime {
        file_name: String,
        time_in: String,
        time_out: String,
    },

    #[error("Deployment log lists '{file_name}' more than once; keeping the first usable row")]
    DuplicateDeployment { file_name: String },

    #[error("Invalid deployment window for '{file_name}': {reason}")]
    InvalidDeploymentTime { file_name: String, reason: String },

    #[error("Series length mismatch for {site_code} {file_number}: a has {len_a} readings, b has {len_b}")]
    LengthMismatch {
        site_code: String,
        file_number: String,
        len_a: usize,
        len_b: usize,
    },

    #[error("Duplicate variant '{variant}' for {site_code} {file_number}; ignoring '{file_name}'")]
    DuplicateVariant {
        site_code: String,
        file_number: String,
        variant: String,
        file_name: String,
    },

    #[error("Invalid timestamp '{value}' in file: {path} (row {row})")]
    InvalidTimestamp {
        path: PathBuf,
        row: usize,
        value: String,
    },

    #[error("Missing column '{column}' in file: {path}")]
    MissingColumn { path: PathBuf, column: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl QaqcError {
    /// Create a malformed name error
    pub fn malformed_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedName {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, QaqcError>;
