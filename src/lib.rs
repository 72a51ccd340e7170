//! Logger QA/QC Library
//!
//! A Rust library for cleaning HOBO-style temperature logger exports before
//! they are published.
//!
//! This library provides tools for:
//! - Parsing reading-file names into site, file number and variant
//! - Resolving deployment windows from a hand-maintained deployment log
//! - Trimming each series to its window and dropping disturbed edge samples
//! - Reconciling duplicate loggers within a tolerance, with audit rows
//! - Merging loggers with offset start times on timestamp
//! - Writing cleaned, calculation and merge files, and finalizing approved calculations

pub mod cli;
pub mod config;
pub mod constants;
pub mod deployment;
pub mod error;
pub mod merge;
pub mod models;
pub mod naming;
pub mod pipeline;
pub mod processor;
pub mod reader;
pub mod reconcile;
pub mod report;
pub mod store;
pub mod trim;

pub use config::QaqcConfig;
pub use error::{QaqcError, Result};
pub use models::{GroupKey, Reading, Variant};
pub use pipeline::Pipeline;
pub use processor::QaqcProcessor;
pub use report::RunReport;
