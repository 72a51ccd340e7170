//! Command-line argument definitions for the logger QA/QC processor
//!
//! Defines the `process` and `finalize` subcommands using the clap derive
//! API, and layers their overrides onto a loaded configuration.

use crate::config::{LengthPolicy, QaqcConfig};
use crate::error::{QaqcError, Result};
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the logger QA/QC processor
///
/// Cleans HOBO temperature logger exports: trims them to their deployment
/// windows, reconciles duplicate loggers and merges offset loggers.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "logger_qaqc",
    version,
    about = "QA/QC pipeline for HOBO temperature logger exports"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Clean a directory of logger exports
    Process(ProcessArgs),
    /// Convert approved provisional duplicate files into final files
    Finalize(FinalizeArgs),
}

/// Arguments for the process command
#[derive(Debug, Clone, Parser)]
pub struct ProcessArgs {
    /// Directory containing the logger CSV exports
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_path: PathBuf,

    /// Deployment log CSV
    #[arg(short = 'l', long = "deployment-log", value_name = "CSV")]
    pub deployment_log: PathBuf,

    /// Output directory (defaults to <input>/processed)
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_path: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    pub config_file: Option<PathBuf>,

    /// Maximum accepted difference between duplicate loggers
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Samples dropped from the start of each window
    #[arg(long)]
    pub leading: Option<usize>,

    /// Samples dropped from the end of each window
    #[arg(long)]
    pub trailing: Option<usize>,

    /// Keep the disturbed edge samples of each window
    #[arg(long, conflicts_with_all = ["leading", "trailing"])]
    pub no_edge_trim: bool,

    /// Handling of duplicate pairs with different lengths
    #[arg(long, value_enum)]
    pub length_policy: Option<LengthPolicy>,

    /// Remove b series after reconciliation
    #[arg(long)]
    pub drop_duplicate_sources: bool,

    /// Remove c and d series after merging
    #[arg(long)]
    pub drop_offset_sources: bool,

    /// Plan outputs without writing files
    #[arg(long)]
    pub dry_run: bool,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Arguments for the finalize command
#[derive(Debug, Clone, Parser)]
pub struct FinalizeArgs {
    /// Directory containing OK_-prefixed approved files
    #[arg(short = 'i', long = "input", value_name = "DIR")]
    pub input_path: PathBuf,

    /// Directory for finalized files
    #[arg(short = 'o', long = "output", value_name = "DIR")]
    pub output_path: PathBuf,

    /// TOML configuration file
    #[arg(short = 'c', long = "config", value_name = "TOML")]
    pub config_file: Option<PathBuf>,

    /// Increase logging verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Map verbosity flags to a log level
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Load the configuration file if one is given, else the defaults
pub fn base_config(config_file: Option<&PathBuf>) -> Result<QaqcConfig> {
    match config_file {
        Some(path) => QaqcConfig::from_toml_file(path),
        None => Ok(QaqcConfig::default()),
    }
}

impl ProcessArgs {
    /// Validate the process command arguments for consistency
    pub fn validate(&self) -> Result<()> {
        if !self.input_path.is_dir() {
            return Err(QaqcError::configuration(format!(
                "Input path is not a directory: {}",
                self.input_path.display()
            )));
        }

        if !self.deployment_log.is_file() {
            return Err(QaqcError::configuration(format!(
                "Deployment log does not exist: {}",
                self.deployment_log.display()
            )));
        }

        if let Some(tolerance) = self.tolerance {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(QaqcError::configuration(format!(
                    "Tolerance must be a non-negative number, got {}",
                    tolerance
                )));
            }
        }

        Ok(())
    }

    /// Configuration file layered under the command-line overrides
    pub fn to_config(&self) -> Result<QaqcConfig> {
        let mut config = base_config(self.config_file.as_ref())?;

        if let Some(tolerance) = self.tolerance {
            config = config.with_tolerance(tolerance);
        }
        if let Some(leading) = self.leading {
            config.trim.leading = leading;
        }
        if let Some(trailing) = self.trailing {
            config.trim.trailing = trailing;
        }
        if self.no_edge_trim {
            config = config.without_edge_trim();
        }
        if let Some(policy) = self.length_policy {
            config = config.with_length_policy(policy);
        }
        if self.drop_duplicate_sources {
            config.retention.drop_duplicate_sources = true;
        }
        if self.drop_offset_sources {
            config.retention.drop_offset_sources = true;
        }
        if self.dry_run {
            config = config.with_dry_run();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn get_log_level(&self) -> &'static str {
        log_level(self.verbose, self.quiet)
    }
}

impl FinalizeArgs {
    pub fn get_log_level(&self) -> &'static str {
        log_level(self.verbose, self.quiet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn process_args(temp_dir: &TempDir) -> ProcessArgs {
        let log = temp_dir.path().join("log.csv");
        fs::write(&log, "Offloaded Filename\n").unwrap();
        ProcessArgs {
            input_path: temp_dir.path().to_path_buf(),
            deployment_log: log,
            output_path: None,
            config_file: None,
            tolerance: None,
            leading: None,
            trailing: None,
            no_edge_trim: false,
            length_policy: None,
            drop_duplicate_sources: false,
            drop_offset_sources: false,
            dry_run: false,
            verbose: 0,
            quiet: false,
        }
    }

    #[test]
    fn test_parse_process_command() {
        let args = Args::try_parse_from([
            "logger_qaqc",
            "process",
            "--input",
            "exports",
            "--deployment-log",
            "log.csv",
            "--tolerance",
            "0.3",
            "--length-policy",
            "skip",
            "--drop-offset-sources",
            "-vv",
        ])
        .unwrap();

        match args.command {
            Some(Commands::Process(process)) => {
                assert_eq!(process.input_path, PathBuf::from("exports"));
                assert_eq!(process.tolerance, Some(0.3));
                assert_eq!(process.length_policy, Some(LengthPolicy::Skip));
                assert!(process.drop_offset_sources);
                assert_eq!(process.get_log_level(), "trace");
            }
            other => panic!("Expected process command, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_finalize_command() {
        let args =
            Args::try_parse_from(["logger_qaqc", "finalize", "-i", "review", "-o", "final"]).unwrap();
        assert!(matches!(args.command, Some(Commands::Finalize(_))));
    }

    #[test]
    fn test_overrides_layer_on_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let mut args = process_args(&temp_dir);
        args.tolerance = Some(0.5);
        args.leading = Some(0);
        args.drop_duplicate_sources = true;
        args.dry_run = true;

        assert!(args.validate().is_ok());
        let config = args.to_config().unwrap();

        assert_eq!(config.reconcile.tolerance, 0.5);
        assert_eq!(config.trim.leading, 0);
        assert_eq!(config.trim.trailing, 5);
        assert!(config.retention.drop_duplicate_sources);
        assert!(!config.retention.drop_offset_sources);
        assert!(config.dry_run);
        assert!(config.trim.edge_trim);

        let mut args = process_args(&temp_dir);
        args.no_edge_trim = true;
        assert!(!args.to_config().unwrap().trim.edge_trim);
    }

    #[test]
    fn test_validation_errors() {
        let temp_dir = TempDir::new().unwrap();

        let mut args = process_args(&temp_dir);
        args.tolerance = Some(-0.2);
        assert!(args.validate().is_err());

        let mut args = process_args(&temp_dir);
        args.deployment_log = temp_dir.path().join("missing.csv");
        assert!(args.validate().is_err());

        let mut args = process_args(&temp_dir);
        args.leading = Some(usize::MAX);
        args.trailing = Some(1);
        assert!(args.to_config().is_err());
    }

    #[test]
    fn test_log_level() {
        assert_eq!(log_level(0, false), "info");
        assert_eq!(log_level(1, false), "debug");
        assert_eq!(log_level(3, false), "trace");
        assert_eq!(log_level(2, true), "warn");
    }
}
