//! Command implementations for the logger QA/QC CLI
//!
//! Contains logging setup and the execution logic of the `process` and
//! `finalize` subcommands.

use crate::cli::args::{Commands, FinalizeArgs, ProcessArgs, base_config};
use crate::processor::QaqcProcessor;
use crate::processor::finalize::Finalizer;
use crate::report::RunReport;
use anyhow::{Context, Result};
use tracing::{debug, info};

/// Run a parsed subcommand to completion
pub async fn run(command: Commands) -> Result<RunReport> {
    match command {
        Commands::Process(args) => run_process(args).await,
        Commands::Finalize(args) => run_finalize(args).await,
    }
}

async fn run_process(args: ProcessArgs) -> Result<RunReport> {
    setup_logging(args.get_log_level())?;
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let config = args.to_config().context("Failed to load configuration")?;

    let processor = QaqcProcessor::new(
        args.input_path.clone(),
        args.deployment_log.clone(),
        args.output_path.clone(),
    )?
    .with_config(config);

    let report = processor
        .process()
        .await
        .with_context(|| format!("Processing {} failed", args.input_path.display()))?;

    report.print_summary();
    info!(
        "Finished: {} files written, {} warnings",
        report.written.len(),
        report.issues().len()
    );
    Ok(report)
}

async fn run_finalize(args: FinalizeArgs) -> Result<RunReport> {
    setup_logging(args.get_log_level())?;
    debug!("Command line arguments: {:?}", args);

    let config = base_config(args.config_file.as_ref()).context("Failed to load configuration")?;
    let finalizer = Finalizer::new(args.input_path.clone(), args.output_path.clone())?
        .with_config(config);

    let report = finalizer
        .finalize()
        .await
        .with_context(|| format!("Finalizing {} failed", args.input_path.display()))?;

    report.print_summary();
    Ok(report)
}

/// Set up structured logging to stderr
fn setup_logging(log_level: &str) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("logger_qaqc={}", log_level)));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_timer(fmt::time::uptime())
                .with_writer(std::io::stderr),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}
