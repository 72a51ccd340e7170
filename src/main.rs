use clap::{CommandFactory, Parser};
use logger_qaqc::cli::{args::Args, commands};
use std::process;

fn main() {
    let args = Args::parse();

    // Without a subcommand, show help
    let Some(command) = args.command else {
        let _ = Args::command().print_help();
        println!();
        process::exit(0);
    };

    let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
        eprintln!("Failed to create async runtime: {}", e);
        process::exit(1);
    });

    match runtime.block_on(commands::run(command)) {
        Ok(_report) => {
            // Warnings have already been reported in the summary
            process::exit(0);
        }
        Err(error) => {
            eprintln!("Error: {:#}", error);
            process::exit(1);
        }
    }
}
