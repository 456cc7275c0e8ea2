pub mod catalog;
pub mod cli;
mod commands;
pub mod config;
pub mod failure;
pub mod inference;
pub mod orchestrator;
pub mod prompt_engine;
pub mod request;

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub fn run() -> ExitCode {
    // Load environment variables from .env file
    let _ = dotenvy::dotenv();

    let cli = cli::Cli::parse();
    init_tracing(cli.verbose);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to start async runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::dispatch(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("{}", message);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
