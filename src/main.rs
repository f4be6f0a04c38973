//! Ferrule CLI - semantic checker for the Ferrule systems language

use clap::Parser;
use ferrule::cli::Cli;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> miette::Result<ExitCode> {
    // FERRULE_LOG=debug (or any EnvFilter directive) turns on tracing
    if let Ok(filter) = EnvFilter::try_from_env("FERRULE_LOG") {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    }

    let cli = Cli::parse();
    let clean = cli.run()?;

    Ok(if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
