//! Command-line interface for the Ferrule checker
//!
//! The parser is a separate tool; `ferrule check` reads the programs it
//! produced as JSON and reports what the checker finds.

mod check_cmd;

use clap::{Parser, Subcommand};
use miette::{Diagnostic, NamedSource, SourceSpan};
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigError;

/// Ferrule - semantic checker for the Ferrule systems language
#[derive(Parser, Debug)]
#[command(name = "ferrule")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output diagnostics as JSON lines
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check parsed programs for type and memory errors
    Check {
        /// Program files (JSON AST) to check
        #[arg(required = true, value_name = "PROGRAM")]
        programs: Vec<PathBuf>,

        /// Configuration file (defaults to ferrule.toml next to the first program)
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Disable leak reports
        #[arg(long)]
        no_check_mem: bool,

        /// Treat warnings as errors
        #[arg(long)]
        strict: bool,
    },
}

/// Failures of the tool itself, as opposed to findings in the program
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("could not read {path}")]
    #[diagnostic(code(ferrule::io))]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a valid program: {message}")]
    #[diagnostic(
        code(ferrule::program),
        help("the file must hold a JSON `Program` with a `modules` list")
    )]
    InvalidProgram {
        path: PathBuf,
        message: String,
        #[source_code]
        src: NamedSource<String>,
        #[label("here")]
        span: SourceSpan,
    },

    #[error(transparent)]
    #[diagnostic(code(ferrule::config))]
    Config(#[from] ConfigError),
}

/// What a `check` run found across all programs
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CheckSummary {
    pub programs: usize,
    pub errors: usize,
    pub warnings: usize,
}

impl CheckSummary {
    /// Whether the run should exit unsuccessfully
    pub fn failed(&self, strict: bool) -> bool {
        self.errors > 0 || (strict && self.warnings > 0)
    }
}

impl Cli {
    /// Run the parsed command; `Ok(false)` means the checked code has problems
    pub fn run(self) -> Result<bool, CliError> {
        match self.command {
            Command::Check {
                programs,
                config,
                no_check_mem,
                strict,
            } => {
                let mut build = check_cmd::load_config(config.as_deref(), &programs)?;
                if no_check_mem {
                    build.check_mem = false;
                }
                build.strict |= strict;

                let summary = check_cmd::run_check(&programs, &build, self.json)?;
                Ok(!summary.failed(build.strict))
            }
        }
    }
}
