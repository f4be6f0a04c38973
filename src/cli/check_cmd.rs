//! Handler for the `ferrule check` subcommand.

use std::path::{Path, PathBuf};

use miette::NamedSource;
use tracing::debug;

use super::{CheckSummary, CliError};
use crate::ast::Program;
use crate::config::BuildConfig;

/// Configuration from `--config`, or ferrule.toml beside the first program
pub(super) fn load_config(
    explicit: Option<&Path>,
    programs: &[PathBuf],
) -> Result<BuildConfig, CliError> {
    if let Some(path) = explicit {
        return Ok(BuildConfig::load(path)?);
    }
    let dir = programs
        .first()
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(BuildConfig::discover(dir)?)
}

/// Deserialize a program produced by the parser
pub(super) fn read_program(path: &Path) -> Result<Program, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_program(path, text)
}

pub(super) fn parse_program(path: &Path, text: String) -> Result<Program, CliError> {
    serde_json::from_str(&text).map_err(|e| {
        let offset = byte_offset(&text, e.line(), e.column());
        CliError::InvalidProgram {
            path: path.to_path_buf(),
            message: e.to_string(),
            src: NamedSource::new(path.display().to_string(), text.clone()),
            span: (offset, 1).into(),
        }
    })
}

/// Byte offset of a 1-indexed line and column
fn byte_offset(text: &str, line: usize, column: usize) -> usize {
    let line_start: usize = text
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(text.len().saturating_sub(1))
}

pub(super) fn run_check(
    programs: &[PathBuf],
    config: &BuildConfig,
    json: bool,
) -> Result<CheckSummary, CliError> {
    let mut summary = CheckSummary::default();

    for path in programs {
        let program = read_program(path)?;
        debug!(path = %path.display(), modules = program.modules.len(), "checking program");
        let result = crate::check_program(&program, config);

        for d in result.diagnostics.diagnostics() {
            if json {
                println!("{}", d.to_json());
            } else {
                eprintln!("{}", d.to_human_readable());
            }
        }
        summary.programs += 1;
        summary.errors += result.diagnostics.error_count();
        summary.warnings += result.diagnostics.warning_count();
    }

    if !json {
        print_summary(&summary, config.strict);
    }
    Ok(summary)
}

fn print_summary(summary: &CheckSummary, strict: bool) {
    if summary.failed(strict) {
        let mut parts = Vec::new();
        if summary.errors > 0 {
            parts.push(format!("{} error(s)", summary.errors));
        }
        if summary.warnings > 0 {
            if strict {
                parts.push(format!(
                    "{} warning(s) [treated as errors with --strict]",
                    summary.warnings
                ));
            } else {
                parts.push(format!("{} warning(s)", summary.warnings));
            }
        }
        eprintln!(
            "\nChecked {} program(s), found {}",
            summary.programs,
            parts.join(", ")
        );
    } else if summary.warnings > 0 {
        println!(
            "Checked {} program(s), no errors ({} warning(s))",
            summary.programs, summary.warnings
        );
    } else {
        println!("Checked {} program(s), no errors found", summary.programs);
    }
}
