//! Diagnostic reporting for the Ferrule checker
//!
//! Every finding of the checker and the memory analyzer flows through this
//! module as a `Diagnostic`. The list is append-only during a run and is the
//! only channel to the error reporter and the language server.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod error_codes;
pub use error_codes::*;

/// A source location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    /// Line (1-indexed)
    pub line: usize,

    /// Column (1-indexed)
    pub column: usize,

    /// Length of the token under the caret
    #[serde(default = "default_length")]
    pub length: usize,
}

fn default_length() -> usize {
    1
}

/// Unplaced span (line 0); the length matches a deserialized span
impl Default for Span {
    fn default() -> Self {
        Self::new(0, 0, default_length())
    }
}

impl Span {
    /// Create a new span
    pub fn new(line: usize, column: usize, length: usize) -> Self {
        Self {
            line,
            column,
            length,
        }
    }

    /// A single-character span
    pub fn point(line: usize, column: usize) -> Self {
        Self::new(line, column, 1)
    }
}

/// Severity level for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
    Hint,
}

/// A checker diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable error tag (e.g., "Type Mismatch")
    pub error_type: String,

    /// Severity level
    pub severity: Severity,

    /// File the diagnostic belongs to
    pub file_path: PathBuf,

    /// Line (1-indexed)
    pub line: usize,

    /// Column (1-indexed)
    pub col: usize,

    /// Primary message
    pub message: String,

    /// Additional context
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,

    /// Suggested fix
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    /// Text of the offending source line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_text: Option<String>,

    /// Length of the underlined token
    pub token_length: usize,
}

impl Diagnostic {
    /// Create a new error diagnostic
    pub fn error(error_type: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(error_type.into(), Severity::Error)
    }

    /// Create a new warning diagnostic
    pub fn warning(error_type: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(error_type.into(), Severity::Warning)
    }

    /// Create a new info diagnostic
    pub fn info(error_type: impl Into<String>) -> DiagnosticBuilder {
        DiagnosticBuilder::new(error_type.into(), Severity::Info)
    }

    /// Check if this is an error
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }

    /// Check if this is a warning
    pub fn is_warning(&self) -> bool {
        matches!(self.severity, Severity::Warning)
    }

    /// Format as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format as human-readable string
    pub fn to_human_readable(&self) -> String {
        let severity = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
            Severity::Hint => "hint",
        };

        let mut output = format!(
            "{}[{}]: {}\n  --> {}:{}:{}\n",
            severity,
            self.error_type,
            self.message,
            self.file_path.display(),
            self.line,
            self.col
        );

        // Show source context
        if let Some(line) = &self.line_text {
            output.push_str(&format!("   |\n{:>3} | {}\n   |", self.line, line));

            let underline_start = self.col.saturating_sub(1);
            output.push_str(&format!(
                " {}{}\n",
                " ".repeat(underline_start),
                "^".repeat(self.token_length.max(1))
            ));
        }

        if let Some(note) = &self.note {
            output.push_str(&format!("   = note: {}\n", note));
        }

        if let Some(help) = &self.help {
            output.push_str(&format!("   = help: {}\n", help));
        }

        output
    }
}

/// Builder for constructing diagnostics
#[derive(Debug, Clone)]
pub struct DiagnosticBuilder {
    error_type: String,
    severity: Severity,
    message: String,
    span: Option<Span>,
    file_path: Option<PathBuf>,
    note: Option<String>,
    help: Option<String>,
    line_text: Option<String>,
}

impl DiagnosticBuilder {
    fn new(error_type: String, severity: Severity) -> Self {
        Self {
            error_type,
            severity,
            message: String::new(),
            span: None,
            file_path: None,
            note: None,
            help: None,
            line_text: None,
        }
    }

    /// Set the message
    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Set the primary span
    pub fn span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Set the file, unless one is already set
    pub fn file(mut self, path: impl Into<PathBuf>) -> Self {
        if self.file_path.is_none() {
            self.file_path = Some(path.into());
        }
        self
    }

    /// Attach a note
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Attach a help message
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the text of the source line
    pub fn line_text(mut self, text: impl Into<String>) -> Self {
        self.line_text = Some(text.into());
        self
    }

    /// The line this diagnostic points at, if a span was given
    pub fn line(&self) -> Option<usize> {
        self.span.map(|s| s.line)
    }

    /// Build the diagnostic
    pub fn build(self) -> Diagnostic {
        let span = self.span.unwrap_or_default();
        Diagnostic {
            error_type: self.error_type,
            severity: self.severity,
            file_path: self.file_path.unwrap_or_default(),
            line: span.line,
            col: span.column,
            message: self.message,
            note: self.note,
            help: self.help,
            line_text: self.line_text,
            token_length: span.length,
        }
    }
}

/// A collection of diagnostics
#[derive(Debug, Default, Clone)]
pub struct DiagnosticBag {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticBag {
    /// Create a new empty bag
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a diagnostic
    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Check if there are any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_error())
    }

    /// Check if there are any warnings
    pub fn has_warnings(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_warning())
    }

    /// Count warnings
    pub fn warning_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_warning()).count()
    }

    /// Count errors
    pub fn error_count(&self) -> usize {
        self.diagnostics.iter().filter(|d| d.is_error()).count()
    }

    /// All diagnostics carrying the given tag
    pub fn of_type<'a>(&'a self, error_type: &'a str) -> impl Iterator<Item = &'a Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.error_type == error_type)
    }

    /// Get all diagnostics
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Take all diagnostics
    pub fn take(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Merge another bag into this one
    pub fn merge(&mut self, other: DiagnosticBag) {
        self.diagnostics.extend(other.diagnostics);
    }

    /// Get the number of diagnostics
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// Check if the bag is empty
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Format all diagnostics as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.diagnostics).unwrap_or_else(|_| "[]".to_string())
    }

    /// Format all diagnostics as human-readable text
    pub fn format_text(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_human_readable())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl From<Diagnostic> for DiagnosticBag {
    fn from(diagnostic: Diagnostic) -> Self {
        let mut bag = DiagnosticBag::new();
        bag.push(diagnostic);
        bag
    }
}
