//! Ferrule semantic core
//!
//! Type checking, scope resolution and static memory-safety analysis for the
//! Ferrule systems language. A front end hands over a parsed [`ast::Program`];
//! [`check_program`] returns every diagnostic together with the scope tree
//! and the type of each expression.

pub mod ast;
pub mod checker;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod memory;
pub mod resolver;
pub mod scope;
pub mod types;

pub use checker::{check_program, CheckResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ast::*;
    pub use crate::checker::{check_program, CheckResult};
    pub use crate::config::BuildConfig;
    pub use crate::diagnostics::{Diagnostic, DiagnosticBag, Severity, Span};
    pub use crate::types::Type;
}
