//! Per-run checking state
//!
//! `CheckContext` carries the configuration, the module currently being
//! checked and the diagnostic list. The resolver re-points it with
//! `enter_module` before each module body is processed.

use crate::ast::{ModuleNode, SourceLines};
use crate::config::BuildConfig;
use crate::diagnostics::{DiagnosticBag, DiagnosticBuilder};
use std::path::{Path, PathBuf};

#[derive(Debug, Default)]
pub struct CheckContext {
    pub config: BuildConfig,
    module_name: String,
    file_path: PathBuf,
    source: Option<SourceLines>,
    diagnostics: DiagnosticBag,
}

impl CheckContext {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Point the context at `module`
    pub fn enter_module(&mut self, module: &ModuleNode) {
        self.module_name = module.name.clone();
        self.file_path = module.file_path.clone();
        self.source = module
            .source
            .as_ref()
            .map(|text| SourceLines::new(text.as_str()));
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Record a diagnostic in the current module
    pub fn emit(&mut self, builder: DiagnosticBuilder) {
        let mut builder = builder.file(self.file_path.clone());
        if let (Some(line), Some(source)) = (builder.line(), &self.source) {
            if let Some(text) = source.line(line) {
                builder = builder.line_text(text);
            }
        }
        self.diagnostics.push(builder.build());
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> DiagnosticBag {
        self.diagnostics
    }
}
