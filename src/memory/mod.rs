//! Static memory analysis
//!
//! Tracks `alloc`/`free` pairs by variable name while the checker walks a
//! function (or a module's top level). The analysis is syntax-directed, not a
//! control-flow analysis: the order of visits is the order of statements.
//!
//! Aliases are name based. `let q = p;` makes `q` refer to whatever `p`
//! refers to; reassigning `q` later does not undo that edge.

use crate::checker::CheckContext;
use crate::diagnostics::{error_codes::memory, Diagnostic, Span};
use std::collections::HashMap;
use tracing::trace;

/// One tracked allocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticAllocation {
    pub line: usize,
    pub column: usize,
    pub variable_name: String,
    /// Function the allocation happened in, if any
    pub function: Option<String>,
    pub has_matching_free: bool,
    pub free_count: u32,
    /// Site of the first free
    pub free_line: Option<usize>,
    pub free_column: Option<usize>,
}

/// Ownership annotations of the function being analyzed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipContext {
    pub function: String,
    pub returns_ownership: bool,
    pub takes_ownership: bool,
}

impl OwnershipContext {
    pub fn new(function: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            ..Self::default()
        }
    }
}

/// How a pointer leaves the caller's hands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeKind {
    /// `free(p)`
    Explicit,
    /// Passed to a `#takes_ownership` callee
    Transfer,
}

/// Result of [`StaticMemoryAnalyzer::track_free`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FreeOutcome {
    Freed,
    DoubleFree,
    Untracked,
    /// Ownership transfer of a pointer that was already freed
    UseAfterFree,
}

#[derive(Debug, Clone, Default)]
pub struct StaticMemoryAnalyzer {
    allocations: Vec<StaticAllocation>,
    aliases: HashMap<String, String>,
}

impl StaticMemoryAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocations(&self) -> &[StaticAllocation] {
        &self.allocations
    }

    /// Follow alias edges to the variable that owns the allocation
    pub fn canonical<'a>(&'a self, var: &'a str) -> &'a str {
        let mut current = var;
        // Bounded so a cyclic alias map cannot hang the checker
        for _ in 0..=self.aliases.len() {
            match self.aliases.get(current) {
                Some(next) if next != current => current = next,
                _ => break,
            }
        }
        current
    }

    /// Whether `var` (through aliases) has an allocation record here
    pub fn knows(&self, var: &str) -> bool {
        self.find(var).is_some()
    }

    /// Whether `var` is a recorded alias of a tracked allocation
    pub fn tracks_alias(&self, var: &str) -> bool {
        self.aliases.contains_key(var) && self.knows(var)
    }

    fn find(&self, var: &str) -> Option<usize> {
        let canonical = self.canonical(var);
        self.allocations
            .iter()
            .rposition(|a| a.variable_name == canonical)
    }

    /// Latest allocation record for `var`
    pub fn allocation(&self, var: &str) -> Option<&StaticAllocation> {
        self.find(var).map(|i| &self.allocations[i])
    }

    /// Record a fresh allocation bound to `var`
    ///
    /// Skipped inside `#returns_ownership` functions, where the pointer is
    /// expected to leave through `return`. Returns whether a record was made.
    pub fn track_alloc(&mut self, span: Span, var: &str, func: Option<&OwnershipContext>) -> bool {
        if func.is_some_and(|f| f.returns_ownership) {
            trace!(var, "allocation in #returns_ownership function not tracked");
            return false;
        }

        trace!(var, line = span.line, "track alloc");
        // `var` now names its own allocation
        self.aliases.remove(var);
        self.allocations.push(StaticAllocation {
            line: span.line,
            column: span.column,
            variable_name: var.to_string(),
            function: func.map(|f| f.function.clone()),
            has_matching_free: false,
            free_count: 0,
            free_line: None,
            free_column: None,
        });
        true
    }

    /// Record that `var` was freed (or handed off) at `span`
    pub fn track_free(
        &mut self,
        var: &str,
        span: Span,
        kind: FreeKind,
        ctx: &mut CheckContext,
    ) -> FreeOutcome {
        let Some(index) = self.find(var) else {
            if kind == FreeKind::Explicit {
                ctx.emit(
                    Diagnostic::warning(memory::UNTRACKED_FREE)
                        .message(format!("free of `{}` without a matching alloc", var))
                        .span(span)
                        .note("the analyzer never saw an allocation bound to this name"),
                );
            }
            return FreeOutcome::Untracked;
        };

        let allocation = &mut self.allocations[index];
        if allocation.has_matching_free {
            let freed_at = allocation.free_line.unwrap_or_default();
            let allocated_at = allocation.line;
            return match kind {
                FreeKind::Explicit => {
                    allocation.free_count += 1;
                    trace!(var, count = allocation.free_count, "double free");
                    ctx.emit(
                        Diagnostic::error(memory::DOUBLE_FREE)
                            .message(format!("`{}` is freed more than once", var))
                            .span(span)
                            .note(format!(
                                "allocated at line {}, first freed at line {}",
                                allocated_at, freed_at
                            )),
                    );
                    FreeOutcome::DoubleFree
                }
                FreeKind::Transfer => {
                    ctx.emit(
                        Diagnostic::error(memory::USE_AFTER_FREE)
                            .message(format!("ownership of `{}` passed on after it was freed", var))
                            .span(span)
                            .note(format!("freed at line {}", freed_at)),
                    );
                    FreeOutcome::UseAfterFree
                }
            };
        }

        trace!(var, line = span.line, ?kind, "track free");
        allocation.has_matching_free = true;
        allocation.free_count = 1;
        allocation.free_line = Some(span.line);
        allocation.free_column = Some(span.column);
        FreeOutcome::Freed
    }

    /// Make `target` refer to the allocation behind `source`
    pub fn track_alias(&mut self, target: &str, source: &str) {
        let canonical = self.canonical(source).to_string();
        if canonical == target {
            return;
        }
        trace!(alias = target, source = %canonical, "track alias");
        self.aliases.insert(target.to_string(), canonical);
    }

    /// Report a dereference or index of `var` once it has been freed
    pub fn check_use_after_free(&self, var: &str, span: Span, ctx: &mut CheckContext) -> bool {
        let Some(allocation) = self.allocation(var) else {
            return false;
        };
        if !allocation.has_matching_free {
            return false;
        }

        let mut diagnostic = Diagnostic::error(memory::USE_AFTER_FREE)
            .message(format!("`{}` is used after it was freed", var))
            .span(span);
        if let Some(line) = allocation.free_line {
            diagnostic = diagnostic.note(format!("freed at line {}", line));
        }
        ctx.emit(diagnostic);
        true
    }

    /// Warn about every allocation that was never freed
    pub fn report_leaks(&self, ctx: &mut CheckContext) -> usize {
        let mut leaks = 0;
        for allocation in self.allocations.iter().filter(|a| !a.has_matching_free) {
            leaks += 1;
            let owner = match &allocation.function {
                Some(name) => format!("function `{}`", name),
                None => format!("module `{}`", ctx.module_name()),
            };
            ctx.emit(
                Diagnostic::warning(memory::MEMORY_LEAK)
                    .message(format!(
                        "potential leak: `{}` is never freed",
                        allocation.variable_name
                    ))
                    .span(Span::new(
                        allocation.line,
                        allocation.column,
                        allocation.variable_name.len().max(1),
                    ))
                    .note(format!("allocated at line {} in {}", allocation.line, owner))
                    .help(format!(
                        "add `defer free({});` after the allocation",
                        allocation.variable_name
                    )),
            );
        }
        leaks
    }
}
