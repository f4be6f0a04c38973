//! Module resolution
//!
//! Modules may `use` each other in any textual order, so resolution runs
//! in three passes over the whole program:
//!
//! 1. **register** every module scope under the global scope,
//! 2. **link** each module's `use` statements against the full registry,
//! 3. **check** module bodies depth-first so dependencies come first.
//!
//! A module reached again while it is still in progress closes a cycle. The
//! cycle is reported and the remaining modules are still checked.

use crate::ast::{ModuleNode, Program, StmtKind};
use crate::checker::Checker;
use crate::diagnostics::error_codes::{modules, structural};
use crate::diagnostics::{Diagnostic, Span};
use crate::scope::ScopeId;
use std::collections::HashMap;
use tracing::debug;

/// Direct `use` edges of one module
#[derive(Debug, Clone, PartialEq)]
pub struct ModuleDependency {
    pub module_name: String,
    /// Modules named by `use`, in source order and without repeats
    pub dependencies: Vec<String>,
    /// Span of the `use` for each entry in `dependencies`
    pub use_spans: Vec<Span>,
    pub processed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
    Unvisited,
    InProgress,
    Processed,
}

/// A module that was registered, with its scope
#[derive(Debug, Clone, Copy)]
struct Registered {
    index: usize,
    scope: ScopeId,
}

pub struct ModuleResolver<'p> {
    program: &'p Program,
    registered: Vec<Registered>,
    by_name: HashMap<String, usize>,
    dependencies: Vec<ModuleDependency>,
    state: Vec<VisitState>,
    /// Modules currently in progress, outermost first
    stack: Vec<usize>,
}

impl<'p> ModuleResolver<'p> {
    pub fn new(program: &'p Program) -> Self {
        Self {
            program,
            registered: Vec::new(),
            by_name: HashMap::new(),
            dependencies: Vec::new(),
            state: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Dependency edges of every registered module, in registration order
    pub fn dependencies(&self) -> &[ModuleDependency] {
        &self.dependencies
    }

    /// Names of registered modules in the order their bodies were checked
    pub fn resolve(&mut self, checker: &mut Checker) -> Vec<String> {
        self.register(checker);
        self.link(checker);

        let mut order = Vec::with_capacity(self.registered.len());
        for slot in 0..self.registered.len() {
            self.visit(slot, checker, &mut order);
        }
        debug!(order = ?order, "module bodies checked");
        order
    }

    fn module(&self, slot: usize) -> &'p ModuleNode {
        let program = self.program;
        &program.modules[self.registered[slot].index]
    }

    /// Pass 1: one scope per module name
    fn register(&mut self, checker: &mut Checker) {
        for (index, module) in self.program.modules.iter().enumerate() {
            let Some(scope) = checker.scopes.create_module_scope(&module.name) else {
                checker.ctx.enter_module(module);
                checker.report(
                    Diagnostic::error(modules::DUPLICATE_MODULE)
                        .message(format!("Module `{}` is defined more than once", module.name))
                        .span(module.span),
                );
                continue;
            };
            self.by_name.insert(module.name.clone(), self.registered.len());
            self.registered.push(Registered { index, scope });
            self.dependencies.push(ModuleDependency {
                module_name: module.name.clone(),
                dependencies: Vec::new(),
                use_spans: Vec::new(),
                processed: false,
            });
            self.state.push(VisitState::Unvisited);
        }
        debug!(modules = self.registered.len(), "registered module scopes");
    }

    /// Pass 2: bind every `use` now that all modules exist
    fn link(&mut self, checker: &mut Checker) {
        for slot in 0..self.registered.len() {
            let module = self.module(slot);
            let scope = self.registered[slot].scope;
            checker.ctx.enter_module(module);

            for stmt in &module.body {
                let StmtKind::Use {
                    module: target,
                    alias,
                } = &stmt.kind
                else {
                    continue;
                };
                let alias = alias.as_deref().unwrap_or(target);

                let taken = checker
                    .scopes
                    .get(scope)
                    .imported_modules
                    .iter()
                    .any(|import| import.alias == alias);
                if taken {
                    checker.report(
                        Diagnostic::error(structural::DUPLICATE_SYMBOL)
                            .message(format!("Module alias `{}` is already in use", alias))
                            .span(stmt.span),
                    );
                    continue;
                }

                if !checker.scopes.add_module_import(scope, target, alias) {
                    checker.report(
                        Diagnostic::error(modules::MODULE_NOT_FOUND)
                            .message(format!("Module `{}` not found", target))
                            .span(stmt.span),
                    );
                    continue;
                }

                let edges = &mut self.dependencies[slot];
                if !edges.dependencies.iter().any(|d| d == target) {
                    edges.dependencies.push(target.clone());
                    edges.use_spans.push(stmt.span);
                }
            }
        }
        debug!("linked module imports");
    }

    /// Pass 3: dependencies first, then the module itself
    fn visit(&mut self, slot: usize, checker: &mut Checker, order: &mut Vec<String>) {
        match self.state[slot] {
            VisitState::Processed | VisitState::InProgress => return,
            VisitState::Unvisited => {}
        }
        self.state[slot] = VisitState::InProgress;
        self.stack.push(slot);

        let edges: Vec<(String, Span)> = {
            let deps = &self.dependencies[slot];
            deps.dependencies
                .iter()
                .cloned()
                .zip(deps.use_spans.iter().copied())
                .collect()
        };
        for (name, span) in edges {
            let Some(&dep) = self.by_name.get(&name) else {
                continue;
            };
            if self.state[dep] == VisitState::InProgress {
                self.report_cycle(slot, dep, span, checker);
                continue;
            }
            self.visit(dep, checker, order);
        }

        let module = self.module(slot);
        debug!(module = %module.name, "processing module");
        checker.check_module(module, self.registered[slot].scope);

        self.stack.pop();
        self.state[slot] = VisitState::Processed;
        self.dependencies[slot].processed = true;
        order.push(module.name.clone());
    }

    fn report_cycle(&self, from: usize, to: usize, span: Span, checker: &mut Checker) {
        let start = self.stack.iter().position(|&s| s == to).unwrap_or(0);
        let mut path: Vec<&str> = self.stack[start..]
            .iter()
            .map(|&s| self.module(s).name.as_str())
            .collect();
        path.push(self.module(to).name.as_str());
        let cycle = path.join(" -> ");

        checker.ctx.enter_module(self.module(from));
        checker.report(
            Diagnostic::error(modules::CIRCULAR_DEPENDENCY)
                .message(format!("Circular dependency between modules: {}", cycle))
                .span(span)
                .note(format!(
                    "`{}` uses `{}`, which is still being checked",
                    self.module(from).name,
                    self.module(to).name
                )),
        );
    }
}

#[cfg(test)]
mod tests;
