//! Semantic checker for Ferrule programs
//!
//! The checker is a single recursive walk over each module body. It types
//! every expression, maintains the scope tree, and drives the static memory
//! analyzer as it goes. Modules are visited in dependency order by the
//! [`ModuleResolver`](crate::resolver::ModuleResolver).
//!
//! Checking never stops at the first error: a failing expression yields
//! `None` and its parents stay silent about it, so each independent mistake
//! is reported once.

mod call;
pub mod context;
mod expr;
mod stmt;
mod structs;
mod switch;

pub use context::CheckContext;

use crate::ast::{Expr, ExprKind, ModuleNode, NodeId, Program, StmtKind, TypeExpr};
use crate::config::BuildConfig;
use crate::diagnostics::error_codes::types as type_codes;
use crate::diagnostics::{Diagnostic, DiagnosticBag, DiagnosticBuilder, Span};
use crate::memory::{FreeKind, OwnershipContext};
use crate::resolver::ModuleResolver;
use crate::scope::{ScopeId, ScopeTree, SymbolKind};
use crate::types::{is_builtin_type, ArraySize, StructTable, Type};
use std::collections::HashMap;
use tracing::debug;

/// Everything a run of the checker produces
#[derive(Debug)]
pub struct CheckResult {
    pub diagnostics: DiagnosticBag,
    pub scopes: ScopeTree,
    pub structs: StructTable,
    /// Type of every expression that typechecked
    pub expr_types: HashMap<NodeId, Type>,
}

impl CheckResult {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.has_errors()
    }

    pub fn type_of(&self, id: NodeId) -> Option<&Type> {
        self.expr_types.get(&id)
    }
}

/// Check a whole program
pub fn check_program(program: &Program, config: &BuildConfig) -> CheckResult {
    Checker::new(config.clone()).check_program(program)
}

/// State of the function whose body is being checked
#[derive(Debug, Clone)]
pub(crate) struct FunctionFrame {
    pub return_type: Type,
    pub ownership: OwnershipContext,
}

pub struct Checker {
    pub(crate) scopes: ScopeTree,
    pub(crate) structs: StructTable,
    pub(crate) ctx: CheckContext,
    pub(crate) expr_types: HashMap<NodeId, Type>,
    frames: Vec<FunctionFrame>,
    /// Enclosing loops of the current function (or module top level)
    pub(crate) loop_depth: usize,
    /// Scope that receives `free` calls while checking a `defer`
    pub(crate) defer_target: Option<ScopeId>,
}

impl Checker {
    pub fn new(config: BuildConfig) -> Self {
        Self {
            scopes: ScopeTree::new(),
            structs: StructTable::new(),
            ctx: CheckContext::new(config),
            expr_types: HashMap::new(),
            frames: Vec::new(),
            loop_depth: 0,
            defer_target: None,
        }
    }

    pub fn scopes(&self) -> &ScopeTree {
        &self.scopes
    }

    pub fn diagnostics(&self) -> &DiagnosticBag {
        self.ctx.diagnostics()
    }

    /// Resolve modules, then check them in dependency order
    pub fn check_program(mut self, program: &Program) -> CheckResult {
        debug!(modules = program.modules.len(), "checking program");
        let mut resolver = ModuleResolver::new(program);
        resolver.resolve(&mut self);
        self.finish()
    }

    pub fn finish(self) -> CheckResult {
        CheckResult {
            diagnostics: self.ctx.into_diagnostics(),
            scopes: self.scopes,
            structs: self.structs,
            expr_types: self.expr_types,
        }
    }

    /// Check the top-level statements of one module
    #[tracing::instrument(skip_all, fields(module = %module.name))]
    pub(crate) fn check_module(&mut self, module: &ModuleNode, scope: ScopeId) {
        self.ctx.enter_module(module);
        debug!("checking module body");

        for stmt in &module.body {
            if matches!(stmt.kind, StmtKind::Use { .. }) {
                continue;
            }
            self.typecheck_statement(stmt, scope);
        }

        self.exit_scope(scope);
        if self.ctx.config.check_mem {
            if let Some(analyzer) = self.scopes.get(scope).memory_analyzer.as_ref() {
                analyzer.report_leaks(&mut self.ctx);
            }
        }
    }

    // =====================================================================
    // Helpers shared by the visitors
    // =====================================================================

    pub(crate) fn report(&mut self, builder: DiagnosticBuilder) {
        self.ctx.emit(builder);
    }

    pub(crate) fn mismatch(&mut self, span: Span, expected: &Type, found: &Type) {
        self.report(
            Diagnostic::error(type_codes::TYPE_MISMATCH)
                .message(format!("Expected `{}`, found `{}`", expected, found))
                .span(span),
        );
    }

    pub(crate) fn record(&mut self, expr: &Expr, ty: Type) -> Option<Type> {
        self.expr_types.insert(expr.id, ty.clone());
        Some(ty)
    }

    pub(crate) fn frame(&self) -> Option<&FunctionFrame> {
        self.frames.last()
    }

    pub(crate) fn push_frame(&mut self, frame: FunctionFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) -> Option<FunctionFrame> {
        self.frames.pop()
    }

    pub(crate) fn ownership(&self) -> Option<OwnershipContext> {
        self.frame().map(|f| f.ownership.clone())
    }

    /// Name of the module whose body is being checked
    pub(crate) fn current_module(&self, scope: ScopeId) -> String {
        self.scopes
            .owning_module(scope)
            .unwrap_or(self.ctx.module_name())
            .to_string()
    }

    /// Apply the deferred frees queued on `scope`
    pub(crate) fn exit_scope(&mut self, scope: ScopeId) {
        for deferred in self.scopes.take_deferred_frees(scope) {
            self.free_variable(scope, &deferred.variable, deferred.span, FreeKind::Explicit);
        }
    }

    pub(crate) fn track_alloc(&mut self, scope: ScopeId, var: &str, span: Span) {
        let ownership = self.ownership();
        if let Some(analyzer) = self.scopes.analyzer_mut(scope) {
            analyzer.track_alloc(span, var, ownership.as_ref());
        }
    }

    pub(crate) fn track_alias(&mut self, scope: ScopeId, target: &str, source: &str) {
        let owner = self.scopes.analyzer_for(scope, source);
        if let Some(analyzer) = owner.and_then(|id| self.scopes.get_mut(id).memory_analyzer.as_mut()) {
            analyzer.track_alias(target, source);
        }
    }

    pub(crate) fn free_variable(&mut self, scope: ScopeId, var: &str, span: Span, kind: FreeKind) {
        let owner = self.scopes.analyzer_for(scope, var);
        if let Some(id) = owner {
            if let Some(analyzer) = self.scopes.get_mut(id).memory_analyzer.as_mut() {
                analyzer.track_free(var, span, kind, &mut self.ctx);
            }
        }
    }

    pub(crate) fn check_use_after_free(&mut self, scope: ScopeId, var: &str, span: Span) {
        let owner = self.scopes.analyzer_for(scope, var);
        if let Some(id) = owner {
            if let Some(analyzer) = self.scopes.get(id).memory_analyzer.as_ref() {
                analyzer.check_use_after_free(var, span, &mut self.ctx);
            }
        }
    }

    /// Is `expr` (possibly under casts) a call whose result the caller owns
    pub(crate) fn is_owning_initializer(&self, expr: &Expr, scope: ScopeId) -> bool {
        match &expr.kind {
            ExprKind::Cast { value, .. } => self.is_owning_initializer(value, scope),
            ExprKind::Call { callee, .. } => self.callee_returns_ownership(callee, scope),
            _ => false,
        }
    }

    // =====================================================================
    // Type expressions
    // =====================================================================

    /// Resolve a written type; reports and returns `None` on failure
    pub(crate) fn resolve_type(&mut self, ty: &TypeExpr, scope: ScopeId) -> Option<Type> {
        match ty {
            TypeExpr::Named {
                span,
                module: None,
                name,
            } => {
                if is_builtin_type(name) {
                    return Some(Type::basic(name));
                }
                let found = self
                    .scopes
                    .lookup(scope, name)
                    .filter(|sym| sym.is_type())
                    .map(|sym| sym.ty.clone());
                if found.is_none() {
                    self.report(
                        Diagnostic::error(type_codes::UNKNOWN_TYPE)
                            .message(format!("Unknown type `{}`", name))
                            .span(*span),
                    );
                }
                found
            }
            TypeExpr::Named {
                span,
                module: Some(alias),
                name,
            } => {
                let symbol = self.qualified_symbol(scope, alias, name, *span)?;
                if symbol.is_type() {
                    Some(symbol.ty)
                } else {
                    self.report(
                        Diagnostic::error(type_codes::UNKNOWN_TYPE)
                            .message(format!("`{}::{}` is not a type", alias, name))
                            .span(*span),
                    );
                    None
                }
            }
            TypeExpr::Pointer { pointee, .. } => {
                Some(Type::pointer(self.resolve_type(pointee, scope)?))
            }
            TypeExpr::Array { element, size, .. } => {
                let element = self.resolve_type(element, scope)?;
                let size = match size.as_deref() {
                    None => None,
                    Some(size_expr) => Some(self.resolve_array_size(size_expr, scope)?),
                };
                Some(Type::array(element, size))
            }
            TypeExpr::Function { params, ret, .. } => {
                let mut resolved = Vec::with_capacity(params.len());
                for p in params {
                    resolved.push(self.resolve_type(p, scope)?);
                }
                let ret = self.resolve_type(ret, scope)?;
                Some(Type::function(resolved, ret))
            }
        }
    }

    fn resolve_array_size(&mut self, size: &Expr, scope: ScopeId) -> Option<ArraySize> {
        match &size.kind {
            ExprKind::Int { value } => Some(ArraySize::Literal(*value)),
            ExprKind::Ident { name } => {
                self.typecheck_expression(size, scope)?;
                Some(ArraySize::Symbolic(name.clone()))
            }
            _ => {
                let ty = self.typecheck_expression(size, scope)?;
                if ty != Type::int() {
                    self.mismatch(size.span, &Type::int(), &ty);
                    return None;
                }
                Some(ArraySize::Symbolic("<expr>".to_string()))
            }
        }
    }

    /// Enum members declared for the enum type `name`, as visible from `scope`
    pub(crate) fn enum_members(&self, scope: ScopeId, name: &str) -> Option<Vec<String>> {
        let by_kind = |sym: &crate::scope::Symbol| match &sym.kind {
            SymbolKind::Enum { members } => Some(members.clone()),
            _ => None,
        };

        if let Some(members) = self.scopes.lookup(scope, name).and_then(by_kind) {
            return Some(members);
        }

        // An enum imported from another module keeps its bare name as type
        self.scopes.ancestors(scope).find_map(|id| {
            self.scopes
                .get(id)
                .imported_modules
                .iter()
                .find_map(|import| {
                    self.scopes
                        .lookup_current_only(import.module_scope, name)
                        .and_then(by_kind)
                })
        })
    }
}

#[cfg(test)]
mod tests;
