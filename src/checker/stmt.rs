//! Statement checking

use super::{Checker, FunctionFrame};
use crate::ast::{Block, EnumDecl, Expr, ExprKind, FnDecl, Stmt, StmtKind, VarDecl};
use crate::diagnostics::error_codes::{modules, structural, types as type_codes};
use crate::diagnostics::{Diagnostic, Span};
use crate::memory::OwnershipContext;
use crate::scope::{ScopeId, Symbol, SymbolKind};
use crate::types::{is_pointer_type, Type};
use std::collections::HashSet;
use tracing::trace;

/// Resolved parameter and return types of a function
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FnSignature {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl FnSignature {
    pub fn ty(&self) -> Type {
        Type::function(self.params.clone(), self.ret.clone())
    }
}

impl Checker {
    /// Check a statement, returning false if it had errors
    pub fn typecheck_statement(&mut self, stmt: &Stmt, scope: ScopeId) -> bool {
        match &stmt.kind {
            StmtKind::Var(decl) => self.check_var_decl(decl, stmt.span, scope),
            StmtKind::Fn(decl) => self.check_fn_decl(decl, stmt.span, scope),
            StmtKind::Struct(decl) => self.check_struct_decl(decl, stmt.span, scope),
            StmtKind::Enum(decl) => self.check_enum_decl(decl, stmt.span, scope),
            StmtKind::Use { module, .. } => {
                if self.scopes.get(scope).is_module_scope {
                    return true;
                }
                self.report(
                    Diagnostic::error(modules::INVALID_MODULE_ACCESS)
                        .message(format!("`use \"{}\"` must appear at the top level of a module", module))
                        .span(stmt.span),
                );
                false
            }
            StmtKind::Return { value } => self.check_return(value.as_ref(), stmt.span, scope),
            StmtKind::If {
                branches,
                else_block,
            } => {
                let mut ok = true;
                for (index, (cond, body)) in branches.iter().enumerate() {
                    if !self.check_condition(cond, scope) {
                        ok = false;
                    }
                    let name = if index == 0 { "if" } else { "elif" };
                    if !self.check_scoped_block(body, scope, name) {
                        ok = false;
                    }
                }
                if let Some(body) = else_block {
                    if !self.check_scoped_block(body, scope, "else") {
                        ok = false;
                    }
                }
                ok
            }
            StmtKind::Loop {
                init,
                cond,
                step,
                body,
            } => {
                let loop_scope = self.scopes.create_child_scope(scope, "loop");
                let mut ok = true;
                if let Some(init) = init {
                    ok &= self.typecheck_statement(init, loop_scope);
                }
                if let Some(cond) = cond {
                    ok &= self.check_condition(cond, loop_scope);
                }
                if let Some(step) = step {
                    ok &= self.typecheck_expression(step, loop_scope).is_some();
                }

                self.loop_depth += 1;
                ok &= self.check_scoped_block(body, loop_scope, "loop body");
                self.loop_depth -= 1;

                self.exit_scope(loop_scope);
                ok
            }
            StmtKind::Break | StmtKind::Continue => {
                if self.loop_depth > 0 {
                    return true;
                }
                let keyword = if matches!(stmt.kind, StmtKind::Break) {
                    "break"
                } else {
                    "continue"
                };
                self.report(
                    Diagnostic::error(structural::INVALID_CONTROL_FLOW)
                        .message(format!("`{}` outside of a loop", keyword))
                        .span(stmt.span),
                );
                false
            }
            StmtKind::Switch {
                scrutinee,
                cases,
                default,
            } => self.check_switch(scrutinee, cases, default.as_ref(), stmt.span, scope),
            StmtKind::Defer { stmt: inner } => {
                let previous = self.defer_target.replace(scope);
                let ok = self.typecheck_statement(inner, scope);
                self.defer_target = previous;
                ok
            }
            StmtKind::Block { block } => self.check_scoped_block(block, scope, "block"),
            StmtKind::Expr { expr } => self.typecheck_expression(expr, scope).is_some(),
        }
    }

    /// Check statements directly in `scope`
    pub(crate) fn check_stmts(&mut self, stmts: &[Stmt], scope: ScopeId) -> bool {
        let mut ok = true;
        for stmt in stmts {
            if !self.typecheck_statement(stmt, scope) {
                ok = false;
            }
        }
        ok
    }

    /// Check a block in a fresh child scope, applying its deferred frees
    pub(crate) fn check_scoped_block(&mut self, block: &Block, parent: ScopeId, name: &str) -> bool {
        let scope = self.scopes.create_child_scope(parent, name);
        let ok = self.check_stmts(&block.stmts, scope);
        self.exit_scope(scope);
        ok
    }

    fn check_condition(&mut self, cond: &Expr, scope: ScopeId) -> bool {
        let Some(ty) = self.typecheck_expression(cond, scope) else {
            return false;
        };
        if ty != Type::bool() {
            self.mismatch(cond.span, &Type::bool(), &ty);
            return false;
        }
        true
    }

    pub(crate) fn duplicate_symbol(&mut self, name: &str, span: Span, scope: ScopeId) {
        let previous = self
            .scopes
            .lookup_current_only(scope, name)
            .map(|sym| sym.span.line);
        let mut diagnostic = Diagnostic::error(structural::DUPLICATE_SYMBOL)
            .message(format!("`{}` is already defined in this scope", name))
            .span(span);
        if let Some(line) = previous.filter(|line| *line > 0) {
            diagnostic = diagnostic.note(format!("previously defined at line {}", line));
        }
        self.report(diagnostic);
    }

    fn check_var_decl(&mut self, decl: &VarDecl, span: Span, scope: ScopeId) -> bool {
        let declared = match &decl.ty {
            Some(ty) => match self.resolve_type(ty, scope) {
                Some(ty) => Some(ty),
                None => return false,
            },
            None => None,
        };

        let value_ty = decl
            .value
            .as_ref()
            .map(|value| self.typecheck_expression(value, scope));

        let mut ok = true;
        let ty = match (declared, value_ty) {
            (Some(declared), Some(Some(found))) => {
                if !self.assignable(&declared, &found) {
                    let value_span = decl.value.as_ref().map_or(span, |v| v.span);
                    self.mismatch(value_span, &declared, &found);
                    ok = false;
                }
                declared
            }
            // The initializer already reported; keep the declared type
            (Some(declared), Some(None)) => {
                ok = false;
                declared
            }
            (Some(declared), None) => declared,
            (None, Some(Some(found))) => found,
            (None, Some(None)) => return false,
            (None, None) => {
                self.report(
                    Diagnostic::error(type_codes::UNKNOWN_TYPE)
                        .message(format!("Cannot infer the type of `{}`", decl.name))
                        .span(span)
                        .help("add a type annotation or an initializer"),
                );
                return false;
            }
        };

        if ty.is_void() {
            self.report(
                Diagnostic::error(type_codes::TYPE_MISMATCH)
                    .message(format!("`{}` cannot have type `void`", decl.name))
                    .span(span),
            );
            return false;
        }

        let symbol = Symbol::variable(&decl.name, ty.clone(), decl.is_mutable)
            .public(decl.is_public)
            .at(span);
        if !self.scopes.insert(scope, symbol) {
            self.duplicate_symbol(&decl.name, span, scope);
            return false;
        }

        if let Some(value) = &decl.value {
            if self.is_owning_initializer(value, scope) {
                self.track_alloc(scope, &decl.name, span);
            } else if let ExprKind::Ident { name: source } = &value.kind {
                if is_pointer_type(&ty) {
                    self.track_alias(scope, &decl.name, source);
                }
            }
        }
        ok
    }

    /// Resolve parameter and return types; reports each failure
    pub(crate) fn function_signature(&mut self, decl: &FnDecl, scope: ScopeId) -> Option<FnSignature> {
        let mut ok = true;
        let mut params = Vec::with_capacity(decl.params.len());
        for param in &decl.params {
            match self.resolve_type(&param.ty, scope) {
                Some(ty) => params.push(ty),
                None => ok = false,
            }
        }
        let ret = self.resolve_type(&decl.return_type, scope);
        if !ok {
            return None;
        }
        Some(FnSignature { params, ret: ret? })
    }

    fn check_fn_decl(&mut self, decl: &FnDecl, span: Span, scope: ScopeId) -> bool {
        let Some(signature) = self.function_signature(decl, scope) else {
            return false;
        };

        let mut symbol = Symbol::new(&decl.name, signature.ty(), SymbolKind::Function)
            .public(decl.is_public)
            .at(span);
        symbol.returns_ownership = decl.returns_ownership;
        symbol.takes_ownership = decl.takes_ownership;
        symbol.owned_params = decl.params.iter().map(|p| p.takes_ownership).collect();

        // Inserted first so the body can call itself
        if !self.scopes.insert(scope, symbol) {
            self.duplicate_symbol(&decl.name, span, scope);
            return false;
        }

        self.check_function_body(decl, &signature, span, scope, &decl.name)
    }

    /// Check a function or method body in its own scope and analyzer
    pub(crate) fn check_function_body(
        &mut self,
        decl: &FnDecl,
        signature: &FnSignature,
        span: Span,
        parent: ScopeId,
        scope_name: &str,
    ) -> bool {
        trace!(function = scope_name, "checking function body");
        let fn_scope = self.scopes.create_function_scope(parent, scope_name);
        self.push_frame(FunctionFrame {
            return_type: signature.ret.clone(),
            ownership: OwnershipContext {
                function: scope_name.to_string(),
                returns_ownership: decl.returns_ownership,
                takes_ownership: decl.takes_ownership,
            },
        });
        let outer_loops = std::mem::replace(&mut self.loop_depth, 0);
        let outer_defer = self.defer_target.take();

        let mut ok = true;
        for (param, ty) in decl.params.iter().zip(&signature.params) {
            let symbol = Symbol::variable(&param.name, ty.clone(), true).at(param.span);
            if !self.scopes.insert(fn_scope, symbol) {
                self.duplicate_symbol(&param.name, param.span, fn_scope);
                ok = false;
                continue;
            }
            // The callee now owns what it was handed
            if (decl.takes_ownership || param.takes_ownership) && is_pointer_type(ty) {
                self.track_alloc(fn_scope, &param.name, param.span);
            }
        }

        if !self.check_stmts(&decl.body.stmts, fn_scope) {
            ok = false;
        }

        if !signature.ret.is_void() && !always_returns(&decl.body.stmts) {
            self.report(
                Diagnostic::error(type_codes::RETURN_MISMATCH)
                    .message(format!(
                        "`{}` must return a value of type `{}`",
                        decl.name, signature.ret
                    ))
                    .span(span)
                    .note("not every path through the body ends in `return`"),
            );
            ok = false;
        }

        self.exit_scope(fn_scope);
        if self.ctx.config.check_mem {
            if let Some(analyzer) = self.scopes.get(fn_scope).memory_analyzer.as_ref() {
                analyzer.report_leaks(&mut self.ctx);
            }
        }

        self.defer_target = outer_defer;
        self.loop_depth = outer_loops;
        self.pop_frame();
        ok
    }

    fn check_return(&mut self, value: Option<&Expr>, span: Span, scope: ScopeId) -> bool {
        let Some(expected) = self.frame().map(|f| f.return_type.clone()) else {
            if let Some(value) = value {
                self.typecheck_expression(value, scope);
            }
            self.report(
                Diagnostic::error(structural::INVALID_CONTROL_FLOW)
                    .message("`return` outside of a function")
                    .span(span),
            );
            return false;
        };

        let Some(value) = value else {
            if expected.is_void() {
                return true;
            }
            self.report(
                Diagnostic::error(type_codes::RETURN_MISMATCH)
                    .message(format!("Expected a return value of type `{}`", expected))
                    .span(span),
            );
            return false;
        };

        let Some(found) = self.typecheck_expression(value, scope) else {
            return false;
        };
        if expected.is_void() {
            self.report(
                Diagnostic::error(type_codes::RETURN_MISMATCH)
                    .message("A function returning `void` cannot return a value")
                    .span(value.span),
            );
            return false;
        }
        if !self.assignable(&expected, &found) {
            self.report(
                Diagnostic::error(type_codes::RETURN_MISMATCH)
                    .message(format!(
                        "Expected return type `{}`, found `{}`",
                        expected, found
                    ))
                    .span(value.span),
            );
            return false;
        }
        true
    }

    fn check_enum_decl(&mut self, decl: &EnumDecl, span: Span, scope: ScopeId) -> bool {
        let mut ok = true;
        let mut seen = HashSet::new();
        let mut members = Vec::with_capacity(decl.members.len());
        for member in &decl.members {
            if seen.insert(member.as_str()) {
                members.push(member.clone());
            } else {
                self.report(
                    Diagnostic::error(structural::DUPLICATE_SYMBOL)
                        .message(format!(
                            "Enum member `{}.{}` is declared more than once",
                            decl.name, member
                        ))
                        .span(span),
                );
                ok = false;
            }
        }

        let enum_ty = Type::basic(&decl.name);
        let symbol = Symbol::new(
            &decl.name,
            enum_ty.clone(),
            SymbolKind::Enum {
                members: members.clone(),
            },
        )
        .public(decl.is_public)
        .at(span);
        if !self.scopes.insert(scope, symbol) {
            self.duplicate_symbol(&decl.name, span, scope);
            return false;
        }

        for member in members {
            let symbol = Symbol::new(
                format!("{}.{}", decl.name, member),
                enum_ty.clone(),
                SymbolKind::EnumMember,
            )
            .public(decl.is_public)
            .at(span);
            self.scopes.insert(scope, symbol);
        }
        ok
    }
}

/// Does every path through `stmts` end in `return`
fn always_returns(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Return { .. } => true,
        StmtKind::Block { block } => always_returns(&block.stmts),
        StmtKind::If {
            branches,
            else_block: Some(else_block),
        } => {
            branches.iter().all(|(_, body)| always_returns(&body.stmts))
                && always_returns(&else_block.stmts)
        }
        StmtKind::Switch {
            cases,
            default: Some(default),
            ..
        } => {
            cases.iter().all(|case| always_returns(&case.body.stmts))
                && always_returns(&default.stmts)
        }
        // `loop { .. }` without a condition only exits through `return`
        StmtKind::Loop {
            cond: None, body, ..
        } => !contains_break(&body.stmts),
        _ => false,
    })
}

fn contains_break(stmts: &[Stmt]) -> bool {
    stmts.iter().any(|stmt| match &stmt.kind {
        StmtKind::Break => true,
        StmtKind::Block { block } => contains_break(&block.stmts),
        StmtKind::If {
            branches,
            else_block,
        } => {
            branches.iter().any(|(_, body)| contains_break(&body.stmts))
                || else_block.as_ref().is_some_and(|b| contains_break(&b.stmts))
        }
        StmtKind::Switch { cases, default, .. } => {
            cases.iter().any(|case| contains_break(&case.body.stmts))
                || default.as_ref().is_some_and(|b| contains_break(&b.stmts))
        }
        StmtKind::Defer { stmt } => contains_break(std::slice::from_ref(stmt)),
        _ => false,
    })
}
