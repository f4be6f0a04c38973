//! Expression typing

use super::Checker;
use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::diagnostics::error_codes::{modules, structural, types as type_codes};
use crate::diagnostics::{Diagnostic, Span};
use crate::scope::{QualifiedLookup, ScopeId, Symbol};
use crate::types::{
    is_integer_like, is_numeric_type, is_pointer_type, promote_numeric, types_match, ArraySize,
    Type,
};

impl Checker {
    /// Type an expression
    ///
    /// `None` means the expression is ill-typed and the error has already
    /// been reported.
    pub fn typecheck_expression(&mut self, expr: &Expr, scope: ScopeId) -> Option<Type> {
        let ty = match &expr.kind {
            ExprKind::Int { .. } => Type::int(),
            ExprKind::Float { .. } => Type::basic("float"),
            ExprKind::Bool { .. } => Type::bool(),
            ExprKind::Char { .. } => Type::basic("char"),
            ExprKind::Str { .. } => Type::basic("string"),
            ExprKind::Ident { name } => self.check_ident(name, expr.span, scope)?,
            ExprKind::Qualified { module, name } => {
                let symbol = self.qualified_symbol(scope, module, name, expr.span)?;
                if symbol.is_type() {
                    self.type_used_as_value(&format!("{}::{}", module, name), expr.span);
                    return None;
                }
                symbol.ty
            }
            ExprKind::Binary { op, lhs, rhs } => self.check_binary(*op, lhs, rhs, expr.span, scope)?,
            ExprKind::Unary { op, operand } => self.check_unary(*op, operand, expr.span, scope)?,
            ExprKind::Call { callee, args } => self.check_call(callee, args, expr.span, scope)?,
            ExprKind::Member { object, member } => {
                self.check_member(object, member, expr.span, scope)?
            }
            ExprKind::Index { object, index } => self.check_index(object, index, scope)?,
            ExprKind::Assign { target, value } => self.check_assign(target, value, scope)?,
            ExprKind::Range { start, end } => self.check_range(start, end, scope)?,
            ExprKind::StructLit {
                module,
                name,
                fields,
            } => self.check_struct_literal(module.as_deref(), name, fields, expr.span, scope)?,
            ExprKind::ArrayLit { elements } => self.check_array_literal(elements, expr.span, scope)?,
            ExprKind::Cast { ty, value } => {
                let target = self.resolve_type(ty, scope);
                self.typecheck_expression(value, scope)?;
                target?
            }
            ExprKind::SizeOf { ty } => {
                self.resolve_type(ty, scope)?;
                Type::int()
            }
        };
        self.record(expr, ty)
    }

    /// Can a value of type `found` be stored where `expected` is wanted
    ///
    /// Everything `types_match` accepts, plus `*void` to and from any pointer
    /// so the result of `alloc` can be bound without a cast.
    pub(crate) fn assignable(&self, expected: &Type, found: &Type) -> bool {
        if types_match(expected, found).is_match() {
            return true;
        }
        let void_ptr = Type::pointer(Type::void());
        is_pointer_type(expected) && is_pointer_type(found) && (*expected == void_ptr || *found == void_ptr)
    }

    fn check_ident(&mut self, name: &str, span: Span, scope: ScopeId) -> Option<Type> {
        let found = self
            .scopes
            .lookup(scope, name)
            .map(|sym| (sym.is_type(), sym.ty.clone()));

        match found {
            Some((false, ty)) => Some(ty),
            Some((true, _)) => {
                self.type_used_as_value(name, span);
                None
            }
            None => {
                let mut diagnostic = Diagnostic::error(structural::UNDEFINED_IDENTIFIER)
                    .message(format!("Undefined identifier `{}`", name))
                    .span(span);
                if self.scopes.find_import(scope, name).is_some() {
                    diagnostic = diagnostic.help(format!(
                        "`{}` is a module; access its items with `{}::name`",
                        name, name
                    ));
                }
                self.report(diagnostic);
                None
            }
        }
    }

    fn type_used_as_value(&mut self, name: &str, span: Span) {
        self.report(
            Diagnostic::error(type_codes::INVALID_OPERAND)
                .message(format!("`{}` is a type, not a value", name))
                .span(span),
        );
    }

    /// Resolve `alias::name`, reporting why it failed
    pub(crate) fn qualified_symbol(
        &mut self,
        scope: ScopeId,
        alias: &str,
        name: &str,
        span: Span,
    ) -> Option<Symbol> {
        let module = self
            .scopes
            .find_import(scope, alias)
            .map(|import| import.module_name.clone())
            .unwrap_or_else(|| alias.to_string());

        let outcome = match self.scopes.qualified_lookup(scope, alias, name) {
            QualifiedLookup::Found(symbol) => Ok(symbol.clone()),
            QualifiedLookup::Private(_) => Err(Diagnostic::error(type_codes::PRIVATE_ACCESS)
                .message(format!("`{}` is private to module `{}`", name, module))
                .help(format!("mark `{}` as `pub` in `{}`", name, module))),
            QualifiedLookup::UnknownModule => Err(Diagnostic::error(modules::MODULE_NOT_FOUND)
                .message(format!("No module is imported as `{}`", alias))
                .help(format!("add `use \"{}\";` at the top of the module", alias))),
            QualifiedLookup::NotFound => Err(Diagnostic::error(structural::UNDEFINED_IDENTIFIER)
                .message(format!("Module `{}` has no item named `{}`", module, name))),
        };

        match outcome {
            Ok(symbol) => Some(symbol),
            Err(diagnostic) => {
                self.report(diagnostic.span(span));
                None
            }
        }
    }

    fn check_binary(
        &mut self,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        let l = self.typecheck_expression(lhs, scope);
        let r = self.typecheck_expression(rhs, scope);
        let (l, r) = (l?, r?);

        match op {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                if let Some(ty) = promote_numeric(&l, &r) {
                    return Some(ty);
                }
                // Pointer offsetting
                if matches!(op, BinaryOp::Add | BinaryOp::Sub)
                    && is_pointer_type(&l)
                    && is_integer_like(&r)
                {
                    return Some(l);
                }
                self.report(
                    Diagnostic::error(type_codes::INVALID_OPERAND)
                        .message(format!(
                            "Operator `{}` requires numeric operands, found `{}` and `{}`",
                            op.symbol(),
                            l,
                            r
                        ))
                        .span(span),
                );
                None
            }
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => {
                if self.assignable(&l, &r) {
                    Some(Type::bool())
                } else {
                    self.report(
                        Diagnostic::error(type_codes::TYPE_MISMATCH)
                            .message(format!("Cannot compare `{}` with `{}`", l, r))
                            .span(span),
                    );
                    None
                }
            }
            BinaryOp::And | BinaryOp::Or => {
                if l == Type::bool() && r == Type::bool() {
                    Some(Type::bool())
                } else {
                    self.report(
                        Diagnostic::error(type_codes::INVALID_OPERAND)
                            .message(format!(
                                "Operator `{}` requires `bool` operands, found `{}` and `{}`",
                                op.symbol(),
                                l,
                                r
                            ))
                            .span(span),
                    );
                    None
                }
            }
        }
    }

    fn check_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        let ty = self.typecheck_expression(operand, scope)?;

        let (ok, result, wanted) = match op {
            UnaryOp::Neg => (is_numeric_type(&ty), ty.clone(), "a numeric"),
            UnaryOp::Not => (ty == Type::bool(), Type::bool(), "a `bool`"),
            UnaryOp::Deref => match &ty {
                Type::Pointer(inner) => {
                    if let ExprKind::Ident { name } = &operand.kind {
                        self.check_use_after_free(scope, name, operand.span);
                    }
                    (true, inner.as_ref().clone(), "a pointer")
                }
                _ => (false, ty.clone(), "a pointer"),
            },
            UnaryOp::AddrOf => (true, Type::pointer(ty.clone()), ""),
        };

        if ok {
            Some(result)
        } else {
            self.report(
                Diagnostic::error(type_codes::INVALID_OPERAND)
                    .message(format!(
                        "Unary operator expects {} operand, found `{}`",
                        wanted, ty
                    ))
                    .span(span),
            );
            None
        }
    }

    fn check_index(&mut self, object: &Expr, index: &Expr, scope: ScopeId) -> Option<Type> {
        let object_ty = self.typecheck_expression(object, scope);
        let index_ty = self.typecheck_expression(index, scope);
        let (object_ty, index_ty) = (object_ty?, index_ty?);

        if !is_integer_like(&index_ty) {
            self.mismatch(index.span, &Type::int(), &index_ty);
            return None;
        }

        let element = match &object_ty {
            Type::Array { element, .. } => element.as_ref().clone(),
            Type::Pointer(pointee) => pointee.as_ref().clone(),
            Type::Basic(name) if name == "string" => Type::basic("char"),
            _ => {
                self.report(
                    Diagnostic::error(type_codes::NOT_INDEXABLE)
                        .message(format!("Type `{}` cannot be indexed", object_ty))
                        .span(object.span),
                );
                return None;
            }
        };

        if let ExprKind::Ident { name } = &object.kind {
            self.check_use_after_free(scope, name, object.span);
        }
        Some(element)
    }

    fn check_assign(&mut self, target: &Expr, value: &Expr, scope: ScopeId) -> Option<Type> {
        let is_lvalue = matches!(
            target.kind,
            ExprKind::Ident { .. }
                | ExprKind::Member { .. }
                | ExprKind::Index { .. }
                | ExprKind::Unary {
                    op: UnaryOp::Deref,
                    ..
                }
        );
        if !is_lvalue {
            self.report(
                Diagnostic::error(type_codes::INVALID_OPERAND)
                    .message("Invalid assignment target")
                    .span(target.span),
            );
            return None;
        }

        if let ExprKind::Ident { name } = &target.kind {
            let immutable = self
                .scopes
                .lookup(scope, name)
                .is_some_and(|sym| !sym.is_mutable);
            if immutable {
                self.report(
                    Diagnostic::error(type_codes::IMMUTABLE_ASSIGNMENT)
                        .message(format!("Cannot assign twice to immutable variable `{}`", name))
                        .span(target.span)
                        .help(format!("declare `{}` with `var` to make it mutable", name)),
                );
                return None;
            }
        }

        let target_ty = self.typecheck_expression(target, scope);
        let value_ty = self.typecheck_expression(value, scope);
        let (target_ty, value_ty) = (target_ty?, value_ty?);

        if !self.assignable(&target_ty, &value_ty) {
            self.mismatch(value.span, &target_ty, &value_ty);
            return None;
        }

        if let ExprKind::Ident { name } = &target.kind {
            if self.is_owning_initializer(value, scope) {
                self.track_alloc(scope, name, target.span);
            } else if let ExprKind::Ident { name: source } = &value.kind {
                if is_pointer_type(&target_ty) && is_pointer_type(&value_ty) {
                    self.track_alias(scope, name, source);
                }
            }
        }

        Some(target_ty)
    }

    fn check_range(&mut self, start: &Expr, end: &Expr, scope: ScopeId) -> Option<Type> {
        let start_ty = self.typecheck_expression(start, scope);
        let end_ty = self.typecheck_expression(end, scope);
        let (start_ty, end_ty) = (start_ty?, end_ty?);

        let mut ok = true;
        for (bound, ty) in [(start, &start_ty), (end, &end_ty)] {
            if *ty != Type::int() {
                self.mismatch(bound.span, &Type::int(), ty);
                ok = false;
            }
        }
        if !ok {
            return None;
        }

        // Inclusive of both ends; a length past i64 stays unsized
        let size = match (&start.kind, &end.kind) {
            (ExprKind::Int { value: lo }, ExprKind::Int { value: hi }) => hi
                .checked_sub(*lo)
                .and_then(|n| n.checked_add(1))
                .map(|n| ArraySize::Literal(n.max(0))),
            _ => None,
        };
        Some(Type::array(Type::int(), size))
    }

    fn check_array_literal(&mut self, elements: &[Expr], span: Span, scope: ScopeId) -> Option<Type> {
        let Some((first, rest)) = elements.split_first() else {
            self.report(
                Diagnostic::error(type_codes::UNKNOWN_TYPE)
                    .message("Cannot infer the element type of an empty array literal")
                    .span(span)
                    .help("give the variable an explicit array type"),
            );
            return None;
        };

        let element = self.typecheck_expression(first, scope);
        let mut ok = element.is_some();
        for el in rest {
            let Some(ty) = self.typecheck_expression(el, scope) else {
                ok = false;
                continue;
            };
            if let Some(expected) = &element {
                if !types_match(expected, &ty).is_match() {
                    self.mismatch(el.span, expected, &ty);
                    ok = false;
                }
            }
        }

        if !ok {
            return None;
        }
        let element = element?;
        Some(Type::array(
            element,
            Some(ArraySize::Literal(elements.len() as i64)),
        ))
    }
}
