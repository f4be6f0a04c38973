//! Call checking: builtins, free functions, methods and ownership transfer

use super::Checker;
use crate::ast::{Expr, ExprKind};
use crate::diagnostics::error_codes::{structural, types as type_codes};
use crate::diagnostics::{Diagnostic, Span};
use crate::memory::FreeKind;
use crate::scope::{ScopeId, SymbolKind};
use crate::types::{is_pointer_type, MemberKind, StructId, Type};

impl Checker {
    pub(crate) fn check_call(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        if let ExprKind::Ident { name } = &callee.kind {
            let is_builtin = self
                .scopes
                .lookup(scope, name)
                .is_some_and(|sym| sym.kind == SymbolKind::Builtin);
            if is_builtin {
                match name.as_str() {
                    "alloc" => return self.check_alloc(callee, args, span, scope),
                    "free" => return self.check_free(callee, args, span, scope),
                    _ => {}
                }
            }
        }

        if let ExprKind::Member { object, member } = &callee.kind {
            if !self.names_enum_or_module(object, scope) {
                return self.check_method_call(callee, object, member, args, span, scope);
            }
        }

        let callee_ty = self.typecheck_expression(callee, scope);
        let arg_tys = self.typecheck_args(args, scope);
        let callee_ty = callee_ty?;

        let (params, ret) = match callee_ty {
            Type::Function { params, ret } => (params, ret),
            other => {
                self.report(
                    Diagnostic::error(type_codes::NOT_CALLABLE)
                        .message(format!("Type `{}` is not callable", other))
                        .span(callee.span),
                );
                return None;
            }
        };

        let name = callee_name(callee);
        let ok = self.check_arguments(&name, &params, args, &arg_tys, span);

        let consumed: Vec<bool> = match &callee.kind {
            ExprKind::Ident { name } => self.scopes.lookup(scope, name),
            ExprKind::Qualified { module, name } => {
                self.scopes.lookup_qualified_symbol(scope, module, name)
            }
            _ => None,
        }
        .map(|sym| (0..args.len()).map(|i| sym.consumes_arg(i)).collect())
        .unwrap_or_default();
        self.transfer_ownership(&consumed, args, &arg_tys, scope);

        ok.then(|| *ret)
    }

    fn typecheck_args(&mut self, args: &[Expr], scope: ScopeId) -> Vec<Option<Type>> {
        args.iter()
            .map(|arg| self.typecheck_expression(arg, scope))
            .collect()
    }

    /// Arity and per-argument compatibility
    fn check_arguments(
        &mut self,
        name: &str,
        params: &[Type],
        args: &[Expr],
        arg_tys: &[Option<Type>],
        span: Span,
    ) -> bool {
        if params.len() != args.len() {
            self.report(
                Diagnostic::error(structural::ARGUMENT_COUNT_MISMATCH)
                    .message(format!(
                        "`{}` expects {} argument(s), found {}",
                        name,
                        params.len(),
                        args.len()
                    ))
                    .span(span),
            );
            return false;
        }

        let mut ok = true;
        for ((param, arg), ty) in params.iter().zip(args).zip(arg_tys) {
            match ty {
                Some(ty) if !self.assignable(param, ty) => {
                    self.mismatch(arg.span, param, ty);
                    ok = false;
                }
                Some(_) => {}
                None => ok = false,
            }
        }
        ok
    }

    /// Pointer arguments bound to consuming parameters leave the caller
    fn transfer_ownership(
        &mut self,
        consumed: &[bool],
        args: &[Expr],
        arg_tys: &[Option<Type>],
        scope: ScopeId,
    ) {
        for ((arg, ty), takes) in args.iter().zip(arg_tys).zip(consumed) {
            if !*takes || !ty.as_ref().is_some_and(is_pointer_type) {
                continue;
            }
            if let ExprKind::Ident { name } = &arg.kind {
                self.free_variable(scope, name, arg.span, FreeKind::Transfer);
            }
        }
    }

    fn check_alloc(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        self.typecheck_expression(callee, scope);
        let arg_tys = self.typecheck_args(args, scope);
        let ok = self.check_arguments("alloc", &[Type::int()], args, &arg_tys, span);
        ok.then(|| Type::pointer(Type::void()))
    }

    /// `free(p)`, or a deferred `free(p)` inside `defer`
    fn check_free(
        &mut self,
        callee: &Expr,
        args: &[Expr],
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        self.typecheck_expression(callee, scope);
        let arg_tys = self.typecheck_args(args, scope);

        if args.len() != 1 {
            self.report(
                Diagnostic::error(structural::ARGUMENT_COUNT_MISMATCH)
                    .message(format!("`free` expects 1 argument(s), found {}", args.len()))
                    .span(span),
            );
            return None;
        }

        let ty = arg_tys.into_iter().next().flatten()?;
        if !is_pointer_type(&ty) {
            self.report(
                Diagnostic::error(type_codes::TYPE_MISMATCH)
                    .message(format!("`free` expects a pointer, found `{}`", ty))
                    .span(args[0].span),
            );
            return None;
        }

        if let ExprKind::Ident { name } = &args[0].kind {
            match self.defer_target {
                Some(target) => self.scopes.defer_free(target, name, span),
                None => self.free_variable(scope, name, span, FreeKind::Explicit),
            }
        }
        Some(Type::void())
    }

    /// `Enum.Member` and `module.item` are not method calls
    fn names_enum_or_module(&self, object: &Expr, scope: ScopeId) -> bool {
        match &object.kind {
            ExprKind::Ident { name } => match self.scopes.lookup(scope, name) {
                Some(sym) => matches!(sym.kind, SymbolKind::Enum { .. }),
                None => self.scopes.find_import(scope, name).is_some(),
            },
            ExprKind::Qualified { module, name } => self
                .scopes
                .lookup_qualified_symbol(scope, module, name)
                .is_some_and(|sym| matches!(sym.kind, SymbolKind::Enum { .. })),
            _ => false,
        }
    }

    /// Struct type named directly by `object`, for `Point.new(..)`
    fn static_receiver(&self, object: &Expr, scope: ScopeId) -> Option<StructId> {
        let symbol = match &object.kind {
            ExprKind::Ident { name } => self.scopes.lookup(scope, name),
            ExprKind::Qualified { module, name } => {
                self.scopes.lookup_qualified_symbol(scope, module, name)
            }
            _ => None,
        }?;
        match symbol.kind {
            SymbolKind::Struct => symbol.ty.struct_id(),
            _ => None,
        }
    }

    /// `object.method(args)` and `Struct.method(args)`
    fn check_method_call(
        &mut self,
        callee: &Expr,
        object: &Expr,
        member: &str,
        args: &[Expr],
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        let (id, receiver, arg_tys) = match self.static_receiver(object, scope) {
            Some(id) => (id, None, self.typecheck_args(args, scope)),
            None => {
                let receiver = self.typecheck_expression(object, scope);
                let arg_tys = self.typecheck_args(args, scope);
                let receiver = receiver?;
                let Some(id) = receiver.struct_id() else {
                    self.report(
                        Diagnostic::error(type_codes::UNKNOWN_MEMBER)
                            .message(format!("Type `{}` has no member `{}`", receiver, member))
                            .span(callee.span),
                    );
                    return None;
                };
                (id, Some(receiver), arg_tys)
            }
        };

        self.finish_method_call(callee, id, receiver, member, args, arg_tys, span, scope)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish_method_call(
        &mut self,
        callee: &Expr,
        id: StructId,
        receiver: Option<Type>,
        member: &str,
        args: &[Expr],
        arg_tys: Vec<Option<Type>>,
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        let found = self.struct_member(id, member, callee.span, scope)?;
        self.record(callee, found.ty.clone());

        let (params, ret) = match found.ty.clone() {
            Type::Function { params, ret } => (params, ret),
            other => {
                self.report(
                    Diagnostic::error(type_codes::NOT_CALLABLE)
                        .message(format!("Field `{}` of type `{}` is not callable", member, other))
                        .span(callee.span),
                );
                return None;
            }
        };

        let has_self = matches!(found.kind, MemberKind::Method { has_self: true, .. });

        // Index of the first explicit argument among the declared parameters
        let (explicit, offset) = match (&receiver, has_self) {
            (Some(receiver), true) => {
                let Some((self_param, rest)) = params.split_first() else {
                    return None;
                };
                if !self.receiver_fits(self_param, receiver) {
                    self.mismatch(callee.span, self_param, receiver);
                    return None;
                }
                (rest, 1)
            }
            // `Struct.method(value, ..)` passes `self` explicitly
            _ => (&params[..], 0),
        };

        let ok = self.check_arguments(member, explicit, args, &arg_tys, span);
        let consumed: Vec<bool> = (0..args.len())
            .map(|i| found.consumes_param(i + offset))
            .collect();
        self.transfer_ownership(&consumed, args, &arg_tys, scope);
        ok.then(|| *ret)
    }

    /// `self` binding with automatic address-of and dereference
    fn receiver_fits(&self, self_param: &Type, receiver: &Type) -> bool {
        match (self_param, receiver) {
            (Type::Pointer(inner), Type::Struct { .. }) if **inner == *receiver => true,
            (Type::Struct { .. }, Type::Pointer(inner)) if **inner == *self_param => true,
            _ => self.assignable(self_param, receiver),
        }
    }

    /// Does calling `callee` hand an owned allocation to the caller
    pub(crate) fn callee_returns_ownership(&self, callee: &Expr, scope: ScopeId) -> bool {
        match &callee.kind {
            ExprKind::Ident { name } => self
                .scopes
                .lookup(scope, name)
                .is_some_and(|sym| sym.returns_ownership),
            ExprKind::Qualified { module, name } => self
                .scopes
                .lookup_qualified_symbol(scope, module, name)
                .is_some_and(|sym| sym.returns_ownership),
            ExprKind::Member { object, member } => {
                let id = self
                    .static_receiver(object, scope)
                    .or_else(|| self.expr_types.get(&object.id).and_then(Type::struct_id));
                id.and_then(|id| self.structs.get(id))
                    .and_then(|def| def.member(member))
                    .is_some_and(|m| {
                        matches!(
                            m.kind,
                            MemberKind::Method {
                                returns_ownership: true,
                                ..
                            }
                        )
                    })
            }
            _ => false,
        }
    }
}

fn callee_name(callee: &Expr) -> String {
    match &callee.kind {
        ExprKind::Ident { name } => name.clone(),
        ExprKind::Qualified { module, name } => format!("{}::{}", module, name),
        ExprKind::Member { member, .. } => member.clone(),
        _ => "function".to_string(),
    }
}
