//! Struct declarations, literals and member access

use super::stmt::FnSignature;
use super::Checker;
use crate::ast::{Expr, ExprKind, StructDecl};
use crate::diagnostics::error_codes::{modules, structural, types as type_codes};
use crate::diagnostics::{Diagnostic, Span};
use crate::scope::{ScopeId, Symbol, SymbolKind};
use crate::types::{MemberKind, StructBuilder, StructId, StructMember, Type};
use std::collections::HashSet;

impl Checker {
    pub(crate) fn check_struct_decl(&mut self, decl: &StructDecl, span: Span, scope: ScopeId) -> bool {
        let module = self.current_module(scope);
        let id = self.structs.reserve(&decl.name, &module, decl.is_public);
        let self_ty = Type::Struct {
            id,
            name: decl.name.clone(),
        };

        // Registered before the fields so they can point back at the struct
        let symbol = Symbol::new(&decl.name, self_ty.clone(), SymbolKind::Struct)
            .public(decl.is_public)
            .at(span);
        if !self.scopes.insert(scope, symbol) {
            self.duplicate_symbol(&decl.name, span, scope);
            return false;
        }

        let mut ok = true;
        let mut builder = StructBuilder::new(id);
        for field in &decl.fields {
            let Some(ty) = self.resolve_type(&field.ty, scope) else {
                ok = false;
                continue;
            };
            if ty == self_ty {
                self.report(
                    Diagnostic::error(type_codes::UNKNOWN_TYPE)
                        .message(format!("Struct `{}` cannot contain itself by value", decl.name))
                        .span(field.span)
                        .help(format!("store a pointer instead: `*{}`", decl.name)),
                );
                ok = false;
                continue;
            }
            if !builder.field(&field.name, ty, field.is_public) {
                self.duplicate_member(&decl.name, &field.name, field.span);
                ok = false;
            }
        }

        let mut methods: Vec<(usize, FnSignature)> = Vec::new();
        for (index, method) in decl.methods.iter().enumerate() {
            let Some(signature) = self.function_signature(&method.decl, scope) else {
                ok = false;
                continue;
            };
            let kind = MemberKind::Method {
                has_self: method.decl.params.first().is_some_and(|p| p.name == "self"),
                returns_ownership: method.decl.returns_ownership,
                takes_ownership: method.decl.takes_ownership,
                owned_params: method.decl.params.iter().map(|p| p.takes_ownership).collect(),
            };
            if !builder.method(&method.decl.name, signature.ty(), method.decl.is_public, kind) {
                self.duplicate_member(&decl.name, &method.decl.name, method.span);
                ok = false;
                continue;
            }
            methods.push((index, signature));
        }

        self.structs.finalize(builder);

        for (index, signature) in methods {
            let method = &decl.methods[index];
            let scope_name = format!("{}.{}", decl.name, method.decl.name);
            if !self.check_function_body(&method.decl, &signature, method.span, scope, &scope_name) {
                ok = false;
            }
        }
        ok
    }

    fn duplicate_member(&mut self, owner: &str, name: &str, span: Span) {
        self.report(
            Diagnostic::error(structural::DUPLICATE_SYMBOL)
                .message(format!("`{}` already has a member named `{}`", owner, name))
                .span(span),
        );
    }

    /// Look up a member, enforcing privacy outside the declaring module
    pub(crate) fn struct_member(
        &mut self,
        id: StructId,
        member: &str,
        span: Span,
        scope: ScopeId,
    ) -> Option<StructMember> {
        let current = self.current_module(scope);
        let def = self.structs.get(id)?;
        let found = def.member(member).cloned();
        let (struct_name, struct_module) = (def.name.clone(), def.module.clone());

        let Some(found) = found else {
            self.report(
                Diagnostic::error(type_codes::UNKNOWN_MEMBER)
                    .message(format!("Struct `{}` has no member `{}`", struct_name, member))
                    .span(span),
            );
            return None;
        };

        if !found.is_public && struct_module != current {
            let what = if found.is_method() { "Method" } else { "Field" };
            self.report(
                Diagnostic::error(type_codes::PRIVATE_ACCESS)
                    .message(format!(
                        "{} `{}` of struct `{}` is private",
                        what, member, struct_name
                    ))
                    .span(span)
                    .note(format!("`{}` is declared in module `{}`", struct_name, struct_module)),
            );
            return None;
        }
        Some(found)
    }

    /// `object.member` outside a call
    pub(crate) fn check_member(
        &mut self,
        object: &Expr,
        member: &str,
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        match &object.kind {
            ExprKind::Ident { name } => {
                let symbol = self.scopes.lookup(scope, name).cloned();
                match symbol {
                    Some(sym) if matches!(sym.kind, SymbolKind::Enum { .. }) => {
                        let found = self
                            .scopes
                            .lookup(scope, &format!("{}.{}", name, member))
                            .map(|s| s.ty.clone());
                        return self.enum_member_result(name, member, found, span);
                    }
                    Some(sym) if sym.kind == SymbolKind::Struct => {
                        let id = sym.ty.struct_id()?;
                        return self.struct_member(id, member, span, scope).map(|m| m.ty);
                    }
                    None if self.scopes.find_import(scope, name).is_some() => {
                        self.report(
                            Diagnostic::error(modules::INVALID_MODULE_ACCESS)
                                .message(format!("Cannot use `.` to access module `{}`", name))
                                .span(span)
                                .help(format!("use `{}::{}` instead", name, member)),
                        );
                        return None;
                    }
                    _ => {}
                }
            }
            ExprKind::Qualified { module, name } => {
                let is_enum = self
                    .scopes
                    .lookup_qualified_symbol(scope, module, name)
                    .is_some_and(|sym| matches!(sym.kind, SymbolKind::Enum { .. }));
                if is_enum {
                    let found = self
                        .scopes
                        .lookup_qualified_symbol(scope, module, &format!("{}.{}", name, member))
                        .map(|s| s.ty.clone());
                    return self.enum_member_result(name, member, found, span);
                }
            }
            _ => {}
        }

        let object_ty = self.typecheck_expression(object, scope)?;
        let Some(id) = object_ty.struct_id() else {
            self.report(
                Diagnostic::error(type_codes::UNKNOWN_MEMBER)
                    .message(format!("Type `{}` has no member `{}`", object_ty, member))
                    .span(span),
            );
            return None;
        };
        self.struct_member(id, member, span, scope).map(|m| m.ty)
    }

    fn enum_member_result(
        &mut self,
        enum_name: &str,
        member: &str,
        found: Option<Type>,
        span: Span,
    ) -> Option<Type> {
        if found.is_none() {
            self.report(
                Diagnostic::error(type_codes::UNKNOWN_MEMBER)
                    .message(format!("Enum `{}` has no member `{}`", enum_name, member))
                    .span(span),
            );
        }
        found
    }

    pub(crate) fn check_struct_literal(
        &mut self,
        module: Option<&str>,
        name: &str,
        fields: &[(String, Expr)],
        span: Span,
        scope: ScopeId,
    ) -> Option<Type> {
        let symbol = match module {
            Some(alias) => self.qualified_symbol(scope, alias, name, span),
            None => {
                let found = self.scopes.lookup(scope, name).cloned();
                if found.is_none() {
                    self.report(
                        Diagnostic::error(type_codes::UNKNOWN_TYPE)
                            .message(format!("Unknown struct `{}`", name))
                            .span(span),
                    );
                }
                found
            }
        };

        // Field values are typed even when the struct is unknown
        let value_tys: Vec<Option<Type>> = fields
            .iter()
            .map(|(_, value)| self.typecheck_expression(value, scope))
            .collect();

        let symbol = symbol?;
        let def = match (&symbol.kind, symbol.ty.struct_id()) {
            (SymbolKind::Struct, Some(id)) => self.structs.get(id).cloned(),
            _ => None,
        };
        let Some(def) = def else {
            self.report(
                Diagnostic::error(type_codes::UNKNOWN_TYPE)
                    .message(format!("`{}` is not a struct", name))
                    .span(span),
            );
            return None;
        };

        let current = self.current_module(scope);
        let mut ok = true;
        let mut seen = HashSet::new();
        for ((field, value), value_ty) in fields.iter().zip(value_tys) {
            if !seen.insert(field.as_str()) {
                self.report(
                    Diagnostic::error(structural::DUPLICATE_SYMBOL)
                        .message(format!("Field `{}` is set more than once", field))
                        .span(value.span),
                );
                ok = false;
                continue;
            }

            let Some(member) = def.member(field).filter(|m| !m.is_method()) else {
                self.report(
                    Diagnostic::error(type_codes::UNKNOWN_MEMBER)
                        .message(format!("Struct `{}` has no field `{}`", def.name, field))
                        .span(value.span),
                );
                ok = false;
                continue;
            };

            if !member.is_public && def.module != current {
                self.report(
                    Diagnostic::error(type_codes::PRIVATE_ACCESS)
                        .message(format!("Field `{}` of struct `{}` is private", field, def.name))
                        .span(value.span),
                );
                ok = false;
            }

            match value_ty {
                Some(ty) if !self.assignable(&member.ty, &ty) => {
                    self.mismatch(value.span, &member.ty, &ty);
                    ok = false;
                }
                Some(_) => {}
                None => ok = false,
            }
        }

        let missing: Vec<String> = def
            .fields()
            .filter(|f| !seen.contains(f.name.as_str()))
            .map(|f| format!("`{}`", f.name))
            .collect();
        if !missing.is_empty() {
            self.report(
                Diagnostic::error(structural::MISSING_FIELD)
                    .message(format!(
                        "Missing field(s) {} in `{}` literal",
                        missing.join(", "),
                        def.name
                    ))
                    .span(span),
            );
            ok = false;
        }

        ok.then(|| def.ty())
    }
}
