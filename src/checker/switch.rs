//! `switch` statements and enum exhaustiveness

use super::Checker;
use crate::ast::{Block, Expr, ExprKind, SwitchCase};
use crate::diagnostics::error_codes::{types as type_codes, warnings};
use crate::diagnostics::{Diagnostic, Span};
use crate::scope::ScopeId;
use crate::types::{is_builtin_type, Type};
use std::collections::HashSet;

/// Declared members not covered by any case, in declaration order
pub fn missing_enum_members(members: &[String], covered: &HashSet<String>) -> Vec<String> {
    members
        .iter()
        .filter(|m| !covered.contains(*m))
        .cloned()
        .collect()
}

impl Checker {
    pub(crate) fn check_switch(
        &mut self,
        scrutinee: &Expr,
        cases: &[SwitchCase],
        default: Option<&Block>,
        span: Span,
        scope: ScopeId,
    ) -> bool {
        let scrutinee_ty = self.typecheck_expression(scrutinee, scope);
        let mut ok = scrutinee_ty.is_some();
        let mut covered = HashSet::new();

        for case in cases {
            for value in &case.values {
                let Some(ty) = self.typecheck_expression(value, scope) else {
                    ok = false;
                    continue;
                };
                if let Some(expected) = &scrutinee_ty {
                    if !self.assignable(expected, &ty) {
                        self.mismatch(value.span, expected, &ty);
                        ok = false;
                        continue;
                    }
                }
                if let ExprKind::Member { member, .. } = &value.kind {
                    covered.insert(member.clone());
                }
            }
            if !self.check_scoped_block(&case.body, scope, "case") {
                ok = false;
            }
        }
        if let Some(block) = default {
            if !self.check_scoped_block(block, scope, "default") {
                ok = false;
            }
        }

        let enum_name = match &scrutinee_ty {
            Some(Type::Basic(name)) if !is_builtin_type(name) => name.clone(),
            _ => return ok,
        };
        let Some(members) = self.enum_members(scope, &enum_name) else {
            return ok;
        };

        let missing = missing_enum_members(&members, &covered);
        match (missing.is_empty(), default.is_some()) {
            (true, true) => {
                self.report(
                    Diagnostic::warning(warnings::REDUNDANT_DEFAULT)
                        .message(format!(
                            "`default` is unreachable: every member of `{}` is covered",
                            enum_name
                        ))
                        .span(span),
                );
            }
            (false, false) => {
                let listed: Vec<String> = missing
                    .iter()
                    .map(|m| format!("`{}.{}`", enum_name, m))
                    .collect();
                self.report(
                    Diagnostic::error(type_codes::NON_EXHAUSTIVE_SWITCH)
                        .message(format!("Switch over `{}` is not exhaustive", enum_name))
                        .span(span)
                        .note(format!("missing: {}", listed.join(", ")))
                        .help("add the missing cases or a `default` branch"),
                );
                ok = false;
            }
            _ => {}
        }
        ok
    }
}
