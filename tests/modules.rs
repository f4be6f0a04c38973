//! Multi-module programs: resolution order, visibility and cycles

use ferrule::ast::build::*;
use ferrule::ast::{ModuleNode, Program};
use ferrule::config::BuildConfig;
use ferrule::diagnostics::error_codes::{modules, types as type_codes};
use ferrule::{check_program, CheckResult};
use pretty_assertions::assert_eq;

fn geo() -> ModuleNode {
    module(
        "geo",
        vec![
            func("origin", vec![], ty("int"), vec![ret(Some(int(0)))])
                .public()
                .stmt(),
            func("secret", vec![], ty("int"), vec![ret(Some(int(42)))]).stmt(),
        ],
    )
}

fn app(body: Vec<ferrule::ast::Stmt>) -> ModuleNode {
    module("app", body)
}

fn check(modules: Vec<ModuleNode>) -> CheckResult {
    check_program(&program(modules), &BuildConfig::default())
}

fn tags(result: &CheckResult) -> Vec<&str> {
    result
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.error_type.as_str())
        .collect()
}

#[test]
fn imported_module_may_appear_in_either_order() {
    let uses_geo = || {
        app(vec![
            use_("geo", None),
            let_("o", Some(ty("int")), call(qualified("geo", "origin"), vec![])),
        ])
    };

    let before = check(vec![uses_geo(), geo()]);
    let after = check(vec![geo(), uses_geo()]);

    assert!(before.diagnostics.is_empty(), "{}", before.diagnostics.format_text());
    assert!(after.diagnostics.is_empty(), "{}", after.diagnostics.format_text());
}

#[test]
fn only_public_symbols_cross_module_boundaries() {
    let result = check(vec![
        geo(),
        app(vec![
            use_("geo", Some("g")),
            expr_stmt(call(qualified("g", "secret"), vec![])),
        ]),
    ]);
    assert_eq!(tags(&result), vec![type_codes::PRIVATE_ACCESS]);

    let scope = result.scopes.module_scope("app").unwrap();
    assert!(result
        .scopes
        .lookup_qualified_symbol(scope, "g", "origin")
        .is_some());
    assert!(result
        .scopes
        .lookup_qualified_symbol(scope, "g", "secret")
        .is_none());
}

#[test]
fn cycle_does_not_stop_other_checks() {
    let result = check(vec![
        module(
            "a",
            vec![use_("b", None), let_("flag", Some(ty("int")), boolean(true))],
        ),
        module("b", vec![use_("a", None)]),
    ]);

    assert_eq!(
        tags(&result),
        vec![modules::CIRCULAR_DEPENDENCY, type_codes::TYPE_MISMATCH]
    );
    let cycle = &result.diagnostics.diagnostics()[0];
    assert!(cycle.message.contains("a -> b -> a"), "{}", cycle.message);
}

#[test]
fn unknown_module_is_reported_at_the_use() {
    let result = check(vec![app(vec![
        let_("n", None, int(1)),
        use_("missing", None),
    ])]);

    assert_eq!(tags(&result), vec![modules::MODULE_NOT_FOUND]);
    assert_eq!(result.diagnostics.diagnostics()[0].line, 2);
}

#[test]
fn imports_survive_json_round_trip() {
    let original = program(vec![
        app(vec![
            use_("geo", None),
            let_("o", Some(ty("int")), call(qualified("geo", "origin"), vec![])),
        ]),
        geo(),
    ]);
    let json = serde_json::to_string(&original).unwrap();
    let decoded: Program = serde_json::from_str(&json).unwrap();

    let result = check_program(&decoded, &BuildConfig::default());
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics.format_text());
    assert!(result.scopes.module_scope("geo").is_some());
}
