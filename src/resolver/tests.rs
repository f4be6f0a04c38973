use super::*;
use crate::ast::build::*;
use crate::config::BuildConfig;
use pretty_assertions::assert_eq;

fn resolve(program: &Program) -> (Vec<String>, Vec<ModuleDependency>, Checker) {
    let mut checker = Checker::new(BuildConfig::default());
    let mut resolver = ModuleResolver::new(program);
    let order = resolver.resolve(&mut checker);
    (order, resolver.dependencies().to_vec(), checker)
}

fn tags(checker: &Checker) -> Vec<String> {
    checker
        .diagnostics()
        .diagnostics()
        .iter()
        .map(|d| d.error_type.clone())
        .collect()
}

fn public_fn(name: &str) -> crate::ast::Stmt {
    func(name, vec![], ty("int"), vec![ret(Some(int(1)))])
        .public()
        .stmt()
}

#[test]
fn test_dependencies_are_checked_first() {
    let program = program(vec![
        module(
            "app",
            vec![
                use_("net", None),
                let_("n", Some(ty("int")), call(qualified("net", "port"), vec![])),
            ],
        ),
        module(
            "net",
            vec![use_("util", None), public_fn("port")],
        ),
        module("util", vec![public_fn("helper")]),
    ]);

    let (order, deps, checker) = resolve(&program);
    assert_eq!(order, vec!["util", "net", "app"]);
    assert!(checker.diagnostics().is_empty());
    assert!(deps.iter().all(|d| d.processed));
    assert_eq!(deps[0].dependencies, vec!["net".to_string()]);
}

#[test]
fn test_repeated_use_is_one_edge() {
    let program = program(vec![
        module(
            "app",
            vec![use_("util", None), use_("util", Some("u"))],
        ),
        module("util", vec![]),
    ]);

    let (_, deps, checker) = resolve(&program);
    assert!(checker.diagnostics().is_empty());
    assert_eq!(deps[0].dependencies, vec!["util".to_string()]);
    assert_eq!(deps[0].use_spans.len(), 1);
}

#[test]
fn test_duplicate_module_is_reported_and_skipped() {
    let program = program(vec![
        module("util", vec![public_fn("helper")]),
        module("util", vec![let_("x", None, ident("missing"))]),
    ]);

    let (order, _, checker) = resolve(&program);
    assert_eq!(order, vec!["util"]);
    assert_eq!(tags(&checker), vec![modules::DUPLICATE_MODULE]);
}

#[test]
fn test_unknown_module_is_reported() {
    let program = program(vec![module("app", vec![use_("nowhere", None)])]);

    let (order, deps, checker) = resolve(&program);
    assert_eq!(order, vec!["app"]);
    assert_eq!(tags(&checker), vec![modules::MODULE_NOT_FOUND]);
    assert!(deps[0].dependencies.is_empty());
    let diagnostic = &checker.diagnostics().diagnostics()[0];
    assert_eq!(diagnostic.file_path, std::path::PathBuf::from("app.fe"));
    assert_eq!(diagnostic.line, 1);
}

#[test]
fn test_duplicate_alias_is_reported() {
    let program = program(vec![
        module(
            "app",
            vec![use_("net", Some("m")), use_("util", Some("m"))],
        ),
        module("net", vec![]),
        module("util", vec![]),
    ]);

    let (_, _, checker) = resolve(&program);
    assert_eq!(tags(&checker), vec![structural::DUPLICATE_SYMBOL]);
}

#[test]
fn test_cycle_is_reported_once_and_checking_continues() {
    let program = program(vec![
        module("a", vec![use_("b", None), public_fn("fa")]),
        module("b", vec![use_("a", None), public_fn("fb")]),
    ]);

    let (order, _, checker) = resolve(&program);
    assert_eq!(order, vec!["b", "a"]);
    assert_eq!(tags(&checker), vec![modules::CIRCULAR_DEPENDENCY]);

    let diagnostic = &checker.diagnostics().diagnostics()[0];
    assert!(diagnostic.message.contains("a -> b -> a"), "{}", diagnostic.message);
    assert_eq!(diagnostic.file_path, std::path::PathBuf::from("b.fe"));
}

#[test]
fn test_self_import_is_a_cycle() {
    let program = program(vec![module("solo", vec![use_("solo", None)])]);

    let (order, _, checker) = resolve(&program);
    assert_eq!(order, vec!["solo"]);
    assert_eq!(tags(&checker), vec![modules::CIRCULAR_DEPENDENCY]);
    assert!(checker.diagnostics().diagnostics()[0]
        .message
        .contains("solo -> solo"));
}

#[test]
fn test_longer_cycle_names_every_module() {
    let program = program(vec![
        module("a", vec![use_("b", None)]),
        module("b", vec![use_("c", None)]),
        module("c", vec![use_("a", None)]),
    ]);

    let (_, _, checker) = resolve(&program);
    assert_eq!(tags(&checker), vec![modules::CIRCULAR_DEPENDENCY]);
    assert!(checker.diagnostics().diagnostics()[0]
        .message
        .contains("a -> b -> c -> a"));
}

#[test]
fn test_module_scopes_live_under_global() {
    let program = program(vec![module("a", vec![]), module("b", vec![])]);

    let (_, _, checker) = resolve(&program);
    let scopes = checker.scopes();
    let a = scopes.module_scope("a").unwrap();
    assert!(scopes.get(a).is_module_scope);
    assert_eq!(scopes.get(a).parent, Some(crate::scope::ScopeTree::GLOBAL));
    assert!(scopes.module_scope("b").is_some());
}
