use super::*;
use crate::ast::build::*;
use crate::ast::{BinaryOp, ModuleNode, Stmt};
use crate::diagnostics::error_codes::{memory, modules, structural, types as type_codes, warnings};
use pretty_assertions::assert_eq;

fn check(modules: Vec<ModuleNode>) -> CheckResult {
    check_program(&program(modules), &BuildConfig::default())
}

fn check_main(body: Vec<Stmt>) -> CheckResult {
    check(vec![module("main", body)])
}

fn void_fn(name: &str, body: Vec<Stmt>) -> Stmt {
    func(name, vec![], ty("void"), body).stmt()
}

fn tags(result: &CheckResult) -> Vec<&str> {
    result
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.error_type.as_str())
        .collect()
}

fn count(result: &CheckResult, tag: &str) -> usize {
    result.diagnostics.of_type(tag).count()
}

fn assert_clean(result: &CheckResult) {
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics: {}",
        result.diagnostics.format_text()
    );
}

fn color_enum() -> Stmt {
    enum_decl("Color", &["Red", "Green", "Blue"]).stmt()
}

fn color(name: &str) -> crate::ast::Expr {
    member(ident("Color"), name)
}

// =========================================================================
// Memory safety
// =========================================================================

#[test]
fn test_alloc_and_free_is_clean() {
    let result = check_main(vec![void_fn(
        "main",
        vec![let_("p", None, alloc(8)), free("p")],
    )]);
    assert_clean(&result);
}

#[test]
fn test_double_free_reported_once_with_alloc_line() {
    // fn main (1) / let p (2) / free (3) / free (4)
    let result = check_main(vec![void_fn(
        "main",
        vec![let_("p", None, alloc(8)), free("p"), free("p")],
    )]);

    assert_eq!(tags(&result), vec![memory::DOUBLE_FREE]);
    let diagnostic = &result.diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.line, 4);
    assert_eq!(
        diagnostic.note.as_deref(),
        Some("allocated at line 2, first freed at line 3")
    );
    assert_eq!(diagnostic.file_path, std::path::PathBuf::from("main.fe"));
}

#[test]
fn test_use_after_free_cites_free_line() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc_as(ty("int"), 8)),
            free("p"),
            let_("x", None, deref(ident("p"))),
        ],
    )]);

    assert_eq!(tags(&result), vec![memory::USE_AFTER_FREE]);
    let diagnostic = &result.diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.line, 4);
    assert_eq!(diagnostic.note.as_deref(), Some("freed at line 3"));
}

#[test]
fn test_use_before_free_is_clean() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc_as(ty("int"), 8)),
            let_("x", Some(ty("int")), deref(ident("p"))),
            let_("y", None, index(ident("p"), int(0))),
            free("p"),
        ],
    )]);
    assert_clean(&result);
}

#[test]
fn test_index_after_free_is_use_after_free() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", Some(ptr(ty("int"))), alloc(16)),
            free("p"),
            expr_stmt(index(ident("p"), int(1))),
        ],
    )]);
    assert_eq!(tags(&result), vec![memory::USE_AFTER_FREE]);
}

#[test]
fn test_leak_is_reported_at_function_exit() {
    let result = check_main(vec![void_fn("main", vec![let_("p", None, alloc(8))])]);

    assert_eq!(tags(&result), vec![memory::MEMORY_LEAK]);
    let diagnostic = &result.diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.severity, crate::diagnostics::Severity::Warning);
    assert_eq!(diagnostic.line, 2);
    assert_eq!(
        diagnostic.note.as_deref(),
        Some("allocated at line 2 in function `main`")
    );
    assert!(!result.has_errors());
}

#[test]
fn test_defer_free_removes_leak() {
    let result = check_main(vec![void_fn(
        "main",
        vec![let_("p", None, alloc(8)), defer(free("p"))],
    )]);
    assert_clean(&result);
}

#[test]
fn test_defer_then_free_is_double_free_at_exit() {
    let result = check_main(vec![void_fn(
        "main",
        vec![let_("p", None, alloc(8)), defer(free("p")), free("p")],
    )]);
    assert_eq!(tags(&result), vec![memory::DOUBLE_FREE]);
}

#[test]
fn test_defer_inside_branch_applies_at_branch_exit() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc(8)),
            if_(vec![(boolean(true), vec![defer(free("p"))])], None),
        ],
    )]);
    assert_clean(&result);
}

#[test]
fn test_dereference_inside_deferring_block_is_clean() {
    // The deferred free only lands when the block exits
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc_as(ty("int"), 8)),
            block_stmt(vec![defer(free("p")), let_("x", None, deref(ident("p")))]),
        ],
    )]);
    assert_clean(&result);
}

#[test]
fn test_free_through_alias_marks_source() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc(8)),
            let_("q", None, ident("p")),
            free("q"),
            free("p"),
        ],
    )]);
    assert_eq!(tags(&result), vec![memory::DOUBLE_FREE]);
}

#[test]
fn test_free_of_untracked_pointer_warns() {
    let result = check_main(vec![func(
        "release",
        vec![param("p", ptr(ty("int")))],
        ty("void"),
        vec![free("p")],
    )
    .stmt()]);

    assert_eq!(tags(&result), vec![memory::UNTRACKED_FREE]);
    assert!(!result.has_errors());
}

#[test]
fn test_returns_ownership_moves_tracking_to_caller() {
    let make = func(
        "make",
        vec![],
        ptr(ty("int")),
        vec![
            let_("p", Some(ptr(ty("int"))), alloc(8)),
            ret(Some(ident("p"))),
        ],
    )
    .returns_ownership()
    .stmt();

    let freed = check_main(vec![
        make.clone(),
        void_fn("main", vec![let_("q", None, call(ident("make"), vec![])), free("q")]),
    ]);
    assert_clean(&freed);

    let leaked = check_main(vec![
        make,
        void_fn("main", vec![let_("q", None, call(ident("make"), vec![]))]),
    ]);
    assert_eq!(tags(&leaked), vec![memory::MEMORY_LEAK]);
    assert!(leaked.diagnostics.diagnostics()[0]
        .message
        .contains("`q`"));
}

#[test]
fn test_takes_ownership_param_transfers_at_call() {
    let consume = func(
        "consume",
        vec![param("p", ptr(ty("int"))).owned()],
        ty("void"),
        vec![free("p")],
    )
    .stmt();

    let result = check_main(vec![
        consume.clone(),
        void_fn(
            "main",
            vec![
                let_("p", Some(ptr(ty("int"))), alloc(8)),
                expr_stmt(call(ident("consume"), vec![ident("p")])),
            ],
        ),
    ]);
    assert_clean(&result);

    let after = check_main(vec![
        consume,
        void_fn(
            "main",
            vec![
                let_("p", Some(ptr(ty("int"))), alloc(8)),
                free("p"),
                expr_stmt(call(ident("consume"), vec![ident("p")])),
            ],
        ),
    ]);
    assert_eq!(tags(&after), vec![memory::USE_AFTER_FREE]);
}

#[test]
fn test_takes_ownership_function_leaks_param_it_keeps() {
    let result = check_main(vec![func(
        "keep",
        vec![param("p", ptr(ty("int")))],
        ty("void"),
        vec![],
    )
    .takes_ownership()
    .stmt()]);
    assert_eq!(tags(&result), vec![memory::MEMORY_LEAK]);
}

#[test]
fn test_module_level_allocation_freed_in_function() {
    let result = check_main(vec![
        let_("buffer", None, alloc(64)),
        void_fn("shutdown", vec![free("buffer")]),
    ]);
    assert_clean(&result);
}

#[test]
fn test_parameter_shadowing_module_allocation_is_separate() {
    let ptr_param = || vec![param("p", ptr(ty("int")))];
    let result = check_main(vec![
        let_("p", Some(ptr(ty("int"))), alloc(8)),
        func("f", ptr_param(), ty("void"), vec![free("p")]).stmt(),
        func("g", ptr_param(), ty("void"), vec![free("p")]).stmt(),
    ]);

    assert_eq!(
        tags(&result),
        vec![memory::UNTRACKED_FREE, memory::UNTRACKED_FREE, memory::MEMORY_LEAK]
    );
    assert_eq!(count(&result, memory::DOUBLE_FREE), 0);
    assert_eq!(
        result.diagnostics.diagnostics()[2].note.as_deref(),
        Some("allocated at line 1 in module `main`")
    );
}

#[test]
fn test_local_alias_of_module_allocation_frees_it() {
    let result = check_main(vec![
        let_("buffer", Some(ptr(ty("int"))), alloc(64)),
        void_fn(
            "shutdown",
            vec![let_("view", Some(ptr(ty("int"))), ident("buffer")), free("view")],
        ),
    ]);
    assert_clean(&result);
}

#[test]
fn test_module_level_leak_reported_at_module_end() {
    let result = check_main(vec![let_("buffer", None, alloc(64))]);
    assert_eq!(tags(&result), vec![memory::MEMORY_LEAK]);
    assert_eq!(
        result.diagnostics.diagnostics()[0].note.as_deref(),
        Some("allocated at line 1 in module `main`")
    );
}

#[test]
fn test_check_mem_off_suppresses_leaks_only() {
    let config = BuildConfig {
        check_mem: false,
        ..BuildConfig::default()
    };
    let program = program(vec![module(
        "main",
        vec![void_fn(
            "main",
            vec![
                let_("leak", None, alloc(8)),
                let_("p", None, alloc(8)),
                free("p"),
                free("p"),
            ],
        )],
    )]);
    let result = check_program(&program, &config);
    assert_eq!(tags(&result), vec![memory::DOUBLE_FREE]);
    assert_eq!(count(&result, memory::MEMORY_LEAK), 0);
}

// =========================================================================
// Declarations and expressions
// =========================================================================

#[test]
fn test_duplicate_symbol_points_at_first_definition() {
    let result = check_main(vec![let_("x", None, int(1)), let_("x", None, int(2))]);
    assert_eq!(tags(&result), vec![structural::DUPLICATE_SYMBOL]);
    let diagnostic = &result.diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.line, 2);
    assert_eq!(diagnostic.note.as_deref(), Some("previously defined at line 1"));
}

#[test]
fn test_shadowing_in_nested_block_is_allowed() {
    let result = check_main(vec![
        let_("x", None, int(1)),
        block_stmt(vec![let_("x", None, boolean(true))]),
    ]);
    assert_clean(&result);
}

#[test]
fn test_undefined_identifier() {
    let result = check_main(vec![let_("y", None, ident("z"))]);
    assert_eq!(tags(&result), vec![structural::UNDEFINED_IDENTIFIER]);
}

#[test]
fn test_declaration_needs_type_or_initializer() {
    let result = check_main(vec![var("x", None, None)]);
    assert_eq!(tags(&result), vec![type_codes::UNKNOWN_TYPE]);

    let typed = check_main(vec![var("x", Some(ty("int")), None)]);
    assert_clean(&typed);
}

#[test]
fn test_declared_type_must_accept_initializer() {
    let result = check_main(vec![let_("x", Some(ty("int")), boolean(true))]);
    assert_eq!(tags(&result), vec![type_codes::TYPE_MISMATCH]);
    assert_eq!(
        result.diagnostics.diagnostics()[0].message,
        "Expected `int`, found `bool`"
    );
}

#[test]
fn test_numeric_widening_and_string_char_pointer() {
    let result = check_main(vec![
        let_("d", Some(ty("double")), int(1)),
        let_("f", Some(ty("float")), binary(BinaryOp::Mul, int(2), float(0.5))),
        let_("s", Some(ptr(ty("char"))), string("hi")),
    ]);
    assert_clean(&result);
}

#[test]
fn test_alloc_binds_to_typed_pointer() {
    let result = check_main(vec![
        let_("p", Some(ptr(ty("int"))), alloc(8)),
        let_("n", Some(ty("int")), deref(ident("p"))),
        free("p"),
    ]);
    assert_clean(&result);
}

#[test]
fn test_arithmetic_requires_numbers() {
    let result = check_main(vec![let_(
        "x",
        None,
        binary(BinaryOp::Add, int(1), boolean(true)),
    )]);
    assert_eq!(tags(&result), vec![type_codes::INVALID_OPERAND]);
}

#[test]
fn test_logical_operators_require_bool() {
    let result = check_main(vec![let_(
        "x",
        None,
        binary(BinaryOp::And, boolean(true), int(1)),
    )]);
    assert_eq!(tags(&result), vec![type_codes::INVALID_OPERAND]);
}

#[test]
fn test_comparison_yields_bool() {
    let cmp = binary(BinaryOp::Lt, int(1), float(2.0));
    let id = cmp.id;
    let result = check_main(vec![let_("b", Some(ty("bool")), cmp)]);
    assert_clean(&result);
    assert_eq!(result.type_of(id), Some(&Type::bool()));
}

#[test]
fn test_range_has_inclusive_length() {
    let r = range(int(1), int(5));
    let id = r.id;
    let result = check_main(vec![let_("r", None, r)]);
    assert_clean(&result);
    assert_eq!(
        result.type_of(id),
        Some(&Type::array(Type::int(), Some(ArraySize::Literal(5))))
    );
}

#[test]
fn test_range_with_extreme_bounds_is_unsized() {
    for (lo, hi) in [(0, i64::MAX), (i64::MIN, 0), (i64::MIN, i64::MAX)] {
        let r = range(int(lo), int(hi));
        let id = r.id;
        let result = check_main(vec![void_fn("main", vec![let_("r", None, r)])]);
        assert_clean(&result);
        assert_eq!(result.type_of(id), Some(&Type::array(Type::int(), None)));
    }

    // Empty when the end precedes the start
    let r = range(int(5), int(1));
    let id = r.id;
    let result = check_main(vec![let_("r", None, r)]);
    assert_eq!(
        result.type_of(id),
        Some(&Type::array(Type::int(), Some(ArraySize::Literal(0))))
    );
}

#[test]
fn test_range_bounds_must_be_int() {
    let result = check_main(vec![let_("r", None, range(int(1), float(2.0)))]);
    assert_eq!(tags(&result), vec![type_codes::TYPE_MISMATCH]);
}

#[test]
fn test_array_literal_size_must_match() {
    let ok = check_main(vec![let_(
        "a",
        Some(array_ty(ty("int"), Some(3))),
        array_lit(vec![int(1), int(2), int(3)]),
    )]);
    assert_clean(&ok);

    let wrong = check_main(vec![let_(
        "a",
        Some(array_ty(ty("int"), Some(2))),
        array_lit(vec![int(1), int(2), int(3)]),
    )]);
    assert_eq!(tags(&wrong), vec![type_codes::TYPE_MISMATCH]);
}

#[test]
fn test_index_requires_indexable_and_integer() {
    let result = check_main(vec![
        let_("n", None, int(3)),
        expr_stmt(index(ident("n"), int(0))),
        let_("s", None, string("abc")),
        let_("c", Some(ty("char")), index(ident("s"), int(0))),
        expr_stmt(index(ident("s"), boolean(true))),
    ]);
    assert_eq!(
        tags(&result),
        vec![type_codes::NOT_INDEXABLE, type_codes::TYPE_MISMATCH]
    );
}

#[test]
fn test_assignment_to_const_is_rejected() {
    let result = check_main(vec![
        const_("limit", None, int(10)),
        expr_stmt(assign(ident("limit"), int(11))),
    ]);
    assert_eq!(tags(&result), vec![type_codes::IMMUTABLE_ASSIGNMENT]);
    assert!(result.diagnostics.diagnostics()[0].help.is_some());
}

#[test]
fn test_assignment_target_must_be_lvalue() {
    let result = check_main(vec![expr_stmt(assign(int(1), int(2)))]);
    assert_eq!(tags(&result), vec![type_codes::INVALID_OPERAND]);
}

#[test]
fn test_pointer_reassignment_is_aliased() {
    let result = check_main(vec![void_fn(
        "main",
        vec![
            let_("p", None, alloc(8)),
            var("q", Some(ptr(ty("void"))), None),
            expr_stmt(assign(ident("q"), ident("p"))),
            free("q"),
        ],
    )]);
    assert_clean(&result);
}

// =========================================================================
// Functions and control flow
// =========================================================================

#[test]
fn test_direct_recursion_typechecks() {
    let result = check_main(vec![func(
        "fact",
        vec![param("n", ty("int"))],
        ty("int"),
        vec![ret(Some(binary(
            BinaryOp::Mul,
            ident("n"),
            call(ident("fact"), vec![binary(BinaryOp::Sub, ident("n"), int(1))]),
        )))],
    )
    .stmt()]);
    assert_clean(&result);
}

#[test]
fn test_argument_count_and_types() {
    let add = func(
        "add",
        vec![param("a", ty("int")), param("b", ty("int"))],
        ty("int"),
        vec![ret(Some(binary(BinaryOp::Add, ident("a"), ident("b"))))],
    )
    .stmt();
    let result = check_main(vec![
        add,
        expr_stmt(call(ident("add"), vec![int(1)])),
        expr_stmt(call(ident("add"), vec![int(1), string("two")])),
    ]);
    assert_eq!(
        tags(&result),
        vec![structural::ARGUMENT_COUNT_MISMATCH, type_codes::TYPE_MISMATCH]
    );
}

#[test]
fn test_calling_a_value_is_not_callable() {
    let result = check_main(vec![
        let_("x", None, int(1)),
        expr_stmt(call(ident("x"), vec![])),
    ]);
    assert_eq!(tags(&result), vec![type_codes::NOT_CALLABLE]);
}

#[test]
fn test_duplicate_parameter() {
    let result = check_main(vec![func(
        "f",
        vec![param("a", ty("int")), param("a", ty("int"))],
        ty("void"),
        vec![],
    )
    .stmt()]);
    assert_eq!(tags(&result), vec![structural::DUPLICATE_SYMBOL]);
}

#[test]
fn test_return_value_must_match() {
    let result = check_main(vec![func("f", vec![], ty("int"), vec![ret(Some(boolean(true)))]).stmt()]);
    assert_eq!(tags(&result), vec![type_codes::RETURN_MISMATCH]);
}

#[test]
fn test_bare_return_in_non_void_function() {
    let result = check_main(vec![func("f", vec![], ty("int"), vec![ret(None)]).stmt()]);
    assert_eq!(tags(&result), vec![type_codes::RETURN_MISMATCH]);
}

#[test]
fn test_value_returned_from_void_function() {
    let result = check_main(vec![void_fn("f", vec![ret(Some(int(1)))])]);
    assert_eq!(tags(&result), vec![type_codes::RETURN_MISMATCH]);
}

#[test]
fn test_missing_return_on_some_path() {
    let partial = check_main(vec![func(
        "f",
        vec![param("c", ty("bool"))],
        ty("int"),
        vec![if_(vec![(ident("c"), vec![ret(Some(int(1)))])], None)],
    )
    .stmt()]);
    assert_eq!(tags(&partial), vec![type_codes::RETURN_MISMATCH]);

    let total = check_main(vec![func(
        "f",
        vec![param("c", ty("bool"))],
        ty("int"),
        vec![if_(
            vec![(ident("c"), vec![ret(Some(int(1)))])],
            Some(vec![ret(Some(int(0)))]),
        )],
    )
    .stmt()]);
    assert_clean(&total);
}

#[test]
fn test_return_outside_function() {
    let result = check_main(vec![ret(None)]);
    assert_eq!(tags(&result), vec![structural::INVALID_CONTROL_FLOW]);
}

#[test]
fn test_break_and_continue_need_a_loop() {
    let outside = check_main(vec![break_(), continue_()]);
    assert_eq!(
        tags(&outside),
        vec![
            structural::INVALID_CONTROL_FLOW,
            structural::INVALID_CONTROL_FLOW
        ]
    );

    let inside = check_main(vec![while_(
        boolean(true),
        vec![if_(vec![(boolean(false), vec![break_()])], Some(vec![continue_()]))],
    )]);
    assert_clean(&inside);
}

#[test]
fn test_loop_depth_resets_inside_function_body() {
    let result = check_main(vec![
        while_(boolean(true), vec![block_stmt(vec![break_()])]),
        void_fn("f", vec![break_()]),
    ]);
    assert_eq!(tags(&result), vec![structural::INVALID_CONTROL_FLOW]);
}

#[test]
fn test_for_loop_variable_is_scoped_to_loop() {
    let result = check_main(vec![
        for_(
            let_("i", None, int(0)),
            binary(BinaryOp::Lt, ident("i"), int(10)),
            assign(ident("i"), binary(BinaryOp::Add, ident("i"), int(1))),
            vec![let_("j", None, ident("i"))],
        ),
        let_("k", None, ident("i")),
    ]);
    assert_eq!(tags(&result), vec![structural::UNDEFINED_IDENTIFIER]);
}

#[test]
fn test_conditions_must_be_bool() {
    let result = check_main(vec![
        if_(vec![(int(1), vec![])], None),
        while_(string("yes"), vec![]),
    ]);
    assert_eq!(
        tags(&result),
        vec![type_codes::TYPE_MISMATCH, type_codes::TYPE_MISMATCH]
    );
}

#[test]
fn test_nested_use_is_invalid() {
    let result = check(vec![
        module("geo", vec![]),
        module("main", vec![void_fn("f", vec![use_("geo", None)])]),
    ]);
    assert_eq!(tags(&result), vec![modules::INVALID_MODULE_ACCESS]);
}

// =========================================================================
// Enums and switch
// =========================================================================

#[test]
fn test_enum_members_are_values_of_the_enum() {
    let a = color("Red");
    let id = a.id;
    let result = check_main(vec![
        color_enum(),
        let_("c", None, a),
        let_("n", Some(ty("int")), color("Green")),
    ]);
    assert_clean(&result);
    assert_eq!(result.type_of(id), Some(&Type::basic("Color")));
}

#[test]
fn test_unknown_enum_member() {
    let result = check_main(vec![color_enum(), let_("c", None, color("Purple"))]);
    assert_eq!(tags(&result), vec![type_codes::UNKNOWN_MEMBER]);
}

#[test]
fn test_enum_name_is_not_a_value() {
    let result = check_main(vec![color_enum(), let_("c", None, ident("Color"))]);
    assert_eq!(tags(&result), vec![type_codes::INVALID_OPERAND]);
}

#[test]
fn test_duplicate_enum_member() {
    let result = check_main(vec![enum_decl("Dir", &["Up", "Up"]).stmt()]);
    assert_eq!(tags(&result), vec![structural::DUPLICATE_SYMBOL]);
}

#[test]
fn test_non_exhaustive_switch_lists_missing_members() {
    let result = check_main(vec![
        color_enum(),
        func(
            "paint",
            vec![param("c", ty("Color"))],
            ty("void"),
            vec![switch(
                ident("c"),
                vec![
                    case(vec![color("Red")], vec![]),
                    case(vec![color("Green")], vec![]),
                ],
                None,
            )],
        )
        .stmt(),
    ]);

    assert_eq!(tags(&result), vec![type_codes::NON_EXHAUSTIVE_SWITCH]);
    let diagnostic = &result.diagnostics.diagnostics()[0];
    assert_eq!(diagnostic.note.as_deref(), Some("missing: `Color.Blue`"));
    assert!(diagnostic.help.is_some());
}

#[test]
fn test_switch_with_default_is_exhaustive() {
    let result = check_main(vec![
        color_enum(),
        let_("c", None, color("Red")),
        switch(
            ident("c"),
            vec![case(vec![color("Red")], vec![])],
            Some(vec![]),
        ),
    ]);
    assert_clean(&result);
}

#[test]
fn test_redundant_default_warns() {
    let result = check_main(vec![
        color_enum(),
        let_("c", None, color("Red")),
        switch(
            ident("c"),
            vec![
                case(vec![color("Red"), color("Green")], vec![]),
                case(vec![color("Blue")], vec![]),
            ],
            Some(vec![]),
        ),
    ]);
    assert_eq!(tags(&result), vec![warnings::REDUNDANT_DEFAULT]);
    assert!(!result.has_errors());
}

#[test]
fn test_switch_case_must_match_scrutinee() {
    let result = check_main(vec![
        let_("n", None, int(1)),
        switch(
            ident("n"),
            vec![case(vec![int(1)], vec![]), case(vec![string("two")], vec![])],
            None,
        ),
    ]);
    assert_eq!(tags(&result), vec![type_codes::TYPE_MISMATCH]);
}

#[test]
fn test_switch_over_int_is_not_exhaustiveness_checked() {
    let result = check_main(vec![
        let_("n", None, int(1)),
        switch(ident("n"), vec![case(vec![int(1)], vec![])], None),
    ]);
    assert_clean(&result);
}

#[test]
fn test_missing_enum_members_keeps_declaration_order() {
    let members: Vec<String> = ["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect();
    let covered = ["C".to_string(), "A".to_string()].into_iter().collect();
    assert_eq!(
        switch::missing_enum_members(&members, &covered),
        vec!["B".to_string(), "D".to_string()]
    );
}

// =========================================================================
// Structs and methods
// =========================================================================

fn point_struct() -> Stmt {
    struct_decl(
        "Point",
        vec![field("x", ty("int")).public(), field("y", ty("int"))],
        vec![method(
            func(
                "sum",
                vec![param("self", ptr(ty("Point")))],
                ty("int"),
                vec![ret(Some(binary(
                    BinaryOp::Add,
                    member(ident("self"), "x"),
                    member(ident("self"), "y"),
                )))],
            )
            .public(),
        )],
    )
    .public()
    .stmt()
}

#[test]
fn test_struct_literal_and_field_access() {
    let result = check_main(vec![
        point_struct(),
        let_("p", None, struct_lit("Point", vec![("x", int(1)), ("y", int(2))])),
        let_("x", Some(ty("int")), member(ident("p"), "x")),
    ]);
    assert_clean(&result);
    assert_eq!(result.structs.len(), 1);
}

#[test]
fn test_struct_literal_field_errors() {
    let result = check_main(vec![
        point_struct(),
        let_("a", None, struct_lit("Point", vec![("x", int(1))])),
        let_(
            "b",
            None,
            struct_lit("Point", vec![("x", int(1)), ("y", int(2)), ("z", int(3))]),
        ),
        let_(
            "c",
            None,
            struct_lit("Point", vec![("x", boolean(true)), ("y", int(2))]),
        ),
    ]);
    assert_eq!(
        tags(&result),
        vec![
            structural::MISSING_FIELD,
            type_codes::UNKNOWN_MEMBER,
            type_codes::TYPE_MISMATCH
        ]
    );
}

#[test]
fn test_method_call_with_auto_address_of() {
    let result = check_main(vec![
        point_struct(),
        let_("p", None, struct_lit("Point", vec![("x", int(1)), ("y", int(2))])),
        let_("s", Some(ty("int")), call(member(ident("p"), "sum"), vec![])),
        let_("q", Some(ptr(ty("Point"))), addr_of(ident("p"))),
        let_("t", Some(ty("int")), call(member(ident("q"), "sum"), vec![])),
    ]);
    assert_clean(&result);
}

#[test]
fn test_method_call_arity_excludes_self() {
    let result = check_main(vec![
        point_struct(),
        let_("p", None, struct_lit("Point", vec![("x", int(1)), ("y", int(2))])),
        expr_stmt(call(member(ident("p"), "sum"), vec![int(1)])),
    ]);
    assert_eq!(tags(&result), vec![structural::ARGUMENT_COUNT_MISMATCH]);
}

#[test]
fn test_unknown_member_on_struct() {
    let result = check_main(vec![
        point_struct(),
        let_("p", None, struct_lit("Point", vec![("x", int(1)), ("y", int(2))])),
        expr_stmt(member(ident("p"), "z")),
    ]);
    assert_eq!(tags(&result), vec![type_codes::UNKNOWN_MEMBER]);
}

#[test]
fn test_self_referential_struct_through_pointer() {
    let node = struct_decl(
        "Node",
        vec![field("value", ty("int")), field("next", ptr(ty("Node")))],
        vec![],
    )
    .stmt();
    let result = check_main(vec![
        node,
        void_fn(
            "walk",
            vec![
                let_("n", Some(ptr(ty("Node"))), alloc(16)),
                let_("v", Some(ty("int")), member(member(ident("n"), "next"), "value")),
                free("n"),
            ],
        ),
    ]);
    assert_clean(&result);
}

#[test]
fn test_struct_containing_itself_by_value() {
    let result = check_main(vec![struct_decl("Loop", vec![field("inner", ty("Loop"))], vec![]).stmt()]);
    assert_eq!(tags(&result), vec![type_codes::UNKNOWN_TYPE]);
}

#[test]
fn test_duplicate_struct_field() {
    let result = check_main(vec![struct_decl(
        "Pair",
        vec![field("a", ty("int")), field("a", ty("bool"))],
        vec![],
    )
    .stmt()]);
    assert_eq!(tags(&result), vec![structural::DUPLICATE_SYMBOL]);
}

#[test]
fn test_method_returning_ownership_is_tracked_at_binding() {
    let pool = struct_decl(
        "Pool",
        vec![field("size", ty("int"))],
        vec![method(
            func(
                "grab",
                vec![param("self", ptr(ty("Pool")))],
                ptr(ty("int")),
                vec![ret(Some(cast(ptr(ty("int")), alloc(8))))],
            )
            .returns_ownership(),
        )],
    )
    .stmt();
    let result = check_main(vec![
        pool,
        void_fn(
            "main",
            vec![
                let_("pool", None, struct_lit("Pool", vec![("size", int(1))])),
                let_("p", None, call(member(ident("pool"), "grab"), vec![])),
            ],
        ),
    ]);
    assert_eq!(tags(&result), vec![memory::MEMORY_LEAK]);
}

fn sink_struct() -> Stmt {
    struct_decl(
        "Sink",
        vec![field("id", ty("int"))],
        vec![method(func(
            "eat",
            vec![
                param("self", ptr(ty("Sink"))),
                param("q", ptr(ty("int"))).owned(),
            ],
            ty("void"),
            vec![free("q")],
        ))],
    )
    .stmt()
}

#[test]
fn test_method_param_taking_ownership_transfers_at_call() {
    let handed_off = check_main(vec![
        sink_struct(),
        void_fn(
            "main",
            vec![
                let_("s", None, struct_lit("Sink", vec![("id", int(1))])),
                let_("q", Some(ptr(ty("int"))), alloc(8)),
                expr_stmt(call(member(ident("s"), "eat"), vec![ident("q")])),
            ],
        ),
    ]);
    assert_clean(&handed_off);

    let freed_first = check_main(vec![
        sink_struct(),
        void_fn(
            "main",
            vec![
                let_("s", None, struct_lit("Sink", vec![("id", int(1))])),
                let_("q", Some(ptr(ty("int"))), alloc(8)),
                free("q"),
                expr_stmt(call(member(ident("s"), "eat"), vec![ident("q")])),
            ],
        ),
    ]);
    assert_eq!(tags(&freed_first), vec![memory::USE_AFTER_FREE]);
}

// =========================================================================
// Modules
// =========================================================================

fn geo_module() -> ModuleNode {
    module(
        "geo",
        vec![
            point_struct(),
            func("origin", vec![], ty("int"), vec![ret(Some(int(0)))])
                .public()
                .stmt(),
            func("secret", vec![], ty("int"), vec![ret(Some(int(42)))]).stmt(),
        ],
    )
}

fn struct_lit_in(module: &str, name: &str, fields: Vec<(&str, crate::ast::Expr)>) -> crate::ast::Expr {
    expr(crate::ast::ExprKind::StructLit {
        module: Some(module.to_string()),
        name: name.to_string(),
        fields: fields
            .into_iter()
            .map(|(n, e)| (n.to_string(), e))
            .collect(),
    })
}

#[test]
fn test_qualified_access_to_public_items() {
    let result = check(vec![
        module(
            "main",
            vec![
                use_("geo", Some("g")),
                let_("o", Some(ty("int")), call(qualified("g", "origin"), vec![])),
                var("p", Some(qualified_ty("g", "Point")), None),
                let_("x", Some(ty("int")), member(ident("p"), "x")),
                let_("s", Some(ty("int")), call(member(ident("p"), "sum"), vec![])),
            ],
        ),
        geo_module(),
    ]);
    assert_clean(&result);
}

#[test]
fn test_private_field_outside_declaring_module() {
    let literal = check(vec![
        geo_module(),
        module(
            "main",
            vec![
                use_("geo", None),
                let_(
                    "p",
                    None,
                    struct_lit_in("geo", "Point", vec![("x", int(1)), ("y", int(2))]),
                ),
            ],
        ),
    ]);
    assert_eq!(tags(&literal), vec![type_codes::PRIVATE_ACCESS]);

    let access = check(vec![
        geo_module(),
        module(
            "main",
            vec![
                use_("geo", None),
                var("p", Some(qualified_ty("geo", "Point")), None),
                expr_stmt(member(ident("p"), "y")),
            ],
        ),
    ]);
    assert_eq!(tags(&access), vec![type_codes::PRIVATE_ACCESS]);
}

#[test]
fn test_private_function_outside_declaring_module() {
    let result = check(vec![
        geo_module(),
        module(
            "main",
            vec![
                use_("geo", None),
                expr_stmt(call(qualified("geo", "secret"), vec![])),
            ],
        ),
    ]);
    assert_eq!(tags(&result), vec![type_codes::PRIVATE_ACCESS]);
    assert_eq!(
        result.diagnostics.diagnostics()[0].file_path,
        std::path::PathBuf::from("main.fe")
    );
}

#[test]
fn test_dot_on_module_alias_suggests_qualified_path() {
    let result = check(vec![
        geo_module(),
        module(
            "main",
            vec![use_("geo", None), expr_stmt(member(ident("geo"), "origin"))],
        ),
    ]);
    assert_eq!(tags(&result), vec![modules::INVALID_MODULE_ACCESS]);
    assert_eq!(
        result.diagnostics.diagnostics()[0].help.as_deref(),
        Some("use `geo::origin` instead")
    );
}

#[test]
fn test_qualified_access_without_import() {
    let result = check(vec![
        geo_module(),
        module("main", vec![expr_stmt(call(qualified("geo", "origin"), vec![]))]),
    ]);
    assert_eq!(tags(&result), vec![modules::MODULE_NOT_FOUND]);
}

#[test]
fn test_imported_enum_switch_is_checked() {
    let result = check(vec![
        module(
            "palette",
            vec![enum_decl("Color", &["Red", "Green", "Blue"]).public().stmt()],
        ),
        module(
            "main",
            vec![
                use_("palette", None),
                func(
                    "show",
                    vec![param("c", qualified_ty("palette", "Color"))],
                    ty("void"),
                    vec![switch(
                        ident("c"),
                        vec![case(
                            vec![member(qualified("palette", "Color"), "Red")],
                            vec![],
                        )],
                        None,
                    )],
                )
                .stmt(),
            ],
        ),
    ]);
    assert_eq!(tags(&result), vec![type_codes::NON_EXHAUSTIVE_SWITCH]);
    assert_eq!(
        result.diagnostics.diagnostics()[0].note.as_deref(),
        Some("missing: `Color.Green`, `Color.Blue`")
    );
}
