use super::*;
use proptest::prelude::*;
use TypeMatchResult::*;

fn int() -> Type {
    Type::int()
}

fn float() -> Type {
    Type::basic("float")
}

fn char_ptr() -> Type {
    Type::pointer(Type::basic("char"))
}

fn int_array(size: Option<i64>) -> Type {
    Type::array(int(), size.map(ArraySize::Literal))
}

fn point(table: &mut StructTable) -> Type {
    let id = table.reserve("Point", "geo", true);
    Type::Struct {
        id,
        name: "Point".to_string(),
    }
}

#[test]
fn test_identical_basic_types_are_exact() {
    assert_eq!(types_match(&int(), &int()), Exact);
    assert_eq!(types_match(&Type::bool(), &Type::bool()), Exact);
}

#[test]
fn test_numeric_widening_is_compatible() {
    assert_eq!(types_match(&int(), &float()), Compatible);
    assert_eq!(types_match(&float(), &int()), Compatible);
    assert_eq!(types_match(&Type::basic("double"), &float()), Compatible);
}

#[test]
fn test_enum_int_bridge() {
    let color = Type::basic("Color");
    assert_eq!(types_match(&color, &int()), Compatible);
    assert_eq!(types_match(&int(), &color), Compatible);
    assert_eq!(types_match(&color, &float()), Incompatible);
    assert_eq!(types_match(&color, &Type::basic("Shape")), Incompatible);
}

#[test]
fn test_string_and_char_pointer() {
    let string = Type::basic("string");
    assert_eq!(types_match(&string, &char_ptr()), Compatible);
    assert_eq!(types_match(&char_ptr(), &string), Compatible);
    assert_eq!(
        types_match(&string, &Type::pointer(int())),
        Incompatible
    );
}

#[test]
fn test_unrelated_basics_do_not_match() {
    assert_eq!(types_match(&int(), &Type::bool()), Incompatible);
    assert_eq!(types_match(&Type::basic("string"), &int()), Incompatible);
}

#[test]
fn test_pointer_inherits_pointee_result() {
    let p_int = Type::pointer(int());
    let p_float = Type::pointer(float());
    assert_eq!(types_match(&p_int, &p_int.clone()), Exact);
    assert_eq!(types_match(&p_int, &p_float), Compatible);
    assert_eq!(
        types_match(&p_int, &Type::pointer(Type::bool())),
        Incompatible
    );
}

#[test]
fn test_array_sizes() {
    assert_eq!(types_match(&int_array(Some(3)), &int_array(Some(3))), Exact);
    assert_eq!(
        types_match(&int_array(Some(3)), &int_array(Some(4))),
        Incompatible
    );
    assert_eq!(types_match(&int_array(Some(3)), &int_array(None)), Exact);
    assert_eq!(types_match(&int_array(None), &int_array(Some(3))), Exact);
}

#[test]
fn test_symbolic_array_size_matches_any_length() {
    let sized = int_array(Some(8));
    let symbolic = Type::array(int(), Some(ArraySize::Symbolic("N".to_string())));
    assert_eq!(types_match(&sized, &symbolic), Exact);
}

#[test]
fn test_array_element_mismatch() {
    let bools = Type::array(Type::bool(), Some(ArraySize::Literal(3)));
    assert_eq!(types_match(&int_array(Some(3)), &bools), Incompatible);
}

#[test]
fn test_array_decays_to_pointer() {
    let p_int = Type::pointer(int());
    assert_eq!(types_match(&int_array(Some(4)), &p_int), Exact);
    assert_eq!(types_match(&p_int, &int_array(None)), Exact);
    assert_eq!(
        types_match(&int_array(Some(4)), &Type::pointer(Type::bool())),
        Incompatible
    );
}

#[test]
fn test_structs_are_nominal() {
    let mut table = StructTable::new();
    let a = point(&mut table);
    let b = Type::Struct {
        id: StructId(99),
        name: "Point".to_string(),
    };
    let other = Type::Struct {
        id: table.reserve("Vec2", "geo", true),
        name: "Vec2".to_string(),
    };
    assert_eq!(types_match(&a, &b), Exact);
    assert_eq!(types_match(&a, &other), Incompatible);
}

#[test]
fn test_type_to_string() {
    let mut table = StructTable::new();
    assert_eq!(type_to_string(&int()), "int");
    assert_eq!(type_to_string(&Type::pointer(int())), "int*");
    assert_eq!(type_to_string(&int_array(Some(3))), "int[]");
    assert_eq!(type_to_string(&point(&mut table)), "struct Point");
    assert_eq!(
        type_to_string(&Type::function(vec![int(), float()], Type::void())),
        "fn(2 params) -> void"
    );
}

#[test]
fn test_predicates() {
    assert!(is_numeric_type(&Type::basic("double")));
    assert!(!is_numeric_type(&Type::basic("Color")));
    assert!(is_pointer_type(&char_ptr()));
    assert!(is_array_type(&int_array(None)));
    assert!(Type::basic("Color").is_enum_like());
    assert!(!Type::basic("bool").is_enum_like());
    assert!(is_integer_like(&Type::basic("Color")));
    assert!(!is_integer_like(&float()));
}

#[test]
fn test_promote_numeric() {
    assert_eq!(promote_numeric(&int(), &int()), Some(int()));
    assert_eq!(promote_numeric(&int(), &float()), Some(float()));
    assert_eq!(
        promote_numeric(&Type::basic("double"), &int()),
        Some(Type::basic("double"))
    );
    assert_eq!(promote_numeric(&int(), &Type::bool()), None);
}

#[test]
fn test_struct_two_phase_build() {
    let mut table = StructTable::new();
    let node = table.reserve("Node", "list", true);
    let self_ptr = Type::pointer(Type::Struct {
        id: node,
        name: "Node".to_string(),
    });

    let shell = table.get(node).unwrap();
    assert!(!shell.is_finalized());
    assert!(shell.members().is_empty());

    let mut builder = StructBuilder::new(node);
    assert!(builder.field("value", int(), true));
    assert!(builder.field("next", self_ptr.clone(), false));
    assert!(!builder.field("value", float(), true));
    assert!(builder.method(
        "len",
        Type::function(vec![self_ptr.clone()], int()),
        true,
        MemberKind::Method {
            has_self: true,
            returns_ownership: false,
            takes_ownership: false,
            owned_params: vec![false],
        },
    ));
    assert!(table.finalize(builder));

    let def = table.get(node).unwrap();
    assert!(def.is_finalized());
    assert_eq!(def.fields().count(), 2);
    assert_eq!(def.methods().count(), 1);
    assert_eq!(def.member("next").unwrap().ty, self_ptr);
    assert!(!def.member("next").unwrap().is_public);
    assert!(def.member("len").unwrap().is_method());

    // Members are installed once
    assert!(!table.finalize(StructBuilder::new(node)));
    assert_eq!(table.get(node).unwrap().members().len(), 3);
}

fn arb_type() -> impl Strategy<Value = Type> {
    let leaf = prop_oneof![
        Just(Type::int()),
        Just(Type::basic("float")),
        Just(Type::basic("double")),
        Just(Type::bool()),
        Just(Type::basic("char")),
        Just(Type::basic("string")),
        Just(Type::basic("Color")),
        Just(Type::Struct {
            id: StructId(0),
            name: "Point".to_string()
        }),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            inner.clone().prop_map(Type::pointer),
            (inner.clone(), proptest::option::of(0i64..4)).prop_map(|(el, size)| {
                Type::array(el, size.map(ArraySize::Literal))
            }),
            (proptest::collection::vec(inner.clone(), 0..3), inner)
                .prop_map(|(params, ret)| Type::function(params, ret)),
        ]
    })
}

proptest! {
    #[test]
    fn prop_types_match_is_reflexive(t in arb_type()) {
        prop_assert_eq!(types_match(&t, &t), Exact);
    }

    #[test]
    fn prop_types_match_is_symmetric(a in arb_type(), b in arb_type()) {
        prop_assert_eq!(types_match(&a, &b), types_match(&b, &a));
    }
}
