use super::*;
use crate::expr::{BinOp, Constant, FieldRef, FunctionCall, Ignore, SortExpr, Var};
use crate::ops::ComparisonOp;
use crate::select::SetOperation;
use crate::test_utils::expr_ids;

fn eq() -> Operator {
    Operator::Comparison(ComparisonOp::Eq)
}

// ===== Field tables =====

#[test]
fn test_requiredness_follows_field_type() {
    let decls = BinOp::FIELDS;
    let by_name = |n: &str| decls.iter().find(|d| d.name == n).copied().unwrap();

    assert!(by_name("left").required);
    assert!(by_name("op").required);
    assert!(!by_name("aggregates").required);
    assert_eq!(by_name("left").ty, FieldType::Expr);
    assert_eq!(by_name("op").ty, FieldType::Operator);
}

#[test]
fn test_optional_fields_are_nullable() {
    let decl = FieldRef::FIELDS
        .iter()
        .find(|d| d.name == "table")
        .unwrap();
    assert!(decl.nullable);
    assert!(!decl.required);
    assert_eq!(decl.ty, FieldType::Relation);
}

#[test]
fn test_explicit_default_is_not_required() {
    let decl = SortExpr::FIELDS
        .iter()
        .find(|d| d.name == "direction")
        .unwrap();
    assert!(!decl.required);
    assert!(!decl.nullable);
}

#[test]
fn test_literal_field_encodes_null() {
    let decl = Constant::FIELDS
        .iter()
        .find(|d| d.name == "value")
        .unwrap();
    assert!(decl.nullable);
    assert!(!decl.required);
    assert!(<LiteralValue as FieldValue>::NULLABLE);
}

#[test]
fn test_fields_keep_declaration_order() {
    let names: Vec<_> = SetOperation::FIELDS.iter().map(|d| d.name).collect();
    assert_eq!(names, vec!["op", "larg", "rarg", "recursive"]);
}

// ===== Construction =====

#[test]
fn test_from_fields_fills_defaults() {
    let [left, right] = expr_ids::<2>();
    let node = BinOp::from_fields(fields([
        ("left", Value::Expr(left)),
        ("op", Value::Operator(eq())),
        ("right", Value::Expr(right)),
    ]))
    .unwrap();

    assert_eq!(node.left, left);
    assert_eq!(node.right, right);
    assert!(!node.aggregates);
    assert!(!node.strong);
}

#[test]
fn test_from_fields_unknown_field() {
    let err = Var::from_fields(fields([
        ("name", Value::from("x")),
        ("colour", Value::from("red")),
    ]))
    .unwrap_err();

    assert!(err.is_field_error());
    assert!(matches!(err, IrError::UnknownField { ref field, .. } if field == "colour"));
}

#[test]
fn test_from_fields_missing_required() {
    let [left] = expr_ids::<1>();
    let err = BinOp::from_fields(fields([
        ("left", Value::Expr(left)),
        ("op", Value::Operator(eq())),
    ]))
    .unwrap_err();

    assert!(err.is_field_error());
    assert!(matches!(
        err,
        IrError::MissingField {
            node: "BinOp",
            field: "right"
        }
    ));
}

#[test]
fn test_from_fields_type_mismatch() {
    let err = Var::from_fields(fields([("name", Value::Int(3))])).unwrap_err();
    assert!(err.is_type_mismatch());
    assert!(!err.is_field_error());
}

#[test]
fn test_null_rejected_for_required_field() {
    let err = Var::from_fields(fields([("name", Value::Null)])).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn test_null_accepted_for_optional_field() {
    let node = FieldRef::from_fields(fields([("table", Value::Null)])).unwrap();
    assert_eq!(node.table, None);
    assert!(node.indirection.is_empty());
}

#[test]
fn test_literal_default_and_override() {
    let node = Constant::from_fields(Fields::new()).unwrap();
    assert_eq!(node.value, LiteralValue::Null);

    let node = Constant::from_fields(fields([("value", Value::Int(7))])).unwrap();
    assert_eq!(node.value, LiteralValue::Integer(7));
}

#[test]
fn test_list_of_handles() {
    let [a, b] = expr_ids::<2>();
    let node = FunctionCall::from_fields(fields([
        ("name", Value::from("coalesce")),
        ("args", Value::from(vec![a, b])),
    ]))
    .unwrap();
    assert_eq!(node.args, vec![a, b]);
}

#[test]
fn test_list_with_wrong_element_type() {
    let [a] = expr_ids::<1>();
    let err = FunctionCall::from_fields(fields([
        ("name", Value::from("coalesce")),
        ("args", Value::List(vec![Value::Expr(a), Value::Int(1)])),
    ]))
    .unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn test_set_op_field_rejects_other_operator_families() {
    let err = SetOperation::from_fields(fields([("op", Value::Operator(eq()))])).unwrap_err();
    assert!(err.is_type_mismatch());
}

#[test]
fn test_empty_node_constructs() {
    assert_eq!(Ignore::from_fields(Fields::new()).unwrap(), Ignore {});
    let err = Ignore::from_fields(fields([("x", Value::Null)])).unwrap_err();
    assert!(err.is_field_error());
}

// ===== Get / set =====

#[test]
fn test_get_and_set_by_name() {
    let [a, b] = expr_ids::<2>();
    let mut node = SortExpr {
        expr: a,
        direction: SortDirection::Default,
        nulls_order: None,
    };

    assert_eq!(node.get_field("expr"), Some(Value::Expr(a)));
    assert_eq!(node.get_field("nulls_order"), Some(Value::Null));
    assert_eq!(node.get_field("nope"), None);

    assert!(node.set_field("expr", Value::Expr(b)).unwrap());
    assert!(node
        .set_field("direction", Value::SortDirection(SortDirection::Desc))
        .unwrap());
    assert_eq!(node.expr, b);
    assert_eq!(node.direction, SortDirection::Desc);
}

#[test]
fn test_set_unknown_name_reports_false() {
    let mut node = Var {
        name: "x".to_string(),
    };
    assert!(!node.set_field("alias", Value::from("y")).unwrap());
    assert_eq!(node.name, "x");
}

#[test]
fn test_failed_set_leaves_value() {
    let mut node = Var {
        name: "x".to_string(),
    };
    let err = node.set_field("name", Value::Bool(true)).unwrap_err();
    assert!(matches!(
        err,
        IrError::TypeMismatch {
            expected: FieldType::Str,
            found: "bool",
            ..
        }
    ));
    assert_eq!(node.name, "x");
}

// ===== Reference collection =====

#[test]
fn test_collect_refs_in_field_order() {
    let [l, r, o] = expr_ids::<3>();
    let node = FunctionCall {
        name: "sum".to_string(),
        args: vec![l, r],
        over: Some(o),
        aggregates: true,
        noparens: false,
        agg_sort: vec![],
        agg_filter: None,
    };
    let mut out = Vec::new();
    node.collect_refs(&mut out);
    assert_eq!(
        out,
        vec![NodeRef::Expr(l), NodeRef::Expr(r), NodeRef::Expr(o)]
    );
}

#[test]
fn test_value_collect_refs_recurses() {
    let [a, b] = expr_ids::<2>();
    let value = Value::List(vec![
        Value::Int(1),
        Value::Expr(a),
        Value::Map(vec![(Value::from("k"), Value::Expr(b))]),
    ]);
    let mut out = Vec::new();
    value.collect_refs(&mut out);
    assert_eq!(out, vec![NodeRef::Expr(a), NodeRef::Expr(b)]);
}
