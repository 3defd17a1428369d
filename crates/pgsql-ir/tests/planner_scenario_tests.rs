//! End-to-end scenarios: a planner building statements and a rewrite pass
//! coalescing relations, exercised through the public API only

use pgsql_ir::expr::{BinOp, CteAttrRef, FieldRef, SelectExpr, SortExpr, Subquery, Var};
use pgsql_ir::test_utils::{int, table, var};
use pgsql_ir::{
    fields, ComparisonOp, ConceptName, ConflictAction, CteNode, InsertQuery, IrConfig, IrError,
    JoinKind, LeafSelect, NodeKind, NodeRef, OnConflict, Operator, QueryTree, RelId, Relation,
    SetOp, SetOperation, SortDirection, Statement, Value,
};

fn op(symbol: &str) -> Operator {
    Operator::lookup(symbol).unwrap()
}

fn rel(node: NodeRef) -> RelId {
    match node {
        NodeRef::Relation(id) => id,
        other => panic!("expected a relation, got {other:?}"),
    }
}

/// SELECT u.name FROM User u JOIN Issue i ON u.id = i.owner ORDER BY u.name DESC
fn build_user_issue_query(tree: &mut QueryTree) -> (RelId, RelId, RelId) {
    let users = table(tree, "User");
    let issues = table(tree, "Issue");

    let uid = tree
        .add_expr(FieldRef {
            table: Some(users),
            field: Some("id".to_string()),
            origin: None,
            origin_field: None,
            indirection: vec![],
        })
        .unwrap();
    let owner = tree
        .add_expr(FieldRef {
            table: Some(issues),
            field: Some("owner".to_string()),
            origin: None,
            origin_field: None,
            indirection: vec![],
        })
        .unwrap();
    let cond = tree
        .add_expr(BinOp {
            left: uid,
            op: op("="),
            right: owner,
            aggregates: false,
            strong: true,
        })
        .unwrap();
    let join = rel(tree
        .construct(
            NodeKind::Join,
            fields([
                ("left", Value::Relation(users)),
                ("right", Value::Relation(issues)),
                ("condition", Value::Expr(cond)),
            ]),
        )
        .unwrap());

    let name = var(tree, "name");
    let target = tree
        .add_expr(SelectExpr {
            expr: name,
            alias: Some("name".to_string()),
            filter_expr: None,
        })
        .unwrap();
    let order = tree
        .add_expr(SortExpr {
            expr: name,
            direction: SortDirection::Desc,
            nulls_order: None,
        })
        .unwrap();

    let query = tree
        .add_relation(Relation::with_concepts(
            [ConceptName::new("User")],
            LeafSelect {
                fromlist: vec![join],
                targets: vec![target],
                orderby: vec![order],
                ..LeafSelect::default()
            },
        ))
        .unwrap();

    tree.add_bond(users, "User.id", uid).unwrap();
    tree.add_bond(issues, "User.id", owner).unwrap();

    (query, users, issues)
}

#[test]
fn test_planner_builds_join_query() {
    let mut tree = QueryTree::new();
    let (query, users, issues) = build_user_issue_query(&mut tree);

    let walked = tree.descendants(query.into()).unwrap();
    assert!(walked.contains(&NodeRef::Relation(users)));
    assert!(walked.contains(&NodeRef::Relation(issues)));

    let fromlist = tree.get_field(query.into(), "fromlist").unwrap();
    let join = fromlist.as_list().unwrap()[0].as_relation().unwrap();
    let join_node = tree.relation(join).unwrap().as_join().unwrap();
    assert_eq!(join_node.join_type, JoinKind::Inner);
    assert_eq!(join_node.left, users);
}

#[test]
fn test_rewrite_pass_coalesces_bonds() {
    let mut tree = QueryTree::new();
    let (query, users, issues) = build_user_issue_query(&mut tree);

    // Flatten both sides of the join into the query
    tree.update_bonds(query, users).unwrap();
    tree.update_bonds(query, issues).unwrap();

    let user_bonds = tree.bonds(users, "User.id").unwrap();
    let issue_bonds = tree.bonds(issues, "User.id").unwrap();
    let merged = tree.bonds(query, "User.id").unwrap();

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0], user_bonds[0]);
    assert_eq!(merged[1], issue_bonds[0]);
    assert_eq!(user_bonds.len(), 1);
    assert!(tree.bonds(query, "Issue.id").unwrap().is_empty());
}

#[test]
fn test_bond_snapshot_survives_later_merges() {
    let mut tree = QueryTree::new();
    let (query, users, _) = build_user_issue_query(&mut tree);

    let before = tree.bonds(users, "User.id").unwrap();
    tree.update_bonds(users, query).unwrap();
    let extra = int(&mut tree, 1);
    tree.add_bond(users, "User.id", extra).unwrap();

    assert_eq!(before.len(), 1);
    assert_eq!(tree.bonds(users, "User.id").unwrap().len(), 2);
}

#[test]
fn test_recursive_cte_with_set_operation() {
    let mut tree = QueryTree::new();
    let base = rel(tree
        .construct(NodeKind::SelectQuery, fields([("distinct", Value::Bool(false))]))
        .unwrap());
    let step = rel(tree
        .construct(NodeKind::SelectQuery, Default::default())
        .unwrap());

    let body = SetOperation {
        op: SetOp::Union,
        larg: base,
        rarg: step,
        recursive: true,
    };
    let cte = tree
        .add_relation(Relation::new(CteNode::new(body)).with_alias("tree"))
        .unwrap();
    let attr = tree
        .add_expr(CteAttrRef {
            cte,
            attr: "parent".to_string(),
        })
        .unwrap();

    let outer = rel(tree
        .construct(NodeKind::SelectQuery, fields([("targets", Value::from(vec![attr]))]))
        .unwrap());
    tree.add_cte(outer, cte).unwrap();

    assert_eq!(
        tree.get_field(cte.into(), "op").unwrap(),
        Value::from(SetOp::Union)
    );
    assert_eq!(tree.get_field(cte.into(), "recursive").unwrap(), Value::Bool(true));
    assert!(tree.unreferenced_ctes(outer).unwrap().is_empty());
    assert_eq!(tree.cte_referrers(cte).unwrap(), vec![NodeRef::Expr(attr)]);
}

#[test]
fn test_zero_referrer_cte_waits_for_prune() {
    let mut tree = QueryTree::new();
    let outer = rel(tree
        .construct(NodeKind::SelectQuery, Default::default())
        .unwrap());
    let cte = rel(tree.construct(NodeKind::Cte, Default::default()).unwrap());
    tree.add_cte(outer, cte).unwrap();

    let reference = tree.cte_ref(cte).unwrap();
    tree.remove(reference.into()).unwrap();

    // Still listed until a pass removes it
    assert_eq!(tree.ctes(outer).unwrap(), vec![cte]);
    assert_eq!(tree.unreferenced_ctes(outer).unwrap(), vec![cte]);

    for dead in tree.unreferenced_ctes(outer).unwrap() {
        tree.relation_mut(outer)
            .unwrap()
            .ctes_mut()
            .unwrap()
            .shift_remove(&dead);
        tree.remove(dead.into()).unwrap();
    }
    assert!(tree.ctes(outer).unwrap().is_empty());
}

#[test]
fn test_upsert_with_single_on_conflict_clause() {
    let mut tree = QueryTree::new();
    let users = table(&mut tree, "User");
    let name = var(&mut tree, "name");
    let source = rel(tree
        .construct(NodeKind::SelectQuery, fields([("targets", Value::from(vec![name]))]))
        .unwrap());

    let clause = OnConflict {
        action: ConflictAction::Update,
        infer: Some(name),
        targets: vec![],
        where_clause: None,
    };
    let insert = tree
        .add_statement(InsertQuery {
            fromexpr: users,
            cols: vec![name],
            select: Some(source),
            targets: vec![],
            subquery_referrers: vec![],
            alias: None,
            ctes: Default::default(),
            on_conflict: Some(clause.clone()),
            concept_node_map: Default::default(),
        })
        .unwrap();

    let stored = tree.get_field(insert.into(), "on_conflict").unwrap();
    assert_eq!(stored, Value::from(clause));
    assert!(tree
        .children(insert.into())
        .unwrap()
        .contains(&NodeRef::Expr(name)));

    match tree.statement(insert).unwrap() {
        Statement::Insert(node) => assert_eq!(node.select, Some(source)),
        other => panic!("expected an insert, got {other:?}"),
    }
}

#[test]
fn test_subquery_in_expression_position() {
    let mut tree = QueryTree::new();
    let inner = rel(tree
        .construct(NodeKind::SelectQuery, Default::default())
        .unwrap());
    let sub = tree.add_expr(Subquery { query: inner }).unwrap();
    assert_eq!(tree.children(sub.into()).unwrap(), vec![NodeRef::Relation(inner)]);
}

#[test]
fn test_insert_requires_target_relation() {
    let mut tree = QueryTree::new();
    let err = tree.construct(NodeKind::Insert, Default::default()).unwrap_err();
    assert!(matches!(
        err,
        IrError::MissingField {
            node: "InsertQuery",
            field: "fromexpr"
        }
    ));
}

#[test]
fn test_operator_tokens_are_canonical() {
    let a = Operator::intern("~~").unwrap();
    let b = Operator::intern("~~").unwrap();
    assert!(std::ptr::eq(a, b));
    assert_ne!(op("~~"), op("~~*"));
    assert_eq!(op("~~"), Operator::Comparison(ComparisonOp::Like));
    assert_eq!(
        Operator::Comparison(ComparisonOp::Like).symbol(),
        "~~"
    );
    assert!(Operator::intern("<=>").is_none());
}

#[test]
fn test_operator_token_serialization() {
    let json = serde_json::to_string(&op("UNION")).unwrap();
    let back: Operator = serde_json::from_str(&json).unwrap();
    assert_eq!(back, op("union"));
}

#[test]
fn test_config_file_drives_tree() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pgsql-ir.yml");
    std::fs::write(&path, "validate_references: false\n").unwrap();

    let config = IrConfig::load(&path).unwrap();
    let mut tree = QueryTree::with_config(config);
    let a = tree
        .add_expr(Var {
            name: "a".to_string(),
        })
        .unwrap();
    tree.remove(a.into()).unwrap();

    assert!(tree
        .add_expr(SelectExpr {
            expr: a,
            alias: None,
            filter_expr: None,
        })
        .is_ok());
}
