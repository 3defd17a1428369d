//! Shared test utilities for pgsql-ir

use crate::expr::{Constant, Expr, Ignore, LiteralExpr, Var};
use crate::names::ConceptName;
use crate::node::{ExprId, RelId};
use crate::relation::{Relation, Table};
use crate::select::{CteNode, LeafSelect};
use crate::tree::QueryTree;
use crate::LiteralValue;
use typed_generational_arena::StandardArena;

/// `N` distinct expression handles that do not belong to any tree.
///
/// Enough for exercising bond registries, which only store handles.
pub fn expr_ids<const N: usize>() -> [ExprId; N] {
    let mut arena: StandardArena<Expr> = StandardArena::new();
    std::array::from_fn(|_| arena.insert(Expr::Ignore(Ignore {})))
}

/// Allocate a column variable
pub fn var(tree: &mut QueryTree, name: &str) -> ExprId {
    tree.add_expr(Var {
        name: name.to_string(),
    })
    .unwrap()
}

/// Allocate an integer constant
pub fn int(tree: &mut QueryTree, value: i64) -> ExprId {
    tree.add_expr(Constant {
        value: LiteralValue::Integer(value),
        index: None,
        expr: None,
        type_name: None,
        origin_field: None,
    })
    .unwrap()
}

/// Allocate a raw SQL fragment
pub fn raw(tree: &mut QueryTree, sql: &str) -> ExprId {
    tree.add_expr(LiteralExpr {
        expr: sql.to_string(),
    })
    .unwrap()
}

/// Allocate a table materializing a concept of the same name
pub fn table(tree: &mut QueryTree, name: &str) -> RelId {
    let relation = Relation::with_concepts(
        [ConceptName::new(name)],
        Table {
            name: name.to_string(),
            schema: None,
        },
    );
    tree.add_relation(relation).unwrap()
}

/// Allocate an empty leaf SELECT
pub fn select(tree: &mut QueryTree) -> RelId {
    tree.add_relation(Relation::new(LeafSelect::default()))
        .unwrap()
}

/// Allocate a CTE over an empty leaf SELECT
pub fn cte(tree: &mut QueryTree, alias: &str) -> RelId {
    tree.add_relation(Relation::new(CteNode::new(LeafSelect::default())).with_alias(alias))
        .unwrap()
}
