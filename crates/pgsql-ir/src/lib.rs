//! pgsql-ir - PostgreSQL output IR for the query compiler
//!
//! This crate provides the node taxonomy the planner builds and the SQL
//! renderer consumes: expression, relation and DML nodes stored in a
//! generational-arena [`QueryTree`], a canonical operator registry, and the
//! per-relation bond registry rewrite passes use to keep join keys
//! correlated.

pub mod bonds;
pub mod config;
pub mod dml;
pub mod error;
pub mod expr;
pub mod fields;
pub mod interop;
pub mod names;
pub mod node;
pub mod ops;
pub mod relation;
pub mod select;
pub mod tree;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;

pub use bonds::BondRegistry;
pub use config::IrConfig;
pub use dml::{DeleteQuery, InsertQuery, OnConflict, Statement, UpdateQuery};
pub use error::{IrError, IrResult};
pub use expr::{Expr, LiteralValue};
pub use fields::{fields, FieldDecl, FieldType, FieldValue, Fields, NodeFields, Value};
pub use names::{BondKey, ConceptName};
pub use node::{ExprId, NodeFamily, NodeKind, NodeRef, RelId, StmtId};
pub use ops::{
    ArithmeticOp, ComparisonOp, ConflictAction, JoinKind, LogicalOp, NullsOrder, Operator, SetOp,
    SortDirection,
};
pub use relation::{
    Composite, Join, PseudoRelation, Relation, RelationBase, RelationKind, Table, TableQuery,
};
pub use select::{CteNode, LeafSelect, SelectQuery, SetOperation};
pub use tree::QueryTree;
