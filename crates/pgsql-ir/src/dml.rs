//! DML statements: INSERT, UPDATE and DELETE
//!
//! Statements are not relations: they do not feed rows into further
//! composition, so they carry no bond registry. They reuse the relational
//! bookkeeping (CTE collection, target list, concept map) of select queries.

use crate::error::{IrError, IrResult};
use crate::fields::{define_node, FieldDecl, Fields, NodeFields, Value};
use crate::names::ConceptName;
use crate::node::{ExprId, NodeKind, NodeRef, RelId};
use crate::ops::ConflictAction;
use indexmap::{IndexMap, IndexSet};

define_node! {
    /// The single ON CONFLICT clause of an upsert
    pub struct OnConflict {
        action: ConflictAction,
        /// Conflict target inference (index expressions or constraint)
        infer: Option<ExprId>,
        /// SET list for DO UPDATE
        targets: Vec<ExprId>,
        where_clause: Option<ExprId>,
    }
}

define_node! {
    pub struct InsertQuery {
        /// Target relation
        fromexpr: RelId,
        cols: Vec<ExprId>,
        /// Row source (SELECT or VALUES)
        select: Option<RelId>,
        /// RETURNING list
        targets: Vec<ExprId>,
        subquery_referrers: Vec<RelId>,
        alias: Option<String>,
        ctes: IndexSet<RelId>,
        on_conflict: Option<OnConflict>,
        concept_node_map: IndexMap<ConceptName, RelId>,
    }
}

define_node! {
    pub struct UpdateQuery {
        /// Target relation
        fromexpr: RelId,
        /// [`UpdateExpr`](crate::expr::UpdateExpr) assignments, in order.
        /// The same target may appear more than once.
        values: Vec<ExprId>,
        where_clause: Option<ExprId>,
        targets: Vec<ExprId>,
        subquery_referrers: Vec<RelId>,
        ctes: IndexSet<RelId>,
        concept_node_map: IndexMap<ConceptName, RelId>,
        alias: Option<String>,
    }
}

define_node! {
    pub struct DeleteQuery {
        /// Target relation
        fromexpr: RelId,
        where_clause: Option<ExprId>,
        targets: Vec<ExprId>,
        subquery_referrers: Vec<RelId>,
        ctes: IndexSet<RelId>,
        alias: Option<String>,
        /// Relations joined only to restrict the deleted rows
        using: Vec<RelId>,
        concept_node_map: IndexMap<ConceptName, RelId>,
    }
}

/// DML statement node
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Insert(InsertQuery),
    Update(UpdateQuery),
    Delete(DeleteQuery),
}

macro_rules! each_statement {
    ($stmt:expr, $node:ident => $body:expr) => {
        match $stmt {
            Statement::Insert($node) => $body,
            Statement::Update($node) => $body,
            Statement::Delete($node) => $body,
        }
    };
}

impl Statement {
    pub fn kind(&self) -> NodeKind {
        match self {
            Statement::Insert(_) => NodeKind::Insert,
            Statement::Update(_) => NodeKind::Update,
            Statement::Delete(_) => NodeKind::Delete,
        }
    }

    /// Relation the statement writes to
    pub fn fromexpr(&self) -> RelId {
        each_statement!(self, n => n.fromexpr)
    }

    pub fn targets(&self) -> &[ExprId] {
        each_statement!(self, n => &n.targets)
    }

    pub fn ctes(&self) -> &IndexSet<RelId> {
        each_statement!(self, n => &n.ctes)
    }

    pub fn ctes_mut(&mut self) -> &mut IndexSet<RelId> {
        each_statement!(self, n => &mut n.ctes)
    }

    pub fn concept_node_map(&self) -> &IndexMap<ConceptName, RelId> {
        each_statement!(self, n => &n.concept_node_map)
    }

    /// Subqueries that must be rendered ahead of the statement
    pub fn subquery_referrers(&self) -> &[RelId] {
        each_statement!(self, n => &n.subquery_referrers)
    }

    pub fn alias(&self) -> Option<&str> {
        each_statement!(self, n => n.alias.as_deref())
    }

    pub fn declared_fields(kind: NodeKind) -> Option<&'static [FieldDecl]> {
        match kind {
            NodeKind::Insert => Some(InsertQuery::FIELDS),
            NodeKind::Update => Some(UpdateQuery::FIELDS),
            NodeKind::Delete => Some(DeleteQuery::FIELDS),
            _ => None,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        each_statement!(self, n => n.get_field(name))
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> IrResult<()> {
        let node = self.kind().name();
        if each_statement!(self, n => n.set_field(name, value))? {
            Ok(())
        } else {
            Err(IrError::UnknownField {
                node,
                field: name.to_string(),
            })
        }
    }

    pub fn children(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        each_statement!(self, n => n.collect_refs(&mut out));
        out
    }

    /// Build a statement of `kind` from named fields.
    /// Returns `None` when `kind` is not a statement kind.
    pub(crate) fn from_fields(kind: NodeKind, fields: Fields) -> Option<IrResult<Statement>> {
        Some(match kind {
            NodeKind::Insert => InsertQuery::from_fields(fields).map(Statement::Insert),
            NodeKind::Update => UpdateQuery::from_fields(fields).map(Statement::Update),
            NodeKind::Delete => DeleteQuery::from_fields(fields).map(Statement::Delete),
            _ => return None,
        })
    }
}

impl From<InsertQuery> for Statement {
    fn from(node: InsertQuery) -> Self {
        Statement::Insert(node)
    }
}

impl From<UpdateQuery> for Statement {
    fn from(node: UpdateQuery) -> Self {
        Statement::Update(node)
    }
}

impl From<DeleteQuery> for Statement {
    fn from(node: DeleteQuery) -> Self {
        Statement::Delete(node)
    }
}
