//! SELECT queries and CTEs
//!
//! A select query is either a leaf SELECT or a binary set operation over two
//! other relations. The two shapes are separate variants so the renderer
//! never has to guess which fields are populated.

use crate::error::IrResult;
use crate::fields::{define_node, FieldDecl, Fields, NodeFields, Value};
use crate::names::ConceptName;
use crate::node::{ExprId, NodeRef, RelId};
use crate::ops::SetOp;
use indexmap::{IndexMap, IndexSet};

define_node! {
    /// Leaf SELECT
    #[derive(Default)]
    pub struct LeafSelect {
        distinct: bool,
        fromlist: Vec<RelId>,
        targets: Vec<ExprId>,
        where_clause: Option<ExprId>,
        /// Conditions that may be dropped when the query is merged into an
        /// outer one
        where_weak: Option<ExprId>,
        /// Conditions that must survive any merge
        where_strong: Option<ExprId>,
        from_only: bool,
        /// VALUES rows when the query is a literal row set
        values: Vec<ExprId>,
        orderby: Vec<ExprId>,
        offset: Option<ExprId>,
        limit: Option<ExprId>,
        groupby: Vec<ExprId>,
        having: Option<ExprId>,
        /// CTEs owned by this query, in definition order
        ctes: IndexSet<RelId>,
        concept_node_map: IndexMap<ConceptName, RelId>,
        link_node_map: IndexMap<ConceptName, RelId>,
        linkmap: IndexMap<ConceptName, RelId>,
        /// Subqueries that must be rendered before this one
        subquery_referrers: Vec<RelId>,
        text_override: Option<String>,
        scls_rel: Option<RelId>,
        rptr_rel: Option<RelId>,
    }
}

define_node! {
    /// `larg <op> rarg`
    pub struct SetOperation {
        op: SetOp,
        larg: RelId,
        rarg: RelId,
        recursive: bool,
    }
}

/// Field names that only a set operation declares
const SET_OPERATION_ONLY: [&str; 4] = ["op", "larg", "rarg", "recursive"];

/// SELECT-producing relation body
#[derive(Debug, Clone, PartialEq)]
pub enum SelectQuery {
    Leaf(LeafSelect),
    SetOperation(SetOperation),
}

impl SelectQuery {
    pub fn is_set_operation(&self) -> bool {
        matches!(self, SelectQuery::SetOperation(_))
    }

    pub fn as_leaf(&self) -> Option<&LeafSelect> {
        match self {
            SelectQuery::Leaf(leaf) => Some(leaf),
            SelectQuery::SetOperation(_) => None,
        }
    }

    pub fn as_leaf_mut(&mut self) -> Option<&mut LeafSelect> {
        match self {
            SelectQuery::Leaf(leaf) => Some(leaf),
            SelectQuery::SetOperation(_) => None,
        }
    }

    /// CTE collection, present on leaf selects only
    pub fn ctes(&self) -> Option<&IndexSet<RelId>> {
        self.as_leaf().map(|leaf| &leaf.ctes)
    }

    pub fn declared_fields(&self) -> &'static [FieldDecl] {
        match self {
            SelectQuery::Leaf(_) => LeafSelect::FIELDS,
            SelectQuery::SetOperation(_) => SetOperation::FIELDS,
        }
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        match self {
            SelectQuery::Leaf(leaf) => leaf.get_field(name),
            SelectQuery::SetOperation(setop) => setop.get_field(name),
        }
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> IrResult<bool> {
        match self {
            SelectQuery::Leaf(leaf) => leaf.set_field(name, value),
            SelectQuery::SetOperation(setop) => setop.set_field(name, value),
        }
    }

    pub fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        match self {
            SelectQuery::Leaf(leaf) => leaf.collect_refs(out),
            SelectQuery::SetOperation(setop) => setop.collect_refs(out),
        }
    }

    /// Take the fields of whichever shape the supplied names select.
    ///
    /// Any set-operation-only name picks the set-operation shape; leaf
    /// fields supplied alongside it are then left behind and reported as
    /// unknown by the caller.
    pub fn take_fields(fields: &mut Fields) -> IrResult<Self> {
        if SET_OPERATION_ONLY
            .iter()
            .any(|name| fields.contains_key(*name))
        {
            SetOperation::take_fields(fields).map(SelectQuery::SetOperation)
        } else {
            LeafSelect::take_fields(fields).map(SelectQuery::Leaf)
        }
    }
}

impl Default for SelectQuery {
    fn default() -> Self {
        SelectQuery::Leaf(LeafSelect::default())
    }
}

impl From<LeafSelect> for SelectQuery {
    fn from(leaf: LeafSelect) -> Self {
        SelectQuery::Leaf(leaf)
    }
}

impl From<SetOperation> for SelectQuery {
    fn from(setop: SetOperation) -> Self {
        SelectQuery::SetOperation(setop)
    }
}

/// Common table expression: a select query plus the handles of the nodes
/// that refer to it.
///
/// Referrers are diagnostic only. They neither keep the CTE alive nor
/// prevent its removal; the owning query's `ctes` collection decides that.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CteNode {
    pub query: SelectQuery,
    referrers: IndexSet<NodeRef>,
}

impl CteNode {
    pub fn new(query: impl Into<SelectQuery>) -> Self {
        Self {
            query: query.into(),
            referrers: IndexSet::new(),
        }
    }

    /// Recorded referrer handles, in registration order. Handles may be
    /// dangling; [`QueryTree::cte_referrers`](crate::QueryTree::cte_referrers)
    /// filters those out.
    pub fn referrers(&self) -> impl Iterator<Item = NodeRef> + '_ {
        self.referrers.iter().copied()
    }

    pub(crate) fn add_referrer(&mut self, node: NodeRef) {
        self.referrers.insert(node);
    }

    /// Drop a referrer handle; returns whether it was recorded
    pub fn forget_referrer(&mut self, node: NodeRef) -> bool {
        self.referrers.shift_remove(&node)
    }

    pub(crate) fn retain_referrers(&mut self, keep: impl FnMut(&NodeRef) -> bool) {
        self.referrers.retain(keep);
    }
}
