//! Relation nodes: everything that produces rows
//!
//! Every relation shares a [`RelationBase`]: the schema entities it
//! materializes, its alias, and the bond registry rewrite passes use to
//! correlate join keys across merged relations.

use crate::bonds::BondRegistry;
use crate::error::{IrError, IrResult};
use crate::fields::{
    convert, define_node, take_field, FieldDecl, FieldValue, Fields, NodeFields, Value,
};
use crate::names::{BondKey, ConceptName};
use crate::node::{ExprId, NodeFamily, NodeKind, NodeRef, RelId};
use crate::ops::JoinKind;
use crate::select::{CteNode, SelectQuery};
use indexmap::{IndexMap, IndexSet};
use std::collections::BTreeSet;

/// Fields shared by every relation kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationBase {
    concepts: BTreeSet<ConceptName>,
    bonds: BondRegistry,
    pub alias: Option<String>,
    /// Bonds exported to an enclosing query, in registration order
    pub outer_bonds: Vec<(BondKey, ExprId)>,
    /// Outer bonds re-exported through a proxy relation
    pub proxy_outer_bonds: IndexMap<BondKey, ExprId>,
    /// The relation's output is aggregated
    pub aggregates: bool,
    /// Column definition list (a `FuncAlias` node)
    pub coldef: Option<ExprId>,
}

impl RelationBase {
    const FIELDS: &'static [FieldDecl] = &[
        FieldDecl::of::<BTreeSet<ConceptName>>("concepts"),
        FieldDecl::of::<Option<String>>("alias"),
        FieldDecl::of::<Vec<(BondKey, ExprId)>>("outer_bonds"),
        FieldDecl::of::<IndexMap<BondKey, ExprId>>("proxy_outer_bonds"),
        FieldDecl::of::<bool>("aggregates"),
        FieldDecl::of::<Option<ExprId>>("coldef"),
    ];

    pub fn new(concepts: impl IntoIterator<Item = ConceptName>) -> Self {
        Self {
            concepts: concepts.into_iter().collect(),
            ..Self::default()
        }
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        Some(match name {
            "concepts" => self.concepts.to_value(),
            "alias" => self.alias.to_value(),
            "outer_bonds" => self.outer_bonds.to_value(),
            "proxy_outer_bonds" => self.proxy_outer_bonds.to_value(),
            "aggregates" => self.aggregates.to_value(),
            "coldef" => self.coldef.to_value(),
            _ => return None,
        })
    }

    fn set_field(&mut self, node: &'static str, name: &str, value: Value) -> IrResult<bool> {
        match name {
            "concepts" => {
                return Err(IrError::ImmutableField {
                    node,
                    field: "concepts",
                })
            }
            "alias" => self.alias = convert(node, name, value)?,
            "outer_bonds" => self.outer_bonds = convert(node, name, value)?,
            "proxy_outer_bonds" => self.proxy_outer_bonds = convert(node, name, value)?,
            "aggregates" => self.aggregates = convert(node, name, value)?,
            "coldef" => self.coldef = convert(node, name, value)?,
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn take_fields(fields: &mut Fields, node: &'static str) -> IrResult<Self> {
        Ok(Self {
            concepts: take_field(fields, node, "concepts")?,
            bonds: BondRegistry::new(),
            alias: take_field(fields, node, "alias")?,
            outer_bonds: take_field(fields, node, "outer_bonds")?,
            proxy_outer_bonds: take_field(fields, node, "proxy_outer_bonds")?,
            aggregates: take_field(fields, node, "aggregates")?,
            coldef: take_field(fields, node, "coldef")?,
        })
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        out.extend(self.bonds.all_bonds().map(NodeRef::Expr));
        self.outer_bonds.collect_refs(out);
        self.proxy_outer_bonds.collect_refs(out);
        self.coldef.collect_refs(out);
    }
}

define_node! {
    /// Named virtual relation without a backing table (e.g. a literal row set)
    pub struct PseudoRelation {
        name: String,
    }
}

define_node! {
    /// Physical table reference
    pub struct Table {
        name: String,
        schema: Option<String>,
    }
}

define_node! {
    /// Physical table scanned as a query source
    pub struct TableQuery {
        name: String,
        schema: Option<String>,
    }
}

define_node! {
    /// Several relations emitted together under one CTE list and
    /// concept map, for statements that need coordinated sub-statements
    pub struct Composite {
        queries: Vec<RelId>,
        ctes: IndexSet<RelId>,
        concept_node_map: IndexMap<ConceptName, RelId>,
    }
}

define_node! {
    pub struct Join {
        left: RelId,
        right: RelId,
        condition: Option<ExprId>,
        join_type: JoinKind = JoinKind::Inner,
    }
}

impl Join {
    /// A join with the same children, condition and kind.
    ///
    /// The children stay shared by handle; condition and kind of the copy can
    /// be changed without touching the original.
    pub fn copy(&self) -> Join {
        Join {
            left: self.left,
            right: self.right,
            condition: self.condition,
            join_type: self.join_type,
        }
    }

    /// Overwrite children, condition and kind with those of `other`
    pub fn copy_from(&mut self, other: &Join) {
        self.left = other.left;
        self.right = other.right;
        self.condition = other.condition;
        self.join_type = other.join_type;
    }
}

/// Kind-specific part of a relation
#[derive(Debug, Clone, PartialEq)]
pub enum RelationKind {
    PseudoRelation(PseudoRelation),
    Table(Table),
    TableQuery(TableQuery),
    Select(SelectQuery),
    Composite(Composite),
    Cte(CteNode),
    Join(Join),
}

impl RelationKind {
    pub fn node_kind(&self) -> NodeKind {
        match self {
            RelationKind::PseudoRelation(_) => NodeKind::PseudoRelation,
            RelationKind::Table(_) => NodeKind::Table,
            RelationKind::TableQuery(_) => NodeKind::TableQuery,
            RelationKind::Select(_) => NodeKind::SelectQuery,
            RelationKind::Composite(_) => NodeKind::Composite,
            RelationKind::Cte(_) => NodeKind::Cte,
            RelationKind::Join(_) => NodeKind::Join,
        }
    }

    fn declared_fields(&self) -> &'static [FieldDecl] {
        match self {
            RelationKind::PseudoRelation(_) => PseudoRelation::FIELDS,
            RelationKind::Table(_) => Table::FIELDS,
            RelationKind::TableQuery(_) => TableQuery::FIELDS,
            RelationKind::Select(query) => query.declared_fields(),
            RelationKind::Composite(_) => Composite::FIELDS,
            RelationKind::Cte(cte) => cte.query.declared_fields(),
            RelationKind::Join(_) => Join::FIELDS,
        }
    }

    fn get_field(&self, name: &str) -> Option<Value> {
        match self {
            RelationKind::PseudoRelation(n) => n.get_field(name),
            RelationKind::Table(n) => n.get_field(name),
            RelationKind::TableQuery(n) => n.get_field(name),
            RelationKind::Select(query) => query.get_field(name),
            RelationKind::Composite(n) => n.get_field(name),
            RelationKind::Cte(cte) => cte.query.get_field(name),
            RelationKind::Join(n) => n.get_field(name),
        }
    }

    fn set_field(&mut self, name: &str, value: Value) -> IrResult<bool> {
        match self {
            RelationKind::PseudoRelation(n) => n.set_field(name, value),
            RelationKind::Table(n) => n.set_field(name, value),
            RelationKind::TableQuery(n) => n.set_field(name, value),
            RelationKind::Select(query) => query.set_field(name, value),
            RelationKind::Composite(n) => n.set_field(name, value),
            RelationKind::Cte(cte) => cte.query.set_field(name, value),
            RelationKind::Join(n) => n.set_field(name, value),
        }
    }

    fn collect_refs(&self, out: &mut Vec<NodeRef>) {
        match self {
            RelationKind::PseudoRelation(n) => n.collect_refs(out),
            RelationKind::Table(n) => n.collect_refs(out),
            RelationKind::TableQuery(n) => n.collect_refs(out),
            RelationKind::Select(query) => query.collect_refs(out),
            RelationKind::Composite(n) => n.collect_refs(out),
            RelationKind::Cte(cte) => cte.query.collect_refs(out),
            RelationKind::Join(n) => n.collect_refs(out),
        }
    }
}

macro_rules! relation_kind_from {
    ($( $Node:ty => $variant:ident ),* $(,)?) => {
        $(
            impl From<$Node> for RelationKind {
                fn from(node: $Node) -> Self {
                    RelationKind::$variant(node.into())
                }
            }
        )*
    };
}

relation_kind_from! {
    PseudoRelation => PseudoRelation,
    Table => Table,
    TableQuery => TableQuery,
    SelectQuery => Select,
    crate::select::LeafSelect => Select,
    crate::select::SetOperation => Select,
    Composite => Composite,
    CteNode => Cte,
    Join => Join,
}

/// Row-producing node
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub base: RelationBase,
    pub kind: RelationKind,
}

impl Relation {
    /// Relation without concepts
    pub fn new(kind: impl Into<RelationKind>) -> Self {
        Self {
            base: RelationBase::default(),
            kind: kind.into(),
        }
    }

    /// Relation materializing the given schema entities
    pub fn with_concepts(
        concepts: impl IntoIterator<Item = ConceptName>,
        kind: impl Into<RelationKind>,
    ) -> Self {
        Self {
            base: RelationBase::new(concepts),
            kind: kind.into(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.base.alias = Some(alias.into());
        self
    }

    pub fn node_kind(&self) -> NodeKind {
        self.kind.node_kind()
    }

    /// Schema entities this relation materializes; fixed at construction
    pub fn concepts(&self) -> &BTreeSet<ConceptName> {
        &self.base.concepts
    }

    pub fn alias(&self) -> Option<&str> {
        self.base.alias.as_deref()
    }

    /// Snapshot of the bonds under `key`; empty when none are registered
    pub fn bonds(&self, key: &str) -> Vec<ExprId> {
        self.base.bonds.bonds(key)
    }

    /// Register a bond under `key` and return it
    pub fn add_bond(&mut self, key: impl Into<BondKey>, bond: ExprId) -> ExprId {
        self.base.bonds.add_bond(key, bond)
    }

    /// Merge `other`'s bond registry into this relation's.
    ///
    /// Must be called whenever `other` is coalesced into this relation so
    /// join-key correlations established on either side survive.
    pub fn update_bonds(&mut self, other: &Relation) {
        self.base.bonds.update_bonds(&other.base.bonds);
    }

    /// Merge a detached registry, for callers that cannot borrow the source
    /// relation alongside this one
    pub(crate) fn merge_bonds(&mut self, registry: &BondRegistry) {
        self.base.bonds.update_bonds(registry);
    }

    /// Read-only view of the whole registry
    pub fn bond_registry(&self) -> &BondRegistry {
        &self.base.bonds
    }

    pub fn as_join(&self) -> Option<&Join> {
        match &self.kind {
            RelationKind::Join(join) => Some(join),
            _ => None,
        }
    }

    pub fn as_join_mut(&mut self) -> Option<&mut Join> {
        match &mut self.kind {
            RelationKind::Join(join) => Some(join),
            _ => None,
        }
    }

    pub fn as_cte(&self) -> Option<&CteNode> {
        match &self.kind {
            RelationKind::Cte(cte) => Some(cte),
            _ => None,
        }
    }

    pub fn as_cte_mut(&mut self) -> Option<&mut CteNode> {
        match &mut self.kind {
            RelationKind::Cte(cte) => Some(cte),
            _ => None,
        }
    }

    /// The select body of a SELECT or CTE relation
    pub fn select_query(&self) -> Option<&SelectQuery> {
        match &self.kind {
            RelationKind::Select(query) => Some(query),
            RelationKind::Cte(cte) => Some(&cte.query),
            _ => None,
        }
    }

    pub fn select_query_mut(&mut self) -> Option<&mut SelectQuery> {
        match &mut self.kind {
            RelationKind::Select(query) => Some(query),
            RelationKind::Cte(cte) => Some(&mut cte.query),
            _ => None,
        }
    }

    /// CTE collection owned by this relation, if its kind has one
    pub fn ctes(&self) -> Option<&IndexSet<RelId>> {
        match &self.kind {
            RelationKind::Composite(composite) => Some(&composite.ctes),
            _ => self.select_query().and_then(SelectQuery::ctes),
        }
    }

    pub fn ctes_mut(&mut self) -> Option<&mut IndexSet<RelId>> {
        match &mut self.kind {
            RelationKind::Composite(composite) => Some(&mut composite.ctes),
            RelationKind::Select(query) => query.as_leaf_mut().map(|leaf| &mut leaf.ctes),
            RelationKind::Cte(cte) => cte.query.as_leaf_mut().map(|leaf| &mut leaf.ctes),
            _ => None,
        }
    }

    /// Base fields followed by the kind's fields
    pub fn declared_fields(&self) -> Vec<FieldDecl> {
        RelationBase::FIELDS
            .iter()
            .chain(self.kind.declared_fields())
            .copied()
            .collect()
    }

    pub fn get_field(&self, name: &str) -> Option<Value> {
        self.base
            .get_field(name)
            .or_else(|| self.kind.get_field(name))
    }

    pub fn set_field(&mut self, name: &str, value: Value) -> IrResult<()> {
        let node = self.node_kind().name();
        if RelationBase::FIELDS.iter().any(|d| d.name == name) {
            self.base.set_field(node, name, value)?;
            return Ok(());
        }
        if self.kind.set_field(name, value)? {
            Ok(())
        } else {
            Err(IrError::UnknownField {
                node,
                field: name.to_string(),
            })
        }
    }

    /// Handles of every node this relation refers to, bonds included
    pub fn children(&self) -> Vec<NodeRef> {
        let mut out = Vec::new();
        self.base.collect_refs(&mut out);
        self.kind.collect_refs(&mut out);
        out
    }

    /// Build a relation of `kind` from named fields.
    /// Returns `None` when `kind` is not a relation kind.
    pub(crate) fn from_fields(kind: NodeKind, mut fields: Fields) -> Option<IrResult<Relation>> {
        (kind.family() == NodeFamily::Relation).then(|| Self::build(kind, &mut fields))
    }

    fn build(kind: NodeKind, fields: &mut Fields) -> IrResult<Relation> {
        let node = kind.name();
        let base = RelationBase::take_fields(fields, node)?;
        let kind: RelationKind = match kind {
            NodeKind::PseudoRelation => PseudoRelation::take_fields(fields)?.into(),
            NodeKind::Table => Table::take_fields(fields)?.into(),
            NodeKind::TableQuery => TableQuery::take_fields(fields)?.into(),
            NodeKind::SelectQuery => SelectQuery::take_fields(fields)?.into(),
            NodeKind::Composite => Composite::take_fields(fields)?.into(),
            NodeKind::Cte => CteNode::new(SelectQuery::take_fields(fields)?).into(),
            NodeKind::Join => Join::take_fields(fields)?.into(),
            _ => {
                return Err(IrError::WrongNodeFamily {
                    expected: "relation",
                    found: node,
                })
            }
        };
        match fields.keys().next() {
            Some(field) => Err(IrError::UnknownField {
                node,
                field: field.clone(),
            }),
            None => Ok(Relation { base, kind }),
        }
    }
}

#[cfg(test)]
#[path = "relation_test.rs"]
mod tests;
