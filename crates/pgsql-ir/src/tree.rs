//! The query tree: generational arenas owning every IR node
//!
//! The planner allocates nodes here and wires them together through handles.
//! Rewrite passes mutate nodes in place via the `*_mut` accessors or the
//! name-based field API; either way the tree is the single owner.

use crate::bonds::BondRegistry;
use crate::config::IrConfig;
use crate::dml::Statement;
use crate::error::{IrError, IrResult};
use crate::expr::{CteAttrRef, CteRef, Expr, UpdateExpr};
use crate::fields::{FieldDecl, Fields, Value};
use crate::names::BondKey;
use crate::node::{ExprId, NodeFamily, NodeKind, NodeRef, RelId, StmtId};
use crate::relation::Relation;
use crate::select::CteNode;
use indexmap::IndexSet;
use std::collections::HashSet;
use typed_generational_arena::StandardArena;

fn dangling(node: NodeRef) -> IrError {
    IrError::DanglingNode {
        family: node.family().name(),
        handle: format!("{:?}", node),
    }
}

fn wrong_kind(expected: &'static str, found: NodeKind) -> IrError {
    IrError::WrongNodeFamily {
        expected,
        found: found.name(),
    }
}

/// Arena-backed owner of every node of one compiled statement
#[derive(Debug)]
pub struct QueryTree {
    config: IrConfig,
    exprs: StandardArena<Expr>,
    relations: StandardArena<Relation>,
    statements: StandardArena<Statement>,
}

impl Default for QueryTree {
    fn default() -> Self {
        Self::with_config(IrConfig::default())
    }
}

impl QueryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IrConfig) -> Self {
        Self {
            config,
            exprs: StandardArena::new(),
            relations: StandardArena::new(),
            statements: StandardArena::new(),
        }
    }

    pub fn config(&self) -> &IrConfig {
        &self.config
    }

    // ===== Allocation =====

    /// Allocate an expression node
    pub fn add_expr(&mut self, expr: impl Into<Expr>) -> IrResult<ExprId> {
        let expr = expr.into();
        if self.config.validate_references {
            self.check_refs(&expr.children())?;
            if let Some(cte) = expr.referenced_cte() {
                self.cte(cte)?;
            }
        }
        let cte = expr.referenced_cte();
        let id = self.exprs.insert(expr);
        if let Some(cte) = cte {
            self.link_referrer(cte, NodeRef::Expr(id));
        }
        Ok(id)
    }

    /// Allocate a relation node
    pub fn add_relation(&mut self, relation: Relation) -> IrResult<RelId> {
        if self.config.validate_references {
            self.check_refs(&relation.children())?;
            if let Some(ctes) = relation.ctes() {
                self.check_ctes(ctes)?;
            }
        }
        let kind = relation.node_kind();
        let id = self.relations.insert(relation);
        log::debug!("Allocated {} relation {:?}", kind, id);
        Ok(id)
    }

    /// Allocate a DML statement node
    pub fn add_statement(&mut self, statement: impl Into<Statement>) -> IrResult<StmtId> {
        let statement = statement.into();
        if self.config.validate_references {
            self.check_refs(&statement.children())?;
            self.check_ctes(statement.ctes())?;
        }
        let kind = statement.kind();
        let id = self.statements.insert(statement);
        log::debug!("Allocated {} statement {:?}", kind, id);
        Ok(id)
    }

    /// Build a node of `kind` from named fields and allocate it.
    ///
    /// Undeclared names and omitted required fields fail with a field
    /// error, values of the wrong shape with a type mismatch. Nothing is
    /// allocated on failure.
    pub fn construct(&mut self, kind: NodeKind, fields: Fields) -> IrResult<NodeRef> {
        let family = kind.family();
        let mismatch = || wrong_kind(family.name(), kind);
        match family {
            NodeFamily::Expr => {
                let expr = Expr::from_fields(kind, fields).ok_or_else(mismatch)??;
                self.add_expr(expr).map(NodeRef::Expr)
            }
            NodeFamily::Relation => {
                let relation = Relation::from_fields(kind, fields).ok_or_else(mismatch)??;
                self.add_relation(relation).map(NodeRef::Relation)
            }
            NodeFamily::Statement => {
                let statement = Statement::from_fields(kind, fields).ok_or_else(mismatch)??;
                self.add_statement(statement).map(NodeRef::Statement)
            }
        }
    }

    // ===== Access =====

    pub fn expr(&self, id: ExprId) -> IrResult<&Expr> {
        self.exprs.get(id).ok_or_else(|| dangling(id.into()))
    }

    pub fn expr_mut(&mut self, id: ExprId) -> IrResult<&mut Expr> {
        self.exprs.get_mut(id).ok_or_else(|| dangling(id.into()))
    }

    pub fn relation(&self, id: RelId) -> IrResult<&Relation> {
        self.relations.get(id).ok_or_else(|| dangling(id.into()))
    }

    pub fn relation_mut(&mut self, id: RelId) -> IrResult<&mut Relation> {
        self.relations.get_mut(id).ok_or_else(|| dangling(id.into()))
    }

    pub fn statement(&self, id: StmtId) -> IrResult<&Statement> {
        self.statements.get(id).ok_or_else(|| dangling(id.into()))
    }

    pub fn statement_mut(&mut self, id: StmtId) -> IrResult<&mut Statement> {
        self.statements.get_mut(id).ok_or_else(|| dangling(id.into()))
    }

    /// The CTE behind `id`; fails if `id` is some other relation kind
    pub fn cte(&self, id: RelId) -> IrResult<&CteNode> {
        let relation = self.relation(id)?;
        relation
            .as_cte()
            .ok_or_else(|| wrong_kind("Cte", relation.node_kind()))
    }

    pub fn contains(&self, node: NodeRef) -> bool {
        match node {
            NodeRef::Expr(id) => self.exprs.contains(id),
            NodeRef::Relation(id) => self.relations.contains(id),
            NodeRef::Statement(id) => self.statements.contains(id),
        }
    }

    /// Number of live nodes across all families
    pub fn len(&self) -> usize {
        self.exprs.len() + self.relations.len() + self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn kind_of(&self, node: NodeRef) -> IrResult<NodeKind> {
        Ok(match node {
            NodeRef::Expr(id) => self.expr(id)?.kind(),
            NodeRef::Relation(id) => self.relation(id)?.node_kind(),
            NodeRef::Statement(id) => self.statement(id)?.kind(),
        })
    }

    /// Field table of the node behind `node`
    pub fn declared_fields(&self, node: NodeRef) -> IrResult<Vec<FieldDecl>> {
        let fields = match node {
            NodeRef::Expr(id) => Expr::declared_fields(self.expr(id)?.kind()),
            NodeRef::Relation(id) => return Ok(self.relation(id)?.declared_fields()),
            NodeRef::Statement(id) => Statement::declared_fields(self.statement(id)?.kind()),
        };
        Ok(fields.map(<[FieldDecl]>::to_vec).unwrap_or_default())
    }

    /// Read a field by name
    pub fn get_field(&self, node: NodeRef, name: &str) -> IrResult<Value> {
        let (value, kind) = match node {
            NodeRef::Expr(id) => {
                let expr = self.expr(id)?;
                (expr.get_field(name), expr.kind())
            }
            NodeRef::Relation(id) => {
                let relation = self.relation(id)?;
                (relation.get_field(name), relation.node_kind())
            }
            NodeRef::Statement(id) => {
                let statement = self.statement(id)?;
                (statement.get_field(name), statement.kind())
            }
        };
        value.ok_or_else(|| IrError::UnknownField {
            node: kind.name(),
            field: name.to_string(),
        })
    }

    /// Write a field by name.
    ///
    /// The node is left untouched when the name is unknown, the value has
    /// the wrong shape, or (with reference validation on) the value holds a
    /// dangling handle or lists a non-CTE relation as a CTE.
    pub fn set_field(&mut self, node: NodeRef, name: &str, value: Value) -> IrResult<()> {
        if self.config.validate_references {
            let mut refs = Vec::new();
            value.collect_refs(&mut refs);
            self.check_refs(&refs)?;
        }
        match node {
            NodeRef::Expr(id) => {
                let current = self.expr(id)?;
                let before = current.referenced_cte();
                let mut updated = current.clone();
                updated.set_field(name, value)?;
                let after = updated.referenced_cte();
                if self.config.validate_references {
                    if let Some(cte) = after {
                        self.cte(cte)?;
                    }
                }
                *self.expr_mut(id)? = updated;
                if before != after {
                    if let Some(cte) = before {
                        self.unlink_referrer(cte, node);
                    }
                    if let Some(cte) = after {
                        self.link_referrer(cte, node);
                    }
                }
                Ok(())
            }
            NodeRef::Relation(id) => {
                let mut updated = self.relation(id)?.clone();
                updated.set_field(name, value)?;
                if self.config.validate_references {
                    if let Some(ctes) = updated.ctes() {
                        self.check_ctes(ctes)?;
                    }
                }
                *self.relation_mut(id)? = updated;
                Ok(())
            }
            NodeRef::Statement(id) => {
                let mut updated = self.statement(id)?.clone();
                updated.set_field(name, value)?;
                if self.config.validate_references {
                    self.check_ctes(updated.ctes())?;
                }
                *self.statement_mut(id)? = updated;
                Ok(())
            }
        }
    }

    // ===== Copies =====

    /// Allocate a copy of `node` whose containers are independent of the
    /// original's while every child handle stays shared.
    ///
    /// A copied CTE starts with no referrers; a copied CTE reference is
    /// recorded as a further referrer of its target.
    pub fn shallow_copy(&mut self, node: NodeRef) -> IrResult<NodeRef> {
        match node {
            NodeRef::Expr(id) => {
                let copy = self.expr(id)?.clone();
                let cte = copy.referenced_cte();
                let new_id = self.exprs.insert(copy);
                if let Some(cte) = cte {
                    self.link_referrer(cte, NodeRef::Expr(new_id));
                }
                Ok(NodeRef::Expr(new_id))
            }
            NodeRef::Relation(id) => {
                let mut copy = self.relation(id)?.clone();
                if let Some(cte) = copy.as_cte_mut() {
                    cte.retain_referrers(|_| false);
                }
                Ok(NodeRef::Relation(self.relations.insert(copy)))
            }
            NodeRef::Statement(id) => {
                let copy = self.statement(id)?.clone();
                Ok(NodeRef::Statement(self.statements.insert(copy)))
            }
        }
    }

    /// Allocate a new join with the same children, condition and kind as
    /// `join`. The copy starts with its own empty bond registry.
    pub fn copy_join(&mut self, join: RelId) -> IrResult<RelId> {
        let relation = self.relation(join)?;
        let copy = relation
            .as_join()
            .ok_or_else(|| wrong_kind("Join", relation.node_kind()))?
            .copy();
        Ok(self.relations.insert(Relation::new(copy)))
    }

    /// Overwrite the children, condition and kind of `target` with those
    /// of `source`
    pub fn copy_join_from(&mut self, target: RelId, source: RelId) -> IrResult<()> {
        let relation = self.relation(source)?;
        let source = relation
            .as_join()
            .ok_or_else(|| wrong_kind("Join", relation.node_kind()))?
            .copy();
        let relation = self.relation_mut(target)?;
        let kind = relation.node_kind();
        relation
            .as_join_mut()
            .ok_or_else(|| wrong_kind("Join", kind))?
            .copy_from(&source);
        Ok(())
    }

    // ===== Bonds =====

    /// Snapshot of the bonds `relation` holds under `key`
    pub fn bonds(&self, relation: RelId, key: &str) -> IrResult<Vec<ExprId>> {
        Ok(self.relation(relation)?.bonds(key))
    }

    /// Register `bond` on `relation` under `key` and return it
    pub fn add_bond(
        &mut self,
        relation: RelId,
        key: impl Into<BondKey>,
        bond: ExprId,
    ) -> IrResult<ExprId> {
        if self.config.validate_references {
            self.expr(bond)?;
        }
        Ok(self.relation_mut(relation)?.add_bond(key, bond))
    }

    /// Merge the bond registry of `source` into `target`; `source` is not
    /// modified. Call whenever `source` is coalesced into `target`.
    pub fn update_bonds(&mut self, target: RelId, source: RelId) -> IrResult<()> {
        let registry: BondRegistry = self.relation(source)?.bond_registry().clone();
        let relation = self.relation_mut(target)?;
        log::debug!(
            "Merging {} bond keys from {:?} into {:?}",
            registry.len(),
            source,
            target
        );
        relation.merge_bonds(&registry);
        Ok(())
    }

    // ===== CTEs =====

    /// Allocate a reference to `cte`
    pub fn cte_ref(&mut self, cte: RelId) -> IrResult<ExprId> {
        self.add_expr(CteRef { cte })
    }

    /// Allocate a reference to column `attr` of `cte`
    pub fn cte_attr_ref(&mut self, cte: RelId, attr: impl Into<String>) -> IrResult<ExprId> {
        self.add_expr(CteAttrRef {
            cte,
            attr: attr.into(),
        })
    }

    /// Append `cte` to the CTE list of `owner`. Returns false if it was
    /// already listed.
    pub fn add_cte(&mut self, owner: impl Into<NodeRef>, cte: RelId) -> IrResult<bool> {
        self.cte(cte)?;
        let ctes = self.ctes_mut(owner.into())?;
        Ok(ctes.insert(cte))
    }

    /// CTEs listed by `owner`, in definition order
    pub fn ctes(&self, owner: impl Into<NodeRef>) -> IrResult<Vec<RelId>> {
        let owner = owner.into();
        let ctes = match owner {
            NodeRef::Relation(id) => {
                let relation = self.relation(id)?;
                relation
                    .ctes()
                    .ok_or_else(|| wrong_kind("relation with a CTE list", relation.node_kind()))?
            }
            NodeRef::Statement(id) => self.statement(id)?.ctes(),
            NodeRef::Expr(id) => {
                return Err(wrong_kind(
                    "relation with a CTE list",
                    self.expr(id)?.kind(),
                ))
            }
        };
        Ok(ctes.iter().copied().collect())
    }

    fn ctes_mut(&mut self, owner: NodeRef) -> IrResult<&mut IndexSet<RelId>> {
        match owner {
            NodeRef::Relation(id) => {
                let relation = self.relation_mut(id)?;
                let kind = relation.node_kind();
                relation
                    .ctes_mut()
                    .ok_or_else(|| wrong_kind("relation with a CTE list", kind))
            }
            NodeRef::Statement(id) => Ok(self.statement_mut(id)?.ctes_mut()),
            NodeRef::Expr(id) => Err(wrong_kind(
                "relation with a CTE list",
                self.expr(id)?.kind(),
            )),
        }
    }

    /// Live expressions pointing at `cte`.
    ///
    /// Recorded referrers come first in registration order, followed by
    /// references that were never recorded (e.g. retargeted through
    /// [`expr_mut`](Self::expr_mut)) in arena order. Empty when referrer
    /// tracking is off.
    pub fn cte_referrers(&self, cte: RelId) -> IrResult<Vec<NodeRef>> {
        let node = self.cte(cte)?;
        if !self.config.track_cte_referrers {
            return Ok(Vec::new());
        }
        let mut referrers: Vec<NodeRef> = node
            .referrers()
            .filter(|node| self.refers_to(*node, cte))
            .collect();
        for id in self.exprs_referencing(cte) {
            let node = NodeRef::Expr(id);
            if !referrers.contains(&node) {
                referrers.push(node);
            }
        }
        Ok(referrers)
    }

    /// CTEs listed by `owner` that no live expression refers to.
    ///
    /// They stay in the list; removing them is up to the caller.
    pub fn unreferenced_ctes(&self, owner: impl Into<NodeRef>) -> IrResult<Vec<RelId>> {
        let mut unreferenced = Vec::new();
        for cte in self.ctes(owner)? {
            self.cte(cte)?;
            if self.exprs_referencing(cte).next().is_none() {
                unreferenced.push(cte);
            }
        }
        Ok(unreferenced)
    }

    fn exprs_referencing(&self, cte: RelId) -> impl Iterator<Item = ExprId> + '_ {
        self.exprs
            .iter()
            .filter(move |(_, expr)| expr.referenced_cte() == Some(cte))
            .map(|(id, _)| id)
    }

    fn refers_to(&self, node: NodeRef, cte: RelId) -> bool {
        match node {
            NodeRef::Expr(id) => self
                .exprs
                .get(id)
                .is_some_and(|expr| expr.referenced_cte() == Some(cte)),
            other => self.contains(other),
        }
    }

    fn link_referrer(&mut self, cte: RelId, referrer: NodeRef) {
        if !self.config.track_cte_referrers {
            return;
        }
        if let Some(node) = self.relations.get_mut(cte).and_then(Relation::as_cte_mut) {
            node.add_referrer(referrer);
        }
    }

    fn unlink_referrer(&mut self, cte: RelId, referrer: NodeRef) {
        if let Some(node) = self.relations.get_mut(cte).and_then(Relation::as_cte_mut) {
            node.forget_referrer(referrer);
        }
    }

    // ===== DML helpers =====

    /// Append `target = value` to the assignment list of an UPDATE and
    /// return the new assignment node. Repeated targets are kept.
    pub fn add_assignment(
        &mut self,
        update: StmtId,
        target: ExprId,
        value: ExprId,
    ) -> IrResult<ExprId> {
        let kind = self.statement(update)?.kind();
        if kind != NodeKind::Update {
            return Err(wrong_kind("Update", kind));
        }
        let assignment = self.add_expr(UpdateExpr {
            expr: target,
            value,
        })?;
        if let Statement::Update(node) = self.statement_mut(update)? {
            node.values.push(assignment);
        }
        Ok(assignment)
    }

    // ===== Traversal and pruning =====

    /// Handles held by the fields of `node`
    pub fn children(&self, node: NodeRef) -> IrResult<Vec<NodeRef>> {
        Ok(match node {
            NodeRef::Expr(id) => self.expr(id)?.children(),
            NodeRef::Relation(id) => self.relation(id)?.children(),
            NodeRef::Statement(id) => self.statement(id)?.children(),
        })
    }

    /// `root` followed by every node reachable from it, depth first in
    /// field order. Shared nodes are listed once.
    pub fn descendants(&self, root: NodeRef) -> IrResult<Vec<NodeRef>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![root];

        while let Some(node) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            let children = self.children(node)?;
            order.push(node);
            stack.extend(children.into_iter().rev());
        }

        Ok(order)
    }

    /// Release `node`. Handles to it held elsewhere become dangling.
    pub fn remove(&mut self, node: NodeRef) -> IrResult<()> {
        match node {
            NodeRef::Expr(id) => {
                let expr = self.exprs.remove(id).ok_or_else(|| dangling(node))?;
                if let Some(cte) = expr.referenced_cte() {
                    self.unlink_referrer(cte, node);
                }
            }
            NodeRef::Relation(id) => {
                if self.relation(id)?.as_cte().is_some() {
                    let live = self.exprs_referencing(id).count();
                    if live > 0 {
                        log::warn!(
                            "Removing CTE {:?} that still has {} live referrer(s)",
                            id,
                            live
                        );
                    }
                }
                self.relations.remove(id).ok_or_else(|| dangling(node))?;
            }
            NodeRef::Statement(id) => {
                self.statements.remove(id).ok_or_else(|| dangling(node))?;
            }
        }
        Ok(())
    }

    fn check_ctes(&self, ctes: &IndexSet<RelId>) -> IrResult<()> {
        for cte in ctes {
            self.cte(*cte)?;
        }
        Ok(())
    }

    fn check_refs(&self, refs: &[NodeRef]) -> IrResult<()> {
        match refs.iter().find(|node| !self.contains(**node)) {
            Some(node) => Err(dangling(*node)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "tree_test.rs"]
mod tests;
