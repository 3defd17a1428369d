//! Bond registry, an ordered multimap from join key to bond expressions
//!
//! A relation records, per logical join key, the expressions that realize
//! that key in its output. When rewrite passes coalesce relations the
//! registries are merged so correlations established on either side
//! survive. Readers only ever receive copies; internal storage is never
//! handed out mutably.

use crate::names::BondKey;
use crate::node::ExprId;
use indexmap::IndexMap;

/// Ordered multimap of bonds owned by a single relation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BondRegistry {
    bonds: IndexMap<BondKey, Vec<ExprId>>,
}

impl BondRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the bonds registered under `key`, in insertion order.
    ///
    /// An unregistered key yields an empty vector. The result is a copy:
    /// mutating it never affects the registry.
    pub fn bonds(&self, key: &str) -> Vec<ExprId> {
        self.bonds.get(key).cloned().unwrap_or_default()
    }

    /// Register `bond` under `key` after any existing bonds for that key.
    /// Returns `bond` so call sites can keep chaining.
    pub fn add_bond(&mut self, key: impl Into<BondKey>, bond: ExprId) -> ExprId {
        self.bonds.entry(key.into()).or_default().push(bond);
        bond
    }

    /// Merge every bond of `other` into this registry.
    ///
    /// For a key present on both sides this registry's bonds come first,
    /// followed by `other`'s. Keys only known to `other` are inserted as
    /// independent copies. `other` is left untouched.
    pub fn update_bonds(&mut self, other: &BondRegistry) {
        for (key, values) in &other.bonds {
            match self.bonds.get_mut(key) {
                Some(existing) => existing.extend(values.iter().copied()),
                None => {
                    self.bonds.insert(key.clone(), values.clone());
                }
            }
        }
    }

    /// True if at least one bond is registered under `key`
    pub fn contains_key(&self, key: &str) -> bool {
        self.bonds.get(key).is_some_and(|v| !v.is_empty())
    }

    /// Registered keys, in first-registration order
    pub fn keys(&self) -> impl Iterator<Item = &BondKey> {
        self.bonds.keys()
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.bonds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bonds.is_empty()
    }

    /// Every bond expression held, in key order then insertion order
    pub fn all_bonds(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.bonds.values().flat_map(|v| v.iter().copied())
    }
}

#[cfg(test)]
#[path = "bonds_test.rs"]
mod tests;
