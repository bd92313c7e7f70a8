// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Mapping from observed variables to their value placeholders.
use std::collections::{BTreeMap, BTreeSet};

use crate::graph::GraphStore;
use crate::ident::NodeId;

/// Observed-value mapping: variable node → value placeholder node.
///
/// Keys are unique; iteration is in ascending key id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ObservedValues {
    map: BTreeMap<NodeId, NodeId>,
}

impl ObservedValues {
    /// Creates an empty mapping.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Maps `var` to `value`, returning the previous value node if any.
    pub fn insert(&mut self, var: NodeId, value: NodeId) -> Option<NodeId> {
        self.map.insert(var, value)
    }

    /// Value node observed for `var`.
    #[must_use]
    pub fn get(&self, var: &NodeId) -> Option<NodeId> {
        self.map.get(var).copied()
    }

    /// `(variable, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.map.iter().map(|(k, v)| (*k, *v))
    }

    /// Number of observed variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Returns `true` when nothing is observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Keys resolved through `store`'s replacement table.
    #[must_use]
    pub fn resolved_keys(&self, store: &GraphStore) -> BTreeSet<NodeId> {
        self.map.keys().map(|k| store.resolve(*k)).collect()
    }
}

impl FromIterator<(NodeId, NodeId)> for ObservedValues {
    fn from_iter<I: IntoIterator<Item = (NodeId, NodeId)>>(iter: I) -> Self {
        Self {
            map: iter.into_iter().collect(),
        }
    }
}
