// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Read-only view over a [`GraphStore`] handed to rewrite callbacks.
//!
//! Matchers, executors and footprint functions all observe the graph through
//! [`GraphView`]. Executors never mutate the store; every change flows through
//! the [`RewriteDelta`](crate::RewriteDelta) they are given, and the engine
//! applies the merged deltas once the epoch's candidates have been admitted.
//!
//! The view also carries the set of nodes that currently stand for an
//! observed value (after following replacements). Censoring matchers use it to
//! refuse bases that are already valued.
use std::collections::BTreeSet;

use crate::graph::GraphStore;
use crate::ident::NodeId;
use crate::record::NodeRecord;

/// Read-only view over a [`GraphStore`] plus the resolved observed set.
///
/// Do not add `Deref<Target = GraphStore>` or any accessor returning the
/// underlying store; this type is the read capability given to rewrites.
#[derive(Debug, Clone, Copy)]
pub struct GraphView<'a> {
    store: &'a GraphStore,
    observed: &'a BTreeSet<NodeId>,
}

impl<'a> GraphView<'a> {
    /// Creates a view over `store` with the given resolved observed nodes.
    #[must_use]
    pub fn new(store: &'a GraphStore, observed: &'a BTreeSet<NodeId>) -> Self {
        Self { store, observed }
    }

    /// Returns a shared reference to a node when it exists.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&'a NodeRecord> {
        self.store.node(id)
    }

    /// Resolves `id` through the replacement table.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> NodeId {
        self.store.resolve(id)
    }

    /// Returns `true` when the node currently carries the measurable capability.
    #[must_use]
    pub fn is_measurable(&self, id: &NodeId) -> bool {
        self.store.is_measurable(id)
    }

    /// Returns `true` when the node stands for an observed value.
    #[must_use]
    pub fn has_observed_value(&self, id: &NodeId) -> bool {
        self.observed.contains(id)
    }

    /// Returns `true` when `id` has not been replaced.
    #[must_use]
    pub fn is_live(&self, id: &NodeId) -> bool {
        self.store.is_live(id)
    }

    /// Inputs of `id`, each resolved through the replacement table.
    #[must_use]
    pub fn resolved_inputs(&self, id: &NodeId) -> Option<Vec<NodeId>> {
        let record = self.store.node(id)?;
        Some(
            record
                .inputs
                .iter()
                .map(|input| self.store.resolve(*input))
                .collect(),
        )
    }
}
