// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Footprints and independence checks for epoch scheduling.
//!
//! A footprint summarises the nodes a pending rewrite reads and the nodes it
//! writes (replaces or strips a capability from). Two rewrites may be admitted
//! into the same epoch only when neither writes something the other touches.
use std::collections::BTreeSet;

use crate::ident::NodeId;

/// Ordered set of node ids with deterministic iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdSet(BTreeSet<NodeId>);

impl IdSet {
    /// Inserts an identifier.
    pub fn insert(&mut self, id: NodeId) {
        self.0.insert(id);
    }

    /// Returns `true` when `id` is present.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.0.contains(id)
    }

    /// Iterates ids in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = &NodeId> {
        self.0.iter()
    }

    /// Returns `true` if any element is shared with `other`.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        // Early exit by zipping ordered sets.
        let mut a = self.0.iter();
        let mut b = other.0.iter();
        let mut va = a.next();
        let mut vb = b.next();
        while let (Some(x), Some(y)) = (va, vb) {
            match x.cmp(y) {
                core::cmp::Ordering::Less => va = a.next(),
                core::cmp::Ordering::Greater => vb = b.next(),
                core::cmp::Ordering::Equal => return true,
            }
        }
        false
    }
}

impl FromIterator<NodeId> for IdSet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Read/write sets of a rewrite.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Footprint {
    /// Nodes read by the rewrite.
    pub n_read: IdSet,
    /// Nodes replaced or stripped of a capability by the rewrite.
    pub n_write: IdSet,
}

impl Footprint {
    /// Returns `true` when this footprint is independent of `other`.
    ///
    /// Reads never conflict with reads; a write conflicts with any read or
    /// write of the same node.
    #[must_use]
    pub fn independent(&self, other: &Self) -> bool {
        !(self.n_write.intersects(&other.n_write)
            || self.n_write.intersects(&other.n_read)
            || other.n_write.intersects(&self.n_read))
    }
}
