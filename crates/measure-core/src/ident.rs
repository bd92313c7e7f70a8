// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use std::fmt;

use blake3::Hasher;

/// Canonical 256-bit hash used for rule ids, op-kind ids and snapshots.
pub type Hash = [u8; 32];

/// Identifier for a node in a model graph.
///
/// Ids are allocated monotonically by the [`GraphStore`](crate::GraphStore).
/// A node can only reference inputs that already exist, so ascending id order
/// is always a topological order of the graph. Rewrites never reuse ids: a
/// replaced node keeps its id and consumers resolve through the replacement
/// table.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Returns the raw index of this id.
    #[must_use]
    pub fn index(self) -> u32 {
        self.0
    }

    /// Little-endian bytes used when hashing graph state.
    #[must_use]
    pub fn to_le_bytes(self) -> [u8; 4] {
        self.0.to_le_bytes()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Strongly typed identifier for the logical kind of an operation.
///
/// `TypeId` values are produced by [`make_type_id`] which hashes a label; using
/// a dedicated wrapper prevents accidental mixing with rule ids.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TypeId(pub Hash);

impl TypeId {
    /// Returns the canonical byte representation of this id.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }
}

/// Produces a stable, domain‑separated type identifier (prefix `b"type:"`) using BLAKE3.
pub fn make_type_id(label: &str) -> TypeId {
    let mut hasher = Hasher::new();
    hasher.update(b"type:");
    hasher.update(label.as_bytes());
    TypeId(hasher.finalize().into())
}

/// Produces a stable, domain‑separated rule family id (prefix `b"rule:"`) using BLAKE3.
///
/// Matches the ids baked in by `build.rs` for the built-in censoring rules.
pub fn make_rule_id(name: &str) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(b"rule:");
    hasher.update(name.as_bytes());
    hasher.finalize().into()
}
