// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Snapshot type and hash computation.
//!
//! Determinism contract
//! - Nodes are hashed in ascending `NodeId` order. Each node contributes its
//!   id, its op-kind `TypeId`, the op payload bytes, its dtype, its inputs and
//!   its name.
//! - The measurable set and the replacement table follow, both in ascending
//!   key order.
//! - All length prefixes are 8-byte little-endian.
//!
//! Two stores built by the same sequence of operations, and rewritten by the
//! same rules, therefore hash identically regardless of platform.
use blake3::Hasher;

use crate::graph::GraphStore;
use crate::ident::Hash;
use crate::op::DType;
use crate::tx::TxId;

/// Snapshot of the graph after an epoch commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Canonical hash of the graph state.
    pub hash: Hash,
    /// Hash of the previous snapshot, if any.
    pub parent: Option<Hash>,
    /// Transaction that produced this snapshot.
    pub tx: TxId,
    /// Number of stored nodes.
    pub node_count: usize,
}

/// Computes the canonical hash of `store`.
#[must_use]
pub fn compute_snapshot_hash(store: &GraphStore) -> Hash {
    let mut hasher = Hasher::new();
    hasher.update(&(store.nodes.len() as u64).to_le_bytes());
    for (id, record) in &store.nodes {
        hasher.update(&id.to_le_bytes());
        hasher.update(record.op.kind().type_id().as_bytes());
        let payload = record.op.payload_bytes();
        hasher.update(&(payload.len() as u64).to_le_bytes());
        hasher.update(&payload);
        hasher.update(&[match record.dtype {
            DType::Float64 => 0u8,
            DType::Int64 => 1u8,
        }]);
        hasher.update(&(record.inputs.len() as u64).to_le_bytes());
        for input in &record.inputs {
            hasher.update(&input.to_le_bytes());
        }
        match &record.name {
            Some(name) => {
                hasher.update(&[1]);
                hasher.update(&(name.len() as u64).to_le_bytes());
                hasher.update(name.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }
    hasher.update(&(store.measurable.len() as u64).to_le_bytes());
    for id in &store.measurable {
        hasher.update(&id.to_le_bytes());
    }
    hasher.update(&(store.replacements.len() as u64).to_le_bytes());
    for (old, new) in &store.replacements {
        hasher.update(&old.to_le_bytes());
        hasher.update(&new.to_le_bytes());
    }
    hasher.finalize().into()
}
