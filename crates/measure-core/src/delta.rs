// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rewrite deltas: the write side of an executor.
//!
//! Executors read through a [`GraphView`](crate::GraphView) and record their
//! effects here. Fresh node ids are allocated from a counter the engine threads
//! through the admitted candidates of an epoch, so ids stay unique and
//! deterministic without touching the store until commit.
use crate::ident::NodeId;
use crate::record::NodeRecord;

/// One graph mutation emitted by a rewrite.
#[derive(Clone, Debug, PartialEq)]
pub enum GraphOp {
    /// Insert a new node under a pre-allocated id.
    InsertNode {
        /// Allocated id.
        id: NodeId,
        /// Record to insert.
        record: Box<NodeRecord>,
    },
    /// Remove the measurable capability from a node.
    StripMeasurable {
        /// Node losing the capability.
        node: NodeId,
    },
    /// Redirect every consumer of `old` to `new`.
    Replace {
        /// Node being replaced.
        old: NodeId,
        /// Replacement node.
        new: NodeId,
    },
}

/// Accumulator of [`GraphOp`]s for a single rewrite.
#[derive(Debug)]
pub struct RewriteDelta {
    ops: Vec<GraphOp>,
    next_id: u32,
}

impl RewriteDelta {
    pub(crate) fn new(next_id: u32) -> Self {
        Self {
            ops: Vec::new(),
            next_id,
        }
    }

    /// Records a node insertion and returns the id it will have.
    pub fn insert_node(&mut self, record: NodeRecord) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.ops.push(GraphOp::InsertNode {
            id,
            record: Box::new(record),
        });
        id
    }

    /// Records removal of the measurable capability from `node`.
    pub fn strip_measurable(&mut self, node: NodeId) {
        self.ops.push(GraphOp::StripMeasurable { node });
    }

    /// Records the replacement of `old` by `new`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        self.ops.push(GraphOp::Replace { old, new });
    }

    /// Returns `true` when nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub(crate) fn finish(self) -> (Vec<GraphOp>, u32) {
        (self.ops, self.next_id)
    }
}
