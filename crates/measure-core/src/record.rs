// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Node records stored inside the graph.
use crate::ident::NodeId;
use crate::op::{DType, Op};

/// Materialised record for a single graph node.
///
/// Records are immutable once inserted apart from their diagnostic `name`.
/// Rewrites never edit a record in place; they insert a replacement node.
#[derive(Clone, Debug, PartialEq)]
pub struct NodeRecord {
    /// Operation payload.
    pub op: Op,
    /// Ordered inputs; meaning depends on `op`.
    pub inputs: Vec<NodeId>,
    /// Element type of the produced value.
    pub dtype: DType,
    /// Optional diagnostic label.
    pub name: Option<String>,
}

impl NodeRecord {
    /// Creates an unnamed record.
    #[must_use]
    pub fn new(op: Op, inputs: Vec<NodeId>, dtype: DType) -> Self {
        Self {
            op,
            inputs,
            dtype,
            name: None,
        }
    }

    /// Builder-style name assignment.
    #[must_use]
    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Label for diagnostics: the name when present, otherwise `node#<id>`.
    #[must_use]
    pub fn display_name(&self, id: NodeId) -> String {
        self.name.clone().unwrap_or_else(|| id.to_string())
    }
}
