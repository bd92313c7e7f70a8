// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal in-memory model graph store.
//!
//! The store owns every node record, the side table of nodes that currently
//! carry the *measurable* capability, and the replacement table written by
//! rewrites. Nodes are keyed by monotonically allocated [`NodeId`]s, so
//! iteration in id order is both deterministic and topological.
use std::collections::{BTreeMap, BTreeSet};

use crate::delta::GraphOp;
use crate::ident::NodeId;
use crate::op::{DType, Dist, ElemwiseOp, Op, RoundKind};
use crate::record::NodeRecord;
use crate::tensor::Tensor;

/// In-memory graph storage for model expressions.
#[derive(Clone, Debug, Default)]
pub struct GraphStore {
    pub(crate) nodes: BTreeMap<NodeId, NodeRecord>,
    pub(crate) measurable: BTreeSet<NodeId>,
    pub(crate) replacements: BTreeMap<NodeId, NodeId>,
    pub(crate) next_id: u32,
}

impl GraphStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a shared reference to a node when it exists.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.nodes.get(id)
    }

    /// Returns `true` when the node exists.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// All node ids in ascending (topological) order, replaced nodes included.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Number of stored nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` when the store holds no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Id the next inserted node will receive.
    #[must_use]
    pub fn next_id(&self) -> u32 {
        self.next_id
    }

    /// Returns `true` when the node currently carries the measurable capability.
    #[must_use]
    pub fn is_measurable(&self, id: &NodeId) -> bool {
        self.measurable.contains(id)
    }

    /// Follows the replacement table to the node that currently stands for `id`.
    ///
    /// Replacements always point at newer ids, so the walk terminates.
    #[must_use]
    pub fn resolve(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(next) = self.replacements.get(&current) {
            current = *next;
        }
        current
    }

    /// Returns `true` when `id` has not been replaced by a rewrite.
    #[must_use]
    pub fn is_live(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id) && !self.replacements.contains_key(id)
    }

    /// Inserts a record and returns its freshly allocated id.
    ///
    /// Random-variable and measurable ops are flagged measurable on insert.
    pub fn insert_node(&mut self, record: NodeRecord) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.put(id, record);
        id
    }

    /// Sets the diagnostic name of an existing node.
    ///
    /// Returns `false` when the node does not exist.
    pub fn set_name(&mut self, id: NodeId, name: impl Into<String>) -> bool {
        match self.nodes.get_mut(&id) {
            Some(record) => {
                record.name = Some(name.into());
                true
            }
            None => false,
        }
    }

    /// Scalar float constant.
    pub fn constant(&mut self, value: f64) -> NodeId {
        self.insert_node(NodeRecord::new(
            Op::Constant(Tensor::scalar(value)),
            Vec::new(),
            DType::Float64,
        ))
    }

    /// Vector float constant.
    pub fn constant_vec(&mut self, values: impl Into<Vec<f64>>) -> NodeId {
        self.insert_node(NodeRecord::new(
            Op::Constant(Tensor::from_vec(values.into())),
            Vec::new(),
            DType::Float64,
        ))
    }

    /// Named value placeholder with an explicit element type.
    pub fn value(&mut self, name: &str, dtype: DType) -> NodeId {
        self.insert_node(
            NodeRecord::new(Op::Value, Vec::new(), dtype).with_name(Some(name.to_owned())),
        )
    }

    /// Value placeholder mirroring `var`'s element type and name.
    ///
    /// Returns `None` when `var` does not exist.
    pub fn value_like(&mut self, var: NodeId) -> Option<NodeId> {
        let (dtype, name) = {
            let record = self.nodes.get(&var)?;
            (record.dtype, record.name.clone())
        };
        Some(self.insert_node(NodeRecord::new(Op::Value, Vec::new(), dtype).with_name(name)))
    }

    /// `Normal(mu, sigma)` random variable.
    pub fn normal(&mut self, mu: NodeId, sigma: NodeId) -> NodeId {
        self.random(Dist::Normal, vec![mu, sigma])
    }

    /// `Poisson(mu)` random variable.
    pub fn poisson(&mut self, mu: NodeId) -> NodeId {
        self.random(Dist::Poisson, vec![mu])
    }

    /// `Uniform(lower, upper)` random variable.
    pub fn uniform(&mut self, lower: NodeId, upper: NodeId) -> NodeId {
        self.random(Dist::Uniform, vec![lower, upper])
    }

    /// `clip(x, lower, upper)`.
    pub fn clip(&mut self, x: NodeId, lower: NodeId, upper: NodeId) -> NodeId {
        let dtype = self.dtype_of(x);
        self.insert_node(NodeRecord::new(Op::Clip, vec![x, lower, upper], dtype))
    }

    /// Round half to even.
    pub fn round(&mut self, x: NodeId) -> NodeId {
        self.round_with(RoundKind::HalfToEven, x)
    }

    /// Round toward negative infinity.
    pub fn floor(&mut self, x: NodeId) -> NodeId {
        self.round_with(RoundKind::Floor, x)
    }

    /// Round toward positive infinity.
    pub fn ceil(&mut self, x: NodeId) -> NodeId {
        self.round_with(RoundKind::Ceil, x)
    }

    /// Round-family op of the given kind.
    pub fn round_with(&mut self, kind: RoundKind, x: NodeId) -> NodeId {
        let dtype = self.dtype_of(x);
        self.insert_node(NodeRecord::new(Op::Round(kind), vec![x], dtype))
    }

    /// `a + b`.
    pub fn add(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(ElemwiseOp::Add, a, b)
    }

    /// `a - b`.
    pub fn sub(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(ElemwiseOp::Sub, a, b)
    }

    /// `a * b`.
    pub fn mul(&mut self, a: NodeId, b: NodeId) -> NodeId {
        self.binary(ElemwiseOp::Mul, a, b)
    }

    /// `-a`.
    pub fn neg(&mut self, a: NodeId) -> NodeId {
        let dtype = self.dtype_of(a);
        self.insert_node(NodeRecord::new(Op::Elemwise(ElemwiseOp::Neg), vec![a], dtype))
    }

    /// `exp(a)`.
    pub fn exp(&mut self, a: NodeId) -> NodeId {
        self.insert_node(NodeRecord::new(
            Op::Elemwise(ElemwiseOp::Exp),
            vec![a],
            DType::Float64,
        ))
    }

    /// `ln(a)`.
    pub fn log(&mut self, a: NodeId) -> NodeId {
        self.insert_node(NodeRecord::new(
            Op::Elemwise(ElemwiseOp::Log),
            vec![a],
            DType::Float64,
        ))
    }

    fn random(&mut self, dist: Dist, params: Vec<NodeId>) -> NodeId {
        self.insert_node(NodeRecord::new(Op::Random(dist), params, dist.dtype()))
    }

    fn binary(&mut self, op: ElemwiseOp, a: NodeId, b: NodeId) -> NodeId {
        let dtype = self.dtype_of(a).promote(self.dtype_of(b));
        self.insert_node(NodeRecord::new(Op::Elemwise(op), vec![a, b], dtype))
    }

    fn dtype_of(&self, id: NodeId) -> DType {
        self.nodes
            .get(&id)
            .map_or(DType::Float64, |record| record.dtype)
    }

    fn put(&mut self, id: NodeId, record: NodeRecord) {
        if record.op.is_measurable_by_construction() {
            self.measurable.insert(id);
        }
        self.nodes.insert(id, record);
    }

    /// Applies one committed graph operation.
    pub(crate) fn apply_op(&mut self, op: GraphOp) {
        match op {
            GraphOp::InsertNode { id, record } => {
                self.next_id = self.next_id.max(id.0 + 1);
                self.put(id, *record);
            }
            GraphOp::StripMeasurable { node } => {
                self.measurable.remove(&node);
            }
            GraphOp::Replace { old, new } => {
                self.replacements.insert(old, new);
            }
        }
    }
}
