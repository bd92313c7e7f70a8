// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared pieces of the censoring rewrites.
use crate::delta::RewriteDelta;
use crate::footprint::Footprint;
use crate::graph_view::GraphView;
use crate::ident::NodeId;
use crate::op::{Bound, DType, Op};
use crate::record::NodeRecord;
use crate::tensor::Tensor;

/// Resolved base input of `scope`, if the node exists and has inputs.
pub(super) fn base_of(view: GraphView<'_>, scope: &NodeId) -> Option<NodeId> {
    view.resolved_inputs(scope)?.first().copied()
}

/// Base must carry the capability and must not already stand for a value.
pub(super) fn base_is_claimable(view: GraphView<'_>, base: &NodeId) -> bool {
    view.is_measurable(base) && !view.has_observed_value(base)
}

/// Classifies one clip side. A bound that is the base itself is replaced by an
/// infinite sentinel constant and tagged unbounded.
pub(super) fn bound_side(
    delta: &mut RewriteDelta,
    base: NodeId,
    bound: NodeId,
    sentinel: f64,
) -> (Bound, NodeId) {
    if bound == base {
        let id = delta.insert_node(NodeRecord::new(
            Op::Constant(Tensor::scalar(sentinel)),
            Vec::new(),
            DType::Float64,
        ));
        (Bound::Unbounded, id)
    } else {
        (Bound::Finite, bound)
    }
}

/// Strips the base, inserts the measurable replacement and redirects `scope`.
pub(super) fn rewrite_as_measurable(
    delta: &mut RewriteDelta,
    scope: NodeId,
    base: NodeId,
    record: NodeRecord,
) -> NodeId {
    delta.strip_measurable(base);
    let id = delta.insert_node(record);
    delta.replace(scope, id);
    id
}

/// Reads the scope and all its inputs; writes the scope and the base.
pub(super) fn censoring_footprint(view: GraphView<'_>, scope: &NodeId) -> Footprint {
    let mut fp = Footprint::default();
    fp.n_read.insert(*scope);
    fp.n_write.insert(*scope);
    if let Some(inputs) = view.resolved_inputs(scope) {
        if let Some(base) = inputs.first() {
            fp.n_write.insert(*base);
        }
        for input in inputs {
            fp.n_read.insert(input);
        }
    }
    fp
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::delta::GraphOp;
    use crate::graph::GraphStore;

    fn normal_model() -> (GraphStore, NodeId, NodeId) {
        let mut g = GraphStore::new();
        let mu = g.constant(0.0);
        let sigma = g.constant(1.0);
        let x = g.normal(mu, sigma);
        (g, x, sigma)
    }

    #[test]
    fn self_bound_becomes_an_unbounded_sentinel() {
        let (g, x, _) = normal_model();
        let mut delta = RewriteDelta::new(g.next_id());
        let (side, id) = bound_side(&mut delta, x, x, f64::NEG_INFINITY);
        assert_eq!(side, Bound::Unbounded);
        assert_eq!(id, NodeId(g.next_id()));

        let (ops, next_id) = delta.finish();
        assert_eq!(next_id, g.next_id() + 1);
        match ops.as_slice() {
            [GraphOp::InsertNode {
                id: inserted,
                record,
            }] => {
                assert_eq!(*inserted, id);
                assert_eq!(record.op, Op::Constant(Tensor::scalar(f64::NEG_INFINITY)));
                assert!(record.inputs.is_empty());
                assert_eq!(record.dtype, DType::Float64);
            }
            other => panic!("expected one sentinel insertion, got {other:?}"),
        }
    }

    #[test]
    fn other_bounds_are_kept_as_finite() {
        let (g, x, sigma) = normal_model();
        let mut delta = RewriteDelta::new(g.next_id());
        assert_eq!(
            bound_side(&mut delta, x, sigma, f64::INFINITY),
            (Bound::Finite, sigma)
        );
        assert!(delta.is_empty());
    }

    #[test]
    fn claimable_bases_are_measurable_and_unobserved() {
        let (g, x, sigma) = normal_model();
        let none = BTreeSet::new();
        let view = GraphView::new(&g, &none);
        assert!(base_is_claimable(view, &x));
        assert!(!base_is_claimable(view, &sigma));

        let observed = BTreeSet::from([x]);
        assert!(!base_is_claimable(GraphView::new(&g, &observed), &x));
    }

    #[test]
    fn measurable_rewrite_strips_inserts_then_replaces() {
        let (mut g, x, sigma) = normal_model();
        let scope = g.clip(x, sigma, sigma);
        let mut delta = RewriteDelta::new(g.next_id());
        let record = NodeRecord::new(
            Op::MeasurableClip {
                lower: Bound::Finite,
                upper: Bound::Finite,
            },
            vec![x, sigma, sigma],
            DType::Float64,
        );
        let id = rewrite_as_measurable(&mut delta, scope, x, record.clone());
        let (ops, _) = delta.finish();
        assert_eq!(
            ops,
            vec![
                GraphOp::StripMeasurable { node: x },
                GraphOp::InsertNode {
                    id,
                    record: Box::new(record),
                },
                GraphOp::Replace { old: scope, new: id },
            ]
        );
    }

    #[test]
    fn footprint_writes_scope_and_base_and_reads_all_inputs() {
        let (mut g, x, sigma) = normal_model();
        let lower = g.constant(-1.0);
        let scope = g.clip(x, lower, sigma);
        let none = BTreeSet::new();
        let view = GraphView::new(&g, &none);
        assert_eq!(base_of(view, &scope), Some(x));

        let fp = censoring_footprint(view, &scope);
        assert!(fp.n_write.contains(&scope));
        assert!(fp.n_write.contains(&x));
        assert!(!fp.n_write.contains(&lower));
        for id in [scope, x, lower, sigma] {
            assert!(fp.n_read.contains(&id), "missing read of {id}");
        }
    }
}
