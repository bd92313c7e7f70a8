// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `round` / `floor` / `ceil` → measurable round.
use tracing::{debug, trace};

use super::factory::{base_is_claimable, base_of, censoring_footprint, rewrite_as_measurable};
use super::ROUND_RULE_FAMILY_ID;
use crate::constants::{CATEGORY_BASIC, CATEGORY_CENSORING};
use crate::delta::RewriteDelta;
use crate::expr::{Expr, Predicate, UnaryOp};
use crate::graph_view::GraphView;
use crate::ident::NodeId;
use crate::measurable::{DeriveCtx, DeriveError};
use crate::op::{Op, OpKind};
use crate::record::NodeRecord;
use crate::rule::RewriteRule;

/// Rule name for the round-family rewrite.
pub const ROUND_RULE_NAME: &str = "censoring/round";

const ROUND_GRID_CHECK: &str = "value lies on the rounding grid";

/// Returns the round-family rewrite rule.
#[must_use]
pub fn round_rule() -> RewriteRule {
    RewriteRule {
        id: ROUND_RULE_FAMILY_ID,
        name: ROUND_RULE_NAME,
        tracks: &[OpKind::Round],
        matcher: round_matcher,
        executor: round_executor,
        compute_footprint: censoring_footprint,
        priority: 0,
        tags: &[CATEGORY_BASIC, CATEGORY_CENSORING],
    }
}

fn round_matcher(view: GraphView<'_>, scope: &NodeId) -> bool {
    let Some(record) = view.node(scope) else {
        return false;
    };
    if !matches!(record.op, Op::Round(_)) {
        return false;
    }
    let Some(base) = base_of(view, scope) else {
        return false;
    };
    if !base_is_claimable(view, &base) {
        trace!(scope = %scope, base = %base, "round base is not claimable");
        return false;
    }
    // Rounding an integer variable is the identity; there is nothing to censor.
    view.node(&base)
        .is_some_and(|base_record| !base_record.dtype.is_discrete())
}

fn round_executor(view: GraphView<'_>, scope: &NodeId, delta: &mut RewriteDelta) {
    let Some(record) = view.node(scope) else {
        return;
    };
    let (Op::Round(kind), Some(base)) = (&record.op, base_of(view, scope)) else {
        return;
    };
    let rounded = rewrite_as_measurable(
        delta,
        *scope,
        base,
        NodeRecord::new(Op::MeasurableRound(*kind), vec![base], record.dtype)
            .with_name(record.name.clone()),
    );
    debug!(
        scope = %scope,
        base = %base,
        rounded = %rounded,
        kind = kind.name(),
        "round rewritten as measurable round"
    );
}

/// Log-mass of a measurable round at `value`.
///
/// The value is snapped with the node's rounding mode, bracketed by the
/// interval of base values that round onto it, and the base log-CDF
/// difference over that interval is returned. With
/// `validate_round_grid` enabled the result is guarded so off-grid values
/// fail evaluation instead.
///
/// # Errors
/// Returns [`DeriveError::UnsupportedOp`] for other node kinds, and
/// propagates base-rule errors.
pub fn round_logprob(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    value: Expr,
) -> Result<Expr, DeriveError> {
    let Op::MeasurableRound(kind) = node.op else {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule: ROUND_RULE_NAME,
        });
    };
    let &[base] = ctx.inputs(id, node, 1)? else {
        return Err(DeriveError::MissingNode(id));
    };
    let snapped = Expr::unary(UnaryOp::from(kind), value.clone());
    let (below, above) = kind.bracket();
    let edge = |offset: f64| {
        if offset == 0.0 {
            snapped.clone()
        } else {
            Expr::add(snapped.clone(), Expr::constant(offset))
        }
    };
    let logcdf_upper = ctx.logcdf(base, edge(above))?;
    let logcdf_lower = ctx.logcdf(base, edge(below))?;
    let mass = Expr::logdiffexp(logcdf_upper, logcdf_lower);
    if ctx.config().validate_round_grid {
        Ok(Expr::check(mass, Predicate::equal(value, snapped), ROUND_GRID_CHECK))
    } else {
        Ok(mass)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used)]
mod tests {
    use std::collections::{BTreeMap, BTreeSet};

    use super::*;
    use crate::config::LogprobConfig;
    use crate::graph::GraphStore;
    use crate::measurable::CapabilityRegistry;
    use crate::op::{DType, RoundKind};

    #[test]
    fn density_rule_rejects_nodes_that_are_not_measurable_rounds() {
        let mut g = GraphStore::new();
        let mu = g.constant(0.0);
        let sigma = g.constant(1.0);
        let x = g.normal(mu, sigma);
        let r = g.floor(x);
        let registry = CapabilityRegistry::with_defaults();
        let substitutions = BTreeMap::new();
        let config = LogprobConfig::default();
        let ctx = DeriveCtx::new(&g, &registry, &substitutions, &config);

        for id in [x, r] {
            let record = g.node(&id).expect("node exists");
            let err = round_logprob(&ctx, id, record, Expr::constant(0.0))
                .expect_err("only measurable rounds have a round density");
            assert!(
                matches!(
                    err,
                    DeriveError::UnsupportedOp { op, rule: ROUND_RULE_NAME }
                        if op == record.op.kind().label()
                ),
                "unexpected error: {err:?}"
            );
        }
    }

    #[test]
    fn matcher_skips_discrete_and_observed_bases() {
        let mut g = GraphStore::new();
        let rate = g.constant(3.0);
        let k = g.poisson(rate);
        let rounded_k = g.round(k);
        let sigma = g.constant(1.0);
        let x = g.normal(rate, sigma);
        let rounded_x = g.ceil(x);

        let none = BTreeSet::new();
        let view = GraphView::new(&g, &none);
        assert!(!round_matcher(view, &rounded_k));
        assert!(round_matcher(view, &rounded_x));
        assert!(!round_matcher(view, &x));

        let observed = BTreeSet::from([x]);
        assert!(!round_matcher(GraphView::new(&g, &observed), &rounded_x));
    }

    #[test]
    fn grid_validation_wraps_the_mass_in_a_check() {
        let mut g = GraphStore::new();
        let mu = g.constant(0.0);
        let sigma = g.constant(1.0);
        let x = g.normal(mu, sigma);
        let r = g.insert_node(NodeRecord::new(
            Op::MeasurableRound(RoundKind::HalfToEven),
            vec![x],
            DType::Float64,
        ));
        let registry = CapabilityRegistry::with_defaults();
        let substitutions = BTreeMap::new();
        let record = g.node(&r).expect("round exists");

        let plain = LogprobConfig::default();
        let ctx = DeriveCtx::new(&g, &registry, &substitutions, &plain);
        let mass = round_logprob(&ctx, r, record, Expr::constant(0.0)).expect("derives");
        assert!(!matches!(mass, Expr::Check { msg: ROUND_GRID_CHECK, .. }));

        let strict = LogprobConfig {
            validate_round_grid: true,
            ..LogprobConfig::default()
        };
        let ctx = DeriveCtx::new(&g, &registry, &substitutions, &strict);
        let guarded = round_logprob(&ctx, r, record, Expr::constant(0.0)).expect("derives");
        assert!(matches!(guarded, Expr::Check { msg: ROUND_GRID_CHECK, .. }));
    }
}
