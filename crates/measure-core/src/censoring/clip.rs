// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! `clip` → measurable clip.
use tracing::{debug, trace};

use super::factory::{base_is_claimable, bound_side, censoring_footprint, rewrite_as_measurable};
use super::CLIP_RULE_FAMILY_ID;
use crate::constants::{BOUND_ORDER_CHECK, CATEGORY_BASIC, CATEGORY_CENSORING};
use crate::delta::RewriteDelta;
use crate::expr::{Expr, Piecewise, Predicate};
use crate::graph_view::GraphView;
use crate::ident::NodeId;
use crate::measurable::{DeriveCtx, DeriveError};
use crate::op::{Op, OpKind};
use crate::record::NodeRecord;
use crate::rule::RewriteRule;

/// Rule name for the clip rewrite.
pub const CLIP_RULE_NAME: &str = "censoring/clip";

/// Returns the clip rewrite rule.
#[must_use]
pub fn clip_rule() -> RewriteRule {
    RewriteRule {
        id: CLIP_RULE_FAMILY_ID,
        name: CLIP_RULE_NAME,
        tracks: &[OpKind::Clip],
        matcher: clip_matcher,
        executor: clip_executor,
        compute_footprint: censoring_footprint,
        priority: 0,
        tags: &[CATEGORY_BASIC, CATEGORY_CENSORING],
    }
}

fn clip_inputs(view: GraphView<'_>, scope: &NodeId) -> Option<[NodeId; 3]> {
    let record = view.node(scope)?;
    if !matches!(record.op, Op::Clip) {
        return None;
    }
    <[NodeId; 3]>::try_from(view.resolved_inputs(scope)?).ok()
}

fn clip_matcher(view: GraphView<'_>, scope: &NodeId) -> bool {
    let Some([base, _, _]) = clip_inputs(view, scope) else {
        return false;
    };
    if !base_is_claimable(view, &base) {
        trace!(scope = %scope, base = %base, "clip base is not claimable");
        return false;
    }
    true
}

fn clip_executor(view: GraphView<'_>, scope: &NodeId, delta: &mut RewriteDelta) {
    let (Some(record), Some([base, lower, upper])) = (view.node(scope), clip_inputs(view, scope))
    else {
        return;
    };
    // One-sided detection happens on the raw bound ids, before anything else.
    let (lower_side, lower) = bound_side(delta, base, lower, f64::NEG_INFINITY);
    let (upper_side, upper) = bound_side(delta, base, upper, f64::INFINITY);
    let clipped = rewrite_as_measurable(
        delta,
        *scope,
        base,
        NodeRecord::new(
            Op::MeasurableClip {
                lower: lower_side,
                upper: upper_side,
            },
            vec![base, lower, upper],
            record.dtype,
        )
        .with_name(record.name.clone()),
    );
    debug!(
        scope = %scope,
        base = %base,
        clipped = %clipped,
        ?lower_side,
        ?upper_side,
        "clip rewritten as measurable clip"
    );
}

/// Log-density of a measurable clip at `value`.
///
/// Branches, first match wins:
/// `value == lower` → base log-CDF; `value < lower` → `-inf`;
/// `value == upper` → base log-survival (plus the point mass for discrete
/// bases); `value > upper` → `-inf`; otherwise the base log-density.
/// Unbounded sides contribute no branches. Two finite sides add the
/// [`bound_order_guard`].
///
/// # Errors
/// Returns [`DeriveError::UnsupportedOp`] for other node kinds, and
/// propagates base-rule and lowering errors.
pub fn clip_logprob(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    value: Expr,
) -> Result<Expr, DeriveError> {
    let Op::MeasurableClip {
        lower: lower_side,
        upper: upper_side,
    } = node.op
    else {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule: CLIP_RULE_NAME,
        });
    };
    let &[base, lower, upper] = ctx.inputs(id, node, 3)? else {
        return Err(DeriveError::MissingNode(id));
    };
    let logprob = ctx.logprob(base, value.clone())?;
    let lower = if lower_side.is_finite() {
        Some(ctx.lower(lower)?)
    } else {
        None
    };
    let upper = if upper_side.is_finite() {
        Some(ctx.lower(upper)?)
    } else {
        None
    };
    let logcdf = if lower.is_some() || upper.is_some() {
        Some(ctx.logcdf(base, value.clone())?)
    } else {
        None
    };

    let mut density = Piecewise::new(logprob.clone());
    if let (Some(lower), Some(logcdf)) = (&lower, &logcdf) {
        density = density
            .when(Predicate::equal(value.clone(), lower.clone()), logcdf.clone())
            .when(Predicate::less(value.clone(), lower.clone()), Expr::neg_inf());
    }
    if let (Some(upper), Some(logcdf)) = (&upper, &logcdf) {
        let mut logccdf = Expr::log1mexp(logcdf.clone());
        if ctx.node(base)?.dtype.is_discrete() {
            // P(X >= upper) = P(X > upper) + P(X = upper)
            logccdf = Expr::logaddexp(logccdf, logprob);
        }
        density = density
            .when(Predicate::equal(value.clone(), upper.clone()), logccdf)
            .when(Predicate::greater(value, upper.clone()), Expr::neg_inf());
    }
    let density = density.build();
    Ok(match (lower, upper) {
        (Some(lower), Some(upper)) => bound_order_guard(density, lower, upper),
        _ => density,
    })
}

/// Wraps `density` so evaluation fails unless `lower <= upper` elementwise.
#[must_use]
pub fn bound_order_guard(density: Expr, lower: Expr, upper: Expr) -> Expr {
    Expr::check(density, Predicate::less_equal(lower, upper), BOUND_ORDER_CHECK)
}
