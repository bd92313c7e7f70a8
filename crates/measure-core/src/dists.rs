// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Base distribution density rules.
//!
//! Each rule lowers the distribution parameters, builds the elementwise
//! special-function call and wraps it in a parameter guard. The guards are the
//! only place invalid parameters are reported; the numeric kernels in
//! [`crate::math`] assume valid parameters.
use crate::expr::{Expr, Predicate, SpecialFn};
use crate::ident::NodeId;
use crate::measurable::{CapabilityRegistry, DeriveCtx, DeriveError, MeasurableRules};
use crate::op::{Dist, Op, OpKind};
use crate::record::NodeRecord;

/// Registers Normal, Poisson and Uniform density rules.
pub fn register_logprob(registry: &mut CapabilityRegistry) {
    registry.register(
        OpKind::Normal,
        MeasurableRules {
            logprob: normal_logprob,
            logcdf: Some(normal_logcdf),
        },
    );
    registry.register(
        OpKind::Poisson,
        MeasurableRules {
            logprob: poisson_logprob,
            logcdf: Some(poisson_logcdf),
        },
    );
    registry.register(
        OpKind::Uniform,
        MeasurableRules {
            logprob: uniform_logprob,
            logcdf: Some(uniform_logcdf),
        },
    );
}

fn params(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    dist: Dist,
    rule: &'static str,
) -> Result<Vec<Expr>, DeriveError> {
    if node.op != Op::Random(dist) {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule,
        });
    }
    ctx.inputs(id, node, dist.arity())?
        .iter()
        .map(|param| ctx.lower(*param))
        .collect()
}

fn normal(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    value: Expr,
    f: SpecialFn,
) -> Result<Expr, DeriveError> {
    let mut p = params(ctx, id, node, Dist::Normal, "normal")?.into_iter();
    let (Some(mu), Some(sigma)) = (p.next(), p.next()) else {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule: "normal",
        });
    };
    Ok(Expr::check(
        Expr::special(f, vec![value, mu, sigma.clone()]),
        Predicate::greater(sigma, Expr::constant(0.0)),
        "sigma > 0",
    ))
}

fn normal_logprob(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    normal(ctx, id, node, value, SpecialFn::NormalLogPdf)
}

fn normal_logcdf(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    normal(ctx, id, node, value, SpecialFn::NormalLogCdf)
}

fn poisson(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    value: Expr,
    f: SpecialFn,
) -> Result<Expr, DeriveError> {
    let Some(mu) = params(ctx, id, node, Dist::Poisson, "poisson")?.into_iter().next() else {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule: "poisson",
        });
    };
    Ok(Expr::check(
        Expr::special(f, vec![value, mu.clone()]),
        Predicate::greater_equal(mu, Expr::constant(0.0)),
        "mu >= 0",
    ))
}

fn poisson_logprob(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    poisson(ctx, id, node, value, SpecialFn::PoissonLogPmf)
}

fn poisson_logcdf(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    poisson(ctx, id, node, value, SpecialFn::PoissonLogCdf)
}

fn uniform(
    ctx: &DeriveCtx<'_>,
    id: NodeId,
    node: &NodeRecord,
    value: Expr,
    f: SpecialFn,
) -> Result<Expr, DeriveError> {
    let mut p = params(ctx, id, node, Dist::Uniform, "uniform")?.into_iter();
    let (Some(lower), Some(upper)) = (p.next(), p.next()) else {
        return Err(DeriveError::UnsupportedOp {
            op: node.op.kind().label(),
            rule: "uniform",
        });
    };
    Ok(Expr::check(
        Expr::special(f, vec![value, lower.clone(), upper.clone()]),
        Predicate::less(lower, upper),
        "lower < upper",
    ))
}

fn uniform_logprob(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    uniform(ctx, id, node, value, SpecialFn::UniformLogPdf)
}

fn uniform_logcdf(ctx: &DeriveCtx<'_>, id: NodeId, node: &NodeRecord, value: Expr) -> Result<Expr, DeriveError> {
    uniform(ctx, id, node, value, SpecialFn::UniformLogCdf)
}
