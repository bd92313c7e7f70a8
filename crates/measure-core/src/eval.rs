// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Numeric evaluation of [`Expr`] trees.
use std::collections::BTreeMap;

use thiserror::Error;

use crate::expr::{BinaryOp, Expr, Piecewise, Predicate, SpecialFn, UnaryOp};
use crate::ident::NodeId;
use crate::math;
use crate::tensor::{broadcast_len, Tensor};

/// Values bound to [`Expr::Input`] leaves.
pub type Inputs = BTreeMap<NodeId, Tensor>;

/// Errors raised while evaluating an expression.
#[derive(Debug, Error, PartialEq)]
pub enum EvalError {
    /// An input leaf had no bound value.
    #[error("no value bound for {0}")]
    MissingInput(NodeId),
    /// Two operands could not be broadcast together.
    #[error("shape mismatch: {left} vs {right} elements")]
    ShapeMismatch {
        /// Length of the first operand.
        left: usize,
        /// Length of the offending operand.
        right: usize,
    },
    /// A parameter or bound guard failed.
    #[error("check failed: {0}")]
    CheckFailed(&'static str),
    /// A distribution function received the wrong number of arguments.
    #[error("{f:?} expects {expected} arguments, got {found}")]
    BadArity {
        /// Function.
        f: SpecialFn,
        /// Expected count.
        expected: usize,
        /// Supplied count.
        found: usize,
    },
}

impl Expr {
    /// Evaluates the expression elementwise.
    ///
    /// # Errors
    /// Returns [`EvalError`] on unbound inputs, incompatible shapes, failed
    /// checks or malformed distribution calls.
    pub fn eval(&self, inputs: &Inputs) -> Result<Tensor, EvalError> {
        match self {
            Self::Const(t) => Ok(t.clone()),
            Self::Input(id) => inputs.get(id).cloned().ok_or(EvalError::MissingInput(*id)),
            Self::Unary(op, x) => {
                let x = x.eval(inputs)?;
                Ok(x.map(unary_fn(*op)))
            }
            Self::Binary(op, a, b) => {
                let a = a.eval(inputs)?;
                let b = b.eval(inputs)?;
                a.zip_map(&b, binary_fn(*op))
            }
            Self::Clamp(x, lo, hi) => {
                let x = x.eval(inputs)?;
                let lo = lo.eval(inputs)?;
                let hi = hi.eval(inputs)?;
                x.zip_map(&lo, nan_max)?.zip_map(&hi, nan_min)
            }
            Self::Special(f, args) => eval_special(*f, args, inputs),
            Self::Piecewise(pw) => eval_piecewise(pw, inputs),
            Self::Check { body, cond, msg } => {
                let mask = eval_predicate(cond, inputs)?;
                if mask.iter().all(|held| *held) {
                    body.eval(inputs)
                } else {
                    Err(EvalError::CheckFailed(*msg))
                }
            }
            Self::Sum(x) => Ok(Tensor::scalar(x.eval(inputs)?.sum())),
        }
    }
}

fn unary_fn(op: UnaryOp) -> fn(f64) -> f64 {
    match op {
        UnaryOp::Neg => |x| -x,
        UnaryOp::Exp => f64::exp,
        UnaryOp::Log => f64::ln,
        UnaryOp::Log1mexp => math::log1mexp,
        UnaryOp::Round => math::round_half_to_even,
        UnaryOp::Floor => f64::floor,
        UnaryOp::Ceil => f64::ceil,
    }
}

/// `f64::max` ignores a NaN operand; clipping must propagate it.
fn nan_max(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.max(b)
    }
}

fn nan_min(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() {
        f64::NAN
    } else {
        a.min(b)
    }
}

fn binary_fn(op: BinaryOp) -> fn(f64, f64) -> f64 {
    match op {
        BinaryOp::Add => |a, b| a + b,
        BinaryOp::Sub => |a, b| a - b,
        BinaryOp::Mul => |a, b| a * b,
        BinaryOp::LogAddExp => math::logaddexp,
        BinaryOp::LogDiffExp => math::logdiffexp,
    }
}

fn eval_predicate(pred: &Predicate, inputs: &Inputs) -> Result<Vec<bool>, EvalError> {
    let lhs = pred.lhs.eval(inputs)?;
    let rhs = pred.rhs.eval(inputs)?;
    let len = broadcast_len(&[lhs.len(), rhs.len()])?;
    Ok((0..len).map(|i| pred.cmp.holds(lhs.at(i), rhs.at(i))).collect())
}

fn eval_special(f: SpecialFn, args: &[Expr], inputs: &Inputs) -> Result<Tensor, EvalError> {
    if args.len() != f.arity() {
        return Err(EvalError::BadArity {
            f,
            expected: f.arity(),
            found: args.len(),
        });
    }
    let args = args
        .iter()
        .map(|arg| arg.eval(inputs))
        .collect::<Result<Vec<_>, _>>()?;
    let lens: Vec<usize> = args.iter().map(Tensor::len).collect();
    let len = broadcast_len(&lens)?;
    let out = (0..len)
        .map(|i| {
            let x = args[0].at(i);
            let p = args[1].at(i);
            match f {
                SpecialFn::NormalLogPdf => math::normal_logpdf(x, p, args[2].at(i)),
                SpecialFn::NormalLogCdf => math::normal_logcdf(x, p, args[2].at(i)),
                SpecialFn::PoissonLogPmf => math::poisson_logpmf(x, p),
                SpecialFn::PoissonLogCdf => math::poisson_logcdf(x, p),
                SpecialFn::UniformLogPdf => math::uniform_logpdf(x, p, args[2].at(i)),
                SpecialFn::UniformLogCdf => math::uniform_logcdf(x, p, args[2].at(i)),
            }
        })
        .collect();
    Ok(Tensor::from_vec(out))
}

fn eval_piecewise(pw: &Piecewise, inputs: &Inputs) -> Result<Tensor, EvalError> {
    let otherwise = pw.otherwise.eval(inputs)?;
    let mut arms = Vec::with_capacity(pw.branches.len());
    let mut lens = vec![otherwise.len()];
    for branch in &pw.branches {
        let mask = eval_predicate(&branch.when, inputs)?;
        let then = branch.then.eval(inputs)?;
        lens.push(mask.len());
        lens.push(then.len());
        arms.push((mask, then));
    }
    let len = broadcast_len(&lens)?;
    let out = (0..len)
        .map(|i| {
            arms.iter()
                .find(|(mask, _)| mask[if mask.len() == 1 { 0 } else { i }])
                .map_or_else(|| otherwise.at(i), |(_, then)| then.at(i))
        })
        .collect();
    Ok(Tensor::from_vec(out))
}
