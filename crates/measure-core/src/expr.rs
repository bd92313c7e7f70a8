// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Symbolic log-density expressions.
//!
//! Derivation rules return [`Expr`] trees rather than numbers: the same term
//! can be evaluated for many observed values, inspected structurally (e.g. the
//! branch count of a clip density) and summed into a joint expression. The only
//! leaves are constants and [`Expr::Input`] references to value nodes; random
//! variables never appear in a derived expression.
use std::collections::BTreeSet;

use crate::ident::NodeId;
use crate::op::RoundKind;
use crate::tensor::Tensor;

/// Elementwise unary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `-x`.
    Neg,
    /// `exp(x)`.
    Exp,
    /// `ln(x)`.
    Log,
    /// `ln(1 - exp(x))`.
    Log1mexp,
    /// Round half to even.
    Round,
    /// Floor.
    Floor,
    /// Ceil.
    Ceil,
}

impl From<RoundKind> for UnaryOp {
    fn from(kind: RoundKind) -> Self {
        match kind {
            RoundKind::HalfToEven => Self::Round,
            RoundKind::Floor => Self::Floor,
            RoundKind::Ceil => Self::Ceil,
        }
    }
}

/// Elementwise binary operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// `a + b`.
    Add,
    /// `a - b`.
    Sub,
    /// `a * b`.
    Mul,
    /// `ln(exp(a) + exp(b))`.
    LogAddExp,
    /// `ln(exp(a) - exp(b))`.
    LogDiffExp,
}

/// Elementwise comparisons.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compare {
    /// `a == b`.
    Eq,
    /// `a < b`.
    Lt,
    /// `a <= b`.
    Le,
    /// `a > b`.
    Gt,
    /// `a >= b`.
    Ge,
}

impl Compare {
    /// Applies the comparison to scalars.
    #[must_use]
    pub fn holds(self, a: f64, b: f64) -> bool {
        match self {
            Self::Eq => a == b,
            Self::Lt => a < b,
            Self::Le => a <= b,
            Self::Gt => a > b,
            Self::Ge => a >= b,
        }
    }
}

/// Distribution functions evaluated elementwise over their argument list.
///
/// The first argument is always the point of evaluation; the rest are the
/// distribution parameters in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SpecialFn {
    /// `(x, mu, sigma)`.
    NormalLogPdf,
    /// `(x, mu, sigma)`.
    NormalLogCdf,
    /// `(k, mu)`.
    PoissonLogPmf,
    /// `(k, mu)`.
    PoissonLogCdf,
    /// `(x, lower, upper)`.
    UniformLogPdf,
    /// `(x, lower, upper)`.
    UniformLogCdf,
}

impl SpecialFn {
    /// Number of arguments, the evaluation point included.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::NormalLogPdf | Self::NormalLogCdf | Self::UniformLogPdf | Self::UniformLogCdf => 3,
            Self::PoissonLogPmf | Self::PoissonLogCdf => 2,
        }
    }
}

/// Elementwise boolean condition `lhs <cmp> rhs`.
#[derive(Clone, Debug, PartialEq)]
pub struct Predicate {
    /// Comparison.
    pub cmp: Compare,
    /// Left operand.
    pub lhs: Box<Expr>,
    /// Right operand.
    pub rhs: Box<Expr>,
}

impl Predicate {
    /// Builds `lhs <cmp> rhs`.
    #[must_use]
    pub fn new(cmp: Compare, lhs: Expr, rhs: Expr) -> Self {
        Self {
            cmp,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    /// `lhs == rhs`.
    #[must_use]
    pub fn equal(lhs: Expr, rhs: Expr) -> Self {
        Self::new(Compare::Eq, lhs, rhs)
    }

    /// `lhs < rhs`.
    #[must_use]
    pub fn less(lhs: Expr, rhs: Expr) -> Self {
        Self::new(Compare::Lt, lhs, rhs)
    }

    /// `lhs <= rhs`.
    #[must_use]
    pub fn less_equal(lhs: Expr, rhs: Expr) -> Self {
        Self::new(Compare::Le, lhs, rhs)
    }

    /// `lhs > rhs`.
    #[must_use]
    pub fn greater(lhs: Expr, rhs: Expr) -> Self {
        Self::new(Compare::Gt, lhs, rhs)
    }

    /// `lhs >= rhs`.
    #[must_use]
    pub fn greater_equal(lhs: Expr, rhs: Expr) -> Self {
        Self::new(Compare::Ge, lhs, rhs)
    }
}

/// One arm of a [`Piecewise`] selection.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    /// Condition.
    pub when: Predicate,
    /// Value where the condition holds.
    pub then: Expr,
}

/// Elementwise first-match selection over ordered branches.
#[derive(Clone, Debug, PartialEq)]
pub struct Piecewise {
    /// Branches in priority order.
    pub branches: Vec<Branch>,
    /// Value where no branch holds.
    pub otherwise: Box<Expr>,
}

impl Piecewise {
    /// Starts a selection with the given fallback.
    #[must_use]
    pub fn new(otherwise: Expr) -> Self {
        Self {
            branches: Vec::new(),
            otherwise: Box::new(otherwise),
        }
    }

    /// Appends a branch; earlier branches win.
    #[must_use]
    pub fn when(mut self, when: Predicate, then: Expr) -> Self {
        self.branches.push(Branch { when, then });
        self
    }

    /// Finishes the selection. Without branches this is just the fallback.
    #[must_use]
    pub fn build(self) -> Expr {
        if self.branches.is_empty() {
            *self.otherwise
        } else {
            Expr::Piecewise(self)
        }
    }
}

/// Symbolic elementwise expression over value inputs.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Literal tensor.
    Const(Tensor),
    /// Observed value bound at evaluation time.
    Input(NodeId),
    /// Unary op.
    Unary(UnaryOp, Box<Expr>),
    /// Binary op.
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// `clamp(x, lower, upper)`.
    Clamp(Box<Expr>, Box<Expr>, Box<Expr>),
    /// Distribution function.
    Special(SpecialFn, Vec<Expr>),
    /// First-match selection.
    Piecewise(Piecewise),
    /// Evaluates `body` only if `cond` holds for every element.
    Check {
        /// Guarded expression.
        body: Box<Expr>,
        /// Condition that must hold elementwise.
        cond: Predicate,
        /// Reported when the condition fails.
        msg: &'static str,
    },
    /// Sum of all elements, as a scalar.
    Sum(Box<Expr>),
}

impl Expr {
    /// Scalar constant.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::Const(Tensor::scalar(value))
    }

    /// Scalar `-inf`.
    #[must_use]
    pub fn neg_inf() -> Self {
        Self::constant(f64::NEG_INFINITY)
    }

    /// Unary node.
    #[must_use]
    pub fn unary(op: UnaryOp, x: Self) -> Self {
        Self::Unary(op, Box::new(x))
    }

    /// Binary node.
    #[must_use]
    pub fn binary(op: BinaryOp, a: Self, b: Self) -> Self {
        Self::Binary(op, Box::new(a), Box::new(b))
    }

    /// `a + b`.
    #[must_use]
    pub fn add(a: Self, b: Self) -> Self {
        Self::binary(BinaryOp::Add, a, b)
    }

    /// `ln(1 - exp(x))`.
    #[must_use]
    pub fn log1mexp(x: Self) -> Self {
        Self::unary(UnaryOp::Log1mexp, x)
    }

    /// `ln(exp(a) + exp(b))`.
    #[must_use]
    pub fn logaddexp(a: Self, b: Self) -> Self {
        Self::binary(BinaryOp::LogAddExp, a, b)
    }

    /// `ln(exp(a) - exp(b))`.
    #[must_use]
    pub fn logdiffexp(a: Self, b: Self) -> Self {
        Self::binary(BinaryOp::LogDiffExp, a, b)
    }

    /// Clamp.
    #[must_use]
    pub fn clamp(x: Self, lower: Self, upper: Self) -> Self {
        Self::Clamp(Box::new(x), Box::new(lower), Box::new(upper))
    }

    /// Distribution function call.
    #[must_use]
    pub fn special(f: SpecialFn, args: Vec<Self>) -> Self {
        Self::Special(f, args)
    }

    /// Guarded expression.
    #[must_use]
    pub fn check(body: Self, cond: Predicate, msg: &'static str) -> Self {
        Self::Check {
            body: Box::new(body),
            cond,
            msg,
        }
    }

    /// Scalar sum.
    #[must_use]
    pub fn sum(x: Self) -> Self {
        Self::Sum(Box::new(x))
    }

    /// Returns the selection when this is a [`Expr::Piecewise`].
    #[must_use]
    pub fn as_piecewise(&self) -> Option<&Piecewise> {
        match self {
            Self::Piecewise(pw) => Some(pw),
            _ => None,
        }
    }

    /// Strips any number of [`Expr::Check`] wrappers.
    #[must_use]
    pub fn unguarded(&self) -> &Self {
        let mut current = self;
        while let Self::Check { body, .. } = current {
            current = body;
        }
        current
    }

    /// Every value node referenced by the expression.
    #[must_use]
    pub fn inputs(&self) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        self.collect_inputs(&mut out);
        out
    }

    fn collect_inputs(&self, out: &mut BTreeSet<NodeId>) {
        match self {
            Self::Const(_) => {}
            Self::Input(id) => {
                out.insert(*id);
            }
            Self::Unary(_, x) | Self::Sum(x) => x.collect_inputs(out),
            Self::Binary(_, a, b) => {
                a.collect_inputs(out);
                b.collect_inputs(out);
            }
            Self::Clamp(x, lo, hi) => {
                x.collect_inputs(out);
                lo.collect_inputs(out);
                hi.collect_inputs(out);
            }
            Self::Special(_, args) => {
                for arg in args {
                    arg.collect_inputs(out);
                }
            }
            Self::Piecewise(pw) => {
                for branch in &pw.branches {
                    branch.when.lhs.collect_inputs(out);
                    branch.when.rhs.collect_inputs(out);
                    branch.then.collect_inputs(out);
                }
                pw.otherwise.collect_inputs(out);
            }
            Self::Check { body, cond, .. } => {
                cond.lhs.collect_inputs(out);
                cond.rhs.collect_inputs(out);
                body.collect_inputs(out);
            }
        }
    }
}
