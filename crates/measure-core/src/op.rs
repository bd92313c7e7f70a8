// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Operation vocabulary for model graphs.
//!
//! An [`Op`] is the payload of a node. Distribution parameters, clip bounds and
//! elementwise operands are never stored inside the op; they are node inputs,
//! so the rewrite engine can see (and footprint) every dependency.

use crate::ident::{make_type_id, TypeId};
use crate::tensor::Tensor;

/// Element type of the values a node produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DType {
    /// Continuous 64-bit floating point.
    Float64,
    /// Discrete 64-bit integer (stored as `f64` in tensors).
    Int64,
}

impl DType {
    /// Returns `true` for integer element types.
    #[must_use]
    pub fn is_discrete(self) -> bool {
        matches!(self, Self::Int64)
    }

    /// Result type of an elementwise op over `self` and `other`.
    #[must_use]
    pub fn promote(self, other: Self) -> Self {
        if self.is_discrete() && other.is_discrete() {
            Self::Int64
        } else {
            Self::Float64
        }
    }
}

/// Base distributions a random-variable node can draw from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dist {
    /// `Normal(mu, sigma)`.
    Normal,
    /// `Poisson(mu)`.
    Poisson,
    /// `Uniform(lower, upper)`.
    Uniform,
}

impl Dist {
    /// Number of parameter inputs.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Normal | Self::Uniform => 2,
            Self::Poisson => 1,
        }
    }

    /// Element type of draws.
    #[must_use]
    pub fn dtype(self) -> DType {
        match self {
            Self::Normal | Self::Uniform => DType::Float64,
            Self::Poisson => DType::Int64,
        }
    }
}

/// Rounding modes of the round family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RoundKind {
    /// Round half to even (banker's rounding).
    HalfToEven,
    /// Round toward negative infinity.
    Floor,
    /// Round toward positive infinity.
    Ceil,
}

impl RoundKind {
    /// Name used in diagnostics and hashing.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HalfToEven => "round_half_to_even",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
        }
    }

    /// Offsets `(lower, upper)` from a grid point to the edges of the interval
    /// of base values that round onto it.
    #[must_use]
    pub fn bracket(self) -> (f64, f64) {
        match self {
            Self::HalfToEven => (-0.5, 0.5),
            Self::Floor => (0.0, 1.0),
            Self::Ceil => (-1.0, 0.0),
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::HalfToEven => 0,
            Self::Floor => 1,
            Self::Ceil => 2,
        }
    }
}

/// Deterministic elementwise operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElemwiseOp {
    /// `a + b`.
    Add,
    /// `a - b`.
    Sub,
    /// `a * b`.
    Mul,
    /// `-a`.
    Neg,
    /// `exp(a)`.
    Exp,
    /// `ln(a)`.
    Log,
}

impl ElemwiseOp {
    /// Number of operands.
    #[must_use]
    pub fn arity(self) -> usize {
        match self {
            Self::Add | Self::Sub | Self::Mul => 2,
            Self::Neg | Self::Exp | Self::Log => 1,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Add => 0,
            Self::Sub => 1,
            Self::Mul => 2,
            Self::Neg => 3,
            Self::Exp => 4,
            Self::Log => 5,
        }
    }
}

/// Whether one side of a measurable clip bounds the base.
///
/// An `Unbounded` side still has an input (a `±inf` constant) but contributes
/// no branch to the clip log-density.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Bound {
    /// The side is a finite bound expression.
    Finite,
    /// The side was the base variable itself; the clip is one-sided.
    Unbounded,
}

impl Bound {
    /// Returns `true` for [`Bound::Finite`].
    #[must_use]
    pub fn is_finite(self) -> bool {
        matches!(self, Self::Finite)
    }
}

/// Payload of a graph node.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// Literal data.
    Constant(Tensor),
    /// Placeholder for an observed value; bound at evaluation time.
    Value,
    /// Random draw from a base distribution; inputs are the parameters.
    Random(Dist),
    /// Deterministic elementwise op; inputs are the operands.
    Elemwise(ElemwiseOp),
    /// `clip(x, lower, upper)`; inputs `[x, lower, upper]`.
    Clip,
    /// Round-family op; input `[x]`.
    Round(RoundKind),
    /// Measurable clip produced by the censoring rewrite; inputs `[base, lower, upper]`.
    MeasurableClip {
        /// Lower side.
        lower: Bound,
        /// Upper side.
        upper: Bound,
    },
    /// Measurable round produced by the censoring rewrite; input `[base]`.
    MeasurableRound(RoundKind),
}

impl Op {
    /// Discriminant without payload.
    #[must_use]
    pub fn kind(&self) -> OpKind {
        match self {
            Self::Constant(_) => OpKind::Constant,
            Self::Value => OpKind::Value,
            Self::Random(Dist::Normal) => OpKind::Normal,
            Self::Random(Dist::Poisson) => OpKind::Poisson,
            Self::Random(Dist::Uniform) => OpKind::Uniform,
            Self::Elemwise(_) => OpKind::Elemwise,
            Self::Clip => OpKind::Clip,
            Self::Round(_) => OpKind::Round,
            Self::MeasurableClip { .. } => OpKind::MeasurableClip,
            Self::MeasurableRound(_) => OpKind::MeasurableRound,
        }
    }

    /// Expected number of inputs.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Constant(_) | Self::Value => 0,
            Self::Random(dist) => dist.arity(),
            Self::Elemwise(op) => op.arity(),
            Self::Clip | Self::MeasurableClip { .. } => 3,
            Self::Round(_) | Self::MeasurableRound(_) => 1,
        }
    }

    /// Nodes created with this op start out in the measurable set.
    #[must_use]
    pub fn is_measurable_by_construction(&self) -> bool {
        matches!(
            self,
            Self::Random(_) | Self::MeasurableClip { .. } | Self::MeasurableRound(_)
        )
    }

    /// Canonical payload bytes folded into snapshot hashes.
    pub(crate) fn payload_bytes(&self) -> Vec<u8> {
        match self {
            Self::Constant(tensor) => {
                let mut out = Vec::with_capacity(8 + tensor.len() * 8);
                out.extend_from_slice(&(tensor.len() as u64).to_le_bytes());
                for x in tensor.as_slice() {
                    out.extend_from_slice(&x.to_bits().to_le_bytes());
                }
                out
            }
            Self::Elemwise(op) => vec![op.tag()],
            Self::Round(kind) | Self::MeasurableRound(kind) => vec![kind.tag()],
            Self::MeasurableClip { lower, upper } => {
                vec![u8::from(lower.is_finite()), u8::from(upper.is_finite())]
            }
            Self::Value | Self::Random(_) | Self::Clip => Vec::new(),
        }
    }
}

/// Payload-free operation kinds; the key of the capability table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum OpKind {
    /// [`Op::Constant`].
    Constant,
    /// [`Op::Value`].
    Value,
    /// `Op::Random(Dist::Normal)`.
    Normal,
    /// `Op::Random(Dist::Poisson)`.
    Poisson,
    /// `Op::Random(Dist::Uniform)`.
    Uniform,
    /// [`Op::Elemwise`].
    Elemwise,
    /// [`Op::Clip`].
    Clip,
    /// [`Op::Round`].
    Round,
    /// [`Op::MeasurableClip`].
    MeasurableClip,
    /// [`Op::MeasurableRound`].
    MeasurableRound,
}

impl OpKind {
    /// Stable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Constant => "constant",
            Self::Value => "value",
            Self::Normal => "normal",
            Self::Poisson => "poisson",
            Self::Uniform => "uniform",
            Self::Elemwise => "elemwise",
            Self::Clip => "clip",
            Self::Round => "round",
            Self::MeasurableClip => "measurable_clip",
            Self::MeasurableRound => "measurable_round",
        }
    }

    /// Domain-separated type id (`type:op:<label>`).
    #[must_use]
    pub fn type_id(self) -> TypeId {
        make_type_id(&format!("op:{}", self.label()))
    }
}
