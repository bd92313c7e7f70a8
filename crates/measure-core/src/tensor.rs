// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Dense `f64` tensors used for constants and evaluation results.
//!
//! Tensors are either scalars (one element) or flat vectors. Elementwise
//! operations broadcast a scalar against a vector; two vectors must agree in
//! length. Integer-valued data (e.g. Poisson draws) is stored as `f64` and
//! interpreted through the owning node's [`DType`](crate::DType).

use crate::eval::EvalError;

/// Scalar or 1-D `f64` data.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    data: Vec<f64>,
}

impl Tensor {
    /// Creates a one-element tensor.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self { data: vec![value] }
    }

    /// Creates a tensor from the given elements.
    #[must_use]
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self { data }
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` when the tensor holds no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` for one-element tensors, which broadcast.
    #[must_use]
    pub fn is_scalar(&self) -> bool {
        self.data.len() == 1
    }

    /// Borrow the raw elements.
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Consumes the tensor and returns its elements.
    #[must_use]
    pub fn into_vec(self) -> Vec<f64> {
        self.data
    }

    /// Returns the single element of a scalar tensor.
    #[must_use]
    pub fn item(&self) -> Option<f64> {
        match self.data.as_slice() {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// Element `i` under scalar broadcasting.
    ///
    /// Callers must have checked `i` against [`broadcast_len`].
    #[inline]
    pub(crate) fn at(&self, i: usize) -> f64 {
        if self.data.len() == 1 {
            self.data[0]
        } else {
            self.data[i]
        }
    }

    /// Applies `f` to every element.
    #[must_use]
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            data: self.data.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Applies `f` elementwise over `self` and `other` with broadcasting.
    pub fn zip_map(&self, other: &Self, f: impl Fn(f64, f64) -> f64) -> Result<Self, EvalError> {
        let len = broadcast_len(&[self.len(), other.len()])?;
        Ok(Self {
            data: (0..len).map(|i| f(self.at(i), other.at(i))).collect(),
        })
    }

    /// Sum of all elements (`0.0` for an empty tensor).
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }
}

impl From<f64> for Tensor {
    fn from(value: f64) -> Self {
        Self::scalar(value)
    }
}

impl From<Vec<f64>> for Tensor {
    fn from(data: Vec<f64>) -> Self {
        Self::from_vec(data)
    }
}

impl<const N: usize> From<[f64; N]> for Tensor {
    fn from(data: [f64; N]) -> Self {
        Self::from_vec(data.to_vec())
    }
}

/// Common length of operands under scalar broadcasting.
///
/// Every length must be `1` or equal to the longest non-scalar length.
pub fn broadcast_len(lens: &[usize]) -> Result<usize, EvalError> {
    let mut out = 1;
    for &len in lens {
        if len == 1 || len == out {
            continue;
        }
        if out == 1 {
            out = len;
        } else {
            return Err(EvalError::ShapeMismatch {
                left: out,
                right: len,
            });
        }
    }
    Ok(out)
}
