// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Log-space arithmetic.
use core::f64::consts::LN_2;

/// `ln(1 - exp(x))` for `x <= 0`.
///
/// Switches between `expm1` and `log1p` at `-ln 2` to stay accurate near both
/// ends. `log1mexp(0) = -inf`, `log1mexp(-inf) = 0`; positive `x` gives `NaN`.
#[must_use]
pub fn log1mexp(x: f64) -> f64 {
    if x > 0.0 {
        return f64::NAN;
    }
    if x > -LN_2 {
        (-libm::expm1(x)).ln()
    } else {
        libm::log1p(-x.exp())
    }
}

/// `ln(exp(a) + exp(b))`.
#[must_use]
pub fn logaddexp(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let hi = a.max(b);
    if hi == f64::INFINITY {
        return hi;
    }
    hi + libm::log1p((-(a - b).abs()).exp())
}

/// `ln(exp(a) - exp(b))` for `a >= b`.
///
/// Equal arguments give `-inf`; `a < b` gives `NaN`.
#[must_use]
pub fn logdiffexp(a: f64, b: f64) -> f64 {
    if b == f64::NEG_INFINITY {
        return a;
    }
    a + log1mexp(b - a)
}

/// Rounds to the nearest integer, ties to even.
#[must_use]
pub fn round_half_to_even(x: f64) -> f64 {
    x.round_ties_even()
}
