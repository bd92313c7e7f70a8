// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Log-densities and log-CDFs of the base distributions.
use core::f64::consts::FRAC_1_SQRT_2;

use super::gamma::ln_gamma_q;

/// `ln(sqrt(2π))`.
const LN_SQRT_2PI: f64 = 0.918_938_533_204_672_8;

/// Below this standardised value `erfc` loses all precision; use the
/// asymptotic series instead.
const NORMAL_TAIL_Z: f64 = -35.0;

/// Above this standardised value `1 - Φ(z)` is small enough that `log1p` of
/// the upper tail is more accurate than `ln Φ(z)` directly.
const NORMAL_UPPER_Z: f64 = 5.0;

/// `Normal(mu, sigma)` log-density at `x`.
#[must_use]
pub fn normal_logpdf(x: f64, mu: f64, sigma: f64) -> f64 {
    let z = (x - mu) / sigma;
    -0.5 * z * z - LN_SQRT_2PI - sigma.ln()
}

/// `Normal(mu, sigma)` log-CDF at `x`, accurate far into both tails.
#[must_use]
pub fn normal_logcdf(x: f64, mu: f64, sigma: f64) -> f64 {
    std_normal_logcdf((x - mu) / sigma)
}

fn std_normal_logcdf(z: f64) -> f64 {
    if z.is_nan() {
        return f64::NAN;
    }
    if z > NORMAL_UPPER_Z {
        return libm::log1p(-0.5 * libm::erfc(z * FRAC_1_SQRT_2));
    }
    if z > NORMAL_TAIL_Z {
        return (0.5 * libm::erfc(-z * FRAC_1_SQRT_2)).ln();
    }
    // Mills-ratio expansion: Φ(z) ≈ φ(z)/(-z) · (1 - 1/z² + 3/z⁴ - 15/z⁶).
    let z2 = z * z;
    let series = 1.0 - 1.0 / z2 + 3.0 / (z2 * z2) - 15.0 / (z2 * z2 * z2);
    -0.5 * z2 - LN_SQRT_2PI - (-z).ln() + series.ln()
}

/// `Poisson(mu)` log-mass at `k`; `-inf` off the non-negative integers.
#[must_use]
pub fn poisson_logpmf(k: f64, mu: f64) -> f64 {
    if k.is_nan() || mu.is_nan() {
        return f64::NAN;
    }
    if k < 0.0 || !k.is_finite() || k.fract() != 0.0 {
        return f64::NEG_INFINITY;
    }
    if mu == 0.0 {
        return if k == 0.0 { 0.0 } else { f64::NEG_INFINITY };
    }
    k * mu.ln() - mu - libm::lgamma(k + 1.0)
}

/// `Poisson(mu)` log-CDF at `k` (floored to the integer grid).
///
/// `P(X <= k) = Q(k + 1, mu)`, the regularized upper incomplete gamma, so
/// the cost does not grow with `mu`.
#[must_use]
pub fn poisson_logcdf(k: f64, mu: f64) -> f64 {
    if k.is_nan() || mu.is_nan() || mu < 0.0 {
        return f64::NAN;
    }
    let k = k.floor();
    if k < 0.0 {
        return f64::NEG_INFINITY;
    }
    if k == f64::INFINITY {
        return 0.0;
    }
    ln_gamma_q(k + 1.0, mu).min(0.0)
}

/// `Uniform(lower, upper)` log-density at `x`.
#[must_use]
pub fn uniform_logpdf(x: f64, lower: f64, upper: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < lower || x > upper {
        return f64::NEG_INFINITY;
    }
    -(upper - lower).ln()
}

/// `Uniform(lower, upper)` log-CDF at `x`.
#[must_use]
pub fn uniform_logcdf(x: f64, lower: f64, upper: f64) -> f64 {
    if x.is_nan() {
        return f64::NAN;
    }
    if x < lower {
        return f64::NEG_INFINITY;
    }
    if x >= upper {
        return 0.0;
    }
    ((x - lower) / (upper - lower)).ln()
}
