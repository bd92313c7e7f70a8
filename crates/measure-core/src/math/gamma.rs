// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Log of the regularized upper incomplete gamma function `Q(a, x)`.
//!
//! Three regimes, each with a bounded amount of work:
//! - `a` large and `x` within 40% of `a`: Temme's uniform asymptotic
//!   expansion;
//! - `x < a + 1`: power series for `P(a, x)`, then `Q = 1 - P` in log space;
//! - otherwise: Lentz continued fraction for `Q(a, x)`.
use core::f64::consts::PI;

use super::logspace::log1mexp;

/// Smallest `a` for which the truncated Temme expansion is accurate to
/// roughly 1e-13.
const TEMME_MIN_A: f64 = 1000.0;

/// Largest `|x - a| / a` handed to the Temme expansion.
const TEMME_MAX_SIGMA: f64 = 0.4;

/// Below this `a` the prefactor uses `lgamma` directly; above it the
/// Stirling correction avoids cancelling `a ln x` against `ln Γ(a)`.
const STIRLING_MIN_A: f64 = 15.0;

/// Hard cap on series and continued-fraction terms.
const MAX_TERMS: u32 = 100_000;

const LENTZ_TINY: f64 = 1e-300;

/// Temme coefficient polynomials in `η`, lowest degree first.
const TEMME_C0: [f64; 19] = [
    -0.3333333333333333,
    0.08333333333333333,
    -0.014814814814814815,
    0.0011574074074074073,
    0.0003527336860670194,
    -0.0001787551440329218,
    3.919263178522438e-05,
    -2.185448510679992e-06,
    -1.85406221071516e-06,
    8.296711340953087e-07,
    -1.7665952736826078e-07,
    6.707853543401498e-09,
    1.0261809784240309e-08,
    -4.382036018453353e-09,
    9.14769958223679e-10,
    -2.5514193994946248e-11,
    -5.830772132550426e-11,
    2.4361948020667415e-11,
    -5.0276692801141755e-12,
];

const TEMME_C1: [f64; 17] = [
    -0.001851851851851852,
    -0.003472222222222222,
    0.0026455026455026454,
    -0.0009902263374485596,
    0.00020576131687242798,
    -4.018775720164609e-07,
    -1.8098550334489977e-05,
    7.64916091608111e-06,
    -1.6120900894563446e-06,
    4.647127802807434e-09,
    1.378633446915721e-07,
    -5.752545603517705e-08,
    1.1951628599778148e-08,
    -1.7543241719747647e-11,
    -1.0091543710600413e-09,
    4.162792991842583e-10,
    -8.56390702649298e-11,
];

const TEMME_C2: [f64; 15] = [
    0.004133597883597883,
    -0.0026813271604938273,
    0.0007716049382716049,
    2.0093878600823047e-06,
    -0.0001073665322636516,
    5.2923448829120125e-05,
    -1.2760635188618728e-05,
    3.423578734096138e-08,
    1.3721957309062934e-06,
    -6.298992138380055e-07,
    1.4280614206064242e-07,
    -2.0477098421990866e-10,
    -1.409252991086752e-08,
    6.228974084922022e-09,
    -1.3670488396617114e-09,
];

/// `ln Q(a, x)` for `a > 0`, `x >= 0`.
pub(super) fn ln_gamma_q(a: f64, x: f64) -> f64 {
    if a.is_nan() || x.is_nan() {
        return f64::NAN;
    }
    if x <= 0.0 {
        return 0.0;
    }
    if x == f64::INFINITY {
        return f64::NEG_INFINITY;
    }
    let sigma = (x - a) / a;
    if a >= TEMME_MIN_A && sigma.abs() <= TEMME_MAX_SIGMA {
        return temme(a, x, sigma);
    }
    if x < a + 1.0 {
        log1mexp(ln_gamma_p_series(a, x))
    } else {
        ln_gamma_q_fraction(a, x)
    }
}

/// `ln(x^a e^-x / Γ(a))`.
fn ln_prefactor(a: f64, x: f64) -> f64 {
    if a < STIRLING_MIN_A {
        return a * x.ln() - x - libm::lgamma(a);
    }
    let sigma = (x - a) / a;
    a * log1pmx(sigma) + 0.5 * (a / (2.0 * PI)).ln() - stirling_correction(a)
}

/// `ln Γ(a) - ((a - 1/2) ln a - a + ln √(2π))`.
fn stirling_correction(a: f64) -> f64 {
    let a2 = a * a;
    (1.0 / 12.0
        - (1.0 / 360.0 - (1.0 / 1260.0 - (1.0 / 1680.0 - 1.0 / (1188.0 * a2)) / a2) / a2) / a2)
        / a
}

/// `ln(1 + s) - s`, accurate to full relative precision near zero.
fn log1pmx(s: f64) -> f64 {
    if s.abs() >= 0.5 {
        return libm::log1p(s) - s;
    }
    let mut power = s;
    let mut acc = 0.0;
    let mut n = 2.0;
    for _ in 0..MAX_TERMS {
        power *= -s;
        let term = power / n;
        acc += term;
        if term.abs() <= f64::EPSILON * acc.abs() {
            break;
        }
        n += 1.0;
    }
    acc
}

fn ln_gamma_p_series(a: f64, x: f64) -> f64 {
    let mut term = 1.0;
    let mut acc = 1.0;
    let mut n = 1.0;
    for _ in 0..MAX_TERMS {
        term *= x / (a + n);
        acc += term;
        if term <= acc * f64::EPSILON {
            break;
        }
        n += 1.0;
    }
    ln_prefactor(a, x) + (acc / a).ln()
}

fn ln_gamma_q_fraction(a: f64, x: f64) -> f64 {
    let mut b = x + 1.0 - a;
    let mut c = 1.0 / LENTZ_TINY;
    let mut d = 1.0 / b;
    let mut h = d;
    let mut i = 1.0;
    for _ in 0..MAX_TERMS {
        let an = -i * (i - a);
        b += 2.0;
        d = an * d + b;
        if d.abs() < LENTZ_TINY {
            d = LENTZ_TINY;
        }
        c = b + an / c;
        if c.abs() < LENTZ_TINY {
            c = LENTZ_TINY;
        }
        d = 1.0 / d;
        let step = d * c;
        h *= step;
        if (step - 1.0).abs() <= f64::EPSILON {
            break;
        }
        i += 1.0;
    }
    ln_prefactor(a, x) + h.ln()
}

/// Both tails share one form: the smaller tail `T` (`Q` above `a`, `P`
/// below) is `e^-y (erfcx(√y)/2 ± S(η)/√(2πa))`.
fn temme(a: f64, x: f64, sigma: f64) -> f64 {
    let phi = -log1pmx(sigma);
    let y = a * phi;
    let eta = if x < a { -(2.0 * phi).sqrt() } else { (2.0 * phi).sqrt() };
    let series =
        horner(&TEMME_C0, eta) + horner(&TEMME_C1, eta) / a + horner(&TEMME_C2, eta) / (a * a);
    let correction = series / (2.0 * PI * a).sqrt();
    let half_erfcx = 0.5 * erfcx(y.sqrt());
    if x < a {
        log1mexp(-y + (half_erfcx - correction).ln())
    } else {
        -y + (half_erfcx + correction).ln()
    }
}

fn horner(coeffs: &[f64], z: f64) -> f64 {
    coeffs.iter().rev().fold(0.0, |acc, c| acc * z + c)
}

/// Scaled complementary error function `e^(t²) erfc(t)` for `t >= 0`.
fn erfcx(t: f64) -> f64 {
    if t < 26.0 {
        return (t * t).exp() * libm::erfc(t);
    }
    let inv = 1.0 / (2.0 * t * t);
    let mut term = 1.0;
    let mut acc = 1.0;
    for n in 1..=8u8 {
        term *= -(2.0 * f64::from(n) - 1.0) * inv;
        acc += term;
    }
    acc / (t * PI.sqrt())
}
