// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Scalar numerics for log-density evaluation.
//!
//! Everything here works on plain `f64` and is total: out-of-support inputs
//! yield `-inf` log-densities, `NaN` propagates. Transcendentals come from
//! `libm` so results do not depend on the platform's system math library.

mod gamma;
mod logspace;
mod special;

pub use logspace::{log1mexp, logaddexp, logdiffexp, round_half_to_even};
pub use special::{
    normal_logcdf, normal_logpdf, poisson_logcdf, poisson_logpmf, uniform_logcdf,
    uniform_logpdf,
};
