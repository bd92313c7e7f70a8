// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Censoring and rounding rewrites.
//!
//! Two rewrite rules turn deterministic transformations of random variables
//! into measurable variables with their own log-densities:
//!
//! * `censoring/clip`: `clip(x, lower, upper)` over a measurable, unvalued
//!   `x` becomes a [`MeasurableClip`](crate::Op::MeasurableClip). Point masses
//!   sit on the bounds; a bound that *is* `x` makes that side unbounded.
//! * `censoring/round`: `round`/`floor`/`ceil` over a measurable, unvalued,
//!   continuous `x` becomes a [`MeasurableRound`](crate::Op::MeasurableRound),
//!   whose mass at a grid point is the base probability of the interval that
//!   rounds onto it.
//!
//! Both rules strip the measurable capability from the base, so a base is
//! claimed by at most one rewrite and is never also derived on its own.
//! Both are registered under the `basic` and `censoring` categories with
//! priority `0`.
mod clip;
mod factory;
mod round;

pub use clip::{bound_order_guard, clip_logprob, clip_rule, CLIP_RULE_NAME};
pub use round::{round_logprob, round_rule, ROUND_RULE_NAME};

use crate::engine_impl::{Engine, EngineError};
use crate::measurable::{CapabilityRegistry, MeasurableRules};
use crate::op::OpKind;

include!(concat!(env!("OUT_DIR"), "/rule_ids.rs"));

/// Registers the clip and round-family rewrite rules with `engine`.
///
/// # Errors
/// Propagates [`EngineError::DuplicateRuleName`] /
/// [`EngineError::DuplicateRuleId`] if either rule is already registered.
pub fn register_rewrites(engine: &mut Engine) -> Result<(), EngineError> {
    engine.register_rule(clip_rule())?;
    engine.register_rule(round_rule())
}

/// Registers log-density rules for the measurable clip and round kinds.
pub fn register_logprob(registry: &mut CapabilityRegistry) {
    registry.register(
        OpKind::MeasurableClip,
        MeasurableRules {
            logprob: clip_logprob,
            logcdf: None,
        },
    );
    registry.register(
        OpKind::MeasurableRound,
        MeasurableRules {
            logprob: round_logprob,
            logcdf: None,
        },
    );
}
