// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical digests and constants used across the engine.
use crate::ident::Hash;

/// Rewrite category for rules every derivation wants.
pub const CATEGORY_BASIC: &str = "basic";

/// Rewrite category for the clip and round-family rules.
pub const CATEGORY_CENSORING: &str = "censoring";

/// Default bound on rewrite epochs before giving up on a fixed point.
pub const DEFAULT_MAX_EPOCHS: usize = 64;

/// Message of the guard placed on two-sided clips.
pub const BOUND_ORDER_CHECK: &str = "lower_bound <= upper_bound";

/// Canonical digest representing an empty length-prefixed list: BLAKE3 of
/// `0u64.to_le_bytes()`.
#[must_use]
pub fn digest_len0_u64() -> Hash {
    let mut h = blake3::Hasher::new();
    h.update(&0u64.to_le_bytes());
    h.finalize().into()
}
