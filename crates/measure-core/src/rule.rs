// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Rewrite rule definitions.
use crate::delta::RewriteDelta;
use crate::footprint::Footprint;
use crate::graph_view::GraphView;
use crate::ident::{Hash, NodeId};
use crate::op::OpKind;

/// Function pointer used to determine whether a rule matches the provided scope.
pub type MatchFn = for<'a> fn(GraphView<'a>, &NodeId) -> bool;

/// Function pointer that records a rewrite of the given scope into a delta.
pub type ExecuteFn = for<'a> fn(GraphView<'a>, &NodeId, &mut RewriteDelta);

/// Function pointer that computes a rewrite footprint at the provided scope.
pub type FootprintFn = for<'a> fn(GraphView<'a>, &NodeId) -> Footprint;

/// Descriptor for a rewrite rule registered with the engine.
///
/// Each rule owns:
/// * a deterministic identifier (`id`)
/// * a human-readable name
/// * the op kinds it tracks (an O(1) prefilter before the matcher runs)
/// * callbacks for matching, execution and footprinting
/// * a priority and the category tags it is registered under
pub struct RewriteRule {
    /// Deterministic identifier for the rewrite rule.
    pub id: Hash,
    /// Human-readable name for logs and debugging.
    pub name: &'static str,
    /// Op kinds whose nodes are offered to the matcher.
    pub tracks: &'static [OpKind],
    /// Callback used to determine if the rule matches the provided scope.
    pub matcher: MatchFn,
    /// Callback that records the rewrite into a delta.
    pub executor: ExecuteFn,
    /// Callback that computes a footprint for independence checks.
    pub compute_footprint: FootprintFn,
    /// Lower runs first when several rules match one scope.
    pub priority: i32,
    /// Rewrite categories; the rule runs when any tag is enabled.
    pub tags: &'static [&'static str],
}

impl RewriteRule {
    /// Returns `true` when the rule is registered under any of `categories`.
    #[must_use]
    pub fn enabled_for(&self, categories: &[String]) -> bool {
        self.tags
            .iter()
            .any(|tag| categories.iter().any(|category| category == tag))
    }

    /// Returns `true` when nodes of `kind` are offered to this rule.
    #[must_use]
    pub fn tracks_kind(&self, kind: OpKind) -> bool {
        self.tracks.contains(&kind)
    }
}

impl core::fmt::Debug for RewriteRule {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RewriteRule")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("tracks", &self.tracks)
            .field("priority", &self.priority)
            .field("tags", &self.tags)
            .finish_non_exhaustive()
    }
}
