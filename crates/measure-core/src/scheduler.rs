// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Deterministic epoch scheduler.
//!
//! Ordering invariant:
//! - Candidates drain in ascending (`scope`, `priority`, `rule_id`) order.
//! - Enqueue is last-wins on (`scope`, `rule_id`); re-applying the same rule at
//!   the same scope within one transaction does not create a duplicate.
//! - Reservation admits a candidate only when its footprint is independent of
//!   every candidate already admitted in the transaction; otherwise the
//!   indices of the blocking candidates are returned.
use std::collections::{BTreeMap, HashMap};

use crate::footprint::Footprint;
use crate::ident::{Hash, NodeId};
use crate::tx::TxId;

/// Internal representation of a rewrite waiting to be applied.
#[derive(Debug, Clone)]
pub(crate) struct PendingRewrite {
    /// Identifier of the rule to execute.
    pub rule_id: Hash,
    /// Registered name of the rule.
    pub rule_name: &'static str,
    /// Rule priority copied at enqueue time.
    pub priority: i32,
    /// Scope node supplied when `apply` was invoked.
    pub scope: NodeId,
    /// Footprint used for independence checks.
    pub footprint: Footprint,
}

type PendingKey = (NodeId, i32, Hash);

/// Footprints admitted so far in a transaction, with their candidate index.
#[derive(Debug, Default)]
pub(crate) struct ActiveFootprints {
    admitted: Vec<(u32, Footprint)>,
}

#[derive(Debug, Default)]
pub(crate) struct DeterministicScheduler {
    pending: HashMap<TxId, BTreeMap<PendingKey, PendingRewrite>>,
    active: HashMap<TxId, ActiveFootprints>,
}

impl DeterministicScheduler {
    /// Enqueues a rewrite with last-wins semantics on (`scope`, `rule_id`).
    pub(crate) fn enqueue(&mut self, tx: TxId, rewrite: PendingRewrite) {
        let key = (rewrite.scope, rewrite.priority, rewrite.rule_id);
        self.pending.entry(tx).or_default().insert(key, rewrite);
    }

    /// Removes and returns all pending rewrites for `tx` in canonical order.
    pub(crate) fn drain_for_tx(&mut self, tx: TxId) -> Vec<PendingRewrite> {
        self.pending
            .remove(&tx)
            .map_or_else(Vec::new, |queue| queue.into_values().collect())
    }

    /// Number of candidates queued for `tx`.
    #[cfg(test)]
    pub(crate) fn pending_len(&self, tx: TxId) -> usize {
        self.pending.get(&tx).map_or(0, BTreeMap::len)
    }

    /// Attempts to admit candidate `idx`.
    ///
    /// On conflict returns the ascending indices of admitted candidates whose
    /// footprints overlap.
    pub(crate) fn reserve(
        &mut self,
        tx: TxId,
        idx: u32,
        footprint: &Footprint,
    ) -> Result<(), Vec<u32>> {
        let active = self.active.entry(tx).or_default();
        let blockers: Vec<u32> = active
            .admitted
            .iter()
            .filter(|(_, admitted)| !admitted.independent(footprint))
            .map(|(i, _)| *i)
            .collect();
        if blockers.is_empty() {
            active.admitted.push((idx, footprint.clone()));
            Ok(())
        } else {
            Err(blockers)
        }
    }

    /// Drops reservation state for a finished transaction.
    pub(crate) fn finalize_tx(&mut self, tx: TxId) {
        self.active.remove(&tx);
        self.pending.remove(&tx);
    }
}
