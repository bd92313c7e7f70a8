// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Core rewrite engine implementation.
use std::collections::{BTreeSet, HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, info, instrument, trace};

use crate::delta::RewriteDelta;
use crate::graph::GraphStore;
use crate::graph_view::GraphView;
use crate::ident::{Hash, NodeId};
use crate::receipt::{EpochReceipt, EpochReceiptDisposition, EpochReceiptEntry, EpochRejection};
use crate::record::NodeRecord;
use crate::rule::RewriteRule;
use crate::scheduler::{DeterministicScheduler, PendingRewrite};
use crate::snapshot::{compute_snapshot_hash, Snapshot};
use crate::tx::TxId;
use crate::values::ObservedValues;

/// Result of calling [`Engine::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyResult {
    /// The rewrite matched and was enqueued for the current epoch.
    Applied,
    /// The rewrite did not match the provided scope.
    NoMatch,
}

/// Errors emitted by the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The supplied transaction identifier did not exist or was already closed.
    #[error("transaction not active")]
    UnknownTx,
    /// A rule was requested that has not been registered with the engine.
    #[error("rule not registered: {0}")]
    UnknownRule(String),
    /// Attempted to register a rule with a duplicate name.
    #[error("duplicate rule name: {0}")]
    DuplicateRuleName(&'static str),
    /// Attempted to register a rule with a duplicate id.
    #[error("duplicate rule id: {0:?}")]
    DuplicateRuleId(Hash),
    /// A scope referenced a node that is not in the store.
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),
    /// Rewriting still produced matches after the configured number of epochs.
    #[error("rewrites did not reach a fixed point within {0} epochs")]
    NoFixedPoint(usize),
    /// Internal invariant violated.
    #[error("internal corruption: {0}")]
    InternalCorruption(&'static str),
}

/// Outcome of [`Engine::rewrite_to_fixed_point`].
#[derive(Debug, Clone)]
pub struct RewriteReport {
    /// One receipt per committed epoch, the final empty epoch included.
    pub epochs: Vec<EpochReceipt>,
    /// Total number of applied rewrites.
    pub applied: usize,
    /// Snapshot of the rewritten graph.
    pub snapshot: Snapshot,
}

/// Deterministic rewrite engine over a model graph.
///
/// It owns the [`GraphStore`], the observed-value mapping, the registered
/// rules and the scheduler. An epoch (one transaction) matches rules against a
/// single graph version; admitted rewrites are applied together at commit.
/// Snapshot identity is provided by
/// [`compute_snapshot_hash`](crate::snapshot::compute_snapshot_hash).
pub struct Engine {
    store: GraphStore,
    values: ObservedValues,
    observed: BTreeSet<NodeId>,
    rules: HashMap<&'static str, RewriteRule>,
    rules_by_id: HashMap<Hash, &'static str>,
    scheduler: DeterministicScheduler,
    tx_counter: u64,
    live_txs: HashSet<u64>,
    last_snapshot: Option<Snapshot>,
}

impl Engine {
    /// Constructs a new engine over `store` with the given observed values.
    pub fn new(store: GraphStore, values: ObservedValues) -> Self {
        let observed = values.resolved_keys(&store);
        Self {
            store,
            values,
            observed,
            rules: HashMap::new(),
            rules_by_id: HashMap::new(),
            scheduler: DeterministicScheduler::default(),
            tx_counter: 0,
            live_txs: HashSet::new(),
            last_snapshot: None,
        }
    }

    /// Registers a rewrite rule so it can be referenced by name.
    ///
    /// # Errors
    /// Returns [`EngineError::DuplicateRuleName`] or
    /// [`EngineError::DuplicateRuleId`] when either key is already taken.
    pub fn register_rule(&mut self, rule: RewriteRule) -> Result<(), EngineError> {
        if self.rules.contains_key(rule.name) {
            return Err(EngineError::DuplicateRuleName(rule.name));
        }
        if self.rules_by_id.contains_key(&rule.id) {
            return Err(EngineError::DuplicateRuleId(rule.id));
        }
        self.rules_by_id.insert(rule.id, rule.name);
        debug!(rule = rule.name, priority = rule.priority, "registered rewrite rule");
        self.rules.insert(rule.name, rule);
        Ok(())
    }

    /// Begins a new transaction and returns its identifier.
    #[must_use]
    pub fn begin(&mut self) -> TxId {
        self.tx_counter = self.tx_counter.wrapping_add(1);
        if self.tx_counter == 0 {
            self.tx_counter = 1;
        }
        self.live_txs.insert(self.tx_counter);
        TxId::from_raw(self.tx_counter)
    }

    /// Queues a rewrite for the transaction if it matches the provided scope.
    ///
    /// Replaced nodes and nodes whose op kind the rule does not track never
    /// match.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownTx`] if the transaction is invalid,
    /// [`EngineError::UnknownRule`] if the named rule is not registered, or
    /// [`EngineError::UnknownNode`] if `scope` is not in the store.
    pub fn apply(
        &mut self,
        tx: TxId,
        rule_name: &str,
        scope: &NodeId,
    ) -> Result<ApplyResult, EngineError> {
        if tx.value() == 0 || !self.live_txs.contains(&tx.value()) {
            return Err(EngineError::UnknownTx);
        }
        let Some(rule) = self.rules.get(rule_name) else {
            return Err(EngineError::UnknownRule(rule_name.to_owned()));
        };
        let Some(record) = self.store.node(scope) else {
            return Err(EngineError::UnknownNode(*scope));
        };
        if !self.store.is_live(scope) || !rule.tracks_kind(record.op.kind()) {
            return Ok(ApplyResult::NoMatch);
        }
        let view = GraphView::new(&self.store, &self.observed);
        if !(rule.matcher)(view, scope) {
            trace!(rule = rule.name, scope = %scope, "no match");
            return Ok(ApplyResult::NoMatch);
        }
        let footprint = (rule.compute_footprint)(view, scope);
        self.scheduler.enqueue(
            tx,
            PendingRewrite {
                rule_id: rule.id,
                rule_name: rule.name,
                priority: rule.priority,
                scope: *scope,
                footprint,
            },
        );
        trace!(rule = rule.name, scope = %scope, "candidate enqueued");
        Ok(ApplyResult::Applied)
    }

    /// Executes the admissible pending rewrites of `tx` and produces a snapshot.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownTx`] if `tx` does not refer to a live transaction.
    pub fn commit(&mut self, tx: TxId) -> Result<Snapshot, EngineError> {
        let (snapshot, _receipt) = self.commit_with_receipt(tx)?;
        Ok(snapshot)
    }

    /// Executes the admissible pending rewrites of `tx` and returns the
    /// snapshot together with the epoch receipt.
    ///
    /// Candidates drain in canonical order. Each is admitted when its
    /// footprint is independent of the candidates admitted before it; every
    /// admitted executor reads the graph as it was when the epoch began. The
    /// recorded deltas are applied together afterwards.
    ///
    /// # Errors
    /// Returns [`EngineError::UnknownTx`] if `tx` does not refer to a live
    /// transaction, or [`EngineError::InternalCorruption`] if a pending
    /// rewrite references an unregistered rule.
    pub fn commit_with_receipt(&mut self, tx: TxId) -> Result<(Snapshot, EpochReceipt), EngineError> {
        if tx.value() == 0 || !self.live_txs.contains(&tx.value()) {
            return Err(EngineError::UnknownTx);
        }
        let pending = self.scheduler.drain_for_tx(tx);
        let mut entries = Vec::with_capacity(pending.len());
        let mut blocked_by = Vec::with_capacity(pending.len());
        let mut ops = Vec::new();
        let mut next_id = self.store.next_id();

        let view = GraphView::new(&self.store, &self.observed);
        for (idx, rewrite) in pending.iter().enumerate() {
            let Some(name) = self.rules_by_id.get(&rewrite.rule_id) else {
                return Err(EngineError::InternalCorruption(
                    "pending rewrite references an unregistered rule id",
                ));
            };
            let Some(rule) = self.rules.get(name) else {
                return Err(EngineError::InternalCorruption(
                    "rule id table out of sync with rule table",
                ));
            };
            let idx = u32::try_from(idx)
                .map_err(|_| EngineError::InternalCorruption("too many candidates in one epoch"))?;
            let disposition = match self.scheduler.reserve(tx, idx, &rewrite.footprint) {
                Ok(()) => {
                    let mut delta = RewriteDelta::new(next_id);
                    (rule.executor)(view, &rewrite.scope, &mut delta);
                    let (mut rule_ops, advanced) = delta.finish();
                    next_id = advanced;
                    ops.append(&mut rule_ops);
                    blocked_by.push(Vec::new());
                    debug!(rule = rule.name, scope = %rewrite.scope, "rewrite applied");
                    EpochReceiptDisposition::Applied
                }
                Err(blockers) => {
                    debug!(
                        rule = rule.name,
                        scope = %rewrite.scope,
                        ?blockers,
                        "rewrite rejected: footprint conflict"
                    );
                    blocked_by.push(blockers);
                    EpochReceiptDisposition::Rejected(EpochRejection::FootprintConflict)
                }
            };
            entries.push(EpochReceiptEntry {
                rule_id: rewrite.rule_id,
                rule_name: rewrite.rule_name,
                scope: rewrite.scope,
                disposition,
            });
        }
        self.scheduler.finalize_tx(tx);

        for op in ops {
            self.store.apply_op(op);
        }
        self.observed = self.values.resolved_keys(&self.store);

        let receipt = EpochReceipt::new(tx, entries, blocked_by);
        let snapshot = Snapshot {
            hash: compute_snapshot_hash(&self.store),
            parent: self.last_snapshot.as_ref().map(|s| s.hash),
            tx,
            node_count: self.store.len(),
        };
        self.last_snapshot = Some(snapshot.clone());
        self.live_txs.remove(&tx.value());
        Ok((snapshot, receipt))
    }

    /// Runs epochs until no enabled rule matches any live node.
    ///
    /// Rules whose tags intersect `categories` are tried at every live node in
    /// ascending id order, in (`priority`, `id`) order per node.
    ///
    /// # Errors
    /// Returns [`EngineError::NoFixedPoint`] when matches remain after
    /// `max_epochs` epochs; other engine errors are propagated.
    #[instrument(skip(self, categories), fields(categories = ?categories))]
    pub fn rewrite_to_fixed_point(
        &mut self,
        categories: &[String],
        max_epochs: usize,
    ) -> Result<RewriteReport, EngineError> {
        let mut enabled: Vec<(i32, Hash, &'static str)> = self
            .rules
            .values()
            .filter(|rule| rule.enabled_for(categories))
            .map(|rule| (rule.priority, rule.id, rule.name))
            .collect();
        enabled.sort_unstable();

        let mut epochs = Vec::new();
        let mut applied = 0;
        for _ in 0..max_epochs {
            let tx = self.begin();
            let scopes: Vec<NodeId> = self
                .store
                .node_ids()
                .filter(|id| self.store.is_live(id))
                .collect();
            for scope in &scopes {
                for (_, _, name) in &enabled {
                    self.apply(tx, name, scope)?;
                }
            }
            let (snapshot, receipt) = self.commit_with_receipt(tx)?;
            let epoch_applied = receipt.applied();
            debug!(
                tx = %tx,
                applied = epoch_applied,
                rejected = receipt.rejected(),
                "epoch committed"
            );
            applied += epoch_applied;
            epochs.push(receipt);
            if epoch_applied == 0 {
                info!(epochs = epochs.len(), applied, "rewrites reached a fixed point");
                return Ok(RewriteReport {
                    epochs,
                    applied,
                    snapshot,
                });
            }
        }
        Err(EngineError::NoFixedPoint(max_epochs))
    }

    /// Returns a snapshot for the current graph state without executing rewrites.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            hash: compute_snapshot_hash(&self.store),
            parent: self.last_snapshot.as_ref().map(|s| s.hash),
            tx: TxId::from_raw(self.tx_counter),
            node_count: self.store.len(),
        }
    }

    /// Returns a shared view of a node when it exists.
    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&NodeRecord> {
        self.store.node(id)
    }

    /// Borrow the underlying store.
    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Borrow the observed-value mapping.
    #[must_use]
    pub fn values(&self) -> &ObservedValues {
        &self.values
    }

    /// Consumes the engine and returns the rewritten store.
    #[must_use]
    pub fn into_store(self) -> GraphStore {
        self.store
    }
}
