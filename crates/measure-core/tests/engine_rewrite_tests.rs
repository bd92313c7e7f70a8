// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Epoch scheduling, receipts and snapshots of the rewrite engine.

mod common;

use common::Model;
use measure_core::censoring::{self, clip_rule, CLIP_RULE_NAME, ROUND_RULE_NAME};
use measure_core::{
    digest_len0_u64, make_rule_id, ApplyResult, Engine, EngineError, EpochReceiptDisposition,
    EpochRejection, Footprint, GraphView, NodeId, Op, OpKind, RewriteDelta, RewriteRule,
};

fn categories(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_owned()).collect()
}

fn censoring_engine(m: Model) -> Engine {
    let mut engine = Engine::new(m.g, m.values);
    censoring::register_rewrites(&mut engine).expect("register censoring rules");
    engine
}

fn churn_matcher(view: GraphView<'_>, scope: &NodeId) -> bool {
    view.node(scope)
        .is_some_and(|record| matches!(record.op, Op::Constant(_)))
}

fn churn_executor(view: GraphView<'_>, scope: &NodeId, delta: &mut RewriteDelta) {
    if let Some(record) = view.node(scope) {
        let copy = delta.insert_node(record.clone());
        delta.replace(*scope, copy);
    }
}

fn churn_footprint(_view: GraphView<'_>, scope: &NodeId) -> Footprint {
    let mut fp = Footprint::default();
    fp.n_read.insert(*scope);
    fp.n_write.insert(*scope);
    fp
}

/// Replaces every constant with a fresh copy, forever.
fn churn_rule() -> RewriteRule {
    RewriteRule {
        id: make_rule_id("test/churn"),
        name: "test/churn",
        tracks: &[OpKind::Constant],
        matcher: churn_matcher,
        executor: churn_executor,
        compute_footprint: churn_footprint,
        priority: 0,
        tags: &["test"],
    }
}

#[test]
fn registering_twice_is_rejected() {
    let mut engine = censoring_engine(Model::new());
    let err = censoring::register_rewrites(&mut engine).expect_err("duplicate");
    assert!(
        matches!(err, EngineError::DuplicateRuleName(name) if name == CLIP_RULE_NAME),
        "unexpected error: {err:?}"
    );

    let renamed = RewriteRule {
        name: "censoring/clip-again",
        ..clip_rule()
    };
    let err = engine.register_rule(renamed).expect_err("duplicate id");
    assert!(
        matches!(err, EngineError::DuplicateRuleId(_)),
        "unexpected error: {err:?}"
    );
}

#[test]
fn manual_epoch_applies_the_clip_rewrite() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant(-1.0);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, lower, upper);
    m.observe(cens, "cens");
    let mut engine = censoring_engine(m);

    let tx = engine.begin();
    assert_eq!(
        engine.apply(tx, CLIP_RULE_NAME, &x).expect("apply"),
        ApplyResult::NoMatch
    );
    assert_eq!(
        engine.apply(tx, ROUND_RULE_NAME, &cens).expect("apply"),
        ApplyResult::NoMatch
    );
    assert_eq!(
        engine.apply(tx, CLIP_RULE_NAME, &cens).expect("apply"),
        ApplyResult::Applied
    );
    let (snapshot, receipt) = engine.commit_with_receipt(tx).expect("commit");
    assert_eq!(receipt.applied(), 1);
    assert_eq!(snapshot.node_count, engine.store().len());

    let resolved = engine.store().resolve(cens);
    assert_ne!(resolved, cens);
    assert!(matches!(
        engine.node(&resolved).map(|record| &record.op),
        Some(Op::MeasurableClip { .. })
    ));
    assert!(engine.store().is_measurable(&resolved));
    assert!(!engine.store().is_measurable(&x));

    // The replaced clip is no longer offered to rules.
    let tx = engine.begin();
    assert_eq!(
        engine.apply(tx, CLIP_RULE_NAME, &cens).expect("apply"),
        ApplyResult::NoMatch
    );
}

#[test]
fn apply_and_commit_validate_their_arguments() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let mut engine = censoring_engine(m);

    let tx = engine.begin();
    assert!(matches!(
        engine.apply(tx, "missing/rule", &x),
        Err(EngineError::UnknownRule(name)) if name == "missing/rule"
    ));
    assert!(matches!(
        engine.apply(tx, CLIP_RULE_NAME, &NodeId(999)),
        Err(EngineError::UnknownNode(NodeId(999)))
    ));
    engine.commit(tx).expect("commit");
    assert!(matches!(engine.commit(tx), Err(EngineError::UnknownTx)));
    assert!(matches!(
        engine.apply(tx, CLIP_RULE_NAME, &x),
        Err(EngineError::UnknownTx)
    ));
}

#[test]
fn shared_base_conflict_is_recorded_in_the_receipt() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant(-1.0);
    let upper = m.g.constant(1.0);
    let cens1 = m.g.clip(x, lower, upper);
    let cens2 = m.g.clip(x, lower, upper);
    m.observe(cens1, "cens1");
    m.observe(cens2, "cens2");
    let mut engine = censoring_engine(m);

    let report = engine
        .rewrite_to_fixed_point(&categories(&["basic"]), 8)
        .expect("fixed point");
    assert_eq!(report.applied, 1);
    assert_eq!(report.epochs.len(), 2);

    let first = &report.epochs[0];
    let entries = first.entries();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].scope, cens1);
    assert_eq!(entries[0].disposition, EpochReceiptDisposition::Applied);
    assert_eq!(entries[1].scope, cens2);
    assert_eq!(
        entries[1].disposition,
        EpochReceiptDisposition::Rejected(EpochRejection::FootprintConflict)
    );
    assert_eq!(first.blocked_by(1), &[0]);
    assert!(first.blocked_by(0).is_empty());
    assert_eq!(first.rejected(), 1);

    let last = &report.epochs[1];
    assert!(last.entries().is_empty());
    assert_eq!(last.digest(), digest_len0_u64());
    assert_eq!(engine.store().resolve(cens2), cens2);
}

#[test]
fn independent_rewrites_share_an_epoch() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let y = m.normal(1.0, 2.0);
    let lower = m.g.constant(-1.0);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, lower, upper);
    let r = m.g.floor(y);
    m.observe(cens, "cens");
    m.observe(r, "r");
    let mut engine = censoring_engine(m);

    let report = engine
        .rewrite_to_fixed_point(&categories(&["censoring"]), 8)
        .expect("fixed point");
    assert_eq!(report.epochs.len(), 2);
    assert_eq!(report.epochs[0].applied(), 2);
    assert_eq!(report.epochs[1].applied(), 0);
}

#[test]
fn rewrites_chain_across_epochs() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let r = m.g.floor(x);
    let lower = m.g.constant(0.0);
    let upper = m.g.constant(5.0);
    let cens = m.g.clip(r, lower, upper);
    m.observe(cens, "cens");
    let mut engine = censoring_engine(m);

    let report = engine
        .rewrite_to_fixed_point(&categories(&["basic", "censoring"]), 8)
        .expect("fixed point");
    let per_epoch: Vec<usize> = report.epochs.iter().map(|e| e.applied()).collect();
    assert_eq!(per_epoch, vec![1, 1, 0]);
    assert_eq!(report.epochs[0].entries()[0].rule_name, ROUND_RULE_NAME);
    assert_eq!(report.epochs[1].entries()[0].rule_name, CLIP_RULE_NAME);
}

#[test]
fn snapshots_are_deterministic_and_chained() {
    fn build(upper: f64) -> Engine {
        let mut m = Model::new();
        let x = m.normal(0.0, 1.0);
        let lower = m.g.constant(-1.0);
        let upper = m.g.constant(upper);
        let cens = m.g.clip(x, lower, upper);
        m.observe(cens, "cens");
        censoring_engine(m)
    }

    let all = categories(&["basic", "censoring"]);
    let a = build(1.0).rewrite_to_fixed_point(&all, 8).expect("a");
    let b = build(1.0).rewrite_to_fixed_point(&all, 8).expect("b");
    let c = build(2.0).rewrite_to_fixed_point(&all, 8).expect("c");
    assert_eq!(a.snapshot.hash, b.snapshot.hash);
    assert_ne!(a.snapshot.hash, c.snapshot.hash);
    assert_eq!(a.epochs[0].digest(), b.epochs[0].digest());

    let mut engine = build(1.0);
    assert!(engine.snapshot().parent.is_none());
    let tx1 = engine.begin();
    let s1 = engine.commit(tx1).expect("empty commit");
    let tx2 = engine.begin();
    let s2 = engine.commit(tx2).expect("empty commit");
    assert_eq!(s1.parent, None);
    assert_eq!(s2.parent, Some(s1.hash));
    assert_eq!(s1.hash, s2.hash);
}

#[test]
fn disabled_categories_never_run() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant(-1.0);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, lower, upper);
    m.observe(cens, "cens");
    let mut engine = censoring_engine(m);
    engine.register_rule(churn_rule()).expect("register churn");

    let report = engine
        .rewrite_to_fixed_point(&categories(&["basic"]), 8)
        .expect("churn is disabled");
    assert_eq!(report.applied, 1);

    let err = engine
        .rewrite_to_fixed_point(&categories(&["test"]), 3)
        .expect_err("churn never settles");
    assert!(
        matches!(err, EngineError::NoFixedPoint(3)),
        "unexpected error: {err:?}"
    );
}
