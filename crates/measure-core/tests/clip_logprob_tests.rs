// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Log-densities of clipped random variables.

mod common;

use common::{assert_all_close, assert_close, bind, eval, eval_scalar, Model};
use measure_core::{
    factorized_joint_logprob, joint_logprob, Bound, EvalError, Expr, LogprobConfig, Op, Tensor,
    BOUND_ORDER_CHECK,
};

const NEG_INF: f64 = f64::NEG_INFINITY;

#[test]
fn continuous_clip_has_point_masses_at_both_bounds() {
    let mut m = Model::new();
    let x = m.normal(0.5, 1.0);
    let lower = m.g.constant(-2.0);
    let upper = m.g.constant(2.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let terms = factorized_joint_logprob(m.g, &m.values, &LogprobConfig::elementwise())
        .expect("clip derives");
    assert_eq!(terms.len(), 1);
    let term = &terms.terms()[0];
    assert_eq!(term.name.as_deref(), Some("cens_logprob"));

    let out = eval(
        &term.expr,
        &bind([(cens_vv, Tensor::from([-3.0, -2.0, 0.0, 2.0, 3.0]))]),
    );
    assert_all_close(
        &out,
        &[
            NEG_INF,
            -5.08164827727869,
            -1.0439385332046727,
            -2.7059444008238893,
            NEG_INF,
        ],
    );
}

#[test]
fn two_sided_clip_is_guarded_and_has_four_branches() {
    let mut m = Model::new();
    let x = m.normal(0.5, 1.0);
    let lower = m.g.constant(-2.0);
    let upper = m.g.constant(2.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let terms = factorized_joint_logprob(m.g, &m.values, &LogprobConfig::default())
        .expect("clip derives");
    let expr = terms.get(&cens_vv).expect("term for cens");
    match expr {
        Expr::Check { msg, .. } => assert_eq!(*msg, BOUND_ORDER_CHECK),
        other => panic!("expected a bound-order guard, got {other:?}"),
    }
    let pw = expr.unguarded().as_piecewise().expect("piecewise density");
    assert_eq!(pw.branches.len(), 4);
    assert_eq!(expr.inputs().into_iter().collect::<Vec<_>>(), vec![cens_vv]);
}

#[test]
fn discrete_clip_upper_mass_includes_the_bound() {
    let mut m = Model::new();
    let x = m.poisson(2.0);
    let lower = m.g.constant(1.0);
    let upper = m.g.constant(4.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    let out = eval(
        &expr,
        &bind([(cens_vv, Tensor::from([0.0, 1.0, 2.0, 4.0, 5.0]))]),
    );
    assert_all_close(
        &out,
        &[
            NEG_INF,
            -0.9013877113318902,
            -1.3068528194400544,
            -1.9457743817619395,
            NEG_INF,
        ],
    );
}

#[test]
fn lower_only_clip_uses_the_base_as_upper_bound() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant(-1.0);
    let cens = m.g.clip(x, lower, x);
    let cens_vv = m.observe(cens, "cens");

    let terms = factorized_joint_logprob(m.g, &m.values, &LogprobConfig::elementwise())
        .expect("derives");
    let resolved = terms.terms()[0].resolved;
    match terms.store().node(&resolved).map(|record| &record.op) {
        Some(Op::MeasurableClip { lower, upper }) => {
            assert_eq!(*lower, Bound::Finite);
            assert_eq!(*upper, Bound::Unbounded);
        }
        other => panic!("expected a measurable clip, got {other:?}"),
    }

    let expr = terms.get(&cens_vv).expect("term");
    // One-sided clips carry no bound-order guard.
    let pw = expr.as_piecewise().expect("unguarded piecewise");
    assert_eq!(pw.branches.len(), 2);
    let out = eval(expr, &bind([(cens_vv, Tensor::from([-2.0, -1.0, 5.0]))]));
    assert_all_close(&out, &[NEG_INF, -1.8410216450092634, -13.418938533204672]);
}

#[test]
fn upper_only_clip_uses_the_base_as_lower_bound() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, x, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    assert_eq!(expr.as_piecewise().map(|pw| pw.branches.len()), Some(2));
    let out = eval(&expr, &bind([(cens_vv, Tensor::from([-5.0, 1.0, 2.0]))]));
    assert_all_close(&out, &[-13.418938533204672, -1.8410216450092634, NEG_INF]);
}

#[test]
fn clip_by_itself_on_both_sides_is_the_base_density() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let cens = m.g.clip(x, x, x);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    assert!(expr.unguarded().as_piecewise().is_none());
    assert!(matches!(expr.unguarded(), Expr::Special(..)));
    let out = eval(&expr, &bind([(cens_vv, Tensor::from([-1.0, 0.0, 5.0]))]));
    assert_all_close(
        &out,
        &[-1.4189385332046727, -0.9189385332046727, -13.418938533204672],
    );
}

#[test]
fn random_lower_bound_is_read_from_its_value() {
    let mut m = Model::new();
    let lb = m.normal(0.0, 1.0);
    let x = m.normal(0.0, 1.0);
    let upper = m.g.constant_vec([1.0, 1.0]);
    let cens = m.g.clip(x, lb, upper);
    let lb_vv = m.observe(lb, "lb");
    let cens_vv = m.observe(cens, "cens");

    let terms = factorized_joint_logprob(m.g, &m.values, &LogprobConfig::elementwise())
        .expect("derives");
    assert_eq!(terms.len(), 2);
    let inputs = bind([
        (lb_vv, Tensor::from([0.0, -1.0])),
        (cens_vv, Tensor::from([-1.0, -1.0])),
    ]);
    let out = eval(&terms.joint(false), &inputs);
    assert_all_close(&out, &[NEG_INF, -3.259960178213936]);

    let cens_expr = terms.get(&cens_vv).expect("cens term");
    let referenced: Vec<_> = cens_expr.inputs().into_iter().collect();
    assert_eq!(referenced, vec![lb_vv, cens_vv]);
}

#[test]
fn bounds_broadcast_against_the_value() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant_vec([-1.0, 0.0]);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    let out = eval(&expr, &bind([(cens_vv, Tensor::from([-1.0, -1.0]))]));
    assert_all_close(&out, &[-1.8410216450092634, NEG_INF]);
}

#[test]
fn inverted_bounds_fail_evaluation() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let lower = m.g.constant(2.0);
    let upper = m.g.constant(1.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::default()).expect("derives");
    let err = expr
        .eval(&bind([(cens_vv, Tensor::scalar(1.5))]))
        .expect_err("guard must fail");
    assert_eq!(err, EvalError::CheckFailed(BOUND_ORDER_CHECK));
}

#[test]
fn deterministic_clip_of_an_observed_variable_is_lowered() {
    let mut m = Model::new();
    let x = m.normal(0.0, 1.0);
    let zero = m.g.constant(0.0);
    let clipped = m.g.clip(x, zero, zero);
    let sigma = m.g.constant(1.0);
    let y = m.g.normal(clipped, sigma);
    let x_vv = m.observe(x, "x");
    let y_vv = m.observe(y, "y");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::default()).expect("derives");
    let total = eval_scalar(
        &expr,
        &bind([(x_vv, Tensor::scalar(-1.0)), (y_vv, Tensor::scalar(1.0))]),
    );
    assert_close(total, -2.8378770664093453);
}

#[test]
fn summed_joint_reduces_each_term() {
    let mut m = Model::new();
    let x = m.normal(0.5, 1.0);
    let lower = m.g.constant(-2.0);
    let upper = m.g.constant(2.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::default()).expect("derives");
    let total = eval_scalar(&expr, &bind([(cens_vv, Tensor::from([-2.0, 0.0, 2.0]))]));
    assert_close(
        total,
        -5.08164827727869 + -1.0439385332046727 + -2.7059444008238893,
    );
}

#[test]
fn clipped_uniform_spreads_tail_mass_onto_the_bounds() {
    let mut m = Model::new();
    let a = m.g.constant(0.0);
    let b = m.g.constant(4.0);
    let x = m.g.uniform(a, b);
    let lower = m.g.constant(1.0);
    let upper = m.g.constant(3.0);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");

    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    let out = eval(
        &expr,
        &bind([(cens_vv, Tensor::from([0.5, 1.0, 2.0, 3.0, 3.5]))]),
    );
    let quarter = 0.25f64.ln();
    assert_all_close(&out, &[NEG_INF, quarter, quarter, quarter, NEG_INF]);
}
