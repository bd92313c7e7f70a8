// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
//! Property checks of derived densities against the scalar kernels.

mod common;

use common::{bind, Model};
use measure_core::math::{log1mexp, normal_logcdf, normal_logpdf};
use measure_core::{joint_logprob, Expr, LogprobConfig, NodeId, RoundKind, Tensor};
use proptest::prelude::*;

fn clipped_normal(mu: f64, sigma: f64, lo: f64, hi: f64) -> (Expr, NodeId) {
    let mut m = Model::new();
    let x = m.normal(mu, sigma);
    let lower = m.g.constant(lo);
    let upper = m.g.constant(hi);
    let cens = m.g.clip(x, lower, upper);
    let cens_vv = m.observe(cens, "cens");
    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    (expr, cens_vv)
}

fn rounded_normal(kind: RoundKind, mu: f64, sigma: f64) -> (Expr, NodeId) {
    let mut m = Model::new();
    let x = m.normal(mu, sigma);
    let r = m.g.round_with(kind, x);
    let r_vv = m.observe(r, "r");
    let expr = joint_logprob(m.g, &m.values, &LogprobConfig::elementwise()).expect("derives");
    (expr, r_vv)
}

fn kind() -> impl Strategy<Value = RoundKind> {
    prop_oneof![
        Just(RoundKind::HalfToEven),
        Just(RoundKind::Floor),
        Just(RoundKind::Ceil),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn interior_clip_density_is_the_base_density(
        mu in -2.0f64..2.0,
        sigma in 0.5f64..3.0,
        lo in -5.0f64..-1.0,
        hi in 1.0f64..5.0,
        t in 0.01f64..0.99,
    ) {
        let (expr, cens_vv) = clipped_normal(mu, sigma, lo, hi);
        let v = lo + t * (hi - lo);
        let out = expr.eval(&bind([(cens_vv, Tensor::scalar(v))])).expect("eval");
        let got = out.item().expect("scalar");
        prop_assert!((got - normal_logpdf(v, mu, sigma)).abs() <= 1e-12);
    }

    #[test]
    fn clip_bounds_carry_the_tail_masses(
        mu in -2.0f64..2.0,
        sigma in 0.5f64..3.0,
        lo in -5.0f64..-1.0,
        hi in 1.0f64..5.0,
    ) {
        let (expr, cens_vv) = clipped_normal(mu, sigma, lo, hi);
        let out = expr
            .eval(&bind([(cens_vv, Tensor::from([lo - 1.0, lo, hi, hi + 1.0]))]))
            .expect("eval")
            .into_vec();
        prop_assert_eq!(out[0], f64::NEG_INFINITY);
        prop_assert!((out[1] - normal_logcdf(lo, mu, sigma)).abs() <= 1e-12);
        let upper_tail = log1mexp(normal_logcdf(hi, mu, sigma));
        prop_assert!((out[2] - upper_tail).abs() <= 1e-12);
        prop_assert_eq!(out[3], f64::NEG_INFINITY);
    }

    #[test]
    fn rounded_masses_sum_to_one(
        kind in kind(),
        mu in -3.0f64..3.0,
        sigma in 0.5f64..3.0,
    ) {
        let (expr, r_vv) = rounded_normal(kind, mu, sigma);
        let grid: Vec<f64> = (-60..=60).map(f64::from).collect();
        let out = expr
            .eval(&bind([(r_vv, Tensor::from(grid))]))
            .expect("eval")
            .into_vec();
        let total: f64 = out.iter().map(|lp| lp.exp()).sum();
        prop_assert!((total - 1.0).abs() <= 1e-9, "total mass {}", total);
    }
}
