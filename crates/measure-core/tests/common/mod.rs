// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use measure_core::{Expr, GraphStore, Inputs, NodeId, ObservedValues, Tensor};

/// Absolute tolerance for comparing derived densities against reference values.
pub const TOL: f64 = 1e-9;

/// Graph plus observed-value mapping under construction.
#[derive(Default)]
pub struct Model {
    pub g: GraphStore,
    pub values: ObservedValues,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// `Normal(mu, sigma)` with constant parameters.
    pub fn normal(&mut self, mu: f64, sigma: f64) -> NodeId {
        let mu = self.g.constant(mu);
        let sigma = self.g.constant(sigma);
        self.g.normal(mu, sigma)
    }

    /// `Poisson(mu)` with a constant rate.
    pub fn poisson(&mut self, mu: f64) -> NodeId {
        let mu = self.g.constant(mu);
        self.g.poisson(mu)
    }

    /// Names `var`, creates a matching value placeholder and observes it.
    pub fn observe(&mut self, var: NodeId, name: &str) -> NodeId {
        assert!(self.g.set_name(var, name));
        let value = self.g.value_like(var).expect("observed node exists");
        self.values.insert(var, value);
        value
    }
}

/// Builds an input binding from `(value node, tensor)` pairs.
pub fn bind<const N: usize>(pairs: [(NodeId, Tensor); N]) -> Inputs {
    pairs.into_iter().collect()
}

/// Evaluates `expr` and returns its elements.
pub fn eval(expr: &Expr, inputs: &Inputs) -> Vec<f64> {
    expr.eval(inputs).expect("evaluation succeeds").into_vec()
}

/// Evaluates a scalar-valued `expr`.
pub fn eval_scalar(expr: &Expr, inputs: &Inputs) -> f64 {
    expr.eval(inputs)
        .expect("evaluation succeeds")
        .item()
        .expect("scalar result")
}

/// Asserts `actual` matches `expected` within [`TOL`]; infinities must match exactly.
pub fn assert_close(actual: f64, expected: f64) {
    if expected.is_infinite() {
        assert_eq!(actual, expected, "expected {expected}, got {actual}");
    } else {
        assert!(
            (actual - expected).abs() <= TOL,
            "expected {expected}, got {actual}"
        );
    }
}

/// Elementwise [`assert_close`].
pub fn assert_all_close(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "length mismatch: {actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert_close(*a, *e);
    }
}
