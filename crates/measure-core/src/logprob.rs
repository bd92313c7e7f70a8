// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Joint log-probability driver.
//!
//! The driver runs the enabled rewrites to a fixed point, substitutes value
//! placeholders for every observed node, and asks each observed node for its
//! log-density. Observed nodes without the measurable capability (or without
//! a registered rule) are collected and reported together.
use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use crate::censoring;
use crate::config::LogprobConfig;
use crate::engine_impl::{Engine, RewriteReport};
use crate::expr::Expr;
use crate::graph::GraphStore;
use crate::ident::NodeId;
use crate::measurable::{CapabilityRegistry, DeriveCtx, DeriveError};
use crate::values::ObservedValues;

/// Log-density term of one observed variable.
#[derive(Clone, Debug)]
pub struct LogprobTerm {
    /// Observed variable as supplied by the caller.
    pub var: NodeId,
    /// Node the variable resolved to after rewriting.
    pub resolved: NodeId,
    /// Value placeholder the density is expressed in.
    pub value: NodeId,
    /// Diagnostic label, `<name>_logprob`, when the variable is named.
    pub name: Option<String>,
    /// Density expression.
    pub expr: Expr,
}

/// Per-variable log-density terms, in observed-mapping key order.
#[derive(Clone, Debug)]
pub struct LogprobTerms {
    terms: Vec<LogprobTerm>,
    report: RewriteReport,
    store: GraphStore,
}

impl LogprobTerms {
    /// Terms in key order.
    #[must_use]
    pub fn terms(&self) -> &[LogprobTerm] {
        &self.terms
    }

    /// Density expression of the term whose value placeholder is `value`.
    #[must_use]
    pub fn get(&self, value: &NodeId) -> Option<&Expr> {
        self.terms
            .iter()
            .find(|term| term.value == *value)
            .map(|term| &term.expr)
    }

    /// Number of terms.
    #[must_use]
    pub fn len(&self) -> usize {
        self.terms.len()
    }

    /// Returns `true` when nothing was observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Rewrite epochs that produced the derivation graph.
    #[must_use]
    pub fn report(&self) -> &RewriteReport {
        &self.report
    }

    /// Graph after rewriting.
    #[must_use]
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    /// Adds all terms together. With `sum`, each term is first reduced to a
    /// scalar; otherwise terms are added elementwise (and must broadcast).
    #[must_use]
    pub fn joint(&self, sum: bool) -> Expr {
        self.terms
            .iter()
            .map(|term| {
                if sum {
                    Expr::sum(term.expr.clone())
                } else {
                    term.expr.clone()
                }
            })
            .reduce(Expr::add)
            .unwrap_or_else(|| Expr::constant(0.0))
    }
}

/// Derives one log-density term per observed variable.
///
/// # Errors
/// * [`DeriveError::Engine`] when rewriting fails (e.g. no fixed point).
/// * [`DeriveError::Underived`] naming every observed variable whose term
///   could not be derived.
/// * [`DeriveError::UnvaluedRandomVariable`] when a density would depend on an
///   unobserved random variable.
pub fn factorized_joint_logprob(
    store: GraphStore,
    values: &ObservedValues,
    config: &LogprobConfig,
) -> Result<LogprobTerms, DeriveError> {
    factorized_joint_logprob_with(store, values, config, &CapabilityRegistry::with_defaults())
}

/// [`factorized_joint_logprob`] with a caller-supplied capability registry.
///
/// # Errors
/// Same as [`factorized_joint_logprob`].
#[instrument(skip_all, fields(observed = values.len(), nodes = store.len()))]
pub fn factorized_joint_logprob_with(
    store: GraphStore,
    values: &ObservedValues,
    config: &LogprobConfig,
    registry: &CapabilityRegistry,
) -> Result<LogprobTerms, DeriveError> {
    let mut engine = Engine::new(store, values.clone());
    censoring::register_rewrites(&mut engine)?;
    let report = engine.rewrite_to_fixed_point(&config.categories, config.max_epochs)?;
    let store = engine.into_store();

    let substitutions: BTreeMap<NodeId, Expr> = values
        .iter()
        .map(|(var, value)| (store.resolve(var), Expr::Input(value)))
        .collect();
    let ctx = DeriveCtx::new(&store, registry, &substitutions, config);

    let mut terms = Vec::with_capacity(values.len());
    let mut underived = Vec::new();
    for (var, value) in values.iter() {
        let resolved = store.resolve(var);
        let node = ctx.node(resolved)?;
        if !store.is_measurable(&resolved) || !registry.supports(node.op.kind()) {
            let name = store
                .node(&value)
                .and_then(|record| record.name.clone())
                .unwrap_or_else(|| node.display_name(resolved));
            debug!(var = %var, resolved = %resolved, %name, "no derivable log-density");
            underived.push(name);
            continue;
        }
        let expr = ctx.logprob(resolved, Expr::Input(value))?;
        terms.push(LogprobTerm {
            var,
            resolved,
            value,
            name: node.name.as_ref().map(|name| format!("{name}_logprob")),
            expr,
        });
    }
    if !underived.is_empty() {
        return Err(DeriveError::Underived { names: underived });
    }
    info!(terms = terms.len(), epochs = report.epochs.len(), "derived log-density terms");
    Ok(LogprobTerms {
        terms,
        report,
        store,
    })
}

/// Joint log-density of all observed variables.
///
/// Sums to a scalar when `config.sum`; otherwise adds terms elementwise.
///
/// # Errors
/// Same as [`factorized_joint_logprob`].
pub fn joint_logprob(
    store: GraphStore,
    values: &ObservedValues,
    config: &LogprobConfig,
) -> Result<Expr, DeriveError> {
    Ok(factorized_joint_logprob(store, values, config)?.joint(config.sum))
}
