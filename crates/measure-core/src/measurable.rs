// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Measurable capability table and derivation context.
//!
//! A node can be asked for its log-density only if it is in the store's
//! measurable set *and* its op kind has an entry in the
//! [`CapabilityRegistry`]. The registry maps op kinds to a log-density rule
//! and, optionally, a log-CDF rule. Rules receive a [`DeriveCtx`] that can
//! lower deterministic subgraphs to [`Expr`] and recurse into other rules.
use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::config::LogprobConfig;
use crate::engine_impl::EngineError;
use crate::expr::{Expr, UnaryOp};
use crate::graph::GraphStore;
use crate::ident::NodeId;
use crate::op::{ElemwiseOp, Op, OpKind};
use crate::record::NodeRecord;

/// Errors raised while deriving log-density expressions.
#[derive(Debug, Error)]
pub enum DeriveError {
    /// Some observed variables had no derivable log-density.
    #[error("the logprob terms of the following value variables could not be derived: {{{}}}", .names.join(", "))]
    Underived {
        /// Diagnostic names of the offending value variables, in mapping order.
        names: Vec<String>,
    },
    /// A log-density was requested for a node without one.
    #[error("no log-density rule for {name}")]
    NotMeasurable {
        /// Node label.
        name: String,
    },
    /// A log-CDF was requested for a node kind without one.
    #[error("no log-CDF rule for {name}")]
    MissingLogcdf {
        /// Node label.
        name: String,
    },
    /// A density expression would depend on an unobserved random variable.
    #[error("random variable {name} has no value and cannot appear in a log-density")]
    UnvaluedRandomVariable {
        /// Node label.
        name: String,
    },
    /// A rule was invoked on a node it does not handle.
    #[error("{rule} cannot handle a {op} node")]
    UnsupportedOp {
        /// Label of the node's op kind.
        op: &'static str,
        /// Rule name.
        rule: &'static str,
    },
    /// A node had the wrong number of inputs for its op.
    #[error("{name} expects {expected} inputs, has {found}")]
    Arity {
        /// Node label.
        name: String,
        /// Expected input count.
        expected: usize,
        /// Actual input count.
        found: usize,
    },
    /// A referenced node is not in the store.
    #[error("unknown node: {0}")]
    MissingNode(NodeId),
    /// Rewriting failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Log-density or log-CDF rule: `(ctx, node id, record, value) -> expression`.
pub type DensityFn = fn(&DeriveCtx<'_>, NodeId, &NodeRecord, Expr) -> Result<Expr, DeriveError>;

/// Rules attached to one op kind.
#[derive(Clone, Copy)]
pub struct MeasurableRules {
    /// Log-density (or log-mass) rule.
    pub logprob: DensityFn,
    /// Log-CDF rule, when the kind supports one.
    pub logcdf: Option<DensityFn>,
}

impl core::fmt::Debug for MeasurableRules {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MeasurableRules")
            .field("has_logcdf", &self.logcdf.is_some())
            .finish_non_exhaustive()
    }
}

/// Op kind → measurable rules.
#[derive(Clone, Debug, Default)]
pub struct CapabilityRegistry {
    rules: FxHashMap<OpKind, MeasurableRules>,
}

impl CapabilityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the base distributions and the censoring kinds.
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        crate::dists::register_logprob(&mut registry);
        crate::censoring::register_logprob(&mut registry);
        registry
    }

    /// Attaches rules to `kind`, returning the rules it replaced.
    pub fn register(&mut self, kind: OpKind, rules: MeasurableRules) -> Option<MeasurableRules> {
        self.rules.insert(kind, rules)
    }

    /// Rules attached to `kind`.
    #[must_use]
    pub fn get(&self, kind: OpKind) -> Option<&MeasurableRules> {
        self.rules.get(&kind)
    }

    /// Returns `true` when `kind` has a log-density rule.
    #[must_use]
    pub fn supports(&self, kind: OpKind) -> bool {
        self.rules.contains_key(&kind)
    }
}

/// Read-only context handed to density rules.
#[derive(Debug, Clone, Copy)]
pub struct DeriveCtx<'a> {
    store: &'a GraphStore,
    registry: &'a CapabilityRegistry,
    substitutions: &'a BTreeMap<NodeId, Expr>,
    config: &'a LogprobConfig,
}

impl<'a> DeriveCtx<'a> {
    /// Creates a context. `substitutions` maps resolved observed nodes to
    /// their value expressions.
    #[must_use]
    pub fn new(
        store: &'a GraphStore,
        registry: &'a CapabilityRegistry,
        substitutions: &'a BTreeMap<NodeId, Expr>,
        config: &'a LogprobConfig,
    ) -> Self {
        Self {
            store,
            registry,
            substitutions,
            config,
        }
    }

    /// Derivation settings.
    #[must_use]
    pub fn config(&self) -> &'a LogprobConfig {
        self.config
    }

    /// Record of `id` after resolving replacements.
    ///
    /// # Errors
    /// Returns [`DeriveError::MissingNode`] when the node does not exist.
    pub fn node(&self, id: NodeId) -> Result<&'a NodeRecord, DeriveError> {
        let resolved = self.store.resolve(id);
        self.store
            .node(&resolved)
            .ok_or(DeriveError::MissingNode(resolved))
    }

    /// Diagnostic label of `id`.
    #[must_use]
    pub fn display_name(&self, id: NodeId) -> String {
        let resolved = self.store.resolve(id);
        self.store
            .node(&resolved)
            .map_or_else(|| resolved.to_string(), |record| record.display_name(resolved))
    }

    /// Inputs of `node` after checking their count.
    ///
    /// # Errors
    /// Returns [`DeriveError::Arity`] on a count mismatch.
    pub fn inputs<'r>(
        &self,
        id: NodeId,
        node: &'r NodeRecord,
        expected: usize,
    ) -> Result<&'r [NodeId], DeriveError> {
        if node.inputs.len() == expected {
            Ok(&node.inputs)
        } else {
            Err(DeriveError::Arity {
                name: self.display_name(id),
                expected,
                found: node.inputs.len(),
            })
        }
    }

    /// Lowers the deterministic subgraph rooted at `id` into an expression.
    ///
    /// Observed nodes become their value expression; constants and value
    /// placeholders become leaves.
    ///
    /// # Errors
    /// Returns [`DeriveError::UnvaluedRandomVariable`] when the subgraph
    /// depends on a random variable without a value.
    pub fn lower(&self, id: NodeId) -> Result<Expr, DeriveError> {
        let resolved = self.store.resolve(id);
        if let Some(expr) = self.substitutions.get(&resolved) {
            return Ok(expr.clone());
        }
        let node = self.node(resolved)?;
        match &node.op {
            Op::Constant(tensor) => Ok(Expr::Const(tensor.clone())),
            Op::Value => Ok(Expr::Input(resolved)),
            Op::Random(_) | Op::MeasurableClip { .. } | Op::MeasurableRound(_) => {
                Err(DeriveError::UnvaluedRandomVariable {
                    name: node.display_name(resolved),
                })
            }
            Op::Elemwise(op) => {
                let inputs = self.inputs(resolved, node, op.arity())?;
                let first = self.lower(inputs[0])?;
                Ok(match op {
                    ElemwiseOp::Neg => Expr::unary(UnaryOp::Neg, first),
                    ElemwiseOp::Exp => Expr::unary(UnaryOp::Exp, first),
                    ElemwiseOp::Log => Expr::unary(UnaryOp::Log, first),
                    ElemwiseOp::Add => Expr::add(first, self.lower(inputs[1])?),
                    ElemwiseOp::Sub => {
                        Expr::binary(crate::expr::BinaryOp::Sub, first, self.lower(inputs[1])?)
                    }
                    ElemwiseOp::Mul => {
                        Expr::binary(crate::expr::BinaryOp::Mul, first, self.lower(inputs[1])?)
                    }
                })
            }
            Op::Clip => {
                let inputs = self.inputs(resolved, node, 3)?;
                Ok(Expr::clamp(
                    self.lower(inputs[0])?,
                    self.lower(inputs[1])?,
                    self.lower(inputs[2])?,
                ))
            }
            Op::Round(kind) => {
                let inputs = self.inputs(resolved, node, 1)?;
                Ok(Expr::unary(UnaryOp::from(*kind), self.lower(inputs[0])?))
            }
        }
    }

    /// Log-density of `id` at `value`.
    ///
    /// # Errors
    /// Returns [`DeriveError::NotMeasurable`] when the node's kind has no
    /// rule; rule errors are propagated.
    pub fn logprob(&self, id: NodeId, value: Expr) -> Result<Expr, DeriveError> {
        let resolved = self.store.resolve(id);
        let node = self.node(resolved)?;
        let Some(rules) = self.registry.get(node.op.kind()) else {
            return Err(DeriveError::NotMeasurable {
                name: node.display_name(resolved),
            });
        };
        (rules.logprob)(self, resolved, node, value)
    }

    /// Log-CDF of `id` at `value`.
    ///
    /// # Errors
    /// Returns [`DeriveError::MissingLogcdf`] when the node's kind has no
    /// log-CDF rule; rule errors are propagated.
    pub fn logcdf(&self, id: NodeId, value: Expr) -> Result<Expr, DeriveError> {
        let resolved = self.store.resolve(id);
        let node = self.node(resolved)?;
        let Some(logcdf) = self.registry.get(node.op.kind()).and_then(|rules| rules.logcdf) else {
            return Err(DeriveError::MissingLogcdf {
                name: node.display_name(resolved),
            });
        };
        logcdf(self, resolved, node, value)
    }
}
