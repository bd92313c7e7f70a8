// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! measure-core: deterministic measurable-graph rewriting.
//!
//! Model graphs are built in a [`GraphStore`]: constants, value placeholders,
//! random variables and deterministic elementwise ops. The [`Engine`] rewrites
//! `clip` and `round`/`floor`/`ceil` nodes over random variables into
//! measurable variables in deterministic epochs, and the driver
//! ([`factorized_joint_logprob`], [`joint_logprob`]) derives symbolic
//! log-density [`Expr`]s for every observed variable.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]
#![warn(missing_docs)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::unreadable_literal,
    clippy::missing_const_for_fn,
    clippy::suboptimal_flops,
    clippy::redundant_pub_crate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::use_self,
    clippy::float_cmp,
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::too_many_lines,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::similar_names,
    clippy::trivially_copy_pass_by_ref,
    clippy::needless_pass_by_value,
    clippy::manual_let_else,
    clippy::option_if_let_else,
    clippy::cognitive_complexity,
    clippy::needless_collect,
    clippy::too_long_first_doc_paragraph,
    clippy::multiple_crate_versions
)]

/// Scalar log-space numerics and distribution kernels.
pub mod math;

/// Censoring (clip) and rounding rewrites and their log-densities.
pub mod censoring;

mod config;
mod constants;
mod delta;
mod dists;
mod engine_impl;
mod eval;
mod expr;
mod footprint;
mod graph;
mod graph_view;
mod ident;
mod logprob;
mod measurable;
mod op;
mod receipt;
mod record;
mod rule;
mod scheduler;
mod snapshot;
mod tensor;
mod tx;
mod values;

// Re-exports for stable public API
/// Derivation settings.
pub use config::{ConfigError, LogprobConfig};
/// Category tags and canonical constants.
pub use constants::{
    digest_len0_u64, BOUND_ORDER_CHECK, CATEGORY_BASIC, CATEGORY_CENSORING, DEFAULT_MAX_EPOCHS,
};
/// Executor write side.
pub use delta::{GraphOp, RewriteDelta};
/// Base distribution density rules.
pub use dists::register_logprob as register_dist_logprob;
/// Rewrite engine.
pub use engine_impl::{ApplyResult, Engine, EngineError, RewriteReport};
/// Expression evaluation.
pub use eval::{EvalError, Inputs};
/// Symbolic density expressions.
pub use expr::{BinaryOp, Branch, Compare, Expr, Piecewise, Predicate, SpecialFn, UnaryOp};
/// Footprints for independence checks.
pub use footprint::{Footprint, IdSet};
/// Graph storage and its read-only view.
pub use graph::GraphStore;
pub use graph_view::GraphView;
/// Identifiers and hashing.
pub use ident::{make_rule_id, make_type_id, Hash, NodeId, TypeId};
/// Joint log-probability driver.
pub use logprob::{
    factorized_joint_logprob, factorized_joint_logprob_with, joint_logprob, LogprobTerm,
    LogprobTerms,
};
/// Measurable capability table.
pub use measurable::{CapabilityRegistry, DensityFn, DeriveCtx, DeriveError, MeasurableRules};
/// Operation vocabulary.
pub use op::{Bound, DType, Dist, ElemwiseOp, Op, OpKind, RoundKind};
/// Epoch receipts.
pub use receipt::{EpochReceipt, EpochReceiptDisposition, EpochReceiptEntry, EpochRejection};
pub use record::NodeRecord;
/// Rewrite rules.
pub use rule::{ExecuteFn, FootprintFn, MatchFn, RewriteRule};
/// Snapshots.
pub use snapshot::{compute_snapshot_hash, Snapshot};
/// Tensors.
pub use tensor::{broadcast_len, Tensor};
pub use tx::TxId;
/// Observed-value mapping.
pub use values::ObservedValues;
