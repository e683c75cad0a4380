//! Capability-interface analysis.
//!
//! Context parameters are typed as interfaces composed of small capability
//! interfaces (`interface { context.Context; database.Context; secrets.Context }`).
//! This pass checks that every such variable asks for exactly the
//! capabilities it uses:
//! - every requested capability is used (else "requests but does not use")
//! - every used capability is requested by name (else "uses but does not
//!   explicitly request")
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │    collector.rs     │     │     unifier.rs      │
//! │  ─────────────────  │     │  ─────────────────  │
//! │  Find context-typed │ ──▶ │  Pool records of    │
//! │  variables          │     │  sibling impls      │
//! └─────────────────────┘     └──────────┬──────────┘
//!                                        ▼
//! ┌─────────────────────┐     ┌─────────────────────┐
//! │    evaluate.rs      │     │      usage.rs       │
//! │  ─────────────────  │ ◀── │  ─────────────────  │
//! │  Problems and       │     │  Record calls,      │
//! │  diagnostics        │     │  casts, literals    │
//! └─────────────────────┘     └─────────────────────┘
//!
//!   graph.rs: composition queries shared by all phases
//!   tracker.rs: tracked variables and their usage records
//! ```
//!
//! # Example
//!
//! ```ignore
//! use ctxlint_core::capability::run_pass;
//!
//! let output = run_pass(&program, &settings, false)?;
//! for d in &output.diagnostics {
//!     println!("{}:{}:{}: {}", d.file, d.line, d.column, d.message);
//! }
//! ```

pub mod collector;
pub mod evaluate;
pub mod graph;
pub mod tracker;
pub mod unifier;
pub mod usage;

pub use collector::collect_tracked;
pub use evaluate::{format_type_list, report, short_type_name, Evaluator, Problems};
pub use graph::{
    explicit_composition, explicitly_containing, expand_unexported, is_context_type, leaf_groups,
    Nameable,
};
pub use tracker::{RecordId, TrackedVariable, Tracker, UsageRecord, VarHandle};
pub use unifier::{receivers_by_type, unify_interface_methods};
pub use usage::mark_uses;

use crate::config::AnalyzerSettings;
use crate::error::CtxlintResult;
use crate::program::Program;
use crate::report::Diagnostic;

/// Result of one pass over one package.
#[derive(Debug, Clone, Default)]
pub struct PassOutput {
    pub diagnostics: Vec<Diagnostic>,
    /// Variables tracked at the end of the pass.
    pub tracked: usize,
    /// Distinct usage records among them.
    pub shared_records: usize,
    /// Parameters pooled with a sibling implementation.
    pub unified: usize,
    /// Uses recorded.
    pub uses: usize,
}

/// Runs the four phases in order: collect, unify, mark, evaluate.
///
/// Fails when the program does not validate, or breaks an invariant a
/// type-checked program cannot break.
pub fn run_pass(
    program: &Program,
    settings: &AnalyzerSettings,
    include_tests: bool,
) -> CtxlintResult<PassOutput> {
    program.validate()?;
    let mut tracker = Tracker::new();

    collect_tracked(program, settings, &mut tracker);
    tracing::debug!(tracked = tracker.len(), "collected variables");

    let unified = unify_interface_methods(program, &mut tracker);
    tracing::debug!(unified, "unified interface implementations");

    let uses = mark_uses(program, settings, &mut tracker)?;
    tracing::debug!(uses, remaining = tracker.len(), "marked uses");

    let diagnostics = report(program, settings, &tracker, include_tests);
    tracing::debug!(diagnostics = diagnostics.len(), "evaluated");

    Ok(PassOutput {
        diagnostics,
        tracked: tracker.len(),
        shared_records: tracker.distinct_records(),
        unified,
        uses,
    })
}
