//! ctxlint-core: capability-interface checking for typed contexts
//!
//! Code that threads a context through every call often types it as a
//! composition of small capability interfaces:
//!
//! ```text
//! func DoTheThing(ctx interface {
//!     context.Context
//!     database.Context
//!     secrets.Context
//! }, ...)
//! ```
//!
//! This library checks that each such variable requests exactly the
//! capabilities it uses, and requests them by name.
//!
//! # Features
//!
//! - **Unused capabilities**: requested interfaces that are never used
//! - **Unrequested capabilities**: interfaces used through a larger one
//!   without being named
//! - **Interface implementations**: context parameters of sibling
//!   implementations of one interface method share their usage
//! - **Batch mode**: independent packages analyzed in parallel
//!
//! # Quick Start
//!
//! Use the [`prelude`] module for convenient imports:
//!
//! ```rust,ignore
//! use ctxlint_core::prelude::*;
//!
//! let result = Ctxlint::from_path(Path::new("dumps/app.json"))?
//!     .include_tests(false)
//!     .analyze()?;
//!
//! for d in &result.diagnostics {
//!     println!("{}", d);
//! }
//! ```
//!
//! # Module Organization
//!
//! - [`program`]: Resolved-program model, type queries, JSON loading
//! - [`capability`]: The analysis pass
//! - [`builder`]: Fluent builder API and batch analysis
//! - [`config`]: `ctxlint.toml` handling
//! - [`report`]: Diagnostics and output formats
//! - [`error`]: Typed error handling

pub mod builder;
pub mod capability;
pub mod config;
pub mod error;
pub mod logging;
pub mod prelude;
pub mod program;
pub mod report;

// ============================================================================
// Explicit Re-exports (avoiding glob imports for clear API surface)
// ============================================================================

// Error types
pub use error::{CtxlintError, CtxlintResult, IoResultExt};

// Builder API
pub use builder::{analyze_paths, AnalysisResult, AnalysisStats, Ctxlint};

// Configuration
pub use config::{
    load_config, load_config_file, AnalyzerSettings, CtxlintConfig, OutputConfig, QualifiedName,
};

// Logging
pub use logging::{init_compact_logging, init_structured_logging, log_error, log_info, log_warn};

// Program model
pub use program::{
    gather_program_files, load_program, parse_program, FileId, ObjectId, PackageId, Program,
    ProgramBuilder, TypeId,
};

// Analysis pass
pub use capability::{run_pass, PassOutput};

// Reporting
pub use report::{print_json, print_plain, Diagnostic, ProblemKind};
