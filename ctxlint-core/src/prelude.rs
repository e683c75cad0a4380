//! Prelude module for convenient imports.
//!
//! Import commonly used types with a single line:
//!
//! ```rust,ignore
//! use ctxlint_core::prelude::*;
//! ```

// Core analysis types
pub use crate::error::{CtxlintError, CtxlintResult};
pub use crate::program::{load_program, gather_program_files, Program, ProgramBuilder};

// Configuration
pub use crate::config::{load_config, AnalyzerSettings, CtxlintConfig};

// Builder API
pub use crate::builder::{analyze_paths, AnalysisResult, Ctxlint};

// Reporting
pub use crate::report::{Diagnostic, ProblemKind};
