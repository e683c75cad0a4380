//! Builder pattern API for ctxlint analysis.
//!
//! Provides a fluent interface for configuring and running the capability
//! check on one package:
//!
//! ```rust,ignore
//! use ctxlint_core::prelude::*;
//!
//! let program = load_program(Path::new("dumps/app.json"))?;
//! let result = Ctxlint::new(program)
//!     .with_settings(settings)
//!     .include_tests(false)
//!     .analyze()?;
//!
//! for d in &result.diagnostics {
//!     println!("{}", d);
//! }
//! ```

use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;

use crate::capability::run_pass;
use crate::config::AnalyzerSettings;
use crate::error::CtxlintResult;
use crate::program::{load_program, Program};
use crate::report::{Diagnostic, ProblemKind};

/// Builder for configuring the analysis of one package.
///
/// # Example
///
/// ```rust,ignore
/// let result = Ctxlint::new(program).include_tests(true).analyze()?;
/// ```
#[derive(Debug, Clone)]
pub struct Ctxlint {
    program: Program,

    settings: AnalyzerSettings,

    /// Report variables declared in test files too
    include_tests: bool,
}

impl Ctxlint {
    /// Create a new analysis builder for an already loaded program.
    pub fn new(program: Program) -> Self {
        Self {
            program,
            settings: AnalyzerSettings::default(),
            include_tests: false,
        }
    }

    /// Load a program dump and create a builder for it.
    pub fn from_path(path: &Path) -> CtxlintResult<Self> {
        Ok(Self::new(load_program(path)?))
    }

    pub fn with_settings(mut self, settings: AnalyzerSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Report problems in test files as well.
    pub fn include_tests(mut self, enabled: bool) -> Self {
        self.include_tests = enabled;
        self
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Run the analysis and return results.
    ///
    /// A program that does not validate fails with
    /// [`InvalidProgram`](crate::error::CtxlintError::InvalidProgram),
    /// whether or not it came from [`load_program`].
    pub fn analyze(&self) -> CtxlintResult<AnalysisResult> {
        self.program.validate()?;
        let package = self
            .program
            .package_info(self.program.package)
            .path
            .clone();
        let _span = tracing::debug_span!("analyze", package = %package).entered();

        let output = run_pass(&self.program, &self.settings, self.include_tests)?;

        let mut stats = AnalysisStats {
            tracked: output.tracked,
            shared_records: output.shared_records,
            unified: output.unified,
            uses: output.uses,
            ..Default::default()
        };
        for d in &output.diagnostics {
            match d.kind {
                ProblemKind::AllUnused => stats.all_unused += 1,
                ProblemKind::Unrequested => stats.unrequested += 1,
                ProblemKind::Unused => stats.unused += 1,
            }
        }

        tracing::info!(
            package = %package,
            tracked = stats.tracked,
            problems = output.diagnostics.len(),
            "analysis complete"
        );

        Ok(AnalysisResult {
            package,
            diagnostics: output.diagnostics,
            stats,
        })
    }
}

/// Result of analyzing one package.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    /// Import path of the analyzed package
    pub package: String,

    /// Findings, ordered by file, line, and column
    pub diagnostics: Vec<Diagnostic>,

    pub stats: AnalysisStats,
}

impl AnalysisResult {
    pub fn has_problems(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Counters for one package.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AnalysisStats {
    /// Variables still tracked after the pass
    pub tracked: usize,
    /// Distinct usage records among tracked variables
    pub shared_records: usize,
    /// Parameters pooled with a sibling implementation
    pub unified: usize,
    /// Uses recorded
    pub uses: usize,
    pub all_unused: usize,
    pub unrequested: usize,
    pub unused: usize,
}

/// Analyzes several program dumps in parallel.
///
/// Packages share nothing, so each one is loaded and analyzed on its own
/// worker. Results keep the order of `paths`.
pub fn analyze_paths(
    paths: &[PathBuf],
    settings: &AnalyzerSettings,
    include_tests: bool,
) -> Vec<(PathBuf, CtxlintResult<AnalysisResult>)> {
    paths
        .par_iter()
        .map(|path| {
            let result = Ctxlint::from_path(path).and_then(|lint| {
                lint.with_settings(settings.clone())
                    .include_tests(include_tests)
                    .analyze()
            });
            (path.clone(), result)
        })
        .collect()
}
