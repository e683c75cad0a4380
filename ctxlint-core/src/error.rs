//! Typed error handling for ctxlint.
//!
//! Findings about the analyzed code are never errors: they are returned as
//! diagnostics. Errors are reserved for failing to obtain a program, bad
//! configuration, and inputs that break assumptions a type-checked program
//! always satisfies.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for ctxlint operations.
#[derive(Error, Debug)]
pub enum CtxlintError {
    /// I/O error when reading program dumps or configuration
    #[error("I/O error at {path}: {message}")]
    Io {
        path: PathBuf,
        message: String,
        #[source]
        source: Option<std::io::Error>,
    },

    /// A program dump that is not valid JSON for the program model
    #[error("Decode error in {path}: {message}")]
    Decode {
        path: PathBuf,
        message: String,
        /// Line number (1-indexed) if available
        line: Option<usize>,
        /// Column number (1-indexed) if available
        column: Option<usize>,
    },

    /// A structurally broken program (dangling handles)
    #[error("Invalid program: {message}")]
    InvalidProgram { message: String },

    /// A state that cannot occur in a successfully type-checked program
    #[error("Invariant violated: {message}")]
    Invariant { message: String },

    /// Configuration file errors
    #[error("Config error at {path}: {message}")]
    Config { path: PathBuf, message: String },
}

impl CtxlintError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, err: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Create a decode error with line/column info.
    pub fn decode_at(
        path: impl Into<PathBuf>,
        message: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Decode {
            path: path.into(),
            message: message.into(),
            line: (line > 0).then_some(line),
            column: (column > 0).then_some(column),
        }
    }

    pub fn invalid_program(message: impl Into<String>) -> Self {
        Self::InvalidProgram {
            message: message.into(),
        }
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        Self::Invariant {
            message: message.into(),
        }
    }

    /// Create a config error.
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether the rest of a batch can still be analyzed.
    ///
    /// A bad dump only affects its own package; a bad configuration affects
    /// every package.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Io { .. } | Self::Decode { .. } | Self::InvalidProgram { .. } | Self::Invariant { .. }
        )
    }

    /// Get the path associated with this error, if any.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Decode { path, .. } => Some(path),
            Self::Config { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Convenience type alias for ctxlint results.
pub type CtxlintResult<T> = Result<T, CtxlintError>;

/// Extension trait for converting std::io::Error with path context.
pub trait IoResultExt<T> {
    /// Add path context to an I/O error.
    fn with_path(self, path: impl Into<PathBuf>) -> CtxlintResult<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> CtxlintResult<T> {
        self.map_err(|e| CtxlintError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error() {
        let err = CtxlintError::io(
            PathBuf::from("/dumps/app.json"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
        );
        assert!(matches!(err, CtxlintError::Io { .. }));
        assert_eq!(err.path(), Some(&PathBuf::from("/dumps/app.json")));
        assert!(err.to_string().contains("/dumps/app.json"));
    }

    #[test]
    fn test_decode_error_with_location() {
        let err = CtxlintError::decode_at("/dumps/app.json", "expected value", 10, 5);
        if let CtxlintError::Decode { line, column, .. } = &err {
            assert_eq!(*line, Some(10));
            assert_eq!(*column, Some(5));
        } else {
            panic!("Expected Decode error");
        }
    }

    #[test]
    fn test_is_recoverable() {
        assert!(CtxlintError::invariant("callee without signature").is_recoverable());
        assert!(CtxlintError::invalid_program("dangling type").is_recoverable());
        assert!(!CtxlintError::config("ctxlint.toml", "bad regex").is_recoverable());
    }

    #[test]
    fn test_io_result_ext() {
        let result: std::io::Result<()> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"));
        let ctxlint_result = result.with_path("/missing/app.json");
        assert!(ctxlint_result.is_err());
    }
}
