//! Configuration loading from ctxlint.toml.

use anyhow::{Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::{fs, path::Path};

use crate::error::{CtxlintError, CtxlintResult};

pub const CONFIG_FILE: &str = "ctxlint.toml";

pub const DEFAULT_BASE_CONTEXT: &str = "context.Context";
pub const DEFAULT_TEST_FILE_PATTERN: &str = r"_test\.go$";
pub const DEFAULT_MEMOIZE_FUNCTION: &str = "github.com/Khan/webapp/pkg/lib/cache.Cache";
pub const DEFAULT_KEY_PARAMS_FUNCTION: &str = "github.com/Khan/webapp/pkg/lib/cache.KeyParamsFxn";

/// Main configuration structure for ctxlint.toml.
#[derive(Debug, Deserialize, Default)]
pub struct CtxlintConfig {
    /// Qualified name of the base context interface, e.g. `context.Context`.
    pub base_context: Option<String>,
    /// Regex matched against file names; matching files are never reported.
    pub test_file_pattern: Option<String>,
    /// Qualified names of functions that memoize their function argument.
    pub memoize_functions: Option<Vec<String>>,
    /// Qualified names of functions that register a cache-key function.
    pub key_param_functions: Option<Vec<String>>,
    /// Output configuration.
    pub output: Option<OutputConfig>,
}

/// Output format configuration.
#[derive(Debug, Deserialize, Default)]
pub struct OutputConfig {
    /// Output format: "plain" or "json".
    pub format: Option<String>,
}

/// Loads configuration from ctxlint.toml if it exists.
pub fn load_config(root: &Path) -> Result<Option<CtxlintConfig>> {
    let path = root.join(CONFIG_FILE);
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Loads a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<CtxlintConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let cfg = toml::from_str(&content)
        .with_context(|| format!("Invalid {}", path.display()))?;
    Ok(cfg)
}

/// A qualified type name split into package path and name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualifiedName {
    pub package_path: String,
    pub name: String,
}

impl QualifiedName {
    /// Splits `path/to/pkg.Name` at the last dot.
    pub fn parse(qualified: &str) -> Option<Self> {
        let (package_path, name) = qualified.rsplit_once('.')?;
        if package_path.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self {
            package_path: package_path.to_string(),
            name: name.to_string(),
        })
    }
}

/// Settings the analysis pass runs with: configuration with defaults
/// applied and patterns compiled.
#[derive(Debug, Clone)]
pub struct AnalyzerSettings {
    pub base_context: QualifiedName,
    pub test_files: Regex,
    pub memoize_functions: Vec<String>,
    pub key_param_functions: Vec<String>,
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            base_context: QualifiedName {
                package_path: "context".to_string(),
                name: "Context".to_string(),
            },
            test_files: Regex::new(DEFAULT_TEST_FILE_PATTERN).expect("default pattern is valid"),
            memoize_functions: vec![DEFAULT_MEMOIZE_FUNCTION.to_string()],
            key_param_functions: vec![DEFAULT_KEY_PARAMS_FUNCTION.to_string()],
        }
    }
}

impl AnalyzerSettings {
    /// Applies a loaded configuration on top of the defaults.
    ///
    /// `source` is only used to label errors.
    pub fn from_config(cfg: &CtxlintConfig, source: &Path) -> CtxlintResult<Self> {
        let mut settings = Self::default();

        if let Some(base) = &cfg.base_context {
            settings.base_context = QualifiedName::parse(base).ok_or_else(|| {
                CtxlintError::config(
                    source,
                    format!("base_context `{}` is not of the form path.Name", base),
                )
            })?;
        }

        if let Some(pattern) = &cfg.test_file_pattern {
            settings.test_files = Regex::new(pattern).map_err(|e| {
                CtxlintError::config(source, format!("invalid test_file_pattern: {}", e))
            })?;
        }

        if let Some(names) = &cfg.memoize_functions {
            settings.memoize_functions = names.clone();
        }
        if let Some(names) = &cfg.key_param_functions {
            settings.key_param_functions = names.clone();
        }

        Ok(settings)
    }

    pub fn is_test_file(&self, file_name: &str) -> bool {
        self.test_files.is_match(file_name)
    }
}
