//! Optional TOML configuration.
//!
//! Every field has a default, so an empty file (or no file) behaves like the
//! built-in settings. Command-line flags are applied on top by the caller.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::extract::DEFAULT_PREVIEW_LEN;
use crate::patterns::DEFAULT_PATTERNS;

/// Errors while loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Patterns applied before anything else. Replaces the built-in list.
    pub default_ignores: Vec<String>,
    /// Patterns added after the project's ignore file.
    pub extra_ignores: Vec<String>,
    /// Read `.gitignore` from the project root.
    pub read_gitignore: bool,
    /// Append report entries to the output directory's `.gitignore`.
    pub update_output_ignore: bool,
    /// Maximum characters of documentation shown per declaration.
    pub preview_len: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_ignores: DEFAULT_PATTERNS.iter().map(|s| s.to_string()).collect(),
            extra_ignores: Vec::new(),
            read_gitignore: true,
            update_output_ignore: true,
            preview_len: DEFAULT_PREVIEW_LEN,
        }
    }
}

impl Config {
    /// Parse configuration text. `origin` is only used in error messages.
    pub fn from_toml(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.preview_len == 0 {
            return Err(ConfigError::Invalid("preview_len must be at least 1".into()));
        }
        Ok(())
    }
}
