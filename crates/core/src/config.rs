//! Evaluation settings, loadable from TOML.
//!
//! ```toml
//! [evaluation]
//! parallel = true
//! parallel_threshold = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cancel::CancellationToken;

/// Errors that can occur while loading and validating a configuration file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SelectionConfig {
    #[serde(default)]
    pub evaluation: EvaluationOptions,
}

impl SelectionConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SelectionConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.evaluation.parallel_threshold == 0 {
            return Err(ConfigError::Validation(
                "evaluation.parallel_threshold must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.as_ref().display(), ?config, "loaded selection config");
        Ok(config)
    }
}

/// Knobs for [`crate::selection::Selection::evaluate_with`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EvaluationOptions {
    /// Split the enumeration over the rayon thread pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    /// Smallest outer-loop extent (atoms, or connectivity records) for which
    /// the parallel path is taken.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Checked before every candidate; not part of the file format.
    #[serde(skip)]
    pub cancellation: Option<CancellationToken>,
}

impl Default for EvaluationOptions {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            parallel_threshold: default_parallel_threshold(),
            cancellation: None,
        }
    }
}

impl EvaluationOptions {
    /// Options for a strictly sequential evaluation.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        self.cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    pub(crate) fn use_parallel(&self, extent: usize) -> bool {
        self.parallel && extent >= self.parallel_threshold
    }
}

fn default_parallel() -> bool {
    true
}

fn default_parallel_threshold() -> usize {
    64
}
