//! Submission configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Default bound on re-entrant merge/notify generations per pass.
pub const DEFAULT_REENTRANCY_LIMIT: u32 = 5;

/// Largest accepted re-entrancy limit.
pub const MAX_REENTRANCY_LIMIT: u32 = 1024;

/// What a pass does when a queued structural operation fails validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationErrorPolicy {
    /// Log the failure, record it in the report and apply the next operation.
    #[default]
    Continue,
    /// Stop at the first failure and return it from the pass.
    Halt,
}

/// Errors raised while loading a [`SubmissionConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read submission config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration was not valid JSON for this schema.
    #[error("failed to parse submission config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("invalid submission config: {0}")]
    Invalid(String),
}

/// Configuration for an [`EntitiesRoot`](crate::EntitiesRoot).
///
/// Every field has a default, so a partial JSON document such as
/// `{"on_operation_error": "halt"}` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Maximum number of re-entrant generations (batches built by engine
    /// callbacks) one pass will merge before failing.
    pub reentrancy_limit: u32,
    /// Handling of failed structural operations.
    pub on_operation_error: OperationErrorPolicy,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            reentrancy_limit: DEFAULT_REENTRANCY_LIMIT,
            on_operation_error: OperationErrorPolicy::Continue,
        }
    }
}

impl SubmissionConfig {
    /// Create a config with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the re-entrancy limit.
    #[must_use]
    pub fn with_reentrancy_limit(mut self, limit: u32) -> Self {
        self.reentrancy_limit = limit;
        self
    }

    /// Override the operation error policy.
    #[must_use]
    pub fn with_operation_error_policy(mut self, policy: OperationErrorPolicy) -> Self {
        self.on_operation_error = policy;
        self
    }

    /// Check that every value is in range.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `reentrancy_limit` exceeds
    /// [`MAX_REENTRANCY_LIMIT`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.reentrancy_limit > MAX_REENTRANCY_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "reentrancy_limit {} exceeds the maximum of {MAX_REENTRANCY_LIMIT}",
                self.reentrancy_limit
            )));
        }
        Ok(())
    }

    /// Parse and validate a config from a JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is malformed and
    /// [`ConfigError::Invalid`] if a value is out of range.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}
