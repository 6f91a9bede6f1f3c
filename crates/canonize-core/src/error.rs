//! Error types for the engine
//!
//! Only configuration problems and the store's structured refusals reach the
//! caller. Parse failures, rejected rewrites and strategy faults are handled
//! inside a run and reported through its result.

use std::path::PathBuf;

use canonize_store::StoreError;

/// Invalid or unreadable engine configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file could not be read
    #[error("cannot read config {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration text is not valid TOML for [`crate::EngineConfig`]
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },

    /// Log subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

impl ConfigError {
    /// Create an out-of-range error
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration problem
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Canon missing, refused, or backend failure
    #[error("canon store error: {0}")]
    Store(#[from] StoreError),
}

impl EngineError {
    /// Whether the canon for the task has not been established yet
    #[must_use]
    pub const fn is_canon_missing(&self) -> bool {
        matches!(self, Self::Store(StoreError::CanonMissing(_)))
    }

    /// Whether the store refused a canon
    #[must_use]
    pub const fn is_refusal(&self) -> bool {
        matches!(self, Self::Store(e) if e.is_refusal())
    }
}

/// Convenience alias
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_classify() {
        let missing = EngineError::from(StoreError::CanonMissing("t".into()));
        assert!(missing.is_canon_missing());
        assert!(!missing.is_refusal());

        let refused = EngineError::from(StoreError::refused("t", "oracle failed"));
        assert!(refused.is_refusal());
        assert_eq!(
            refused.to_string(),
            "canon store error: canon for task 't' refused: oracle failed"
        );
    }
}
