//! Error types for the canon store

use std::path::PathBuf;

use canonize_syntax::HashError;

/// Errors creating, loading or comparing canon records
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No canon recorded for the task
    #[error("no canon recorded for task '{0}'")]
    CanonMissing(String),

    /// Canon rejected before anything was written
    #[error("canon for task '{task_id}' refused: {reason}")]
    CanonCreationRefused {
        /// Task the canon was submitted for
        task_id: String,
        /// Why it was refused
        reason: String,
    },

    /// A canon already exists; only an explicit overwrite replaces it
    #[error("canon for task '{0}' already exists")]
    AlreadyExists(String),

    /// Task id unusable as a record key
    #[error("invalid task id: '{0}'")]
    InvalidTaskId(String),

    /// Backend I/O failure
    #[error("io error at {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Record could not be encoded or decoded
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Content hash of the source could not be computed
    #[error("hashing failed: {0}")]
    Hash(#[from] HashError),
}

impl StoreError {
    /// Create a refusal
    pub fn refused(task_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CanonCreationRefused {
            task_id: task_id.into(),
            reason: reason.into(),
        }
    }

    /// Create an I/O error for `path`
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this is a refusal the caller caused, as opposed to a backend fault
    #[must_use]
    pub const fn is_refusal(&self) -> bool {
        matches!(
            self,
            Self::CanonCreationRefused { .. } | Self::AlreadyExists(_) | Self::InvalidTaskId(_)
        )
    }
}

/// Convenience alias
pub type StoreResult<T> = Result<T, StoreError>;
