//! Canon record and task identifiers

use canonize_contract::{NamingPolicy, OracleResult};
use canonize_props::{ExtractionMode, PropertySet};
use canonize_syntax::ContentHash;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Longest accepted task id
pub const MAX_TASK_ID_LEN: usize = 128;

/// Check that `task_id` is usable as a record key and file stem
///
/// Accepts ASCII letters, digits, `-`, `_` and `.`, not starting with `.`.
///
/// # Errors
/// Returns [`StoreError::InvalidTaskId`] otherwise
pub fn validate_task_id(task_id: &str) -> StoreResult<()> {
    let well_formed = !task_id.is_empty()
        && task_id.len() <= MAX_TASK_ID_LEN
        && !task_id.starts_with('.')
        && task_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if well_formed {
        Ok(())
    } else {
        Err(StoreError::InvalidTaskId(task_id.to_string()))
    }
}

/// How the canon was validated before it was stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationProvenance {
    /// Oracle verdict the canon was admitted with
    pub oracle: OracleResult,
    /// Whether a full pass was required at creation
    pub required_pass: bool,
}

/// Validated reference implementation for one task
///
/// Written once; replaced only through an explicit overwrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonRecord {
    /// Task identifier
    pub task_id: String,
    /// Reference source
    pub source: String,
    /// Blake3 hash of `source`
    pub source_hash: ContentHash,
    /// Property snapshot of `source`
    pub properties: PropertySet,
    /// Extraction mode the snapshot was taken with
    pub mode: ExtractionMode,
    /// Oracle provenance
    pub provenance: ValidationProvenance,
    /// Naming policy recorded with the canon
    #[serde(default)]
    pub naming: Option<NamingPolicy>,
    /// Creation time
    pub created_at: DateTime<Utc>,
}

impl CanonRecord {
    /// Whether `source` is byte-identical to the canon
    #[must_use]
    pub fn matches_source(&self, source: &str) -> bool {
        ContentHash::of_text(source) == self.source_hash
    }

    /// Name of the canon's entry function
    #[must_use]
    pub fn entry_point(&self) -> Option<String> {
        canonize_syntax::parse_module(&self.source)
            .ok()?
            .primary_function()
            .map(|def| def.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_id_rules() {
        for ok in ["HumanEval-0", "mbpp_12", "task.v2"] {
            assert!(validate_task_id(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".hidden", "../escape", "a/b", "with space"] {
            assert!(
                matches!(validate_task_id(bad), Err(StoreError::InvalidTaskId(_))),
                "{bad}"
            );
        }
        assert!(validate_task_id(&"x".repeat(MAX_TASK_ID_LEN + 1)).is_err());
    }
}
