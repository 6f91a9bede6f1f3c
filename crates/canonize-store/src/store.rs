//! Canon store
//!
//! Gatekeeper in front of a [`CanonBackend`]: a canon is only written after
//! it parses, defines a function and, when required, passed the oracle.

use std::sync::Arc;

use canonize_contract::{NamingPolicy, OracleResult};
use canonize_props::{
    DistanceCalculator, ExtractionMode, HashSelection, KindDistance, PropertyExtractor,
    SeverityBand,
};
use canonize_syntax::{parse_module, ContentHash};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::backend::{CanonBackend, InMemoryBackend};
use crate::error::{StoreError, StoreResult};
use crate::record::{validate_task_id, CanonRecord, ValidationProvenance};

/// Distance of a candidate to a stored canon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonComparison {
    /// Task compared against
    pub task_id: String,
    /// Scalar distance in `[0, 1]`
    pub distance: f64,
    /// Severity class of the scalar distance
    pub band: SeverityBand,
    /// Per-kind distances with their bands
    pub per_kind: Vec<KindDistance>,
}

impl CanonComparison {
    /// Kinds that differ at all
    pub fn differing(&self) -> impl Iterator<Item = &KindDistance> {
        self.per_kind.iter().filter(|d| d.band != SeverityBand::None)
    }
}

/// Canon persistence with creation gating
#[derive(Clone)]
pub struct CanonStore {
    backend: Arc<dyn CanonBackend>,
    mode: ExtractionMode,
}

impl std::fmt::Debug for CanonStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CanonStore")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

impl Default for CanonStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CanonStore {
    /// Create a store over `backend`
    pub fn new(backend: impl CanonBackend + 'static) -> Self {
        Self {
            backend: Arc::new(backend),
            mode: ExtractionMode::default(),
        }
    }

    /// Store backed by an [`InMemoryBackend`]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(InMemoryBackend::new())
    }

    /// Builder: extraction mode for new snapshots
    #[must_use]
    pub const fn with_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Extraction mode for new snapshots
    #[must_use]
    pub const fn mode(&self) -> ExtractionMode {
        self.mode
    }

    fn prepare(
        &self,
        task_id: &str,
        code: &str,
        oracle_result: &OracleResult,
        require_pass: bool,
        naming: Option<NamingPolicy>,
    ) -> StoreResult<CanonRecord> {
        validate_task_id(task_id)?;
        if require_pass && !oracle_result.passed {
            warn!(
                task_id,
                pass_rate = oracle_result.pass_rate,
                "canon refused: oracle did not pass"
            );
            return Err(StoreError::refused(
                task_id,
                format!("oracle did not pass (pass rate {:.2})", oracle_result.pass_rate),
            ));
        }
        let module = parse_module(code).map_err(|e| {
            warn!(task_id, error = %e, "canon refused: unparsable");
            StoreError::refused(task_id, format!("canon does not parse: {e}"))
        })?;
        if !module.has_definition() {
            warn!(task_id, "canon refused: no top-level definition");
            return Err(StoreError::refused(task_id, "canon defines no function"));
        }
        let properties = PropertyExtractor::new(self.mode).extract_module(&module);
        Ok(CanonRecord {
            task_id: task_id.to_string(),
            source: code.to_string(),
            source_hash: ContentHash::of_text(code),
            properties,
            mode: self.mode,
            provenance: ValidationProvenance {
                oracle: oracle_result.clone(),
                required_pass: require_pass,
            },
            naming,
            created_at: Utc::now(),
        })
    }

    /// Create the canon for `task_id`
    ///
    /// Nothing is written unless the code parses, defines a function and,
    /// when `require_pass` is set, `oracle_result` is a full pass.
    ///
    /// # Errors
    /// [`StoreError::CanonCreationRefused`] on a failed gate,
    /// [`StoreError::AlreadyExists`] when the task already has a canon
    pub fn create(
        &self,
        task_id: &str,
        code: &str,
        oracle_result: &OracleResult,
        require_pass: bool,
    ) -> StoreResult<CanonRecord> {
        self.create_with_naming(task_id, code, oracle_result, require_pass, None)
    }

    /// [`create`](Self::create), recording a naming policy with the canon
    ///
    /// # Errors
    /// As [`create`](Self::create)
    pub fn create_with_naming(
        &self,
        task_id: &str,
        code: &str,
        oracle_result: &OracleResult,
        require_pass: bool,
        naming: Option<NamingPolicy>,
    ) -> StoreResult<CanonRecord> {
        let record = self.prepare(task_id, code, oracle_result, require_pass, naming)?;
        self.backend.insert_new(record.clone())?;
        info!(task_id, hash = %record.source_hash.short(), "canon created");
        Ok(record)
    }

    /// Replace the canon for `task_id`, subject to the same gates as creation
    ///
    /// # Errors
    /// [`StoreError::CanonCreationRefused`] on a failed gate
    pub fn overwrite(
        &self,
        task_id: &str,
        code: &str,
        oracle_result: &OracleResult,
        require_pass: bool,
        naming: Option<NamingPolicy>,
    ) -> StoreResult<CanonRecord> {
        let record = self.prepare(task_id, code, oracle_result, require_pass, naming)?;
        self.backend.replace(record.clone())?;
        info!(task_id, hash = %record.source_hash.short(), "canon overwritten");
        Ok(record)
    }

    /// Canon for `task_id`, or `None`
    ///
    /// # Errors
    /// Backend failures and malformed task ids
    pub fn load(&self, task_id: &str) -> StoreResult<Option<CanonRecord>> {
        validate_task_id(task_id)?;
        self.backend.get(task_id)
    }

    /// Canon for `task_id`
    ///
    /// # Errors
    /// [`StoreError::CanonMissing`] when none is recorded
    pub fn require(&self, task_id: &str) -> StoreResult<CanonRecord> {
        self.load(task_id)?
            .ok_or_else(|| StoreError::CanonMissing(task_id.to_string()))
    }

    /// Distance from `code` to the canon of `task_id`
    ///
    /// The candidate is extracted in the canon's mode; the structure hash is
    /// compared literally when the canon carries a naming policy.
    ///
    /// # Errors
    /// [`StoreError::CanonMissing`] when none is recorded
    pub fn compare(&self, task_id: &str, code: &str) -> StoreResult<CanonComparison> {
        let record = self.require(task_id)?;
        let candidate = PropertyExtractor::new(record.mode).extract(code);
        let selection = HashSelection::for_policy(record.naming.is_some());
        let calculator = DistanceCalculator::new(selection);
        let distance = calculator.distance(&candidate, &record.properties);
        Ok(CanonComparison {
            task_id: task_id.to_string(),
            distance,
            band: SeverityBand::from_distance(distance),
            per_kind: calculator.per_kind(&candidate, &record.properties),
        })
    }

    /// Delete the canon for `task_id`; `false` when there was none
    ///
    /// # Errors
    /// Backend failures
    pub fn remove(&self, task_id: &str) -> StoreResult<bool> {
        validate_task_id(task_id)?;
        let removed = self.backend.remove(task_id)?;
        if removed {
            info!(task_id, "canon removed");
        }
        Ok(removed)
    }

    /// Every task with a canon, sorted
    ///
    /// # Errors
    /// Backend failures
    pub fn task_ids(&self) -> StoreResult<Vec<String>> {
        self.backend.task_ids()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CANON: &str = "def f(n):\n    return n * 2\n";

    #[test]
    fn create_then_load() {
        let store = CanonStore::in_memory();
        let record = store.create("t1", CANON, &OracleResult::pass("ok"), true).unwrap();
        assert!(record.matches_source(CANON));
        assert!(record.properties.is_complete());
        assert_eq!(store.load("t1").unwrap(), Some(record));
        assert_eq!(store.task_ids().unwrap(), vec!["t1".to_string()]);
    }

    #[test]
    fn failing_oracle_is_refused_without_write() {
        let store = CanonStore::in_memory();
        let err = store
            .create("t1", CANON, &OracleResult::fail(0.5, "2 of 4"), true)
            .unwrap_err();
        assert!(matches!(err, StoreError::CanonCreationRefused { .. }));
        assert_eq!(store.load("t1").unwrap(), None);
    }

    #[test]
    fn failing_oracle_is_accepted_when_not_required() {
        let store = CanonStore::in_memory();
        let record = store
            .create("t1", CANON, &OracleResult::fail(0.5, ""), false)
            .unwrap();
        assert!(!record.provenance.required_pass);
    }

    #[test]
    fn unparsable_or_empty_canon_is_refused() {
        let store = CanonStore::in_memory();
        let pass = OracleResult::pass("");
        assert!(store.create("t1", "def f(:\n", &pass, true).unwrap_err().is_refusal());
        assert!(store.create("t2", "x = 1\n", &pass, true).unwrap_err().is_refusal());
        assert!(store.task_ids().unwrap().is_empty());
    }

    #[test]
    fn second_create_needs_overwrite() {
        let store = CanonStore::in_memory();
        let pass = OracleResult::pass("");
        store.create("t1", CANON, &pass, true).unwrap();
        let err = store
            .create("t1", "def f(n):\n    return n + n\n", &pass, true)
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists(_)));
        assert!(store.require("t1").unwrap().matches_source(CANON));

        let replaced = store
            .overwrite("t1", "def f(n):\n    return n + n\n", &pass, true, None)
            .unwrap();
        assert_eq!(store.require("t1").unwrap(), replaced);
    }

    #[test]
    fn missing_canon_is_an_error_for_compare() {
        let store = CanonStore::in_memory();
        assert!(matches!(store.compare("nope", CANON), Err(StoreError::CanonMissing(_))));
        assert!(matches!(store.require("nope"), Err(StoreError::CanonMissing(_))));
    }

    #[test]
    fn compare_bands_differences() {
        let store = CanonStore::in_memory();
        store.create("t1", CANON, &OracleResult::pass(""), true).unwrap();

        let same = store.compare("t1", CANON).unwrap();
        assert!(same.distance.abs() < f64::EPSILON);
        assert_eq!(same.band, SeverityBand::None);
        assert_eq!(same.differing().count(), 0);

        let chained = store
            .compare("t1", "def f(n):\n    r = n * 2\n    return r\n")
            .unwrap();
        assert!(chained.distance > 0.0);
        assert!(chained.differing().count() > 0);

        let broken = store.compare("t1", "def f(:\n").unwrap();
        assert!((broken.distance - 1.0).abs() < f64::EPSILON);
        assert_eq!(broken.band, SeverityBand::Major);
    }

    #[test]
    fn renamed_candidate_is_distant_only_under_a_policy() {
        let store = CanonStore::in_memory();
        let pass = OracleResult::pass("");
        let renamed = "def f(m):\n    return m * 2\n";
        store.create("loose", CANON, &pass, true).unwrap();
        store
            .create_with_naming("named", CANON, &pass, true, Some(NamingPolicy::permissive()))
            .unwrap();
        assert!(store.compare("loose", renamed).unwrap().distance.abs() < f64::EPSILON);
        assert!(store.compare("named", renamed).unwrap().distance > 0.0);
    }

    #[test]
    fn remove_reports_presence() {
        let store = CanonStore::in_memory();
        store.create("t1", CANON, &OracleResult::pass(""), true).unwrap();
        assert!(store.remove("t1").unwrap());
        assert!(!store.remove("t1").unwrap());
    }

    #[test]
    fn invalid_task_ids_are_rejected_everywhere() {
        let store = CanonStore::in_memory();
        let pass = OracleResult::pass("");
        assert!(matches!(
            store.create("../x", CANON, &pass, true),
            Err(StoreError::InvalidTaskId(_))
        ));
        assert!(matches!(store.load("a/b"), Err(StoreError::InvalidTaskId(_))));
    }
}
