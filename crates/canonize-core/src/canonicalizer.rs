//! Store-backed entry point
//!
//! Ties a [`CanonStore`] to a [`TransformationPipeline`]: the canon for a
//! task is loaded by id, and the record's naming policy applies when the
//! contract brings none.

use canonize_contract::{ComplianceChecker, Contract, Oracle};
use canonize_store::{CanonComparison, CanonRecord, CanonSelectionPolicy, CanonStore, StoreError};
use tracing::info;

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::pipeline::{TransformRequest, TransformResult, TransformationPipeline};

/// Canonicalizes candidates against the stored canon of their task
#[derive(Debug)]
pub struct Canonicalizer {
    store: CanonStore,
    pipeline: TransformationPipeline,
}

impl Canonicalizer {
    /// Create over `store` and `pipeline`
    #[must_use]
    pub const fn new(store: CanonStore, pipeline: TransformationPipeline) -> Self {
        Self { store, pipeline }
    }

    /// Store snapshots and pipeline both follow `config`
    #[must_use]
    pub fn from_config(store: CanonStore, config: &EngineConfig) -> Self {
        Self::new(
            store.with_mode(config.extraction_mode),
            TransformationPipeline::from_config(config),
        )
    }

    /// Underlying store
    #[must_use]
    pub const fn store(&self) -> &CanonStore {
        &self.store
    }

    /// Underlying pipeline
    #[must_use]
    pub const fn pipeline(&self) -> &TransformationPipeline {
        &self.pipeline
    }

    /// Transform `candidate` toward the canon of `task_id`
    ///
    /// # Errors
    /// [`StoreError::CanonMissing`] when the task has no canon, or a backend
    /// failure while loading it
    pub fn canonicalize(
        &self,
        task_id: &str,
        candidate: &str,
        contract: Option<&Contract>,
    ) -> EngineResult<TransformResult> {
        let record = self.store.require(task_id)?;
        let request = TransformRequest::new(candidate, &record.source)
            .with_contract(contract)
            .with_naming(record.naming.as_ref());
        let result = self.pipeline.transform_with(&request);
        info!(
            task_id,
            outcome = %result.outcome,
            distance = result.final_distance,
            "canonicalized"
        );
        Ok(result)
    }

    /// Distance from `candidate` to the canon of `task_id`, without rewriting
    ///
    /// # Errors
    /// As [`CanonStore::compare`]
    pub fn compare(&self, task_id: &str, candidate: &str) -> EngineResult<CanonComparison> {
        Ok(self.store.compare(task_id, candidate)?)
    }

    /// Pick the best oracle-passing candidate and store it as the canon
    ///
    /// The contract's naming policy is recorded with the canon.
    ///
    /// # Errors
    /// [`StoreError::CanonCreationRefused`] when no candidate passes or the
    /// chosen one fails a store gate, [`StoreError::AlreadyExists`] when the
    /// task already has a canon
    pub fn establish_canon<S: AsRef<str>>(
        &self,
        task_id: &str,
        candidates: &[S],
        contract: &Contract,
        oracle: &dyn Oracle,
        checker: &dyn ComplianceChecker,
        policy: &CanonSelectionPolicy,
    ) -> EngineResult<CanonRecord> {
        let choice = policy
            .select(candidates, contract, oracle, checker)
            .ok_or_else(|| {
                StoreError::refused(
                    task_id,
                    format!("none of {} candidates passed the oracle", candidates.len()),
                )
            })?;
        info!(task_id, index = choice.index, score = choice.compliance.score, "canon selected");
        Ok(self.store.create_with_naming(
            task_id,
            &choice.code,
            &choice.oracle,
            true,
            contract.naming.clone(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_contract::{NamingPolicy, OracleResult};

    const CANON: &str = "def total(items):\n    return sum(items)\n";

    #[test]
    fn missing_canon_is_reported() {
        let canonicalizer =
            Canonicalizer::new(CanonStore::in_memory(), TransformationPipeline::default());
        let err = canonicalizer.canonicalize("t", CANON, None).unwrap_err();
        assert!(err.is_canon_missing());
    }

    #[test]
    fn stored_canon_is_used() {
        let store = CanonStore::in_memory();
        store
            .create("t", CANON, &OracleResult::pass("ok"), true)
            .unwrap();
        let canonicalizer = Canonicalizer::new(store, TransformationPipeline::default());
        let result = canonicalizer
            .canonicalize("t", "def total(items):\n    s = sum(items)\n    return s\n", None)
            .unwrap();
        assert!(result.success);
        assert_eq!(result.transformed, CANON);
    }

    #[test]
    fn record_naming_applies_without_a_contract() {
        let store = CanonStore::in_memory();
        store
            .create_with_naming(
                "t",
                CANON,
                &OracleResult::pass("ok"),
                true,
                Some(NamingPolicy::strict()),
            )
            .unwrap();
        let canonicalizer = Canonicalizer::new(store, TransformationPipeline::default());
        let candidate = "def total(arr):\n    return sum(arr)\n";
        let result = canonicalizer.canonicalize("t", candidate, None).unwrap();
        assert!(!result.success);
        assert_eq!(result.transformed, candidate);
    }
}
