//! Canonize Store
//!
//! One validated reference implementation per task, gated on an oracle
//! pass and stored atomically.
//!
//! # Core Concepts
//!
//! - [`CanonRecord`]: Source, content hash, property snapshot and provenance of a canon
//! - [`CanonBackend`]: At-most-one-record-per-task storage
//! - [`InMemoryBackend`] / [`FileBackend`]: `dashmap` entry and rename-into-place persistence
//! - [`CanonStore`]: Creation gates, lookup and candidate comparison
//! - [`CanonSelectionPolicy`]: Choose a canon among oracle-passing candidates

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod backend;
mod error;
mod policy;
mod record;
mod store;

pub use backend::{CanonBackend, FileBackend, InMemoryBackend};
pub use error::{StoreError, StoreResult};
pub use policy::{CanonChoice, CanonSelectionPolicy};
pub use record::{validate_task_id, CanonRecord, ValidationProvenance, MAX_TASK_ID_LEN};
pub use store::{CanonComparison, CanonStore};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use canonize_contract::OracleResult;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn oracle_failures_never_create_a_canon(rate in 0.0f64..1.0, k in 0i64..100) {
            let store = CanonStore::in_memory();
            let code = format!("def f(n):\n    return n + {k}\n");
            let result = store.create("t", &code, &OracleResult::fail(rate, ""), true);
            let refused = matches!(result, Err(StoreError::CanonCreationRefused { .. }));
            prop_assert!(refused);
            prop_assert!(store.load("t").unwrap().is_none());
        }

        #[test]
        fn canon_is_at_distance_zero_from_itself(k in 0i64..100, branch in any::<bool>()) {
            let store = CanonStore::in_memory();
            let code = if branch {
                format!("def f(n):\n    if n > {k}:\n        return n\n    return {k}\n")
            } else {
                format!("def f(n):\n    return n * {k}\n")
            };
            store.create("t", &code, &OracleResult::pass(""), true).unwrap();
            prop_assert!(store.compare("t", &code).unwrap().distance.abs() < f64::EPSILON);
        }
    }
}
