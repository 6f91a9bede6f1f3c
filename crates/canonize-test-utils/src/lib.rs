//! Testing utilities for the canonize workspace
//!
//! Shared fixtures, stub collaborators, and test logging.

#![allow(missing_docs)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Once;
use std::time::Duration;

use canonize_contract::{ComplianceChecker, ComplianceReport, Contract, Oracle, OracleResult};
use canonize_eval::EquivalenceProbe;
use canonize_store::{CanonStore, FileBackend};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy)]
pub struct Scenario {
    pub name: &'static str,
    pub candidate: &'static str,
    pub canon: &'static str,
}

pub const RETURN_CHAIN: Scenario = Scenario {
    name: "return_chain",
    candidate: "def f(n):\n    r = n*2\n    return r\n",
    canon: "def f(n):\n    return n * 2\n",
};

pub const EMPTY_CHECK: Scenario = Scenario {
    name: "empty_check",
    candidate: "def is_empty(x):\n    return len(x) == 0\n",
    canon: "def is_empty(x):\n    return not x\n",
};

pub const RENAME: Scenario = Scenario {
    name: "rename",
    candidate: "def total(items):\n    s = 0\n    for x in items:\n        s += x\n    return s\n",
    canon: "def total(arr):\n    s = 0\n    for x in arr:\n        s += x\n    return s\n",
};

/// Same contract, different algorithm
pub const ALGORITHM: Scenario = Scenario {
    name: "algorithm",
    candidate: "def fact(n):\n    r = 1\n    while n > 1:\n        r *= n\n        n -= 1\n    return r\n",
    canon: "def fact(n):\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\n",
};

pub const UNPARSABLE: Scenario = Scenario {
    name: "unparsable",
    candidate: "def f(n:\n    return n\n",
    canon: "def f(n):\n    return n\n",
};

pub const SCENARIOS: [Scenario; 5] = [RETURN_CHAIN, EMPTY_CHECK, RENAME, ALGORITHM, UNPARSABLE];

/// Install a test-writer subscriber once per process; honours `RUST_LOG`
pub fn init_test_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Oracle with a fixed verdict
#[derive(Debug, Clone)]
pub struct StaticOracle(pub OracleResult);

impl StaticOracle {
    pub fn passing() -> Self {
        Self(OracleResult::pass("static"))
    }

    pub fn failing() -> Self {
        Self(OracleResult::fail(0.0, "static"))
    }
}

impl Oracle for StaticOracle {
    fn validate(&self, _code: &str, _contract: &Contract, _timeout: Duration) -> OracleResult {
        self.0.clone()
    }
}

/// Oracle that judges code against a reference implementation with the probe
///
/// Passes exactly when the probe finds the code equivalent to the reference.
#[derive(Debug, Clone)]
pub struct ReferenceOracle {
    reference: String,
    probe: EquivalenceProbe,
}

impl ReferenceOracle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
            probe: EquivalenceProbe::default(),
        }
    }
}

impl Oracle for ReferenceOracle {
    fn validate(&self, code: &str, contract: &Contract, _timeout: Duration) -> OracleResult {
        let verdict =
            self.probe
                .compare_sources(&self.reference, code, contract.entry_point.as_deref());
        if verdict.is_equivalent() {
            OracleResult::pass(verdict.to_string())
        } else {
            OracleResult::fail(0.0, verdict.to_string())
        }
    }
}

/// Wraps an oracle and counts calls
#[derive(Debug, Default)]
pub struct CountingOracle<O> {
    inner: O,
    calls: AtomicUsize,
}

impl<O> CountingOracle<O> {
    pub fn new(inner: O) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl<O: Oracle> Oracle for CountingOracle<O> {
    fn validate(&self, code: &str, contract: &Contract, timeout: Duration) -> OracleResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.validate(code, contract, timeout)
    }
}

/// Compliance checker that scores by source length, shorter being better
#[derive(Debug, Clone, Copy, Default)]
pub struct BrevityChecker;

impl ComplianceChecker for BrevityChecker {
    fn check(&self, code: &str, _contract: &Contract) -> ComplianceReport {
        let lines = code.lines().filter(|l| !l.trim().is_empty()).count().max(1);
        #[allow(clippy::cast_precision_loss)]
        let score = 1.0 / lines as f64;
        ComplianceReport::compliant(score)
    }
}

/// File-backed store in a fresh temporary directory; keep the guard alive
pub fn temp_store() -> (TempDir, CanonStore) {
    let dir = tempfile::tempdir().unwrap();
    let store = CanonStore::new(FileBackend::open(dir.path()).unwrap());
    (dir, store)
}
