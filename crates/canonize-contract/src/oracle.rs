//! Behavioral oracle and compliance checker interfaces
//!
//! Both are black boxes to the engine. Implementations own execution,
//! sandboxing and time-boxing; the engine only passes the timeout through.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::contract::Contract;

/// Verdict of a behavioral validation run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    /// All contract tests passed
    pub passed: bool,
    /// Fraction of contract tests passed, in `[0, 1]`
    pub pass_rate: f64,
    /// Free-form detail from the collaborator
    #[serde(default)]
    pub detail: String,
}

impl OracleResult {
    /// Full pass
    #[must_use]
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            passed: true,
            pass_rate: 1.0,
            detail: detail.into(),
        }
    }

    /// Failure with the given pass rate
    #[must_use]
    pub fn fail(pass_rate: f64, detail: impl Into<String>) -> Self {
        Self {
            passed: false,
            pass_rate: pass_rate.clamp(0.0, 1.0),
            detail: detail.into(),
        }
    }

    /// Whether `self` is worse than the earlier verdict `before`
    #[must_use]
    pub fn regresses_from(&self, before: &OracleResult) -> bool {
        (before.passed && !self.passed) || self.pass_rate < before.pass_rate
    }
}

/// Behavioral equivalence judge
pub trait Oracle: Send + Sync {
    /// Run the contract's tests against `code`, bounded by `timeout`
    fn validate(&self, code: &str, contract: &Contract, timeout: Duration) -> OracleResult;
}

impl<T: Oracle + ?Sized> Oracle for Arc<T> {
    fn validate(&self, code: &str, contract: &Contract, timeout: Duration) -> OracleResult {
        (**self).validate(code, contract, timeout)
    }
}

/// Non-functional constraint verdict
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// Every constraint satisfied
    pub fully_compliant: bool,
    /// Aggregate compliance score, higher is better
    pub score: f64,
    /// Human-readable violations
    #[serde(default)]
    pub violations: Vec<String>,
}

impl ComplianceReport {
    /// Report with no violations
    #[must_use]
    pub fn compliant(score: f64) -> Self {
        Self {
            fully_compliant: true,
            score,
            violations: Vec::new(),
        }
    }
}

/// Non-functional constraint judge
pub trait ComplianceChecker: Send + Sync {
    /// Judge `code` against the contract's constraints
    fn check(&self, code: &str, contract: &Contract) -> ComplianceReport;
}
