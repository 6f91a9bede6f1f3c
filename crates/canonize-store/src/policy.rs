//! Canon selection among several oracle-validated candidates

use std::cmp::Ordering;
use std::time::Duration;

use canonize_contract::{ComplianceChecker, ComplianceReport, Contract, Oracle, OracleResult};
use tracing::debug;

/// Candidate chosen as canon
#[derive(Debug, Clone, PartialEq)]
pub struct CanonChoice {
    /// Position in the submitted list
    pub index: usize,
    /// Chosen source
    pub code: String,
    /// Its oracle verdict
    pub oracle: OracleResult,
    /// Its compliance report
    pub compliance: ComplianceReport,
}

/// Picks the best oracle-passing candidate
///
/// Ranking: fully compliant first, then higher compliance score, then higher
/// pass rate, then earlier submission.
#[derive(Debug, Clone, Copy)]
pub struct CanonSelectionPolicy {
    timeout: Duration,
}

impl Default for CanonSelectionPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
        }
    }
}

fn rank(a: &CanonChoice, b: &CanonChoice) -> Ordering {
    b.compliance
        .fully_compliant
        .cmp(&a.compliance.fully_compliant)
        .then_with(|| b.compliance.score.total_cmp(&a.compliance.score))
        .then_with(|| b.oracle.pass_rate.total_cmp(&a.oracle.pass_rate))
        .then_with(|| a.index.cmp(&b.index))
}

impl CanonSelectionPolicy {
    /// Create a policy passing `timeout` to the oracle
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Oracle timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Best candidate, or `None` when no candidate passes the oracle
    pub fn select<S: AsRef<str>>(
        &self,
        candidates: &[S],
        contract: &Contract,
        oracle: &dyn Oracle,
        checker: &dyn ComplianceChecker,
    ) -> Option<CanonChoice> {
        candidates
            .iter()
            .enumerate()
            .filter_map(|(index, code)| {
                let code = code.as_ref();
                let verdict = oracle.validate(code, contract, self.timeout);
                if !verdict.passed {
                    debug!(index, pass_rate = verdict.pass_rate, "canon candidate failed oracle");
                    return None;
                }
                Some(CanonChoice {
                    index,
                    code: code.to_string(),
                    compliance: checker.check(code, contract),
                    oracle: verdict,
                })
            })
            .min_by(rank)
    }
}
