//! Validation gate
//!
//! A rewrite is kept only if every check passes; otherwise the pipeline rolls
//! back to the pre-rewrite candidate. Checks run cheapest first:
//!
//! 1. the rewrite parses
//! 2. a top-level definition remains
//! 3. no identifier becomes unbound that was bound before
//! 4. distance to the canon does not grow
//! 5. behavior is preserved: no oracle regression when an oracle and contract
//!    are available, otherwise an equivalent black-box probe

use std::collections::HashMap;
use std::time::Duration;

use canonize_contract::{Contract, Oracle, OracleResult};
use canonize_eval::{EquivalenceProbe, ProbeVerdict};
use canonize_props::{DistanceCalculator, PropertyExtractor, PropertySet};
use canonize_syntax::{parse_module, unbound_names, ContentHash, Module, ParseError};
use serde::Serialize;
use tracing::debug;

/// Why a rewrite was rolled back
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectionReason {
    /// Rewrite does not parse
    #[error("rewrite does not parse: {message}")]
    Unparsable {
        /// Parser message
        message: String,
    },

    /// No top-level function left
    #[error("no top-level definition remains")]
    NoDefinition,

    /// Names read without a reaching definition that were bound before
    #[error("introduces unbound names: {}", names.join(", "))]
    UnboundNames {
        /// Newly unbound identifiers, sorted
        names: Vec<String>,
    },

    /// Further from the canon than before
    #[error("distance rises from {before:.3} to {after:.3}")]
    DistanceIncreased {
        /// Pre-rewrite distance
        before: f64,
        /// Post-rewrite distance
        after: f64,
    },

    /// Oracle verdict got worse
    #[error("oracle regression: pass rate {before:.2} -> {after:.2}")]
    OracleRegression {
        /// Pre-rewrite pass rate
        before: f64,
        /// Post-rewrite pass rate
        after: f64,
    },

    /// Probe found an input the two sides disagree on
    #[error("{verdict}")]
    Divergent {
        /// Probe verdict
        verdict: ProbeVerdict,
    },

    /// Probe could not establish equivalence
    #[error("{verdict}")]
    Inconclusive {
        /// Probe verdict
        verdict: ProbeVerdict,
    },

    /// Candidate already seen in this run
    #[error("revisits an earlier candidate")]
    Revisited,

    /// Strategy raised an internal error
    #[error("strategy failed: {message}")]
    StrategyFailed {
        /// Error text
        message: String,
    },
}

/// Which tier produced a rewrite
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    /// Hint-guided strategy from the registry
    Strategy,
    /// Oracle-guided template; exempt from the black-box probe
    Template,
}

/// A parsed candidate with its properties and distance to the canon
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Source text
    pub source: String,
    /// Parsed module
    pub module: Module,
    /// Extracted properties
    pub properties: PropertySet,
    /// Scalar distance to the canon
    pub distance: f64,
    /// Content hash of `source`
    pub hash: ContentHash,
}

#[derive(Clone, Copy)]
struct OracleCheck<'a> {
    oracle: &'a dyn Oracle,
    contract: &'a Contract,
    timeout: Duration,
}

/// Accept-or-rollback decision for one run
///
/// Holds the run's oracle verdict memo, so each distinct candidate is sent
/// to the oracle at most once.
pub struct ValidationGate<'a> {
    canon: &'a PropertySet,
    extractor: PropertyExtractor,
    calculator: DistanceCalculator,
    oracle: Option<OracleCheck<'a>>,
    probe: EquivalenceProbe,
    entry_point: Option<&'a str>,
    verdicts: HashMap<ContentHash, OracleResult>,
}

impl std::fmt::Debug for ValidationGate<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationGate")
            .field("extractor", &self.extractor)
            .field("calculator", &self.calculator)
            .field("oracle", &self.oracle.is_some())
            .field("probe", &self.probe)
            .field("entry_point", &self.entry_point)
            .field("verdicts", &self.verdicts.len())
            .finish()
    }
}

impl<'a> ValidationGate<'a> {
    /// Gate measuring distance to `canon` with the given extractor and calculator
    #[must_use]
    pub fn new(
        canon: &'a PropertySet,
        extractor: PropertyExtractor,
        calculator: DistanceCalculator,
    ) -> Self {
        Self {
            canon,
            extractor,
            calculator,
            oracle: None,
            probe: EquivalenceProbe::default(),
            entry_point: None,
            verdicts: HashMap::new(),
        }
    }

    /// Judge behavior with `oracle` against `contract` instead of the probe
    #[must_use]
    pub fn with_oracle(
        mut self,
        oracle: &'a dyn Oracle,
        contract: &'a Contract,
        timeout: Duration,
    ) -> Self {
        self.oracle = Some(OracleCheck {
            oracle,
            contract,
            timeout,
        });
        self
    }

    /// Probe used when no oracle is available
    #[must_use]
    pub const fn with_probe(mut self, probe: EquivalenceProbe) -> Self {
        self.probe = probe;
        self
    }

    /// Function the probe calls
    #[must_use]
    pub const fn with_entry_point(mut self, entry_point: Option<&'a str>) -> Self {
        self.entry_point = entry_point;
        self
    }

    /// Whether behavior is judged by an oracle
    #[must_use]
    pub const fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Parse `source` and measure it against the canon
    ///
    /// # Errors
    /// Returns the parse error when `source` does not parse
    pub fn snapshot(&self, source: &str) -> Result<Snapshot, ParseError> {
        let module = parse_module(source)?;
        Ok(self.measure(source.to_string(), module))
    }

    fn measure(&self, source: String, module: Module) -> Snapshot {
        let properties = self.extractor.extract_module(&module);
        let distance = self.calculator.distance(&properties, self.canon);
        let hash = ContentHash::of_text(&source);
        Snapshot {
            source,
            module,
            properties,
            distance,
            hash,
        }
    }

    fn memoized(&mut self, check: OracleCheck<'a>, snapshot: &Snapshot) -> OracleResult {
        self.verdicts
            .entry(snapshot.hash)
            .or_insert_with(|| {
                check
                    .oracle
                    .validate(&snapshot.source, check.contract, check.timeout)
            })
            .clone()
    }

    /// Oracle verdict for `snapshot`, if an oracle is configured
    pub fn verdict(&mut self, snapshot: &Snapshot) -> Option<OracleResult> {
        let check = self.oracle?;
        Some(self.memoized(check, snapshot))
    }

    /// Whether `snapshot` passes the oracle; `false` without one
    pub fn oracle_passes(&mut self, snapshot: &Snapshot) -> bool {
        self.verdict(snapshot).is_some_and(|v| v.passed)
    }

    /// Validate the rewrite `after` of `before`
    ///
    /// # Errors
    /// Returns the first failed check
    pub fn check(
        &mut self,
        before: &Snapshot,
        after: &str,
        tier: Tier,
    ) -> Result<Snapshot, RejectionReason> {
        let module = parse_module(after).map_err(|e| RejectionReason::Unparsable {
            message: e.to_string(),
        })?;
        if !module.has_definition() {
            return Err(RejectionReason::NoDefinition);
        }

        let bound_before = unbound_names(&before.module);
        let names: Vec<String> = unbound_names(&module)
            .difference(&bound_before)
            .cloned()
            .collect();
        if !names.is_empty() {
            return Err(RejectionReason::UnboundNames { names });
        }

        let snapshot = self.measure(after.to_string(), module);
        if snapshot.distance > before.distance {
            return Err(RejectionReason::DistanceIncreased {
                before: before.distance,
                after: snapshot.distance,
            });
        }

        if let Some(check) = self.oracle {
            let was = self.memoized(check, before);
            let now = self.memoized(check, &snapshot);
            if now.regresses_from(&was) {
                return Err(RejectionReason::OracleRegression {
                    before: was.pass_rate,
                    after: now.pass_rate,
                });
            }
        } else if tier == Tier::Strategy {
            let verdict = self
                .probe
                .compare(&before.module, &snapshot.module, self.entry_point);
            match verdict {
                ProbeVerdict::Equivalent { .. } => {
                    debug!(%verdict, "probe accepted rewrite");
                }
                ProbeVerdict::Divergent { .. } => {
                    return Err(RejectionReason::Divergent { verdict });
                }
                ProbeVerdict::Inconclusive { .. } => {
                    return Err(RejectionReason::Inconclusive { verdict });
                }
            }
        }
        Ok(snapshot)
    }
}
