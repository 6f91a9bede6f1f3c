//! Transformation pipeline
//!
//! Drives a candidate toward a canon one validated rewrite at a time:
//!
//! ```text
//! Idle -> ExtractingProperties -> ExplainingDifferences -> SelectingStrategies
//!      -> ApplyingStrategy -> Validating -> { Converged | Exhausted | Aborted }
//! ```
//!
//! Every iteration explains the remaining differences, most severe first,
//! and tries the applicable strategies for each. The first rewrite that
//! passes the [`ValidationGate`] is kept and the differences are explained
//! afresh before moving on to the next one. An iteration that keeps nothing
//! may fall back to the oracle-guided template; if that keeps nothing
//! either, the run is exhausted.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use canonize_contract::{Contract, NamingPolicy, Oracle};
use canonize_eval::{Budget, EquivalenceProbe};
use canonize_explain::{
    ExplainContext, ExplainError, ExplainerRegistry, PropertyDifference, SourceView,
};
use canonize_props::{
    DistanceCalculator, ExtractionMode, HashSelection, PropertyExtractor, PropertyKind,
    PropertySet,
};
use canonize_strategy::{OracleGuidedTemplate, StrategyRegistry};
use canonize_syntax::ContentHash;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{EngineConfig, TemplateConfig, DEFAULT_MAX_ITERATIONS};
use crate::gate::{RejectionReason, Snapshot, Tier, ValidationGate};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    /// Not started
    Idle,
    /// Extracting candidate and canon properties
    ExtractingProperties,
    /// Running explainers over nonzero distances
    ExplainingDifferences,
    /// Looking up strategies for one difference
    SelectingStrategies,
    /// Generating a rewrite
    ApplyingStrategy,
    /// Running the validation gate
    Validating,
    /// Distance reached zero
    Converged,
    /// No further rewrite could be kept
    Exhausted,
    /// Input unusable; candidate returned unchanged
    Aborted,
}

impl PipelineState {
    /// Whether the run has ended
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted | Self::Aborted)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformOutcome {
    /// Candidate matches the canon
    Converged,
    /// Stopped with distance remaining
    Exhausted,
    /// Candidate or canon unusable; nothing was changed
    Aborted,
}

impl From<TransformOutcome> for PipelineState {
    fn from(outcome: TransformOutcome) -> Self {
        match outcome {
            TransformOutcome::Converged => Self::Converged,
            TransformOutcome::Exhausted => Self::Exhausted,
            TransformOutcome::Aborted => Self::Aborted,
        }
    }
}

impl fmt::Display for TransformOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Converged => "converged",
            Self::Exhausted => "exhausted",
            Self::Aborted => "aborted",
        })
    }
}

/// A rewrite that was rolled back
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    /// Strategy that proposed it
    pub strategy: String,
    /// Iteration it was proposed in, from 1
    pub iteration: usize,
    /// Failed check
    pub reason: RejectionReason,
}

/// Result of one `transform` call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransformResult {
    /// Final candidate text; the input itself unless a rewrite was kept
    pub transformed: String,
    /// Whether the run converged
    pub success: bool,
    /// Iterations that kept at least one rewrite
    pub iterations_used: usize,
    /// Strategies whose rewrites were kept, in order
    pub applied_strategy_names: Vec<String>,
    /// How the run ended
    pub outcome: TransformOutcome,
    /// Distance before the first rewrite
    pub initial_distance: f64,
    /// Distance of `transformed`
    pub final_distance: f64,
    /// Rolled-back rewrites
    pub rejections: Vec<Rejection>,
}

impl TransformResult {
    fn aborted(candidate: &str, distance: f64, rejections: Vec<Rejection>) -> Self {
        Self {
            transformed: candidate.to_string(),
            success: false,
            iterations_used: 0,
            applied_strategy_names: Vec::new(),
            outcome: TransformOutcome::Aborted,
            initial_distance: distance,
            final_distance: distance,
            rejections,
        }
    }
}

/// Inputs of one run
#[derive(Debug, Clone, Copy)]
pub struct TransformRequest<'a> {
    /// Text to transform
    pub candidate: &'a str,
    /// Reference implementation
    pub canon: &'a str,
    /// Contract, enabling oracle validation and naming precedence
    pub contract: Option<&'a Contract>,
    /// Naming policy used when the contract carries none
    pub naming: Option<&'a NamingPolicy>,
    /// Iteration budget; the pipeline's when `None`
    pub max_iterations: Option<usize>,
    /// Caller vouches that both sides passed the oracle
    pub attested: bool,
}

impl<'a> TransformRequest<'a> {
    /// Request with no contract and the pipeline's budget
    #[must_use]
    pub const fn new(candidate: &'a str, canon: &'a str) -> Self {
        Self {
            candidate,
            canon,
            contract: None,
            naming: None,
            max_iterations: None,
            attested: false,
        }
    }

    /// With contract
    #[must_use]
    pub const fn with_contract(mut self, contract: Option<&'a Contract>) -> Self {
        self.contract = contract;
        self
    }

    /// With fallback naming policy
    #[must_use]
    pub const fn with_naming(mut self, naming: Option<&'a NamingPolicy>) -> Self {
        self.naming = naming;
        self
    }

    /// With iteration budget
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    /// Vouch that candidate and canon were validated independently
    #[must_use]
    pub const fn attest_validated(mut self) -> Self {
        self.attested = true;
        self
    }
}

/// Builder for [`TransformationPipeline`]
#[must_use]
pub struct PipelineBuilder {
    oracle: Option<Arc<dyn Oracle>>,
    naming: Option<NamingPolicy>,
    mode: ExtractionMode,
    explainers: Option<ExplainerRegistry>,
    strategies: Option<StrategyRegistry>,
    template: TemplateConfig,
    probe: Budget,
    oracle_timeout: Duration,
    visited_guard: bool,
    max_iterations: usize,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self {
            oracle: None,
            naming: None,
            mode: config.extraction_mode,
            explainers: None,
            strategies: None,
            template: config.template,
            probe: config.probe,
            oracle_timeout: config.oracle_timeout(),
            visited_guard: config.visited_guard,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl PipelineBuilder {
    /// Take every setting except the oracle from `config`
    pub fn config(mut self, config: &EngineConfig) -> Self {
        self.naming.clone_from(&config.naming);
        self.mode = config.extraction_mode;
        self.template = config.template;
        self.probe = config.probe;
        self.oracle_timeout = config.oracle_timeout();
        self.visited_guard = config.visited_guard;
        self.max_iterations = config.max_iterations;
        self
    }

    /// Behavioral oracle
    pub fn oracle(self, oracle: impl Oracle + 'static) -> Self {
        self.shared_oracle(Arc::new(oracle))
    }

    /// Behavioral oracle shared with other owners
    pub fn shared_oracle(mut self, oracle: Arc<dyn Oracle>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    /// Naming policy used when a contract carries none
    pub fn naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Property extraction mode
    pub const fn extraction_mode(mut self, mode: ExtractionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Explainers; the default set otherwise
    pub fn explainers(mut self, explainers: ExplainerRegistry) -> Self {
        self.explainers = Some(explainers);
        self
    }

    /// Strategies; the default set otherwise
    pub fn strategies(mut self, strategies: StrategyRegistry) -> Self {
        self.strategies = Some(strategies);
        self
    }

    /// Oracle-guided template tier
    pub const fn template(mut self, template: TemplateConfig) -> Self {
        self.template = template;
        self
    }

    /// Probe limits
    pub const fn probe(mut self, probe: Budget) -> Self {
        self.probe = probe;
        self
    }

    /// Timeout handed to the oracle
    pub const fn oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout = timeout;
        self
    }

    /// Reject rewrites that revisit an earlier candidate
    pub const fn visited_guard(mut self, enabled: bool) -> Self {
        self.visited_guard = enabled;
        self
    }

    /// Default iteration budget
    pub const fn max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Finish
    #[must_use]
    pub fn build(self) -> TransformationPipeline {
        TransformationPipeline {
            oracle: self.oracle,
            naming: self.naming,
            mode: self.mode,
            explainers: self
                .explainers
                .unwrap_or_else(ExplainerRegistry::with_defaults),
            strategies: self
                .strategies
                .unwrap_or_else(StrategyRegistry::with_defaults),
            template: self.template,
            probe: self.probe,
            oracle_timeout: self.oracle_timeout,
            visited_guard: self.visited_guard,
            max_iterations: self.max_iterations,
        }
    }
}

/// Extract, explain, rewrite, validate, repeat
///
/// Holds no per-run state; each call to [`transform`](Self::transform) is
/// independent.
pub struct TransformationPipeline {
    oracle: Option<Arc<dyn Oracle>>,
    naming: Option<NamingPolicy>,
    mode: ExtractionMode,
    explainers: ExplainerRegistry,
    strategies: StrategyRegistry,
    template: TemplateConfig,
    probe: Budget,
    oracle_timeout: Duration,
    visited_guard: bool,
    max_iterations: usize,
}

impl fmt::Debug for TransformationPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformationPipeline")
            .field("oracle", &self.oracle.is_some())
            .field("naming", &self.naming)
            .field("mode", &self.mode)
            .field("explainers", &self.explainers)
            .field("strategies", &self.strategies)
            .field("template", &self.template)
            .field("probe", &self.probe)
            .field("visited_guard", &self.visited_guard)
            .field("max_iterations", &self.max_iterations)
            .finish_non_exhaustive()
    }
}

impl Default for TransformationPipeline {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Mutable state of one run
struct Run {
    state: PipelineState,
    iteration: usize,
    current: Snapshot,
    iterations_used: usize,
    applied: Vec<String>,
    visited: HashSet<ContentHash>,
    rejections: Vec<Rejection>,
}

impl Run {
    fn new(initial: Snapshot) -> Self {
        let mut visited = HashSet::new();
        visited.insert(initial.hash);
        Self {
            state: PipelineState::Idle,
            iteration: 0,
            current: initial,
            iterations_used: 0,
            applied: Vec::new(),
            visited,
            rejections: Vec::new(),
        }
    }

    fn enter(&mut self, next: PipelineState) {
        if self.state != next {
            debug!(from = ?self.state, to = ?next, iteration = self.iteration, "pipeline state");
            self.state = next;
        }
    }

    fn reject(&mut self, strategy: &str, reason: RejectionReason) {
        debug!(strategy, %reason, "rewrite rolled back");
        self.rejections.push(Rejection {
            strategy: strategy.to_string(),
            iteration: self.iteration,
            reason,
        });
    }

    /// Keep `rewritten` if it is new and passes the gate
    fn admit(
        &mut self,
        gate: &mut ValidationGate<'_>,
        strategy: &str,
        rewritten: &str,
        tier: Tier,
        guard: bool,
    ) -> bool {
        self.enter(PipelineState::Validating);
        let hash = ContentHash::of_text(rewritten);
        if guard && self.visited.contains(&hash) {
            self.reject(strategy, RejectionReason::Revisited);
            return false;
        }
        match gate.check(&self.current, rewritten, tier) {
            Ok(next) => {
                debug!(
                    strategy,
                    before = self.current.distance,
                    after = next.distance,
                    "rewrite kept"
                );
                self.visited.insert(hash);
                self.current = next;
                self.applied.push(strategy.to_string());
                true
            }
            Err(reason) => {
                self.reject(strategy, reason);
                false
            }
        }
    }
}

/// Settings resolved for one run
struct RunContext<'a> {
    canon: &'a Snapshot,
    calculator: DistanceCalculator,
    naming: Option<&'a NamingPolicy>,
    entry_point: Option<&'a str>,
}

impl TransformationPipeline {
    /// Start configuring a pipeline
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Pipeline configured from `config`, without an oracle
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::builder().config(config).build()
    }

    /// Whether an oracle is attached
    #[must_use]
    pub fn has_oracle(&self) -> bool {
        self.oracle.is_some()
    }

    /// Default iteration budget
    #[must_use]
    pub const fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    /// Strategy registry in use
    #[must_use]
    pub const fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    /// Transform `candidate` toward `canon` in at most `max_iterations` iterations
    #[must_use]
    pub fn transform(
        &self,
        candidate: &str,
        canon: &str,
        contract: Option<&Contract>,
        max_iterations: usize,
    ) -> TransformResult {
        self.transform_with(
            &TransformRequest::new(candidate, canon)
                .with_contract(contract)
                .with_max_iterations(max_iterations),
        )
    }

    /// Run one request
    ///
    /// Never fails: an unparsable candidate or canon, or an explainer fault,
    /// ends the run as [`TransformOutcome::Aborted`] with the candidate
    /// returned unchanged.
    #[must_use]
    pub fn transform_with(&self, request: &TransformRequest<'_>) -> TransformResult {
        let naming = request
            .contract
            .and_then(|contract| contract.naming.as_ref())
            .or(request.naming)
            .or(self.naming.as_ref());
        let entry_point = request
            .contract
            .and_then(|contract| contract.entry_point.as_deref());
        let budget = request.max_iterations.unwrap_or(self.max_iterations);
        let extractor = PropertyExtractor::new(self.mode);
        let calculator = DistanceCalculator::new(HashSelection::for_policy(naming.is_some()));
        info!(
            budget,
            contract = request.contract.map(|c| c.id.as_str()),
            naming = naming.is_some(),
            "transform started"
        );

        let canon_set = extractor.extract(request.canon);
        if !canon_set.is_complete() {
            warn!("canon does not parse; aborting");
            return TransformResult::aborted(request.candidate, 1.0, Vec::new());
        }
        let mut gate = ValidationGate::new(&canon_set, extractor, calculator)
            .with_probe(EquivalenceProbe::new(self.probe))
            .with_entry_point(entry_point);
        if let (Some(oracle), Some(contract)) = (self.oracle.as_deref(), request.contract) {
            gate = gate.with_oracle(oracle, contract, self.oracle_timeout);
        }

        let null_distance = calculator.distance(&PropertySet::null(), &canon_set);
        let snapshots = (gate.snapshot(request.canon), gate.snapshot(request.candidate));
        let (canon, initial) = match snapshots {
            (Ok(canon), Ok(initial)) => (canon, initial),
            (_, Err(error)) | (Err(error), _) => {
                info!(%error, "candidate does not parse; aborting");
                return TransformResult::aborted(request.candidate, null_distance, Vec::new());
            }
        };
        let ctx = RunContext {
            canon: &canon,
            calculator,
            naming,
            entry_point,
        };

        let initial_distance = initial.distance;
        let mut run = Run::new(initial);
        let outcome = self.drive(&mut run, &mut gate, &ctx, request, budget);
        run.enter(outcome.into());

        if outcome == TransformOutcome::Aborted {
            return TransformResult::aborted(request.candidate, initial_distance, run.rejections);
        }
        info!(
            %outcome,
            iterations = run.iterations_used,
            initial_distance,
            final_distance = run.current.distance,
            applied = run.applied.len(),
            rejected = run.rejections.len(),
            "transform finished"
        );
        TransformResult {
            transformed: run.current.source,
            success: outcome == TransformOutcome::Converged,
            iterations_used: run.iterations_used,
            applied_strategy_names: run.applied,
            outcome,
            initial_distance,
            final_distance: run.current.distance,
            rejections: run.rejections,
        }
    }

    fn drive(
        &self,
        run: &mut Run,
        gate: &mut ValidationGate<'_>,
        ctx: &RunContext<'_>,
        request: &TransformRequest<'_>,
        budget: usize,
    ) -> TransformOutcome {
        loop {
            if run.current.distance <= 0.0 {
                return TransformOutcome::Converged;
            }
            if run.iteration >= budget {
                return TransformOutcome::Exhausted;
            }
            run.iteration += 1;
            run.enter(PipelineState::ExtractingProperties);

            let mut kept = match self.iterate(run, gate, ctx) {
                Ok(kept) => kept,
                Err(error) => {
                    warn!(%error, "explanation failed; aborting");
                    return TransformOutcome::Aborted;
                }
            };
            if !kept && run.current.distance > 0.0 {
                kept = self.try_template(run, gate, ctx, request);
            }
            if !kept {
                return TransformOutcome::Exhausted;
            }
            run.iterations_used += 1;
        }
    }

    fn explain(
        &self,
        current: &Snapshot,
        ctx: &RunContext<'_>,
    ) -> Result<Vec<PropertyDifference>, ExplainError> {
        let distances = ctx
            .calculator
            .per_kind(&current.properties, &ctx.canon.properties);
        let view = ExplainContext::new(
            SourceView::new(&current.source, &current.module),
            SourceView::new(&ctx.canon.source, &ctx.canon.module),
        )
        .with_naming(ctx.naming)
        .with_entry_point(ctx.entry_point);
        self.explainers
            .explain_all(&current.properties, &ctx.canon.properties, &distances, &view)
    }

    /// One iteration over the explained differences; `true` if anything was kept
    fn iterate(
        &self,
        run: &mut Run,
        gate: &mut ValidationGate<'_>,
        ctx: &RunContext<'_>,
    ) -> Result<bool, ExplainError> {
        let mut attempted: BTreeSet<(PropertyKind, &'static str)> = BTreeSet::new();
        let mut kept = false;
        loop {
            run.enter(PipelineState::ExplainingDifferences);
            let differences = self.explain(&run.current, ctx)?;
            let Some(difference) = differences
                .into_iter()
                .find(|d| !attempted.contains(&(d.kind, d.difference_type.tag())))
            else {
                return Ok(kept);
            };
            attempted.insert((difference.kind, difference.difference_type.tag()));

            run.enter(PipelineState::SelectingStrategies);
            let strategies = self.strategies.applicable(&difference);
            debug!(
                kind = %difference.kind,
                difference = difference.difference_type.tag(),
                severity = difference.severity,
                strategies = strategies.len(),
                "difference explained"
            );
            for strategy in strategies {
                run.enter(PipelineState::ApplyingStrategy);
                let rewritten = match strategy.generate(&difference, &run.current.source) {
                    Ok(Some(rewritten)) => rewritten,
                    Ok(None) => continue,
                    Err(error) => {
                        warn!(strategy = strategy.name(), %error, "strategy failed");
                        run.reject(
                            strategy.name(),
                            RejectionReason::StrategyFailed {
                                message: error.to_string(),
                            },
                        );
                        continue;
                    }
                };
                let guard = self.visited_guard;
                if run.admit(gate, strategy.name(), &rewritten, Tier::Strategy, guard) {
                    kept = true;
                    break;
                }
            }
        }
    }

    /// Fall back to the canon's structure when both sides are validated
    fn try_template(
        &self,
        run: &mut Run,
        gate: &mut ValidationGate<'_>,
        ctx: &RunContext<'_>,
        request: &TransformRequest<'_>,
    ) -> bool {
        if !self.template.enabled || run.current.distance < self.template.min_distance {
            return false;
        }
        let validated = request.attested
            || (gate.oracle_passes(&run.current) && gate.oracle_passes(ctx.canon));
        if !validated {
            debug!("template tier skipped: sides not validated");
            return false;
        }

        let template = OracleGuidedTemplate;
        run.enter(PipelineState::ApplyingStrategy);
        match template.generate(&run.current.source, &ctx.canon.source, ctx.entry_point) {
            Ok(Some(rewritten)) => run.admit(
                gate,
                template.name(),
                &rewritten,
                Tier::Template,
                self.visited_guard,
            ),
            Ok(None) => false,
            Err(error) => {
                warn!(strategy = template.name(), %error, "template failed");
                run.reject(
                    template.name(),
                    RejectionReason::StrategyFailed {
                        message: error.to_string(),
                    },
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_explain::{DifferenceExplainer, DifferenceType};
    use canonize_props::PropertyValue;
    use canonize_strategy::strategies::InlineReturnChain;
    use canonize_strategy::{StrategyError, TransformationStrategy};
    use pretty_assertions::assert_eq;

    const CANON: &str = "def f(n):\n    return n * 2\n";
    const CHAIN: &str = "def f(n):\n    r = n*2\n    return r\n";

    /// Claims return chains, then replies with `reply`
    struct Scripted {
        name: &'static str,
        reply: fn(&str) -> Result<Option<String>, StrategyError>,
    }

    impl fmt::Debug for Scripted {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("Scripted")
                .field("name", &self.name)
                .finish_non_exhaustive()
        }
    }

    impl TransformationStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        fn kind(&self) -> PropertyKind {
            PropertyKind::StatementOrdering
        }

        fn handles(&self, difference_type: DifferenceType) -> bool {
            difference_type == DifferenceType::ConsecutiveStatementsConsolidatable
        }

        fn generate(
            &self,
            _difference: &PropertyDifference,
            source: &str,
        ) -> Result<Option<String>, StrategyError> {
            (self.reply)(source)
        }
    }

    fn ahead_of_inline(strategy: Scripted) -> StrategyRegistry {
        let mut registry = StrategyRegistry::new();
        registry.register(Box::new(strategy));
        registry.register(Box::new(InlineReturnChain));
        registry
    }

    struct Failing(PropertyKind);

    impl DifferenceExplainer for Failing {
        fn kind(&self) -> PropertyKind {
            self.0
        }

        fn name(&self) -> &'static str {
            "failing"
        }

        fn explain(
            &self,
            _candidate: &PropertyValue,
            _canon: &PropertyValue,
            _ctx: &ExplainContext<'_>,
        ) -> Result<Option<PropertyDifference>, ExplainError> {
            Err(ExplainError::kind_mismatch(self.0, PropertyKind::StatementOrdering))
        }
    }

    #[test]
    fn identity_converges_without_iterations() {
        let result = TransformationPipeline::default().transform(CANON, CANON, None, 5);
        assert_eq!(result.transformed, CANON);
        assert_eq!(result.outcome, TransformOutcome::Converged);
        assert!(result.success);
        assert_eq!(result.iterations_used, 0);
        assert!(result.applied_strategy_names.is_empty());
    }

    #[test]
    fn return_chain_collapses_in_one_iteration() {
        let result = TransformationPipeline::default().transform(
            "def f(n):\n    r = n*2\n    return r\n",
            CANON,
            None,
            5,
        );
        assert_eq!(result.transformed, CANON);
        assert!(result.success);
        assert_eq!(result.iterations_used, 1);
        assert!(result
            .applied_strategy_names
            .iter()
            .any(|name| name == "inline_return_chain"));
        assert!(result.final_distance.abs() < f64::EPSILON);
        assert!(result.initial_distance > 0.0);
    }

    #[test]
    fn zero_budget_exhausts_immediately() {
        let candidate = "def f(n):\n    r = n*2\n    return r\n";
        let result = TransformationPipeline::default().transform(candidate, CANON, None, 0);
        assert_eq!(result.outcome, TransformOutcome::Exhausted);
        assert_eq!(result.transformed, candidate);
    }

    #[test]
    fn unparsable_canon_aborts() {
        let result = TransformationPipeline::default().transform(CANON, "def f(:\n", None, 5);
        assert_eq!(result.outcome, TransformOutcome::Aborted);
        assert_eq!(result.transformed, CANON);
        assert!((result.final_distance - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn request_budget_overrides_the_pipeline_default() {
        let pipeline = TransformationPipeline::builder().max_iterations(0).build();
        let candidate = "def f(n):\n    r = n*2\n    return r\n";
        assert_eq!(
            pipeline
                .transform_with(&TransformRequest::new(candidate, CANON))
                .outcome,
            TransformOutcome::Exhausted
        );
        assert!(
            pipeline
                .transform_with(&TransformRequest::new(candidate, CANON).with_max_iterations(3))
                .success
        );
    }

    #[test]
    fn failing_strategy_is_recorded_and_the_run_continues() {
        let pipeline = TransformationPipeline::builder()
            .strategies(ahead_of_inline(Scripted {
                name: "broken",
                reply: |_| Err(StrategyError::missing_function("g")),
            }))
            .build();
        let result = pipeline.transform(CHAIN, CANON, None, 5);
        assert!(result.success, "{result:?}");
        assert_eq!(result.applied_strategy_names, ["inline_return_chain"]);
        let rejection = &result.rejections[0];
        assert_eq!(rejection.strategy, "broken");
        assert!(matches!(
            &rejection.reason,
            RejectionReason::StrategyFailed { message } if message.contains("'g'")
        ));
    }

    #[test]
    fn failing_explainer_aborts_with_the_candidate() {
        let mut explainers = ExplainerRegistry::with_defaults();
        for kind in PropertyKind::ALL {
            explainers.register(Box::new(Failing(kind)));
        }
        let pipeline = TransformationPipeline::builder()
            .explainers(explainers)
            .build();
        let result = pipeline.transform(CHAIN, CANON, None, 5);
        assert_eq!(result.outcome, TransformOutcome::Aborted);
        assert!(!result.success);
        assert_eq!(result.transformed, CHAIN);
        assert!(result.applied_strategy_names.is_empty());
    }

    #[test]
    fn rewrites_back_to_a_seen_source_are_rejected() {
        let pipeline = TransformationPipeline::builder()
            .strategies(ahead_of_inline(Scripted {
                name: "echo",
                reply: |source| Ok(Some(source.to_string())),
            }))
            .visited_guard(true)
            .build();
        let result = pipeline.transform(CHAIN, CANON, None, 5);
        assert!(result.success);
        assert_eq!(result.transformed, CANON);
        assert!(result
            .rejections
            .iter()
            .any(|r| r.strategy == "echo" && r.reason == RejectionReason::Revisited));
    }

    #[test]
    fn terminal_states() {
        assert!(PipelineState::from(TransformOutcome::Aborted).is_terminal());
        assert!(!PipelineState::Validating.is_terminal());
        assert_eq!(TransformOutcome::Exhausted.to_string(), "exhausted");
    }
}
