//! Canonize Core
//!
//! The transformation pipeline: extract properties, explain differences,
//! apply hint-guided rewrites and keep only those the validation gate
//! accepts, until the candidate matches its canon or nothing more can be
//! kept.
//!
//! # Core Concepts
//!
//! - [`TransformationPipeline`]: Iterative transform-validate-rollback loop, built with [`PipelineBuilder`]
//! - [`ValidationGate`]: Parse, binding, definition, monotonicity and behavior checks
//! - [`TransformResult`]: Final text, outcome, distances, kept strategies and rejections
//! - [`Canonicalizer`]: Loads the canon of a task from a [`canonize_store::CanonStore`] and runs the pipeline
//! - [`EngineConfig`]: TOML-loadable settings
//!
//! # Guarantees
//!
//! - Termination: bounded by the iteration budget, the monotonic distance
//!   check and the revisit guard
//! - Non-regression: a kept rewrite never moves away from the canon and never
//!   changes observed behavior
//! - Idempotence: transforming a converged result again is a no-op

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod canonicalizer;
mod config;
mod error;
mod gate;
mod pipeline;
pub mod telemetry;

pub use canonicalizer::Canonicalizer;
pub use config::{EngineConfig, LogFormat, TemplateConfig, DEFAULT_MAX_ITERATIONS};
pub use error::{ConfigError, EngineError, EngineResult};
pub use gate::{RejectionReason, Snapshot, Tier, ValidationGate};
pub use pipeline::{
    PipelineBuilder, PipelineState, Rejection, TransformOutcome, TransformRequest,
    TransformResult, TransformationPipeline,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use canonize_contract::{Contract, NamingPolicy};
    use pretty_assertions::assert_eq;

    #[test]
    fn config_drives_the_pipeline() {
        let config = EngineConfig::from_toml_str("max_iterations = 1\n").unwrap();
        let pipeline = TransformationPipeline::from_config(&config);
        assert_eq!(pipeline.max_iterations(), 1);
        assert!(!pipeline.has_oracle());
    }

    #[test]
    fn contract_naming_beats_pipeline_naming() {
        let canon = "def f(arr):\n    return len(arr)\n";
        let candidate = "def f(items):\n    return len(items)\n";
        let pipeline = TransformationPipeline::builder()
            .naming(NamingPolicy::strict())
            .build();

        let strict = pipeline.transform(candidate, canon, None, 5);
        assert_eq!(strict.outcome, TransformOutcome::Exhausted);
        assert_eq!(strict.transformed, candidate);

        let contract = Contract::new("len").with_naming(NamingPolicy::permissive());
        let renamed = pipeline.transform(candidate, canon, Some(&contract), 5);
        assert!(renamed.success, "{renamed:?}");
        assert_eq!(renamed.transformed, canon);
    }

    #[test]
    fn result_serializes() {
        let source = "def f(x):\n    return x\n";
        let result = TransformationPipeline::default().transform(source, source, None, 1);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["outcome"], "converged");
        assert_eq!(json["iterations_used"], 0);
    }
}
