//! Canonize Explain
//!
//! Turns nonzero per-property distances into typed, actionable differences.
//!
//! # Core Concepts
//!
//! - [`DifferenceType`]: Closed vocabulary of recognized idioms, each with a default severity
//! - [`TransformationHints`]: Where in the candidate the idiom sits and which way to rewrite it
//! - [`PropertyDifference`]: One explained mismatch
//! - [`DifferenceExplainer`]: One explainer per property kind
//! - [`ExplainerRegistry`]: Dispatch by kind; severity-ordered results
//!
//! Explainers only name what they recognize. Differences without a matching
//! idiom stay unexplained and are left to the oracle-guided tier, if any.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod context;
mod difference;
mod error;
mod explainer;
pub mod explainers;

pub use context::{ExplainContext, SourceView};
pub use difference::{
    DifferenceType, EmptyCheckDirection, PropertyDifference, RenamePair, TransformationHints,
};
pub use error::ExplainError;
pub use explainer::{DifferenceExplainer, ExplainerRegistry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use canonize_props::{DistanceCalculator, PropertyExtractor};
    use canonize_syntax::parse_module;

    fn explain_pair(candidate: &str, canon: &str) -> Vec<PropertyDifference> {
        let extractor = PropertyExtractor::default();
        let (a, b) = (parse_module(candidate).unwrap(), parse_module(canon).unwrap());
        let (sa, sb) = (extractor.extract_module(&a), extractor.extract_module(&b));
        let distances = DistanceCalculator::default().per_kind(&sa, &sb);
        let ctx = ExplainContext::new(SourceView::new(candidate, &a), SourceView::new(canon, &b));
        ExplainerRegistry::with_defaults()
            .explain_all(&sa, &sb, &distances, &ctx)
            .unwrap()
    }

    #[test]
    fn consolidatable_return_is_explained() {
        let differences = explain_pair(
            "def f(n):\n    r = n * 2\n    return r\n",
            "def f(n):\n    return n * 2\n",
        );
        assert!(differences
            .iter()
            .any(|d| d.difference_type == DifferenceType::ConsecutiveStatementsConsolidatable));
    }

    #[test]
    fn results_are_severity_ordered() {
        let differences = explain_pair(
            "def f(xs):\n    \"\"\"Doubles.\"\"\"\n    print(xs)\n    out = []\n    for x in xs:\n        out.append(x * 2)\n    return out\n",
            "def f(xs):\n    return [x * 2 for x in xs]\n",
        );
        assert!(differences.len() >= 2);
        assert!(differences
            .windows(2)
            .all(|w| w[0].severity >= w[1].severity));
    }

    #[test]
    fn identical_sources_explain_nothing() {
        let source = "def f(x):\n    return x + 1\n";
        assert!(explain_pair(source, source).is_empty());
    }

    #[test]
    fn differences_serialize_with_tagged_hints() {
        let differences = explain_pair(
            "def f(x):\n    return len(x) == 0\n",
            "def f(x):\n    return not x\n",
        );
        let empty = differences
            .iter()
            .find(|d| d.difference_type == DifferenceType::EmptyCheckForm)
            .unwrap();
        let json = serde_json::to_value(empty).unwrap();
        assert_eq!(json["difference_type"], "empty-check-form");
        assert_eq!(json["hints"]["hint"], "empty_check");
    }
}
