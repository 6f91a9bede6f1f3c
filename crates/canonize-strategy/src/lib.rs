//! Canonize Strategy
//!
//! Hint-guided syntax-tree rewrites that close explained differences.
//!
//! # Core Concepts
//!
//! - [`TransformationStrategy`]: One rewrite, bound to a property kind and a set of tags
//! - [`StrategyRegistry`]: Name-unique, ordered strategy set; lookup by difference
//! - [`OracleGuidedTemplate`]: Opt-in wholesale canon substitution, outside the registry
//!
//! Strategies only ever edit the candidate's own tree at the sites their
//! hints name. A stale site, or an idiom that no longer holds, yields
//! `Ok(None)` rather than an error.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod error;
mod registry;
pub mod strategies;
mod strategy;
mod template;

pub use error::StrategyError;
pub use registry::StrategyRegistry;
pub use strategy::TransformationStrategy;
pub use template::OracleGuidedTemplate;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use canonize_explain::{ExplainContext, ExplainerRegistry, PropertyDifference, SourceView};
    use canonize_props::{DistanceCalculator, PropertyExtractor};
    use canonize_syntax::parse_module;
    use pretty_assertions::assert_eq;

    fn explain(candidate: &str, canon: &str) -> Vec<PropertyDifference> {
        let extractor = PropertyExtractor::default();
        let (a, b) = (parse_module(candidate).unwrap(), parse_module(canon).unwrap());
        let (sa, sb) = (extractor.extract_module(&a), extractor.extract_module(&b));
        let distances = DistanceCalculator::default().per_kind(&sa, &sb);
        let ctx = ExplainContext::new(SourceView::new(candidate, &a), SourceView::new(canon, &b));
        ExplainerRegistry::with_defaults()
            .explain_all(&sa, &sb, &distances, &ctx)
            .unwrap()
    }

    /// Apply the first rewrite any strategy produces, until none does
    fn drive(candidate: &str, canon: &str) -> String {
        let registry = StrategyRegistry::with_defaults();
        let mut current = candidate.to_string();
        for _ in 0..10 {
            let next = explain(&current, canon).iter().find_map(|difference| {
                registry
                    .applicable(difference)
                    .into_iter()
                    .find_map(|strategy| strategy.generate(difference, &current).ok().flatten())
            });
            match next {
                Some(next) => current = next,
                None => break,
            }
        }
        current
    }

    #[test]
    fn return_chain_reaches_the_canon() {
        let canon = "def f(n):\n    return n * 2\n";
        assert_eq!(drive("def f(n):\n    r = n*2\n    return r\n", canon), canon);
    }

    #[test]
    fn empty_check_reaches_the_canon() {
        let canon = "def is_empty(x):\n    return not x\n";
        assert_eq!(drive("def is_empty(x):\n    return len(x) == 0\n", canon), canon);
    }

    #[test]
    fn accumulator_loop_reaches_the_canon() {
        let canon = "def f(xs):\n    out = [x * 2 for x in xs]\n    return out\n";
        assert_eq!(
            drive(
                "def f(xs):\n    out = []\n    for x in xs:\n        out.append(x * 2)\n    return out\n",
                canon
            ),
            canon
        );
    }

    #[test]
    fn every_default_strategy_rejects_garbage_source() {
        let registry = StrategyRegistry::with_defaults();
        for strategy in registry.iter() {
            let difference = PropertyDifference::new(
                canonize_explain::DifferenceType::DeadStore,
                canonize_explain::TransformationHints::None,
            );
            assert!(strategy.generate(&difference, "def f(:\n").is_err(), "{}", strategy.name());
        }
    }
}
