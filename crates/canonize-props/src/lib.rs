//! Canonize Props
//!
//! Fixed-vocabulary property extraction and set-to-set distance.
//!
//! # Core Concepts
//!
//! - [`PropertyKind`]: The closed set of fourteen facets
//! - [`PropertyValue`]: One typed value per kind
//! - [`PropertySet`]: Values keyed by kind; unparsable source gives the null set
//! - [`PropertyExtractor`]: Pure, deterministic source-to-set extraction
//! - [`DistanceCalculator`]: Mean per-kind distance in `[0, 1]`
//! - [`idioms`]: Structural detectors shared with the explainers and strategies
//!
//! # Example
//!
//! ```rust,ignore
//! use canonize_props::{DistanceCalculator, PropertyExtractor};
//!
//! let extractor = PropertyExtractor::default();
//! let a = extractor.extract("def f(n):\n    r = n * 2\n    return r\n");
//! let b = extractor.extract("def f(n):\n    return n * 2\n");
//! let d = DistanceCalculator::default().distance(&a, &b);
//! assert!(d > 0.0);
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

pub mod idioms;

mod distance;
mod error;
mod extract;
mod kind;
mod value;

pub use distance::{DistanceCalculator, HashSelection, KindDistance, SeverityBand};
pub use error::PropertyError;
pub use extract::{ExtractionMode, PropertyExtractor};
pub use kind::{PropertyKind, ValueShape};
pub use value::{
    Algebraic, Complexity, ControlFlow, DataDependency, ExecutionPaths, FunctionContracts,
    Logical, Numerical, PropertySet, PropertyValue, RecursionBranching, RecursionSchema,
    SideEffects, Termination,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use proptest::prelude::*;

    fn fragment() -> impl Strategy<Value = String> {
        let op = prop_oneof![Just("+"), Just("-"), Just("*"), Just("//")];
        (op, 0i64..100, any::<bool>(), any::<bool>()).prop_map(|(op, k, branch, temp)| {
            let mut source = String::from("def f(n, xs):\n");
            if branch {
                source.push_str(&format!("    if n > {k}:\n        return n {op} {k}\n"));
            }
            if temp {
                source.push_str(&format!("    r = n {op} {k}\n    return r\n"));
            } else {
                source.push_str(&format!("    return [x {op} {k} for x in xs]\n"));
            }
            source
        })
    }

    proptest! {
        /// Every well-formed set is at distance zero from itself
        #[test]
        fn distance_to_self_is_zero(source in fragment()) {
            let set = PropertyExtractor::default().extract(&source);
            prop_assert!(set.is_complete());
            prop_assert_eq!(DistanceCalculator::default().distance(&set, &set), 0.0);
            let literal = DistanceCalculator::new(HashSelection::Literal);
            prop_assert_eq!(literal.distance(&set, &set), 0.0);
        }

        /// Re-extraction is bit-identical
        #[test]
        fn extraction_is_deterministic(source in fragment()) {
            let extractor = PropertyExtractor::default();
            prop_assert_eq!(
                extractor.extract(&source).fingerprint().unwrap(),
                extractor.extract(&source).fingerprint().unwrap()
            );
        }

        /// Distance is symmetric and bounded
        #[test]
        fn distance_is_symmetric(a in fragment(), b in fragment()) {
            let extractor = PropertyExtractor::default();
            let (a, b) = (extractor.extract(&a), extractor.extract(&b));
            let calc = DistanceCalculator::default();
            let d = calc.distance(&a, &b);
            prop_assert!((0.0..=1.0).contains(&d));
            prop_assert!((d - calc.distance(&b, &a)).abs() < 1e-12);
        }
    }
}
