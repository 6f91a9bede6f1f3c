//! Pipeline-level invariants over generated candidates

use canonize_core::{TransformOutcome, TransformationPipeline};
use proptest::prelude::*;

fn canon(k: u8) -> String {
    format!("def f(n):\n    return n * {k}\n")
}

/// Equivalent or near-equivalent spellings of `canon(k)`
fn candidate() -> impl Strategy<Value = (u8, String)> {
    (1u8..10, 0usize..6, "[a-z]{1,3}").prop_map(|(k, shape, var)| {
        let var = format!("v_{var}");
        let source = match shape {
            0 => canon(k),
            1 => format!("def f(n):\n    {var} = n*{k}\n    return {var}\n"),
            2 => format!("def f(n):\n    return {k} * n\n"),
            3 => format!("def f(n):\n    \"\"\"Scale.\"\"\"\n    return n * {k}\n"),
            4 => format!("def f(n):\n    if n == 0:\n        return 0\n    return n * {k}\n"),
            _ => format!("def f(n):\n    print(n)\n    {var} = n * {k}\n    return {var}\n"),
        };
        (k, source)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn identity_converges_untouched(k in 1u8..10) {
        let canon = canon(k);
        let result = TransformationPipeline::default().transform(&canon, &canon, None, 5);
        prop_assert_eq!(&result.transformed, &canon);
        prop_assert_eq!(result.iterations_used, 0);
        prop_assert!(result.success);
    }

    #[test]
    fn distance_never_grows((k, source) in candidate()) {
        let result = TransformationPipeline::default().transform(&source, &canon(k), None, 5);
        prop_assert!(result.final_distance <= result.initial_distance);
        prop_assert!(result.outcome != TransformOutcome::Aborted);
    }

    #[test]
    fn converged_results_are_fixed_points((k, source) in candidate()) {
        let pipeline = TransformationPipeline::default();
        let canon = canon(k);
        let first = pipeline.transform(&source, &canon, None, 5);
        prop_assume!(first.success);
        let second = pipeline.transform(&first.transformed, &canon, None, 5);
        prop_assert_eq!(&second.transformed, &first.transformed);
        prop_assert_eq!(second.iterations_used, 0);
        prop_assert!(second.applied_strategy_names.is_empty());
    }

    #[test]
    fn runs_are_deterministic((k, source) in candidate()) {
        let pipeline = TransformationPipeline::default();
        let a = pipeline.transform(&source, &canon(k), None, 5);
        let b = pipeline.transform(&source, &canon(k), None, 5);
        prop_assert_eq!(a, b);
    }
}
