//! End-to-end runs of the pipeline and canonicalizer

use std::time::Duration;

use canonize_contract::{Contract, NamingPolicy, Oracle, OracleResult};
use canonize_core::{
    Canonicalizer, EngineConfig, RejectionReason, TemplateConfig, TransformOutcome,
    TransformRequest, TransformationPipeline,
};
use canonize_store::{CanonSelectionPolicy, CanonStore};
use canonize_test_utils::{
    init_test_tracing, temp_store, BrevityChecker, CountingOracle, ReferenceOracle, StaticOracle,
    ALGORITHM, EMPTY_CHECK, RENAME, RETURN_CHAIN, UNPARSABLE,
};
use mockall::mock;
use pretty_assertions::assert_eq;

mock! {
    Judge {}
    impl Oracle for Judge {
        fn validate(&self, code: &str, contract: &Contract, timeout: Duration) -> OracleResult;
    }
}

fn any_template() -> TemplateConfig {
    TemplateConfig {
        enabled: true,
        min_distance: 0.0,
    }
}

#[test]
fn return_chain_is_consolidated() {
    init_test_tracing();
    let result = TransformationPipeline::default().transform(
        RETURN_CHAIN.candidate,
        RETURN_CHAIN.canon,
        None,
        5,
    );
    assert_eq!(result.transformed, "def f(n):\n    return n * 2\n");
    assert!(result.success);
    assert_eq!(result.iterations_used, 1);
    assert!(result.final_distance.abs() < f64::EPSILON);
}

#[test]
fn empty_check_becomes_truthiness() {
    init_test_tracing();
    let result = TransformationPipeline::default().transform(
        EMPTY_CHECK.candidate,
        EMPTY_CHECK.canon,
        None,
        5,
    );
    assert_eq!(result.transformed, EMPTY_CHECK.canon);
    assert!(result.success);
    assert!(result
        .applied_strategy_names
        .iter()
        .any(|name| name == "empty_check_rewrite"));
}

#[test]
fn literal_that_changes_behavior_is_kept() {
    init_test_tracing();
    let candidate = "def is_admin(user):\n    return user == 'admin'\n";
    let canon = "def is_admin(user):\n    return user == 'root'\n";
    let result = TransformationPipeline::default().transform(candidate, canon, None, 5);
    assert!(!result.success);
    assert_eq!(result.transformed, candidate);
    assert!(result.applied_strategy_names.is_empty());
    assert!(result.rejections.iter().any(|r| {
        r.strategy == "literal_alignment" && matches!(r.reason, RejectionReason::Divergent { .. })
    }));
}

#[test]
fn two_parameter_return_chain_is_consolidated() {
    init_test_tracing();
    let result = TransformationPipeline::default().transform(
        "def add(a, b):\n    r = a + b\n    return r\n",
        "def add(a, b):\n    return a + b\n",
        None,
        5,
    );
    assert!(result.success, "{result:?}");
    assert_eq!(result.transformed, "def add(a, b):\n    return a + b\n");
    assert!(result
        .applied_strategy_names
        .iter()
        .any(|name| name == "inline_return_chain"));
}

#[test]
fn swapped_parameters_are_reordered() {
    init_test_tracing();
    let candidate = "def f(a, b):\n    return b * a\n";
    let canon = "def f(a, b):\n    return a * b\n";
    let result = TransformationPipeline::default().transform(candidate, canon, None, 5);
    assert!(result.success, "{result:?}");
    assert_eq!(result.transformed, canon);
    assert_eq!(result.applied_strategy_names, ["commutative_swap"]);
}

#[test]
fn flexible_policy_allows_the_rename() {
    init_test_tracing();
    let contract = Contract::new("total").with_naming(NamingPolicy::flexible(["items"]));
    let result = TransformationPipeline::default().transform(
        RENAME.candidate,
        RENAME.canon,
        Some(&contract),
        5,
    );
    assert_eq!(result.transformed, RENAME.canon);
    assert!(result.success);
    assert_eq!(result.applied_strategy_names, ["identifier_rename"]);
}

#[test]
fn strict_policy_keeps_the_name() {
    init_test_tracing();
    let contract = Contract::new("total").with_naming(NamingPolicy::strict());
    let result = TransformationPipeline::default().transform(
        RENAME.candidate,
        RENAME.canon,
        Some(&contract),
        5,
    );
    assert_eq!(result.outcome, TransformOutcome::Exhausted);
    assert!(!result.success);
    assert_eq!(result.transformed, RENAME.candidate);
    assert!(result.final_distance > 0.0);
}

#[test]
fn without_a_policy_names_do_not_count() {
    let result =
        TransformationPipeline::default().transform(RENAME.candidate, RENAME.canon, None, 5);
    assert!(result.success);
    assert_eq!(result.iterations_used, 0);
    assert_eq!(result.transformed, RENAME.candidate);
}

#[test]
fn different_algorithm_exhausts_without_the_template() {
    init_test_tracing();
    let result =
        TransformationPipeline::default().transform(ALGORITHM.candidate, ALGORITHM.canon, None, 5);
    assert_eq!(result.outcome, TransformOutcome::Exhausted);
    assert!(result.final_distance <= result.initial_distance);
    assert!(result.final_distance > 0.0);
}

#[test]
fn template_fires_when_both_sides_pass_the_oracle() {
    init_test_tracing();
    let contract = Contract::new("fact").with_entry_point("fact");
    let pipeline = TransformationPipeline::builder()
        .oracle(ReferenceOracle::new(ALGORITHM.canon))
        .template(any_template())
        .build();

    let result = pipeline.transform(ALGORITHM.candidate, ALGORITHM.canon, Some(&contract), 5);
    assert!(result.success, "{result:?}");
    assert_eq!(result.transformed, ALGORITHM.canon);
    assert_eq!(
        result.applied_strategy_names.last().map(String::as_str),
        Some("oracle_guided_template")
    );

    let again = pipeline.transform(&result.transformed, ALGORITHM.canon, Some(&contract), 5);
    assert_eq!(again.transformed, result.transformed);
    assert_eq!(again.iterations_used, 0);
}

#[test]
fn template_needs_validated_sides() {
    let contract = Contract::new("fact");
    let pipeline = TransformationPipeline::builder()
        .oracle(StaticOracle::failing())
        .template(any_template())
        .build();
    let result = pipeline.transform(ALGORITHM.candidate, ALGORITHM.canon, Some(&contract), 5);
    assert_eq!(result.outcome, TransformOutcome::Exhausted);
    assert!(!result
        .applied_strategy_names
        .iter()
        .any(|name| name == "oracle_guided_template"));
}

#[test]
fn attested_template_skips_the_probe() {
    let pipeline = TransformationPipeline::builder()
        .template(any_template())
        .build();
    let request = TransformRequest::new(ALGORITHM.candidate, ALGORITHM.canon).attest_validated();
    let result = pipeline.transform_with(&request);
    assert!(result.success);
    assert_eq!(result.transformed, ALGORITHM.canon);
}

#[test]
fn template_keeps_the_candidate_entry_name() {
    let pipeline = TransformationPipeline::builder()
        .template(any_template())
        .build();
    let candidate = ALGORITHM.candidate.replace("fact", "my_fact");
    let result = pipeline.transform_with(
        &TransformRequest::new(&candidate, ALGORITHM.canon).attest_validated(),
    );
    assert!(result.transformed.starts_with("def my_fact(n):"));
    assert!(result.transformed.contains("n * my_fact(n - 1)"));
}

#[test]
fn unparsable_candidate_aborts_unchanged() {
    init_test_tracing();
    let result = TransformationPipeline::default().transform(
        UNPARSABLE.candidate,
        UNPARSABLE.canon,
        None,
        5,
    );
    assert_eq!(result.outcome, TransformOutcome::Aborted);
    assert!(!result.success);
    assert_eq!(result.transformed, UNPARSABLE.candidate);
    assert!((result.initial_distance - 1.0).abs() < f64::EPSILON);
    assert!((result.final_distance - 1.0).abs() < f64::EPSILON);
    assert_eq!(result.iterations_used, 0);
}

#[test]
fn oracle_regression_rolls_back() {
    init_test_tracing();
    let mut oracle = MockJudge::new();
    // only the original candidate passes
    oracle.expect_validate().returning(|code, _, _| {
        if code == RETURN_CHAIN.candidate {
            OracleResult::pass("all green")
        } else {
            OracleResult::fail(0.5, "half red")
        }
    });
    let contract = Contract::new("double");
    let pipeline = TransformationPipeline::builder().oracle(oracle).build();

    let result = pipeline.transform(RETURN_CHAIN.candidate, RETURN_CHAIN.canon, Some(&contract), 5);
    assert_eq!(result.outcome, TransformOutcome::Exhausted);
    assert_eq!(result.transformed, RETURN_CHAIN.candidate);
    assert!(result
        .rejections
        .iter()
        .any(|r| matches!(r.reason, RejectionReason::OracleRegression { .. })));
}

#[test]
fn oracle_verdicts_are_memoized_per_candidate() {
    let oracle = std::sync::Arc::new(CountingOracle::new(StaticOracle::passing()));
    let contract = Contract::new("double");
    let pipeline = TransformationPipeline::builder()
        .shared_oracle(oracle.clone())
        .build();
    let result = pipeline.transform(RETURN_CHAIN.candidate, RETURN_CHAIN.canon, Some(&contract), 5);
    assert!(result.success);
    // one call for the candidate, then at most one per rewrite that reached the behavior check
    assert!(oracle.calls() >= 2);
    assert!(oracle.calls() <= 1 + result.applied_strategy_names.len() + result.rejections.len());
}

#[test]
fn canonicalizer_round_trip_through_a_file_store() {
    init_test_tracing();
    let (_dir, store) = temp_store();
    let canonicalizer =
        Canonicalizer::from_config(store, &EngineConfig::new().with_max_iterations(4));
    let contract = Contract::new("double").with_entry_point("f");

    let missing = canonicalizer
        .canonicalize("double", RETURN_CHAIN.candidate, None)
        .unwrap_err();
    assert!(missing.is_canon_missing());

    let record = canonicalizer
        .establish_canon(
            "double",
            &[RETURN_CHAIN.candidate, RETURN_CHAIN.canon, "def f(n):\n    return n + 2\n"],
            &contract,
            &ReferenceOracle::new(RETURN_CHAIN.canon),
            &BrevityChecker,
            &CanonSelectionPolicy::default(),
        )
        .unwrap();
    assert_eq!(record.source, RETURN_CHAIN.canon);

    let result = canonicalizer
        .canonicalize("double", RETURN_CHAIN.candidate, Some(&contract))
        .unwrap();
    assert!(result.success);
    assert_eq!(result.transformed, RETURN_CHAIN.canon);

    let comparison = canonicalizer.compare("double", &result.transformed).unwrap();
    assert!(comparison.distance.abs() < f64::EPSILON);
}

#[test]
fn canon_is_refused_when_nothing_passes() {
    let canonicalizer =
        Canonicalizer::new(CanonStore::in_memory(), TransformationPipeline::default());
    let err = canonicalizer
        .establish_canon(
            "double",
            &[RETURN_CHAIN.candidate],
            &Contract::new("double"),
            &StaticOracle::failing(),
            &BrevityChecker,
            &CanonSelectionPolicy::default(),
        )
        .unwrap_err();
    assert!(err.is_refusal());
    assert!(canonicalizer.store().task_ids().unwrap().is_empty());
}
