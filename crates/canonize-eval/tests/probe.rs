//! Probe behavior on rewrites the strategies actually produce

use canonize_eval::{Budget, EquivalenceProbe, ProbeVerdict};
use proptest::prelude::*;

fn verdict(before: &str, after: &str) -> ProbeVerdict {
    EquivalenceProbe::new(Budget::default()).compare_sources(before, after, None)
}

#[test]
fn loop_and_comprehension_agree() {
    let v = verdict(
        "def f(xs):\n    out = []\n    for x in xs:\n        out.append(x * 2)\n    return out\n",
        "def f(xs):\n    out = [x * 2 for x in xs]\n    return out\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

#[test]
fn concatenation_and_join_agree() {
    let v = verdict(
        "def f(s):\n    out = ''\n    for c in s:\n        out += c.upper()\n    return out\n",
        "def f(s):\n    out = ''.join(c.upper() for c in s)\n    return out\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

#[test]
fn conditional_expression_agrees_with_branches() {
    let v = verdict(
        "def sign(n):\n    if n < 0:\n        return -1\n    else:\n        return 1\n",
        "def sign(n):\n    return -1 if n < 0 else 1\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

#[test]
fn index_iteration_agrees_with_direct_iteration() {
    let v = verdict(
        "def total(xs):\n    t = 0\n    for i in range(len(xs)):\n        t += xs[i]\n    return t\n",
        "def total(xs):\n    t = 0\n    for x in xs:\n        t += x\n    return t\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

#[test]
fn truncating_division_differs_on_negative_operands() {
    let v = verdict(
        "def f(n):\n    return int(n / 2)\n",
        "def f(n):\n    return n // 2\n",
    );
    assert!(matches!(v, ProbeVerdict::Divergent { .. }), "{v}");
}

#[test]
fn in_place_mutation_is_observed() {
    let v = verdict(
        "def f(xs):\n    return sorted(xs)\n",
        "def f(xs):\n    xs.sort()\n    return xs\n",
    );
    assert!(matches!(v, ProbeVerdict::Divergent { .. }), "{v}");
}

#[test]
fn dropped_diagnostic_output_is_equivalent() {
    let v = verdict(
        "def f(n):\n    print(n)\n    return n + 1\n",
        "def f(n):\n    return n + 1\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

#[test]
fn nonterminating_rewrite_is_not_equivalent() {
    let v = verdict(
        "def f(n):\n    return n\n",
        "def f(n):\n    while True:\n        pass\n",
    );
    assert!(!v.is_equivalent(), "{v}");
}

#[test]
fn changed_comparison_literal_diverges() {
    let v = verdict(
        "def is_admin(user):\n    return user == 'admin'\n",
        "def is_admin(user):\n    return user == 'root'\n",
    );
    match v {
        ProbeVerdict::Divergent { input, .. } => {
            assert!(input == "('admin')" || input == "('root')", "{input}");
        }
        other => panic!("expected divergence, got {other}"),
    }
}

#[test]
fn two_parameter_return_chain_is_equivalent() {
    let v = verdict(
        "def add(a, b):\n    r = a + b\n    return r\n",
        "def add(a, b):\n    return a + b\n",
    );
    match v {
        ProbeVerdict::Equivalent { conclusive, .. } => assert!(conclusive >= 4),
        other => panic!("expected equivalence, got {other}"),
    }
}

#[test]
fn swapped_concatenation_diverges() {
    let v = verdict(
        "def f(a, b):\n    return a + b\n",
        "def f(a, b):\n    return b + a\n",
    );
    assert!(matches!(v, ProbeVerdict::Divergent { .. }), "{v}");
}

#[test]
fn swapped_product_is_equivalent() {
    let v = verdict(
        "def f(a, b):\n    return b * a\n",
        "def f(a, b):\n    return a * b\n",
    );
    assert!(v.is_equivalent(), "{v}");
}

proptest! {
    #[test]
    fn commuted_products_are_equivalent(k in -20i64..20) {
        let before = format!("def f(n):\n    return n * {k}\n");
        let after = format!("def f(n):\n    return {k} * n\n");
        prop_assert!(verdict(&before, &after).is_equivalent());
    }

    #[test]
    fn different_constants_diverge(a in 0i64..50, b in 0i64..50) {
        prop_assume!(a != b);
        let before = format!("def f(n):\n    return n + {a}\n");
        let after = format!("def f(n):\n    return n + {b}\n");
        let is_divergent = matches!(verdict(&before, &after), ProbeVerdict::Divergent { .. });
        prop_assert!(is_divergent);
    }
}
