//! Canonize Eval
//!
//! Fuel-bounded interpreter for the modelled Python subset, and the
//! black-box probe that compares a function before and after a rewrite.
//!
//! # Core Concepts
//!
//! - [`Interpreter`]: Tree-walking evaluator over the owned syntax tree, bounded by a [`Budget`]
//! - [`Value`]: Python values with shared, mutable containers
//! - [`Outcome`]: A call either returns a value or raises an [`Exception`]
//! - [`EquivalenceProbe`]: Runs both sides over a per-parameter input battery
//! - [`ProbeVerdict`]: Equivalent, divergent on some input, or inconclusive
//!
//! Running out of fuel, exceeding the call depth, or reaching a construct
//! outside the subset is an [`EvalError`], never a Python-level outcome, so
//! a probe cannot mistake an interpreter limit for program behavior.

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod builtins;
mod error;
mod interp;
mod ops;
mod probe;
mod value;

pub use error::{EvalError, Exception};
pub use interp::{Budget, Interpreter, Outcome};
pub use probe::{infer_domains, Domain, EquivalenceProbe, ProbeVerdict};
pub use value::{Closure, Value};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use canonize_syntax::parse_module;

    fn probe(before: &str, after: &str) -> ProbeVerdict {
        EquivalenceProbe::default().compare_sources(before, after, None)
    }

    #[test]
    fn inlined_return_is_equivalent() {
        let verdict = probe(
            "def f(n):\n    r = n * 2\n    return r\n",
            "def f(n):\n    return n * 2\n",
        );
        assert!(verdict.is_equivalent(), "{verdict}");
    }

    #[test]
    fn empty_check_forms_agree_on_sequences() {
        let verdict = probe(
            "def is_empty(x):\n    return len(x) == 0\n",
            "def is_empty(x):\n    return not x\n",
        );
        assert!(verdict.is_equivalent(), "{verdict}");
    }

    #[test]
    fn changed_arithmetic_diverges() {
        let verdict = probe(
            "def f(n):\n    return n * 2\n",
            "def f(n):\n    return n + 2\n",
        );
        assert!(matches!(verdict, ProbeVerdict::Divergent { .. }), "{verdict}");
    }

    #[test]
    fn int_and_float_results_are_not_the_same() {
        let verdict = probe(
            "def half(n):\n    return n // 2\n",
            "def half(n):\n    return n / 2\n",
        );
        assert!(matches!(verdict, ProbeVerdict::Divergent { .. }), "{verdict}");
    }

    #[test]
    fn matching_exceptions_alone_are_inconclusive() {
        let verdict = probe(
            "def f(x):\n    raise ValueError(x)\n",
            "def f(x):\n    raise ValueError('other')\n",
        );
        assert!(matches!(verdict, ProbeVerdict::Inconclusive { .. }), "{verdict}");
    }

    #[test]
    fn unsupported_constructs_are_inconclusive() {
        let verdict = probe(
            "import re\ndef f(s):\n    return re.sub('a', 'b', s)\n",
            "import re\ndef f(s):\n    return re.sub('[a]', 'b', s)\n",
        );
        assert!(matches!(verdict, ProbeVerdict::Inconclusive { .. }), "{verdict}");
    }

    #[test]
    fn removed_entry_point_diverges() {
        let verdict = probe("def f(n):\n    return n\n", "def g(n):\n    return n\n");
        assert!(matches!(verdict, ProbeVerdict::Divergent { .. }), "{verdict}");
    }

    #[test]
    fn interpreter_is_reusable_across_calls() {
        let module = parse_module("def double(n):\n    return n * 2\n").unwrap();
        let mut interpreter = Interpreter::new(Budget::default().with_fuel(500));
        interpreter.load(&module).unwrap();
        for n in 0..5 {
            let outcome = interpreter.call("double", vec![Value::Int(n)]).unwrap();
            assert!(matches!(outcome, Outcome::Returned(Value::Int(v)) if v == n * 2));
        }
        assert!(interpreter.remaining_fuel() < 500);
    }
}
