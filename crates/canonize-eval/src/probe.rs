//! Black-box equivalence probe
//!
//! Runs the entry function of two modules over a small input battery and
//! compares what comes back. Inputs are drawn per parameter from a battery
//! chosen by how the pre-rewrite function uses that parameter. Text and
//! mixed batteries also carry every string literal of either module, so a
//! rewrite that changes a literal is run on the very value it compares
//! against.
//!
//! A probe passes only when every input that ran to completion on both
//! sides agrees (same result type and value, or the same exception class,
//! and the same final state of mutable arguments) and at least one input
//! returned normally on both sides.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::fmt;

use canonize_syntax::visit::{walk_expr, walk_stmt, Visitor};
use canonize_syntax::{
    parse_module, BinOp, CmpOp, Expr, FunctionDef, Module, ParamKind, Stmt, UnaryOp,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EvalError;
use crate::interp::{Budget, Interpreter, Outcome};
use crate::value::Value;

/// Value domain a parameter is probed with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Domain {
    /// Integers
    Numeric,
    /// Strings
    Text,
    /// Lists of integers
    Sequence,
    /// Mixed battery
    Any,
}

const STR_METHODS: &[&str] = &[
    "capitalize", "endswith", "find", "isalnum", "isalpha", "isdigit", "islower", "isspace",
    "isupper", "join", "lower", "lstrip", "replace", "rstrip", "split", "startswith", "strip",
    "title", "upper",
];

const LIST_METHODS: &[&str] = &[
    "append", "clear", "extend", "insert", "pop", "remove", "reverse", "sort",
];

const SEQUENCE_FUNCTIONS: &[&str] = &[
    "all", "any", "enumerate", "len", "list", "max", "min", "reversed", "set", "sorted", "sum",
    "tuple", "zip",
];

#[derive(Default)]
struct Signals {
    text: BTreeSet<String>,
    sequence: BTreeSet<String>,
    numeric: BTreeSet<String>,
    /// `(element, container)` for every `for element in container`
    elements: Vec<(String, String)>,
}

fn literal_domain(expr: &Expr) -> Option<Domain> {
    match expr {
        Expr::Str(lit) if !lit.bytes => Some(Domain::Text),
        Expr::Int(_) | Expr::Float(_) => Some(Domain::Numeric),
        Expr::Unary {
            op: UnaryOp::Neg,
            operand,
        } => literal_domain(operand).filter(|d| *d == Domain::Numeric),
        _ => None,
    }
}

impl Signals {
    fn mark(&mut self, name: &str, domain: Domain) {
        let set = match domain {
            Domain::Text => &mut self.text,
            Domain::Sequence => &mut self.sequence,
            Domain::Numeric => &mut self.numeric,
            Domain::Any => return,
        };
        set.insert(name.to_string());
    }

    fn pair(&mut self, a: &Expr, b: &Expr) {
        if let (Some(name), Some(domain)) = (a.as_name(), literal_domain(b)) {
            self.mark(name, domain);
        }
        if let (Some(name), Some(domain)) = (b.as_name(), literal_domain(a)) {
            self.mark(name, domain);
        }
    }

    fn domain_of(&self, name: &str) -> Domain {
        let iterates_text = self
            .elements
            .iter()
            .any(|(element, container)| container == name && self.text.contains(element));
        if self.text.contains(name) || iterates_text {
            Domain::Text
        } else if self.sequence.contains(name) {
            Domain::Sequence
        } else if self.numeric.contains(name) {
            Domain::Numeric
        } else {
            Domain::Any
        }
    }
}

impl<'ast> Visitor<'ast> for Signals {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::For { target, iter, .. } => {
                if let Some(name) = iter.as_name() {
                    self.mark(name, Domain::Sequence);
                    if let Some(element) = target.as_name() {
                        self.elements.push((element.to_string(), name.to_string()));
                    }
                }
            }
            Stmt::AugAssign { target, value, .. } => self.pair(target, value),
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Call { func, args } => match &**func {
                Expr::Attribute { value, attr } => {
                    if let Some(name) = value.as_name() {
                        if STR_METHODS.contains(&attr.as_str()) {
                            self.mark(name, Domain::Text);
                        } else if LIST_METHODS.contains(&attr.as_str()) {
                            self.mark(name, Domain::Sequence);
                        }
                    }
                }
                Expr::Name(callee) => {
                    let domain = if SEQUENCE_FUNCTIONS.contains(&callee.as_str()) {
                        Some(Domain::Sequence)
                    } else if matches!(callee.as_str(), "range" | "abs") {
                        Some(Domain::Numeric)
                    } else {
                        None
                    };
                    if let Some(domain) = domain {
                        for arg in args {
                            if let Some(name) = arg.value().as_name() {
                                self.mark(name, domain);
                            }
                        }
                    }
                }
                _ => {}
            },
            Expr::BinOp { left, op, right } => {
                self.pair(left, right);
                if matches!(op, BinOp::Sub | BinOp::FloorDiv | BinOp::Div | BinOp::Pow) {
                    for side in [left, right] {
                        if let Some(name) = side.as_name() {
                            self.mark(name, Domain::Numeric);
                        }
                    }
                }
            }
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
            } => {
                if let Some(name) = operand.as_name() {
                    self.mark(name, Domain::Numeric);
                }
            }
            Expr::Compare {
                left,
                ops,
                comparators,
            } => {
                let mut previous: &Expr = left;
                for (op, next) in ops.iter().zip(comparators) {
                    if matches!(op, CmpOp::In | CmpOp::NotIn) {
                        if let Some(name) = next.as_name() {
                            self.mark(name, Domain::Sequence);
                        }
                    } else {
                        self.pair(previous, next);
                    }
                    previous = next;
                }
            }
            Expr::Subscript { value, .. } => {
                if let Some(name) = value.as_name() {
                    self.mark(name, Domain::Sequence);
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Infer a probing domain for each of `params` from how `def` uses them
///
/// Text wins over sequence, sequence over numeric; a parameter with no
/// signal is probed with the mixed battery.
#[must_use]
pub fn infer_domains(def: &FunctionDef, params: &[&str]) -> Vec<Domain> {
    let mut signals = Signals::default();
    for stmt in &def.body {
        signals.visit_stmt(stmt);
    }
    params.iter().map(|name| signals.domain_of(name)).collect()
}

/// Required positional parameters, or `None` when a required parameter
/// can only be passed by keyword
fn positional_params(def: &FunctionDef) -> Option<Vec<&str>> {
    let mut keyword_only = false;
    let mut names = Vec::new();
    for param in &def.params {
        match param.kind {
            ParamKind::KeywordOnlyMarker | ParamKind::VarArgs => keyword_only = true,
            ParamKind::Regular if param.default.is_none() => {
                if keyword_only {
                    return None;
                }
                names.push(param.name.as_str());
            }
            _ => {}
        }
    }
    Some(names)
}

/// Battery entry, materialized fresh for each side
#[derive(Debug, Clone, PartialEq, Eq)]
enum Seed {
    Int(i64),
    Str(Cow<'static, str>),
    Ints(&'static [i64]),
}

impl Seed {
    const fn text(s: &'static str) -> Self {
        Self::Str(Cow::Borrowed(s))
    }

    fn value(&self) -> Value {
        match self {
            Self::Int(i) => Value::Int(*i),
            Self::Str(s) => Value::str(s),
            Self::Ints(items) => Value::list(items.iter().copied().map(Value::Int).collect()),
        }
    }
}

/// Cap on module literals added to a battery
const MAX_LITERAL_SEEDS: usize = 16;

/// Every text string literal in a module
#[derive(Default)]
struct Literals(BTreeSet<String>);

impl<'ast> Visitor<'ast> for Literals {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Str(lit) = expr {
            if !lit.bytes {
                self.0.insert(lit.value.clone());
            }
        }
        walk_expr(self, expr);
    }
}

fn literal_seeds(modules: [&Module; 2]) -> Vec<Seed> {
    let mut literals = Literals::default();
    for stmt in modules.iter().flat_map(|module| &module.body) {
        literals.visit_stmt(stmt);
    }
    literals
        .0
        .into_iter()
        .take(MAX_LITERAL_SEEDS)
        .map(|s| Seed::Str(Cow::Owned(s)))
        .collect()
}

const NUMERIC: &[Seed] = &[
    Seed::Int(0),
    Seed::Int(1),
    Seed::Int(2),
    Seed::Int(3),
    Seed::Int(7),
    Seed::Int(-5),
    Seed::Int(10),
];

const TEXT: &[Seed] = &[
    Seed::text(""),
    Seed::text("a"),
    Seed::text("abc"),
    Seed::text("Hello World"),
    Seed::text("  padded  "),
    Seed::text("racecar"),
    Seed::text("a1b2"),
];

const SEQUENCE: &[Seed] = &[
    Seed::Ints(&[]),
    Seed::Ints(&[1]),
    Seed::Ints(&[3, 1, 2]),
    Seed::Ints(&[5, -2, 5, 0]),
    Seed::Ints(&[1, 2, 3, 4, 5, 6]),
];

/// Cycles through int, text and list, so entries `ANY_CYCLE` apart share a type
const ANY: &[Seed] = &[
    Seed::Int(0),
    Seed::text("abc"),
    Seed::Ints(&[3, 1, 2]),
    Seed::Int(7),
    Seed::text("xy"),
    Seed::Ints(&[5]),
    Seed::Int(-1),
    Seed::text(""),
    Seed::Ints(&[]),
];

const ANY_CYCLE: usize = 3;

/// Index step between consecutive parameters: equal indices, neighbours,
/// then different values of one type in the mixed battery
const STRIDES: [usize; 3] = [0, 1, ANY_CYCLE];

/// Seeds for `domain`; text and mixed batteries also get `literals`
fn battery(domain: Domain, literals: &[Seed]) -> Vec<Seed> {
    let (base, with_literals) = match domain {
        Domain::Numeric => (NUMERIC, false),
        Domain::Text => (TEXT, true),
        Domain::Sequence => (SEQUENCE, false),
        Domain::Any => (ANY, true),
    };
    let mut seeds = base.to_vec();
    if with_literals {
        for literal in literals {
            if !seeds.contains(literal) {
                seeds.push(literal.clone());
            }
        }
    }
    seeds
}

/// Argument tuples, one round per battery entry for each of [`STRIDES`]
///
/// A single parameter only gets the equal-index rounds. Repeated tuples
/// are dropped.
fn input_rounds(batteries: &[Vec<Seed>]) -> Vec<Vec<Seed>> {
    let rounds = batteries.iter().map(Vec::len).max().unwrap_or(1);
    let strides = if batteries.len() > 1 { STRIDES.len() } else { 1 };
    let mut inputs: Vec<Vec<Seed>> = Vec::new();
    for stride in STRIDES.into_iter().take(strides) {
        for round in 0..rounds {
            let seeds: Vec<Seed> = batteries
                .iter()
                .enumerate()
                .map(|(j, battery)| battery[(round + j * stride) % battery.len()].clone())
                .collect();
            if !inputs.contains(&seeds) {
                inputs.push(seeds);
            }
        }
    }
    inputs
}

/// Result of probing two modules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ProbeVerdict {
    /// Every comparable input agreed
    Equivalent {
        /// Inputs that completed on both sides
        probes: usize,
        /// Inputs that returned normally on both sides
        conclusive: usize,
    },
    /// Some input told the two apart
    Divergent {
        /// Rendered arguments
        input: String,
        /// Pre-rewrite behavior
        before: String,
        /// Post-rewrite behavior
        after: String,
    },
    /// Nothing could be concluded
    Inconclusive {
        /// Why
        reason: String,
    },
}

impl ProbeVerdict {
    /// Whether the probe passed
    #[must_use]
    pub const fn is_equivalent(&self) -> bool {
        matches!(self, Self::Equivalent { .. })
    }

    fn inconclusive(reason: impl Into<String>) -> Self {
        Self::Inconclusive {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ProbeVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Equivalent { probes, conclusive } => {
                write!(f, "equivalent on {probes} inputs ({conclusive} returned)")
            }
            Self::Divergent {
                input,
                before,
                after,
            } => write!(f, "diverges on {input}: {before} vs {after}"),
            Self::Inconclusive { reason } => write!(f, "inconclusive: {reason}"),
        }
    }
}

/// One side's behavior on one input
struct Run {
    outcome: Outcome,
    args_after: Vec<Value>,
}

fn render_args(args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(Value::repr).collect();
    format!("({})", rendered.join(", "))
}

/// Differential tester over a fixed input battery
#[derive(Debug, Clone, Copy, Default)]
pub struct EquivalenceProbe {
    budget: Budget,
}

impl EquivalenceProbe {
    /// Create a probe with the given interpreter budget
    #[must_use]
    pub const fn new(budget: Budget) -> Self {
        Self { budget }
    }

    /// Interpreter budget per call
    #[must_use]
    pub const fn budget(&self) -> Budget {
        self.budget
    }

    fn run(&self, module: &Module, name: &str, seeds: &[Seed]) -> Result<Run, EvalError> {
        let mut interpreter = Interpreter::new(self.budget);
        interpreter.load(module)?;
        let args: Vec<Value> = seeds.iter().map(|seed| seed.value()).collect();
        let outcome = interpreter.call(name, args.clone())?;
        Ok(Run {
            outcome,
            args_after: args,
        })
    }

    /// Compare `before` and `after` on the entry function
    ///
    /// The entry is `entry` when given, otherwise the first function `before`
    /// defines. Inputs are chosen from `before`.
    #[must_use]
    pub fn compare(&self, before: &Module, after: &Module, entry: Option<&str>) -> ProbeVerdict {
        let def = entry
            .and_then(|name| before.function(name))
            .or_else(|| before.primary_function());
        let Some(def) = def else {
            return ProbeVerdict::inconclusive("no function to probe");
        };
        if after.function(&def.name).is_none() {
            return ProbeVerdict::Divergent {
                input: "()".to_string(),
                before: format!("defines {}", def.name),
                after: format!("{} missing", def.name),
            };
        }
        let Some(params) = positional_params(def) else {
            return ProbeVerdict::inconclusive("required keyword-only parameter");
        };
        let literals = literal_seeds([before, after]);
        let batteries: Vec<Vec<Seed>> = infer_domains(def, &params)
            .into_iter()
            .map(|domain| battery(domain, &literals))
            .collect();

        let mut probes = 0;
        let mut conclusive = 0;
        for seeds in input_rounds(&batteries) {
            let input = render_args(&seeds.iter().map(Seed::value).collect::<Vec<_>>());
            let (lhs, rhs) = match (
                self.run(before, &def.name, &seeds),
                self.run(after, &def.name, &seeds),
            ) {
                (Ok(lhs), Ok(rhs)) => (lhs, rhs),
                (Err(error), _) | (_, Err(error)) => {
                    debug!(input = %input, error = %error, "probe input inconclusive");
                    continue;
                }
            };
            let agree = match (&lhs.outcome, &rhs.outcome) {
                (Outcome::Returned(a), Outcome::Returned(b)) => a.same_as(b),
                (Outcome::Raised(a), Outcome::Raised(b)) => a.class == b.class,
                _ => false,
            };
            if !agree {
                return ProbeVerdict::Divergent {
                    input,
                    before: lhs.outcome.to_string(),
                    after: rhs.outcome.to_string(),
                };
            }
            let same_args = lhs
                .args_after
                .iter()
                .zip(&rhs.args_after)
                .all(|(a, b)| a.same_as(b));
            if !same_args {
                return ProbeVerdict::Divergent {
                    input,
                    before: format!("arguments left as {}", render_args(&lhs.args_after)),
                    after: format!("arguments left as {}", render_args(&rhs.args_after)),
                };
            }
            probes += 1;
            if matches!(lhs.outcome, Outcome::Returned(_)) {
                conclusive += 1;
            }
        }

        if conclusive == 0 {
            return ProbeVerdict::inconclusive("no input returned normally on both sides");
        }
        ProbeVerdict::Equivalent { probes, conclusive }
    }

    /// Parse both sources and [`compare`](Self::compare) them
    #[must_use]
    pub fn compare_sources(&self, before: &str, after: &str, entry: Option<&str>) -> ProbeVerdict {
        match (parse_module(before), parse_module(after)) {
            (Ok(before), Ok(after)) => self.compare(&before, &after, entry),
            (Err(error), _) | (_, Err(error)) => ProbeVerdict::inconclusive(error.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_syntax::parse_module;
    use pretty_assertions::assert_eq;

    fn domains(source: &str) -> Vec<Domain> {
        let module = parse_module(source).unwrap();
        let def = module.primary_function().unwrap();
        let params: Vec<&str> = def.param_names().collect();
        infer_domains(def, &params)
    }

    #[test]
    fn domains_follow_usage() {
        assert_eq!(domains("def f(s):\n    return s.upper()\n"), vec![Domain::Text]);
        assert_eq!(domains("def f(xs):\n    return len(xs) == 0\n"), vec![Domain::Sequence]);
        assert_eq!(domains("def f(n):\n    return n * 2\n"), vec![Domain::Numeric]);
        assert_eq!(domains("def f(x):\n    return x\n"), vec![Domain::Any]);
        assert_eq!(
            domains("def f(s, i):\n    return s.strip()[i]\n"),
            vec![Domain::Text, Domain::Any]
        );
    }

    #[test]
    fn text_outranks_sequence() {
        assert_eq!(
            domains("def f(s):\n    return len(s) + len(s.split())\n"),
            vec![Domain::Text]
        );
    }

    #[test]
    fn characters_of_a_string_mark_it_as_text() {
        assert_eq!(
            domains("def f(s):\n    out = ''\n    for c in s:\n        out += c.upper()\n    return out\n"),
            vec![Domain::Text]
        );
    }

    #[test]
    fn keyword_only_requirements_are_not_probed() {
        let module = parse_module("def f(*, key):\n    return key\n").unwrap();
        assert_eq!(positional_params(module.primary_function().unwrap()), None);
        let module = parse_module("def f(a, b=1, *, c=2):\n    return a\n").unwrap();
        assert_eq!(positional_params(module.primary_function().unwrap()), Some(vec!["a"]));
    }

    #[test]
    fn text_batteries_carry_module_literals() {
        let before = parse_module("def f(s):\n    return s == 'admin'\n").unwrap();
        let after = parse_module("def f(s):\n    return s == b'x' or s == 'abc'\n").unwrap();
        let literals = literal_seeds([&before, &after]);
        assert_eq!(literals, vec![Seed::text("abc"), Seed::text("admin")]);

        let text = battery(Domain::Text, &literals);
        assert_eq!(text.len(), TEXT.len() + 1);
        assert_eq!(text.last(), Some(&Seed::text("admin")));
        assert_eq!(battery(Domain::Numeric, &literals).len(), NUMERIC.len());
    }

    #[test]
    fn rounds_pair_equal_indices_before_rotating() {
        let numbers = NUMERIC.to_vec();
        let inputs = input_rounds(&[numbers.clone(), numbers.clone()]);
        assert_eq!(inputs[0], vec![Seed::Int(0), Seed::Int(0)]);
        assert_eq!(inputs[1], vec![Seed::Int(1), Seed::Int(1)]);
        assert!(inputs.contains(&vec![Seed::Int(0), Seed::Int(1)]));
        assert_eq!(inputs.len(), STRIDES.len() * numbers.len());

        let mixed = input_rounds(&[ANY.to_vec(), ANY.to_vec()]);
        assert!(mixed.contains(&vec![Seed::text("abc"), Seed::text("xy")]));

        let single = input_rounds(&[numbers.clone()]);
        assert_eq!(single.len(), numbers.len());
        assert_eq!(input_rounds(&[]), vec![Vec::<Seed>::new()]);
    }

    #[test]
    fn verdict_serializes_with_tag() {
        let verdict = ProbeVerdict::Equivalent {
            probes: 3,
            conclusive: 2,
        };
        let json = serde_json::to_value(&verdict).unwrap();
        assert_eq!(json["verdict"], "equivalent");
        assert_eq!(json["conclusive"], 2);
    }
}
