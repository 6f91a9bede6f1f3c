//! Typed property values and the property set
//!
//! Every container is ordered so that serialization, and therefore the set
//! fingerprint, is bit-identical across runs.

use std::collections::{BTreeMap, BTreeSet};

use canonize_syntax::{ContentHash, HashError, StructureHashes};
use serde::{Deserialize, Serialize};

use crate::error::PropertyError;
use crate::kind::PropertyKind;

/// Branch, loop and call signature
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ControlFlow {
    /// `if` statements, each `elif` counted separately
    pub branches: usize,
    /// `for` and `while` loops
    pub loops: usize,
    /// Deepest compound-statement nesting inside a function
    pub max_nesting: usize,
    /// `return` statements
    pub returns: usize,
    /// Conditional expressions
    pub conditional_expressions: usize,
    /// Comprehensions of any flavour
    pub comprehensions: usize,
    /// Callee names in pre-order; methods as `.name`
    pub calls: Vec<String>,
    /// Printed branch and loop conditions (enhanced mode)
    pub branch_conditions: Option<Vec<String>>,
}

/// Data-dependency graph summary
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DataDependency {
    /// Assigned name to the names its definitions read
    pub edges: BTreeMap<String, BTreeSet<String>>,
    /// Longest dependency chain, in edges
    pub max_chain: usize,
    /// Assignments never read before being overwritten or leaving the function
    pub dead_stores: usize,
}

/// Return, raise and fall-through structure
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExecutionPaths {
    /// Structural path count, capped
    pub path_count: usize,
    /// `return` statements
    pub return_points: usize,
    /// `raise` statements
    pub raise_points: usize,
    /// Entry function can fall off its end
    pub implicit_return: bool,
    /// Early-exit `if` statements without `else`
    pub guard_clauses: usize,
    /// `if` statements whose body always exits yet carry an `else`
    pub else_after_return: usize,
    /// Exit kinds with nesting depth (enhanced mode)
    pub path_signatures: Option<Vec<String>>,
}

/// Shape of the entry function's signature
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionContracts {
    /// Top-level functions
    pub functions: usize,
    /// Parameters, separators excluded
    pub arity: usize,
    /// Parameters with defaults
    pub defaults: usize,
    /// Has `*args`
    pub var_args: bool,
    /// Has `**kwargs`
    pub var_kwargs: bool,
    /// Any parameter or return annotation
    pub annotated: bool,
    /// Has a docstring
    pub docstring: bool,
    /// Forms of returned expressions
    pub return_forms: BTreeSet<String>,
}

/// Asymptotic class and supporting counts
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Complexity {
    /// Estimated class, e.g. `O(n)`
    pub class: String,
    /// Deepest loop nesting, comprehension clauses included
    pub loop_depth: usize,
    /// Self-calls of the entry function
    pub recursive_calls: usize,
    /// Redundant `list(...)`/`tuple(...)` in iteration position
    pub materializations: usize,
    /// Cyclomatic complexity
    pub cyclomatic: usize,
}

/// Observable effects
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideEffects {
    /// `print` calls
    pub prints: usize,
    /// File and console I/O calls
    pub io_calls: usize,
    /// In-place container mutation calls
    pub mutating_calls: usize,
    /// Names declared `global` or `nonlocal`
    pub global_writes: usize,
    /// Assignments to attributes
    pub attribute_writes: usize,
    /// Assignments to subscripts
    pub subscript_writes: usize,
    /// `raise` statements
    pub raises: usize,
    /// No effect other than raising
    pub pure: bool,
}

/// Loop and recursion boundedness
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Termination {
    /// `for` loops
    pub bounded_loops: usize,
    /// `while` loops
    pub unbounded_loops: usize,
    /// `while True` loops
    pub while_true_loops: usize,
    /// `break` statements
    pub breaks: usize,
    /// `for i in range(len(xs))` loops
    pub index_iterations: usize,
    /// Entry function calls itself
    pub recursive: bool,
    /// Recursion has a non-recursive exit
    pub base_case_guarded: bool,
    /// No unguarded infinite loop or recursion
    pub always_terminates: bool,
}

/// Operator usage and operand order
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Algebraic {
    /// Operator symbol to occurrence count, augmented assignments included
    pub operators: BTreeMap<String, usize>,
    /// Operand classes of each commutative operation, pre-order
    pub commutative_orders: Vec<String>,
    /// Operations with an identity operand (`x + 0`, `x * 1`, ...)
    pub identity_operations: usize,
}

/// Division, power and casting behavior
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Numerical {
    /// `/`
    pub true_divisions: usize,
    /// `//`
    pub floor_divisions: usize,
    /// `int(a / b)`
    pub truncating_divisions: usize,
    /// `%`
    pub modulos: usize,
    /// `**`
    pub powers: usize,
    /// `x * x`
    pub self_multiplications: usize,
    /// Float literals
    pub float_literals: usize,
    /// `int(...)` calls
    pub int_casts: usize,
    /// `float(...)` calls
    pub float_casts: usize,
    /// `round`, `floor` and `ceil` calls
    pub rounding_calls: usize,
}

/// Boolean and emptiness test forms
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Logical {
    /// `len(x) == 0` and `len(x) != 0` style tests
    pub length_empty_checks: usize,
    /// `not x` on a non-comparison
    pub truthiness_negations: usize,
    /// `x == True` style comparisons
    pub bool_literal_comparisons: usize,
    /// `not (a < b)` style negations
    pub negated_comparisons: usize,
    /// `and` / `or` operators
    pub boolean_operators: usize,
    /// Printed conditions (enhanced mode)
    pub normalized_conditions: Option<Vec<String>>,
}

/// Branching arity of a recursive construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecursionBranching {
    /// Not recursive
    #[default]
    None,
    /// One self-call per step
    Linear,
    /// Two self-calls per step
    Binary,
    /// Three or more
    MultiWay,
}

impl RecursionBranching {
    /// Classify the maximum number of self-calls in one statement
    #[must_use]
    pub const fn from_calls(calls: usize) -> Self {
        match calls {
            0 => Self::None,
            1 => Self::Linear,
            2 => Self::Binary,
            _ => Self::MultiWay,
        }
    }
}

/// Self-reference shape of the entry function
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecursionSchema {
    /// Calls itself
    pub is_recursive: bool,
    /// Branching arity
    pub branching: RecursionBranching,
    /// Returns without a self-call
    pub base_cases: usize,
    /// Self-call sites
    pub recursive_calls: usize,
    /// Splits its input (slicing or halving) across several self-calls
    pub divide_and_conquer: bool,
}

/// A value of one property kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[allow(missing_docs)]
pub enum PropertyValue {
    ControlFlow(ControlFlow),
    DataDependency(DataDependency),
    ExecutionPaths(ExecutionPaths),
    FunctionContracts(FunctionContracts),
    Complexity(Complexity),
    SideEffects(SideEffects),
    Termination(Termination),
    AlgebraicStructure(Algebraic),
    NumericalBehavior(Numerical),
    LogicalEquivalence(Logical),
    NormalizedStructure(StructureHashes),
    OperatorPrecedence(Vec<String>),
    StatementOrdering(Vec<String>),
    RecursionSchema(RecursionSchema),
}

impl PropertyValue {
    /// Kind this value belongs to
    #[must_use]
    pub const fn kind(&self) -> PropertyKind {
        match self {
            Self::ControlFlow(_) => PropertyKind::ControlFlow,
            Self::DataDependency(_) => PropertyKind::DataDependency,
            Self::ExecutionPaths(_) => PropertyKind::ExecutionPaths,
            Self::FunctionContracts(_) => PropertyKind::FunctionContracts,
            Self::Complexity(_) => PropertyKind::Complexity,
            Self::SideEffects(_) => PropertyKind::SideEffects,
            Self::Termination(_) => PropertyKind::Termination,
            Self::AlgebraicStructure(_) => PropertyKind::AlgebraicStructure,
            Self::NumericalBehavior(_) => PropertyKind::NumericalBehavior,
            Self::LogicalEquivalence(_) => PropertyKind::LogicalEquivalence,
            Self::NormalizedStructure(_) => PropertyKind::NormalizedStructure,
            Self::OperatorPrecedence(_) => PropertyKind::OperatorPrecedence,
            Self::StatementOrdering(_) => PropertyKind::StatementOrdering,
            Self::RecursionSchema(_) => PropertyKind::RecursionSchema,
        }
    }

    /// Token sequence of sequence-shaped kinds
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[String]> {
        match self {
            Self::OperatorPrecedence(seq) | Self::StatementOrdering(seq) => Some(seq),
            _ => None,
        }
    }

    /// Record payload as JSON, for key-wise comparison and reporting
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let payload = match self {
            Self::ControlFlow(v) => serde_json::to_value(v),
            Self::DataDependency(v) => serde_json::to_value(v),
            Self::ExecutionPaths(v) => serde_json::to_value(v),
            Self::FunctionContracts(v) => serde_json::to_value(v),
            Self::Complexity(v) => serde_json::to_value(v),
            Self::SideEffects(v) => serde_json::to_value(v),
            Self::Termination(v) => serde_json::to_value(v),
            Self::AlgebraicStructure(v) => serde_json::to_value(v),
            Self::NumericalBehavior(v) => serde_json::to_value(v),
            Self::LogicalEquivalence(v) => serde_json::to_value(v),
            Self::NormalizedStructure(v) => serde_json::to_value(v),
            Self::OperatorPrecedence(v) | Self::StatementOrdering(v) => serde_json::to_value(v),
            Self::RecursionSchema(v) => serde_json::to_value(v),
        };
        payload.unwrap_or(serde_json::Value::Null)
    }
}

/// Property values keyed by kind; a missing kind is null
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<PropertyKind, PropertyValue>",
    into = "BTreeMap<PropertyKind, PropertyValue>"
)]
pub struct PropertySet {
    values: BTreeMap<PropertyKind, PropertyValue>,
}

impl PropertySet {
    /// The null-filled set produced for unparsable source
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self::default()
    }

    /// Store a value under its own kind, returning the previous one
    pub fn insert(&mut self, value: PropertyValue) -> Option<PropertyValue> {
        self.values.insert(value.kind(), value)
    }

    /// Value of `kind`, `None` when null
    #[inline]
    #[must_use]
    pub fn get(&self, kind: PropertyKind) -> Option<&PropertyValue> {
        self.values.get(&kind)
    }

    /// Every slot is null
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.values.is_empty()
    }

    /// Every kind is populated
    #[inline]
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.values.len() == PropertyKind::COUNT
    }

    /// Number of populated kinds
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no kind is populated
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Populated values in kind order
    pub fn iter(&self) -> impl Iterator<Item = (PropertyKind, &PropertyValue)> {
        self.values.iter().map(|(kind, value)| (*kind, value))
    }

    /// Blake3 fingerprint of the canonical serialization
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn fingerprint(&self) -> Result<ContentHash, HashError> {
        ContentHash::compute_serializable(&self.values)
    }
}

impl FromIterator<PropertyValue> for PropertySet {
    fn from_iter<I: IntoIterator<Item = PropertyValue>>(iter: I) -> Self {
        let mut set = Self::default();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl TryFrom<BTreeMap<PropertyKind, PropertyValue>> for PropertySet {
    type Error = PropertyError;

    fn try_from(values: BTreeMap<PropertyKind, PropertyValue>) -> Result<Self, Self::Error> {
        for (expected, value) in &values {
            if value.kind() != *expected {
                return Err(PropertyError::KindMismatch {
                    expected: *expected,
                    actual: value.kind(),
                });
            }
        }
        Ok(Self { values })
    }
}

impl From<PropertySet> for BTreeMap<PropertyKind, PropertyValue> {
    fn from(set: PropertySet) -> Self {
        set.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_are_keyed_by_their_kind() {
        let mut set = PropertySet::null();
        assert!(set.is_null());
        set.insert(PropertyValue::StatementOrdering(vec!["0:def".into()]));
        assert_eq!(set.len(), 1);
        assert!(set.get(PropertyKind::StatementOrdering).is_some());
        assert!(set.get(PropertyKind::ControlFlow).is_none());
    }

    #[test]
    fn deserialization_rejects_mismatched_slot() {
        let json = r#"{"control_flow": {"kind": "statement_ordering", "value": []}}"#;
        let err = serde_json::from_str::<PropertySet>(json).unwrap_err();
        assert!(err.to_string().contains("stored under"));
    }

    #[test]
    fn deserialization_rejects_unknown_kind() {
        let json = r#"{"cache_locality": {"kind": "cache_locality", "value": 1}}"#;
        assert!(serde_json::from_str::<PropertySet>(json).is_err());
    }

    #[test]
    fn serialization_round_trips() {
        let set: PropertySet = [
            PropertyValue::RecursionSchema(RecursionSchema {
                is_recursive: true,
                branching: RecursionBranching::Binary,
                base_cases: 1,
                recursive_calls: 2,
                divide_and_conquer: true,
            }),
            PropertyValue::OperatorPrecedence(vec!["(* _ _)".into()]),
        ]
        .into_iter()
        .collect();
        let json = serde_json::to_string(&set).unwrap();
        let back: PropertySet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, set);
        assert_eq!(back.fingerprint().unwrap(), set.fingerprint().unwrap());
    }

    #[test]
    fn branching_classification() {
        assert_eq!(RecursionBranching::from_calls(0), RecursionBranching::None);
        assert_eq!(RecursionBranching::from_calls(1), RecursionBranching::Linear);
        assert_eq!(RecursionBranching::from_calls(2), RecursionBranching::Binary);
        assert_eq!(RecursionBranching::from_calls(7), RecursionBranching::MultiWay);
    }
}
