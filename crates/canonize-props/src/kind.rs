//! The closed vocabulary of property kinds

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PropertyError;

/// One orthogonal facet of a function's structure or behavior
///
/// The set is fixed at build time. Declaration order is the tie-break order
/// used when the pipeline ranks differences of equal severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    /// Branch, loop and call signature
    ControlFlow,
    /// Assigned name to names read
    DataDependency,
    /// Return, raise and fall-through structure
    ExecutionPaths,
    /// Shape of the entry function's signature
    FunctionContracts,
    /// Asymptotic class and related counts
    Complexity,
    /// Observable effects
    SideEffects,
    /// Loop and recursion boundedness
    Termination,
    /// Operator usage and operand order
    AlgebraicStructure,
    /// Division, power and casting behavior
    NumericalBehavior,
    /// Boolean and emptiness test forms
    LogicalEquivalence,
    /// Literal and name-invariant structure hashes
    NormalizedStructure,
    /// Operator skeletons of statement expressions
    OperatorPrecedence,
    /// Pre-order statement kinds with depth
    StatementOrdering,
    /// Self-reference shape
    RecursionSchema,
}

/// Comparison family of a property kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueShape {
    /// Nested record compared key by key
    Record,
    /// Token sequence compared by longest common subsequence
    Sequence,
    /// Hash pair compared by exact equality
    HashPair,
    /// Recursion schema with its own rule
    Recursion,
}

impl PropertyKind {
    /// Number of kinds
    pub const COUNT: usize = 14;

    /// Every kind in declaration order
    pub const ALL: [PropertyKind; Self::COUNT] = [
        PropertyKind::ControlFlow,
        PropertyKind::DataDependency,
        PropertyKind::ExecutionPaths,
        PropertyKind::FunctionContracts,
        PropertyKind::Complexity,
        PropertyKind::SideEffects,
        PropertyKind::Termination,
        PropertyKind::AlgebraicStructure,
        PropertyKind::NumericalBehavior,
        PropertyKind::LogicalEquivalence,
        PropertyKind::NormalizedStructure,
        PropertyKind::OperatorPrecedence,
        PropertyKind::StatementOrdering,
        PropertyKind::RecursionSchema,
    ];

    /// Stable snake-case name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ControlFlow => "control_flow",
            Self::DataDependency => "data_dependency",
            Self::ExecutionPaths => "execution_paths",
            Self::FunctionContracts => "function_contracts",
            Self::Complexity => "complexity",
            Self::SideEffects => "side_effects",
            Self::Termination => "termination",
            Self::AlgebraicStructure => "algebraic_structure",
            Self::NumericalBehavior => "numerical_behavior",
            Self::LogicalEquivalence => "logical_equivalence",
            Self::NormalizedStructure => "normalized_structure",
            Self::OperatorPrecedence => "operator_precedence",
            Self::StatementOrdering => "statement_ordering",
            Self::RecursionSchema => "recursion_schema",
        }
    }

    /// How values of this kind are compared
    #[must_use]
    pub const fn shape(self) -> ValueShape {
        match self {
            Self::NormalizedStructure => ValueShape::HashPair,
            Self::OperatorPrecedence | Self::StatementOrdering => ValueShape::Sequence,
            Self::RecursionSchema => ValueShape::Recursion,
            _ => ValueShape::Record,
        }
    }
}

impl fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PropertyKind {
    type Err = PropertyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| PropertyError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip() {
        for kind in PropertyKind::ALL {
            assert_eq!(kind.name().parse::<PropertyKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.name())
            );
        }
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(matches!(
            "cache_locality".parse::<PropertyKind>(),
            Err(PropertyError::UnknownKind(name)) if name == "cache_locality"
        ));
    }

    #[test]
    fn all_is_sorted_and_unique() {
        let mut sorted = PropertyKind::ALL.to_vec();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted, PropertyKind::ALL.to_vec());
    }
}
