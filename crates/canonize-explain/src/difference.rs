//! Difference taxonomy, hints and the explained difference itself

use std::fmt;

use canonize_props::idioms::Site;
use canonize_props::PropertyKind;
use serde::{Deserialize, Serialize};

/// Closed taxonomy of explainable mismatches
///
/// Every tag belongs to exactly one property kind; see [`DifferenceType::kind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DifferenceType {
    /// Assignment chain ending in a return of the same name
    ConsecutiveStatementsConsolidatable,
    /// `len(x) == 0` against `not x`
    EmptyCheckForm,
    /// `x == True` against `x`
    RedundantBooleanComparison,
    /// `not (a < b)` against `a >= b`
    NegatedComparison,
    /// Append loop against a list comprehension
    AccumulatorLoopVsComprehension,
    /// `+=` string building against `''.join(...)`
    StringConcatenationVsJoin,
    /// Regular expressions differing in a character class
    RegexCharacterClassVariant,
    /// Other textual literal variation
    StringLiteralVariant,
    /// Positional identifier correspondence
    IdentifierNaming,
    /// `if c: return a` / `return b` against `return a if c else b`
    IfReturnVsConditionalExpression,
    /// `else` after a branch that always exits
    RedundantElseAfterReturn,
    /// Assignment whose value is never read
    DeadStore,
    /// `print` left in the candidate
    DiagnosticOutput,
    /// `for i in range(len(xs))` against direct iteration
    IndexBasedIteration,
    /// `list(...)` around something only iterated
    RedundantMaterialization,
    /// `x + 0`, `x * 1` and the like
    IdentityOperation,
    /// `2 * n` against `n * 2`
    CommutativeOperandOrder,
    /// `x ** 2` against `x * x`
    PowerVsMultiplication,
    /// `int(a / b)` against `a // b`
    TruncatingDivision,
    /// `a + (b + c)` against `a + b + c`
    OperatorReassociation,
    /// Docstring absent from the canon
    ExtraneousDocstring,
    /// Recursive against iterative formulation
    RecursionVsIteration,
    /// Different number of base cases
    BaseCaseMismatch,
}

impl DifferenceType {
    /// Every tag
    pub const ALL: [DifferenceType; 23] = [
        Self::ConsecutiveStatementsConsolidatable,
        Self::EmptyCheckForm,
        Self::RedundantBooleanComparison,
        Self::NegatedComparison,
        Self::AccumulatorLoopVsComprehension,
        Self::StringConcatenationVsJoin,
        Self::RegexCharacterClassVariant,
        Self::StringLiteralVariant,
        Self::IdentifierNaming,
        Self::IfReturnVsConditionalExpression,
        Self::RedundantElseAfterReturn,
        Self::DeadStore,
        Self::DiagnosticOutput,
        Self::IndexBasedIteration,
        Self::RedundantMaterialization,
        Self::IdentityOperation,
        Self::CommutativeOperandOrder,
        Self::PowerVsMultiplication,
        Self::TruncatingDivision,
        Self::OperatorReassociation,
        Self::ExtraneousDocstring,
        Self::RecursionVsIteration,
        Self::BaseCaseMismatch,
    ];

    /// Kebab-case tag
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::ConsecutiveStatementsConsolidatable => "consecutive-statements-consolidatable",
            Self::EmptyCheckForm => "empty-check-form",
            Self::RedundantBooleanComparison => "redundant-boolean-comparison",
            Self::NegatedComparison => "negated-comparison",
            Self::AccumulatorLoopVsComprehension => "accumulator-loop-vs-comprehension",
            Self::StringConcatenationVsJoin => "string-concatenation-vs-join",
            Self::RegexCharacterClassVariant => "regex-character-class-variant",
            Self::StringLiteralVariant => "string-literal-variant",
            Self::IdentifierNaming => "identifier-naming",
            Self::IfReturnVsConditionalExpression => "if-return-vs-conditional-expression",
            Self::RedundantElseAfterReturn => "redundant-else-after-return",
            Self::DeadStore => "dead-store",
            Self::DiagnosticOutput => "diagnostic-output",
            Self::IndexBasedIteration => "index-based-iteration",
            Self::RedundantMaterialization => "redundant-materialization",
            Self::IdentityOperation => "identity-operation",
            Self::CommutativeOperandOrder => "commutative-operand-order",
            Self::PowerVsMultiplication => "power-vs-multiplication",
            Self::TruncatingDivision => "truncating-division",
            Self::OperatorReassociation => "operator-reassociation",
            Self::ExtraneousDocstring => "extraneous-docstring",
            Self::RecursionVsIteration => "recursion-vs-iteration",
            Self::BaseCaseMismatch => "base-case-mismatch",
        }
    }

    /// Property kind the mismatch perturbs
    #[must_use]
    pub const fn kind(self) -> PropertyKind {
        match self {
            Self::ConsecutiveStatementsConsolidatable => PropertyKind::StatementOrdering,
            Self::EmptyCheckForm | Self::RedundantBooleanComparison | Self::NegatedComparison => {
                PropertyKind::LogicalEquivalence
            }
            Self::AccumulatorLoopVsComprehension
            | Self::StringConcatenationVsJoin
            | Self::RegexCharacterClassVariant
            | Self::StringLiteralVariant
            | Self::IdentifierNaming => PropertyKind::NormalizedStructure,
            Self::IfReturnVsConditionalExpression => PropertyKind::ControlFlow,
            Self::RedundantElseAfterReturn => PropertyKind::ExecutionPaths,
            Self::DeadStore => PropertyKind::DataDependency,
            Self::DiagnosticOutput => PropertyKind::SideEffects,
            Self::IndexBasedIteration => PropertyKind::Termination,
            Self::RedundantMaterialization => PropertyKind::Complexity,
            Self::IdentityOperation | Self::CommutativeOperandOrder => {
                PropertyKind::AlgebraicStructure
            }
            Self::PowerVsMultiplication | Self::TruncatingDivision => {
                PropertyKind::NumericalBehavior
            }
            Self::OperatorReassociation => PropertyKind::OperatorPrecedence,
            Self::ExtraneousDocstring => PropertyKind::FunctionContracts,
            Self::RecursionVsIteration | Self::BaseCaseMismatch => PropertyKind::RecursionSchema,
        }
    }

    /// Default severity in `[0, 1]`
    #[must_use]
    pub const fn severity(self) -> f64 {
        match self {
            Self::RecursionVsIteration => 0.9,
            Self::RegexCharacterClassVariant => 0.7,
            Self::AccumulatorLoopVsComprehension | Self::StringConcatenationVsJoin => 0.6,
            Self::DiagnosticOutput | Self::IndexBasedIteration | Self::BaseCaseMismatch => 0.5,
            Self::IfReturnVsConditionalExpression => 0.45,
            Self::ConsecutiveStatementsConsolidatable | Self::TruncatingDivision => 0.4,
            Self::StringLiteralVariant | Self::RedundantElseAfterReturn => 0.35,
            Self::EmptyCheckForm
            | Self::RedundantBooleanComparison
            | Self::DeadStore
            | Self::RedundantMaterialization => 0.3,
            Self::NegatedComparison | Self::PowerVsMultiplication => 0.25,
            Self::IdentifierNaming | Self::IdentityOperation | Self::OperatorReassociation => 0.2,
            Self::CommutativeOperandOrder => 0.15,
            Self::ExtraneousDocstring => 0.1,
        }
    }

    /// Diagnostic only; no strategy rewrites it
    #[must_use]
    pub const fn is_diagnostic(self) -> bool {
        matches!(self, Self::RecursionVsIteration | Self::BaseCaseMismatch)
    }
}

impl fmt::Display for DifferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which emptiness form to rewrite toward
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyCheckDirection {
    /// `len(x) == 0` becomes `not x`, `len(x) > 0` becomes `x`
    ToTruthiness,
    /// `not x` becomes `len(x) == 0`
    ToLength,
}

/// One identifier correspondence
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RenamePair {
    /// Candidate name
    pub from: String,
    /// Canon name
    pub to: String,
}

impl RenamePair {
    /// Create a pair
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Structured data a strategy needs to perform its rewrite
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hint", rename_all = "snake_case")]
pub enum TransformationHints {
    /// Rewrite the idiom at `site`; the tag names the idiom
    Site {
        /// Location in the candidate
        site: Site,
    },
    /// Fold `chain_length` assignments into the return at `site`
    InlineReturn {
        /// Return statement position among return chains
        site: Site,
        /// Assignments to absorb
        chain_length: usize,
    },
    /// Swap the emptiness test at `site`
    EmptyCheck {
        /// Position among tests of the source form
        site: Site,
        /// Target form
        direction: EmptyCheckDirection,
    },
    /// Convert between `x ** 2` and `x * x`
    PowerForm {
        /// Position among expressions of the source form
        site: Site,
        /// `x ** 2` to `x * x` when set
        to_multiplication: bool,
    },
    /// Regroup an associative chain
    Reassociate {
        /// Position among nested expressions of the source grouping
        site: Site,
        /// `a + (b + c)` to `(a + b) + c` when set
        to_left: bool,
    },
    /// Replace one string literal
    LiteralAlignment {
        /// Position among string literals
        site: Site,
        /// Candidate text
        from: String,
        /// Canon text
        to: String,
    },
    /// Rename identifiers inside one function
    Rename {
        /// Top-level function whose scope is renamed
        function: String,
        /// Correspondences, applied simultaneously
        renames: Vec<RenamePair>,
    },
    /// Drop the docstring of a function
    StripDocstring {
        /// Top-level function
        function: String,
    },
    /// Nothing a strategy can act on
    None,
}

impl TransformationHints {
    /// Site the hint addresses, if any
    #[must_use]
    pub fn site(&self) -> Option<&Site> {
        match self {
            Self::Site { site }
            | Self::InlineReturn { site, .. }
            | Self::EmptyCheck { site, .. }
            | Self::PowerForm { site, .. }
            | Self::Reassociate { site, .. }
            | Self::LiteralAlignment { site, .. } => Some(site),
            Self::Rename { .. } | Self::StripDocstring { .. } | Self::None => None,
        }
    }

    /// Serialized tag of the hint variant
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Site { .. } => "site",
            Self::InlineReturn { .. } => "inline_return",
            Self::EmptyCheck { .. } => "empty_check",
            Self::PowerForm { .. } => "power_form",
            Self::Reassociate { .. } => "reassociate",
            Self::LiteralAlignment { .. } => "literal_alignment",
            Self::Rename { .. } => "rename",
            Self::StripDocstring { .. } => "strip_docstring",
            Self::None => "none",
        }
    }
}

/// An explained, nonzero per-property mismatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDifference {
    /// Property kind
    pub kind: PropertyKind,
    /// Taxonomy tag
    pub difference_type: DifferenceType,
    /// Severity in `[0, 1]`
    pub severity: f64,
    /// Human-readable explanation
    pub explanation: String,
    /// Strategy input
    pub hints: TransformationHints,
    /// What the candidate does
    pub candidate_detail: String,
    /// What the canon does
    pub canon_detail: String,
}

impl PropertyDifference {
    /// Create a difference with the tag's default severity
    #[must_use]
    pub fn new(difference_type: DifferenceType, hints: TransformationHints) -> Self {
        Self {
            kind: difference_type.kind(),
            difference_type,
            severity: difference_type.severity(),
            explanation: String::new(),
            hints,
            candidate_detail: String::new(),
            canon_detail: String::new(),
        }
    }

    /// Set the explanation text
    #[must_use]
    pub fn with_explanation(mut self, explanation: impl Into<String>) -> Self {
        self.explanation = explanation.into();
        self
    }

    /// Set both side details
    #[must_use]
    pub fn with_details(mut self, candidate: impl Into<String>, canon: impl Into<String>) -> Self {
        self.candidate_detail = candidate.into();
        self.canon_detail = canon.into();
        self
    }

    /// Override the severity, clamped to `[0, 1]`
    #[must_use]
    pub fn with_severity(mut self, severity: f64) -> Self {
        self.severity = severity.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_serialize_as_kebab_case() {
        for ty in DifferenceType::ALL {
            assert_eq!(serde_json::to_string(&ty).unwrap(), format!("\"{}\"", ty.tag()));
            assert!((0.0..=1.0).contains(&ty.severity()));
        }
    }

    #[test]
    fn character_class_outranks_plain_literal() {
        assert!(
            DifferenceType::RegexCharacterClassVariant.severity()
                > DifferenceType::StringLiteralVariant.severity()
        );
    }

    #[test]
    fn difference_takes_kind_from_tag() {
        let diff = PropertyDifference::new(
            DifferenceType::EmptyCheckForm,
            TransformationHints::EmptyCheck {
                site: Site::new("f", 0),
                direction: EmptyCheckDirection::ToTruthiness,
            },
        )
        .with_severity(3.0);
        assert_eq!(diff.kind, PropertyKind::LogicalEquivalence);
        assert_eq!(diff.severity, 1.0);
        assert_eq!(diff.hints.site(), Some(&Site::new("f", 0)));
    }

    #[test]
    fn hints_are_tagged_in_json() {
        let hints = TransformationHints::Rename {
            function: "total".into(),
            renames: vec![RenamePair::new("items", "arr")],
        };
        let json = serde_json::to_value(&hints).unwrap();
        assert_eq!(json["hint"], "rename");
        assert_eq!(json["renames"][0]["to"], "arr");
    }
}
