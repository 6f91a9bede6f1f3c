//! Boolean-form, operator-grouping and statement-layout explainers

use canonize_props::idioms;
use canonize_props::{PropertyKind, PropertyValue};

use super::{counted, mismatch};
use crate::context::ExplainContext;
use crate::difference::{
    DifferenceType, EmptyCheckDirection, PropertyDifference, TransformationHints,
};
use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

/// Emptiness tests, boolean-literal comparisons and negated comparisons
#[derive(Debug, Clone, Copy, Default)]
pub struct LogicalExplainer;

impl DifferenceExplainer for LogicalExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::LogicalEquivalence
    }

    fn name(&self) -> &'static str {
        "logical_equivalence"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::LogicalEquivalence(a), PropertyValue::LogicalEquivalence(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };

        if a.length_empty_checks > b.length_empty_checks {
            let Some(site) = ctx.candidate.expr_sites(&idioms::is_length_check).into_iter().next()
            else {
                return Ok(None);
            };
            return Ok(Some(
                PropertyDifference::new(
                    DifferenceType::EmptyCheckForm,
                    TransformationHints::EmptyCheck {
                        site,
                        direction: EmptyCheckDirection::ToTruthiness,
                    },
                )
                .with_explanation("candidate tests emptiness through len(); canon relies on truthiness")
                .with_details(
                    counted(a.length_empty_checks, "length check"),
                    counted(b.length_empty_checks, "length check"),
                ),
            ));
        }

        if a.length_empty_checks < b.length_empty_checks
            && a.truthiness_negations > b.truthiness_negations
        {
            let Some(site) = ctx
                .candidate
                .expr_sites(&idioms::is_negated_truthiness)
                .into_iter()
                .next()
            else {
                return Ok(None);
            };
            return Ok(Some(
                PropertyDifference::new(
                    DifferenceType::EmptyCheckForm,
                    TransformationHints::EmptyCheck {
                        site,
                        direction: EmptyCheckDirection::ToLength,
                    },
                )
                .with_explanation("candidate negates truthiness; canon compares len() with zero")
                .with_details(
                    counted(a.truthiness_negations, "negation"),
                    counted(b.length_empty_checks, "length check"),
                ),
            ));
        }

        if a.bool_literal_comparisons > b.bool_literal_comparisons {
            if let Some(site) = ctx
                .candidate
                .expr_sites(&idioms::is_bool_literal_comparison)
                .into_iter()
                .next()
            {
                return Ok(Some(
                    PropertyDifference::new(
                        DifferenceType::RedundantBooleanComparison,
                        TransformationHints::Site { site },
                    )
                    .with_explanation("candidate compares against a boolean literal")
                    .with_details(
                        counted(a.bool_literal_comparisons, "literal comparison"),
                        counted(b.bool_literal_comparisons, "literal comparison"),
                    ),
                ));
            }
        }

        if a.negated_comparisons > b.negated_comparisons {
            if let Some(site) = ctx
                .candidate
                .expr_sites(&idioms::is_negated_comparison)
                .into_iter()
                .next()
            {
                return Ok(Some(
                    PropertyDifference::new(
                        DifferenceType::NegatedComparison,
                        TransformationHints::Site { site },
                    )
                    .with_explanation("candidate negates a comparison instead of inverting it")
                    .with_details(
                        counted(a.negated_comparisons, "negated comparison"),
                        counted(b.negated_comparisons, "negated comparison"),
                    ),
                ));
            }
        }

        Ok(None)
    }
}

/// Grouping of associative operator chains
#[derive(Debug, Clone, Copy, Default)]
pub struct OperatorPrecedenceExplainer;

impl DifferenceExplainer for OperatorPrecedenceExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::OperatorPrecedence
    }

    fn name(&self) -> &'static str {
        "operator_precedence"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        if candidate.kind() != self.kind() || canon.kind() != self.kind() {
            return Err(mismatch(self.kind(), candidate, canon));
        }
        let right = ctx.candidate.expr_sites(&idioms::is_right_nested);
        let left = ctx.candidate.expr_sites(&idioms::is_left_nested);
        let canon_right = ctx.canon.expr_sites(&idioms::is_right_nested).len();
        let canon_left = ctx.canon.expr_sites(&idioms::is_left_nested).len();

        let (site, to_left) = if right.len() > canon_right && left.len() < canon_left {
            (right[0].clone(), true)
        } else if left.len() > canon_left && right.len() < canon_right {
            (left[0].clone(), false)
        } else {
            return Ok(None);
        };
        let grouping = |to_left: bool| if to_left { "right-nested" } else { "left-nested" };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::OperatorReassociation,
                TransformationHints::Reassociate { site, to_left },
            )
            .with_explanation(format!(
                "candidate groups an associative chain {} where canon groups it {}",
                grouping(to_left),
                grouping(!to_left)
            ))
            .with_details(
                format!("{} right / {} left", right.len(), left.len()),
                format!("{canon_right} right / {canon_left} left"),
            ),
        ))
    }
}

/// Assignment chains collapsible into the final return
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementOrderingExplainer;

impl DifferenceExplainer for StatementOrderingExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::StatementOrdering
    }

    fn name(&self) -> &'static str {
        "statement_ordering"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::StatementOrdering(a), PropertyValue::StatementOrdering(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a == b {
            return Ok(None);
        }
        let chains = ctx.candidate.stmt_sites(&idioms::is_return_chain);
        let canon_chains = ctx.canon.stmt_sites(&idioms::is_return_chain).len();
        if chains.len() <= canon_chains {
            return Ok(None);
        }
        let site = chains[0].clone();
        let chain_length = ctx
            .candidate
            .block_site(&site, &idioms::is_return_chain)
            .map_or(1, |(block, i)| idioms::return_chain_length(block, i));
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::ConsecutiveStatementsConsolidatable,
                TransformationHints::InlineReturn { site, chain_length },
            )
            .with_explanation(format!(
                "candidate builds its return value through {} before returning it",
                counted(chain_length, "assignment")
            ))
            .with_details(
                format!("{} statements", a.len()),
                format!("{} statements", b.len()),
            ),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainers::testing::Pair;
    use canonize_props::idioms::Site;
    use pretty_assertions::assert_eq;

    #[test]
    fn return_chain_is_consolidatable() {
        let pair = Pair::new(
            "def f(n):\n    r = n * 2\n    return r\n",
            "def f(n):\n    return n * 2\n",
        );
        let diff = pair.explain(&StatementOrderingExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::ConsecutiveStatementsConsolidatable);
        assert_eq!(
            diff.hints,
            TransformationHints::InlineReturn {
                site: Site::new("f", 0),
                chain_length: 1
            }
        );
    }

    #[test]
    fn longer_chains_report_their_length() {
        let pair = Pair::new(
            "def f(n):\n    r = n * 2\n    r = r + 1\n    return r\n",
            "def f(n):\n    return n * 2 + 1\n",
        );
        let diff = pair.explain(&StatementOrderingExplainer).unwrap();
        assert!(matches!(diff.hints, TransformationHints::InlineReturn { chain_length: 2, .. }));
    }

    #[test]
    fn identical_layout_is_not_explained() {
        let pair = Pair::new("def f(n):\n    return n\n", "def f(n):\n    return n\n");
        assert!(pair.explain(&StatementOrderingExplainer).is_none());
    }

    #[test]
    fn length_check_against_truthiness() {
        let pair = Pair::new(
            "def f(x):\n    return len(x) == 0\n",
            "def f(x):\n    return not x\n",
        );
        let diff = pair.explain(&LogicalExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::EmptyCheckForm);
        assert_eq!(
            diff.hints,
            TransformationHints::EmptyCheck {
                site: Site::new("f", 0),
                direction: EmptyCheckDirection::ToTruthiness
            }
        );
    }

    #[test]
    fn truthiness_against_length_check() {
        let pair = Pair::new(
            "def f(x):\n    return not x\n",
            "def f(x):\n    return len(x) == 0\n",
        );
        let diff = pair.explain(&LogicalExplainer).unwrap();
        assert!(matches!(
            diff.hints,
            TransformationHints::EmptyCheck {
                direction: EmptyCheckDirection::ToLength,
                ..
            }
        ));
    }

    #[test]
    fn boolean_literal_comparison() {
        let pair = Pair::new(
            "def f(ok):\n    if ok == True:\n        return 1\n    return 0\n",
            "def f(ok):\n    if ok:\n        return 1\n    return 0\n",
        );
        let diff = pair.explain(&LogicalExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::RedundantBooleanComparison);
    }

    #[test]
    fn negated_comparison() {
        let pair = Pair::new(
            "def f(a, b):\n    return not a < b\n",
            "def f(a, b):\n    return a >= b\n",
        );
        let diff = pair.explain(&LogicalExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::NegatedComparison);
    }

    #[test]
    fn reassociation_direction() {
        let pair = Pair::new(
            "def f(a, b, c):\n    return a + (b + c)\n",
            "def f(a, b, c):\n    return a + b + c\n",
        );
        let diff = pair.explain(&OperatorPrecedenceExplainer).unwrap();
        assert_eq!(
            diff.hints,
            TransformationHints::Reassociate {
                site: Site::new("f", 0),
                to_left: true
            }
        );
    }
}
