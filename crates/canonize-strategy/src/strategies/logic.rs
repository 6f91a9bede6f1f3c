//! Emptiness tests, boolean comparisons, negations and operator grouping

use canonize_explain::{
    DifferenceType, EmptyCheckDirection, PropertyDifference, TransformationHints,
};
use canonize_props::idioms;
use canonize_props::PropertyKind;
use canonize_syntax::{CmpOp, Expr, UnaryOp};

use crate::error::StrategyError;
use crate::strategy::{plain_site, rewrite_expr_with, TransformationStrategy};

fn to_truthiness(expr: &Expr) -> Option<Expr> {
    let (operand, empty) = idioms::length_check(expr)?;
    Some(if empty {
        Expr::not(operand.clone())
    } else {
        operand.clone()
    })
}

fn to_length(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Unary {
            op: UnaryOp::Not,
            operand,
        } => Some(Expr::compare(
            Expr::call("len", vec![(**operand).clone()]),
            CmpOp::Eq,
            Expr::Int(0),
        )),
        _ => None,
    }
}

/// `len(x) == 0` and `not x` into one another
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCheckRewrite;

impl TransformationStrategy for EmptyCheckRewrite {
    fn name(&self) -> &'static str {
        "empty_check_rewrite"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::LogicalEquivalence
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::EmptyCheckForm
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::EmptyCheck { site, direction } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        match direction {
            EmptyCheckDirection::ToTruthiness => {
                rewrite_expr_with(source, site, idioms::is_length_check, to_truthiness)
            }
            EmptyCheckDirection::ToLength => {
                rewrite_expr_with(source, site, idioms::is_negated_truthiness, to_length)
            }
        }
    }
}

fn without_bool_literal(expr: &Expr) -> Option<Expr> {
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = expr
    else {
        return None;
    };
    let ([op], [right]) = (ops.as_slice(), comparators.as_slice()) else {
        return None;
    };
    let (subject, literal) = match (&**left, right) {
        (Expr::Bool(b), subject) | (subject, Expr::Bool(b)) => (subject.clone(), *b),
        _ => return None,
    };
    let affirmative = matches!(op, CmpOp::Eq | CmpOp::Is) == literal;
    Some(if affirmative {
        subject
    } else {
        Expr::not(subject)
    })
}

/// `x == True` into `x`, `x == False` into `not x`
#[derive(Debug, Clone, Copy, Default)]
pub struct BooleanComparisonSimplify;

impl TransformationStrategy for BooleanComparisonSimplify {
    fn name(&self) -> &'static str {
        "boolean_comparison_simplify"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::LogicalEquivalence
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::RedundantBooleanComparison
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_expr_with(
            source,
            site,
            idioms::is_bool_literal_comparison,
            without_bool_literal,
        )
    }
}

fn inverted(expr: &Expr) -> Option<Expr> {
    let Expr::Unary {
        op: UnaryOp::Not,
        operand,
    } = expr
    else {
        return None;
    };
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = &**operand
    else {
        return None;
    };
    let [op] = ops.as_slice() else {
        return None;
    };
    Some(Expr::Compare {
        left: left.clone(),
        ops: vec![op.negated()],
        comparators: comparators.clone(),
    })
}

/// `not a < b` into `a >= b`
#[derive(Debug, Clone, Copy, Default)]
pub struct NegatedComparisonInvert;

impl TransformationStrategy for NegatedComparisonInvert {
    fn name(&self) -> &'static str {
        "negated_comparison_invert"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::LogicalEquivalence
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::NegatedComparison
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_expr_with(source, site, idioms::is_negated_comparison, inverted)
    }
}

fn regroup_left(expr: &Expr) -> Option<Expr> {
    let Expr::BinOp { left: a, op, right } = expr else {
        return None;
    };
    match &**right {
        Expr::BinOp {
            left: b,
            op: inner,
            right: c,
        } if inner == op => Some(Expr::binop(
            Expr::binop((**a).clone(), *op, (**b).clone()),
            *op,
            (**c).clone(),
        )),
        _ => None,
    }
}

fn regroup_right(expr: &Expr) -> Option<Expr> {
    let Expr::BinOp { left, op, right: c } = expr else {
        return None;
    };
    match &**left {
        Expr::BinOp {
            left: a,
            op: inner,
            right: b,
        } if inner == op => Some(Expr::binop(
            (**a).clone(),
            *op,
            Expr::binop((**b).clone(), *op, (**c).clone()),
        )),
        _ => None,
    }
}

/// `a + (b + c)` and `(a + b) + c` into one another
#[derive(Debug, Clone, Copy, Default)]
pub struct Reassociate;

impl TransformationStrategy for Reassociate {
    fn name(&self) -> &'static str {
        "reassociate"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::OperatorPrecedence
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::OperatorReassociation
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::Reassociate { site, to_left } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        if *to_left {
            rewrite_expr_with(source, site, idioms::is_right_nested, regroup_left)
        } else {
            rewrite_expr_with(source, site, idioms::is_left_nested, regroup_right)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{at, run, run_at};
    use pretty_assertions::assert_eq;

    fn empty_check(direction: EmptyCheckDirection, source: &str) -> Option<String> {
        run(
            &EmptyCheckRewrite,
            DifferenceType::EmptyCheckForm,
            TransformationHints::EmptyCheck {
                site: at("f", 0),
                direction,
            },
            source,
        )
    }

    #[test]
    fn length_check_to_truthiness() {
        assert_eq!(
            empty_check(EmptyCheckDirection::ToTruthiness, "def f(x):\n    return len(x) == 0\n")
                .as_deref(),
            Some("def f(x):\n    return not x\n")
        );
        assert_eq!(
            empty_check(
                EmptyCheckDirection::ToTruthiness,
                "def f(x):\n    if len(x) > 0:\n        return 1\n    return 0\n"
            )
            .as_deref(),
            Some("def f(x):\n    if x:\n        return 1\n    return 0\n")
        );
    }

    #[test]
    fn truthiness_to_length_check() {
        assert_eq!(
            empty_check(EmptyCheckDirection::ToLength, "def f(x):\n    return not x\n").as_deref(),
            Some("def f(x):\n    return len(x) == 0\n")
        );
    }

    #[test]
    fn boolean_literal_comparisons() {
        let cases = [
            ("ok == True", "ok"),
            ("ok == False", "not ok"),
            ("ok != True", "not ok"),
            ("True == ok", "ok"),
            ("ok is False", "not ok"),
        ];
        for (before, after) in cases {
            let out = run_at(
                &BooleanComparisonSimplify,
                DifferenceType::RedundantBooleanComparison,
                &format!("def f(ok):\n    return {before}\n"),
            );
            assert_eq!(out, Some(format!("def f(ok):\n    return {after}\n")), "{before}");
        }
    }

    #[test]
    fn negated_comparison_is_inverted() {
        let out = run_at(
            &NegatedComparisonInvert,
            DifferenceType::NegatedComparison,
            "def f(a, b):\n    return not a < b\n",
        );
        assert_eq!(out.as_deref(), Some("def f(a, b):\n    return a >= b\n"));
    }

    #[test]
    fn regrouping_both_ways() {
        let left = run(
            &Reassociate,
            DifferenceType::OperatorReassociation,
            TransformationHints::Reassociate {
                site: at("f", 0),
                to_left: true,
            },
            "def f(a, b, c):\n    return a + (b + c)\n",
        );
        assert_eq!(left.as_deref(), Some("def f(a, b, c):\n    return a + b + c\n"));

        let right = run(
            &Reassociate,
            DifferenceType::OperatorReassociation,
            TransformationHints::Reassociate {
                site: at("f", 0),
                to_left: false,
            },
            "def f(a, b, c):\n    return a * b * c\n",
        );
        assert_eq!(right.as_deref(), Some("def f(a, b, c):\n    return a * (b * c)\n"));
    }
}
