//! Operator-level explainers

use canonize_props::idioms;
use canonize_props::{PropertyKind, PropertyValue};
use canonize_syntax::Expr;

use super::{counted, mismatch};
use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, TransformationHints};
use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

/// Identity operations and commutative operand order
#[derive(Debug, Clone, Copy, Default)]
pub struct AlgebraicExplainer;

/// `"op:a,b"` reversed to `"op:b,a"`
fn reversed(signature: &str) -> Option<String> {
    let (op, operands) = signature.split_once(':')?;
    let (left, right) = operands.split_once(',')?;
    Some(format!("{op}:{right},{left}"))
}

impl DifferenceExplainer for AlgebraicExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::AlgebraicStructure
    }

    fn name(&self) -> &'static str {
        "algebraic_structure"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::AlgebraicStructure(a), PropertyValue::AlgebraicStructure(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };

        if a.identity_operations > b.identity_operations {
            if let Some(site) = ctx
                .candidate
                .expr_sites(&idioms::is_identity_operation)
                .into_iter()
                .next()
            {
                return Ok(Some(
                    PropertyDifference::new(
                        DifferenceType::IdentityOperation,
                        TransformationHints::Site { site },
                    )
                    .with_explanation("candidate applies an operation with its identity element")
                    .with_details(
                        counted(a.identity_operations, "identity operation"),
                        counted(b.identity_operations, "identity operation"),
                    ),
                ));
            }
        }

        let swapped = a
            .commutative_orders
            .iter()
            .zip(&b.commutative_orders)
            .position(|(ours, theirs)| {
                ours != theirs && reversed(ours).as_deref() == Some(theirs.as_str())
            });
        let Some(index) = swapped else {
            return Ok(None);
        };
        let Some(site) = ctx
            .candidate
            .expr_sites(&idioms::is_commutative_binop)
            .into_iter()
            .nth(index)
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::CommutativeOperandOrder,
                TransformationHints::Site { site },
            )
            .with_explanation("candidate orders the operands of a commutative operator the other way")
            .with_details(
                a.commutative_orders[index].clone(),
                b.commutative_orders[index].clone(),
            ),
        ))
    }
}

/// Power forms and truncating division
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericalExplainer;

impl DifferenceExplainer for NumericalExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::NumericalBehavior
    }

    fn name(&self) -> &'static str {
        "numerical_behavior"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::NumericalBehavior(a), PropertyValue::NumericalBehavior(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };

        let power_form = if a.powers > b.powers && a.self_multiplications < b.self_multiplications
        {
            Some((idioms::is_power_two as fn(&Expr) -> bool, true))
        } else if a.self_multiplications > b.self_multiplications && a.powers < b.powers {
            Some((idioms::is_self_multiplication as fn(&Expr) -> bool, false))
        } else {
            None
        };
        if let Some((pred, to_multiplication)) = power_form {
            if let Some(site) = ctx.candidate.expr_sites(&pred).into_iter().next() {
                let (ours, theirs) = if to_multiplication {
                    ("x ** 2", "x * x")
                } else {
                    ("x * x", "x ** 2")
                };
                return Ok(Some(
                    PropertyDifference::new(
                        DifferenceType::PowerVsMultiplication,
                        TransformationHints::PowerForm {
                            site,
                            to_multiplication,
                        },
                    )
                    .with_explanation(format!("candidate squares as `{ours}`; canon as `{theirs}`"))
                    .with_details(
                        format!("{} powers / {} products", a.powers, a.self_multiplications),
                        format!("{} powers / {} products", b.powers, b.self_multiplications),
                    ),
                ));
            }
        }

        if a.truncating_divisions > b.truncating_divisions && a.floor_divisions < b.floor_divisions
        {
            if let Some(site) = ctx
                .candidate
                .expr_sites(&idioms::is_truncating_division)
                .into_iter()
                .next()
            {
                return Ok(Some(
                    PropertyDifference::new(
                        DifferenceType::TruncatingDivision,
                        TransformationHints::Site { site },
                    )
                    .with_explanation("candidate truncates a true division; canon floor-divides")
                    .with_details(
                        counted(a.truncating_divisions, "truncating division"),
                        counted(b.floor_divisions, "floor division"),
                    ),
                ));
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainers::testing::Pair;
    use canonize_props::idioms::Site;
    use pretty_assertions::assert_eq;

    #[test]
    fn identity_operation() {
        let pair = Pair::new("def f(x):\n    return x + 0\n", "def f(x):\n    return x\n");
        let diff = pair.explain(&AlgebraicExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::IdentityOperation);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn commutative_order_points_at_the_swapped_operation() {
        let pair = Pair::new(
            "def f(x, y):\n    a = x + y\n    return x * 2 + a\n",
            "def f(x, y):\n    a = x + y\n    return 2 * x + a\n",
        );
        let diff = pair.explain(&AlgebraicExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::CommutativeOperandOrder);
        // pre-order: `x + y`, `x * 2 + a`, `x * 2`
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 2) });
    }

    #[test]
    fn swapped_parameters_are_explained() {
        let pair = Pair::new(
            "def f(a, b):\n    return b * a\n",
            "def f(a, b):\n    return a * b\n",
        );
        let diff = pair.explain(&AlgebraicExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::CommutativeOperandOrder);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn reversal_of_a_signature() {
        assert_eq!(reversed("*:name,literal").as_deref(), Some("*:literal,name"));
        assert_eq!(reversed("garbage"), None);
    }

    #[test]
    fn power_against_multiplication() {
        let pair = Pair::new("def f(x):\n    return x ** 2\n", "def f(x):\n    return x * x\n");
        let diff = pair.explain(&NumericalExplainer).unwrap();
        assert_eq!(
            diff.hints,
            TransformationHints::PowerForm {
                site: Site::new("f", 0),
                to_multiplication: true
            }
        );

        let back = Pair::new("def f(x):\n    return x * x\n", "def f(x):\n    return x ** 2\n");
        let diff = back.explain(&NumericalExplainer).unwrap();
        assert!(matches!(
            diff.hints,
            TransformationHints::PowerForm {
                to_multiplication: false,
                ..
            }
        ));
    }

    #[test]
    fn truncating_division() {
        let pair = Pair::new(
            "def f(a, b):\n    return int(a / b)\n",
            "def f(a, b):\n    return a // b\n",
        );
        let diff = pair.explain(&NumericalExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::TruncatingDivision);
    }
}
