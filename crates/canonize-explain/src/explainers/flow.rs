//! Branching, exit, loop and recursion explainers

use canonize_props::idioms;
use canonize_props::{PropertyKind, PropertyValue};

use super::{counted, mismatch};
use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, TransformationHints};
use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

/// `if`/`return` pairs collapsible to a conditional expression
#[derive(Debug, Clone, Copy, Default)]
pub struct ControlFlowExplainer;

impl DifferenceExplainer for ControlFlowExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::ControlFlow
    }

    fn name(&self) -> &'static str {
        "control_flow"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::ControlFlow(a), PropertyValue::ControlFlow(b)) = (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.branches <= b.branches {
            return Ok(None);
        }
        let sites = ctx.candidate.stmt_sites(&idioms::is_if_else_return);
        let canon_sites = ctx.canon.stmt_sites(&idioms::is_if_else_return).len();
        if sites.len() <= canon_sites {
            return Ok(None);
        }
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::IfReturnVsConditionalExpression,
                TransformationHints::Site {
                    site: sites[0].clone(),
                },
            )
            .with_explanation("candidate returns from both arms of an if; canon returns a conditional expression")
            .with_details(counted(a.branches, "branch"), counted(b.branches, "branch")),
        ))
    }
}

/// `else` following a branch that always exits
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPathsExplainer;

impl DifferenceExplainer for ExecutionPathsExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::ExecutionPaths
    }

    fn name(&self) -> &'static str {
        "execution_paths"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::ExecutionPaths(a), PropertyValue::ExecutionPaths(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.else_after_return <= b.else_after_return {
            return Ok(None);
        }
        let Some(site) = ctx
            .candidate
            .stmt_sites(&idioms::is_else_after_return)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::RedundantElseAfterReturn,
                TransformationHints::Site { site },
            )
            .with_explanation("candidate keeps an else after a branch that always exits")
            .with_details(
                counted(a.else_after_return, "redundant else"),
                counted(b.else_after_return, "redundant else"),
            ),
        ))
    }
}

/// Index-based iteration over a sequence
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminationExplainer;

impl DifferenceExplainer for TerminationExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Termination
    }

    fn name(&self) -> &'static str {
        "termination"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::Termination(a), PropertyValue::Termination(b)) = (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.index_iterations <= b.index_iterations {
            return Ok(None);
        }
        let Some(site) = ctx
            .candidate
            .stmt_sites(&idioms::is_index_iteration)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::IndexBasedIteration,
                TransformationHints::Site { site },
            )
            .with_explanation("candidate iterates over indices and only reads elements")
            .with_details(
                counted(a.index_iterations, "index loop"),
                counted(b.index_iterations, "index loop"),
            ),
        ))
    }
}

/// Recursive against iterative formulations; diagnostic only
#[derive(Debug, Clone, Copy, Default)]
pub struct RecursionExplainer;

impl DifferenceExplainer for RecursionExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::RecursionSchema
    }

    fn name(&self) -> &'static str {
        "recursion_schema"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        _ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::RecursionSchema(a), PropertyValue::RecursionSchema(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        let describe = |recursive: bool| if recursive { "recursive" } else { "iterative" };
        if a.is_recursive != b.is_recursive {
            return Ok(Some(
                PropertyDifference::new(
                    DifferenceType::RecursionVsIteration,
                    TransformationHints::None,
                )
                .with_explanation(format!(
                    "candidate is {} where canon is {}",
                    describe(a.is_recursive),
                    describe(b.is_recursive)
                ))
                .with_details(describe(a.is_recursive), describe(b.is_recursive)),
            ));
        }
        if a.is_recursive && a.base_cases != b.base_cases {
            return Ok(Some(
                PropertyDifference::new(DifferenceType::BaseCaseMismatch, TransformationHints::None)
                    .with_explanation("recursive formulations differ in their base cases")
                    .with_details(
                        counted(a.base_cases, "base case"),
                        counted(b.base_cases, "base case"),
                    ),
            ));
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
    fn if_return_against_conditional_expression() {
        let pair = Pair::new(
            "def f(x):\n    if x > 0:\n        return x\n    return -x\n",
            "def f(x):\n    return x if x > 0 else -x\n",
        );
        let diff = pair.explain(&ControlFlowExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::IfReturnVsConditionalExpression);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn else_after_return() {
        let pair = Pair::new(
            "def f(x):\n    if x:\n        return 1\n    else:\n        y = 2\n        return y\n",
            "def f(x):\n    if x:\n        return 1\n    y = 2\n    return y\n",
        );
        let diff = pair.explain(&ExecutionPathsExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::RedundantElseAfterReturn);
    }

    #[test]
    fn index_iteration() {
        let pair = Pair::new(
            "def f(xs):\n    t = 0\n    for i in range(len(xs)):\n        t += xs[i]\n    return t\n",
            "def f(xs):\n    t = 0\n    for x in xs:\n        t += x\n    return t\n",
        );
        let diff = pair.explain(&TerminationExplainer).unwrap();
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn recursion_against_loop_is_diagnostic() {
        let pair = Pair::new(
            "def fact(n):\n    if n <= 1:\n        return 1\n    return n * fact(n - 1)\n",
            "def fact(n):\n    r = 1\n    for i in range(2, n + 1):\n        r *= i\n    return r\n",
        );
        let diff = pair.explain(&RecursionExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::RecursionVsIteration);
        assert!(diff.difference_type.is_diagnostic());
        assert_eq!(diff.hints, TransformationHints::None);
    }
}
