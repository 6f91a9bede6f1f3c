//! Whole-shape explainer: loop builders, literals and identifier naming

use canonize_props::idioms;
use canonize_props::{PropertyKind, PropertyValue};
use canonize_syntax::Stmt;

use super::{counted, mismatch};
use super::{literal::literal_difference, naming::naming_difference};
use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, TransformationHints};
use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

/// Explains a normalized-structure mismatch by the first idiom that accounts for it
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureExplainer;

type BlockPredicate = fn(&[Stmt], usize) -> bool;

const LOOP_BUILDS: [(BlockPredicate, DifferenceType, &str); 2] = [
    (
        idioms::is_accumulator_loop,
        DifferenceType::AccumulatorLoopVsComprehension,
        "candidate appends to a list in a loop; canon builds it in one expression",
    ),
    (
        idioms::is_concat_loop,
        DifferenceType::StringConcatenationVsJoin,
        "candidate concatenates strings in a loop; canon joins them",
    ),
];

fn loop_build_difference(ctx: &ExplainContext<'_>) -> Option<PropertyDifference> {
    LOOP_BUILDS.iter().find_map(|(pred, difference_type, explanation)| {
        let ours = ctx.candidate.stmt_sites(pred);
        let theirs = ctx.canon.stmt_sites(pred).len();
        let site = ours.first()?.clone();
        (ours.len() > theirs).then(|| {
            PropertyDifference::new(*difference_type, TransformationHints::Site { site })
                .with_explanation(*explanation)
                .with_details(counted(ours.len(), "loop"), counted(theirs, "loop"))
        })
    })
}

impl DifferenceExplainer for StructureExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::NormalizedStructure
    }

    fn name(&self) -> &'static str {
        "normalized_structure"
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
        Ok(loop_build_difference(ctx)
            .or_else(|| literal_difference(ctx))
            .or_else(|| naming_difference(ctx)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explainers::testing::Pair;
    use canonize_contract::NamingPolicy;
    use canonize_props::idioms::Site;
    use pretty_assertions::assert_eq;

    #[test]
    fn accumulator_loop() {
        let pair = Pair::new(
            "def f(xs):\n    out = []\n    for x in xs:\n        out.append(x * 2)\n    return out\n",
            "def f(xs):\n    return [x * 2 for x in xs]\n",
        );
        let diff = pair.explain(&StructureExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::AccumulatorLoopVsComprehension);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn concatenation_loop() {
        let pair = Pair::new(
            "def f(xs):\n    s = ''\n    for x in xs:\n        s += x\n    return s\n",
            "def f(xs):\n    return ''.join(xs)\n",
        );
        let diff = pair.explain(&StructureExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::StringConcatenationVsJoin);
    }

    #[test]
    fn concatenation_by_plain_assignment() {
        let pair = Pair::new(
            "def f(xs):\n    t = ''\n    for x in xs:\n        t = t + str(x)\n    return t\n",
            "def f(xs):\n    return ''.join(xs)\n",
        );
        let diff = pair.explain(&StructureExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::StringConcatenationVsJoin);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn naming_only_under_a_policy() {
        let pair = Pair::new(
            "def f(items):\n    return len(items)\n",
            "def f(arr):\n    return len(arr)\n",
        );
        assert!(pair.explain(&StructureExplainer).is_none());

        let policy = NamingPolicy::permissive();
        let ctx = pair.context().with_naming(Some(&policy));
        let diff = pair.explain_with(&StructureExplainer, &ctx).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::IdentifierNaming);
    }

    #[test]
    fn unrelated_shapes_are_not_explained() {
        let pair = Pair::new(
            "def f(n):\n    while n > 1:\n        n = n // 2\n    return n\n",
            "def f(n):\n    return 1 if n > 0 else n\n",
        );
        assert!(pair.explain(&StructureExplainer).is_none());
    }
}
