//! Built-in strategies, one per difference type

mod arith;
mod data;
mod flow;
mod logic;
mod structure;

use std::collections::BTreeSet;

use canonize_syntax::is_builtin;

use crate::strategy::TransformationStrategy;

pub use arith::{
    CommutativeSwap, FloorDivision, IdentityElimination, PowerMultiplication,
};
pub use data::{DeadStoreElimination, StripDiagnosticOutput, StripDocstring, UnwrapMaterialization};
pub use flow::{ConditionalExpression, DirectIteration, FlattenElseAfterReturn, InlineReturnChain};
pub use logic::{BooleanComparisonSimplify, EmptyCheckRewrite, NegatedComparisonInvert, Reassociate};
pub use structure::{ConcatToJoin, IdentifierRename, LiteralAlignment, LoopToComprehension};

pub(crate) fn defaults() -> Vec<Box<dyn TransformationStrategy>> {
    vec![
        Box::new(InlineReturnChain),
        Box::new(EmptyCheckRewrite),
        Box::new(BooleanComparisonSimplify),
        Box::new(NegatedComparisonInvert),
        Box::new(LoopToComprehension),
        Box::new(ConcatToJoin),
        Box::new(LiteralAlignment),
        Box::new(IdentifierRename),
        Box::new(ConditionalExpression),
        Box::new(FlattenElseAfterReturn),
        Box::new(DeadStoreElimination),
        Box::new(StripDiagnosticOutput),
        Box::new(DirectIteration),
        Box::new(UnwrapMaterialization),
        Box::new(IdentityElimination),
        Box::new(CommutativeSwap),
        Box::new(PowerMultiplication),
        Box::new(FloorDivision),
        Box::new(Reassociate),
        Box::new(StripDocstring),
    ]
}

/// `base`, or `base_1`, `base_2`, ... whichever is free first
pub(crate) fn fresh_name(taken: &BTreeSet<String>, base: &str) -> String {
    if !taken.contains(base) && !is_builtin(base) {
        return base.to_string();
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}_{n}");
        if !taken.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use canonize_explain::{DifferenceType, PropertyDifference, TransformationHints};
    use canonize_props::idioms::Site;

    use crate::strategy::TransformationStrategy;

    pub(crate) fn at(function: &str, occurrence: usize) -> Site {
        Site::new(function, occurrence)
    }

    pub(crate) fn run(
        strategy: &dyn TransformationStrategy,
        difference_type: DifferenceType,
        hints: TransformationHints,
        source: &str,
    ) -> Option<String> {
        assert!(strategy.handles(difference_type));
        let difference = PropertyDifference::new(difference_type, hints);
        assert_eq!(strategy.kind(), difference.kind);
        strategy.generate(&difference, source).unwrap()
    }

    pub(crate) fn run_at(
        strategy: &dyn TransformationStrategy,
        difference_type: DifferenceType,
        source: &str,
    ) -> Option<String> {
        run(
            strategy,
            difference_type,
            TransformationHints::Site { site: at("f", 0) },
            source,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_names_avoid_taken_and_builtins() {
        let taken: BTreeSet<String> = ["item".to_string(), "item_1".to_string()].into();
        assert_eq!(fresh_name(&taken, "item"), "item_2");
        assert_eq!(fresh_name(&taken, "value"), "value");
        assert_eq!(fresh_name(&BTreeSet::new(), "len"), "len_1");
    }

    #[test]
    fn default_names_are_unique() {
        let names: BTreeSet<&str> = defaults().iter().map(|s| s.name()).collect();
        assert_eq!(names.len(), 20);
    }
}
