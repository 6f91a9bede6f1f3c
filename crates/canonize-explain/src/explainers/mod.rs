//! Built-in explainers, one per property kind

mod arith;
mod data;
mod flow;
mod literal;
mod logic;
mod naming;
mod structure;

use canonize_props::{PropertyKind, PropertyValue};

use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

pub use arith::{AlgebraicExplainer, NumericalExplainer};
pub use data::{
    ComplexityExplainer, DataDependencyExplainer, FunctionContractsExplainer, SideEffectsExplainer,
};
pub use flow::{
    ControlFlowExplainer, ExecutionPathsExplainer, RecursionExplainer, TerminationExplainer,
};
pub use logic::{LogicalExplainer, OperatorPrecedenceExplainer, StatementOrderingExplainer};
pub use structure::StructureExplainer;

pub(crate) fn defaults() -> Vec<Box<dyn DifferenceExplainer>> {
    vec![
        Box::new(ControlFlowExplainer),
        Box::new(DataDependencyExplainer),
        Box::new(ExecutionPathsExplainer),
        Box::new(FunctionContractsExplainer),
        Box::new(ComplexityExplainer),
        Box::new(SideEffectsExplainer),
        Box::new(TerminationExplainer),
        Box::new(AlgebraicExplainer),
        Box::new(NumericalExplainer),
        Box::new(LogicalExplainer),
        Box::new(StructureExplainer),
        Box::new(OperatorPrecedenceExplainer),
        Box::new(StatementOrderingExplainer),
        Box::new(RecursionExplainer),
    ]
}

/// Mismatch error naming whichever side carries the wrong kind
pub(crate) fn mismatch(
    expected: PropertyKind,
    candidate: &PropertyValue,
    canon: &PropertyValue,
) -> ExplainError {
    let actual = if candidate.kind() == expected {
        canon.kind()
    } else {
        candidate.kind()
    };
    ExplainError::kind_mismatch(expected, actual)
}

/// `n thing(s)` for detail strings
pub(crate) fn counted(n: usize, what: &str) -> String {
    if n == 1 {
        format!("1 {what}")
    } else {
        format!("{n} {what}s")
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use canonize_props::{PropertyExtractor, PropertyKind, PropertyValue};
    use canonize_syntax::{parse_module, Module};

    use crate::context::{ExplainContext, SourceView};
    use crate::difference::PropertyDifference;
    use crate::explainer::DifferenceExplainer;

    pub(crate) struct Pair {
        pub(crate) candidate: (String, Module),
        pub(crate) canon: (String, Module),
    }

    impl Pair {
        pub(crate) fn new(candidate: &str, canon: &str) -> Self {
            Self {
                candidate: (candidate.to_string(), parse_module(candidate).unwrap()),
                canon: (canon.to_string(), parse_module(canon).unwrap()),
            }
        }

        pub(crate) fn context(&self) -> ExplainContext<'_> {
            ExplainContext::new(
                SourceView::new(&self.candidate.0, &self.candidate.1),
                SourceView::new(&self.canon.0, &self.canon.1),
            )
        }

        pub(crate) fn values(&self, kind: PropertyKind) -> (PropertyValue, PropertyValue) {
            let extractor = PropertyExtractor::default();
            (
                extractor.extract_kind(&self.candidate.1, kind),
                extractor.extract_kind(&self.canon.1, kind),
            )
        }

        pub(crate) fn explain_with(
            &self,
            explainer: &dyn DifferenceExplainer,
            ctx: &ExplainContext<'_>,
        ) -> Option<PropertyDifference> {
            let (a, b) = self.values(explainer.kind());
            explainer.explain(&a, &b, ctx).unwrap()
        }

        pub(crate) fn explain(
            &self,
            explainer: &dyn DifferenceExplainer,
        ) -> Option<PropertyDifference> {
            self.explain_with(explainer, &self.context())
        }
    }
}
