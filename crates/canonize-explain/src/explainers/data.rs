//! Data-flow, effect, cost and interface explainers

use canonize_props::idioms;
use canonize_props::{PropertyKind, PropertyValue};

use super::{counted, mismatch};
use crate::context::ExplainContext;
use crate::difference::{DifferenceType, PropertyDifference, TransformationHints};
use crate::error::ExplainError;
use crate::explainer::DifferenceExplainer;

/// Stores whose value is never read
#[derive(Debug, Clone, Copy, Default)]
pub struct DataDependencyExplainer;

impl DifferenceExplainer for DataDependencyExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::DataDependency
    }

    fn name(&self) -> &'static str {
        "data_dependency"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::DataDependency(a), PropertyValue::DataDependency(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.dead_stores <= b.dead_stores {
            return Ok(None);
        }
        let Some(site) = idioms::dead_store_sites(ctx.candidate.module)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(DifferenceType::DeadStore, TransformationHints::Site { site })
                .with_explanation("candidate assigns a value that is overwritten or never read")
                .with_details(
                    counted(a.dead_stores, "dead store"),
                    counted(b.dead_stores, "dead store"),
                ),
        ))
    }
}

/// Diagnostic printing
#[derive(Debug, Clone, Copy, Default)]
pub struct SideEffectsExplainer;

impl DifferenceExplainer for SideEffectsExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::SideEffects
    }

    fn name(&self) -> &'static str {
        "side_effects"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::SideEffects(a), PropertyValue::SideEffects(b)) = (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.prints <= b.prints {
            return Ok(None);
        }
        let Some(site) = ctx
            .candidate
            .stmt_sites(&idioms::is_print_statement)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::DiagnosticOutput,
                TransformationHints::Site { site },
            )
            .with_explanation("candidate prints diagnostic output")
            .with_details(counted(a.prints, "print"), counted(b.prints, "print")),
        ))
    }
}

/// Materializations whose result is only iterated
#[derive(Debug, Clone, Copy, Default)]
pub struct ComplexityExplainer;

impl DifferenceExplainer for ComplexityExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::Complexity
    }

    fn name(&self) -> &'static str {
        "complexity"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::Complexity(a), PropertyValue::Complexity(b)) = (candidate, canon) else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if a.materializations <= b.materializations {
            return Ok(None);
        }
        let Some(site) = idioms::materialization_sites(ctx.candidate.module)
            .into_iter()
            .next()
        else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::RedundantMaterialization,
                TransformationHints::Site { site },
            )
            .with_explanation("candidate copies an iterable into a list only to iterate it")
            .with_details(
                counted(a.materializations, "materialization"),
                counted(b.materializations, "materialization"),
            ),
        ))
    }
}

/// Docstrings the canon does not carry
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionContractsExplainer;

impl DifferenceExplainer for FunctionContractsExplainer {
    fn kind(&self) -> PropertyKind {
        PropertyKind::FunctionContracts
    }

    fn name(&self) -> &'static str {
        "function_contracts"
    }

    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let (PropertyValue::FunctionContracts(a), PropertyValue::FunctionContracts(b)) =
            (candidate, canon)
        else {
            return Err(mismatch(self.kind(), candidate, canon));
        };
        if !a.docstring || b.docstring {
            return Ok(None);
        }
        let Some(entry) = ctx.candidate.entry(ctx.entry_point) else {
            return Ok(None);
        };
        Ok(Some(
            PropertyDifference::new(
                DifferenceType::ExtraneousDocstring,
                TransformationHints::StripDocstring {
                    function: entry.name.clone(),
                },
            )
            .with_explanation(format!(
                "candidate documents `{}`; canon carries no docstring",
                entry.name
            ))
            .with_details("docstring", "none"),
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
    fn dead_store_site_indexes_the_body() {
        let pair = Pair::new(
            "def f(x):\n    y = 0\n    y = x\n    return y\n",
            "def f(x):\n    y = x\n    return y\n",
        );
        let diff = pair.explain(&DataDependencyExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::DeadStore);
        assert_eq!(diff.hints, TransformationHints::Site { site: Site::new("f", 0) });
    }

    #[test]
    fn diagnostic_print() {
        let pair = Pair::new(
            "def f(x):\n    print(x)\n    return x\n",
            "def f(x):\n    return x\n",
        );
        let diff = pair.explain(&SideEffectsExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::DiagnosticOutput);
        // printed output is rewritten away, unlike the recursion diagnostics
        assert!(!diff.difference_type.is_diagnostic());
    }

    #[test]
    fn canon_printing_is_not_reported() {
        let pair = Pair::new(
            "def f(x):\n    return x\n",
            "def f(x):\n    print(x)\n    return x\n",
        );
        assert!(pair.explain(&SideEffectsExplainer).is_none());
    }

    #[test]
    fn redundant_materialization() {
        let pair = Pair::new(
            "def f(xs):\n    return sum(list(xs))\n",
            "def f(xs):\n    return sum(xs)\n",
        );
        let diff = pair.explain(&ComplexityExplainer).unwrap();
        assert_eq!(diff.difference_type, DifferenceType::RedundantMaterialization);
    }

    #[test]
    fn extraneous_docstring_names_the_entry() {
        let pair = Pair::new(
            "def area(r):\n    \"\"\"Area.\"\"\"\n    return r * r\n",
            "def area(r):\n    return r * r\n",
        );
        let diff = pair.explain(&FunctionContractsExplainer).unwrap();
        assert_eq!(
            diff.hints,
            TransformationHints::StripDocstring {
                function: "area".to_string()
            }
        );
    }
}
