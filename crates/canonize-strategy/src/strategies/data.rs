//! Removal rewrites: dead stores, diagnostics, copies and docstrings

use canonize_explain::{DifferenceType, PropertyDifference, TransformationHints};
use canonize_props::idioms;
use canonize_props::PropertyKind;
use canonize_syntax::visit::rewrite_nth_expr;
use canonize_syntax::{Arg, Expr};

use crate::error::StrategyError;
use crate::strategy::{
    ensure_nonempty, function_mut, plain_site, rewrite_block_site, rewrite_module,
    TransformationStrategy,
};

/// Drops an assignment whose value is never read
///
/// The site's occurrence indexes the function's top-level body directly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeadStoreElimination;

impl TransformationStrategy for DeadStoreElimination {
    fn name(&self) -> &'static str {
        "dead_store_elimination"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::DataDependency
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::DeadStore
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_module(source, |module| {
            let def = function_mut(module, &site.function)?;
            if !idioms::dead_store_indices(def).contains(&site.occurrence) {
                return Ok(false);
            }
            def.body.remove(site.occurrence);
            ensure_nonempty(&mut def.body);
            Ok(true)
        })
    }
}

/// Drops a `print(...)` statement
#[derive(Debug, Clone, Copy, Default)]
pub struct StripDiagnosticOutput;

impl TransformationStrategy for StripDiagnosticOutput {
    fn name(&self) -> &'static str {
        "strip_diagnostic_output"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::SideEffects
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::DiagnosticOutput
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_block_site(source, site, idioms::is_print_statement, |block, i| {
            block.remove(i);
            ensure_nonempty(block);
            true
        })
    }
}

fn materialized(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::Call { args, .. } => match args.as_slice() {
            [Arg::Positional(inner)] => Some(inner.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// `for x in list(xs)` into `for x in xs`
///
/// The site's occurrence counts every `list(...)`/`tuple(...)` call, so the
/// rewrite first checks that this one is only iterated.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnwrapMaterialization;

impl TransformationStrategy for UnwrapMaterialization {
    fn name(&self) -> &'static str {
        "unwrap_materialization"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::Complexity
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::RedundantMaterialization
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_module(source, |module| {
            let def = function_mut(module, &site.function)?;
            if !idioms::redundant_materializations(&def.body).contains(&site.occurrence) {
                return Ok(false);
            }
            Ok(rewrite_nth_expr(
                &mut def.body,
                site.occurrence,
                idioms::is_materializing_call,
                |expr| materialized(&expr).unwrap_or(expr),
            ))
        })
    }
}

/// Drops a function's docstring
#[derive(Debug, Clone, Copy, Default)]
pub struct StripDocstring;

impl TransformationStrategy for StripDocstring {
    fn name(&self) -> &'static str {
        "strip_docstring"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::FunctionContracts
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::ExtraneousDocstring
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::StripDocstring { function } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        rewrite_module(source, |module| {
            let def = function_mut(module, function)?;
            if def.docstring().is_none() {
                return Ok(false);
            }
            def.body.remove(0);
            ensure_nonempty(&mut def.body);
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::testing::{at, run, run_at};
    use pretty_assertions::assert_eq;

    #[test]
    fn dead_store_is_removed() {
        let out = run_at(
            &DeadStoreElimination,
            DifferenceType::DeadStore,
            "def f(x):\n    y = 0\n    y = x\n    return y\n",
        );
        assert_eq!(out.as_deref(), Some("def f(x):\n    y = x\n    return y\n"));
    }

    #[test]
    fn live_store_is_kept() {
        let out = run(
            &DeadStoreElimination,
            DifferenceType::DeadStore,
            TransformationHints::Site { site: at("f", 1) },
            "def f(x):\n    y = 0\n    y = x\n    return y\n",
        );
        assert_eq!(out, None);
    }

    #[test]
    fn print_is_removed_and_block_stays_valid() {
        let out = run_at(
            &StripDiagnosticOutput,
            DifferenceType::DiagnosticOutput,
            "def f(x):\n    if x:\n        print(x)\n    return x\n",
        );
        assert_eq!(
            out.as_deref(),
            Some("def f(x):\n    if x:\n        pass\n    return x\n")
        );
    }

    #[test]
    fn iterated_copy_is_unwrapped() {
        let out = run_at(
            &UnwrapMaterialization,
            DifferenceType::RedundantMaterialization,
            "def f(xs):\n    t = 0\n    for x in list(xs):\n        t += x\n    return t\n",
        );
        assert_eq!(
            out.as_deref(),
            Some("def f(xs):\n    t = 0\n    for x in xs:\n        t += x\n    return t\n")
        );
    }

    #[test]
    fn returned_copy_is_kept() {
        let out = run_at(
            &UnwrapMaterialization,
            DifferenceType::RedundantMaterialization,
            "def f(xs):\n    return list(xs)\n",
        );
        assert_eq!(out, None);
    }

    #[test]
    fn docstring_is_removed() {
        let out = run(
            &StripDocstring,
            DifferenceType::ExtraneousDocstring,
            TransformationHints::StripDocstring {
                function: "f".to_string(),
            },
            "def f(x):\n    \"\"\"Identity.\"\"\"\n    return x\n",
        );
        assert_eq!(out.as_deref(), Some("def f(x):\n    return x\n"));
    }
}
