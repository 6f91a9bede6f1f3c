//! Strategy trait and the rewrite plumbing shared by the built-ins

use canonize_explain::{DifferenceType, PropertyDifference, TransformationHints};
use canonize_props::idioms::Site;
use canonize_props::PropertyKind;
use canonize_syntax::visit::{rewrite_nth_expr, with_nth_block_site};
use canonize_syntax::{parse_module, print_module, Expr, FunctionDef, Module, Stmt};

use crate::error::StrategyError;

/// Hint-guided rewrite bound to one property kind
///
/// Strategies are stateless. `generate` rewrites the candidate's syntax tree
/// at the location the hints name and prints the result; it never copies
/// canon text.
pub trait TransformationStrategy: Send + Sync + std::fmt::Debug {
    /// Stable name, reported in the applied-strategy list
    fn name(&self) -> &'static str;

    /// Property kind this strategy serves
    fn kind(&self) -> PropertyKind;

    /// Whether this strategy acts on `difference_type`
    fn handles(&self, difference_type: DifferenceType) -> bool;

    /// Produce a rewritten candidate
    ///
    /// Returns `Ok(None)` when the hinted location no longer holds the idiom
    /// or the rewrite would not change the source.
    ///
    /// # Errors
    /// Returns [`StrategyError`] when the source does not parse or the hints
    /// are not of the shape this strategy expects
    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError>;
}

/// Parse, edit, print; `None` when `edit` declines or leaves the tree as it was
pub(crate) fn rewrite_module<F>(source: &str, edit: F) -> Result<Option<String>, StrategyError>
where
    F: FnOnce(&mut Module) -> Result<bool, StrategyError>,
{
    let mut module = parse_module(source)?;
    let original = module.clone();
    if !edit(&mut module)? || module == original {
        return Ok(None);
    }
    Ok(Some(print_module(&module)))
}

/// Replace the `site.occurrence`-th expression matching `pred` by `rewrite(expr)`,
/// leaving it in place when `rewrite` declines
pub(crate) fn rewrite_expr_with<P>(
    source: &str,
    site: &Site,
    pred: P,
    rewrite: fn(&Expr) -> Option<Expr>,
) -> Result<Option<String>, StrategyError>
where
    P: Fn(&Expr) -> bool,
{
    rewrite_expr_site(source, site, pred, |expr| rewrite(&expr).unwrap_or(expr))
}

pub(crate) fn function_mut<'m>(
    module: &'m mut Module,
    name: &str,
) -> Result<&'m mut FunctionDef, StrategyError> {
    module
        .function_mut(name)
        .ok_or_else(|| StrategyError::missing_function(name))
}

/// Site of a [`TransformationHints::Site`] hint
pub(crate) fn plain_site<'d>(
    strategy: &'static str,
    difference: &'d PropertyDifference,
) -> Result<&'d Site, StrategyError> {
    match &difference.hints {
        TransformationHints::Site { site } => Ok(site),
        other => Err(StrategyError::unexpected_hint(strategy, other.tag())),
    }
}

/// Replace the `site.occurrence`-th expression matching `pred`
pub(crate) fn rewrite_expr_site<P, F>(
    source: &str,
    site: &Site,
    pred: P,
    rewrite: F,
) -> Result<Option<String>, StrategyError>
where
    P: Fn(&Expr) -> bool,
    F: FnOnce(Expr) -> Expr,
{
    rewrite_module(source, |module| {
        let def = function_mut(module, &site.function)?;
        Ok(rewrite_nth_expr(&mut def.body, site.occurrence, pred, rewrite))
    })
}

/// Edit the block holding the `site.occurrence`-th statement position matching `pred`
pub(crate) fn rewrite_block_site<P, F>(
    source: &str,
    site: &Site,
    pred: P,
    edit: F,
) -> Result<Option<String>, StrategyError>
where
    P: Fn(&[Stmt], usize) -> bool,
    F: FnOnce(&mut Vec<Stmt>, usize) -> bool,
{
    rewrite_module(source, |module| {
        let def = function_mut(module, &site.function)?;
        Ok(with_nth_block_site(&mut def.body, site.occurrence, pred, edit).unwrap_or(false))
    })
}

/// Keep a block syntactically non-empty after removals
pub(crate) fn ensure_nonempty(block: &mut Vec<Stmt>) {
    if block.is_empty() {
        block.push(Stmt::Pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unchanged_edit_yields_nothing() {
        let source = "def f(x):\n    return x\n";
        assert_eq!(rewrite_module(source, |_| Ok(true)).unwrap(), None);
        assert_eq!(rewrite_module(source, |_| Ok(false)).unwrap(), None);
    }

    #[test]
    fn missing_function_is_an_error() {
        let site = Site::new("g", 0);
        let err =
            rewrite_expr_site("def f(x):\n    return x\n", &site, |_| true, |e| e).unwrap_err();
        assert_eq!(err, StrategyError::missing_function("g"));
    }

    #[test]
    fn unparsable_source_is_an_error() {
        let err = rewrite_module("def f(:\n", |_| Ok(true)).unwrap_err();
        assert!(matches!(err, StrategyError::Parse(_)));
    }
}
