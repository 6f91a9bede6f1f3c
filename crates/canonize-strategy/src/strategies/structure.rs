//! Loop builders, literal spelling and identifier renames

use canonize_explain::{DifferenceType, PropertyDifference, RenamePair, TransformationHints};
use canonize_props::idioms::{self, LoopBuild};
use canonize_props::PropertyKind;
use canonize_syntax::visit::rename_in_body;
use canonize_syntax::{
    Arg, Comprehension, ComprehensionClause, ComprehensionKind, Expr, FunctionDef, Stmt, StrLit,
};

use crate::error::StrategyError;
use crate::strategy::{
    function_mut, plain_site, rewrite_block_site, rewrite_expr_site, rewrite_module,
    TransformationStrategy,
};

fn comprehension(build: &LoopBuild<'_>, kind: ComprehensionKind) -> Expr {
    Expr::Comprehension(Box::new(Comprehension {
        kind,
        element: build.element.clone(),
        value: None,
        clauses: vec![ComprehensionClause {
            target: build.target.clone(),
            iter: build.iter.clone(),
            ifs: build.condition.into_iter().cloned().collect(),
        }],
    }))
}

/// Replace `block[i]` (the initializer) and `block[i + 1]` (the loop) by one assignment
fn collapse(block: &mut Vec<Stmt>, i: usize, accumulator: String, value: Expr) {
    block[i] = Stmt::Assign {
        targets: vec![Expr::Name(accumulator)],
        value,
        annotation: None,
    };
    block.remove(i + 1);
}

/// `out = []` plus an appending loop into a list comprehension
#[derive(Debug, Clone, Copy, Default)]
pub struct LoopToComprehension;

impl TransformationStrategy for LoopToComprehension {
    fn name(&self) -> &'static str {
        "loop_to_comprehension"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NormalizedStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::AccumulatorLoopVsComprehension
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_block_site(source, site, idioms::is_accumulator_loop, |block, i| {
            let Some((accumulator, value)) = idioms::accumulator_loop(block, i).map(|build| {
                (
                    build.accumulator.to_string(),
                    comprehension(&build, ComprehensionKind::List),
                )
            }) else {
                return false;
            };
            collapse(block, i, accumulator, value);
            true
        })
    }
}

fn joined(build: &LoopBuild<'_>) -> Expr {
    let items = if build.condition.is_none() && build.element == build.target {
        build.iter.clone()
    } else {
        comprehension(build, ComprehensionKind::Generator)
    };
    Expr::Call {
        func: Box::new(Expr::Attribute {
            value: Box::new(Expr::Str(StrLit::plain(""))),
            attr: "join".to_string(),
        }),
        args: vec![Arg::Positional(items)],
    }
}

/// `s = ''` plus a concatenating loop into `''.join(...)`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcatToJoin;

impl TransformationStrategy for ConcatToJoin {
    fn name(&self) -> &'static str {
        "concat_to_join"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NormalizedStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::StringConcatenationVsJoin
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_block_site(source, site, idioms::is_concat_loop, |block, i| {
            let Some((accumulator, value)) = idioms::concat_loop(block, i)
                .map(|build| (build.accumulator.to_string(), joined(&build)))
            else {
                return false;
            };
            collapse(block, i, accumulator, value);
            true
        })
    }
}

/// Respells one string literal
///
/// Serves both plain literal variants and regex character-class variants;
/// the literal is only replaced while it still reads as the hinted `from`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralAlignment;

impl TransformationStrategy for LiteralAlignment {
    fn name(&self) -> &'static str {
        "literal_alignment"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NormalizedStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        matches!(
            difference_type,
            DifferenceType::StringLiteralVariant | DifferenceType::RegexCharacterClassVariant
        )
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::LiteralAlignment { site, from, to } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        rewrite_expr_site(
            source,
            site,
            |e| matches!(e, Expr::Str(_)),
            |expr| match expr {
                Expr::Str(mut lit) if !lit.bytes && lit.value == *from => {
                    lit.value.clone_from(to);
                    Expr::Str(lit)
                }
                other => other,
            },
        )
    }
}

fn rename_scope(def: &mut FunctionDef, from: &str, to: &str) {
    for param in &mut def.params {
        if param.name == from {
            param.name = to.to_string();
        }
    }
    rename_in_body(&mut def.body, from, to);
}

/// Applies a set of renames to one function, simultaneously
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentifierRename;

impl IdentifierRename {
    fn apply(def: &mut FunctionDef, renames: &[RenamePair]) {
        let staged: Vec<String> = (0..renames.len())
            .map(|n| format!("__canonize_rename_{n}"))
            .collect();
        for (pair, temporary) in renames.iter().zip(&staged) {
            rename_scope(def, &pair.from, temporary);
        }
        for (pair, temporary) in renames.iter().zip(&staged) {
            rename_scope(def, temporary, &pair.to);
        }
    }
}

impl TransformationStrategy for IdentifierRename {
    fn name(&self) -> &'static str {
        "identifier_rename"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NormalizedStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::IdentifierNaming
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::Rename { function, renames } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        rewrite_module(source, |module| {
            let def = function_mut(module, function)?;
            Self::apply(def, renames);
            Ok(!renames.is_empty())
        })
    }
}
