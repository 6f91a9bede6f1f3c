//! Return chains, `if`/`return` collapse, `else` flattening and direct iteration

use std::collections::BTreeSet;

use canonize_explain::{DifferenceType, PropertyDifference, TransformationHints};
use canonize_props::idioms;
use canonize_props::PropertyKind;
use canonize_syntax::visit::{names_in_body, rewrite_nth_expr, substitute_name, with_nth_block_site};
use canonize_syntax::{module_globals, Expr, Stmt};

use super::fresh_name;
use crate::error::StrategyError;
use crate::strategy::{
    function_mut, plain_site, rewrite_block_site, rewrite_module, TransformationStrategy,
};

/// Folds the assignments feeding a return into the returned expression
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineReturnChain;

impl TransformationStrategy for InlineReturnChain {
    fn name(&self) -> &'static str {
        "inline_return_chain"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::StatementOrdering
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::ConsecutiveStatementsConsolidatable
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::InlineReturn { site, chain_length } = &difference.hints else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        let wanted = *chain_length;
        rewrite_block_site(source, site, idioms::is_return_chain, |block, i| {
            let length = wanted.min(idioms::return_chain_length(block, i));
            let mut at = i;
            for _ in 0..length {
                at -= 1;
                let Stmt::Assign { targets, value, .. } = block.remove(at) else {
                    return false;
                };
                let Some(target) = targets.first().and_then(Expr::as_name) else {
                    return false;
                };
                if let Stmt::Return(Some(returned)) = &mut block[at] {
                    substitute_name(returned, target, &value);
                }
            }
            length > 0
        })
    }
}

/// `if c: return a` / `return b` into `return a if c else b`
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionalExpression;

impl TransformationStrategy for ConditionalExpression {
    fn name(&self) -> &'static str {
        "conditional_expression"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::ControlFlow
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::IfReturnVsConditionalExpression
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_block_site(source, site, idioms::is_if_else_return, |block, i| {
            let Stmt::If {
                test,
                mut body,
                mut orelse,
            } = block.remove(i)
            else {
                return false;
            };
            let otherwise = if orelse.is_empty() {
                block.remove(i)
            } else {
                orelse.remove(0)
            };
            let (Some(Stmt::Return(Some(then_value))), Stmt::Return(Some(else_value))) =
                (body.pop(), otherwise)
            else {
                return false;
            };
            block.insert(
                i,
                Stmt::Return(Some(Expr::IfExp {
                    test: Box::new(test),
                    body: Box::new(then_value),
                    orelse: Box::new(else_value),
                })),
            );
            true
        })
    }
}

/// Hoists the `else` of a branch that always exits
#[derive(Debug, Clone, Copy, Default)]
pub struct FlattenElseAfterReturn;

impl TransformationStrategy for FlattenElseAfterReturn {
    fn name(&self) -> &'static str {
        "flatten_else_after_return"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::ExecutionPaths
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::RedundantElseAfterReturn
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_block_site(source, site, idioms::is_else_after_return, |block, i| {
            let Stmt::If { orelse, .. } = &mut block[i] else {
                return false;
            };
            let hoisted = std::mem::take(orelse);
            block.splice(i + 1..i + 1, hoisted);
            true
        })
    }
}

/// `for i in range(len(xs))` reading only `xs[i]` into `for item in xs`
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectIteration;

impl TransformationStrategy for DirectIteration {
    fn name(&self) -> &'static str {
        "direct_iteration"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::Termination
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::IndexBasedIteration
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_module(source, |module| {
            let globals = module_globals(module);
            let def = function_mut(module, &site.function)?;
            let mut taken: BTreeSet<String> = names_in_body(&def.body);
            taken.extend(def.param_names().map(str::to_string));
            taken.extend(globals);
            let element = fresh_name(&taken, "item");

            let edited = with_nth_block_site(
                &mut def.body,
                site.occurrence,
                idioms::is_index_iteration,
                |block, i| {
                    let Some((index, sequence)) = idioms::index_iteration(block, i)
                        .map(|(index, sequence)| (index.to_string(), sequence.to_string()))
                    else {
                        return false;
                    };
                    let Stmt::For {
                        target, iter, body, ..
                    } = &mut block[i]
                    else {
                        return false;
                    };
                    let is_element = |e: &Expr| {
                        matches!(e, Expr::Subscript { value, index: idx }
                            if value.is_name(&sequence) && idx.is_name(&index))
                    };
                    while rewrite_nth_expr(body, 0, is_element, |_| Expr::name(element.as_str())) {}
                    *target = Expr::name(element.as_str());
                    *iter = Expr::name(sequence.as_str());
                    true
                },
            );
            Ok(edited.unwrap_or(false))
        })
    }
}
