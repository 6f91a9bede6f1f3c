//! Arithmetic rewrites

use canonize_explain::{DifferenceType, PropertyDifference, TransformationHints};
use canonize_props::idioms;
use canonize_props::PropertyKind;
use canonize_syntax::{BinOp, Expr};

use crate::error::StrategyError;
use crate::strategy::{plain_site, rewrite_expr_with, TransformationStrategy};

fn without_identity(expr: &Expr) -> Option<Expr> {
    let Expr::BinOp { left, op, right } = expr else {
        return None;
    };
    let kept = match (op, &**left, &**right) {
        (BinOp::Add | BinOp::Sub, _, Expr::Int(0)) | (BinOp::Mul | BinOp::Pow, _, Expr::Int(1)) => {
            left
        }
        (BinOp::Add, Expr::Int(0), _) | (BinOp::Mul, Expr::Int(1), _) => right,
        _ => return None,
    };
    Some((**kept).clone())
}

/// `x + 0`, `x * 1`, `x ** 1` into `x`
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityElimination;

impl TransformationStrategy for IdentityElimination {
    fn name(&self) -> &'static str {
        "identity_elimination"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::AlgebraicStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::IdentityOperation
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_expr_with(source, site, idioms::is_identity_operation, without_identity)
    }
}

fn swapped(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::BinOp { left, op, right } if op.is_commutative() => Some(Expr::BinOp {
            left: right.clone(),
            op: *op,
            right: left.clone(),
        }),
        _ => None,
    }
}

/// Swaps the operands of one commutative operation
#[derive(Debug, Clone, Copy, Default)]
pub struct CommutativeSwap;

impl TransformationStrategy for CommutativeSwap {
    fn name(&self) -> &'static str {
        "commutative_swap"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::AlgebraicStructure
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::CommutativeOperandOrder
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_expr_with(source, site, idioms::is_commutative_binop, swapped)
    }
}

fn power_to_product(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::BinOp {
            left,
            op: BinOp::Pow,
            ..
        } => Some(Expr::binop((**left).clone(), BinOp::Mul, (**left).clone())),
        _ => None,
    }
}

fn product_to_power(expr: &Expr) -> Option<Expr> {
    match expr {
        Expr::BinOp {
            left,
            op: BinOp::Mul,
            ..
        } => Some(Expr::binop((**left).clone(), BinOp::Pow, Expr::Int(2))),
        _ => None,
    }
}

/// `x ** 2` and `x * x` into one another
#[derive(Debug, Clone, Copy, Default)]
pub struct PowerMultiplication;

impl TransformationStrategy for PowerMultiplication {
    fn name(&self) -> &'static str {
        "power_multiplication"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NumericalBehavior
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::PowerVsMultiplication
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let TransformationHints::PowerForm {
            site,
            to_multiplication,
        } = &difference.hints
        else {
            return Err(StrategyError::unexpected_hint(self.name(), difference.hints.tag()));
        };
        if *to_multiplication {
            rewrite_expr_with(source, site, idioms::is_power_two, power_to_product)
        } else {
            rewrite_expr_with(source, site, idioms::is_self_multiplication, product_to_power)
        }
    }
}

fn floored(expr: &Expr) -> Option<Expr> {
    let (_, args) = expr.as_simple_call()?;
    match args.as_slice() {
        [Expr::BinOp {
            left,
            op: BinOp::Div,
            right,
        }] => Some(Expr::BinOp {
            left: left.clone(),
            op: BinOp::FloorDiv,
            right: right.clone(),
        }),
        _ => None,
    }
}

/// `int(a / b)` into `a // b`
#[derive(Debug, Clone, Copy, Default)]
pub struct FloorDivision;

impl TransformationStrategy for FloorDivision {
    fn name(&self) -> &'static str {
        "floor_division"
    }

    fn kind(&self) -> PropertyKind {
        PropertyKind::NumericalBehavior
    }

    fn handles(&self, difference_type: DifferenceType) -> bool {
        difference_type == DifferenceType::TruncatingDivision
    }

    fn generate(
        &self,
        difference: &PropertyDifference,
        source: &str,
    ) -> Result<Option<String>, StrategyError> {
        let site = plain_site(self.name(), difference)?;
        rewrite_expr_with(source, site, idioms::is_truncating_division, floored)
    }
}
