//! Expression-shape facets: operators, numerics, boolean forms and
//! statement layout

use canonize_syntax::visit::{
    block_sites, child_blocks, find_exprs, walk_body, walk_expr, walk_stmt, Visitor,
};
use canonize_syntax::{print_expr, BinOp, Expr, Stmt};

use super::Analysis;
use crate::idioms;
use crate::value::{Algebraic, Logical, Numerical};

fn function_exprs<'m>(analysis: &Analysis<'m>, pred: impl Fn(&Expr) -> bool) -> Vec<&'m Expr> {
    analysis
        .module
        .functions()
        .flat_map(|def| find_exprs(&def.body, &pred))
        .collect()
}

fn count(analysis: &Analysis<'_>, pred: impl Fn(&Expr) -> bool) -> usize {
    function_exprs(analysis, pred).len()
}

fn augmented_ops(analysis: &Analysis<'_>) -> Vec<BinOp> {
    analysis
        .module
        .functions()
        .flat_map(|def| {
            block_sites(&def.body, |b, i| matches!(b[i], Stmt::AugAssign { .. }))
                .into_iter()
                .filter_map(|(block, i)| match &block[i] {
                    Stmt::AugAssign { op, .. } => Some(*op),
                    _ => None,
                })
        })
        .collect()
}

pub(crate) fn algebraic(analysis: &Analysis<'_>) -> Algebraic {
    let mut result = Algebraic::default();
    for def in analysis.module.functions() {
        let params: Vec<&str> = def.param_names().collect();
        for expr in find_exprs(&def.body, |e| matches!(e, Expr::BinOp { .. })) {
            if let Expr::BinOp { op, .. } = expr {
                *result.operators.entry(op.symbol().to_string()).or_default() += 1;
            }
            if let Some(signature) = idioms::commutative_signature(expr, &params) {
                result.commutative_orders.push(signature);
            }
            if idioms::is_identity_operation(expr) {
                result.identity_operations += 1;
            }
        }
    }
    for op in augmented_ops(analysis) {
        *result.operators.entry(op.symbol().to_string()).or_default() += 1;
    }
    result
}

fn is_binop(expr: &Expr, wanted: BinOp) -> bool {
    matches!(expr, Expr::BinOp { op, .. } if *op == wanted)
}

fn is_call_to(expr: &Expr, names: &[&str]) -> bool {
    match expr {
        Expr::Call { func, .. } => match &**func {
            Expr::Name(name) => names.contains(&name.as_str()),
            Expr::Attribute { attr, .. } => names.contains(&attr.as_str()),
            _ => false,
        },
        _ => false,
    }
}

pub(crate) fn numerical(analysis: &Analysis<'_>) -> Numerical {
    let augmented = augmented_ops(analysis);
    let with_augmented = |op: BinOp| {
        count(analysis, |e| is_binop(e, op)) + augmented.iter().filter(|a| **a == op).count()
    };
    Numerical {
        true_divisions: with_augmented(BinOp::Div),
        floor_divisions: with_augmented(BinOp::FloorDiv),
        truncating_divisions: count(analysis, idioms::is_truncating_division),
        modulos: with_augmented(BinOp::Mod),
        powers: with_augmented(BinOp::Pow),
        self_multiplications: count(analysis, idioms::is_self_multiplication),
        float_literals: count(analysis, |e| matches!(e, Expr::Float(_))),
        int_casts: count(analysis, |e| matches!(e, Expr::Call { func, .. } if func.is_name("int"))),
        float_casts: count(analysis, |e| {
            matches!(e, Expr::Call { func, .. } if func.is_name("float"))
        }),
        rounding_calls: count(analysis, |e| is_call_to(e, &["ceil", "floor", "round"])),
    }
}

#[derive(Default)]
struct Conditions {
    printed: Vec<String>,
}

impl<'ast> Visitor<'ast> for Conditions {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::If { test, .. } | Stmt::While { test, .. } | Stmt::Assert { test, .. } => {
                self.printed.push(print_expr(test));
            }
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::IfExp { test, .. } = expr {
            self.printed.push(print_expr(test));
        }
        walk_expr(self, expr);
    }
}

pub(crate) fn logical(analysis: &Analysis<'_>) -> Logical {
    let normalized_conditions = analysis.enhanced.then(|| {
        let mut conditions = Conditions::default();
        for def in analysis.module.functions() {
            walk_body(&mut conditions, &def.body);
        }
        conditions.printed
    });
    Logical {
        length_empty_checks: count(analysis, idioms::is_length_check),
        truthiness_negations: count(analysis, idioms::is_negated_truthiness),
        bool_literal_comparisons: count(analysis, idioms::is_bool_literal_comparison),
        negated_comparisons: count(analysis, idioms::is_negated_comparison),
        boolean_operators: count(analysis, |e| matches!(e, Expr::BoolOp { .. })),
        normalized_conditions,
    }
}

/// Operator skeleton with every leaf erased
fn skeleton(expr: &Expr) -> String {
    match expr {
        Expr::BinOp { left, op, right } => {
            format!("({} {} {})", op.symbol(), skeleton(left), skeleton(right))
        }
        Expr::BoolOp { op, left, right } => {
            format!("({} {} {})", op.symbol(), skeleton(left), skeleton(right))
        }
        Expr::Unary { op, operand } => format!("({} {})", op.symbol(), skeleton(operand)),
        Expr::Compare {
            left,
            ops,
            comparators,
        } => {
            let ops: Vec<&str> = ops.iter().map(|op| op.symbol()).collect();
            let operands: Vec<String> = std::iter::once(&**left)
                .chain(comparators)
                .map(skeleton)
                .collect();
            format!("({} {})", ops.join(" "), operands.join(" "))
        }
        Expr::Call { args, .. } if args.is_empty() => "(call)".to_string(),
        Expr::Call { args, .. } => {
            let args: Vec<String> = args.iter().map(|arg| skeleton(arg.value())).collect();
            format!("(call {})", args.join(" "))
        }
        Expr::IfExp { test, body, orelse } => format!(
            "(if {} {} {})",
            skeleton(test),
            skeleton(body),
            skeleton(orelse)
        ),
        _ => "_".to_string(),
    }
}

pub(crate) fn operator_precedence(analysis: &Analysis<'_>) -> Vec<String> {
    let mut skeletons = Vec::new();
    for def in analysis.module.functions() {
        for (block, i) in block_sites(&def.body, |_, _| true) {
            match &block[i] {
                Stmt::Return(Some(value)) | Stmt::Expr(value) | Stmt::Assign { value, .. } => {
                    skeletons.push(skeleton(value));
                }
                Stmt::AugAssign { op, value, .. } => {
                    skeletons.push(format!("({}= _ {})", op.symbol(), skeleton(value)));
                }
                _ => {}
            }
        }
    }
    skeletons
}

fn ordering(block: &[Stmt], depth: usize, out: &mut Vec<String>) {
    for stmt in block {
        out.push(format!("{depth}:{}", stmt.kind_name()));
        for child in child_blocks(stmt) {
            ordering(child, depth + 1, out);
        }
    }
}

pub(crate) fn statement_ordering(analysis: &Analysis<'_>) -> Vec<String> {
    let mut out = Vec::new();
    ordering(&analysis.module.body, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_syntax::{alpha_normalize, parse_module};
    use pretty_assertions::assert_eq;

    fn analyse<T>(source: &str, f: impl Fn(&Analysis<'_>) -> T) -> T {
        let module = alpha_normalize(&parse_module(source).unwrap());
        let analysis = Analysis {
            module: &module,
            entry: module.primary_function(),
            enhanced: true,
        };
        f(&analysis)
    }

    #[test]
    fn operand_order_is_recorded() {
        let a = analyse("def f(n):\n    return n * 2\n", algebraic);
        let b = analyse("def f(n):\n    return 2 * n\n", algebraic);
        assert_eq!(a.operators, b.operators);
        assert_eq!(a.commutative_orders, vec!["*:param0,literal"]);
        assert_eq!(b.commutative_orders, vec!["*:literal,param0"]);
    }

    #[test]
    fn swapped_parameters_sign_differently() {
        let a = analyse("def f(a, b):\n    t = a\n    return b + t\n", algebraic);
        let b = analyse("def f(a, b):\n    return b + a\n", algebraic);
        assert_eq!(a.commutative_orders, vec!["+:param1,name"]);
        assert_eq!(b.commutative_orders, vec!["+:param1,param0"]);
    }

    #[test]
    fn augmented_operators_count() {
        let a = analyse("def f(xs):\n    t = 0\n    for x in xs:\n        t += x + 0\n    return t\n", algebraic);
        assert_eq!(a.operators["+"], 2);
        assert_eq!(a.identity_operations, 1);
    }

    #[test]
    fn numeric_forms() {
        let n = analyse("def f(a, b):\n    return int(a / b) + a ** 2 + b * b + 0.5\n", numerical);
        assert_eq!(n.true_divisions, 1);
        assert_eq!(n.truncating_divisions, 1);
        assert_eq!(n.powers, 1);
        assert_eq!(n.self_multiplications, 1);
        assert_eq!(n.float_literals, 1);
        assert_eq!(n.int_casts, 1);
    }

    #[test]
    fn boolean_forms() {
        let l = analyse(
            "def f(xs, ok):\n    if len(xs) == 0 or ok == True:\n        return not xs\n    return not (xs < 1)\n",
            logical,
        );
        assert_eq!(l.length_empty_checks, 1);
        assert_eq!(l.bool_literal_comparisons, 1);
        assert_eq!(l.truthiness_negations, 1);
        assert_eq!(l.negated_comparisons, 1);
        assert_eq!(l.boolean_operators, 1);
        assert_eq!(
            l.normalized_conditions,
            Some(vec!["len(_v0) == 0 or _v1 == True".to_string()])
        );
    }

    #[test]
    fn grouping_changes_the_skeleton() {
        let right = analyse("def f(a, b, c):\n    return a + (b + c)\n", operator_precedence);
        let left = analyse("def f(a, b, c):\n    return a + b + c\n", operator_precedence);
        assert_eq!(right, vec!["(+ _ (+ _ _))"]);
        assert_eq!(left, vec!["(+ (+ _ _) _)"]);
    }

    #[test]
    fn ordering_records_depth() {
        let order = analyse(
            "def f(x):\n    if x:\n        print(x)\n    return x\n",
            statement_ordering,
        );
        assert_eq!(order, vec!["0:def", "1:if", "2:expr", "1:return"]);
    }
}
