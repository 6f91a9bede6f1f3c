//! Idiom detectors
//!
//! Each detector is a structural predicate over an expression or over a
//! statement position `(block, index)`. Properties count matches; the
//! explainers report them as [`Site`]s, addressing the n-th match of the
//! same predicate in pre-order within one top-level function. Because
//! alpha-normalization never changes tree shape, an occurrence index found
//! on a normalized module addresses the same node in the original.

use canonize_syntax::visit::{
    block_sites, count_name, find_exprs, find_in_expr, names_in_body, names_in_expr, walk_expr,
    walk_stmt, Visitor,
};
use canonize_syntax::{
    bound_names, declared_outer, Arg, BinOp, CmpOp, Expr, FunctionDef, Module, Stmt, UnaryOp,
};
use serde::{Deserialize, Serialize};

/// Location of an idiom inside a top-level function
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Site {
    /// Top-level function name
    pub function: String,
    /// Pre-order index among matches of the detector's predicate
    pub occurrence: usize,
}

impl Site {
    /// Create a site
    #[must_use]
    pub fn new(function: impl Into<String>, occurrence: usize) -> Self {
        Self {
            function: function.into(),
            occurrence,
        }
    }
}

// ---------------------------------------------------------------------------
// Expression predicates
// ---------------------------------------------------------------------------

/// Side-effect-free and fully modelled, so duplicating or dropping it is safe
#[must_use]
pub fn is_pure(expr: &Expr) -> bool {
    expr.is_call_free() && find_in_expr(expr, |e| matches!(e, Expr::Opaque(_))).is_empty()
}

/// Operand of `len(E) <op> k` and whether the test asks for emptiness
#[must_use]
pub fn length_check(expr: &Expr) -> Option<(&Expr, bool)> {
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = expr
    else {
        return None;
    };
    let ([op], [Expr::Int(k)]) = (ops.as_slice(), comparators.as_slice()) else {
        return None;
    };
    let (callee, args) = left.as_simple_call()?;
    if callee != "len" || args.len() != 1 {
        return None;
    }
    let empty = match (op, k) {
        (CmpOp::Eq, 0) | (CmpOp::Lt, 1) | (CmpOp::LtE, 0) => true,
        (CmpOp::NotEq, 0) | (CmpOp::Gt, 0) | (CmpOp::GtE, 1) => false,
        _ => return None,
    };
    Some((args[0], empty))
}

/// Either form of [`length_check`]
#[must_use]
pub fn is_length_check(expr: &Expr) -> bool {
    length_check(expr).is_some()
}

/// `len(E) == 0` and equivalents
#[must_use]
pub fn is_len_empty_check(expr: &Expr) -> bool {
    matches!(length_check(expr), Some((_, true)))
}

/// `len(E) != 0` and equivalents
#[must_use]
pub fn is_len_nonempty_check(expr: &Expr) -> bool {
    matches!(length_check(expr), Some((_, false)))
}

/// `not E` where `E` is not a comparison
#[must_use]
pub fn is_negated_truthiness(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Unary { op: UnaryOp::Not, operand } if !matches!(**operand, Expr::Compare { .. })
    )
}

/// `E == True`, `E is False` and the like
#[must_use]
pub fn is_bool_literal_comparison(expr: &Expr) -> bool {
    let Expr::Compare {
        left,
        ops,
        comparators,
    } = expr
    else {
        return false;
    };
    let ([op], [right]) = (ops.as_slice(), comparators.as_slice()) else {
        return false;
    };
    matches!(op, CmpOp::Eq | CmpOp::NotEq | CmpOp::Is | CmpOp::IsNot)
        && (matches!(**left, Expr::Bool(_)) ^ matches!(right, Expr::Bool(_)))
}

/// `not (a op b)` with a single comparison
#[must_use]
pub fn is_negated_comparison(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Unary { op: UnaryOp::Not, operand }
            if matches!(&**operand, Expr::Compare { ops, .. } if ops.len() == 1)
    )
}

/// `x + 0`, `0 + x`, `x - 0`, `x * 1`, `1 * x`, `x ** 1`
#[must_use]
pub fn is_identity_operation(expr: &Expr) -> bool {
    let Expr::BinOp { left, op, right } = expr else {
        return false;
    };
    match op {
        BinOp::Add => matches!(**right, Expr::Int(0)) || matches!(**left, Expr::Int(0)),
        BinOp::Sub => matches!(**right, Expr::Int(0)),
        BinOp::Mul => matches!(**right, Expr::Int(1)) || matches!(**left, Expr::Int(1)),
        BinOp::Pow => matches!(**right, Expr::Int(1)),
        _ => false,
    }
}

/// `E ** 2` with a pure base
#[must_use]
pub fn is_power_two(expr: &Expr) -> bool {
    matches!(expr, Expr::BinOp { left, op: BinOp::Pow, right }
        if matches!(**right, Expr::Int(2)) && is_pure(left))
}

/// `E * E` with a pure operand
#[must_use]
pub fn is_self_multiplication(expr: &Expr) -> bool {
    matches!(expr, Expr::BinOp { left, op: BinOp::Mul, right } if left == right && is_pure(left))
}

/// `int(a / b)`
#[must_use]
pub fn is_truncating_division(expr: &Expr) -> bool {
    matches!(
        expr.as_simple_call(),
        Some(("int", args))
            if args.len() == 1 && matches!(args[0], Expr::BinOp { op: BinOp::Div, .. })
    )
}

/// `a op (b op c)` for an associative operator
#[must_use]
pub fn is_right_nested(expr: &Expr) -> bool {
    matches!(expr, Expr::BinOp { op, right, .. }
        if op.is_associative() && matches!(&**right, Expr::BinOp { op: inner, .. } if inner == op))
}

/// `(a op b) op c` for an associative operator
#[must_use]
pub fn is_left_nested(expr: &Expr) -> bool {
    matches!(expr, Expr::BinOp { op, left, .. }
        if op.is_associative() && matches!(&**left, Expr::BinOp { op: inner, .. } if inner == op))
}

/// Binary operation with a commutative operator
#[must_use]
pub fn is_commutative_binop(expr: &Expr) -> bool {
    matches!(expr, Expr::BinOp { op, .. } if op.is_commutative())
}

/// `list(E)` or `tuple(E)` with one plain argument
#[must_use]
pub fn is_materializing_call(expr: &Expr) -> bool {
    let Expr::Call { func, args } = expr else {
        return false;
    };
    (func.is_name("list") || func.is_name("tuple"))
        && matches!(args.as_slice(), [Arg::Positional(inner)] if !matches!(inner, Expr::Starred(_)))
}

/// Conditional expression
#[must_use]
pub fn is_conditional_expression(expr: &Expr) -> bool {
    matches!(expr, Expr::IfExp { .. })
}

/// `''.join(...)`
#[must_use]
pub fn is_join_call(expr: &Expr) -> bool {
    matches!(expr, Expr::Call { func, .. } if matches!(
        &**func,
        Expr::Attribute { value, attr } if attr == "join" && matches!(**value, Expr::Str(_))
    ))
}

/// List comprehension
#[must_use]
pub fn is_list_comprehension(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Comprehension(comp) if comp.kind == canonize_syntax::ComprehensionKind::List
    )
}

/// Coarse operand class used for operand-order signatures
#[must_use]
pub fn operand_class(expr: &Expr) -> &'static str {
    match expr {
        Expr::Name(_) => "name",
        e if e.is_literal() => "literal",
        Expr::Call { .. } => "call",
        Expr::BinOp { .. } | Expr::Unary { .. } => "arith",
        Expr::Subscript { .. } | Expr::Attribute { .. } => "access",
        _ => "expr",
    }
}

/// Operand-order signature of a commutative operation
///
/// A name operand that is one of `params` is signed by its position
/// (`param0`, `param1`, ...), so `b + a` and `a + b` sign differently.
/// Other names all sign as `name`.
#[must_use]
pub fn commutative_signature(expr: &Expr, params: &[&str]) -> Option<String> {
    let sign = |operand: &Expr| -> String {
        operand
            .as_name()
            .and_then(|name| params.iter().position(|p| *p == name))
            .map_or_else(|| operand_class(operand).to_string(), |i| format!("param{i}"))
    };
    match expr {
        Expr::BinOp { left, op, right } if op.is_commutative() => {
            Some(format!("{}:{},{}", op.symbol(), sign(left), sign(right)))
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Statement-position predicates
// ---------------------------------------------------------------------------

fn single_name_assign(stmt: &Stmt) -> Option<(&str, &Expr)> {
    match stmt {
        Stmt::Assign {
            targets,
            value,
            annotation: None,
        } if targets.len() == 1 => targets[0].as_name().map(|name| (name, value)),
        _ => None,
    }
}

fn introduces_scope(expr: &Expr) -> bool {
    !find_in_expr(expr, |e| {
        matches!(e, Expr::Lambda { .. } | Expr::Comprehension(_))
    })
    .is_empty()
}

/// Whether `consumer` may absorb the preceding assignment to `target`
fn inlinable(consumer: &Expr, target: &str) -> bool {
    count_name(consumer, target) == 1
        && !introduces_scope(consumer)
        && (consumer.is_name(target) || consumer.is_call_free())
}

/// `t = v` immediately followed by `return e` where `e` reads `t` once
#[must_use]
pub fn is_return_chain(block: &[Stmt], i: usize) -> bool {
    return_chain_length(block, i) > 0
}

/// Number of assignments the return at `block[i]` can absorb
#[must_use]
pub fn return_chain_length(block: &[Stmt], i: usize) -> usize {
    let Some(Stmt::Return(Some(returned))) = block.get(i) else {
        return 0;
    };
    if i == 0 {
        return 0;
    }
    let Some((target, _)) = single_name_assign(&block[i - 1]) else {
        return 0;
    };
    if !inlinable(returned, target) {
        return 0;
    }
    let mut length = 1;
    let mut j = i - 1;
    while j > 0 {
        let Some((_, later)) = single_name_assign(&block[j]) else {
            break;
        };
        match single_name_assign(&block[j - 1]) {
            Some((earlier, _)) if earlier == target && inlinable(later, target) => {
                length += 1;
                j -= 1;
            }
            _ => break,
        }
    }
    length
}

/// `if c: return a` with `else: return b` or a following `return b`
#[must_use]
pub fn is_if_else_return(block: &[Stmt], i: usize) -> bool {
    let Some(Stmt::If { body, orelse, .. }) = block.get(i) else {
        return false;
    };
    let returns_value = |stmts: &[Stmt]| matches!(stmts, [Stmt::Return(Some(_))]);
    if !returns_value(body.as_slice()) {
        return false;
    }
    if orelse.is_empty() {
        matches!(block.get(i + 1), Some(Stmt::Return(Some(_))))
    } else {
        returns_value(orelse.as_slice())
    }
}

/// `return a if c else b`
#[must_use]
pub fn is_return_conditional(block: &[Stmt], i: usize) -> bool {
    matches!(block.get(i), Some(Stmt::Return(Some(Expr::IfExp { .. }))))
}

/// `if` whose body always leaves the block yet carries an `else`
#[must_use]
pub fn is_else_after_return(block: &[Stmt], i: usize) -> bool {
    matches!(block.get(i), Some(Stmt::If { body, orelse, .. })
        if !orelse.is_empty() && body.last().is_some_and(Stmt::is_terminal))
}

/// `print(...)` statement
#[must_use]
pub fn is_print_statement(block: &[Stmt], i: usize) -> bool {
    block.get(i).is_some_and(|stmt| stmt.is_call_to("print"))
}

/// Parts of an accumulate-in-a-loop construction
#[derive(Debug, Clone, Copy)]
pub struct LoopBuild<'a> {
    /// Accumulator name
    pub accumulator: &'a str,
    /// Loop target
    pub target: &'a Expr,
    /// Iterable
    pub iter: &'a Expr,
    /// Appended or concatenated element
    pub element: &'a Expr,
    /// Optional filter
    pub condition: Option<&'a Expr>,
}

fn loop_build<'a>(
    block: &'a [Stmt],
    i: usize,
    init: impl Fn(&Expr) -> bool,
    step: impl Fn(&'a Stmt, &str) -> Option<&'a Expr>,
) -> Option<LoopBuild<'a>> {
    let (accumulator, value) = single_name_assign(block.get(i)?)?;
    if !init(value) {
        return None;
    }
    let Stmt::For {
        target,
        iter,
        body,
        orelse,
    } = block.get(i + 1)?
    else {
        return None;
    };
    if !orelse.is_empty() {
        return None;
    }
    let (element, condition) = match body.as_slice() {
        [single] => match single {
            Stmt::If {
                test,
                body: inner,
                orelse: inner_else,
            } if inner_else.is_empty() && inner.len() == 1 => {
                (step(&inner[0], accumulator)?, Some(test))
            }
            other => (step(other, accumulator)?, None),
        },
        _ => return None,
    };
    let mentions = |e: &Expr| names_in_expr(e).contains(accumulator);
    if mentions(element) || mentions(iter) || mentions(target) || condition.is_some_and(mentions) {
        return None;
    }
    Some(LoopBuild {
        accumulator,
        target,
        iter,
        element,
        condition,
    })
}

/// `acc = []` followed by `for x in xs: acc.append(e)` (optionally filtered)
#[must_use]
pub fn accumulator_loop(block: &[Stmt], i: usize) -> Option<LoopBuild<'_>> {
    loop_build(
        block,
        i,
        |value| matches!(value, Expr::List(items) if items.is_empty()),
        |stmt, acc| match stmt {
            Stmt::Expr(Expr::Call { func, args }) => match (&**func, args.as_slice()) {
                (Expr::Attribute { value, attr }, [Arg::Positional(element)])
                    if attr == "append" && value.is_name(acc) =>
                {
                    Some(element)
                }
                _ => None,
            },
            _ => None,
        },
    )
}

/// Predicate form of [`accumulator_loop`]
#[must_use]
pub fn is_accumulator_loop(block: &[Stmt], i: usize) -> bool {
    accumulator_loop(block, i).is_some()
}

/// `s = ''` followed by `for x in xs: s += e` (optionally filtered)
///
/// The step may also be spelled `s = s + e`.
#[must_use]
pub fn concat_loop(block: &[Stmt], i: usize) -> Option<LoopBuild<'_>> {
    loop_build(
        block,
        i,
        |value| matches!(value, Expr::Str(lit) if lit.value.is_empty() && !lit.bytes),
        |stmt, acc| match stmt {
            Stmt::AugAssign {
                target,
                op: BinOp::Add,
                value,
            } if target.is_name(acc) => Some(value),
            _ => match single_name_assign(stmt)? {
                (
                    name,
                    Expr::BinOp {
                        left,
                        op: BinOp::Add,
                        right,
                    },
                ) if name == acc && left.is_name(acc) => Some(&**right),
                _ => None,
            },
        },
    )
}

/// Predicate form of [`concat_loop`]
#[must_use]
pub fn is_concat_loop(block: &[Stmt], i: usize) -> bool {
    concat_loop(block, i).is_some()
}

/// `(index, sequence)` of `for i in range(len(xs))` whose body only reads `xs[i]`
#[must_use]
pub fn index_iteration(block: &[Stmt], i: usize) -> Option<(&str, &str)> {
    let Stmt::For {
        target,
        iter,
        body,
        orelse,
    } = block.get(i)?
    else {
        return None;
    };
    if !orelse.is_empty() {
        return None;
    }
    let index = target.as_name()?;
    let (range, range_args) = iter.as_simple_call()?;
    if range != "range" || range_args.len() != 1 {
        return None;
    }
    let (len, len_args) = range_args[0].as_simple_call()?;
    if len != "len" || len_args.len() != 1 {
        return None;
    }
    let sequence = len_args[0].as_name()?;
    let rebound = bound_names(body, true);
    if rebound.iter().any(|n| n == index || n == sequence) {
        return None;
    }
    let is_element = |e: &Expr| {
        matches!(
            e,
            Expr::Subscript { value, index: idx }
                if value.is_name(sequence) && idx.is_name(index)
        )
    };
    let elements = find_exprs(body, is_element).len();
    let uses = find_exprs(body, |e| e.is_name(index)).len();
    if elements == 0 || elements != uses || writes_element(body, &is_element) {
        return None;
    }
    Some((index, sequence))
}

fn writes_element(body: &[Stmt], is_element: &dyn Fn(&Expr) -> bool) -> bool {
    !block_sites(body, |block, i| match &block[i] {
        Stmt::Assign { targets, .. } => targets
            .iter()
            .any(|t| !find_in_expr(t, |e| is_element(e)).is_empty()),
        Stmt::AugAssign { target, .. } => !find_in_expr(target, |e| is_element(e)).is_empty(),
        _ => false,
    })
    .is_empty()
}

/// Predicate form of [`index_iteration`]
#[must_use]
pub fn is_index_iteration(block: &[Stmt], i: usize) -> bool {
    index_iteration(block, i).is_some()
}

/// Indices into `def.body` of assignments whose value is never read
///
/// Only the function's top-level block is examined: a store is dead when
/// the next statement mentioning the name overwrites it without reading
/// it, or when nothing after it mentions the name.
#[must_use]
pub fn dead_store_indices(def: &FunctionDef) -> Vec<usize> {
    let declared = declared_outer(&def.body);
    let mut dead = Vec::new();
    for (i, stmt) in def.body.iter().enumerate() {
        let Some((target, value)) = single_name_assign(stmt) else {
            continue;
        };
        if declared.contains(target) || !is_pure(value) {
            continue;
        }
        let mut is_dead = true;
        for later in &def.body[i + 1..] {
            let once = std::slice::from_ref(later);
            let mentions = names_in_body(once).contains(target)
                || bound_names(once, true).iter().any(|n| n == target);
            if !mentions {
                continue;
            }
            is_dead = matches!(single_name_assign(later),
                Some((name, next)) if name == target && !names_in_expr(next).contains(target));
            break;
        }
        if is_dead {
            dead.push(i);
        }
    }
    dead
}

struct IterationContexts<'ast> {
    found: Vec<&'ast Expr>,
}

const CONSUMERS: &[&str] = &[
    "all", "any", "enumerate", "max", "min", "set", "sorted", "sum", "zip",
];

impl<'ast> Visitor<'ast> for IterationContexts<'ast> {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        if let Stmt::For { iter, .. } = stmt {
            if is_materializing_call(iter) {
                self.found.push(iter);
            }
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Comprehension(comp) => {
                for clause in &comp.clauses {
                    if is_materializing_call(&clause.iter) {
                        self.found.push(&clause.iter);
                    }
                }
            }
            Expr::Call { func, args } => {
                if func.as_name().is_some_and(|name| CONSUMERS.contains(&name)) {
                    for arg in args {
                        if let Arg::Positional(inner) = arg {
                            if is_materializing_call(inner) {
                                self.found.push(inner);
                            }
                        }
                    }
                }
            }
            _ => {}
        }
        walk_expr(self, expr);
    }
}

/// Occurrence indices (among [`is_materializing_call`] matches) of
/// materializations whose result is only iterated
#[must_use]
pub fn redundant_materializations(body: &[Stmt]) -> Vec<usize> {
    let mut contexts = IterationContexts { found: Vec::new() };
    canonize_syntax::visit::walk_body(&mut contexts, body);
    find_exprs(body, is_materializing_call)
        .into_iter()
        .enumerate()
        .filter(|(_, e)| contexts.found.iter().any(|c| std::ptr::eq(*c, *e)))
        .map(|(i, _)| i)
        .collect()
}

// ---------------------------------------------------------------------------
// Site collectors
// ---------------------------------------------------------------------------

/// Sites of expressions matching `pred`, per top-level function
#[must_use]
pub fn expr_sites(module: &Module, pred: &dyn Fn(&Expr) -> bool) -> Vec<Site> {
    module
        .functions()
        .flat_map(|def| {
            let count = find_exprs(&def.body, pred).len();
            (0..count).map(move |i| Site::new(def.name.clone(), i))
        })
        .collect()
}

/// Sites of statement positions matching `pred`, per top-level function
#[must_use]
pub fn stmt_sites(module: &Module, pred: &dyn Fn(&[Stmt], usize) -> bool) -> Vec<Site> {
    module
        .functions()
        .flat_map(|def| {
            let count = block_sites(&def.body, pred).len();
            (0..count).map(move |i| Site::new(def.name.clone(), i))
        })
        .collect()
}

/// Sites of redundant materializations
#[must_use]
pub fn materialization_sites(module: &Module) -> Vec<Site> {
    module
        .functions()
        .flat_map(|def| {
            redundant_materializations(&def.body)
                .into_iter()
                .map(move |i| Site::new(def.name.clone(), i))
        })
        .collect()
}

/// Sites of dead stores; the occurrence indexes the function's top-level body
#[must_use]
pub fn dead_store_sites(module: &Module) -> Vec<Site> {
    module
        .functions()
        .flat_map(|def| {
            dead_store_indices(def)
                .into_iter()
                .map(move |i| Site::new(def.name.clone(), i))
        })
        .collect()
}

/// Self-calls of `def`
#[must_use]
pub fn self_calls(def: &FunctionDef) -> Vec<&Expr> {
    find_exprs(&def.body, |e| {
        matches!(e, Expr::Call { func, .. } if func.is_name(&def.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_syntax::parse_module;

    fn first_def(source: &str) -> FunctionDef {
        parse_module(source)
            .unwrap()
            .primary_function()
            .cloned()
            .unwrap()
    }

    fn expr(source: &str) -> Expr {
        match parse_module(source).unwrap().body.remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("not an expression: {other:?}"),
        }
    }

    #[test]
    fn length_checks() {
        assert!(is_len_empty_check(&expr("len(x) == 0")));
        assert!(is_len_empty_check(&expr("len(x) < 1")));
        assert!(is_len_nonempty_check(&expr("len(x) > 0")));
        assert!(!is_len_empty_check(&expr("len(x) == 1")));
        assert!(!is_len_empty_check(&expr("size(x) == 0")));
    }

    #[test]
    fn boolean_forms() {
        assert!(is_negated_truthiness(&expr("not x")));
        assert!(!is_negated_truthiness(&expr("not a < b")));
        assert!(is_negated_comparison(&expr("not a < b")));
        assert!(is_bool_literal_comparison(&expr("flag == True")));
        assert!(!is_bool_literal_comparison(&expr("True == False")));
    }

    #[test]
    fn arithmetic_forms() {
        assert!(is_identity_operation(&expr("x + 0")));
        assert!(is_identity_operation(&expr("1 * x")));
        assert!(!is_identity_operation(&expr("x - 1")));
        assert!(is_power_two(&expr("x ** 2")));
        assert!(!is_power_two(&expr("f() ** 2")));
        assert!(is_self_multiplication(&expr("x * x")));
        assert!(is_truncating_division(&expr("int(a / b)")));
        assert!(is_right_nested(&expr("a + (b + c)")));
        assert!(is_left_nested(&expr("a + b + c")));
        assert!(!is_right_nested(&expr("a - (b - c)")));
    }

    #[test]
    fn return_chains() {
        let def = first_def("def f(n):\n    r = n * 2\n    r = r + 1\n    return r\n");
        assert_eq!(return_chain_length(&def.body, 2), 2);
        let def = first_def("def f(n):\n    r = g(n)\n    return r + h()\n");
        assert_eq!(return_chain_length(&def.body, 1), 0);
        let def = first_def("def f(n):\n    r = n * 2\n    return r\n");
        assert!(is_return_chain(&def.body, 1));
    }

    #[test]
    fn if_return_shapes() {
        let def = first_def("def f(x):\n    if x:\n        return 1\n    return 2\n");
        assert!(is_if_else_return(&def.body, 0));
        let def = first_def("def f(x):\n    if x:\n        return 1\n    else:\n        y = 2\n        return y\n");
        assert!(!is_if_else_return(&def.body, 0));
        assert!(is_else_after_return(&def.body, 0));
        let def = first_def("def f(x):\n    return 1 if x else 2\n");
        assert!(is_return_conditional(&def.body, 0));
    }

    #[test]
    fn loop_builds() {
        let def = first_def(
            "def f(xs):\n    out = []\n    for x in xs:\n        if x > 0:\n            out.append(x * 2)\n    return out\n",
        );
        let build = accumulator_loop(&def.body, 0).unwrap();
        assert_eq!(build.accumulator, "out");
        assert!(build.condition.is_some());
        let def = first_def("def f(xs):\n    s = ''\n    for x in xs:\n        s += x\n    return s\n");
        assert!(is_concat_loop(&def.body, 0));
        assert!(!is_accumulator_loop(&def.body, 0));
    }

    #[test]
    fn concatenation_spelled_as_plain_assignment() {
        let def = first_def("def f(xs):\n    t = ''\n    for x in xs:\n        t = t + str(x)\n    return t\n");
        let build = concat_loop(&def.body, 0).unwrap();
        assert_eq!(build.accumulator, "t");
        assert!(matches!(build.element, Expr::Call { .. }));
        // prepending is not a join
        let def = first_def("def f(xs):\n    t = ''\n    for x in xs:\n        t = x + t\n    return t\n");
        assert!(!is_concat_loop(&def.body, 0));
    }

    #[test]
    fn index_iterations() {
        let def = first_def("def f(xs):\n    t = 0\n    for i in range(len(xs)):\n        t += xs[i]\n    return t\n");
        assert_eq!(index_iteration(&def.body, 1), Some(("i", "xs")));
        let def = first_def("def f(xs):\n    for i in range(len(xs)):\n        print(i, xs[i])\n");
        assert!(index_iteration(&def.body, 0).is_none());
        let def = first_def("def f(xs):\n    for i in range(len(xs)):\n        xs[i] = 0\n");
        assert!(index_iteration(&def.body, 0).is_none());
    }

    #[test]
    fn dead_stores() {
        let def = first_def("def f(n):\n    r = 1\n    r = n\n    unused = 3\n    return r\n");
        assert_eq!(dead_store_indices(&def), vec![0, 2]);
        let def = first_def("def f(n):\n    r = 1\n    for i in range(n):\n        r = r * i\n    return r\n");
        assert!(dead_store_indices(&def).is_empty());
    }

    #[test]
    fn materializations_in_iteration_position() {
        let def = first_def("def f(xs):\n    a = list(xs)\n    for x in list(xs):\n        pass\n    return sum(list(xs))\n");
        assert_eq!(redundant_materializations(&def.body), vec![1, 2]);
    }

    #[test]
    fn commutative_signatures() {
        assert_eq!(commutative_signature(&expr("n * 2"), &[]).as_deref(), Some("*:name,literal"));
        assert_eq!(commutative_signature(&expr("2 * n"), &[]).as_deref(), Some("*:literal,name"));
        assert_eq!(commutative_signature(&expr("n - 2"), &[]), None);
    }

    #[test]
    fn parameters_sign_by_position() {
        let params = ["a", "b"];
        let sign = |source: &str| commutative_signature(&expr(source), &params);
        assert_eq!(sign("b + a").as_deref(), Some("+:param1,param0"));
        assert_eq!(sign("a + b").as_deref(), Some("+:param0,param1"));
        assert_eq!(sign("a * t").as_deref(), Some("*:param0,name"));
    }
}
