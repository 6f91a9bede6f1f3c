//! Control-flow, path, termination, complexity and recursion facets

use canonize_syntax::visit::{
    block_sites, child_blocks, find_in_expr, walk_body, walk_expr, walk_stmt, Visitor,
};
use canonize_syntax::{print_expr, BinOp, Expr, FunctionDef, Stmt};

use super::Analysis;
use crate::idioms;
use crate::value::{
    Complexity, ControlFlow, ExecutionPaths, RecursionBranching, RecursionSchema, Termination,
};

const PATH_CAP: usize = 1024;

#[derive(Default)]
struct FlowCounter {
    branches: usize,
    loops: usize,
    returns: usize,
    conditional_expressions: usize,
    comprehensions: usize,
    calls: Vec<String>,
    conditions: Vec<String>,
    depth: usize,
    max_nesting: usize,
    handlers: usize,
    bool_ops: usize,
    comprehension_filters: usize,
}

impl FlowCounter {
    fn nested(&mut self, body: &[Stmt]) {
        self.depth += 1;
        self.max_nesting = self.max_nesting.max(self.depth);
        walk_body(self, body);
        self.depth -= 1;
    }
}

fn callee_name(func: &Expr) -> String {
    match func {
        Expr::Name(name) => name.clone(),
        Expr::Attribute { attr, .. } => format!(".{attr}"),
        _ => "<dynamic>".to_string(),
    }
}

impl<'ast> Visitor<'ast> for FlowCounter {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::If { test, body, orelse } => {
                self.branches += 1;
                self.conditions.push(print_expr(test));
                self.visit_expr(test);
                self.nested(body);
                // `elif` stays at the depth of its `if`
                if let [elif @ Stmt::If { .. }] = orelse.as_slice() {
                    self.visit_stmt(elif);
                } else {
                    self.nested(orelse);
                }
            }
            Stmt::While { test, body, orelse } => {
                self.loops += 1;
                self.conditions.push(print_expr(test));
                self.visit_expr(test);
                self.nested(body);
                self.nested(orelse);
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.loops += 1;
                self.visit_expr(iter);
                self.visit_expr(target);
                self.nested(body);
                self.nested(orelse);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.handlers += handlers.len();
                self.nested(body);
                for handler in handlers {
                    if let Some(ty) = &handler.ty {
                        self.visit_expr(ty);
                    }
                    self.nested(&handler.body);
                }
                self.nested(orelse);
                self.nested(finalbody);
            }
            Stmt::Return(_) => {
                self.returns += 1;
                walk_stmt(self, stmt);
            }
            _ => walk_stmt(self, stmt),
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::IfExp { .. } => self.conditional_expressions += 1,
            Expr::Comprehension(comp) => {
                self.comprehensions += 1;
                self.comprehension_filters +=
                    comp.clauses.iter().map(|c| c.ifs.len()).sum::<usize>();
            }
            Expr::Call { func, .. } => self.calls.push(callee_name(func)),
            Expr::BoolOp { .. } => self.bool_ops += 1,
            _ => {}
        }
        walk_expr(self, expr);
    }
}

fn count_flow(analysis: &Analysis<'_>) -> FlowCounter {
    let mut counter = FlowCounter::default();
    for def in analysis.module.functions() {
        walk_body(&mut counter, &def.body);
    }
    counter
}

pub(crate) fn control_flow(analysis: &Analysis<'_>) -> ControlFlow {
    let counter = count_flow(analysis);
    ControlFlow {
        branches: counter.branches,
        loops: counter.loops,
        max_nesting: counter.max_nesting,
        returns: counter.returns,
        conditional_expressions: counter.conditional_expressions,
        comprehensions: counter.comprehensions,
        calls: counter.calls,
        branch_conditions: analysis.enhanced.then_some(counter.conditions),
    }
}

fn paths(block: &[Stmt]) -> usize {
    block.iter().fold(1usize, |acc, stmt| {
        let branch = match stmt {
            Stmt::If { body, orelse, .. } => paths(body).saturating_add(paths(orelse)),
            Stmt::For { body, .. } | Stmt::While { body, .. } => paths(body).saturating_add(1),
            Stmt::Try { body, handlers, .. } => handlers
                .iter()
                .fold(paths(body), |n, h| n.saturating_add(paths(&h.body))),
            _ => 1,
        };
        acc.saturating_mul(branch).min(PATH_CAP)
    })
}

/// Whether control can reach the end of `block`
pub(crate) fn falls_through(block: &[Stmt]) -> bool {
    let Some(last) = block.last() else {
        return true;
    };
    match last {
        Stmt::Return(_) | Stmt::Raise { .. } => false,
        Stmt::If { body, orelse, .. } => {
            orelse.is_empty() || falls_through(body) || falls_through(orelse)
        }
        Stmt::While { test, body, .. } => !is_infinite(test) || contains_break(body),
        Stmt::Try {
            body,
            handlers,
            finalbody,
            ..
        } => {
            (falls_through(body) || handlers.iter().any(|h| falls_through(&h.body)))
                && falls_through(finalbody)
        }
        _ => true,
    }
}

fn is_infinite(test: &Expr) -> bool {
    matches!(test, Expr::Bool(true)) || matches!(test, Expr::Int(n) if *n != 0)
}

/// `break` that leaves this loop (not a nested one)
fn contains_break(body: &[Stmt]) -> bool {
    body.iter().any(|stmt| match stmt {
        Stmt::Break => true,
        Stmt::If { body, orelse, .. } => contains_break(body) || contains_break(orelse),
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            contains_break(body)
                || handlers.iter().any(|h| contains_break(&h.body))
                || contains_break(orelse)
                || contains_break(finalbody)
        }
        _ => false,
    })
}

fn exits(block: &[Stmt], depth: usize, out: &mut Vec<String>) {
    for stmt in block {
        match stmt {
            Stmt::Return(_) => out.push(format!("return@{depth}")),
            Stmt::Raise { .. } => out.push(format!("raise@{depth}")),
            _ => {}
        }
        for child in child_blocks(stmt) {
            exits(child, depth + 1, out);
        }
    }
}

fn guard_clauses(def: &FunctionDef) -> usize {
    let body = &def.body;
    body.iter()
        .take(body.len().saturating_sub(1))
        .filter(|stmt| {
            matches!(stmt, Stmt::If { body, orelse, .. }
                if orelse.is_empty()
                    && matches!(body.as_slice(), [Stmt::Return(_) | Stmt::Raise { .. }]))
        })
        .count()
}

pub(crate) fn execution_paths(analysis: &Analysis<'_>) -> ExecutionPaths {
    let mut result = ExecutionPaths {
        implicit_return: analysis.entry.is_some_and(|def| falls_through(&def.body)),
        ..ExecutionPaths::default()
    };
    let mut signatures = Vec::new();
    let mut path_count = 0usize;
    for def in analysis.module.functions() {
        path_count = path_count.saturating_add(paths(&def.body)).min(PATH_CAP);
        result.return_points +=
            block_sites(&def.body, |b, i| matches!(b[i], Stmt::Return(_))).len();
        result.raise_points +=
            block_sites(&def.body, |b, i| matches!(b[i], Stmt::Raise { .. })).len();
        result.guard_clauses += guard_clauses(def);
        result.else_after_return += block_sites(&def.body, idioms::is_else_after_return).len();
        exits(&def.body, 1, &mut signatures);
    }
    result.path_count = path_count;
    result.path_signatures = analysis.enhanced.then_some(signatures);
    result
}

struct RecursionFacts {
    calls: usize,
    branching: RecursionBranching,
    base_cases: usize,
    divide_and_conquer: bool,
}

fn self_calls_in(expr: &Expr, name: &str) -> usize {
    find_in_expr(expr, |e| {
        matches!(e, Expr::Call { func, .. } if func.is_name(name))
    })
    .len()
}

fn statement_self_calls(stmt: &Stmt, name: &str) -> usize {
    match stmt {
        Stmt::Return(Some(e)) | Stmt::Expr(e) => self_calls_in(e, name),
        Stmt::Assign { value, .. } | Stmt::AugAssign { value, .. } => self_calls_in(value, name),
        Stmt::If { test, .. } | Stmt::While { test, .. } => self_calls_in(test, name),
        _ => 0,
    }
}

fn splits_input(call: &Expr) -> bool {
    let Expr::Call { args, .. } = call else {
        return false;
    };
    args.iter().any(|arg| {
        !find_in_expr(arg.value(), |e| {
            matches!(e, Expr::Slice { .. })
                || matches!(e, Expr::BinOp { op: BinOp::FloorDiv | BinOp::RShift, .. })
        })
        .is_empty()
    })
}

fn recursion_facts(def: &FunctionDef) -> RecursionFacts {
    let calls = idioms::self_calls(def);
    if calls.is_empty() {
        return RecursionFacts {
            calls: 0,
            branching: RecursionBranching::None,
            base_cases: 0,
            divide_and_conquer: false,
        };
    }
    let widest = block_sites(&def.body, |_, _| true)
        .into_iter()
        .map(|(block, i)| statement_self_calls(&block[i], &def.name))
        .max()
        .unwrap_or(0)
        .max(1);
    let branching = RecursionBranching::from_calls(widest);
    let base_cases = block_sites(&def.body, |b, i| match &b[i] {
        Stmt::Return(None) => true,
        Stmt::Return(Some(value)) => self_calls_in(value, &def.name) == 0,
        _ => false,
    })
    .len();
    let divide_and_conquer = widest >= 2 && calls.iter().any(|call| splits_input(call));
    RecursionFacts {
        calls: calls.len(),
        branching,
        base_cases,
        divide_and_conquer,
    }
}

pub(crate) fn recursion_schema(analysis: &Analysis<'_>) -> RecursionSchema {
    let Some(def) = analysis.entry else {
        return RecursionSchema::default();
    };
    let facts = recursion_facts(def);
    RecursionSchema {
        is_recursive: facts.calls > 0,
        branching: facts.branching,
        base_cases: facts.base_cases,
        recursive_calls: facts.calls,
        divide_and_conquer: facts.divide_and_conquer,
    }
}

#[derive(Default)]
struct LoopDepth {
    depth: usize,
    max: usize,
}

impl<'ast> Visitor<'ast> for LoopDepth {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        if matches!(stmt, Stmt::For { .. } | Stmt::While { .. }) {
            self.depth += 1;
            self.max = self.max.max(self.depth);
            walk_stmt(self, stmt);
            self.depth -= 1;
        } else {
            walk_stmt(self, stmt);
        }
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Comprehension(comp) = expr {
            let levels = comp.clauses.len();
            self.depth += levels;
            self.max = self.max.max(self.depth);
            walk_expr(self, expr);
            self.depth -= levels;
        } else {
            walk_expr(self, expr);
        }
    }
}

pub(crate) fn complexity(analysis: &Analysis<'_>) -> Complexity {
    let mut loops = LoopDepth::default();
    for def in analysis.module.functions() {
        walk_body(&mut loops, &def.body);
    }
    let counter = count_flow(analysis);
    let facts = analysis.entry.map(recursion_facts);
    let recursive_calls = facts.as_ref().map_or(0, |f| f.calls);
    let branching = facts.as_ref().map_or(RecursionBranching::None, |f| f.branching);
    let divide_and_conquer = facts.as_ref().is_some_and(|f| f.divide_and_conquer);
    let sorts = counter.calls.iter().any(|c| c == "sorted" || c == ".sort");

    let class = if divide_and_conquer {
        "O(n log n)".to_string()
    } else if matches!(branching, RecursionBranching::Binary | RecursionBranching::MultiWay) {
        "O(2^n)".to_string()
    } else if loops.max >= 2 {
        format!("O(n^{})", loops.max)
    } else if loops.max == 1 || recursive_calls > 0 {
        "O(n)".to_string()
    } else if sorts {
        "O(n log n)".to_string()
    } else {
        "O(1)".to_string()
    };

    Complexity {
        class,
        loop_depth: loops.max,
        recursive_calls,
        materializations: idioms::materialization_sites(analysis.module).len(),
        cyclomatic: 1
            + counter.branches
            + counter.loops
            + counter.bool_ops
            + counter.conditional_expressions
            + counter.comprehension_filters
            + counter.handlers,
    }
}

pub(crate) fn termination(analysis: &Analysis<'_>) -> Termination {
    let mut result = Termination::default();
    let mut unguarded_infinite = false;
    for def in analysis.module.functions() {
        for (block, i) in block_sites(&def.body, |_, _| true) {
            match &block[i] {
                Stmt::For { .. } => result.bounded_loops += 1,
                Stmt::While { test, body, .. } => {
                    result.unbounded_loops += 1;
                    if is_infinite(test) {
                        result.while_true_loops += 1;
                        let exits_loop = contains_break(body)
                            || !block_sites(body, |b, j| {
                                matches!(b[j], Stmt::Return(_) | Stmt::Raise { .. })
                            })
                            .is_empty();
                        unguarded_infinite |= !exits_loop;
                    }
                }
                Stmt::Break => result.breaks += 1,
                _ => {}
            }
        }
        result.index_iterations += block_sites(&def.body, idioms::is_index_iteration).len();
    }
    if let Some(def) = analysis.entry {
        let facts = recursion_facts(def);
        result.recursive = facts.calls > 0;
        result.base_case_guarded =
            !result.recursive || facts.base_cases > 0 || falls_through(&def.body);
    } else {
        result.base_case_guarded = true;
    }
    result.always_terminates = !unguarded_infinite && result.base_case_guarded;
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_syntax::{alpha_normalize, parse_module};

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
    fn elif_does_not_deepen_nesting() {
        let flow = analyse(
            "def f(x):\n    if x > 1:\n        return 1\n    elif x > 0:\n        return 2\n    else:\n        return 3\n",
            control_flow,
        );
        assert_eq!(flow.branches, 2);
        assert_eq!(flow.max_nesting, 1);
        assert_eq!(flow.returns, 3);
    }

    #[test]
    fn calls_are_recorded_in_order() {
        let flow = analyse("def f(xs):\n    xs.sort()\n    return len(sorted(xs))\n", control_flow);
        assert_eq!(flow.calls, vec![".sort", "len", "sorted"]);
    }

    #[test]
    fn implicit_return_and_guards() {
        let paths = analyse(
            "def f(x):\n    if x is None:\n        return 0\n    if x:\n        return 1\n    else:\n        return 2\n",
            execution_paths,
        );
        assert!(!paths.implicit_return);
        assert_eq!(paths.guard_clauses, 1);
        assert_eq!(paths.else_after_return, 1);
        assert_eq!(paths.return_points, 3);
        let paths = analyse("def f(x):\n    print(x)\n", execution_paths);
        assert!(paths.implicit_return);
    }

    #[test]
    fn complexity_classes() {
        let c = analyse("def f(xs):\n    for a in xs:\n        for b in xs:\n            pass\n", complexity);
        assert_eq!(c.class, "O(n^2)");
        let c = analyse("def fib(n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\n", complexity);
        assert_eq!(c.class, "O(2^n)");
        let c = analyse("def f(xs):\n    return [x for x in xs]\n", complexity);
        assert_eq!(c.class, "O(n)");
        let c = analyse("def f(n):\n    return n * 2\n", complexity);
        assert_eq!(c.class, "O(1)");
    }

    #[test]
    fn divide_and_conquer_is_detected() {
        let schema = analyse(
            "def s(xs):\n    if len(xs) < 2:\n        return xs\n    m = len(xs) // 2\n    return merge(s(xs[:m]), s(xs[m:]))\n",
            recursion_schema,
        );
        assert!(schema.divide_and_conquer);
        assert_eq!(schema.branching, RecursionBranching::Binary);
    }

    #[test]
    fn termination_flags() {
        let t = analyse("def f():\n    while True:\n        pass\n", termination);
        assert_eq!(t.while_true_loops, 1);
        assert!(!t.always_terminates);
        let t = analyse("def f(n):\n    while True:\n        if n:\n            break\n", termination);
        assert!(t.always_terminates);
        assert_eq!(t.breaks, 1);
    }
}
