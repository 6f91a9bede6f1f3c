//! Binding and definition-reaching analysis
//!
//! [`unbound_names`] walks each function in statement order and reports
//! identifiers read where no definition can reach them: not a parameter,
//! not assigned on any path so far, not a module global, and not on the
//! builtin allow-list. Branches merge by union, loop bodies see their own
//! bindings (back edges), and nested functions see every binding of the
//! enclosing function (closures resolve at call time).

use std::collections::BTreeSet;

use crate::ast::{Expr, FunctionDef, Module, Stmt};
use crate::visit::{walk_expr, Visitor};

/// Builtins and constants that are always bound, sorted for binary search
pub const BUILTINS: &[&str] = &[
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "Exception",
    "IndexError",
    "KeyError",
    "LookupError",
    "NotImplemented",
    "NotImplementedError",
    "OverflowError",
    "RecursionError",
    "RuntimeError",
    "StopIteration",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
    "__name__",
    "abs",
    "all",
    "any",
    "ascii",
    "bin",
    "bool",
    "bytes",
    "callable",
    "chr",
    "dict",
    "divmod",
    "enumerate",
    "filter",
    "float",
    "format",
    "frozenset",
    "getattr",
    "hasattr",
    "hash",
    "hex",
    "id",
    "input",
    "int",
    "isinstance",
    "issubclass",
    "iter",
    "len",
    "list",
    "map",
    "max",
    "min",
    "next",
    "object",
    "oct",
    "open",
    "ord",
    "pow",
    "print",
    "range",
    "repr",
    "reversed",
    "round",
    "set",
    "setattr",
    "slice",
    "sorted",
    "str",
    "sum",
    "super",
    "tuple",
    "type",
    "zip",
];

/// Whether `name` is on the builtin allow-list
#[must_use]
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.binary_search(&name).is_ok()
}

/// Names bound by an assignment target, left to right
pub fn target_names(target: &Expr, out: &mut Vec<String>) {
    match target {
        Expr::Name(name) => {
            if !out.contains(name) {
                out.push(name.clone());
            }
        }
        Expr::Tuple(items) | Expr::List(items) => {
            for item in items {
                target_names(item, out);
            }
        }
        Expr::Starred(inner) => target_names(inner, out),
        _ => {}
    }
}

/// Names declared `global` or `nonlocal` directly in `body`
#[must_use]
pub fn declared_outer(body: &[Stmt]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    collect_declared(body, &mut names);
    names
}

fn collect_declared(body: &[Stmt], names: &mut BTreeSet<String>) {
    for stmt in body {
        match stmt {
            Stmt::Global(list) | Stmt::Nonlocal(list) => names.extend(list.iter().cloned()),
            Stmt::If { body, orelse, .. }
            | Stmt::While { body, orelse, .. }
            | Stmt::For { body, orelse, .. } => {
                collect_declared(body, names);
                collect_declared(orelse, names);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect_declared(body, names);
                for handler in handlers {
                    collect_declared(&handler.body, names);
                }
                collect_declared(orelse, names);
                collect_declared(finalbody, names);
            }
            _ => {}
        }
    }
}

/// Names bound anywhere in `body`, in first-binding order
///
/// Nested function bodies, lambdas and comprehensions are separate scopes
/// and are not entered; a nested `def` binds its own name. Opaque
/// constructs contribute their declared bindings only when
/// `include_opaque` is set.
#[must_use]
pub fn bound_names(body: &[Stmt], include_opaque: bool) -> Vec<String> {
    let mut out = Vec::new();
    collect_bound(body, include_opaque, &mut out);
    out
}

fn push_unique(out: &mut Vec<String>, name: &str) {
    if !out.iter().any(|n| n == name) {
        out.push(name.to_string());
    }
}

fn collect_bound(body: &[Stmt], include_opaque: bool, out: &mut Vec<String>) {
    for stmt in body {
        match stmt {
            Stmt::FunctionDef(def) => push_unique(out, &def.name),
            Stmt::Assign { targets, .. } => {
                for target in targets {
                    target_names(target, out);
                }
            }
            Stmt::AugAssign { target, .. } => target_names(target, out),
            Stmt::For {
                target,
                body,
                orelse,
                ..
            } => {
                target_names(target, out);
                collect_bound(body, include_opaque, out);
                collect_bound(orelse, include_opaque, out);
            }
            Stmt::If { body, orelse, .. } | Stmt::While { body, orelse, .. } => {
                collect_bound(body, include_opaque, out);
                collect_bound(orelse, include_opaque, out);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                collect_bound(body, include_opaque, out);
                for handler in handlers {
                    if let Some(name) = &handler.name {
                        push_unique(out, name);
                    }
                    collect_bound(&handler.body, include_opaque, out);
                }
                collect_bound(orelse, include_opaque, out);
                collect_bound(finalbody, include_opaque, out);
            }
            Stmt::Import(names) | Stmt::ImportFrom { names, .. } => {
                for alias in names {
                    push_unique(out, alias.bound_name());
                }
            }
            Stmt::Opaque { binds, .. } if include_opaque => {
                for name in binds {
                    push_unique(out, name);
                }
            }
            _ => {}
        }
    }
}

/// Module-level bindings, visible to every function
#[must_use]
pub fn module_globals(module: &Module) -> BTreeSet<String> {
    bound_names(&module.body, true).into_iter().collect()
}

/// Identifiers read where no definition reaches them
#[must_use]
pub fn unbound_names(module: &Module) -> BTreeSet<String> {
    let mut check = ReachCheck {
        globals: module_globals(module),
        unbound: BTreeSet::new(),
    };
    let mut defined = BTreeSet::new();
    let all = check.globals.clone();
    check.block(&module.body, &mut defined, &all);
    check.unbound
}

struct ReachCheck {
    globals: BTreeSet<String>,
    unbound: BTreeSet<String>,
}

impl ReachCheck {
    fn read(&mut self, expr: &Expr, defined: &BTreeSet<String>) {
        let mut reads = Reads {
            check: self,
            defined,
        };
        reads.visit_expr(expr);
    }

    fn target(&mut self, target: &Expr, defined: &mut BTreeSet<String>) {
        match target {
            Expr::Name(name) => {
                defined.insert(name.clone());
            }
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.target(item, defined);
                }
            }
            Expr::Starred(inner) => self.target(inner, defined),
            other => self.read(other, defined),
        }
    }

    fn function(&mut self, def: &FunctionDef, enclosing: &BTreeSet<String>) {
        let mut defined = enclosing.clone();
        for name in def.param_names() {
            defined.insert(name.to_string());
        }
        defined.extend(declared_outer(&def.body));
        let mut locals = defined.clone();
        locals.extend(bound_names(&def.body, true));
        self.block(&def.body, &mut defined, &locals);
    }

    fn block(&mut self, body: &[Stmt], defined: &mut BTreeSet<String>, locals: &BTreeSet<String>) {
        for stmt in body {
            self.stmt(stmt, defined, locals);
        }
    }

    fn stmt(&mut self, stmt: &Stmt, defined: &mut BTreeSet<String>, locals: &BTreeSet<String>) {
        match stmt {
            Stmt::FunctionDef(def) => {
                for decorator in &def.decorators {
                    self.read(decorator, defined);
                }
                for param in &def.params {
                    if let Some(default) = &param.default {
                        self.read(default, defined);
                    }
                }
                defined.insert(def.name.clone());
                let mut enclosing = locals.clone();
                enclosing.extend(defined.iter().cloned());
                self.function(def, &enclosing);
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.read(value, defined);
                }
            }
            Stmt::Assign { targets, value, .. } => {
                self.read(value, defined);
                for target in targets {
                    self.target(target, defined);
                }
            }
            Stmt::AugAssign { target, value, .. } => {
                self.read(target, defined);
                self.read(value, defined);
                self.target(target, defined);
            }
            Stmt::Expr(expr) => self.read(expr, defined),
            Stmt::If { test, body, orelse } => {
                self.read(test, defined);
                let mut then_defs = defined.clone();
                self.block(body, &mut then_defs, locals);
                let mut else_defs = defined.clone();
                self.block(orelse, &mut else_defs, locals);
                defined.extend(then_defs);
                defined.extend(else_defs);
            }
            Stmt::For {
                target,
                iter,
                body,
                orelse,
            } => {
                self.read(iter, defined);
                let mut inner = defined.clone();
                self.target(target, &mut inner);
                inner.extend(bound_names(body, true));
                self.block(body, &mut inner, locals);
                let mut after = inner.clone();
                self.block(orelse, &mut after, locals);
                defined.extend(after);
            }
            Stmt::While { test, body, orelse } => {
                let mut inner = defined.clone();
                inner.extend(bound_names(body, true));
                self.read(test, &inner);
                self.block(body, &mut inner, locals);
                let mut after = inner.clone();
                self.block(orelse, &mut after, locals);
                defined.extend(after);
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                let mut tried = defined.clone();
                self.block(body, &mut tried, locals);
                let mut partial = defined.clone();
                partial.extend(bound_names(body, true));
                let mut merged = tried.clone();
                for handler in handlers {
                    if let Some(ty) = &handler.ty {
                        self.read(ty, &partial);
                    }
                    let mut handled = partial.clone();
                    if let Some(name) = &handler.name {
                        handled.insert(name.clone());
                    }
                    self.block(&handler.body, &mut handled, locals);
                    merged.extend(handled);
                }
                self.block(orelse, &mut tried, locals);
                merged.extend(tried);
                self.block(finalbody, &mut merged, locals);
                defined.extend(merged);
            }
            Stmt::Raise { exc, cause } => {
                for part in [exc, cause].into_iter().flatten() {
                    self.read(part, defined);
                }
            }
            Stmt::Assert { test, msg } => {
                self.read(test, defined);
                if let Some(msg) = msg {
                    self.read(msg, defined);
                }
            }
            Stmt::Import(names) | Stmt::ImportFrom { names, .. } => {
                for alias in names {
                    defined.insert(alias.bound_name().to_string());
                }
            }
            Stmt::Global(names) | Stmt::Nonlocal(names) => defined.extend(names.iter().cloned()),
            Stmt::Opaque { binds, .. } => defined.extend(binds.iter().cloned()),
            Stmt::Pass | Stmt::Break | Stmt::Continue => {}
        }
    }
}

struct Reads<'c, 'd> {
    check: &'c mut ReachCheck,
    defined: &'d BTreeSet<String>,
}

impl<'ast> Visitor<'ast> for Reads<'_, '_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        match expr {
            Expr::Name(name) => {
                if !self.defined.contains(name)
                    && !self.check.globals.contains(name)
                    && !is_builtin(name)
                {
                    self.check.unbound.insert(name.clone());
                }
            }
            Expr::Lambda { params, body } => {
                for param in params {
                    if let Some(default) = &param.default {
                        self.visit_expr(default);
                    }
                }
                let mut inner = self.defined.clone();
                inner.extend(params.iter().map(|p| p.name.clone()));
                self.check.read(body, &inner);
            }
            Expr::Comprehension(comp) => {
                let mut inner = self.defined.clone();
                for (i, clause) in comp.clauses.iter().enumerate() {
                    if i == 0 {
                        self.visit_expr(&clause.iter);
                    } else {
                        self.check.read(&clause.iter, &inner);
                    }
                    self.check.target(&clause.target, &mut inner);
                    for cond in &clause.ifs {
                        self.check.read(cond, &inner);
                    }
                }
                self.check.read(&comp.element, &inner);
                if let Some(value) = &comp.value {
                    self.check.read(value, &inner);
                }
            }
            _ => walk_expr(self, expr),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;

    fn unbound(source: &str) -> Vec<String> {
        unbound_names(&parse_module(source).unwrap())
            .into_iter()
            .collect()
    }

    #[test]
    fn builtins_are_sorted() {
        let mut sorted = BUILTINS.to_vec();
        sorted.sort_unstable();
        assert_eq!(sorted, BUILTINS);
    }

    #[test]
    fn parameters_and_locals_are_bound() {
        assert!(unbound("def f(n):\n    r = n * 2\n    return r\n").is_empty());
    }

    #[test]
    fn dropped_definition_is_reported() {
        assert_eq!(unbound("def f(n):\n    return r\n"), vec!["r"]);
    }

    #[test]
    fn use_before_assignment_is_reported() {
        assert_eq!(unbound("def f(n):\n    x = y\n    y = n\n    return x\n"), vec!["y"]);
    }

    #[test]
    fn loop_back_edges_reach_the_body() {
        let source = "def f(xs):\n    for x in xs:\n        if x:\n            acc = x\n        else:\n            acc = acc + 1\n    return acc\n";
        assert!(unbound(source).is_empty());
    }

    #[test]
    fn comprehension_and_lambda_scopes() {
        let source = "def f(xs):\n    g = lambda y: y + 1\n    return [g(x) for x in xs if x]\n";
        assert!(unbound(source).is_empty());
        assert_eq!(unbound("def f(xs):\n    return [y for x in xs]\n"), vec!["y"]);
    }

    #[test]
    fn globals_and_imports_are_bound() {
        let source = "import re\nLIMIT = 3\n\ndef f(s):\n    return re.match('a', s) and len(s) < LIMIT\n";
        assert!(unbound(source).is_empty());
    }

    #[test]
    fn nested_functions_see_enclosing_scope() {
        let source = "def outer(n):\n    def inner():\n        return total + n\n    total = 1\n    return inner()\n";
        assert!(unbound(source).is_empty());
    }

    #[test]
    fn bound_names_in_first_binding_order() {
        let module = parse_module(
            "def f(xs):\n    total = 0\n    for i, x in enumerate(xs):\n        total += x\n    import math\n    return total\n",
        )
        .unwrap();
        let def = module.primary_function().unwrap();
        assert_eq!(bound_names(&def.body, false), vec!["total", "i", "x", "math"]);
    }
}
