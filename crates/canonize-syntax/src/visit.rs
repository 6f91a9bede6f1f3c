//! Pre-order traversal over [`Stmt`] and [`Expr`] trees
//!
//! [`Visitor`] and [`VisitorMut`] walk children in the same order, so an
//! occurrence index computed by a read-only pass addresses the same node in
//! a mutating pass. Idiom detectors and rewriting strategies rely on this.

use std::collections::BTreeSet;

use crate::ast::{Arg, Expr, Stmt};

/// Read-only traversal
pub trait Visitor<'ast> {
    /// Visit a statement; default descends into children
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        walk_stmt(self, stmt);
    }

    /// Visit an expression; default descends into children
    fn visit_expr(&mut self, expr: &'ast Expr) {
        walk_expr(self, expr);
    }
}

/// Visit every statement of a block
pub fn walk_body<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, body: &'ast [Stmt]) {
    for stmt in body {
        visitor.visit_stmt(stmt);
    }
}

/// Visit the children of a statement
pub fn walk_stmt<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, stmt: &'ast Stmt) {
    match stmt {
        Stmt::FunctionDef(def) => {
            for decorator in &def.decorators {
                visitor.visit_expr(decorator);
            }
            for param in &def.params {
                if let Some(default) = &param.default {
                    visitor.visit_expr(default);
                }
            }
            walk_body(visitor, &def.body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr(value);
            }
        }
        Stmt::Assign { targets, value, .. } => {
            visitor.visit_expr(value);
            for target in targets {
                visitor.visit_expr(target);
            }
        }
        Stmt::AugAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Stmt::Expr(expr) => visitor.visit_expr(expr),
        Stmt::If { test, body, orelse } | Stmt::While { test, body, orelse } => {
            visitor.visit_expr(test);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
        } => {
            visitor.visit_expr(iter);
            visitor.visit_expr(target);
            walk_body(visitor, body);
            walk_body(visitor, orelse);
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body(visitor, body);
            for handler in handlers {
                if let Some(ty) = &handler.ty {
                    visitor.visit_expr(ty);
                }
                walk_body(visitor, &handler.body);
            }
            walk_body(visitor, orelse);
            walk_body(visitor, finalbody);
        }
        Stmt::Raise { exc, cause } => {
            if let Some(exc) = exc {
                visitor.visit_expr(exc);
            }
            if let Some(cause) = cause {
                visitor.visit_expr(cause);
            }
        }
        Stmt::Assert { test, msg } => {
            visitor.visit_expr(test);
            if let Some(msg) = msg {
                visitor.visit_expr(msg);
            }
        }
        Stmt::Import(_)
        | Stmt::ImportFrom { .. }
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Opaque { .. } => {}
    }
}

/// Visit the children of an expression
pub fn walk_expr<'ast, V: Visitor<'ast> + ?Sized>(visitor: &mut V, expr: &'ast Expr) {
    match expr {
        Expr::BinOp { left, right, .. } | Expr::BoolOp { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr(left);
            for comparator in comparators {
                visitor.visit_expr(comparator);
            }
        }
        Expr::Call { func, args } => {
            visitor.visit_expr(func);
            for arg in args {
                visitor.visit_expr(arg.value());
            }
        }
        Expr::Attribute { value, .. } | Expr::Starred(value) => visitor.visit_expr(value),
        Expr::Subscript { value, index } => {
            visitor.visit_expr(value);
            visitor.visit_expr(index);
        }
        Expr::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr(part);
            }
        }
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
            for item in items {
                visitor.visit_expr(item);
            }
        }
        Expr::Dict(pairs) => {
            for (key, value) in pairs {
                visitor.visit_expr(key);
                visitor.visit_expr(value);
            }
        }
        Expr::Comprehension(comp) => {
            visitor.visit_expr(&comp.element);
            if let Some(value) = &comp.value {
                visitor.visit_expr(value);
            }
            for clause in &comp.clauses {
                visitor.visit_expr(&clause.iter);
                visitor.visit_expr(&clause.target);
                for cond in &clause.ifs {
                    visitor.visit_expr(cond);
                }
            }
        }
        Expr::IfExp { test, body, orelse } => {
            visitor.visit_expr(test);
            visitor.visit_expr(body);
            visitor.visit_expr(orelse);
        }
        Expr::Lambda { params, body } => {
            for param in params {
                if let Some(default) = &param.default {
                    visitor.visit_expr(default);
                }
            }
            visitor.visit_expr(body);
        }
        Expr::Name(_)
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Bool(_)
        | Expr::NoneLit
        | Expr::Opaque(_) => {}
    }
}

/// Mutating traversal, same order as [`Visitor`]
pub trait VisitorMut {
    /// Visit a statement; default descends into children
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        walk_stmt_mut(self, stmt);
    }

    /// Visit an expression; default descends into children
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        walk_expr_mut(self, expr);
    }
}

/// Visit every statement of a block mutably
pub fn walk_body_mut<V: VisitorMut + ?Sized>(visitor: &mut V, body: &mut [Stmt]) {
    for stmt in body {
        visitor.visit_stmt_mut(stmt);
    }
}

/// Visit the children of a statement mutably
pub fn walk_stmt_mut<V: VisitorMut + ?Sized>(visitor: &mut V, stmt: &mut Stmt) {
    match stmt {
        Stmt::FunctionDef(def) => {
            for decorator in &mut def.decorators {
                visitor.visit_expr_mut(decorator);
            }
            for param in &mut def.params {
                if let Some(default) = &mut param.default {
                    visitor.visit_expr_mut(default);
                }
            }
            walk_body_mut(visitor, &mut def.body);
        }
        Stmt::Return(value) => {
            if let Some(value) = value {
                visitor.visit_expr_mut(value);
            }
        }
        Stmt::Assign { targets, value, .. } => {
            visitor.visit_expr_mut(value);
            for target in targets {
                visitor.visit_expr_mut(target);
            }
        }
        Stmt::AugAssign { target, value, .. } => {
            visitor.visit_expr_mut(target);
            visitor.visit_expr_mut(value);
        }
        Stmt::Expr(expr) => visitor.visit_expr_mut(expr),
        Stmt::If { test, body, orelse } | Stmt::While { test, body, orelse } => {
            visitor.visit_expr_mut(test);
            walk_body_mut(visitor, body);
            walk_body_mut(visitor, orelse);
        }
        Stmt::For {
            target,
            iter,
            body,
            orelse,
        } => {
            visitor.visit_expr_mut(iter);
            visitor.visit_expr_mut(target);
            walk_body_mut(visitor, body);
            walk_body_mut(visitor, orelse);
        }
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            walk_body_mut(visitor, body);
            for handler in handlers {
                if let Some(ty) = &mut handler.ty {
                    visitor.visit_expr_mut(ty);
                }
                walk_body_mut(visitor, &mut handler.body);
            }
            walk_body_mut(visitor, orelse);
            walk_body_mut(visitor, finalbody);
        }
        Stmt::Raise { exc, cause } => {
            if let Some(exc) = exc {
                visitor.visit_expr_mut(exc);
            }
            if let Some(cause) = cause {
                visitor.visit_expr_mut(cause);
            }
        }
        Stmt::Assert { test, msg } => {
            visitor.visit_expr_mut(test);
            if let Some(msg) = msg {
                visitor.visit_expr_mut(msg);
            }
        }
        Stmt::Import(_)
        | Stmt::ImportFrom { .. }
        | Stmt::Global(_)
        | Stmt::Nonlocal(_)
        | Stmt::Pass
        | Stmt::Break
        | Stmt::Continue
        | Stmt::Opaque { .. } => {}
    }
}

/// Visit the children of an expression mutably
pub fn walk_expr_mut<V: VisitorMut + ?Sized>(visitor: &mut V, expr: &mut Expr) {
    match expr {
        Expr::BinOp { left, right, .. } | Expr::BoolOp { left, right, .. } => {
            visitor.visit_expr_mut(left);
            visitor.visit_expr_mut(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr_mut(operand),
        Expr::Compare {
            left, comparators, ..
        } => {
            visitor.visit_expr_mut(left);
            for comparator in comparators {
                visitor.visit_expr_mut(comparator);
            }
        }
        Expr::Call { func, args } => {
            visitor.visit_expr_mut(func);
            for arg in args {
                visitor.visit_expr_mut(arg.value_mut());
            }
        }
        Expr::Attribute { value, .. } | Expr::Starred(value) => visitor.visit_expr_mut(value),
        Expr::Subscript { value, index } => {
            visitor.visit_expr_mut(value);
            visitor.visit_expr_mut(index);
        }
        Expr::Slice { lower, upper, step } => {
            for part in [lower, upper, step].into_iter().flatten() {
                visitor.visit_expr_mut(part);
            }
        }
        Expr::List(items) | Expr::Tuple(items) | Expr::Set(items) => {
            for item in items {
                visitor.visit_expr_mut(item);
            }
        }
        Expr::Dict(pairs) => {
            for (key, value) in pairs {
                visitor.visit_expr_mut(key);
                visitor.visit_expr_mut(value);
            }
        }
        Expr::Comprehension(comp) => {
            visitor.visit_expr_mut(&mut comp.element);
            if let Some(value) = &mut comp.value {
                visitor.visit_expr_mut(value);
            }
            for clause in &mut comp.clauses {
                visitor.visit_expr_mut(&mut clause.iter);
                visitor.visit_expr_mut(&mut clause.target);
                for cond in &mut clause.ifs {
                    visitor.visit_expr_mut(cond);
                }
            }
        }
        Expr::IfExp { test, body, orelse } => {
            visitor.visit_expr_mut(test);
            visitor.visit_expr_mut(body);
            visitor.visit_expr_mut(orelse);
        }
        Expr::Lambda { params, body } => {
            for param in params {
                if let Some(default) = &mut param.default {
                    visitor.visit_expr_mut(default);
                }
            }
            visitor.visit_expr_mut(body);
        }
        Expr::Name(_)
        | Expr::Int(_)
        | Expr::Float(_)
        | Expr::Str(_)
        | Expr::Bool(_)
        | Expr::NoneLit
        | Expr::Opaque(_) => {}
    }
}

/// Detects any call expression
#[derive(Debug, Default)]
pub struct CallFinder {
    /// Set once a call is seen
    pub found: bool,
}

impl<'ast> Visitor<'ast> for CallFinder {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if matches!(expr, Expr::Call { .. }) {
            self.found = true;
            return;
        }
        walk_expr(self, expr);
    }
}

struct Matches<'ast, P> {
    pred: P,
    found: Vec<&'ast Expr>,
}

impl<'ast, P: Fn(&Expr) -> bool> Visitor<'ast> for Matches<'ast, P> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if (self.pred)(expr) {
            self.found.push(expr);
        }
        walk_expr(self, expr);
    }
}

/// Every expression in `body` satisfying `pred`, in pre-order
pub fn find_exprs<'ast, P>(body: &'ast [Stmt], pred: P) -> Vec<&'ast Expr>
where
    P: Fn(&Expr) -> bool,
{
    let mut matches = Matches {
        pred,
        found: Vec::new(),
    };
    walk_body(&mut matches, body);
    matches.found
}

/// Every sub-expression of `expr` (inclusive) satisfying `pred`, in pre-order
pub fn find_in_expr<'ast, P>(expr: &'ast Expr, pred: P) -> Vec<&'ast Expr>
where
    P: Fn(&Expr) -> bool,
{
    let mut matches = Matches {
        pred,
        found: Vec::new(),
    };
    matches.visit_expr(expr);
    matches.found
}

/// Number of expressions in `body` satisfying `pred`
pub fn count_exprs<P>(body: &[Stmt], pred: P) -> usize
where
    P: Fn(&Expr) -> bool,
{
    find_exprs(body, pred).len()
}

struct NthRewriter<P, F> {
    pred: P,
    rewrite: Option<F>,
    target: usize,
    seen: usize,
}

impl<P, F> VisitorMut for NthRewriter<P, F>
where
    P: Fn(&Expr) -> bool,
    F: FnOnce(Expr) -> Expr,
{
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if self.rewrite.is_none() {
            return;
        }
        if (self.pred)(expr) {
            if self.seen == self.target {
                if let Some(rewrite) = self.rewrite.take() {
                    let old = std::mem::replace(expr, Expr::NoneLit);
                    *expr = rewrite(old);
                }
                return;
            }
            self.seen += 1;
        }
        walk_expr_mut(self, expr);
    }
}

/// Replace the `occurrence`-th expression matching `pred` (pre-order)
///
/// Returns `false` when fewer matches exist.
pub fn rewrite_nth_expr<P, F>(body: &mut [Stmt], occurrence: usize, pred: P, rewrite: F) -> bool
where
    P: Fn(&Expr) -> bool,
    F: FnOnce(Expr) -> Expr,
{
    let mut rewriter = NthRewriter {
        pred,
        rewrite: Some(rewrite),
        target: occurrence,
        seen: 0,
    };
    walk_body_mut(&mut rewriter, body);
    rewriter.rewrite.is_none()
}

struct NameSet<'a> {
    names: &'a mut BTreeSet<String>,
}

impl<'ast> Visitor<'ast> for NameSet<'_> {
    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Name(name) = expr {
            self.names.insert(name.clone());
        }
        walk_expr(self, expr);
    }
}

/// Identifiers appearing anywhere in `expr`
#[must_use]
pub fn names_in_expr(expr: &Expr) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    NameSet { names: &mut names }.visit_expr(expr);
    names
}

/// Identifiers appearing anywhere in `body`
#[must_use]
pub fn names_in_body(body: &[Stmt]) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    walk_body(&mut NameSet { names: &mut names }, body);
    names
}

/// Occurrences of identifier `name` in `expr`
#[must_use]
pub fn count_name(expr: &Expr, name: &str) -> usize {
    find_in_expr(expr, |e| e.is_name(name)).len()
}

struct Substitute<'a> {
    name: &'a str,
    replacement: &'a Expr,
}

impl VisitorMut for Substitute<'_> {
    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        if expr.is_name(self.name) {
            *expr = self.replacement.clone();
            return;
        }
        walk_expr_mut(self, expr);
    }
}

/// Replace every occurrence of identifier `name` in `expr` by `replacement`
pub fn substitute_name(expr: &mut Expr, name: &str, replacement: &Expr) {
    Substitute { name, replacement }.visit_expr_mut(expr);
}

struct Rename<'a> {
    from: &'a str,
    to: &'a str,
}

impl VisitorMut for Rename<'_> {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => {
                if def.name == self.from {
                    def.name = self.to.to_string();
                }
                for param in &mut def.params {
                    if param.name == self.from {
                        param.name = self.to.to_string();
                    }
                }
            }
            Stmt::Global(names) | Stmt::Nonlocal(names) => {
                for name in names {
                    if name == self.from {
                        *name = self.to.to_string();
                    }
                }
            }
            Stmt::Try { handlers, .. } => {
                for handler in handlers {
                    if handler.name.as_deref() == Some(self.from) {
                        handler.name = Some(self.to.to_string());
                    }
                }
            }
            _ => {}
        }
        walk_stmt_mut(self, stmt);
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Name(name) if name == self.from => *name = self.to.to_string(),
            Expr::Lambda { params, .. } => {
                for param in params {
                    if param.name == self.from {
                        param.name = self.to.to_string();
                    }
                }
            }
            _ => {}
        }
        walk_expr_mut(self, expr);
    }
}

/// Rename identifier `from` to `to` throughout `body`, including parameters
/// and handler bindings
pub fn rename_in_body(body: &mut [Stmt], from: &str, to: &str) {
    walk_body_mut(&mut Rename { from, to }, body);
}

/// Whether `expr` contains a call to a function named `callee`
#[must_use]
pub fn calls_named(expr: &Expr, callee: &str) -> bool {
    !find_in_expr(expr, |e| matches!(e, Expr::Call { func, .. } if func.is_name(callee))).is_empty()
}

/// Positional arguments when every argument is positional
#[must_use]
pub fn positional_args(args: &[Arg]) -> Option<Vec<&Expr>> {
    args.iter()
        .map(|arg| match arg {
            Arg::Positional(e) => Some(e),
            _ => None,
        })
        .collect()
}

/// Nested statement blocks of `stmt`, in traversal order
#[must_use]
pub fn child_blocks(stmt: &Stmt) -> Vec<&[Stmt]> {
    match stmt {
        Stmt::FunctionDef(def) => vec![def.body.as_slice()],
        Stmt::If { body, orelse, .. }
        | Stmt::For { body, orelse, .. }
        | Stmt::While { body, orelse, .. } => vec![body.as_slice(), orelse.as_slice()],
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            let mut blocks = vec![body.as_slice()];
            blocks.extend(handlers.iter().map(|h| h.body.as_slice()));
            blocks.push(orelse.as_slice());
            blocks.push(finalbody.as_slice());
            blocks
        }
        _ => Vec::new(),
    }
}

fn child_blocks_mut(stmt: &mut Stmt) -> Vec<&mut Vec<Stmt>> {
    match stmt {
        Stmt::FunctionDef(def) => vec![&mut def.body],
        Stmt::If { body, orelse, .. }
        | Stmt::For { body, orelse, .. }
        | Stmt::While { body, orelse, .. } => vec![body, orelse],
        Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        } => {
            let mut blocks = vec![body];
            blocks.extend(handlers.iter_mut().map(|h| &mut h.body));
            blocks.push(orelse);
            blocks.push(finalbody);
            blocks
        }
        _ => Vec::new(),
    }
}

/// Statement positions `(block, index)` satisfying `pred`, pre-order over
/// nested blocks
pub fn block_sites<'ast, P>(body: &'ast [Stmt], pred: P) -> Vec<(&'ast [Stmt], usize)>
where
    P: Fn(&[Stmt], usize) -> bool,
{
    fn collect<'ast, P>(block: &'ast [Stmt], pred: &P, out: &mut Vec<(&'ast [Stmt], usize)>)
    where
        P: Fn(&[Stmt], usize) -> bool,
    {
        for i in 0..block.len() {
            if pred(block, i) {
                out.push((block, i));
            }
            for child in child_blocks(&block[i]) {
                collect(child, pred, out);
            }
        }
    }
    let mut out = Vec::new();
    collect(body, &pred, &mut out);
    out
}

/// Apply `edit` to the `occurrence`-th position matched by [`block_sites`]
///
/// Returns `None` when fewer matches exist.
pub fn with_nth_block_site<P, F, R>(
    body: &mut Vec<Stmt>,
    occurrence: usize,
    pred: P,
    edit: F,
) -> Option<R>
where
    P: Fn(&[Stmt], usize) -> bool,
    F: FnOnce(&mut Vec<Stmt>, usize) -> R,
{
    fn visit<P, F, R>(
        block: &mut Vec<Stmt>,
        pred: &P,
        seen: &mut usize,
        target: usize,
        edit: &mut Option<F>,
    ) -> Option<R>
    where
        P: Fn(&[Stmt], usize) -> bool,
        F: FnOnce(&mut Vec<Stmt>, usize) -> R,
    {
        for i in 0..block.len() {
            if pred(block, i) {
                if *seen == target {
                    return edit.take().map(|edit| edit(block, i));
                }
                *seen += 1;
            }
            for child in child_blocks_mut(&mut block[i]) {
                if let Some(result) = visit(child, pred, seen, target, edit) {
                    return Some(result);
                }
            }
        }
        None
    }
    let mut seen = 0;
    visit(body, &pred, &mut seen, occurrence, &mut Some(edit))
}
