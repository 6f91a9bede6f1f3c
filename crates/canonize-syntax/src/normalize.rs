//! Alpha-normalization and structure hashing
//!
//! Alpha-normalization renames every function-local binding to a positional
//! placeholder (`_v0`, `_v1`, ...) assigned in binding order: parameters
//! first, then locals in first-binding order, then lambda and comprehension
//! scopes as they are reached. Top-level function names, globals and
//! builtins keep their spelling, so two functions that differ only in local
//! naming normalize to the same text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, FunctionDef, Module, Stmt};
use crate::hash::ContentHash;
use crate::printer::print_module;
use crate::scope::{bound_names, declared_outer, target_names};
use crate::visit::{walk_body_mut, walk_expr_mut, walk_stmt_mut, VisitorMut};

/// Copy of `module` with function-local names replaced by placeholders
#[must_use]
pub fn alpha_normalize(module: &Module) -> Module {
    let mut normalized = module.clone();
    for stmt in &mut normalized.body {
        if let Stmt::FunctionDef(def) = stmt {
            AlphaRenamer::default().function(def);
        }
    }
    normalized
}

#[derive(Default)]
struct AlphaRenamer {
    counter: usize,
    scopes: Vec<BTreeMap<String, String>>,
}

impl AlphaRenamer {
    fn fresh(&mut self) -> String {
        let name = format!("_v{}", self.counter);
        self.counter += 1;
        name
    }

    fn resolve(&self, name: &str) -> Option<String> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name))
            .cloned()
    }

    fn function(&mut self, def: &mut FunctionDef) {
        for decorator in &mut def.decorators {
            self.visit_expr_mut(decorator);
        }
        for param in &mut def.params {
            if let Some(default) = &mut param.default {
                self.visit_expr_mut(default);
            }
        }

        let outer = declared_outer(&def.body);
        let mut scope = BTreeMap::new();
        for param in &mut def.params {
            if param.kind.is_separator() {
                continue;
            }
            let fresh = self.fresh();
            scope.insert(std::mem::replace(&mut param.name, fresh.clone()), fresh);
        }
        for name in bound_names(&def.body, false) {
            if outer.contains(&name) || scope.contains_key(&name) {
                continue;
            }
            let fresh = self.fresh();
            scope.insert(name, fresh);
        }

        self.scopes.push(scope);
        walk_body_mut(self, &mut def.body);
        self.scopes.pop();
    }
}

impl VisitorMut for AlphaRenamer {
    fn visit_stmt_mut(&mut self, stmt: &mut Stmt) {
        match stmt {
            Stmt::FunctionDef(def) => {
                if let Some(fresh) = self.resolve(&def.name) {
                    def.name = fresh;
                }
                self.function(def);
            }
            Stmt::Nonlocal(names) => {
                for name in names {
                    if let Some(fresh) = self.resolve(name) {
                        *name = fresh;
                    }
                }
            }
            Stmt::Import(aliases) | Stmt::ImportFrom { names: aliases, .. } => {
                for alias in aliases {
                    if let Some(fresh) = self.resolve(alias.bound_name()) {
                        alias.asname = Some(fresh);
                    }
                }
            }
            Stmt::Try { handlers, .. } => {
                for handler in handlers.iter_mut() {
                    if let Some(name) = handler.name.as_mut() {
                        if let Some(fresh) = self.resolve(name) {
                            *name = fresh;
                        }
                    }
                }
                walk_stmt_mut(self, stmt);
            }
            _ => walk_stmt_mut(self, stmt),
        }
    }

    fn visit_expr_mut(&mut self, expr: &mut Expr) {
        match expr {
            Expr::Name(name) => {
                if let Some(fresh) = self.resolve(name) {
                    *name = fresh;
                }
            }
            Expr::Lambda { params, body } => {
                for param in params.iter_mut() {
                    if let Some(default) = &mut param.default {
                        self.visit_expr_mut(default);
                    }
                }
                let mut scope = BTreeMap::new();
                for param in params.iter_mut() {
                    if param.kind.is_separator() {
                        continue;
                    }
                    let fresh = self.fresh();
                    scope.insert(std::mem::replace(&mut param.name, fresh.clone()), fresh);
                }
                self.scopes.push(scope);
                self.visit_expr_mut(body);
                self.scopes.pop();
            }
            Expr::Comprehension(comp) => {
                // The outermost iterable is evaluated in the enclosing scope
                if let Some(first) = comp.clauses.first_mut() {
                    self.visit_expr_mut(&mut first.iter);
                }
                let mut names = Vec::new();
                for clause in &comp.clauses {
                    target_names(&clause.target, &mut names);
                }
                let mut scope = BTreeMap::new();
                for name in names {
                    let fresh = self.fresh();
                    scope.insert(name, fresh);
                }
                self.scopes.push(scope);
                for (i, clause) in comp.clauses.iter_mut().enumerate() {
                    if i > 0 {
                        self.visit_expr_mut(&mut clause.iter);
                    }
                    self.visit_expr_mut(&mut clause.target);
                    for cond in &mut clause.ifs {
                        self.visit_expr_mut(cond);
                    }
                }
                self.visit_expr_mut(&mut comp.element);
                if let Some(value) = &mut comp.value {
                    self.visit_expr_mut(value);
                }
                self.scopes.pop();
            }
            _ => walk_expr_mut(self, expr),
        }
    }
}

/// Literal and name-invariant hashes of a module's canonical printing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructureHashes {
    /// Hash of the printed module as written
    pub literal: ContentHash,
    /// Hash of the printed alpha-normalized module
    pub name_invariant: ContentHash,
}

impl StructureHashes {
    /// Hash both renditions of `module`
    #[must_use]
    pub fn of(module: &Module) -> Self {
        Self {
            literal: ContentHash::of_text(&print_module(module)),
            name_invariant: ContentHash::of_text(&print_module(&alpha_normalize(module))),
        }
    }

    /// The hash to compare: literal when names matter, else name-invariant
    #[inline]
    #[must_use]
    pub fn select(&self, name_sensitive: bool) -> ContentHash {
        if name_sensitive {
            self.literal
        } else {
            self.name_invariant
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_module;
    use pretty_assertions::assert_eq;

    fn normalized(source: &str) -> String {
        print_module(&alpha_normalize(&parse_module(source).unwrap()))
    }

    #[test]
    fn parameters_then_locals() {
        assert_eq!(
            normalized("def f(a, b):\n    total = a + b\n    return total\n"),
            "def f(_v0, _v1):\n    _v2 = _v0 + _v1\n    return _v2\n"
        );
    }

    #[test]
    fn comprehension_targets_get_their_own_scope() {
        assert_eq!(
            normalized("def f(xs):\n    return [x for x in xs if x]\n"),
            "def f(_v0):\n    return [_v1 for _v1 in _v0 if _v1]\n"
        );
    }

    #[test]
    fn globals_and_builtins_keep_their_names() {
        assert_eq!(
            normalized("LIMIT = 3\n\ndef f(xs):\n    return len(xs) < LIMIT\n"),
            "LIMIT = 3\n\n\ndef f(_v0):\n    return len(_v0) < LIMIT\n"
        );
    }

    #[test]
    fn lambda_parameters_are_renamed() {
        assert_eq!(
            normalized("def f(xs):\n    key = lambda item: -item\n    return sorted(xs, key=key)\n"),
            "def f(_v0):\n    _v1 = lambda _v2: -_v2\n    return sorted(_v0, key=_v1)\n"
        );
    }

    #[test]
    fn name_invariant_hash_ignores_local_spelling() {
        let hashes = |source: &str| StructureHashes::of(&parse_module(source).unwrap());
        let a = hashes("def total(items):\n    return sum(items)\n");
        let b = hashes("def total(arr):\n    return sum(arr)\n");
        assert_eq!(a.name_invariant, b.name_invariant);
        assert_ne!(a.literal, b.literal);
        assert_ne!(a.select(true), b.select(true));
        assert_eq!(a.select(false), b.select(false));
    }

    #[test]
    fn function_name_is_significant() {
        let a = StructureHashes::of(&parse_module("def f(n):\n    return n\n").unwrap());
        let b = StructureHashes::of(&parse_module("def g(n):\n    return n\n").unwrap());
        assert_ne!(a.name_invariant, b.name_invariant);
    }
}
