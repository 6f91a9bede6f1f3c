//! Data-dependency, signature and side-effect facets

use std::collections::{BTreeMap, BTreeSet};

use canonize_syntax::visit::{
    block_sites, names_in_expr, walk_body, walk_expr, walk_stmt, Visitor,
};
use canonize_syntax::{is_builtin, target_names, Expr, FunctionDef, ParamKind, Stmt};
use petgraph::algo::{condensation, toposort};
use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;

use super::Analysis;
use crate::idioms;
use crate::value::{DataDependency, FunctionContracts, SideEffects};

fn reads(expr: &Expr) -> BTreeSet<String> {
    names_in_expr(expr)
        .into_iter()
        .filter(|name| !is_builtin(name))
        .collect()
}

fn record(
    edges: &mut BTreeMap<String, BTreeSet<String>>,
    target: &Expr,
    sources: &BTreeSet<String>,
) {
    let mut names = Vec::new();
    target_names(target, &mut names);
    for name in names {
        edges.entry(name).or_default().extend(sources.iter().cloned());
    }
}

fn collect_edges(def: &FunctionDef, edges: &mut BTreeMap<String, BTreeSet<String>>) {
    for (block, i) in block_sites(&def.body, |_, _| true) {
        match &block[i] {
            Stmt::Assign { targets, value, .. } => {
                let sources = reads(value);
                for target in targets {
                    record(edges, target, &sources);
                }
            }
            Stmt::AugAssign { target, value, .. } => {
                let mut sources = reads(value);
                sources.extend(reads(target));
                record(edges, target, &sources);
            }
            Stmt::For { target, iter, .. } => record(edges, target, &reads(iter)),
            _ => {}
        }
    }
}

/// Longest path, in edges, through the condensed dependency graph
fn longest_chain(edges: &BTreeMap<String, BTreeSet<String>>) -> usize {
    let mut graph = DiGraphMap::<&str, ()>::new();
    for (target, sources) in edges {
        graph.add_node(target.as_str());
        for source in sources {
            if source != target {
                graph.add_edge(target.as_str(), source.as_str(), ());
            }
        }
    }
    let condensed = condensation(graph.into_graph::<u32>(), true);
    let Ok(order) = toposort(&condensed, None) else {
        return 0;
    };
    let mut longest = vec![0usize; condensed.node_count()];
    for node in order.into_iter().rev() {
        let best = condensed
            .neighbors_directed(node, Direction::Outgoing)
            .map(|next| longest[next.index()] + 1)
            .max()
            .unwrap_or(0);
        longest[node.index()] = best;
    }
    longest.into_iter().max().unwrap_or(0)
}

pub(crate) fn data_dependency(analysis: &Analysis<'_>) -> DataDependency {
    let mut edges = BTreeMap::new();
    for def in analysis.module.functions() {
        collect_edges(def, &mut edges);
    }
    DataDependency {
        max_chain: longest_chain(&edges),
        dead_stores: idioms::dead_store_sites(analysis.module).len(),
        edges,
    }
}

fn return_form(value: Option<&Expr>) -> &'static str {
    let Some(value) = value else {
        return "none";
    };
    match value {
        Expr::Name(_) => "name",
        e if e.is_literal() => "literal",
        Expr::Call { .. } => "call",
        Expr::BinOp { .. } => "arithmetic",
        Expr::Unary {
            op: canonize_syntax::UnaryOp::Not,
            ..
        } => "negation",
        Expr::Unary { .. } => "arithmetic",
        Expr::Compare { .. } => "comparison",
        Expr::BoolOp { .. } => "boolean",
        Expr::IfExp { .. } => "conditional",
        Expr::Comprehension(_) => "comprehension",
        Expr::List(_) | Expr::Tuple(_) | Expr::Set(_) | Expr::Dict(_) => "collection",
        Expr::Subscript { .. } | Expr::Attribute { .. } => "access",
        _ => "other",
    }
}

pub(crate) fn function_contracts(analysis: &Analysis<'_>) -> FunctionContracts {
    let mut contracts = FunctionContracts {
        functions: analysis.module.functions().count(),
        ..FunctionContracts::default()
    };
    let Some(def) = analysis.entry else {
        return contracts;
    };
    contracts.arity = def.param_names().count();
    contracts.defaults = def.params.iter().filter(|p| p.default.is_some()).count();
    contracts.var_args = def.params.iter().any(|p| p.kind == ParamKind::VarArgs);
    contracts.var_kwargs = def.params.iter().any(|p| p.kind == ParamKind::KwArgs);
    contracts.annotated =
        def.returns.is_some() || def.params.iter().any(|p| p.annotation.is_some());
    contracts.docstring = def.docstring().is_some();
    contracts.return_forms = block_sites(&def.body, |b, i| matches!(b[i], Stmt::Return(_)))
        .into_iter()
        .filter_map(|(block, i)| match &block[i] {
            Stmt::Return(value) => Some(return_form(value.as_ref()).to_string()),
            _ => None,
        })
        .collect();
    contracts
}

const IO_FUNCTIONS: &[&str] = &["input", "open"];
const IO_METHODS: &[&str] = &["flush", "read", "readline", "readlines", "write", "writelines"];
const MUTATING_METHODS: &[&str] = &[
    "add",
    "append",
    "clear",
    "discard",
    "extend",
    "insert",
    "pop",
    "popitem",
    "remove",
    "reverse",
    "setdefault",
    "sort",
    "update",
];

#[derive(Default)]
struct Effects {
    found: SideEffects,
}

impl Effects {
    fn write_target(&mut self, target: &Expr) {
        match target {
            Expr::Attribute { .. } => self.found.attribute_writes += 1,
            Expr::Subscript { .. } => self.found.subscript_writes += 1,
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.write_target(item);
                }
            }
            Expr::Starred(inner) => self.write_target(inner),
            _ => {}
        }
    }
}

impl<'ast> Visitor<'ast> for Effects {
    fn visit_stmt(&mut self, stmt: &'ast Stmt) {
        match stmt {
            Stmt::Assign { targets, .. } => {
                for target in targets {
                    self.write_target(target);
                }
            }
            Stmt::AugAssign { target, .. } => self.write_target(target),
            Stmt::Global(names) | Stmt::Nonlocal(names) => self.found.global_writes += names.len(),
            Stmt::Raise { .. } => self.found.raises += 1,
            _ => {}
        }
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: &'ast Expr) {
        if let Expr::Call { func, .. } = expr {
            match &**func {
                Expr::Name(name) if name == "print" => self.found.prints += 1,
                Expr::Name(name) if IO_FUNCTIONS.contains(&name.as_str()) => {
                    self.found.io_calls += 1;
                }
                Expr::Attribute { attr, .. } if IO_METHODS.contains(&attr.as_str()) => {
                    self.found.io_calls += 1;
                }
                Expr::Attribute { attr, .. } if MUTATING_METHODS.contains(&attr.as_str()) => {
                    self.found.mutating_calls += 1;
                }
                _ => {}
            }
        }
        walk_expr(self, expr);
    }
}

pub(crate) fn side_effects(analysis: &Analysis<'_>) -> SideEffects {
    let mut effects = Effects::default();
    for def in analysis.module.functions() {
        walk_body(&mut effects, &def.body);
    }
    let mut found = effects.found;
    found.pure = found.prints == 0
        && found.io_calls == 0
        && found.mutating_calls == 0
        && found.global_writes == 0
        && found.attribute_writes == 0
        && found.subscript_writes == 0;
    found
}
