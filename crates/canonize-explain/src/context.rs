//! What an explainer sees besides the two property values

use canonize_contract::NamingPolicy;
use canonize_props::idioms::{self, Site};
use canonize_syntax::visit::block_sites;
use canonize_syntax::{Expr, FunctionDef, Module, Stmt};

/// One side of the comparison: source text and its parsed module
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    /// Source text
    pub text: &'a str,
    /// Parsed module
    pub module: &'a Module,
}

impl<'a> SourceView<'a> {
    /// Create a view
    #[inline]
    #[must_use]
    pub const fn new(text: &'a str, module: &'a Module) -> Self {
        Self { text, module }
    }

    /// Entry function: the named one if present, else the first
    #[must_use]
    pub fn entry(&self, name: Option<&str>) -> Option<&'a FunctionDef> {
        name.and_then(|n| self.module.function(n))
            .or_else(|| self.module.primary_function())
    }

    /// Sites of expressions matching `pred`
    #[must_use]
    pub fn expr_sites(&self, pred: &dyn Fn(&Expr) -> bool) -> Vec<Site> {
        idioms::expr_sites(self.module, pred)
    }

    /// Sites of statement positions matching `pred`
    #[must_use]
    pub fn stmt_sites(&self, pred: &dyn Fn(&[Stmt], usize) -> bool) -> Vec<Site> {
        idioms::stmt_sites(self.module, pred)
    }

    /// Resolve a statement site back to its `(block, index)`
    #[must_use]
    pub fn block_site(
        &self,
        site: &Site,
        pred: &dyn Fn(&[Stmt], usize) -> bool,
    ) -> Option<(&'a [Stmt], usize)> {
        let def = self.module.function(&site.function)?;
        block_sites(&def.body, pred).into_iter().nth(site.occurrence)
    }
}

/// Inputs shared by every explainer for one comparison
#[derive(Debug, Clone, Copy)]
pub struct ExplainContext<'a> {
    /// Candidate side
    pub candidate: SourceView<'a>,
    /// Canon side
    pub canon: SourceView<'a>,
    /// Naming policy in force, if any
    pub naming: Option<&'a NamingPolicy>,
    /// Contract entry point, if known
    pub entry_point: Option<&'a str>,
}

impl<'a> ExplainContext<'a> {
    /// Create a context without naming policy or entry point
    #[must_use]
    pub const fn new(candidate: SourceView<'a>, canon: SourceView<'a>) -> Self {
        Self {
            candidate,
            canon,
            naming: None,
            entry_point: None,
        }
    }

    /// Set the naming policy in force
    #[must_use]
    pub fn with_naming(mut self, naming: Option<&'a NamingPolicy>) -> Self {
        self.naming = naming;
        self
    }

    /// Set the contract entry point
    #[must_use]
    pub fn with_entry_point(mut self, entry_point: Option<&'a str>) -> Self {
        self.entry_point = entry_point;
        self
    }
}
