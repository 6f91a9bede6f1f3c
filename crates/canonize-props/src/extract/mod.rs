//! Property extraction
//!
//! Pure function from source text to a [`PropertySet`]. Every kind except
//! the structure-hash pair is computed on the alpha-normalized module, so
//! only that pair is sensitive to local naming.

mod data;
mod flow;
mod shape;

use canonize_syntax::{alpha_normalize, parse_module, FunctionDef, Module, StructureHashes};
use serde::{Deserialize, Serialize};

use crate::kind::PropertyKind;
use crate::value::{PropertySet, PropertyValue};

/// Which optional fields extraction fills
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Counts and shapes only
    Baseline,
    /// Adds printed conditions and exit signatures
    #[default]
    Enhanced,
}

/// Normalized module under analysis
pub(crate) struct Analysis<'m> {
    pub(crate) module: &'m Module,
    pub(crate) entry: Option<&'m FunctionDef>,
    pub(crate) enhanced: bool,
}

/// Source to property set
#[derive(Debug, Clone, Copy, Default)]
pub struct PropertyExtractor {
    mode: ExtractionMode,
}

impl PropertyExtractor {
    /// Create an extractor for the given mode
    #[inline]
    #[must_use]
    pub const fn new(mode: ExtractionMode) -> Self {
        Self { mode }
    }

    /// Configured mode
    #[inline]
    #[must_use]
    pub const fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Extract every kind; unparsable source yields the null set
    #[must_use]
    pub fn extract(&self, source: &str) -> PropertySet {
        match parse_module(source) {
            Ok(module) => self.extract_module(&module),
            Err(err) => {
                tracing::debug!(error = %err, "unparsable source, null property set");
                PropertySet::null()
            }
        }
    }

    /// Extract every kind from an already parsed module
    #[must_use]
    pub fn extract_module(&self, module: &Module) -> PropertySet {
        let normalized = alpha_normalize(module);
        let analysis = self.analysis(&normalized);
        PropertyKind::ALL
            .into_iter()
            .map(|kind| Self::value(&analysis, module, kind))
            .collect()
    }

    /// Extract a single kind from an already parsed module
    #[must_use]
    pub fn extract_kind(&self, module: &Module, kind: PropertyKind) -> PropertyValue {
        let normalized = alpha_normalize(module);
        Self::value(&self.analysis(&normalized), module, kind)
    }

    fn analysis<'m>(&self, normalized: &'m Module) -> Analysis<'m> {
        Analysis {
            module: normalized,
            entry: normalized.primary_function(),
            enhanced: self.mode == ExtractionMode::Enhanced,
        }
    }

    fn value(analysis: &Analysis<'_>, original: &Module, kind: PropertyKind) -> PropertyValue {
        match kind {
            PropertyKind::ControlFlow => PropertyValue::ControlFlow(flow::control_flow(analysis)),
            PropertyKind::DataDependency => {
                PropertyValue::DataDependency(data::data_dependency(analysis))
            }
            PropertyKind::ExecutionPaths => {
                PropertyValue::ExecutionPaths(flow::execution_paths(analysis))
            }
            PropertyKind::FunctionContracts => {
                PropertyValue::FunctionContracts(data::function_contracts(analysis))
            }
            PropertyKind::Complexity => PropertyValue::Complexity(flow::complexity(analysis)),
            PropertyKind::SideEffects => PropertyValue::SideEffects(data::side_effects(analysis)),
            PropertyKind::Termination => PropertyValue::Termination(flow::termination(analysis)),
            PropertyKind::AlgebraicStructure => {
                PropertyValue::AlgebraicStructure(shape::algebraic(analysis))
            }
            PropertyKind::NumericalBehavior => {
                PropertyValue::NumericalBehavior(shape::numerical(analysis))
            }
            PropertyKind::LogicalEquivalence => {
                PropertyValue::LogicalEquivalence(shape::logical(analysis))
            }
            PropertyKind::NormalizedStructure => {
                PropertyValue::NormalizedStructure(StructureHashes::of(original))
            }
            PropertyKind::OperatorPrecedence => {
                PropertyValue::OperatorPrecedence(shape::operator_precedence(analysis))
            }
            PropertyKind::StatementOrdering => {
                PropertyValue::StatementOrdering(shape::statement_ordering(analysis))
            }
            PropertyKind::RecursionSchema => {
                PropertyValue::RecursionSchema(flow::recursion_schema(analysis))
            }
        }
    }
}
