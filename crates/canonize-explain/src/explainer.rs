//! Explainer trait and registry

use std::collections::BTreeMap;
use std::fmt;

use canonize_props::{KindDistance, PropertyKind, PropertySet, PropertyValue};

use crate::context::ExplainContext;
use crate::difference::PropertyDifference;
use crate::error::ExplainError;
use crate::explainers;

/// Turns a nonzero per-property distance into a typed difference
///
/// An explainer recognizes a small closed set of idioms for its kind and
/// returns `Ok(None)` for anything else; it never reports a difference it
/// cannot tag.
pub trait DifferenceExplainer: Send + Sync {
    /// Kind this explainer serves
    fn kind(&self) -> PropertyKind;

    /// Stable name for logging
    fn name(&self) -> &'static str;

    /// Explain the mismatch between two values of [`Self::kind`]
    ///
    /// # Errors
    /// Returns [`ExplainError::KindMismatch`] when either value is of another kind
    fn explain(
        &self,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError>;
}

/// One explainer per property kind
#[derive(Default)]
pub struct ExplainerRegistry {
    explainers: BTreeMap<PropertyKind, Box<dyn DifferenceExplainer>>,
}

impl fmt::Debug for ExplainerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExplainerRegistry")
            .field("kinds", &self.explainers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ExplainerRegistry {
    /// Create an empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in explainer of every kind
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for explainer in explainers::defaults() {
            registry.register(explainer);
        }
        registry
    }

    /// Register an explainer, returning the one it replaces
    pub fn register(
        &mut self,
        explainer: Box<dyn DifferenceExplainer>,
    ) -> Option<Box<dyn DifferenceExplainer>> {
        self.explainers.insert(explainer.kind(), explainer)
    }

    /// Explainer of `kind`
    #[must_use]
    pub fn get(&self, kind: PropertyKind) -> Option<&dyn DifferenceExplainer> {
        self.explainers.get(&kind).map(AsRef::as_ref)
    }

    /// Whether `kind` has an explainer
    #[inline]
    #[must_use]
    pub fn contains(&self, kind: PropertyKind) -> bool {
        self.explainers.contains_key(&kind)
    }

    /// Number of registered explainers
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.explainers.len()
    }

    /// Whether no explainer is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.explainers.is_empty()
    }

    /// Explain one kind
    ///
    /// # Errors
    /// Returns error when no explainer serves `kind` or the explainer fails
    pub fn explain(
        &self,
        kind: PropertyKind,
        candidate: &PropertyValue,
        canon: &PropertyValue,
        ctx: &ExplainContext<'_>,
    ) -> Result<Option<PropertyDifference>, ExplainError> {
        let explainer = self.get(kind).ok_or(ExplainError::NoExplainer(kind))?;
        let explained = explainer.explain(candidate, canon, ctx)?;
        tracing::debug!(
            explainer = explainer.name(),
            explained = explained.as_ref().map(|d| d.difference_type.tag()),
            "explained {kind}"
        );
        Ok(explained)
    }

    /// Explain every kind with a nonzero distance
    ///
    /// Differences come back severity-descending; equal severities keep
    /// kind declaration order. Kinds without an explainer are skipped.
    ///
    /// # Errors
    /// Returns the first explainer failure
    pub fn explain_all(
        &self,
        candidate: &PropertySet,
        canon: &PropertySet,
        distances: &[KindDistance],
        ctx: &ExplainContext<'_>,
    ) -> Result<Vec<PropertyDifference>, ExplainError> {
        let mut differences = Vec::new();
        for distance in distances.iter().filter(|d| d.distance > 0.0) {
            if !self.contains(distance.kind) {
                continue;
            }
            let (Some(a), Some(b)) = (candidate.get(distance.kind), canon.get(distance.kind))
            else {
                continue;
            };
            if let Some(difference) = self.explain(distance.kind, a, b, ctx)? {
                differences.push(difference);
            }
        }
        differences.sort_by(|a, b| {
            b.severity
                .total_cmp(&a.severity)
                .then_with(|| a.kind.cmp(&b.kind))
        });
        Ok(differences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_kind() {
        let registry = ExplainerRegistry::with_defaults();
        assert_eq!(registry.len(), PropertyKind::COUNT);
        for kind in PropertyKind::ALL {
            let explainer = registry.get(kind).unwrap();
            assert_eq!(explainer.kind(), kind);
        }
    }

    #[test]
    fn missing_explainer_is_an_error() {
        let registry = ExplainerRegistry::new();
        let value = PropertyValue::StatementOrdering(Vec::new());
        let module = canonize_syntax::Module::default();
        let view = crate::SourceView::new("", &module);
        let ctx = ExplainContext::new(view, view);
        assert_eq!(
            registry.explain(PropertyKind::StatementOrdering, &value, &value, &ctx),
            Err(ExplainError::NoExplainer(PropertyKind::StatementOrdering))
        );
    }
}
