//! Strategy registry
//!
//! [`StrategyRegistry`] maps an explained difference to the strategies that
//! may close it.

use canonize_explain::PropertyDifference;

use crate::strategies;
use crate::strategy::TransformationStrategy;

/// Ordered set of strategies, unique by name
///
/// Registration order is the order in which applicable strategies are tried
/// for one difference.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn TransformationStrategy>>,
}

impl StrategyRegistry {
    /// Registry with no strategies
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Vec::new(),
        }
    }

    /// The twenty built-in strategies, in family order
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for strategy in strategies::defaults() {
            registry.register(strategy);
        }
        registry
    }

    /// Register a strategy, replacing any registered under the same name
    pub fn register(&mut self, strategy: Box<dyn TransformationStrategy>) {
        match self
            .strategies
            .iter_mut()
            .find(|existing| existing.name() == strategy.name())
        {
            Some(slot) => *slot = strategy,
            None => self.strategies.push(strategy),
        }
    }

    /// Whether `name` is registered
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Unregister `name`; `false` if it was absent
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.strategies.len();
        self.strategies.retain(|strategy| strategy.name() != name);
        self.strategies.len() != before
    }

    /// Look up a strategy by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&dyn TransformationStrategy> {
        self.iter().find(|strategy| strategy.name() == name)
    }

    /// Registered names, in registration order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Number of registered strategies
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Whether nothing is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Strategies in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn TransformationStrategy> {
        self.strategies.iter().map(AsRef::as_ref)
    }

    /// Strategies serving the difference's property kind and handling its tag
    #[must_use]
    pub fn applicable(&self, difference: &PropertyDifference) -> Vec<&dyn TransformationStrategy> {
        self.iter()
            .filter(|strategy| {
                strategy.kind() == difference.kind && strategy.handles(difference.difference_type)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{InlineReturnChain, LiteralAlignment};
    use canonize_explain::{DifferenceType, TransformationHints};

    #[test]
    fn defaults_are_complete() {
        let registry = StrategyRegistry::with_defaults();
        assert_eq!(registry.len(), 20);
        assert!(registry.contains("identifier_rename"));
        assert!(!registry.contains("oracle_guided_template"));
        assert_eq!(registry.names()[0], "inline_return_chain");
    }

    #[test]
    fn register_replaces_by_name() {
        let mut registry = StrategyRegistry::new();
        registry.register(Box::new(InlineReturnChain));
        registry.register(Box::new(InlineReturnChain));
        assert_eq!(registry.len(), 1);
        assert!(registry.remove("inline_return_chain"));
        assert!(!registry.remove("inline_return_chain"));
        assert!(registry.is_empty());
    }

    #[test]
    fn every_strategy_tag_has_a_strategy() {
        let registry = StrategyRegistry::with_defaults();
        for ty in DifferenceType::ALL {
            let difference = PropertyDifference::new(ty, TransformationHints::None);
            let found = registry.applicable(&difference);
            if ty.is_diagnostic() {
                assert!(found.is_empty(), "{ty:?}");
            } else {
                assert!(!found.is_empty(), "{ty:?}");
            }
        }
    }

    #[test]
    fn literal_alignment_serves_both_literal_tags() {
        let mut registry = StrategyRegistry::new();
        registry.register(Box::new(LiteralAlignment));
        for ty in [
            DifferenceType::StringLiteralVariant,
            DifferenceType::RegexCharacterClassVariant,
        ] {
            let difference = PropertyDifference::new(ty, TransformationHints::None);
            assert_eq!(registry.applicable(&difference).len(), 1);
        }
    }
}
