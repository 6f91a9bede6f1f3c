//! Three-tier naming policy
//!
//! - **fixed**: names that are never renamed, nor used as a rename target
//! - **flexible**: names eligible for renaming, either any name or an explicit set
//! - **strict**: global switch that disables renaming entirely
//!
//! An omitted flexible list means every non-fixed name is flexible. An
//! explicitly empty list means nothing is.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Which identifiers may be renamed
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<BTreeSet<String>>", into = "Option<BTreeSet<String>>")]
pub enum FlexibleNames {
    /// Every identifier not listed as fixed
    #[default]
    Any,
    /// Only the listed identifiers; an empty set admits none
    Only(BTreeSet<String>),
}

impl FlexibleNames {
    /// Whether `name` is eligible
    #[must_use]
    pub fn admits(&self, name: &str) -> bool {
        match self {
            Self::Any => true,
            Self::Only(names) => names.contains(name),
        }
    }

    /// Unrestricted
    #[inline]
    #[must_use]
    pub fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }
}

impl From<Option<BTreeSet<String>>> for FlexibleNames {
    fn from(value: Option<BTreeSet<String>>) -> Self {
        value.map_or(Self::Any, Self::Only)
    }
}

impl From<FlexibleNames> for Option<BTreeSet<String>> {
    fn from(value: FlexibleNames) -> Self {
        match value {
            FlexibleNames::Any => None,
            FlexibleNames::Only(names) => Some(names),
        }
    }
}

/// Naming policy in force for a transformation run
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NamingPolicy {
    /// Names never renamed
    #[serde(default)]
    pub fixed: BTreeSet<String>,
    /// Names eligible for renaming
    #[serde(default, skip_serializing_if = "FlexibleNames::is_any")]
    pub flexible: FlexibleNames,
    /// Disable all renaming
    #[serde(default)]
    pub strict: bool,
}

impl NamingPolicy {
    /// Every non-fixed name may be renamed
    #[must_use]
    pub fn permissive() -> Self {
        Self::default()
    }

    /// No name may be renamed
    #[must_use]
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }

    /// Only the given names may be renamed
    #[must_use]
    pub fn flexible<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flexible: FlexibleNames::Only(names.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Add fixed names
    #[must_use]
    pub fn with_fixed<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fixed.extend(names.into_iter().map(Into::into));
        self
    }

    /// Whether any rename could be admitted at all
    #[must_use]
    pub fn allows_renaming(&self) -> bool {
        if self.strict {
            return false;
        }
        match &self.flexible {
            FlexibleNames::Any => true,
            FlexibleNames::Only(names) => names.iter().any(|n| !self.fixed.contains(n)),
        }
    }

    /// Whether `from` may be renamed to `to`
    #[must_use]
    pub fn can_rename(&self, from: &str, to: &str) -> bool {
        !self.strict
            && from != to
            && !self.fixed.contains(from)
            && !self.fixed.contains(to)
            && self.flexible.admits(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strict_overrides_everything() {
        let policy = NamingPolicy {
            strict: true,
            ..NamingPolicy::flexible(["items"])
        };
        assert!(!policy.can_rename("items", "arr"));
        assert!(!policy.allows_renaming());
    }

    #[test]
    fn fixed_names_are_neither_source_nor_target() {
        let policy = NamingPolicy::permissive().with_fixed(["total"]);
        assert!(!policy.can_rename("total", "x"));
        assert!(!policy.can_rename("x", "total"));
        assert!(policy.can_rename("items", "arr"));
    }

    #[test]
    fn empty_flexible_list_admits_nothing() {
        let policy = NamingPolicy::flexible(Vec::<String>::new());
        assert!(!policy.can_rename("items", "arr"));
        assert!(!policy.allows_renaming());
        assert!(NamingPolicy::permissive().allows_renaming());
    }

    #[test]
    fn toml_distinguishes_missing_and_empty_flexible() {
        let missing: NamingPolicy = toml::from_str("fixed = [\"f\"]").unwrap();
        assert_eq!(missing.flexible, FlexibleNames::Any);
        let empty: NamingPolicy = toml::from_str("flexible = []").unwrap();
        assert_eq!(empty.flexible, FlexibleNames::Only(BTreeSet::new()));
    }

    #[test]
    fn json_round_trip() {
        let policy = NamingPolicy::flexible(["items"]).with_fixed(["f"]);
        let json = serde_json::to_string(&policy).unwrap();
        let back: NamingPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, policy);
    }
}
