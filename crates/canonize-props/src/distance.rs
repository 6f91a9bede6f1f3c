//! Distance between property sets
//!
//! Each kind is compared by the rule of its [`ValueShape`]; the aggregate
//! is the mean over all kinds, a slot null on either side counting as the
//! maximum distance.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::kind::{PropertyKind, ValueShape};
use crate::value::{PropertySet, PropertyValue, RecursionSchema};

/// Which member of the structure-hash pair is compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashSelection {
    /// Literal tree; local names count
    Literal,
    /// Alpha-normalized tree; local names do not count
    #[default]
    NameInvariant,
}

impl HashSelection {
    /// Literal comparison when a naming policy is in force
    #[inline]
    #[must_use]
    pub const fn for_policy(has_policy: bool) -> Self {
        if has_policy {
            Self::Literal
        } else {
            Self::NameInvariant
        }
    }
}

/// Severity class of a per-kind distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityBand {
    /// Identical
    None,
    /// Below 0.3
    Minor,
    /// Below 0.7
    Moderate,
    /// 0.7 and above
    Major,
}

impl SeverityBand {
    /// Band a distance in `[0, 1]`
    #[must_use]
    pub fn from_distance(distance: f64) -> Self {
        if distance <= 0.0 {
            Self::None
        } else if distance < 0.3 {
            Self::Minor
        } else if distance < 0.7 {
            Self::Moderate
        } else {
            Self::Major
        }
    }
}

/// Distance of one kind, banded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindDistance {
    /// Property kind
    pub kind: PropertyKind,
    /// Distance in `[0, 1]`
    pub distance: f64,
    /// Severity class
    pub band: SeverityBand,
}

/// Pure comparison of property sets
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceCalculator {
    selection: HashSelection,
}

impl DistanceCalculator {
    /// Create a calculator comparing the given structure hash
    #[inline]
    #[must_use]
    pub const fn new(selection: HashSelection) -> Self {
        Self { selection }
    }

    /// Structure hash this calculator compares
    #[inline]
    #[must_use]
    pub const fn selection(&self) -> HashSelection {
        self.selection
    }

    /// Scalar distance in `[0, 1]`
    #[must_use]
    pub fn distance(&self, a: &PropertySet, b: &PropertySet) -> f64 {
        let total: f64 = PropertyKind::ALL
            .into_iter()
            .map(|kind| self.kind_distance(kind, a.get(kind), b.get(kind)))
            .sum();
        total / PropertyKind::COUNT as f64
    }

    /// Per-kind distances in kind order
    #[must_use]
    pub fn per_kind(&self, a: &PropertySet, b: &PropertySet) -> Vec<KindDistance> {
        PropertyKind::ALL
            .into_iter()
            .map(|kind| {
                let distance = self.kind_distance(kind, a.get(kind), b.get(kind));
                KindDistance {
                    kind,
                    distance,
                    band: SeverityBand::from_distance(distance),
                }
            })
            .collect()
    }

    /// Distance of one slot; null on either side is the maximum
    #[must_use]
    pub fn kind_distance(
        &self,
        kind: PropertyKind,
        a: Option<&PropertyValue>,
        b: Option<&PropertyValue>,
    ) -> f64 {
        match (a, b) {
            (Some(a), Some(b)) if a.kind() == kind && b.kind() == kind => self.value_distance(a, b),
            _ => 1.0,
        }
    }

    /// Distance between two values of the same kind
    #[must_use]
    pub fn value_distance(&self, a: &PropertyValue, b: &PropertyValue) -> f64 {
        if a.kind() != b.kind() {
            return 1.0;
        }
        match a.kind().shape() {
            ValueShape::Record => record_distance(&a.to_json(), &b.to_json()),
            ValueShape::Sequence => match (a.as_sequence(), b.as_sequence()) {
                (Some(a), Some(b)) => sequence_distance(a, b),
                _ => 1.0,
            },
            ValueShape::HashPair => match (a, b) {
                (PropertyValue::NormalizedStructure(a), PropertyValue::NormalizedStructure(b)) => {
                    let literal = self.selection == HashSelection::Literal;
                    if a.select(literal) == b.select(literal) {
                        0.0
                    } else {
                        1.0
                    }
                }
                _ => 1.0,
            },
            ValueShape::Recursion => match (a, b) {
                (PropertyValue::RecursionSchema(a), PropertyValue::RecursionSchema(b)) => {
                    recursion_distance(a, b)
                }
                _ => 1.0,
            },
        }
    }
}

fn flatten(prefix: &str, value: &Value, out: &mut BTreeMap<String, Value>) {
    match value {
        Value::Object(fields) => {
            for (key, inner) in fields {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten(&path, inner, out);
            }
        }
        other => {
            out.insert(prefix.to_string(), other.clone());
        }
    }
}

/// Fraction of mismatched dotted keys over their union
fn record_distance(a: &Value, b: &Value) -> f64 {
    let mut left = BTreeMap::new();
    let mut right = BTreeMap::new();
    flatten("", a, &mut left);
    flatten("", b, &mut right);
    let keys: BTreeSet<&String> = left.keys().chain(right.keys()).collect();
    if keys.is_empty() {
        return 0.0;
    }
    let mismatched = keys
        .iter()
        .filter(|key| left.get(**key) != right.get(**key))
        .count();
    mismatched as f64 / keys.len() as f64
}

fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut row = vec![0usize; b.len() + 1];
    for x in a {
        let mut diagonal = 0;
        for (j, y) in b.iter().enumerate() {
            let above = row[j + 1];
            row[j + 1] = if x == y {
                diagonal + 1
            } else {
                above.max(row[j])
            };
            diagonal = above;
        }
    }
    row[b.len()]
}

/// One minus longest-common-subsequence overlap over the longer length
fn sequence_distance(a: &[String], b: &[String]) -> f64 {
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    1.0 - lcs_len(a, b) as f64 / longest as f64
}

fn normalized_gap(a: usize, b: usize) -> f64 {
    a.abs_diff(b) as f64 / a.max(b).max(1) as f64
}

fn recursion_distance(a: &RecursionSchema, b: &RecursionSchema) -> f64 {
    if a.is_recursive != b.is_recursive {
        return 1.0;
    }
    let branching = if a.branching == b.branching { 0.0 } else { 1.0 };
    (branching
        + normalized_gap(a.base_cases, b.base_cases)
        + normalized_gap(a.recursive_calls, b.recursive_calls))
        / 3.0
}
