//! Explanation errors

use canonize_props::PropertyKind;

/// Errors raised while explaining a difference
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExplainError {
    /// Value handed to an explainer of another kind
    #[error("explainer for {expected} received a {actual} value")]
    KindMismatch {
        /// Kind the explainer serves
        expected: PropertyKind,
        /// Kind of the value received
        actual: PropertyKind,
    },

    /// No explainer registered for a kind
    #[error("no explainer registered for {0}")]
    NoExplainer(PropertyKind),
}

impl ExplainError {
    /// Create a kind mismatch error
    #[must_use]
    pub fn kind_mismatch(expected: PropertyKind, actual: PropertyKind) -> Self {
        Self::KindMismatch { expected, actual }
    }
}
