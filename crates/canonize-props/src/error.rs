//! Property set errors

use crate::kind::PropertyKind;

/// Errors building or decoding a property set
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// Name outside the fixed vocabulary
    #[error("unknown property kind: '{0}'")]
    UnknownKind(String),

    /// Value stored under the wrong kind
    #[error("property value of kind {actual} stored under {expected}")]
    KindMismatch {
        /// Slot the value was stored under
        expected: PropertyKind,
        /// Kind the value actually carries
        actual: PropertyKind,
    },
}
