//! Strategy errors

use canonize_syntax::ParseError;

/// Internal strategy failures
///
/// These never abort a run: the pipeline logs them and moves on to the next
/// strategy or difference.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// Source handed to a strategy does not parse
    #[error("source does not parse: {0}")]
    Parse(#[from] ParseError),

    /// Difference carries a hint the strategy cannot act on
    #[error("strategy '{strategy}' cannot act on a '{hint}' hint")]
    UnexpectedHint {
        /// Strategy name
        strategy: &'static str,
        /// Hint tag received
        hint: &'static str,
    },

    /// Hint names a function the source does not define
    #[error("no top-level function '{0}' in source")]
    MissingFunction(String),
}

impl StrategyError {
    /// Create an unexpected hint error
    #[must_use]
    pub const fn unexpected_hint(strategy: &'static str, hint: &'static str) -> Self {
        Self::UnexpectedHint { strategy, hint }
    }

    /// Create a missing function error
    #[must_use]
    pub fn missing_function(name: impl Into<String>) -> Self {
        Self::MissingFunction(name.into())
    }
}
