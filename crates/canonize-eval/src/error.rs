//! Interpreter errors and Python-level exceptions

use std::fmt;

use canonize_syntax::ParseError;
use serde::{Deserialize, Serialize};

/// Reasons the interpreter stops without a Python-level outcome
///
/// None of these says anything about the program's behavior; a probe that
/// hits one is inconclusive for that input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvalError {
    /// Source handed to the interpreter does not parse
    #[error("source does not parse: {0}")]
    Parse(#[from] ParseError),

    /// Step budget spent
    #[error("fuel exhausted")]
    FuelExhausted,

    /// Call depth above the configured bound
    #[error("call depth exceeded {0}")]
    DepthExceeded(usize),

    /// Construct outside the modelled subset
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// Entry point not defined by the module
    #[error("no function named '{0}'")]
    MissingFunction(String),
}

impl EvalError {
    /// Create an unsupported construct error
    #[must_use]
    pub fn unsupported(what: impl Into<String>) -> Self {
        Self::Unsupported(what.into())
    }
}

/// Python exception raised by the program under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exception {
    /// Exception class name, e.g. `ZeroDivisionError`
    pub class: String,
    /// First constructor argument rendered with `str`
    pub message: String,
}

impl Exception {
    /// Create an exception
    #[must_use]
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }

    pub(crate) fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    pub(crate) fn value_error(message: impl Into<String>) -> Self {
        Self::new("ValueError", message)
    }

    pub(crate) fn index_error(message: impl Into<String>) -> Self {
        Self::new("IndexError", message)
    }

    pub(crate) fn key_error(message: impl Into<String>) -> Self {
        Self::new("KeyError", message)
    }

    pub(crate) fn zero_division() -> Self {
        Self::new("ZeroDivisionError", "division by zero")
    }

    pub(crate) fn name_error(name: &str) -> Self {
        Self::new("NameError", format!("name '{name}' is not defined"))
    }

    pub(crate) fn attribute_error(type_name: &str, attr: &str) -> Self {
        Self::new(
            "AttributeError",
            format!("'{type_name}' object has no attribute '{attr}'"),
        )
    }

    /// Whether an `except <handler>` clause catches this exception
    #[must_use]
    pub fn is_caught_by(&self, handler: &str) -> bool {
        handler == self.class
            || matches!(handler, "Exception" | "BaseException")
            || (handler == "ArithmeticError"
                && matches!(self.class.as_str(), "ZeroDivisionError" | "OverflowError"))
            || (handler == "LookupError"
                && matches!(self.class.as_str(), "IndexError" | "KeyError"))
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.class)
        } else {
            write!(f, "{}: {}", self.class, self.message)
        }
    }
}

/// Exception classes the interpreter can construct and catch
pub(crate) const EXCEPTION_CLASSES: &[&str] = &[
    "ArithmeticError",
    "AssertionError",
    "AttributeError",
    "BaseException",
    "Exception",
    "IndexError",
    "KeyError",
    "LookupError",
    "NameError",
    "NotImplementedError",
    "OverflowError",
    "RecursionError",
    "RuntimeError",
    "StopIteration",
    "TypeError",
    "ValueError",
    "ZeroDivisionError",
];
