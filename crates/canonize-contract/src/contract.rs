//! Function contract handed to the oracle and compliance checker

use serde::{Deserialize, Serialize};

use crate::naming::NamingPolicy;

/// What a candidate implementation must satisfy
///
/// The engine never interprets the contract beyond its entry point and
/// naming policy; behavioral and non-functional judgement belongs to the
/// [`crate::Oracle`] and [`crate::ComplianceChecker`] collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Contract {
    /// Contract identifier, usually the task id
    pub id: String,
    /// Name of the function under contract
    #[serde(default)]
    pub entry_point: Option<String>,
    /// Human-readable statement of the required behavior
    #[serde(default)]
    pub description: String,
    /// Naming policy; overrides the pipeline's when present
    #[serde(default)]
    pub naming: Option<NamingPolicy>,
    /// Non-functional constraints judged by the compliance checker
    #[serde(default)]
    pub constraints: Vec<String>,
}

impl Contract {
    /// Create a contract with the given id
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Builder: set the entry-point function name
    #[must_use]
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    /// Builder: set the description
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Builder: set the naming policy
    #[must_use]
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Builder: add a non-functional constraint
    #[must_use]
    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraints.push(constraint.into());
        self
    }
}
