//! Canonize Contract
//!
//! Contract description and the interfaces of the two external judges the
//! engine consumes.
//!
//! # Core Concepts
//!
//! - [`Contract`]: Entry point, description, constraints and naming policy of a task
//! - [`NamingPolicy`]: Fixed / flexible / strict renaming tiers
//! - [`Oracle`]: Behavioral equivalence judge returning an [`OracleResult`]
//! - [`ComplianceChecker`]: Non-functional judge returning a [`ComplianceReport`]

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod contract;
mod naming;
mod oracle;

pub use contract::Contract;
pub use naming::{FlexibleNames, NamingPolicy};
pub use oracle::{ComplianceChecker, ComplianceReport, Oracle, OracleResult};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
