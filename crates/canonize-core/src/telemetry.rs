//! Log subscriber installation
//!
//! Libraries in the workspace only emit `tracing` events. Binaries and test
//! harnesses call [`init_tracing`] once to route them somewhere.

use tracing_subscriber::EnvFilter;

use crate::config::{EngineConfig, LogFormat};
use crate::error::ConfigError;

/// Install a global `fmt` subscriber filtered by `filter`
///
/// `RUST_LOG` is not consulted; pass `std::env::var("RUST_LOG")` explicitly
/// to honour it.
///
/// # Errors
/// Returns [`ConfigError::Logging`] when the filter does not parse or a
/// global subscriber is already installed
pub fn init_tracing(filter: &str, format: LogFormat) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_new(filter).map_err(|e| ConfigError::Logging(e.to_string()))?;
    let installed = match format {
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init(),
    };
    installed.map_err(|e| ConfigError::Logging(e.to_string()))
}

/// [`init_tracing`] with the filter and format of `config`
///
/// # Errors
/// As [`init_tracing`]
pub fn init_from_config(config: &EngineConfig) -> Result<(), ConfigError> {
    init_tracing(&config.log_filter, config.log_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_filter_is_reported() {
        assert!(matches!(
            init_tracing("canonize=loudest", LogFormat::Text),
            Err(ConfigError::Logging(_))
        ));
    }
}
