//! Engine configuration
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! max_iterations = 8
//! extraction_mode = "baseline"
//!
//! [naming]
//! fixed = ["solve"]
//! flexible = ["items", "arr"]
//!
//! [template]
//! enabled = true
//! min_distance = 0.4
//!
//! [probe]
//! fuel = 50000
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use canonize_contract::NamingPolicy;
use canonize_eval::Budget;
use canonize_props::ExtractionMode;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Iteration budget when none is configured
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Settings of the oracle-guided template tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Whether the tier may fire at all
    pub enabled: bool,
    /// Smallest remaining distance at which it fires
    pub min_distance: f64,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_distance: 0.3,
        }
    }
}

impl TemplateConfig {
    /// Enabled with the default threshold
    #[must_use]
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event
    Json,
}

/// Configuration of a [`crate::TransformationPipeline`] and its telemetry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Iterations per `transform` call unless the request says otherwise
    pub max_iterations: usize,
    /// Property extraction mode
    pub extraction_mode: ExtractionMode,
    /// Naming policy used when the contract carries none
    pub naming: Option<NamingPolicy>,
    /// Oracle-guided template tier
    pub template: TemplateConfig,
    /// Limits of the black-box equivalence probe
    pub probe: Budget,
    /// Timeout handed to the oracle, in milliseconds
    pub oracle_timeout_ms: u64,
    /// Reject rewrites that return to an earlier candidate
    pub visited_guard: bool,
    /// `tracing` filter directive
    pub log_filter: String,
    /// Log output format
    pub log_format: LogFormat,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            extraction_mode: ExtractionMode::default(),
            naming: None,
            template: TemplateConfig::default(),
            probe: Budget::default(),
            oracle_timeout_ms: 10_000,
            visited_guard: true,
            log_filter: "info".to_string(),
            log_format: LogFormat::default(),
        }
    }
}

impl EngineConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a TOML document
    ///
    /// # Errors
    /// Returns [`ConfigError::Parse`] for malformed TOML or unknown values,
    /// [`ConfigError::Invalid`] for out-of-range settings
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    ///
    /// # Errors
    /// Returns [`ConfigError::Io`] when the file cannot be read, otherwise as
    /// [`EngineConfig::from_toml_str`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check value ranges
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] naming the first bad field
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::invalid("max_iterations", "must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.template.min_distance) {
            return Err(ConfigError::invalid(
                "template.min_distance",
                format!("{} is outside [0, 1]", self.template.min_distance),
            ));
        }
        if self.probe.fuel == 0 {
            return Err(ConfigError::invalid("probe.fuel", "must be positive"));
        }
        if self.probe.max_depth == 0 {
            return Err(ConfigError::invalid("probe.max_depth", "must be positive"));
        }
        Ok(())
    }

    /// Oracle timeout as a [`Duration`]
    #[must_use]
    pub const fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    /// With iteration budget
    #[inline]
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// With extraction mode
    #[inline]
    #[must_use]
    pub fn with_extraction_mode(mut self, mode: ExtractionMode) -> Self {
        self.extraction_mode = mode;
        self
    }

    /// With fallback naming policy
    #[inline]
    #[must_use]
    pub fn with_naming(mut self, naming: NamingPolicy) -> Self {
        self.naming = Some(naming);
        self
    }

    /// With template tier settings
    #[inline]
    #[must_use]
    pub fn with_template(mut self, template: TemplateConfig) -> Self {
        self.template = template;
        self
    }

    /// With probe limits
    #[inline]
    #[must_use]
    pub fn with_probe(mut self, probe: Budget) -> Self {
        self.probe = probe;
        self
    }

    /// With oracle timeout
    #[inline]
    #[must_use]
    pub fn with_oracle_timeout(mut self, timeout: Duration) -> Self {
        self.oracle_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// With or without the revisit guard
    #[inline]
    #[must_use]
    pub fn with_visited_guard(mut self, enabled: bool) -> Self {
        self.visited_guard = enabled;
        self
    }

    /// With log filter
    #[inline]
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canonize_contract::FlexibleNames;

    #[test]
    fn empty_document_is_default() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
    }

    #[test]
    fn nested_tables_override_defaults() {
        let config = EngineConfig::from_toml_str(
            r#"
            max_iterations = 8
            extraction_mode = "baseline"
            log_format = "json"

            [template]
            enabled = true

            [probe]
            fuel = 500
            "#,
        )
        .unwrap();
        assert_eq!(config.max_iterations, 8);
        assert_eq!(config.extraction_mode, ExtractionMode::Baseline);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.template.enabled);
        assert!((config.template.min_distance - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.probe.fuel, 500);
        assert_eq!(config.probe.max_depth, Budget::default().max_depth);
    }

    #[test]
    fn naming_policy_round_trips_through_toml() {
        let config = EngineConfig::new().with_naming(NamingPolicy::flexible(["items", "arr"]));
        let text = toml::to_string(&config).unwrap();
        let back = EngineConfig::from_toml_str(&text).unwrap();
        assert_eq!(back, config);
        assert!(matches!(
            back.naming.as_ref().map(|n| &n.flexible),
            Some(FlexibleNames::Only(_))
        ));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        for (text, field) in [
            ("max_iterations = 0", "max_iterations"),
            ("[template]\nmin_distance = 1.5", "template.min_distance"),
            ("[probe]\nfuel = 0", "probe.fuel"),
        ] {
            match EngineConfig::from_toml_str(text) {
                Err(ConfigError::Invalid { field: got, .. }) => assert_eq!(got, field),
                other => panic!("{text}: {other:?}"),
            }
        }
    }

    #[test]
    fn unknown_extraction_mode_is_a_parse_error() {
        assert!(matches!(
            EngineConfig::from_toml_str("extraction_mode = \"turbo\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canonize.toml");
        fs::write(&path, "max_iterations = 3\nvisited_guard = false\n").unwrap();
        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.max_iterations, 3);
        assert!(!config.visited_guard);

        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}
