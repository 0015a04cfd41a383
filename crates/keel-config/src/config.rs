//! Main configuration types.
//!
//! This module provides the top-level [`KeelConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, KernelSettings, LoggingSettings};

/// Complete Keel configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use keel_config::KeelConfig;
///
/// let config = KeelConfig::default();
/// assert!(!config.kernel.debug);
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KeelConfig {
    /// Dispatch kernel settings.
    #[serde(default)]
    pub kernel: KernelSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl KeelConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> KeelConfigBuilder {
        KeelConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - A global middleware name is empty
    /// - A middleware group has an empty name or no members
    /// - A group member is an empty name
    /// - The log level is not a valid filter directive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kernel.middleware.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                "kernel.middleware",
                "middleware names must not be empty",
            ));
        }

        for (group, members) in &self.kernel.middleware_groups {
            if group.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "kernel.middleware_groups",
                    "group names must not be empty",
                ));
            }
            if members.is_empty() {
                return Err(ConfigError::validation_error(format!(
                    "middleware group '{group}' has no members"
                )));
            }
            if members.iter().any(|name| name.trim().is_empty()) {
                return Err(ConfigError::invalid_value(
                    format!("kernel.middleware_groups.{group}"),
                    "middleware names must not be empty",
                ));
            }
        }

        if self.logging.enabled {
            keel_telemetry::create_env_filter(&self.logging.level)
                .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        }

        Ok(())
    }

    /// Create a development configuration preset.
    ///
    /// Verbose error bodies, debug logging in the pretty format.
    ///
    /// # Example
    ///
    /// ```
    /// use keel_config::KeelConfig;
    ///
    /// let config = KeelConfig::development();
    /// assert!(config.kernel.debug);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        Self {
            kernel: KernelSettings {
                debug: true,
                ..KernelSettings::default()
            },
            logging: LoggingSettings {
                level: "debug".to_string(),
                format: keel_telemetry::LogFormat::Pretty,
                span_events: true,
                ansi: true,
                ..LoggingSettings::default()
            },
        }
    }
}

/// Builder for [`KeelConfig`].
#[derive(Debug, Default)]
pub struct KeelConfigBuilder {
    kernel: Option<KernelSettings>,
    logging: Option<LoggingSettings>,
}

impl KeelConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the kernel settings.
    #[must_use]
    pub fn kernel(mut self, kernel: KernelSettings) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Set the logging settings.
    #[must_use]
    pub fn logging(mut self, logging: LoggingSettings) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration without validation.
    #[must_use]
    pub fn build(self) -> KeelConfig {
        KeelConfig {
            kernel: self.kernel.unwrap_or_default(),
            logging: self.logging.unwrap_or_default(),
        }
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn build_validated(self) -> Result<KeelConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_config_is_valid() {
        assert!(KeelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = KeelConfig::builder()
            .kernel(KernelSettings {
                json_errors: true,
                ..KernelSettings::default()
            })
            .build();
        assert!(config.kernel.json_errors);
        assert_eq!(config.logging, LoggingSettings::default());
    }

    #[test]
    fn test_empty_group_rejected() {
        let mut groups = BTreeMap::new();
        groups.insert("web".to_string(), Vec::new());
        let result = KeelConfig::builder()
            .kernel(KernelSettings {
                middleware_groups: groups,
                ..KernelSettings::default()
            })
            .build_validated();

        let err = result.unwrap_err();
        assert!(err.to_string().contains("'web' has no members"));
    }

    #[test]
    fn test_blank_member_rejected() {
        let mut groups = BTreeMap::new();
        groups.insert("api".to_string(), vec!["throttle".to_string(), " ".to_string()]);
        let config = KeelConfig::builder()
            .kernel(KernelSettings {
                middleware_groups: groups,
                ..KernelSettings::default()
            })
            .build();

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "kernel.middleware_groups.api"
        ));
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let config = KeelConfig::builder()
            .logging(LoggingSettings {
                level: "keel=[[".to_string(),
                ..LoggingSettings::default()
            })
            .build();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "logging.level"
        ));
    }

    #[test]
    fn test_disabled_logging_skips_level_check() {
        let config = KeelConfig::builder()
            .logging(LoggingSettings {
                enabled: false,
                level: "keel=[[".to_string(),
                ..LoggingSettings::default()
            })
            .build();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = KeelConfig::development();
        let toml = toml::to_string(&config).unwrap();
        let parsed: KeelConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<KeelConfig, _> = toml::from_str("[server]\nport = 80");
        assert!(result.is_err());
    }
}
