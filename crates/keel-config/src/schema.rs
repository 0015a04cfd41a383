//! Configuration schema.
//!
//! Every section rejects unknown fields, so a typo in a configuration file
//! fails loudly instead of being ignored.

use std::collections::BTreeMap;

use keel_telemetry::{LogConfig, LogFormat};
use serde::{Deserialize, Serialize};

/// Dispatch kernel settings.
///
/// # Example
///
/// ```
/// use keel_config::KernelSettings;
///
/// let settings: KernelSettings = toml::from_str(r#"
///     debug = true
///     middleware = ["request_id"]
///
///     [middleware_groups]
///     web = ["session", "csrf"]
/// "#).unwrap();
///
/// assert!(settings.debug);
/// assert_eq!(settings.middleware_groups["web"], vec!["session", "csrf"]);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct KernelSettings {
    /// Include error details in rendered error responses.
    #[serde(default)]
    pub debug: bool,

    /// Names of middleware wrapped around every route, outermost first.
    #[serde(default = "default_middleware")]
    pub middleware: Vec<String>,

    /// Named middleware groups, expanded one level when referenced.
    #[serde(default)]
    pub middleware_groups: BTreeMap<String, Vec<String>>,

    /// Render every error as a JSON envelope, not only for API routes.
    #[serde(default)]
    pub json_errors: bool,

    /// Reuse a well-formed inbound `x-request-id` instead of generating one.
    #[serde(default)]
    pub trust_request_id: bool,
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self {
            debug: false,
            middleware: default_middleware(),
            middleware_groups: BTreeMap::new(),
            json_errors: false,
            trust_request_id: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    /// Whether to install a subscriber.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directives.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to log span open/close events.
    #[serde(default)]
    pub span_events: bool,

    /// Whether to colour human-oriented output.
    #[serde(default)]
    pub ansi: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            ansi: false,
        }
    }
}

impl LoggingSettings {
    /// Converts these settings into the subscriber configuration.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: self.format,
            span_events: self.span_events,
            ansi: self.ansi,
            ..LogConfig::default()
        }
    }
}

fn default_middleware() -> Vec<String> {
    vec!["request_id".to_string()]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
