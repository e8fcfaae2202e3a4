//! Metrics reporting configuration
//!
//! Counters are always collected; this section only controls the periodic
//! reporter that logs a snapshot of them.

use serde::Deserialize;
use std::time::Duration;

/// Metrics output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MetricsFormat {
    /// `name{day=..} = value` lines (default)
    #[default]
    Human,
    /// One JSON document per report
    Json,
}

/// Metrics configuration
///
/// # Example
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// format = "human"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Enable periodic reporting
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,

    /// Output format (human, json)
    /// Default: human
    pub format: MetricsFormat,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
            format: MetricsFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
        assert_eq!(config.format, MetricsFormat::Human);
    }

    #[test]
    fn test_deserialize_humantime_interval() {
        let config: MetricsConfig = toml::from_str("interval = \"2m\"").unwrap();
        assert_eq!(config.interval, Duration::from_secs(120));
    }

    #[test]
    fn test_deserialize_disabled_json() {
        let toml = r#"
enabled = false
format = "json"
"#;
        let config: MetricsConfig = toml::from_str(toml).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.format, MetricsFormat::Json);
    }
}
