//! Configuration validation
//!
//! Checks that:
//! - the warehouse URL is http(s)
//! - the database is a usable identifier
//! - queue capacity and reporter interval are non-zero

use std::time::Duration;

use crate::Config;
use crate::error::{ConfigError, Result};

/// Shortest reporting interval accepted
const MIN_METRICS_INTERVAL: Duration = Duration::from_secs(1);

/// Validate the entire configuration
pub fn validate_config(config: &Config) -> Result<()> {
    validate_warehouse(config)?;
    validate_sink(config)?;
    validate_metrics(config)?;
    Ok(())
}

fn validate_warehouse(config: &Config) -> Result<()> {
    let warehouse = &config.warehouse;

    if warehouse.url.is_empty() {
        return Err(ConfigError::missing("warehouse", "url"));
    }
    if !(warehouse.url.starts_with("http://") || warehouse.url.starts_with("https://")) {
        return Err(ConfigError::invalid(
            "warehouse",
            "url",
            format!("'{}' must start with http:// or https://", warehouse.url),
        ));
    }

    if warehouse.database.is_empty() {
        return Err(ConfigError::missing("warehouse", "database"));
    }
    if !is_identifier(&warehouse.database) {
        return Err(ConfigError::invalid(
            "warehouse",
            "database",
            format!(
                "'{}' may only contain ASCII letters, digits and '_' and must not start with a digit",
                warehouse.database
            ),
        ));
    }

    if warehouse.retry_attempts == 0 {
        return Err(ConfigError::invalid(
            "warehouse",
            "retry_attempts",
            "must be at least 1",
        ));
    }

    if warehouse.password.is_some() && warehouse.username.is_none() {
        return Err(ConfigError::missing("warehouse", "username"));
    }

    Ok(())
}

fn validate_sink(config: &Config) -> Result<()> {
    if config.sink.queue_capacity == 0 {
        return Err(ConfigError::invalid(
            "sink",
            "queue_capacity",
            "must be at least 1",
        ));
    }
    if config.sink.secret_key.is_empty() {
        return Err(ConfigError::missing("sink", "secret_key"));
    }
    Ok(())
}

fn validate_metrics(config: &Config) -> Result<()> {
    if config.metrics.enabled && config.metrics.interval < MIN_METRICS_INTERVAL {
        return Err(ConfigError::invalid(
            "metrics",
            "interval",
            "must be at least 1s",
        ));
    }
    Ok(())
}

/// Same rule the sink applies to table names
fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn parse(toml: &str) -> Result<Config> {
        Config::from_str(toml)
    }

    #[test]
    fn test_default_is_valid() {
        assert!(validate_config(&Config::default()).is_ok());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = parse("[warehouse]\nurl = \"tcp://clickhouse:9000\"").unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_rejects_empty_database() {
        let err = parse("[warehouse]\ndatabase = \"\"").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "database", .. }));
    }

    #[test]
    fn test_rejects_bad_database_identifier() {
        assert!(parse("[warehouse]\ndatabase = \"raw-data\"").is_err());
        assert!(parse("[warehouse]\ndatabase = \"1raw\"").is_err());
        assert!(parse("[warehouse]\ndatabase = \"raw_2021\"").is_ok());
    }

    #[test]
    fn test_rejects_zero_retry_attempts() {
        let err = parse("[warehouse]\nretry_attempts = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "retry_attempts", .. }));
    }

    #[test]
    fn test_password_requires_username() {
        let err = parse("[warehouse]\npassword = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Missing { field: "username", .. }));
    }

    #[test]
    fn test_rejects_zero_queue_capacity() {
        let err = parse("[sink]\nqueue_capacity = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "queue_capacity", .. }));
    }

    #[test]
    fn test_rejects_tiny_metrics_interval() {
        assert!(parse("[metrics]\ninterval = \"100ms\"").is_err());
        assert!(parse("[metrics]\nenabled = false\ninterval = \"100ms\"").is_ok());
    }
}
