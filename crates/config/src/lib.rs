//! Tablesink Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! A minimal config only needs the warehouse endpoint and database.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use tablesink_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[warehouse]\ndatabase = \"raw\"").unwrap();
//! assert_eq!(config.warehouse.database, "raw");
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//! format = "json"
//!
//! [warehouse]
//! url = "http://clickhouse:8123"
//! database = "domain_area_raw"
//!
//! [sink]
//! queue_capacity = 1
//! credentials_path = "/var/run/tablesink/credentials.json"
//!
//! [metrics]
//! interval = "60s"
//! ```

mod error;
mod logging;
mod metrics;
mod sink;
mod validation;
mod warehouse;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel, LogOutput};
pub use metrics::{MetricsConfig, MetricsFormat};
pub use sink::{DEFAULT_SECRET_KEY, SinkSettings, default_credentials_path};
pub use warehouse::{DEFAULT_DATABASE, DEFAULT_URL, WarehouseConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Metrics reporting configuration
    pub metrics: MetricsConfig,

    /// Remote analytical store (ClickHouse)
    pub warehouse: WarehouseConfig,

    /// Stream and credential settings
    pub sink: SinkSettings,
}

impl Config {
    /// Read, parse, and validate a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        contents.parse()
    }

    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
