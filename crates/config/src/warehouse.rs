//! Warehouse (ClickHouse) connection configuration
//!
//! The warehouse is the remote columnar store that streams are flushed to.
//! `url` plays the role of the project identifier and `database` the dataset.

use std::time::Duration;

use serde::Deserialize;

/// Default ClickHouse HTTP URL
pub const DEFAULT_URL: &str = "http://localhost:8123";

/// Default database
pub const DEFAULT_DATABASE: &str = "default";

/// Warehouse connection settings
///
/// # Example
///
/// ```toml
/// [warehouse]
/// url = "http://clickhouse:8123"
/// database = "domain_area_raw"
/// username = "writer"
/// password = "secret"
/// timeout = "30s"
/// retry_attempts = 3
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WarehouseConfig {
    /// ClickHouse HTTP endpoint
    /// Default: http://localhost:8123
    pub url: String,

    /// Database the stream tables live in
    /// Default: "default"
    pub database: String,

    /// Explicit username. When absent, credentials are read from the
    /// materialised credentials file (see `[sink] credentials_path`).
    pub username: Option<String>,

    /// Explicit password
    pub password: Option<String>,

    /// Per-request timeout
    /// Default: 30s
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Attempts per insert before the write fails
    /// Default: 3
    pub retry_attempts: u32,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.into(),
            database: DEFAULT_DATABASE.into(),
            username: None,
            password: None,
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
        }
    }
}

impl WarehouseConfig {
    /// Set the endpoint URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the database name
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set authentication credentials
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}
