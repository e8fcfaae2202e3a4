//! Stream and credential settings

use std::path::PathBuf;

use serde::Deserialize;

/// Secret fetched from the secrets manager at startup
pub const DEFAULT_SECRET_KEY: &str = "warehouse-credentials";

/// Well-known location the credentials secret is materialised at
pub fn default_credentials_path() -> PathBuf {
    std::env::temp_dir()
        .join("tablesink")
        .join("credentials.json")
}

/// Sink settings
///
/// # Example
///
/// ```toml
/// [sink]
/// queue_capacity = 1
/// credentials_path = "/var/run/tablesink/credentials.json"
/// secret_key = "warehouse-credentials"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkSettings {
    /// Messages a stream queue holds before `send` suspends the producer.
    /// 1 is the closest to a direct handoff.
    /// Default: 1
    pub queue_capacity: usize,

    /// Where the credentials secret is written before the client is built
    /// Default: `<tmp>/tablesink/credentials.json`
    pub credentials_path: PathBuf,

    /// Secret name requested from the secrets manager
    /// Default: "warehouse-credentials"
    pub secret_key: String,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            queue_capacity: 1,
            credentials_path: default_credentials_path(),
            secret_key: DEFAULT_SECRET_KEY.into(),
        }
    }
}
