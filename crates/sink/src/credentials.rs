//! Secrets and warehouse credentials
//!
//! At startup the sink can fetch the warehouse credentials from a
//! [`SecretsManager`] and write them to a local file, the way a service
//! account key is materialised for client libraries. The ClickHouse
//! backend then reads that file when no explicit username is configured.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Errors from secret retrieval and credentials files
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret '{key}' not found")]
    NotFound { key: String },

    #[error("secret backend error: {0}")]
    Backend(String),

    #[error("secret '{key}' is not a valid credentials document: {message}")]
    Malformed { key: String, message: String },

    #[error("credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SecretError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Source of named secrets
#[async_trait]
pub trait SecretsManager: Send + Sync {
    async fn secret(&self, key: &str) -> Result<String, SecretError>;
}

/// Secrets read from environment variables
///
/// `warehouse-credentials` is looked up as
/// `TABLESINK_SECRET_WAREHOUSE_CREDENTIALS`.
#[derive(Debug, Clone)]
pub struct EnvSecretsManager {
    prefix: String,
}

impl EnvSecretsManager {
    pub const DEFAULT_PREFIX: &'static str = "TABLESINK_SECRET_";

    pub fn new() -> Self {
        Self::with_prefix(Self::DEFAULT_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Environment variable consulted for `key`
    pub fn variable(&self, key: &str) -> String {
        let suffix: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() {
                    c.to_ascii_uppercase()
                } else {
                    '_'
                }
            })
            .collect();
        format!("{}{suffix}", self.prefix)
    }
}

impl Default for EnvSecretsManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretsManager for EnvSecretsManager {
    async fn secret(&self, key: &str) -> Result<String, SecretError> {
        std::env::var(self.variable(key)).map_err(|_| SecretError::NotFound {
            key: key.to_string(),
        })
    }
}

/// Fixed in-memory secrets
#[derive(Debug, Clone, Default)]
pub struct StaticSecretsManager {
    secrets: HashMap<String, String>,
}

impl StaticSecretsManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secret(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(key.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretsManager for StaticSecretsManager {
    async fn secret(&self, key: &str) -> Result<String, SecretError> {
        self.secrets
            .get(key)
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                key: key.to_string(),
            })
    }
}

/// Username and password for the warehouse
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseCredentials {
    pub username: String,
    #[serde(default)]
    pub password: Option<String>,
}

impl WarehouseCredentials {
    pub fn new(username: impl Into<String>, password: Option<String>) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }
}

impl std::fmt::Debug for WarehouseCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarehouseCredentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Fetch secret `key` and write it to `path`
///
/// The secret must be a JSON credentials document. The file is readable
/// by the owner only.
pub async fn materialize_credentials(
    secrets: &dyn SecretsManager,
    key: &str,
    path: &Path,
) -> Result<(), SecretError> {
    let document = secrets.secret(key).await?;
    serde_json::from_str::<WarehouseCredentials>(&document).map_err(|e| {
        SecretError::Malformed {
            key: key.to_string(),
            message: e.to_string(),
        }
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SecretError::io(parent, e))?;
    }
    tokio::fs::write(path, document.as_bytes())
        .await
        .map_err(|e| SecretError::io(path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| SecretError::io(path, e))?;
    }

    debug!(key = %key, path = %path.display(), "materialised credentials");
    Ok(())
}

/// Read a credentials file; `None` when it does not exist
pub async fn load_credentials(path: &Path) -> Result<Option<WarehouseCredentials>, SecretError> {
    let document = match tokio::fs::read_to_string(path).await {
        Ok(document) => document,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SecretError::io(path, e)),
    };
    serde_json::from_str(&document)
        .map(Some)
        .map_err(|e| SecretError::Malformed {
            key: path.display().to_string(),
            message: e.to_string(),
        })
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod credentials_test;
