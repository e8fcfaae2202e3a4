//! Errors raised while loading `tablesink.toml`

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Syntax(#[from] toml::de::Error),

    /// A setting that has no usable default was left empty
    #[error("[{section}] {field} must be set")]
    Missing {
        section: &'static str,
        field: &'static str,
    },

    #[error("[{section}] {field}: {reason}")]
    Invalid {
        section: &'static str,
        field: &'static str,
        reason: String,
    },
}

impl ConfigError {
    pub fn missing(section: &'static str, field: &'static str) -> Self {
        Self::Missing { section, field }
    }

    pub fn invalid(section: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            section,
            field,
            reason: reason.into(),
        }
    }
}
