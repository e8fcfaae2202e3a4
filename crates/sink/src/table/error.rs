//! Table operation errors

use crate::record::RecordError;

/// Error returned by a [`TableOperations`](super::TableOperations) call
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("table {table} already exists")]
    AlreadyExists { table: String },

    #[error("table {table} not found")]
    NotFound { table: String },

    /// Exception reported by the warehouse itself
    #[error("warehouse error (code {code}): {message}")]
    Remote { code: u32, message: String },

    /// Non-success HTTP status without a recognizable exception code
    #[error("http {status}: {message}")]
    Http { status: u16, message: String },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to serialize rows: {0}")]
    Serialization(String),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("invalid identifier '{0}'")]
    InvalidIdentifier(String),
}

impl TableError {
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization(message.into())
    }

    /// Whether the error means the table was already there
    ///
    /// A coded [`Remote`](Self::Remote) error never qualifies: the code
    /// was already checked when the error was classified. Only bare HTTP
    /// failures fall back to message inspection.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::AlreadyExists { .. } => true,
            Self::Http { message, .. } => is_already_exists_message(message),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Recognize an "already exists" failure from its text
pub fn is_already_exists_message(message: &str) -> bool {
    message.to_ascii_lowercase().contains("already exists")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_by_kind() {
        let err = TableError::AlreadyExists {
            table: "db.t".into(),
        };
        assert!(err.is_already_exists());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_already_exists_by_message() {
        let err = TableError::Http {
            status: 500,
            message: "Error 409: Already Exists: Table db.t".into(),
        };
        assert!(err.is_already_exists());

        let err = TableError::Remote {
            code: 241,
            message: "memory limit exceeded".into(),
        };
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_coded_error_ignores_message() {
        let err = TableError::Remote {
            code: 15,
            message: "Code: 15. DB::Exception: Column `id` already exists. (DUPLICATE_COLUMN)"
                .into(),
        };
        assert!(!err.is_already_exists());
    }

    #[test]
    fn test_display() {
        let err = TableError::NotFound {
            table: "db.t".into(),
        };
        assert_eq!(err.to_string(), "table db.t not found");
    }
}
