//! ClickHouse exception classification

use crate::table::{TableError, TableRef};

/// Response header carrying the exception code
pub(crate) const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";

pub(crate) const TABLE_ALREADY_EXISTS: u32 = 57;
pub(crate) const UNKNOWN_TABLE: u32 = 60;
pub(crate) const UNKNOWN_DATABASE: u32 = 81;

/// Map a failed response to a [`TableError`]
///
/// The header code wins; otherwise the code is read from the
/// `Code: N. DB::Exception: ...` body prefix.
pub(crate) fn classify(
    status: u16,
    header_code: Option<u32>,
    message: &str,
    table: &TableRef,
) -> TableError {
    match header_code.or_else(|| parse_exception_code(message)) {
        Some(TABLE_ALREADY_EXISTS) => TableError::AlreadyExists {
            table: table.to_string(),
        },
        Some(UNKNOWN_TABLE | UNKNOWN_DATABASE) => TableError::NotFound {
            table: table.to_string(),
        },
        Some(code) => TableError::Remote {
            code,
            message: message.to_string(),
        },
        None => TableError::Http {
            status,
            message: message.to_string(),
        },
    }
}

pub(crate) fn parse_exception_code(message: &str) -> Option<u32> {
    let rest = message.trim_start().strip_prefix("Code:")?.trim_start();
    let end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    rest[..end].parse().ok()
}

/// Failures worth another insert attempt
///
/// Only transport errors raised while connecting qualify: once the body
/// has been sent the server may have committed it, and plain MergeTree
/// tables do not deduplicate a resent insert.
pub(crate) fn is_retryable(err: &TableError) -> bool {
    match err {
        TableError::Transport(e) => e.is_connect(),
        TableError::Http { status, .. } => *status >= 500,
        _ => false,
    }
}
