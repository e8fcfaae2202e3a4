//! Temporary table naming and identifier rules

use chrono::{DateTime, Utc};

use crate::schema::{Disposition, Schema};

/// Minute-resolution stamp appended to temporary table names
pub const TEMP_TABLE_TIME_FORMAT: &str = "%Y%m%d%H%M";

/// Name of the staging table for `base` created at `at`
///
/// `basetable` at 2021-10-30T09:16:01Z becomes `basetable_202110300916`.
pub fn temp_table_name(base: &str, at: DateTime<Utc>) -> String {
    format!("{base}_{}", at.format(TEMP_TABLE_TIME_FORMAT))
}

/// Schema of the staging table: same fields, renamed, starts empty
pub fn temp_table_schema(name: String, schema: &Schema) -> Schema {
    Schema {
        name,
        description: format!("staging table for {}", schema.name),
        fields: schema.fields.clone(),
        disposition: Disposition::Empty,
    }
}

/// Identifiers accepted for databases, tables, and columns
///
/// ASCII letters, digits, and underscores, not starting with a digit.
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "naming_test.rs"]
mod naming_test;
