//! SQL rendering for the ClickHouse HTTP interface
//!
//! Every identifier is validated and backtick-quoted before it reaches a
//! statement; values never do, rows travel as JSONEachRow bodies.

use crate::schema::{FieldSchema, FieldType, Schema};
use crate::table::{TableError, TableRef, is_valid_identifier};

/// Table engine for stream tables
const ENGINE: &str = "MergeTree ORDER BY tuple()";

pub(crate) fn quote(name: &str) -> Result<String, TableError> {
    if !is_valid_identifier(name) {
        return Err(TableError::InvalidIdentifier(name.to_string()));
    }
    Ok(format!("`{name}`"))
}

pub(crate) fn qualified(table: &TableRef) -> Result<String, TableError> {
    Ok(format!("{}.{}", quote(&table.dataset)?, quote(&table.table)?))
}

/// Single-quoted string literal
fn literal(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{escaped}'")
}

/// ClickHouse column type for a field
pub(crate) fn column_type(field: &FieldSchema) -> String {
    let base = match field.field_type {
        FieldType::String | FieldType::Time | FieldType::Bytes | FieldType::Json => "String",
        FieldType::Integer => "Int64",
        FieldType::Float => "Float64",
        FieldType::Numeric => "Decimal(38, 9)",
        FieldType::Boolean => "Bool",
        FieldType::Timestamp => "DateTime64(6, 'UTC')",
        FieldType::DateTime => "DateTime64(6)",
        FieldType::Date => "Date32",
    };
    if field.required {
        base.to_string()
    } else {
        format!("Nullable({base})")
    }
}

pub(crate) fn create_table(table: &TableRef, schema: &Schema) -> Result<String, TableError> {
    let columns = schema
        .fields
        .iter()
        .map(|field| {
            let mut column = format!("{} {}", quote(&field.name)?, column_type(field));
            if !field.description.is_empty() {
                column.push_str(" COMMENT ");
                column.push_str(&literal(&field.description));
            }
            Ok(column)
        })
        .collect::<Result<Vec<_>, TableError>>()?;

    let mut sql = format!(
        "CREATE TABLE {} ({}) ENGINE = {ENGINE}",
        qualified(table)?,
        columns.join(", ")
    );
    if !schema.description.is_empty() {
        sql.push_str(" COMMENT ");
        sql.push_str(&literal(&schema.description));
    }
    Ok(sql)
}

/// Empty table with the structure of `like`
pub(crate) fn create_table_as(table: &TableRef, like: &TableRef) -> Result<String, TableError> {
    Ok(format!(
        "CREATE TABLE {} AS {}",
        qualified(table)?,
        qualified(like)?
    ))
}

pub(crate) fn insert_select(dest: &TableRef, source: &TableRef) -> Result<String, TableError> {
    Ok(format!(
        "INSERT INTO {} SELECT * FROM {}",
        qualified(dest)?,
        qualified(source)?
    ))
}

pub(crate) fn exchange(a: &TableRef, b: &TableRef) -> Result<String, TableError> {
    Ok(format!(
        "EXCHANGE TABLES {} AND {}",
        qualified(a)?,
        qualified(b)?
    ))
}

pub(crate) fn drop_table(table: &TableRef) -> Result<String, TableError> {
    Ok(format!("DROP TABLE {}", qualified(table)?))
}

pub(crate) fn insert(table: &TableRef) -> Result<String, TableError> {
    Ok(format!("INSERT INTO {} FORMAT JSONEachRow", qualified(table)?))
}

#[cfg(test)]
#[path = "sql_test.rs"]
mod sql_test;
