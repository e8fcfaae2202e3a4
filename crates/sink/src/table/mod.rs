//! Table operations seam
//!
//! Everything the write strategies need from a warehouse goes through
//! [`TableOperations`]: create, write, copy, and delete tables. The
//! ClickHouse backend implements it over HTTP; tests substitute the
//! recording fake in [`crate::testing`].

mod error;
mod naming;

pub use error::{TableError, is_already_exists_message};
pub use naming::{TEMP_TABLE_TIME_FORMAT, is_valid_identifier, temp_table_name, temp_table_schema};

use async_trait::async_trait;
use std::fmt;

use crate::record::BoxedRecord;
use crate::schema::Schema;

/// Fully qualified reference to a table
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableRef {
    pub dataset: String,
    pub table: String,
}

impl TableRef {
    pub fn new(dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table)
    }
}

/// Warehouse operations used by the write strategies
///
/// Implementations must be safe to call concurrently from every stream
/// handler.
#[async_trait]
pub trait TableOperations: Send + Sync {
    /// Insert rows into an existing table
    async fn write(&self, table: &TableRef, rows: &[BoxedRecord]) -> Result<(), TableError>;

    /// Create the table described by `schema` in `dataset`
    ///
    /// Creating a table that already exists is not an error.
    async fn create_table(&self, dataset: &str, schema: &Schema) -> Result<TableRef, TableError>;

    /// Replace the content of `dest` with the content of `source`
    async fn copy_table(&self, source: &TableRef, dest: &TableRef) -> Result<(), TableError>;

    /// Drop the table
    async fn delete_table(&self, table: &TableRef) -> Result<(), TableError>;

    /// Reference to the table for `schema` without touching the warehouse
    fn table_ref(&self, dataset: &str, schema: &Schema) -> TableRef {
        TableRef::new(dataset, schema.name.clone())
    }
}
