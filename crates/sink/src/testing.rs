//! In-memory table operations for tests
//!
//! [`RecordingTableOperations`] keeps table contents in memory, records
//! every call (failed ones included), and can be told to fail specific
//! operations. Use it instead of mocking individual calls so strategies
//! and handlers run their real code paths.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::record::{BoxedRecord, Row};
use crate::schema::Schema;
use crate::table::{TableError, TableOperations, TableRef};

/// Operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Write,
    CreateTable,
    CopyTable,
    DeleteTable,
}

/// Calls seen so far
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    pub creations: Vec<TableRef>,
    /// Target and row count of every write
    pub writes: Vec<(TableRef, usize)>,
    /// `(source, dest)` of every copy
    pub copies: Vec<(TableRef, TableRef)>,
    pub deletions: Vec<TableRef>,
}

impl Recorded {
    pub fn rows_written(&self) -> usize {
        self.writes.iter().map(|(_, rows)| rows).sum()
    }
}

#[derive(Debug)]
struct Failure {
    operation: Operation,
    table: TableMatch,
    remaining: Option<usize>,
}

#[derive(Debug)]
enum TableMatch {
    Contains(String),
    Exact(String),
}

impl TableMatch {
    fn matches(&self, table: &TableRef) -> bool {
        match self {
            Self::Contains(part) => table.table.contains(part.as_str()),
            Self::Exact(name) => table.table == *name,
        }
    }
}

/// Recording fake of [`TableOperations`]
#[derive(Debug, Default)]
pub struct RecordingTableOperations {
    recorded: Mutex<Recorded>,
    tables: Mutex<HashMap<TableRef, Vec<Row>>>,
    failures: Mutex<Vec<Failure>>,
}

impl RecordingTableOperations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `operation` on tables whose name contains `table_contains`
    pub fn fail(&self, operation: Operation, table_contains: impl Into<String>) {
        self.failures.lock().push(Failure {
            operation,
            table: TableMatch::Contains(table_contains.into()),
            remaining: None,
        });
    }

    /// Fail the next matching `operation` only
    pub fn fail_once(&self, operation: Operation, table_contains: impl Into<String>) {
        self.failures.lock().push(Failure {
            operation,
            table: TableMatch::Contains(table_contains.into()),
            remaining: Some(1),
        });
    }

    /// Fail every `operation` on the table named exactly `table`
    pub fn fail_exact(&self, operation: Operation, table: impl Into<String>) {
        self.failures.lock().push(Failure {
            operation,
            table: TableMatch::Exact(table.into()),
            remaining: None,
        });
    }

    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().clone()
    }

    /// Current rows of a table, `None` if it does not exist
    pub fn rows(&self, table: &TableRef) -> Option<Vec<Row>> {
        self.tables.lock().get(table).cloned()
    }

    pub fn table_exists(&self, table: &TableRef) -> bool {
        self.tables.lock().contains_key(table)
    }

    /// Names of existing tables, sorted
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.lock().keys().map(|t| t.table.clone()).collect();
        names.sort();
        names
    }

    /// Poll until `condition` holds for the recorded calls
    ///
    /// Returns false if `timeout` elapses first.
    pub async fn wait_until(
        &self,
        timeout: Duration,
        condition: impl Fn(&Recorded) -> bool,
    ) -> bool {
        let poll = async {
            loop {
                if condition(&*self.recorded.lock()) {
                    return;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        };
        tokio::time::timeout(timeout, poll).await.is_ok()
    }

    fn check(&self, operation: Operation, table: &TableRef) -> Result<(), TableError> {
        let mut failures = self.failures.lock();
        let Some(index) = failures.iter().position(|f| {
            f.operation == operation
                && f.table.matches(table)
                && f.remaining.is_none_or(|n| n > 0)
        }) else {
            return Ok(());
        };
        if let Some(remaining) = failures[index].remaining.as_mut() {
            *remaining -= 1;
            if *remaining == 0 {
                failures.remove(index);
            }
        }
        Err(TableError::Remote {
            code: 0,
            message: format!("injected {operation:?} failure on {table}"),
        })
    }

    fn not_found(table: &TableRef) -> TableError {
        TableError::NotFound {
            table: table.to_string(),
        }
    }
}

#[async_trait]
impl TableOperations for RecordingTableOperations {
    async fn write(&self, table: &TableRef, rows: &[BoxedRecord]) -> Result<(), TableError> {
        self.recorded.lock().writes.push((table.clone(), rows.len()));
        self.check(Operation::Write, table)?;

        let saved = rows
            .iter()
            .map(|record| record.save().map(|row| row.values))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tables = self.tables.lock();
        let existing = tables.get_mut(table).ok_or_else(|| Self::not_found(table))?;
        existing.extend(saved);
        Ok(())
    }

    async fn create_table(&self, dataset: &str, schema: &Schema) -> Result<TableRef, TableError> {
        let table = self.table_ref(dataset, schema);
        self.recorded.lock().creations.push(table.clone());
        self.check(Operation::CreateTable, &table)?;

        self.tables.lock().entry(table.clone()).or_default();
        Ok(table)
    }

    async fn copy_table(&self, source: &TableRef, dest: &TableRef) -> Result<(), TableError> {
        self.recorded
            .lock()
            .copies
            .push((source.clone(), dest.clone()));
        self.check(Operation::CopyTable, dest)?;

        let mut tables = self.tables.lock();
        let rows = tables
            .get(source)
            .cloned()
            .ok_or_else(|| Self::not_found(source))?;
        tables.insert(dest.clone(), rows);
        Ok(())
    }

    async fn delete_table(&self, table: &TableRef) -> Result<(), TableError> {
        self.recorded.lock().deletions.push(table.clone());
        self.check(Operation::DeleteTable, table)?;

        self.tables
            .lock()
            .remove(table)
            .map(|_| ())
            .ok_or_else(|| Self::not_found(table))
    }
}
