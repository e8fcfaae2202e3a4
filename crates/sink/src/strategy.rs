//! Write strategies
//!
//! A flush moves one batch into the warehouse. Append writes straight into
//! the target table. Truncate-replace stages the batch in a temporary
//! table, replaces the target's content with it, and drops the temporary
//! table. Each step that can fail is a [`FlushStep`] whose context
//! prefixes the error.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use crate::record::BoxedRecord;
use crate::schema::{Disposition, Schema};
use crate::table::{TableError, TableOperations, TableRef, temp_table_name, temp_table_schema};

/// How batches reach the target table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    Append,
    TruncateReplace,
}

impl WriteStrategy {
    /// Append for [`Disposition::Append`], truncate-replace otherwise
    pub fn for_disposition(disposition: Disposition) -> Self {
        match disposition {
            Disposition::Append => Self::Append,
            Disposition::Truncate | Disposition::Empty => Self::TruncateReplace,
        }
    }
}

/// A failing step of a flush
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushStep {
    CreateTable,
    WriteDirect,
    CreateTempTable,
    WriteTemp,
    CopyFromTemp,
    DeleteTemp,
}

impl FlushStep {
    pub fn context(&self) -> &'static str {
        match self {
            Self::CreateTable => "while creating table",
            Self::WriteDirect => "while writing directly",
            Self::CreateTempTable => "while creating temporary table",
            Self::WriteTemp => "while writing to temporary table",
            Self::CopyFromTemp => "while copying data from temp table",
            Self::DeleteTemp => "while deleting temp table",
        }
    }
}

/// A failed flush: the stream, the step, and the cause
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", step.context())]
pub struct FlushError {
    stream: String,
    step: FlushStep,
    #[source]
    source: TableError,
}

impl FlushError {
    pub fn new(stream: impl Into<String>, step: FlushStep, source: TableError) -> Self {
        Self {
            stream: stream.into(),
            step,
            source,
        }
    }

    /// Type name of the stream whose flush failed
    pub fn stream(&self) -> &str {
        &self.stream
    }

    pub fn step(&self) -> FlushStep {
        self.step
    }

    pub fn table_error(&self) -> &TableError {
        &self.source
    }
}

/// Whether a flush closes the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FlushKind {
    /// Intermediate flush requested by the producer
    Partial,
    /// End of cycle
    Complete,
}

/// Applies a stream's strategy to its batches
///
/// Holds the per-cycle state: whether the append target was resolved and
/// which temporary table is staging the current truncate cycle.
pub(crate) struct TableWriter {
    stream: String,
    strategy: WriteStrategy,
    dataset: String,
    schema: Schema,
    operations: Arc<dyn TableOperations>,
    target: Option<TableRef>,
    staging: Option<TableRef>,
}

impl TableWriter {
    pub fn new(
        stream: impl Into<String>,
        dataset: impl Into<String>,
        schema: Schema,
        operations: Arc<dyn TableOperations>,
    ) -> Self {
        Self {
            stream: stream.into(),
            strategy: WriteStrategy::for_disposition(schema.disposition),
            dataset: dataset.into(),
            schema,
            operations,
            target: None,
            staging: None,
        }
    }

    pub fn strategy(&self) -> WriteStrategy {
        self.strategy
    }

    pub async fn flush(&mut self, rows: &[BoxedRecord], kind: FlushKind) -> Result<(), FlushError> {
        let result = match self.strategy {
            WriteStrategy::Append => self.append(rows, kind).await,
            WriteStrategy::TruncateReplace => self.truncate_replace(rows, kind).await,
        };
        result.map_err(|(step, source)| FlushError::new(self.stream.clone(), step, source))
    }

    async fn append(
        &mut self,
        rows: &[BoxedRecord],
        kind: FlushKind,
    ) -> Result<(), (FlushStep, TableError)> {
        let result = self.write_direct(rows).await;
        if kind == FlushKind::Complete {
            // the next cycle resolves the target anew
            self.target = None;
        }
        result
    }

    async fn write_direct(&mut self, rows: &[BoxedRecord]) -> Result<(), (FlushStep, TableError)> {
        let target = match &self.target {
            Some(target) => target.clone(),
            None => {
                let target = self
                    .operations
                    .create_table(&self.dataset, &self.schema)
                    .await
                    .map_err(|e| (FlushStep::CreateTable, e))?;
                self.target = Some(target.clone());
                target
            }
        };

        self.operations
            .write(&target, rows)
            .await
            .map_err(|e| (FlushStep::WriteDirect, e))?;
        debug!(stream = %self.stream, table = %target, rows = rows.len(), "appended batch");
        Ok(())
    }

    async fn truncate_replace(
        &mut self,
        rows: &[BoxedRecord],
        kind: FlushKind,
    ) -> Result<(), (FlushStep, TableError)> {
        let result = self.stage(rows).await;

        if kind == FlushKind::Partial {
            return match result {
                Ok(_) => Ok(()),
                Err((FlushStep::CreateTempTable, e)) => {
                    self.discard_staging().await;
                    Err((FlushStep::CreateTempTable, e))
                }
                // rows staged by earlier flushes stay for the swap
                Err(e) => Err(e),
            };
        }

        let result = match result {
            Ok(temp) => self.replace_target(&temp).await,
            Err(e) => Err(e),
        };
        self.discard_staging().await;
        result
    }

    /// Write rows into the cycle's temporary table, creating it first if needed
    async fn stage(&mut self, rows: &[BoxedRecord]) -> Result<TableRef, (FlushStep, TableError)> {
        let temp = match &self.staging {
            Some(temp) => temp.clone(),
            None => {
                let name = temp_table_name(&self.schema.name, Utc::now());
                let temp_schema = temp_table_schema(name, &self.schema);
                // remembered before creation so cleanup covers a half-created table
                self.staging = Some(self.operations.table_ref(&self.dataset, &temp_schema));
                self.operations
                    .create_table(&self.dataset, &temp_schema)
                    .await
                    .map_err(|e| (FlushStep::CreateTempTable, e))?
            }
        };

        self.operations
            .write(&temp, rows)
            .await
            .map_err(|e| (FlushStep::WriteTemp, e))?;
        debug!(stream = %self.stream, table = %temp, rows = rows.len(), "staged batch");
        Ok(temp)
    }

    async fn replace_target(&self, temp: &TableRef) -> Result<(), (FlushStep, TableError)> {
        let target = self
            .operations
            .create_table(&self.dataset, &self.schema)
            .await
            .map_err(|e| (FlushStep::CreateTable, e))?;

        self.operations
            .copy_table(temp, &target)
            .await
            .map_err(|e| (FlushStep::CopyFromTemp, e))?;

        self.operations
            .delete_table(temp)
            .await
            .map_err(|e| (FlushStep::DeleteTemp, e))?;

        debug!(stream = %self.stream, table = %target, "replaced table content");
        Ok(())
    }

    /// Best-effort drop of the cycle's temporary table
    async fn discard_staging(&mut self) {
        let Some(temp) = self.staging.take() else {
            return;
        };
        match self.operations.delete_table(&temp).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {}
            Err(e) => warn!(
                stream = %self.stream,
                table = %temp,
                error = %e,
                "failed to clean up temporary table"
            ),
        }
    }
}

#[cfg(test)]
#[path = "strategy_test.rs"]
mod strategy_test;
