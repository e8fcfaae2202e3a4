//! Tablesink
//!
//! In-process sink that batches record streams in memory and flushes them
//! into ClickHouse tables on explicit signals.
//!
//! # Overview
//!
//! Producers register a stream per record type with a [`Schema`], send
//! records through the returned [`SourceStream`], and call
//! [`SourceStream::complete`] to end a batch. Each stream has its own
//! handler task, which flushes the batch with the write strategy its
//! [`Disposition`] selects:
//!
//! - **Append**: create the target table if needed and insert the batch.
//! - **Truncate**: stage the batch in a temporary table named
//!   `<table>_<YYYYMMDDHHmm>` (UTC), replace the target's content with it,
//!   and drop the temporary table. Readers of the target never see a
//!   partially written cycle.
//!
//! Failed flushes never stop a handler. They are logged, counted in
//! `sink_errors`, and forwarded to the optional error output.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablesink::{Disposition, FieldSchema, FieldType, JsonRecord, Schema, SinkBuilder};
//! use tablesink_metrics::CounterRegistry;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let schema = Schema::new("daily_totals", Disposition::Truncate)
//!     .with_field(FieldSchema::new("day", FieldType::Date).required())
//!     .with_field(FieldSchema::new("total", FieldType::Numeric));
//!
//! let mut builder = SinkBuilder::new()
//!     .with_warehouse("http://localhost:8123", "analytics")
//!     .with_metrics(Arc::new(CounterRegistry::new()));
//! let totals = builder.register_stream("daily_totals", schema);
//! let sink = builder.start().await?;
//!
//! totals.send(JsonRecord::parse(r#"{"day": "2021-10-30", "total": 12.5}"#)?).await?;
//! totals.complete().await?;
//!
//! sink.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod clickhouse;
pub mod credentials;
mod dispatcher;
mod handler;
mod record;
mod schema;
mod strategy;
mod stream;
pub mod table;
pub mod testing;

pub use clickhouse::ClickHouseTableOperations;
pub use credentials::{
    EnvSecretsManager, SecretError, SecretsManager, StaticSecretsManager, WarehouseCredentials,
};
pub use dispatcher::{RunningSink, SinkBuilder, SinkError};
pub use record::{BoxedRecord, JsonRecord, Record, RecordError, Row, SavedRow};
pub use schema::{Disposition, FieldSchema, FieldType, Schema};
pub use strategy::{FlushError, FlushStep, WriteStrategy};
pub use stream::{SourceStream, StreamError};
pub use table::{TableError, TableOperations, TableRef, temp_table_name};

/// Counter incremented for every failed flush
pub const METRIC_ERRORS: &str = "sink_errors";

/// Name of the per-record counter for a stream type
pub fn received_metric(type_name: &str) -> String {
    format!("sink_{type_name}_received")
}

/// Name of the flushed-rows counter for a stream type
pub fn flushed_metric(type_name: &str) -> String {
    format!("sink_{type_name}_flushed")
}
