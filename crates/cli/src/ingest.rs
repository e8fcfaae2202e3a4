//! NDJSON input loop

use anyhow::{Context, Result};
use tablesink::{JsonRecord, SourceStream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// What one pass over the input did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct IngestSummary {
    pub records: usize,
    pub cycles: usize,
    /// Lines that were not JSON objects
    pub skipped: usize,
}

/// Send every JSON object line to `stream`
///
/// A blank line completes the current cycle. End of input completes the
/// last cycle if it received records, or if the input held no cycle at all.
pub(crate) async fn ingest<R>(reader: R, stream: &SourceStream) -> Result<IngestSummary>
where
    R: AsyncBufRead + Unpin,
{
    let mut summary = IngestSummary::default();
    let mut pending = 0usize;
    let mut lines = reader.lines();
    let mut line_number = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_number += 1;
        let line = line.trim();

        if line.is_empty() {
            stream.complete().await?;
            debug!(records = pending, "cycle completed");
            summary.cycles += 1;
            pending = 0;
            continue;
        }

        match JsonRecord::parse(line) {
            Ok(record) => {
                stream.send(record).await?;
                summary.records += 1;
                pending += 1;
            }
            Err(e) => {
                warn!(line = line_number, error = %e, "skipping invalid record");
                summary.skipped += 1;
            }
        }
    }

    if pending > 0 || summary.cycles == 0 {
        stream.complete().await?;
        summary.cycles += 1;
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;
    use tablesink::testing::RecordingTableOperations;
    use tablesink::{Disposition, FieldSchema, FieldType, Schema, SinkBuilder, TableRef};
    use tablesink_metrics::NoopMetrics;

    async fn run(input: &str, disposition: Disposition) -> (IngestSummary, Arc<RecordingTableOperations>) {
        let ops = Arc::new(RecordingTableOperations::new());
        let mut builder = SinkBuilder::new()
            .with_warehouse("http://localhost:8123", "raw")
            .with_table_operations(ops.clone())
            .with_metrics(Arc::new(NoopMetrics));
        let schema = Schema::new("events", disposition)
            .with_field(FieldSchema::new("n", FieldType::Integer));
        let stream = builder.register_stream("events", schema);
        let sink = builder.start().await.unwrap();

        let summary = ingest(input.as_bytes(), &stream).await.unwrap();
        drop(stream);
        tokio::time::timeout(Duration::from_secs(5), sink.join())
            .await
            .unwrap();
        (summary, ops)
    }

    fn ints(ops: &RecordingTableOperations) -> Vec<i64> {
        ops.rows(&TableRef::new("raw", "events"))
            .unwrap_or_default()
            .iter()
            .filter_map(|row| row["n"].as_i64())
            .collect()
    }

    #[tokio::test]
    async fn test_single_cycle_at_eof() {
        let (summary, ops) = run("{\"n\": 1}\n{\"n\": 2}\n", Disposition::Append).await;
        assert_eq!(
            summary,
            IngestSummary {
                records: 2,
                cycles: 1,
                skipped: 0
            }
        );
        assert_eq!(ints(&ops), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_blank_lines_split_cycles() {
        let input = "{\"n\": 1}\n\n{\"n\": 2}\n{\"n\": 3}\n\n";
        let (summary, ops) = run(input, Disposition::Truncate).await;
        assert_eq!(summary.cycles, 2);
        assert_eq!(ops.recorded().copies.len(), 2);
        // truncate keeps only the last cycle
        assert_eq!(ints(&ops), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_invalid_lines_are_skipped() {
        let (summary, ops) = run("{\"n\": 1}\nnot json\n[1]\n", Disposition::Append).await;
        assert_eq!(summary.records, 1);
        assert_eq!(summary.skipped, 2);
        assert_eq!(ints(&ops), vec![1]);
    }

    #[tokio::test]
    async fn test_empty_input_still_completes() {
        let (summary, ops) = run("", Disposition::Append).await;
        assert_eq!(summary.cycles, 1);
        assert_eq!(ops.recorded().creations.len(), 1);
    }
}
