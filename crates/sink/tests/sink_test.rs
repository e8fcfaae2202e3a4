//! End-to-end tests for the sink against in-memory table operations

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tablesink::testing::{Operation, RecordingTableOperations};
use tablesink::{
    Disposition, FieldSchema, FieldType, FlushError, FlushStep, JsonRecord, Schema, SinkBuilder,
    SinkError, StaticSecretsManager, StreamError, TableRef, temp_table_name,
};
use tablesink_metrics::{ChannelMetrics, CountChange, CounterRegistry, MetricsSink};
use tokio::sync::mpsc;

const DATASET: &str = "integration";
const WAIT: Duration = Duration::from_secs(5);

fn schema(name: &str, disposition: Disposition) -> Schema {
    Schema::new(name, disposition)
        .with_description("Table for testing")
        .with_field(FieldSchema::new("stringColumn", FieldType::String))
        .with_field(FieldSchema::new("intColumn", FieldType::Integer))
        .with_field(FieldSchema::new("timeColumn", FieldType::Time))
}

fn record(n: i64) -> JsonRecord {
    JsonRecord::new(json!({
        "stringColumn": format!("row {n}"),
        "intColumn": n,
        "timeColumn": "09:16:01",
    }))
    .unwrap()
}

fn builder(ops: &Arc<RecordingTableOperations>, metrics: Arc<dyn MetricsSink>) -> SinkBuilder {
    SinkBuilder::new()
        .with_warehouse("http://localhost:8123", DATASET)
        .with_table_operations(ops.clone())
        .with_metrics(metrics)
}

fn ints(ops: &RecordingTableOperations, table: &str) -> Vec<i64> {
    ops.rows(&TableRef::new(DATASET, table))
        .unwrap_or_default()
        .iter()
        .filter_map(|row| row.get("intColumn").and_then(|v| v.as_i64()))
        .collect()
}

async fn next_changes(
    events: &mut mpsc::UnboundedReceiver<CountChange>,
    count: usize,
) -> Vec<CountChange> {
    let mut changes = Vec::with_capacity(count);
    while changes.len() < count {
        let change = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for metrics")
            .expect("metrics channel closed");
        changes.push(change);
    }
    changes
}

#[tokio::test]
async fn test_append_stream_end_to_end() {
    let ops = Arc::new(RecordingTableOperations::new());
    let (metrics, mut events) = ChannelMetrics::new();
    let mut builder = builder(&ops, Arc::new(metrics));
    let stream = builder.register_stream("test", schema("integration_test", Disposition::Append));
    let sink = builder.start().await.unwrap();

    for n in 1..=3 {
        stream.send(record(n)).await.unwrap();
    }
    stream.complete().await.unwrap();

    // three received increments, then one flushed increment of three
    let changes = next_changes(&mut events, 4).await;
    let received: Vec<_> = changes
        .iter()
        .filter(|c| c.name == "sink_test_received")
        .collect();
    assert_eq!(received.len(), 3);
    assert!(received.iter().all(|c| c.increment == 1));
    assert_eq!(changes[3].name, "sink_test_flushed");
    assert_eq!(changes[3].increment, 3);
    assert!(changes.iter().all(|c| c.labels.get("day").is_some()));

    let recorded = ops.recorded();
    assert_eq!(recorded.creations.len(), 1);
    assert_eq!(recorded.rows_written(), 3);
    assert!(recorded.copies.is_empty());
    assert!(recorded.deletions.is_empty());
    assert_eq!(ints(&ops, "integration_test"), vec![1, 2, 3]);

    sink.shutdown().await;
}

#[tokio::test]
async fn test_truncate_stream_end_to_end() {
    let ops = Arc::new(RecordingTableOperations::new());
    let (metrics, mut events) = ChannelMetrics::new();
    let mut builder = builder(&ops, Arc::new(metrics));
    let stream = builder.register_stream("test", schema("integration_test", Disposition::Truncate));
    let sink = builder.start().await.unwrap();

    let before = chrono::Utc::now();
    stream.send_all((1..=3).map(record)).await.unwrap();
    stream.complete().await.unwrap();

    let changes = next_changes(&mut events, 4).await;
    let after = chrono::Utc::now();
    assert_eq!(changes[3].name, "sink_test_flushed");
    assert_eq!(changes[3].increment, 3);

    let recorded = ops.recorded();
    assert_eq!(recorded.creations.len(), 2);
    assert_eq!(recorded.copies.len(), 1);
    assert_eq!(recorded.deletions.len(), 2);
    assert_eq!(recorded.rows_written(), 3);

    let temp = &recorded.creations[0].table;
    let suffix = &temp["integration_test_".len()..];
    assert_eq!(suffix.len(), 12, "{temp}");
    assert!(
        *temp == temp_table_name("integration_test", before)
            || *temp == temp_table_name("integration_test", after),
        "{temp}"
    );
    assert_eq!(ops.table_names(), vec!["integration_test".to_string()]);
    assert_eq!(ints(&ops, "integration_test"), vec![1, 2, 3]);

    sink.shutdown().await;
}

#[tokio::test]
async fn test_records_after_complete_wait_for_next_cycle() {
    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new()));
    let stream = builder.register_stream("test", schema("ordered", Disposition::Append));
    let sink = builder.start().await.unwrap();

    stream.send(record(1)).await.unwrap();
    stream.send(record(2)).await.unwrap();
    stream.complete().await.unwrap();
    stream.send(record(3)).await.unwrap();

    assert!(ops.wait_until(WAIT, |r| r.writes.len() == 1).await);
    assert_eq!(ops.recorded().writes[0].1, 2);

    stream.complete().await.unwrap();
    assert!(ops.wait_until(WAIT, |r| r.writes.len() == 2).await);
    assert_eq!(ops.recorded().writes[1].1, 1);
    assert_eq!(ints(&ops, "ordered"), vec![1, 2, 3]);

    sink.shutdown().await;
}

#[tokio::test]
async fn test_failure_on_one_stream_does_not_affect_another() {
    let ops = Arc::new(RecordingTableOperations::new());
    ops.fail(Operation::Write, "failing");
    let registry = Arc::new(CounterRegistry::new());
    let (error_tx, mut error_rx) = mpsc::channel::<FlushError>(8);

    let mut builder = builder(&ops, registry.clone()).with_error_output(error_tx);
    let healthy = builder.register_stream("healthy", schema("healthy", Disposition::Append));
    let failing = builder.register_stream("failing", schema("failing", Disposition::Truncate));
    let sink = builder.start().await.unwrap();

    failing.send(record(1)).await.unwrap();
    healthy.send(record(2)).await.unwrap();
    failing.complete().await.unwrap();
    healthy.complete().await.unwrap();

    let err = tokio::time::timeout(WAIT, error_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(err.stream(), "failing");
    assert_eq!(err.step(), FlushStep::WriteTemp);
    assert!(err.to_string().starts_with("while writing to temporary table: "));

    drop(healthy);
    drop(failing);
    sink.join().await;

    assert_eq!(ints(&ops, "healthy"), vec![2]);
    assert!(ops.rows(&TableRef::new(DATASET, "failing")).is_none());
    assert_eq!(registry.total("sink_healthy_flushed"), 1);
    assert_eq!(registry.total("sink_failing_flushed"), 0);
    assert_eq!(registry.total("sink_failing_received"), 1);
    // counted by the handler and again by the drain loop
    assert_eq!(registry.total("sink_errors"), 2);
}

#[tokio::test]
async fn test_batch_resets_after_failed_flush() {
    let ops = Arc::new(RecordingTableOperations::new());
    ops.fail_once(Operation::Write, "resets");
    let registry = Arc::new(CounterRegistry::new());
    let mut builder = builder(&ops, registry.clone());
    let stream = builder.register_stream("resets", schema("resets", Disposition::Append));
    let sink = builder.start().await.unwrap();

    stream.send(record(1)).await.unwrap();
    stream.send(record(2)).await.unwrap();
    stream.complete().await.unwrap();
    stream.send(record(3)).await.unwrap();
    stream.complete().await.unwrap();

    drop(stream);
    sink.join().await;

    let recorded = ops.recorded();
    assert_eq!(recorded.writes.len(), 2);
    assert_eq!(recorded.writes[1].1, 1);
    assert_eq!(ints(&ops, "resets"), vec![3]);
    assert_eq!(registry.total("sink_resets_flushed"), 1);
}

#[tokio::test]
async fn test_intermediate_flush_on_truncate_stream() {
    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new()));
    let stream = builder.register_stream("staged", schema("staged", Disposition::Truncate));
    let sink = builder.start().await.unwrap();

    stream.send(record(1)).await.unwrap();
    stream.flush().await.unwrap();
    stream.send(record(2)).await.unwrap();
    stream.complete().await.unwrap();

    drop(stream);
    sink.join().await;

    let recorded = ops.recorded();
    assert_eq!(recorded.writes.len(), 2);
    assert_eq!(recorded.copies.len(), 1);
    assert_eq!(ints(&ops, "staged"), vec![1, 2]);
}

#[tokio::test]
async fn test_send_after_shutdown_is_closed() {
    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new()));
    let stream = builder.register_stream("test", schema("closed", Disposition::Append));
    let sink = builder.start().await.unwrap();

    sink.shutdown().await;

    let err = stream.send(record(1)).await.unwrap_err();
    assert!(matches!(err, StreamError::Closed { .. }));
    assert!(stream.complete().await.is_err());
}

#[tokio::test]
async fn test_secrets_materialised_before_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("credentials.json");
    let secrets = StaticSecretsManager::new().with_secret(
        "warehouse-credentials",
        r#"{"username": "writer", "password": "pw"}"#,
    );

    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new()))
        .with_secrets(Arc::new(secrets))
        .with_credentials_path(&path);
    builder.register_stream("test", schema("secrets", Disposition::Append));
    let sink = builder.start().await.unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert!(written.contains("writer"));
    sink.shutdown().await;
}

#[tokio::test]
async fn test_missing_secret_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new()))
        .with_secrets(Arc::new(StaticSecretsManager::new()))
        .with_credentials_path(dir.path().join("credentials.json"));
    builder.register_stream("test", schema("secrets", Disposition::Append));

    let err = builder.start().await.unwrap_err();
    assert!(matches!(err, SinkError::Credentials(_)));
}

#[tokio::test]
async fn test_records_queued_before_start_are_kept() {
    let ops = Arc::new(RecordingTableOperations::new());
    let mut builder = builder(&ops, Arc::new(CounterRegistry::new())).with_queue_capacity(4);
    let stream = builder.register_stream("early", schema("early", Disposition::Append));

    stream.send(record(1)).await.unwrap();
    let sink = builder.start().await.unwrap();
    stream.complete().await.unwrap();

    drop(stream);
    sink.join().await;
    assert_eq!(ints(&ops, "early"), vec![1]);
}
