//! Per-stream handler loop
//!
//! One handler owns one stream. It accumulates records into the batch,
//! runs the stream's write strategy on flush and completion signals, and
//! reports failures to the shared error channel. Record accumulation and
//! flushing share a single sequential loop, so the batch needs no lock.

use std::sync::Arc;

use tablesink_metrics::{Labels, MetricsSink};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{METRIC_ERRORS, flushed_metric, received_metric};
use crate::record::BoxedRecord;
use crate::strategy::{FlushError, FlushKind, TableWriter};
use crate::stream::{StreamMessage, TargetStream};

pub(crate) struct StreamHandler {
    target: TargetStream,
    writer: TableWriter,
    metrics: Arc<dyn MetricsSink>,
    errors: mpsc::Sender<FlushError>,
    received_metric: String,
    flushed_metric: String,
    batch: Vec<BoxedRecord>,
}

impl StreamHandler {
    pub fn new(
        target: TargetStream,
        writer: TableWriter,
        metrics: Arc<dyn MetricsSink>,
        errors: mpsc::Sender<FlushError>,
    ) -> Self {
        let type_name = target.type_name().to_string();
        Self {
            target,
            writer,
            metrics,
            errors,
            received_metric: received_metric(&type_name),
            flushed_metric: flushed_metric(&type_name),
            batch: Vec::new(),
        }
    }

    /// Handle messages until cancelled or every producer is gone
    ///
    /// Cancellation is only observed between messages; a flush in
    /// progress always runs to its end.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            stream = %self.target.type_name(),
            table = %self.target.schema().name,
            strategy = ?self.writer.strategy(),
            "stream handler starting"
        );

        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(stream = %self.target.type_name(), "stream handler cancelled");
                    break;
                }
                message = self.target.recv() => message,
            };

            let Some(message) = message else {
                debug!(stream = %self.target.type_name(), "all producers dropped");
                break;
            };

            match message {
                StreamMessage::Record(record) => self.accept(record),
                StreamMessage::Records(records) => {
                    for record in records {
                        self.accept(record);
                    }
                }
                StreamMessage::Flush(ack) => {
                    let _ = ack.send(());
                    self.flush(FlushKind::Partial).await;
                }
                StreamMessage::Complete(ack) => {
                    let _ = ack.send(());
                    self.flush(FlushKind::Complete).await;
                }
            }
        }

        if !self.batch.is_empty() {
            warn!(
                stream = %self.target.type_name(),
                rows = self.batch.len(),
                "stream handler stopped with unflushed records"
            );
        }
        info!(stream = %self.target.type_name(), "stream handler stopped");
    }

    fn accept(&mut self, record: BoxedRecord) {
        self.batch.push(record);
        self.metrics
            .inc_counter(&self.received_metric, &Labels::day());
    }

    async fn flush(&mut self, kind: FlushKind) {
        let batch = std::mem::take(&mut self.batch);
        let rows = batch.len();

        match self.writer.flush(&batch, kind).await {
            Ok(()) => {
                self.metrics
                    .add_counter(&self.flushed_metric, rows as u64, &Labels::day());
                debug!(
                    stream = %self.target.type_name(),
                    rows = rows,
                    kind = ?kind,
                    "flushed batch"
                );
            }
            Err(err) => {
                warn!(
                    stream = %self.target.type_name(),
                    rows = rows,
                    error = %err,
                    "flush failed"
                );
                self.metrics.inc_counter(METRIC_ERRORS, &Labels::day());
                if self.errors.send(err).await.is_err() {
                    warn!(stream = %self.target.type_name(), "error channel closed");
                }
            }
        }
    }
}
