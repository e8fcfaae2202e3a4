//! Producer and handler ends of a stream
//!
//! A stream is a bounded queue of [`StreamMessage`]s. Producers hold a
//! [`SourceStream`] and the stream's handler drains the matching
//! [`TargetStream`]. Messages are handled strictly in order, so a
//! completion only covers records sent before it.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::record::{BoxedRecord, Record};
use crate::schema::Schema;

/// Errors seen by producers
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("stream '{stream}' is closed")]
    Closed { stream: String },
}

/// One item on a stream's queue
pub(crate) enum StreamMessage {
    Record(BoxedRecord),
    Records(Vec<BoxedRecord>),
    /// Intermediate flush; acknowledged on receipt
    Flush(oneshot::Sender<()>),
    /// End of cycle; acknowledged on receipt
    Complete(oneshot::Sender<()>),
}

impl std::fmt::Debug for StreamMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Record(_) => f.write_str("Record"),
            Self::Records(records) => write!(f, "Records({})", records.len()),
            Self::Flush(_) => f.write_str("Flush"),
            Self::Complete(_) => f.write_str("Complete"),
        }
    }
}

/// Producer handle for one registered stream
///
/// Cloning gives another producer on the same stream; order is kept per
/// handle.
#[derive(Clone)]
pub struct SourceStream {
    type_name: Arc<str>,
    sender: mpsc::Sender<StreamMessage>,
}

impl std::fmt::Debug for SourceStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceStream")
            .field("type_name", &self.type_name)
            .finish()
    }
}

impl SourceStream {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Queue one record for the current batch
    pub async fn send(&self, record: impl Record) -> Result<(), StreamError> {
        self.send_boxed(Box::new(record)).await
    }

    pub async fn send_boxed(&self, record: BoxedRecord) -> Result<(), StreamError> {
        self.deliver(StreamMessage::Record(record)).await
    }

    /// Queue several records as one message
    pub async fn send_all<R: Record>(
        &self,
        records: impl IntoIterator<Item = R>,
    ) -> Result<(), StreamError> {
        let records: Vec<BoxedRecord> = records
            .into_iter()
            .map(|r| Box::new(r) as BoxedRecord)
            .collect();
        self.deliver(StreamMessage::Records(records)).await
    }

    /// Write the batch so far without ending the cycle
    ///
    /// Returns once the handler has received the request, not once the
    /// write is done.
    pub async fn flush(&self) -> Result<(), StreamError> {
        let (ack, received) = oneshot::channel();
        self.deliver(StreamMessage::Flush(ack)).await?;
        received.await.map_err(|_| self.closed())
    }

    /// End the cycle and flush its batch
    ///
    /// Returns once the handler has received the signal; the write
    /// itself happens afterwards. Watch metrics or the error output to
    /// learn its outcome.
    pub async fn complete(&self) -> Result<(), StreamError> {
        let (ack, received) = oneshot::channel();
        self.deliver(StreamMessage::Complete(ack)).await?;
        received.await.map_err(|_| self.closed())
    }

    async fn deliver(&self, message: StreamMessage) -> Result<(), StreamError> {
        self.sender.send(message).await.map_err(|_| self.closed())
    }

    fn closed(&self) -> StreamError {
        StreamError::Closed {
            stream: self.type_name.to_string(),
        }
    }
}

/// Handler end of a stream
#[derive(Debug)]
pub(crate) struct TargetStream {
    type_name: Arc<str>,
    schema: Schema,
    receiver: mpsc::Receiver<StreamMessage>,
}

impl TargetStream {
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Next message, `None` once every producer handle is gone
    pub async fn recv(&mut self) -> Option<StreamMessage> {
        self.receiver.recv().await
    }
}

/// Create both ends of a stream
pub(crate) fn stream(
    type_name: &str,
    schema: Schema,
    capacity: usize,
) -> (SourceStream, TargetStream) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let type_name: Arc<str> = Arc::from(type_name);
    (
        SourceStream {
            type_name: type_name.clone(),
            sender,
        },
        TargetStream {
            type_name,
            schema,
            receiver,
        },
    )
}

#[cfg(test)]
#[path = "stream_test.rs"]
mod stream_test;
