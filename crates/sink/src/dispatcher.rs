//! Sink assembly and lifecycle
//!
//! [`SinkBuilder`] collects configuration and stream registrations;
//! [`SinkBuilder::start`] validates them, prepares credentials, builds the
//! table operations backend, and spawns one handler task per stream plus
//! the error drain loop. [`RunningSink`] owns those tasks.

use std::path::PathBuf;
use std::sync::Arc;

use tablesink_config::{
    Config, DEFAULT_DATABASE, DEFAULT_SECRET_KEY, WarehouseConfig, default_credentials_path,
};
use tablesink_metrics::{Labels, MetricsSink};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::METRIC_ERRORS;
use crate::clickhouse::ClickHouseTableOperations;
use crate::credentials::{SecretError, SecretsManager, load_credentials, materialize_credentials};
use crate::handler::StreamHandler;
use crate::schema::Schema;
use crate::strategy::{FlushError, TableWriter};
use crate::stream::{SourceStream, TargetStream, stream};
use crate::table::{TableError, TableOperations};

/// Failed flushes buffered between handlers and the drain loop
const ERROR_CHANNEL_CAPACITY: usize = 16;

/// Fatal configuration errors raised by [`SinkBuilder::start`]
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("no streams registered")]
    NoStreams,

    #[error("a metrics sink is required")]
    MissingMetrics,

    #[error("no warehouse configured and no table operations provided")]
    MissingWarehouse,

    #[error("failed to prepare credentials: {0}")]
    Credentials(#[from] SecretError),

    #[error("failed to create warehouse client: {0}")]
    Client(#[source] TableError),
}

/// Builder for a sink
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use tablesink::{Disposition, JsonRecord, Schema, SinkBuilder};
/// use tablesink_metrics::CounterRegistry;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let mut builder = SinkBuilder::new()
///     .with_warehouse("http://localhost:8123", "raw")
///     .with_metrics(Arc::new(CounterRegistry::new()));
/// let orders = builder.register_stream("orders", Schema::new("orders", Disposition::Append));
///
/// let sink = builder.start().await?;
/// orders.send(JsonRecord::parse(r#"{"id": "a"}"#)?).await?;
/// orders.complete().await?;
/// sink.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct SinkBuilder {
    warehouse: Option<WarehouseConfig>,
    operations: Option<Arc<dyn TableOperations>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    error_output: Option<mpsc::Sender<FlushError>>,
    secrets: Option<Arc<dyn SecretsManager>>,
    secret_key: String,
    credentials_path: PathBuf,
    queue_capacity: usize,
    streams: Vec<TargetStream>,
}

impl Default for SinkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SinkBuilder {
    pub fn new() -> Self {
        Self {
            warehouse: None,
            operations: None,
            metrics: None,
            error_output: None,
            secrets: None,
            secret_key: DEFAULT_SECRET_KEY.into(),
            credentials_path: default_credentials_path(),
            queue_capacity: 1,
            streams: Vec::new(),
        }
    }

    /// Seed the builder from loaded configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            warehouse: Some(config.warehouse.clone()),
            secret_key: config.sink.secret_key.clone(),
            credentials_path: config.sink.credentials_path.clone(),
            queue_capacity: config.sink.queue_capacity,
            ..Self::new()
        }
    }

    /// Target a ClickHouse endpoint and database
    pub fn with_warehouse(mut self, url: impl Into<String>, database: impl Into<String>) -> Self {
        let config = self
            .warehouse
            .take()
            .unwrap_or_default()
            .with_url(url)
            .with_database(database);
        self.warehouse = Some(config);
        self
    }

    pub fn with_warehouse_config(mut self, config: WarehouseConfig) -> Self {
        self.warehouse = Some(config);
        self
    }

    /// Use these table operations instead of building a ClickHouse client
    pub fn with_table_operations(mut self, operations: Arc<dyn TableOperations>) -> Self {
        self.operations = Some(operations);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Also forward every flush failure to `output`
    pub fn with_error_output(mut self, output: mpsc::Sender<FlushError>) -> Self {
        self.error_output = Some(output);
        self
    }

    /// Fetch warehouse credentials from `secrets` at startup
    pub fn with_secrets(mut self, secrets: Arc<dyn SecretsManager>) -> Self {
        self.secrets = Some(secrets);
        self
    }

    pub fn with_secret_key(mut self, key: impl Into<String>) -> Self {
        self.secret_key = key.into();
        self
    }

    pub fn with_credentials_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials_path = path.into();
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Register a stream and get its producer handle
    ///
    /// The stream's write strategy follows `schema.disposition`. Records
    /// sent before [`start`](Self::start) wait in the queue (and suspend
    /// the producer once it is full).
    pub fn register_stream(&mut self, type_name: &str, schema: Schema) -> SourceStream {
        let (source, target) = stream(type_name, schema, self.queue_capacity);
        self.streams.push(target);
        source
    }

    /// Validate, connect, and spawn the handlers
    pub async fn start(self) -> Result<RunningSink, SinkError> {
        if self.streams.is_empty() {
            return Err(SinkError::NoStreams);
        }
        let metrics = self.metrics.ok_or(SinkError::MissingMetrics)?;

        if let Some(secrets) = &self.secrets {
            materialize_credentials(secrets.as_ref(), &self.secret_key, &self.credentials_path)
                .await?;
        }

        let dataset = self
            .warehouse
            .as_ref()
            .map(|w| w.database.clone())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        let operations: Arc<dyn TableOperations> = match (self.operations, &self.warehouse) {
            (Some(operations), _) => operations,
            (None, Some(warehouse)) => {
                let mut client =
                    ClickHouseTableOperations::new(warehouse).map_err(SinkError::Client)?;
                if let Some(credentials) = load_credentials(&self.credentials_path).await? {
                    debug!(path = %self.credentials_path.display(), "using materialised credentials");
                    client = client.with_credentials(credentials);
                }
                Arc::new(client)
            }
            (None, None) => return Err(SinkError::MissingWarehouse),
        };

        let cancel = CancellationToken::new();
        let (error_tx, error_rx) = mpsc::channel(ERROR_CHANNEL_CAPACITY);
        let stream_count = self.streams.len();

        let handlers = self
            .streams
            .into_iter()
            .map(|target| {
                let writer = TableWriter::new(
                    target.type_name(),
                    dataset.clone(),
                    target.schema().clone(),
                    operations.clone(),
                );
                let handler = StreamHandler::new(target, writer, metrics.clone(), error_tx.clone());
                tokio::spawn(handler.run(cancel.child_token()))
            })
            .collect();
        drop(error_tx);

        let drain = tokio::spawn(drain_errors(error_rx, metrics, self.error_output));

        info!(streams = stream_count, dataset = %dataset, "sink started");

        Ok(RunningSink {
            cancel,
            handlers,
            drain,
            stream_count,
        })
    }
}

/// Log, count, and forward every flush failure until all handlers are gone
async fn drain_errors(
    mut errors: mpsc::Receiver<FlushError>,
    metrics: Arc<dyn MetricsSink>,
    mut output: Option<mpsc::Sender<FlushError>>,
) {
    while let Some(err) = errors.recv().await {
        metrics.inc_counter(METRIC_ERRORS, &Labels::day());
        error!(
            stream = %err.stream(),
            step = ?err.step(),
            error = %err,
            "error flushing stream"
        );

        if let Some(sender) = &output
            && sender.send(err).await.is_err()
        {
            warn!("error output receiver dropped, no longer forwarding");
            output = None;
        }
    }
    debug!("error drain stopped");
}

/// A started sink
///
/// Handlers run until [`shutdown`](Self::shutdown) or until every
/// producer handle of their stream is dropped.
pub struct RunningSink {
    cancel: CancellationToken,
    handlers: Vec<JoinHandle<()>>,
    drain: JoinHandle<()>,
    stream_count: usize,
}

impl std::fmt::Debug for RunningSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningSink")
            .field("streams", &self.stream_count)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

impl RunningSink {
    pub fn stream_count(&self) -> usize {
        self.stream_count
    }

    /// Token that stops every handler when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Wait for handlers to stop on their own (all producers dropped)
    ///
    /// Pending completions are flushed before each handler exits.
    pub async fn join(self) {
        for handler in self.handlers {
            if let Err(e) = handler.await {
                error!(error = %e, "stream handler task failed");
            }
        }
        if let Err(e) = self.drain.await {
            error!(error = %e, "error drain task failed");
        }
        info!("sink stopped");
    }

    /// Stop the handlers and wait for in-flight flushes and the drain loop
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }
}
