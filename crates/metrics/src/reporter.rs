//! Periodic counter reporter
//!
//! Logs a snapshot of a [`CounterRegistry`] at the configured interval until
//! cancelled.

use std::sync::Arc;

use tablesink_config::{MetricsConfig, MetricsFormat};
use tokio::time::{Duration, interval};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{CounterRegistry, HumanFormatter, JsonFormatter, MetricsFormatter};

/// Reports registry snapshots at a fixed interval
pub struct MetricsReporter {
    registry: Arc<CounterRegistry>,
    formatter: Box<dyn MetricsFormatter>,
    interval: Duration,
}

impl MetricsReporter {
    pub fn new(registry: Arc<CounterRegistry>, format: MetricsFormat, interval: Duration) -> Self {
        let formatter: Box<dyn MetricsFormatter> = match format {
            MetricsFormat::Human => Box::new(HumanFormatter::new()),
            MetricsFormat::Json => Box::new(JsonFormatter::new()),
        };

        Self {
            registry,
            formatter,
            interval,
        }
    }

    /// Run the reporter until cancellation, emitting one last report on exit
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            interval_secs = self.interval.as_secs(),
            "metrics reporter started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    info!("{}", self.render());
                }
            }
        }

        info!("{}", self.render());
    }

    /// Format the current snapshot
    pub fn render(&self) -> String {
        self.formatter
            .format(&self.registry.snapshot(), self.interval.as_secs())
    }
}

/// Spawn a reporter for `registry` if reporting is enabled
pub fn spawn_reporter(
    registry: Arc<CounterRegistry>,
    config: &MetricsConfig,
    cancel: CancellationToken,
) -> Option<tokio::task::JoinHandle<()>> {
    if !config.enabled {
        return None;
    }
    let reporter = MetricsReporter::new(registry, config.format, config.interval);
    Some(tokio::spawn(reporter.run(cancel)))
}
