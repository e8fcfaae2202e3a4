//! Change-event metrics sink
//!
//! Emits one [`CountChange`] per increment so callers (and tests) can observe
//! exactly which counters moved and by how much.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::{Labels, MetricsSink};

/// A single counter increment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountChange {
    pub name: String,
    pub increment: u64,
    pub labels: Labels,
}

/// Metrics sink that publishes every increment on an unbounded channel
///
/// Sending never blocks; if the receiver is gone the event is dropped.
/// An optional inner sink receives the same increments.
pub struct ChannelMetrics {
    sender: mpsc::UnboundedSender<CountChange>,
    inner: Option<Arc<dyn MetricsSink>>,
}

impl ChannelMetrics {
    /// Create a sink and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CountChange>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            Self {
                sender,
                inner: None,
            },
            receiver,
        )
    }

    /// Also forward every increment to `inner`
    pub fn with_inner(mut self, inner: Arc<dyn MetricsSink>) -> Self {
        self.inner = Some(inner);
        self
    }
}

impl MetricsSink for ChannelMetrics {
    fn add_counter(&self, name: &str, value: u64, labels: &Labels) {
        if let Some(inner) = &self.inner {
            inner.add_counter(name, value, labels);
        }
        let _ = self.sender.send(CountChange {
            name: name.to_string(),
            increment: value,
            labels: labels.clone(),
        });
    }
}

impl std::fmt::Debug for ChannelMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelMetrics")
            .field("closed", &self.sender.is_closed())
            .field("has_inner", &self.inner.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CounterRegistry;

    #[tokio::test]
    async fn test_emits_changes_in_order() {
        let (metrics, mut rx) = ChannelMetrics::new();
        metrics.inc_counter("sink_t_received", &Labels::new());
        metrics.add_counter("sink_t_flushed", 3, &Labels::new());

        let first = rx.recv().await.unwrap();
        assert_eq!(first.name, "sink_t_received");
        assert_eq!(first.increment, 1);

        let second = rx.recv().await.unwrap();
        assert_eq!(second.name, "sink_t_flushed");
        assert_eq!(second.increment, 3);
    }

    #[test]
    fn test_forwards_to_inner() {
        let registry = Arc::new(CounterRegistry::new());
        let (metrics, _rx) = ChannelMetrics::new();
        let metrics = metrics.with_inner(registry.clone());

        metrics.add_counter("sink_errors", 2, &Labels::new());
        assert_eq!(registry.total("sink_errors"), 2);
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (metrics, rx) = ChannelMetrics::new();
        drop(rx);
        metrics.inc_counter("sink_errors", &Labels::new());
    }
}
