//! Tablesink - Metrics
//!
//! Named counters for the sink's stream handlers and error drain.
//!
//! # Overview
//!
//! This crate provides:
//! - The [`MetricsSink`] trait handlers increment named, labelled counters through
//! - [`Labels::day`], the `day=YYYY-MM-DD` label every sink counter carries
//! - [`CounterRegistry`], a lock-light in-memory sink with snapshots
//! - [`ChannelMetrics`], a sink that emits every change as a [`CountChange`] event
//! - [`MetricsReporter`], which logs registry snapshots on an interval
//!
//! # Counter Names
//!
//! | Name | Incremented by |
//! |------|----------------|
//! | `sink_<type>_received` | 1 per record accepted by a stream handler |
//! | `sink_<type>_flushed` | batch size after a successful flush |
//! | `sink_errors` | 1 per failed flush (handler and drain loop) |
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tablesink_metrics::{CounterRegistry, Labels, MetricsSink};
//!
//! let registry = Arc::new(CounterRegistry::new());
//! registry.inc_counter("sink_orders_received", &Labels::day());
//! registry.add_counter("sink_orders_flushed", 10, &Labels::day());
//! assert_eq!(registry.total("sink_orders_flushed"), 10);
//! ```

mod channel;
pub mod format;
mod labels;
mod registry;
mod reporter;

pub use channel::{ChannelMetrics, CountChange};
pub use format::{HumanFormatter, JsonFormatter, MetricsFormatter};
pub use labels::Labels;
pub use registry::{CounterRegistry, CounterSample};
pub use reporter::{MetricsReporter, spawn_reporter};

use std::sync::atomic::{AtomicU64, Ordering};

/// Destination for named counter increments
///
/// Implementations must tolerate concurrent calls from every stream handler
/// plus the error drain loop.
pub trait MetricsSink: Send + Sync {
    /// Add `value` to the counter `name` with the given labels
    fn add_counter(&self, name: &str, value: u64, labels: &Labels);

    /// Increment the counter `name` by one
    fn inc_counter(&self, name: &str, labels: &Labels) {
        self.add_counter(name, 1, labels);
    }
}

/// Sink that drops every increment
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn add_counter(&self, _name: &str, _value: u64, _labels: &Labels) {}
}

/// Atomic counter wrapper for convenient metric operations
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    /// Create a new counter initialized to 0
    #[inline]
    pub const fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    /// Increment the counter by `val` (relaxed ordering for performance)
    #[inline]
    pub fn add(&self, val: u64) {
        self.0.fetch_add(val, Ordering::Relaxed);
    }

    /// Increment the counter by 1
    #[inline]
    pub fn inc(&self) {
        self.add(1);
    }

    /// Get the current value (relaxed ordering)
    #[inline]
    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}
