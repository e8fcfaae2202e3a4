//! Metrics output formatters
//!
//! Formats counter snapshots for human-readable or JSON output.

mod human;
mod json;

pub use human::HumanFormatter;
pub use json::JsonFormatter;

use crate::CounterSample;

/// Trait for metrics formatters
pub trait MetricsFormatter: Send + Sync {
    /// Format one report covering every counter in `samples`
    fn format(&self, samples: &[CounterSample], interval_secs: u64) -> String;
}

/// Format large counts compactly (1.2K, 3.4M)
pub fn format_count(count: u64) -> String {
    if count >= 1_000_000_000 {
        format!("{:.1}B", count as f64 / 1_000_000_000.0)
    } else if count >= 1_000_000 {
        format!("{:.1}M", count as f64 / 1_000_000.0)
    } else if count >= 10_000 {
        format!("{:.1}K", count as f64 / 1_000.0)
    } else {
        count.to_string()
    }
}
