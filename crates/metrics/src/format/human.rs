//! Human-readable metrics formatter
//!
//! # Example Output
//!
//! ```text
//! [metrics] sink_errors{day=2021-10-30}=1 | sink_orders_flushed{day=2021-10-30}=12.3K
//! ```

use std::fmt::Write;

use super::{MetricsFormatter, format_count};
use crate::CounterSample;

/// Human-readable metrics formatter
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter;

impl HumanFormatter {
    pub fn new() -> Self {
        Self
    }
}

impl MetricsFormatter for HumanFormatter {
    fn format(&self, samples: &[CounterSample], _interval_secs: u64) -> String {
        if samples.is_empty() {
            return "[metrics] no counters yet".to_string();
        }

        let mut output = String::from("[metrics]");
        for (i, sample) in samples.iter().enumerate() {
            if i > 0 {
                output.push_str(" |");
            }
            let _ = write!(output, " {}", sample.name);
            if !sample.labels.is_empty() {
                let _ = write!(output, "{}", sample.labels);
            }
            let _ = write!(output, "={}", format_count(sample.value));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Labels;

    #[test]
    fn test_format_samples() {
        let samples = vec![
            CounterSample {
                name: "sink_errors".into(),
                labels: Labels::new().with("day", "2021-10-30"),
                value: 1,
            },
            CounterSample {
                name: "sink_orders_flushed".into(),
                labels: Labels::new(),
                value: 12_345,
            },
        ];
        let out = HumanFormatter::new().format(&samples, 60);
        assert_eq!(
            out,
            "[metrics] sink_errors{day=2021-10-30}=1 | sink_orders_flushed=12.3K"
        );
    }

    #[test]
    fn test_format_empty() {
        assert!(HumanFormatter::new().format(&[], 60).contains("no counters"));
    }
}
