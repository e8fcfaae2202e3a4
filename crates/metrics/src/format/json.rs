//! JSON metrics formatter
//!
//! # Example Output
//!
//! ```json
//! {"type":"counters","interval_secs":60,"counters":[{"name":"sink_errors","labels":{"day":"2021-10-30"},"value":1}]}
//! ```

use serde::Serialize;

use super::MetricsFormatter;
use crate::CounterSample;

/// JSON metrics formatter
#[derive(Debug, Clone, Default)]
pub struct JsonFormatter;

impl JsonFormatter {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Serialize)]
struct ReportJson<'a> {
    #[serde(rename = "type")]
    report_type: &'static str,
    interval_secs: u64,
    counters: &'a [CounterSample],
}

impl MetricsFormatter for JsonFormatter {
    fn format(&self, samples: &[CounterSample], interval_secs: u64) -> String {
        let report = ReportJson {
            report_type: "counters",
            interval_secs,
            counters: samples,
        };
        serde_json::to_string(&report).unwrap_or_else(|e| format!(r#"{{"error":"{e}"}}"#))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Labels;

    #[test]
    fn test_format_json() {
        let samples = vec![CounterSample {
            name: "sink_errors".into(),
            labels: Labels::new().with("day", "2021-10-30"),
            value: 1,
        }];
        let out = JsonFormatter::new().format(&samples, 60);
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["type"], "counters");
        assert_eq!(parsed["interval_secs"], 60);
        assert_eq!(parsed["counters"][0]["name"], "sink_errors");
        assert_eq!(parsed["counters"][0]["labels"]["day"], "2021-10-30");
        assert_eq!(parsed["counters"][0]["value"], 1);
    }
}
