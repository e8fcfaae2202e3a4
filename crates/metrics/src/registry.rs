//! In-memory counter registry

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::{Counter, Labels, MetricsSink};

type CounterKey = (String, Labels);

/// Counters keyed by name and label set
///
/// Increments on an existing counter only take the read lock; the write
/// lock is held just long enough to insert a new counter.
#[derive(Debug, Default)]
pub struct CounterRegistry {
    counters: RwLock<HashMap<CounterKey, Arc<Counter>>>,
}

/// One counter's value at snapshot time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CounterSample {
    pub name: String,
    pub labels: Labels,
    pub value: u64,
}

impl CounterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, name: &str, labels: &Labels) -> Arc<Counter> {
        let key = (name.to_string(), labels.clone());
        if let Some(counter) = self.counters.read().get(&key) {
            return Arc::clone(counter);
        }
        Arc::clone(self.counters.write().entry(key).or_default())
    }

    /// Value of one counter with an exact label set
    pub fn get(&self, name: &str, labels: &Labels) -> u64 {
        let key = (name.to_string(), labels.clone());
        self.counters.read().get(&key).map_or(0, |c| c.get())
    }

    /// Sum of a counter across all label sets
    pub fn total(&self, name: &str) -> u64 {
        self.counters
            .read()
            .iter()
            .filter(|((n, _), _)| n == name)
            .map(|(_, c)| c.get())
            .sum()
    }

    /// All counters, sorted by name then labels
    pub fn snapshot(&self) -> Vec<CounterSample> {
        let mut samples: Vec<CounterSample> = self
            .counters
            .read()
            .iter()
            .map(|((name, labels), counter)| CounterSample {
                name: name.clone(),
                labels: labels.clone(),
                value: counter.get(),
            })
            .collect();
        samples.sort_by(|a, b| (&a.name, &a.labels).cmp(&(&b.name, &b.labels)));
        samples
    }
}

impl MetricsSink for CounterRegistry {
    fn add_counter(&self, name: &str, value: u64, labels: &Labels) {
        self.counter(name, labels).add(value);
    }
}
