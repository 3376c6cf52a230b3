#![allow(dead_code)]
//! An in-memory recorder that keeps every counter under its full key, so
//! tests can check both totals and the `decoder`/`output` label splits.

use metrics::{
    Counter, CounterFn, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

type CounterTable = Arc<Mutex<HashMap<Key, u64>>>;

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: CounterTable,
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    /// Total of `name` summed over all label sets.
    pub fn get_counter(&self, name: &str) -> u64 {
        self.sum(|key| key.name() == name)
    }

    /// Value of `name` restricted to series carrying `label="value"`.
    pub fn get_labeled(&self, name: &str, label: &str, value: &str) -> u64 {
        self.sum(|key| {
            key.name() == name
                && key
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
    }

    /// Distinct values seen for `label` on `name`, sorted.
    pub fn label_values(&self, name: &str, label: &str) -> Vec<String> {
        let counters = self.counters.lock().unwrap();
        let mut values: Vec<String> = counters
            .keys()
            .filter(|key| key.name() == name)
            .flat_map(|key| {
                key.labels()
                    .filter(|l| l.key() == label)
                    .map(|l| l.value().to_string())
                    .collect::<Vec<_>>()
            })
            .collect();
        values.sort();
        values.dedup();
        values
    }

    fn sum(&self, matches: impl Fn(&Key) -> bool) -> u64 {
        self.counters
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, _)| matches(key))
            .map(|(_, count)| count)
            .sum()
    }
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(KeyedCounter {
            key: key.clone(),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, _key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::noop()
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[derive(Debug)]
struct KeyedCounter {
    key: Key,
    counters: CounterTable,
}

impl CounterFn for KeyedCounter {
    fn increment(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        *counters.entry(self.key.clone()).or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(self.key.clone()).or_insert(0);
        *count = (*count).max(value);
    }
}
