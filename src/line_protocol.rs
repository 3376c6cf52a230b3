//! Rendering of metric points as InfluxDB line protocol.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Resolution of the integer timestamp closing every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl Precision {
    /// Converts an instant into an epoch value at this precision.
    pub fn epoch<Tz: TimeZone>(self, instant: &DateTime<Tz>) -> i64 {
        match self {
            Precision::Seconds => instant.timestamp(),
            Precision::Milliseconds => instant.timestamp_millis(),
            Precision::Microseconds => instant.timestamp_micros(),
            Precision::Nanoseconds => instant
                .timestamp_nanos_opt()
                .unwrap_or_else(|| instant.timestamp_micros().saturating_mul(1_000)),
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Precision::Seconds => "seconds",
            Precision::Milliseconds => "milliseconds",
            Precision::Microseconds => "microseconds",
            Precision::Nanoseconds => "nanoseconds",
        };
        f.write_str(name)
    }
}

/// A single observation: measurement, tag set, float fields and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Point<'a> {
    measurement: &'a str,
    tags: Vec<(&'a str, &'a str)>,
    fields: Vec<(&'a str, f64)>,
    timestamp: i64,
}

impl<'a> Point<'a> {
    pub fn new(measurement: &'a str, timestamp: i64) -> Self {
        Self {
            measurement,
            tags: Vec::new(),
            fields: Vec::new(),
            timestamp,
        }
    }

    pub fn tag(mut self, key: &'a str, value: &'a str) -> Self {
        self.tags.push((key, value));
        self
    }

    pub fn field(mut self, key: &'a str, value: f64) -> Self {
        self.fields.push((key, value));
        self
    }

    /// Renders the point as `measurement,tags fields timestamp`.
    ///
    /// Tags and fields keep insertion order. Field values are written as
    /// plain decimal floats.
    pub fn render(&self) -> String {
        let mut line = String::with_capacity(128);
        escape_into(&mut line, self.measurement, &[',', ' ']);
        for (key, value) in &self.tags {
            line.push(',');
            escape_into(&mut line, key, &[',', '=', ' ']);
            line.push('=');
            escape_into(&mut line, value, &[',', '=', ' ']);
        }
        for (i, (key, value)) in self.fields.iter().enumerate() {
            line.push(if i == 0 { ' ' } else { ',' });
            escape_into(&mut line, key, &[',', '=', ' ']);
            // Writing into a String cannot fail.
            let _ = write!(line, "={}", value);
        }
        let _ = write!(line, " {}", self.timestamp);
        line
    }
}

fn escape_into(out: &mut String, raw: &str, special: &[char]) {
    for c in raw.chars() {
        if c == '\\' || special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
}
