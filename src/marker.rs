//! Timestamp markers (`ZZZZ` lines) and the zone their wall-clock time is read in.
//!
//! nmon starts every snapshot with a marker line such as
//! `ZZZZ,T0004,15:50:44,02-FEB-2023`. The code (`T0004`) is repeated as the
//! first field of every metric line in that snapshot, which is how data lines
//! are correlated with their wall-clock time.

use crate::config::ConfigError;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkerError {
    #[error("malformed marker: {0:?}")]
    Malformed(String),

    #[error("invalid marker date/time {input:?}: {source}")]
    InvalidDateTime {
        input: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("wall-clock time {0} does not exist in the configured zone")]
    NonexistentLocalTime(NaiveDateTime),
}

/// A snapshot code paired with the instant the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Marker {
    pub code: String,
    pub instant: DateTime<FixedOffset>,
}

impl Marker {
    pub fn new(code: impl Into<String>, instant: DateTime<FixedOffset>) -> Self {
        Self {
            code: code.into(),
            instant,
        }
    }

    /// Parses the marker fields following the marker prefix:
    /// `<code>,<HH:MM:SS>,<DD-MON-YYYY>`.
    pub fn parse(fields: &str, zone: Zone) -> Result<Self, MarkerError> {
        let mut parts = fields.splitn(3, ',');
        let (code, time, date) = match (parts.next(), parts.next(), parts.next()) {
            (Some(code), Some(time), Some(date)) if !code.is_empty() => (code, time, date),
            _ => return Err(MarkerError::Malformed(fields.to_string())),
        };
        let naive = parse_wall_clock(time.trim(), date.trim())?;
        Ok(Self::new(code, zone.resolve(naive)?))
    }
}

/// Parses nmon's `HH:MM:SS` and `DD-MON-YYYY` pair. Month names are
/// upper-case in nmon output (`FEB`) and are normalized to `Feb` first.
fn parse_wall_clock(time: &str, date: &str) -> Result<NaiveDateTime, MarkerError> {
    let mut parts = date.splitn(3, '-');
    let (day, month, year) = match (parts.next(), parts.next(), parts.next()) {
        (Some(day), Some(month), Some(year)) => (day, month, year),
        _ => return Err(MarkerError::Malformed(date.to_string())),
    };
    let input = format!("{} {}-{}-{}", time, day, capitalize(month), year);
    NaiveDateTime::parse_from_str(&input, "%H:%M:%S %d-%b-%Y")
        .map_err(|source| MarkerError::InvalidDateTime { input, source })
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// The zone marker wall-clock times are interpreted in.
///
/// nmon writes host-local time without an offset, so `Local` is the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum Zone {
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl Zone {
    pub fn utc() -> Self {
        Zone::Fixed(Utc.fix())
    }

    /// Attaches this zone to a wall-clock time. Ambiguous local times (a DST
    /// fold) resolve to the earlier instant.
    pub fn resolve(self, naive: NaiveDateTime) -> Result<DateTime<FixedOffset>, MarkerError> {
        match self {
            Zone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&dt.offset().fix()))
                .ok_or(MarkerError::NonexistentLocalTime(naive)),
            Zone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .ok_or(MarkerError::NonexistentLocalTime(naive)),
        }
    }
}

impl FromStr for Zone {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "local" | "Local" => Ok(Zone::Local),
            "utc" | "UTC" | "Z" => Ok(Zone::utc()),
            other => other
                .parse::<FixedOffset>()
                .map(Zone::Fixed)
                .map_err(|_| ConfigError::InvalidZone(other.to_string())),
        }
    }
}

impl TryFrom<String> for Zone {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Zone> for String {
    fn from(zone: Zone) -> Self {
        zone.to_string()
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zone::Local => f.write_str("local"),
            Zone::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}
