use alloc::string::String;
use alloc::vec::Vec;

use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single sensor measurement in its native unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Numeric(i64),
    Bytes(Vec<u8>),
    /// Seconds since the Unix epoch
    Timestamp(i64),
}

impl Serialize for SensorValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SensorValue::Numeric(value) | SensorValue::Timestamp(value) => {
                serializer.serialize_i64(*value)
            }
            SensorValue::Bytes(bytes) => bytes.serialize(serializer),
        }
    }
}

/// Outcome of sampling one channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reading {
    Available(SensorValue),
    Unavailable,
}

impl Reading {
    pub fn is_available(&self) -> bool {
        matches!(self, Reading::Available(_))
    }

    pub fn value(&self) -> Option<&SensorValue> {
        match self {
            Reading::Available(value) => Some(value),
            Reading::Unavailable => None,
        }
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Reading::Available(value) => value.serialize(serializer),
            Reading::Unavailable => serializer.serialize_none(),
        }
    }
}

/// One sampling pass over every configured channel
///
/// Serializes as a JSON object keyed by channel id in sampling order, with
/// `null` for channels that could not be read.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    entries: Vec<(String, Reading)>,
}

impl TelemetrySnapshot {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, channel: String, reading: Reading) {
        self.entries.push((channel, reading));
    }

    pub fn get(&self, channel: &str) -> Option<&Reading> {
        self.entries
            .iter()
            .find(|(id, _)| id == channel)
            .map(|(_, reading)| reading)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Reading)> {
        self.entries.iter().map(|(id, reading)| (id.as_str(), reading))
    }

    pub fn unavailable_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| !r.is_available()).count()
    }
}

impl Serialize for TelemetrySnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (channel, reading) in &self.entries {
            map.serialize_entry(channel, reading)?;
        }
        map.end()
    }
}
