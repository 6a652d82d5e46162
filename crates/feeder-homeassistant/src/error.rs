//! Error types for the Home Assistant discovery layer

use core::fmt;

/// Error type for Home Assistant operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaError {
    /// JSON serialization error
    Serialization,
    /// Generated topic or identifier does not fit its buffer
    TopicTooLong,
}

impl fmt::Display for HaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaError::Serialization => write!(f, "JSON serialization error"),
            HaError::TopicTooLong => write!(f, "Topic does not fit the buffer"),
        }
    }
}

impl From<serde_json::Error> for HaError {
    fn from(_: serde_json::Error) -> Self {
        HaError::Serialization
    }
}

impl From<core::fmt::Error> for HaError {
    fn from(_: core::fmt::Error) -> Self {
        HaError::TopicTooLong
    }
}
