//! Error types of the feeder node
//!
//! None of these errors is fatal: link errors are retried, session errors
//! end with the payload dropped, sensor errors mark a channel unavailable and
//! command errors skip a single command.

use core::fmt;

/// Link-layer failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// No network name configured
    MissingCredentials,
    /// The access point rejected or never answered the join
    JoinFailed,
    /// The join did not complete within its timeout
    Timeout,
    /// Joined, but no address has been assigned yet
    NoAddress,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::MissingCredentials => write!(f, "no network name configured"),
            LinkError::JoinFailed => write!(f, "join failed"),
            LinkError::Timeout => write!(f, "join timed out"),
            LinkError::NoAddress => write!(f, "no address assigned"),
        }
    }
}

/// Transport-level broker failure reported by a [`crate::ports::BrokerClient`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerError {
    /// Host name could not be resolved
    Resolve,
    /// TCP connection failed or was reset
    Transport,
    /// The broker refused the request
    Rejected,
    /// The connection is closed
    Closed,
    /// Packet did not fit the client buffers
    BufferTooSmall,
}

impl fmt::Display for BrokerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrokerError::Resolve => write!(f, "broker host not resolved"),
            BrokerError::Transport => write!(f, "transport error"),
            BrokerError::Rejected => write!(f, "rejected by broker"),
            BrokerError::Closed => write!(f, "connection closed"),
            BrokerError::BufferTooSmall => write!(f, "packet too large"),
        }
    }
}

/// Session failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The session is not in the ready state
    NotReady,
    /// Broker connect failed
    Connect(BrokerError),
    /// A subscription was refused
    Subscribe(BrokerError),
    /// A publish failed and was not retried
    Publish(BrokerError),
    /// A publish failed on both attempts and the payload was discarded
    Dropped(BrokerError),
    /// Receiving inbound traffic failed
    Receive(BrokerError),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::NotReady => write!(f, "session not ready"),
            SessionError::Connect(e) => write!(f, "connect failed: {}", e),
            SessionError::Subscribe(e) => write!(f, "subscribe failed: {}", e),
            SessionError::Publish(e) => write!(f, "publish failed: {}", e),
            SessionError::Dropped(e) => write!(f, "payload dropped: {}", e),
            SessionError::Receive(e) => write!(f, "receive failed: {}", e),
        }
    }
}

/// Failure reading one sensor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReadError {
    /// Bus transaction failed
    Bus,
    /// Sensor has no fresh measurement
    NotReady,
    /// The sensor reported an error status or an impossible value
    Invalid,
}

impl fmt::Display for SensorReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorReadError::Bus => write!(f, "bus error"),
            SensorReadError::NotReady => write!(f, "no measurement available"),
            SensorReadError::Invalid => write!(f, "invalid measurement"),
        }
    }
}

/// Inbound payload could not be decoded into commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandDecodeError {
    /// Payload is not JSON
    Malformed,
    /// Payload is JSON but neither a command nor a list of commands
    NotACommandList,
    /// Command has no method name
    MissingName,
    /// A parameter could not be decoded
    InvalidParam,
}

impl fmt::Display for CommandDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandDecodeError::Malformed => write!(f, "payload is not JSON"),
            CommandDecodeError::NotACommandList => write!(f, "payload is not a command list"),
            CommandDecodeError::MissingName => write!(f, "command has no name"),
            CommandDecodeError::InvalidParam => write!(f, "command has an undecodable parameter"),
        }
    }
}

/// A command parameter is missing or does not fit its expected type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandParamError {
    Missing(&'static str),
    Invalid(&'static str),
}

impl fmt::Display for CommandParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandParamError::Missing(id) => write!(f, "missing parameter '{}'", id),
            CommandParamError::Invalid(id) => write!(f, "invalid parameter '{}'", id),
        }
    }
}

/// Actuation failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputError {
    OutOfRange { index: usize, count: usize },
    Driver,
}

impl fmt::Display for OutputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputError::OutOfRange { index, count } => {
                write!(f, "output {} out of range (0..{})", index, count)
            }
            OutputError::Driver => write!(f, "output driver error"),
        }
    }
}

/// Persistent byte store failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    OutOfRange,
    Bus,
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::OutOfRange => write!(f, "memory access out of range"),
            MemoryError::Bus => write!(f, "memory bus error"),
        }
    }
}

/// Feeder motor request failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedError {
    /// A feeding run is already in progress
    Busy,
    /// Zero portions requested
    NothingToDo,
}

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Busy => write!(f, "feeder busy"),
            FeedError::NothingToDo => write!(f, "no portions requested"),
        }
    }
}
