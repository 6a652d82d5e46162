//! Interfaces to the collaborators the node depends on
//!
//! The firmware implements these against the radio, the MQTT client, GPIO and
//! the I2C sensors; tests implement them with scripted fakes.

use core::net::IpAddr;

use alloc::string::String;
use alloc::vec::Vec;
use embassy_time::Duration;

use crate::domain::SensorValue;
use crate::error::{
    BrokerError, FeedError, LinkError, MemoryError, OutputError, SensorReadError,
};

/// Network credentials
#[derive(Debug, Clone, Copy)]
pub struct LinkCredentials<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

/// Link-layer driver (e.g. a `WiFi` station)
#[allow(async_fn_in_trait)]
pub trait LinkDriver {
    /// Join the network, giving up after `timeout`
    async fn join(&mut self, credentials: &LinkCredentials<'_>, timeout: Duration)
    -> Result<(), LinkError>;

    /// Currently assigned address, `Err(LinkError::NoAddress)` while there is none
    async fn address(&mut self) -> Result<IpAddr, LinkError>;

    /// Whether the driver still considers the link up
    fn is_connected(&self) -> bool;
}

/// Delivery guarantee of a publish
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QoS {
    AtMostOnce,
    AtLeastOnce,
}

/// Message the broker publishes on the client's behalf when it disappears
#[derive(Debug, Clone, Copy)]
pub struct LastWill<'a> {
    pub topic: &'a str,
    pub payload: &'a [u8],
    pub retain: bool,
}

/// Parameters of a broker connection
#[derive(Debug, Clone, Copy)]
pub struct ConnectOptions<'a> {
    pub client_id: &'a str,
    pub username: Option<&'a str>,
    pub password: Option<&'a str>,
    pub keep_alive: Duration,
    pub last_will: Option<LastWill<'a>>,
}

/// A message received from the broker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Pub/sub broker client
#[allow(async_fn_in_trait)]
pub trait BrokerClient {
    /// Open the transport and perform the protocol handshake
    async fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), BrokerError>;

    async fn subscribe(&mut self, filter: &str) -> Result<(), BrokerError>;

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError>;

    /// Wait for the next inbound message
    async fn receive(&mut self) -> Result<InboundMessage, BrokerError>;

    /// Close the connection; never fails
    async fn disconnect(&mut self);
}

/// One sensor channel
pub trait SensorSource {
    /// Channel id the reading is reported under
    fn channel(&self) -> &str;

    fn sample(&mut self) -> Result<SensorValue, SensorReadError>;
}

/// Bank of relay-like binary outputs
pub trait OutputBank {
    fn output_count(&self) -> usize;

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), OutputError>;

    fn output(&self, index: usize) -> Option<bool>;
}

/// Persistent byte store (EEPROM)
pub trait MemoryStore {
    fn capacity(&self) -> usize;

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), MemoryError>;

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError>;
}

/// Real-time clock
pub trait Clock {
    /// Current time in Unix seconds
    fn now(&mut self) -> Result<i64, SensorReadError>;
}

/// Food dispenser
///
/// Implementations only queue the run; the motor is driven elsewhere.
pub trait Feeder {
    fn request_feed(&mut self, portions: u8) -> Result<(), FeedError>;
}
