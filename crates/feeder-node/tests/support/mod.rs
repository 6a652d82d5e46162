//! Scripted fakes for every port, shared by the integration tests.
//!
//! Fakes record what they see into a shared [`Log`] so tests can assert on the
//! exact order of joins, delays and publishes.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::net::{IpAddr, Ipv4Addr};
use std::rc::Rc;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use feeder_node::config::{BrokerConfig, LinkConfig};
use feeder_node::domain::{
    DeviceManifest, MethodAction, MethodDescriptor, OutputDescriptor, ValueDescriptor,
    standard_methods,
};
use feeder_node::error::{
    BrokerError, FeedError, LinkError, MemoryError, OutputError, SensorReadError,
};
use feeder_node::ports::{
    BrokerClient, Clock, ConnectOptions, Feeder, InboundMessage, LinkCredentials, LinkDriver,
    MemoryStore, OutputBank, QoS, SensorSource,
};
use feeder_node::{NodeConfig, SensorValue};

pub const DEVICE_ID: &str = "rabbitf3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Join,
    Delay(u32),
    Connect { client_id: String, will: Option<String> },
    Subscribe(String),
    Publish { topic: String, payload: Vec<u8>, retain: bool },
    Disconnect,
}

pub type Log = Rc<RefCell<Vec<Event>>>;

pub fn new_log() -> Log {
    Rc::new(RefCell::new(Vec::new()))
}

pub fn publishes(log: &Log) -> Vec<(String, String)> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Publish { topic, payload, .. } => Some((
                topic.clone(),
                String::from_utf8_lossy(payload).into_owned(),
            )),
            _ => None,
        })
        .collect()
}

pub fn publishes_to(log: &Log, topic: &str) -> Vec<String> {
    publishes(log)
        .into_iter()
        .filter(|(t, _)| t == topic)
        .map(|(_, payload)| payload)
        .collect()
}

pub fn delays(log: &Log) -> Vec<u32> {
    log.borrow()
        .iter()
        .filter_map(|event| match event {
            Event::Delay(ms) => Some(*ms),
            _ => None,
        })
        .collect()
}

// -----------------------------------------------------------------------------
// Delay
// -----------------------------------------------------------------------------

/// Records every delay and completes after yielding `yields` times
#[derive(Clone)]
pub struct FakeDelay {
    log: Log,
    yields: usize,
}

impl FakeDelay {
    pub fn new(log: &Log) -> Self {
        Self {
            log: log.clone(),
            yields: 0,
        }
    }

    /// Stay pending for a few polls so concurrent futures get a chance to run
    pub fn yielding(log: &Log, yields: usize) -> Self {
        Self {
            log: log.clone(),
            yields,
        }
    }

    async fn pause(&mut self, ms: u32) {
        self.log.borrow_mut().push(Event::Delay(ms));
        for _ in 0..self.yields {
            embassy_futures::yield_now().await;
        }
    }
}

impl DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.pause(ns / 1_000_000).await;
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.pause(ms).await;
    }
}

// -----------------------------------------------------------------------------
// Link
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct LinkScript {
    pub joins: VecDeque<Result<(), LinkError>>,
    pub addresses: VecDeque<Result<IpAddr, LinkError>>,
    pub joined: usize,
    pub up: bool,
}

#[derive(Clone)]
pub struct FakeLink {
    pub script: Rc<RefCell<LinkScript>>,
    log: Log,
}

impl FakeLink {
    pub fn new(log: &Log) -> Self {
        Self {
            script: Rc::new(RefCell::new(LinkScript::default())),
            log: log.clone(),
        }
    }
}

pub fn address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(192, 168, 1, 40))
}

impl LinkDriver for FakeLink {
    async fn join(
        &mut self,
        _credentials: &LinkCredentials<'_>,
        _timeout: Duration,
    ) -> Result<(), LinkError> {
        self.log.borrow_mut().push(Event::Join);
        let mut script = self.script.borrow_mut();
        script.joined += 1;
        let result = script.joins.pop_front().unwrap_or(Ok(()));
        script.up = result.is_ok();
        result
    }

    async fn address(&mut self) -> Result<IpAddr, LinkError> {
        self.script
            .borrow_mut()
            .addresses
            .pop_front()
            .unwrap_or(Ok(address()))
    }

    fn is_connected(&self) -> bool {
        self.script.borrow().up
    }
}

// -----------------------------------------------------------------------------
// Broker
// -----------------------------------------------------------------------------

#[derive(Default)]
pub struct BrokerScript {
    pub connects: VecDeque<Result<(), BrokerError>>,
    pub subscribes: VecDeque<Result<(), BrokerError>>,
    pub publishes: VecDeque<Result<(), BrokerError>>,
    pub inbound: VecDeque<Result<InboundMessage, BrokerError>>,
}

#[derive(Clone)]
pub struct FakeBroker {
    pub script: Rc<RefCell<BrokerScript>>,
    log: Log,
}

impl FakeBroker {
    pub fn new(log: &Log) -> Self {
        Self {
            script: Rc::new(RefCell::new(BrokerScript::default())),
            log: log.clone(),
        }
    }

    pub fn fail_publishes(&self, count: usize) {
        let mut script = self.script.borrow_mut();
        for _ in 0..count {
            script.publishes.push_back(Err(BrokerError::Transport));
        }
    }

    pub fn deliver(&self, topic: &str, payload: &str) {
        self.script
            .borrow_mut()
            .inbound
            .push_back(Ok(InboundMessage::new(topic, payload.as_bytes())));
    }
}

impl BrokerClient for FakeBroker {
    async fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), BrokerError> {
        self.log.borrow_mut().push(Event::Connect {
            client_id: options.client_id.to_string(),
            will: options.last_will.map(|will| will.topic.to_string()),
        });
        self.script.borrow_mut().connects.pop_front().unwrap_or(Ok(()))
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), BrokerError> {
        self.log
            .borrow_mut()
            .push(Event::Subscribe(filter.to_string()));
        self.script.borrow_mut().subscribes.pop_front().unwrap_or(Ok(()))
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError> {
        assert_eq!(qos, QoS::AtMostOnce);
        let result = self.script.borrow_mut().publishes.pop_front().unwrap_or(Ok(()));
        if result.is_ok() {
            self.log.borrow_mut().push(Event::Publish {
                topic: topic.to_string(),
                payload: payload.to_vec(),
                retain,
            });
        }
        result
    }

    async fn receive(&mut self) -> Result<InboundMessage, BrokerError> {
        let next = self.script.borrow_mut().inbound.pop_front();
        match next {
            Some(result) => result,
            None => core::future::pending().await,
        }
    }

    async fn disconnect(&mut self) {
        self.log.borrow_mut().push(Event::Disconnect);
    }
}

// -----------------------------------------------------------------------------
// Sensors and actuators
// -----------------------------------------------------------------------------

pub struct FixedSensor {
    pub channel: &'static str,
    pub value: SensorValue,
}

impl FixedSensor {
    pub fn numeric(channel: &'static str, value: i64) -> Self {
        Self {
            channel,
            value: SensorValue::Numeric(value),
        }
    }
}

impl SensorSource for FixedSensor {
    fn channel(&self) -> &str {
        self.channel
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        Ok(self.value.clone())
    }
}

pub struct FailingSensor(pub &'static str);

impl SensorSource for FailingSensor {
    fn channel(&self) -> &str {
        self.0
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        Err(SensorReadError::Bus)
    }
}

pub struct RelayBank(pub Vec<bool>);

impl OutputBank for RelayBank {
    fn output_count(&self) -> usize {
        self.0.len()
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), OutputError> {
        self.0[index] = on;
        Ok(())
    }

    fn output(&self, index: usize) -> Option<bool> {
        self.0.get(index).copied()
    }
}

pub struct FakeMemory(pub Rc<RefCell<Vec<u8>>>);

impl MemoryStore for FakeMemory {
    fn capacity(&self) -> usize {
        self.0.borrow().len()
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), MemoryError> {
        let bytes = self.0.borrow();
        let source = bytes
            .get(offset..offset + buffer.len())
            .ok_or(MemoryError::OutOfRange)?;
        buffer.copy_from_slice(source);
        Ok(())
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        let mut bytes = self.0.borrow_mut();
        let target = bytes
            .get_mut(offset..offset + data.len())
            .ok_or(MemoryError::OutOfRange)?;
        target.copy_from_slice(data);
        Ok(())
    }
}

pub struct FakeClock(pub i64);

impl Clock for FakeClock {
    fn now(&mut self) -> Result<i64, SensorReadError> {
        Ok(self.0)
    }
}

pub struct FakeFeeder(pub Rc<RefCell<Vec<u8>>>);

impl Feeder for FakeFeeder {
    fn request_feed(&mut self, portions: u8) -> Result<(), FeedError> {
        if portions == 0 {
            return Err(FeedError::NothingToDo);
        }
        self.0.borrow_mut().push(portions);
        Ok(())
    }
}

// -----------------------------------------------------------------------------
// Configuration
// -----------------------------------------------------------------------------

pub fn node_config() -> NodeConfig {
    NodeConfig::new(
        DEVICE_ID,
        LinkConfig::new("burrow", "carrots"),
        BrokerConfig::new("broker.local", 1883),
    )
}

pub fn manifest() -> DeviceManifest {
    DeviceManifest::new(DEVICE_ID, "Rabbit Feeder Supreme", "v1.0.0")
        .with_manufacturer("@conejo@social.tinygo.org")
        .with_model("Rabbit Feeder Supreme F3")
        .with_value(ValueDescriptor::new("cr", "Distance").with_unit("mm"))
        .with_value(
            ValueDescriptor::new("t", "Temperature")
                .with_unit("ºC")
                .with_scale(1000),
        )
        .with_value(ValueDescriptor::new("p", "Pressure").with_unit("Pa"))
        .with_output(OutputDescriptor::new(0, "Relay 1 (USB)").with_icon("mdi:usb-port"))
        .with_output(OutputDescriptor::new(1, "Relay 2 (USB)").with_icon("mdi:usb-port"))
        .with_output(OutputDescriptor::new(2, "Relay 3 (12V)"))
        .with_output(OutputDescriptor::new(3, "Relay 4 (12V)"))
        .with_methods(standard_methods())
        .with_method(MethodDescriptor::named(
            "gm",
            MethodAction::GetMemory,
            "Get EEPROM memory",
        ))
}
