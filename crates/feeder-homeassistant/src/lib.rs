//! Home Assistant MQTT discovery for the feeder node
//!
//! This crate provides the wire types used to register a node with Home
//! Assistant through MQTT discovery. It is structured in two layers:
//!
//! - **Domain layer** (`device`, `entity`): platform-independent descriptions of
//!   the device and its sensor and switch entities
//! - **HA wire layer** (`ha`): JSON-serializable types matching Home Assistant's
//!   MQTT schema, topic builders and switch payload parsing
//!
//! # Example
//!
//! ```
//! use feeder_homeassistant::{Device, SwitchEntity, ha};
//!
//! const DEVICE: Device = Device::new("rabbitf3", "Rabbit Feeder");
//! const RELAY: SwitchEntity = SwitchEntity::new("relay1", "Relay 1 (USB)", &DEVICE)
//!     .with_icon("mdi:usb-port");
//!
//! let ctx = ha::SwitchDiscoveryContext::<128>::new("homeassistant", &RELAY).unwrap();
//! assert_eq!(ctx.config_topic.as_str(), "homeassistant/switch/rabbitf3_relay1/config");
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod device;
pub mod entity;
pub mod error;
pub mod ha;

pub use device::Device;
pub use entity::{SensorEntity, SwitchEntity};
pub use error::HaError;
pub use ha::{
    HaDeviceInfo, HaSensorDiscovery, HaSwitchDiscovery, HaSwitchStates, SwitchCommand,
};
