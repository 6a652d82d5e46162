//! Home Assistant wire-format types
//!
//! This module contains structures that exactly match the JSON schema
//! expected by Home Assistant MQTT integration for discovery, state, and commands.

pub mod command;
pub mod discovery;
pub mod mapping;
pub mod state;
pub mod topic;

pub use command::SwitchCommand;
pub use discovery::{HaDeviceInfo, HaSensorDiscovery, HaSwitchDiscovery};
pub use mapping::{
    SensorDiscoveryContext, SwitchDiscoveryContext, sensor_to_discovery, switch_to_discovery,
    to_payload,
};
pub use state::{HaSwitchStates, switch_state};
pub use topic::{
    base_topic, command_filter, command_topic, config_topic, parse_command_topic, unique_id,
};
