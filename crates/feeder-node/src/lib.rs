//! Connectivity, discovery and command routing core of the feeder node
//!
//! The node samples its sensors on a fixed period, reports them over an MQTT
//! session, advertises its capabilities and executes remote commands. All
//! hardware and transport access goes through the traits in [`ports`], so the
//! whole lifecycle runs on the host against fakes as well as on the device.
//!
//! - [`link::LinkManager`] joins the network and waits for an address
//! - [`session::SessionManager`] owns the broker session and its state machine
//! - [`discovery::DiscoveryAdvertiser`] publishes the manifest or Home Assistant records
//! - [`telemetry::TelemetrySampler`] reads every sensor into a snapshot
//! - [`dispatch::CommandDispatcher`] decodes and executes inbound commands
//! - [`runtime::ControlLoop`] composes the above into the node's main task

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod discovery;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod link;
pub mod outputs;
pub mod ports;
pub mod runtime;
pub mod session;
pub mod telemetry;

pub use config::{NodeConfig, Topics};
pub use discovery::{DiscoveryAdvertiser, DiscoveryMode};
pub use dispatch::{CommandDispatcher, CommandProfile, DispatchOutcome, Peripherals};
pub use domain::{
    Command, DeviceManifest, MethodAction, MethodDescriptor, OutputDescriptor, OutputState,
    ParamValue, Reading, SensorValue, TelemetrySnapshot, ValueDescriptor,
};
pub use error::{
    BrokerError, CommandDecodeError, CommandParamError, FeedError, LinkError, MemoryError,
    OutputError, SensorReadError, SessionError,
};
pub use link::LinkManager;
pub use outputs::{OutputControl, SharedOutputs};
pub use runtime::ControlLoop;
pub use session::{SessionManager, SessionState};
pub use telemetry::TelemetrySampler;
