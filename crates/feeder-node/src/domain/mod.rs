//! Domain model of the node
//!
//! Everything here is plain data with its JSON wire form; none of it performs I/O.

pub mod command;
pub mod manifest;
pub mod output;
pub mod telemetry;

pub use command::{Command, ParamValue, decode_batch};
pub use manifest::{
    DeviceManifest, ManifestSummary, MethodAction, MethodDescriptor, ParamDescriptor,
    PeerAnnouncement, ValueDescriptor, ValueRecord, standard_methods,
};
pub use output::{OutputDescriptor, OutputState, output_key, parse_output_key};
pub use telemetry::{Reading, SensorValue, TelemetrySnapshot};
