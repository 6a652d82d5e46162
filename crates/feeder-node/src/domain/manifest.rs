//! Capability manifest
//!
//! The manifest is built once at startup and never changes afterwards. Its
//! full JSON form lists the node's values, outputs and methods; the short
//! form carries only the id and name.

use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use super::output::OutputDescriptor;
use super::telemetry::SensorValue;

/// Built-in behaviour a method name is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodAction {
    /// Re-announce the full manifest
    Info,
    /// Publish the persistent byte store
    GetMemory,
    /// Write bytes into the persistent store
    SetMemory,
    /// Publish the real-time clock
    GetClock,
    /// Switch one output
    Relay,
    /// Start a feeding run
    Feed,
}

impl MethodAction {
    /// Default wire name of the action
    pub const fn name(self) -> &'static str {
        match self {
            MethodAction::Info => "info",
            MethodAction::GetMemory => "get-memory",
            MethodAction::SetMemory => "set-memory",
            MethodAction::GetClock => "get-clock",
            MethodAction::Relay => "relay",
            MethodAction::Feed => "feed",
        }
    }

    /// Whether executing the action changes the published output state
    pub const fn changes_outputs(self) -> bool {
        matches!(self, MethodAction::Relay)
    }
}

/// Description of one method parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamDescriptor {
    pub id: String,
    pub name: String,
}

impl ParamDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// A remotely invokable method
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDescriptor {
    pub name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<ParamDescriptor>,
    #[serde(skip)]
    pub action: MethodAction,
}

impl MethodDescriptor {
    /// Method advertised under the action's default name
    pub fn new(action: MethodAction, description: impl Into<String>) -> Self {
        Self::named(action.name(), action, description)
    }

    /// Method advertised under a custom wire name
    pub fn named(
        name: impl Into<String>,
        action: MethodAction,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            params: Vec::new(),
            action,
        }
    }

    #[must_use]
    pub fn with_param(mut self, id: impl Into<String>, name: impl Into<String>) -> Self {
        self.params.push(ParamDescriptor::new(id, name));
        self
    }
}

/// The method table every feeder understands
pub fn standard_methods() -> Vec<MethodDescriptor> {
    vec![
        MethodDescriptor::new(MethodAction::Info, "Announce the full device manifest"),
        MethodDescriptor::new(MethodAction::GetMemory, "Get EEPROM memory"),
        MethodDescriptor::new(MethodAction::SetMemory, "Set EEPROM memory")
            .with_param("p", "Position")
            .with_param("v", "Value"),
        MethodDescriptor::new(MethodAction::GetClock, "Get RTC time"),
        MethodDescriptor::new(MethodAction::Relay, "Switch a relay")
            .with_param("r", "Relay")
            .with_param("s", "State"),
        MethodDescriptor::new(MethodAction::Feed, "Dispense food").with_param("n", "Portions"),
    ]
}

/// A value the node reports
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueDescriptor {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    /// Last time the value was seen, in Unix seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<SensorValue>,
    #[serde(skip)]
    pub icon: Option<String>,
    #[serde(skip)]
    pub device_class: Option<String>,
    /// Divisor applied when displaying the raw value
    #[serde(skip)]
    pub scale: Option<u32>,
}

impl ValueDescriptor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit: String::new(),
            time: None,
            value: None,
            icon: None,
            device_class: None,
            scale: None,
        }
    }

    #[must_use]
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    #[must_use]
    pub fn with_device_class(mut self, device_class: impl Into<String>) -> Self {
        self.device_class = Some(device_class.into());
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}

/// A single `{id, value}` record, used for method replies
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueRecord {
    pub id: String,
    pub value: SensorValue,
}

/// Self-description of the node
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceManifest {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "out", skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<ValueDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<OutputDescriptor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub methods: Vec<MethodDescriptor>,
    #[serde(skip)]
    pub manufacturer: Option<String>,
    #[serde(skip)]
    pub model: Option<String>,
}

impl DeviceManifest {
    pub fn new(id: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            version: version.into(),
            values: Vec::new(),
            outputs: Vec::new(),
            methods: Vec::new(),
            manufacturer: None,
            model: None,
        }
    }

    #[must_use]
    pub fn with_manufacturer(mut self, manufacturer: impl Into<String>) -> Self {
        self.manufacturer = Some(manufacturer.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_value(mut self, value: ValueDescriptor) -> Self {
        self.values.push(value);
        self
    }

    #[must_use]
    pub fn with_output(mut self, output: OutputDescriptor) -> Self {
        self.outputs.push(output);
        self
    }

    #[must_use]
    pub fn with_method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    #[must_use]
    pub fn with_methods(mut self, methods: impl IntoIterator<Item = MethodDescriptor>) -> Self {
        self.methods.extend(methods);
        self
    }

    /// Look a method up by its wire name
    pub fn resolve(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.iter().find(|method| method.name == name)
    }

    /// Short form of the manifest
    pub fn summary(&self) -> ManifestSummary<'_> {
        ManifestSummary {
            id: &self.id,
            name: &self.name,
        }
    }
}

/// Short manifest form: `{"id": ..., "name": ...}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ManifestSummary<'a> {
    pub id: &'a str,
    pub name: &'a str,
}

/// Announcement received from another node on the discovery channel
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PeerAnnouncement {
    pub id: String,
    #[serde(default)]
    pub name: String,
}
