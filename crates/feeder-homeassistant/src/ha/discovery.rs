//! Wire shapes of the retained `.../config` discovery records

use serde::Serialize;

/// `device` block shared by all records of one node
#[derive(Clone, Serialize)]
pub struct HaDeviceInfo<'a> {
    pub name: &'a str,
    pub identifiers: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sw_version: Option<&'a str>,
}

/// Record registering one telemetry channel as a `sensor`
#[derive(Serialize)]
pub struct HaSensorDiscovery<'a> {
    /// Base topic, expanded by Home Assistant wherever a topic starts with `~`
    #[serde(rename = "~")]
    pub base_topic: &'a str,
    /// Human-readable name
    pub name: &'a str,
    /// Unique identifier
    pub unique_id: &'a str,
    /// Entity id suggestion
    pub object_id: &'a str,
    /// Topic carrying the shared JSON state
    pub state_topic: &'a str,
    /// Template extracting this sensor from the state payload
    pub value_template: &'a str,
    /// Device information
    pub device: HaDeviceInfo<'a>,
    /// MDI icon (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'a str>,
    /// Device class (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_class: Option<&'a str>,
    /// Unit of measurement (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_of_measurement: Option<&'a str>,
    /// Availability topic (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_topic: Option<&'a str>,
}

/// Record registering one relay as a `switch`
#[derive(Serialize)]
pub struct HaSwitchDiscovery<'a> {
    /// Base topic, expanded by Home Assistant wherever a topic starts with `~`
    #[serde(rename = "~")]
    pub base_topic: &'a str,
    pub name: &'a str,
    pub unique_id: &'a str,
    pub object_id: &'a str,
    /// Topic for commands (always `~/set`)
    pub command_topic: &'a str,
    /// Topic carrying the shared output state
    pub state_topic: &'a str,
    /// Template extracting this switch from the state payload
    pub value_template: &'a str,
    pub device: HaDeviceInfo<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability_topic: Option<&'a str>,
}
