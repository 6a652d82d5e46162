//! Mapping between domain entities and Home Assistant wire types
//!
//! A discovery context owns every generated string a discovery payload
//! borrows, so payloads can be built without allocation.

use core::fmt::Write;

use alloc::vec::Vec;
use heapless::String;
use serde::Serialize;

use crate::device::Device;
use crate::entity::{SensorEntity, SwitchEntity};
use crate::error::HaError;
use crate::ha::discovery::{HaDeviceInfo, HaSensorDiscovery, HaSwitchDiscovery};
use crate::ha::topic;

const SENSOR_COMPONENT: &str = "sensor";
const SWITCH_COMPONENT: &str = "switch";

/// Serialize a wire payload into JSON bytes
pub fn to_payload<T: Serialize>(value: &T) -> Result<Vec<u8>, HaError> {
    Ok(serde_json::to_vec(value)?)
}

/// Convert a domain Device to [`HaDeviceInfo`]
pub fn device_to_ha<'a>(device: &'a Device<'a>, identifiers: &'a [&'a str]) -> HaDeviceInfo<'a> {
    HaDeviceInfo {
        name: device.name,
        identifiers,
        manufacturer: device.manufacturer,
        model: device.model,
        sw_version: device.sw_version,
    }
}

fn value_template<const N: usize>(key: &str, scale: Option<u32>) -> Result<String<N>, HaError> {
    let mut template = String::new();
    match scale {
        Some(scale) if scale > 1 => write!(template, "{{{{ value_json.{} / {} }}}}", key, scale)?,
        _ => write!(template, "{{{{ value_json.{} }}}}", key)?,
    }
    Ok(template)
}

fn identifier<const N: usize>(device_id: &str) -> Result<String<N>, HaError> {
    let mut identifier = String::new();
    identifier
        .push_str(device_id)
        .map_err(|()| HaError::TopicTooLong)?;
    Ok(identifier)
}

/// Context for building sensor discovery payload
pub struct SensorDiscoveryContext<const N: usize> {
    pub unique_id: String<N>,
    pub base_topic: String<N>,
    pub config_topic: String<N>,
    pub value_template: String<N>,
    pub identifier: String<N>,
}

impl<const N: usize> SensorDiscoveryContext<N> {
    /// Build context for a sensor entity
    pub fn new(namespace: &str, entity: &SensorEntity<'_>) -> Result<Self, HaError> {
        let device_id = entity.device.id;
        Ok(Self {
            unique_id: topic::unique_id(device_id, entity.id)?,
            base_topic: topic::base_topic(namespace, SENSOR_COMPONENT, device_id, entity.id)?,
            config_topic: topic::config_topic(namespace, SENSOR_COMPONENT, device_id, entity.id)?,
            value_template: value_template(entity.id, entity.scale)?,
            identifier: identifier(device_id)?,
        })
    }
}

/// Build [`HaSensorDiscovery`] from a [`SensorEntity`] and pre-built context
pub fn sensor_to_discovery<'a, 'b, const N: usize>(
    entity: &'a SensorEntity<'a>,
    ctx: &'b SensorDiscoveryContext<N>,
    identifier_slice: &'b [&'b str],
    state_topic: &'b str,
    availability_topic: Option<&'b str>,
) -> HaSensorDiscovery<'b>
where
    'a: 'b,
{
    HaSensorDiscovery {
        base_topic: ctx.base_topic.as_str(),
        name: entity.name,
        unique_id: ctx.unique_id.as_str(),
        object_id: ctx.unique_id.as_str(),
        state_topic,
        value_template: ctx.value_template.as_str(),
        device: device_to_ha(entity.device, identifier_slice),
        icon: entity.icon,
        device_class: entity.device_class,
        unit_of_measurement: entity.unit,
        availability_topic,
    }
}

/// Context for building switch discovery payload
pub struct SwitchDiscoveryContext<const N: usize> {
    pub unique_id: String<N>,
    pub base_topic: String<N>,
    pub config_topic: String<N>,
    pub value_template: String<N>,
    pub identifier: String<N>,
}

impl<const N: usize> SwitchDiscoveryContext<N> {
    /// Build context for a switch entity
    pub fn new(namespace: &str, entity: &SwitchEntity<'_>) -> Result<Self, HaError> {
        let device_id = entity.device.id;
        Ok(Self {
            unique_id: topic::unique_id(device_id, entity.id)?,
            base_topic: topic::base_topic(namespace, SWITCH_COMPONENT, device_id, entity.id)?,
            config_topic: topic::config_topic(namespace, SWITCH_COMPONENT, device_id, entity.id)?,
            value_template: value_template(entity.id, None)?,
            identifier: identifier(device_id)?,
        })
    }
}

/// Build [`HaSwitchDiscovery`] from a [`SwitchEntity`] and pre-built context
pub fn switch_to_discovery<'a, 'b, const N: usize>(
    entity: &'a SwitchEntity<'a>,
    ctx: &'b SwitchDiscoveryContext<N>,
    identifier_slice: &'b [&'b str],
    state_topic: &'b str,
    availability_topic: Option<&'b str>,
) -> HaSwitchDiscovery<'b>
where
    'a: 'b,
{
    HaSwitchDiscovery {
        base_topic: ctx.base_topic.as_str(),
        name: entity.name,
        unique_id: ctx.unique_id.as_str(),
        object_id: ctx.unique_id.as_str(),
        command_topic: "~/set",
        state_topic,
        value_template: ctx.value_template.as_str(),
        device: device_to_ha(entity.device, identifier_slice),
        icon: entity.icon,
        availability_topic,
    }
}
