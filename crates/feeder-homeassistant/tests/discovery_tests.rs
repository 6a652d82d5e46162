//! Integration tests for discovery payload generation.

use feeder_homeassistant::ha::{
    self, HaSwitchStates, SensorDiscoveryContext, SwitchDiscoveryContext,
};
use feeder_homeassistant::{Device, SensorEntity, SwitchEntity};
use serde_json::Value;

const DEVICE: Device = Device::new("rabbitf3", "Rabbit Feeder Supreme")
    .with_manufacturer("@conejo@social.tinygo.org")
    .with_model("Rabbit Feeder Supreme F3")
    .with_sw_version("v1.0.0");

fn parse(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).expect("payload is valid JSON")
}

// -----------------------------------------------------------------------------
// Sensors
// -----------------------------------------------------------------------------

#[test]
fn sensor_record_carries_base_topic_and_scaled_template() {
    let entity = SensorEntity::new("t", "Temperature", &DEVICE)
        .with_unit("ºC")
        .with_device_class("temperature")
        .with_scale(1000);
    let ctx: SensorDiscoveryContext<128> =
        SensorDiscoveryContext::new("homeassistant", &entity).unwrap();
    let identifiers = [ctx.identifier.as_str()];
    let record = ha::sensor_to_discovery(&entity, &ctx, &identifiers, "rabbitf3", None);
    let json = parse(&ha::to_payload(&record).unwrap());

    assert_eq!(ctx.config_topic.as_str(), "homeassistant/sensor/rabbitf3_t/config");
    assert_eq!(json["~"], "homeassistant/sensor/rabbitf3_t");
    assert_eq!(json["unique_id"], "rabbitf3_t");
    assert_eq!(json["state_topic"], "rabbitf3");
    assert_eq!(json["value_template"], "{{ value_json.t / 1000 }}");
    assert_eq!(json["unit_of_measurement"], "ºC");
    assert_eq!(json["device"]["identifiers"][0], "rabbitf3");
    assert_eq!(json["device"]["model"], "Rabbit Feeder Supreme F3");
}

#[test]
fn optional_sensor_fields_are_omitted() {
    let entity = SensorEntity::new("cr", "Distance", &DEVICE);
    let ctx: SensorDiscoveryContext<128> =
        SensorDiscoveryContext::new("homeassistant", &entity).unwrap();
    let identifiers = [ctx.identifier.as_str()];
    let record = ha::sensor_to_discovery(&entity, &ctx, &identifiers, "rabbitf3", None);
    let json = parse(&ha::to_payload(&record).unwrap());

    assert_eq!(json["value_template"], "{{ value_json.cr }}");
    let object = json.as_object().unwrap();
    assert!(!object.contains_key("icon"));
    assert!(!object.contains_key("unit_of_measurement"));
    assert!(!object.contains_key("availability_topic"));
}

// -----------------------------------------------------------------------------
// Switches
// -----------------------------------------------------------------------------

#[test]
fn switch_record_commands_through_base_topic() {
    let entity = SwitchEntity::new("relay3", "Relay 3 (12V)", &DEVICE)
        .with_icon("mdi:audio-input-stereo-minijack");
    let ctx: SwitchDiscoveryContext<128> =
        SwitchDiscoveryContext::new("homeassistant", &entity).unwrap();
    let identifiers = [ctx.identifier.as_str()];
    let record = ha::switch_to_discovery(
        &entity,
        &ctx,
        &identifiers,
        "rabbitf3/outputs",
        Some("rabbitf3/availability"),
    );
    let json = parse(&ha::to_payload(&record).unwrap());

    assert_eq!(json["~"], "homeassistant/switch/rabbitf3_relay3");
    assert_eq!(json["command_topic"], "~/set");
    assert_eq!(json["state_topic"], "rabbitf3/outputs");
    assert_eq!(json["value_template"], "{{ value_json.relay3 }}");
    assert_eq!(json["icon"], "mdi:audio-input-stereo-minijack");
    assert_eq!(json["availability_topic"], "rabbitf3/availability");
}

#[test]
fn switch_states_serialize_in_order() {
    let states = [("relay1", false), ("relay2", true), ("relay3", false)];
    let bytes = ha::to_payload(&HaSwitchStates(&states)).unwrap();

    assert_eq!(
        core::str::from_utf8(&bytes).unwrap(),
        r#"{"relay1":"OFF","relay2":"ON","relay3":"OFF"}"#
    );
}
