use feeder_node::domain::standard_methods;
use feeder_node::{DeviceManifest, OutputDescriptor, ValueDescriptor};

use crate::config::{DEVICE, FIRMWARE_VERSION};

/// Everything this feeder reports and accepts
pub(crate) fn device_manifest() -> DeviceManifest {
    DeviceManifest::new(DEVICE.id, DEVICE.name, FIRMWARE_VERSION)
        .with_manufacturer(DEVICE.manufacturer)
        .with_model(DEVICE.model)
        .with_value(
            ValueDescriptor::new("c", "Food level")
                .with_unit("%")
                .with_icon("mdi:bowl"),
        )
        .with_value(
            ValueDescriptor::new("cr", "Distance")
                .with_unit("mm")
                .with_device_class("distance"),
        )
        .with_value(ValueDescriptor::new("m", "Memory").with_icon("mdi:memory"))
        .with_value(
            ValueDescriptor::new("t", "Temperature")
                .with_unit("°C")
                .with_device_class("temperature")
                .with_scale(1000),
        )
        .with_value(
            ValueDescriptor::new("p", "Pressure")
                .with_unit("Pa")
                .with_device_class("pressure")
                .with_scale(1000),
        )
        .with_value(
            ValueDescriptor::new("h", "Humidity")
                .with_unit("%")
                .with_device_class("humidity")
                .with_scale(100),
        )
        .with_value(ValueDescriptor::new("rtc", "Clock").with_icon("mdi:clock-outline"))
        .with_output(OutputDescriptor::new(0, "Relay 1 (USB)").with_icon("mdi:usb-port"))
        .with_output(OutputDescriptor::new(1, "Relay 2 (USB)").with_icon("mdi:usb-port"))
        .with_output(OutputDescriptor::new(2, "Relay 3 (12V)"))
        .with_output(OutputDescriptor::new(3, "Relay 4 (12V)"))
        .with_methods(standard_methods())
}
