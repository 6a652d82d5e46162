//! Sensor entity for Home Assistant MQTT integration
//!
//! A sensor reads one field out of the node's shared JSON state payload.

use crate::device::Device;

/// Read-only sensor entity configuration for Home Assistant discovery
#[derive(Debug, Clone)]
pub struct SensorEntity<'a> {
    /// Entity identifier suffix, also the key inside the state payload
    pub id: &'a str,
    /// Human-readable name
    pub name: &'a str,
    /// Reference to parent device
    pub device: &'a Device<'a>,
    /// MDI icon (e.g., "mdi:thermometer")
    pub icon: Option<&'a str>,
    /// Device class (e.g., "temperature", "timestamp")
    pub device_class: Option<&'a str>,
    /// Unit of measurement (e.g., "°C", "%")
    pub unit: Option<&'a str>,
    /// Divisor applied by the value template before display
    pub scale: Option<u32>,
}

impl<'a> SensorEntity<'a> {
    /// Create a new sensor entity
    pub const fn new(id: &'a str, name: &'a str, device: &'a Device<'a>) -> Self {
        Self {
            id,
            name,
            device,
            icon: None,
            device_class: None,
            unit: None,
            scale: None,
        }
    }

    /// Set icon
    #[must_use]
    pub const fn with_icon(mut self, icon: &'a str) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Set device class
    #[must_use]
    pub const fn with_device_class(mut self, device_class: &'a str) -> Self {
        self.device_class = Some(device_class);
        self
    }

    /// Set unit of measurement
    #[must_use]
    pub const fn with_unit(mut self, unit: &'a str) -> Self {
        self.unit = Some(unit);
        self
    }

    /// Divide the raw value by `scale` when displaying it
    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }
}
