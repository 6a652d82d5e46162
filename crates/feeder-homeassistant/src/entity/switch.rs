//! Switch entity for Home Assistant MQTT integration

use crate::device::Device;

/// Switch entity configuration for Home Assistant discovery
///
/// The switch state is read from the `id` key of the node's output state
/// payload, and commands arrive on the entity's own `set` topic.
#[derive(Debug, Clone)]
pub struct SwitchEntity<'a> {
    /// Entity identifier suffix (e.g., "relay1")
    pub id: &'a str,
    /// Human-readable name
    pub name: &'a str,
    /// Reference to parent device
    pub device: &'a Device<'a>,
    /// MDI icon (e.g., "mdi:usb-port")
    pub icon: Option<&'a str>,
}

impl<'a> SwitchEntity<'a> {
    /// Create a new switch entity
    pub const fn new(id: &'a str, name: &'a str, device: &'a Device<'a>) -> Self {
        Self {
            id,
            name,
            device,
            icon: None,
        }
    }

    /// Set icon
    #[must_use]
    pub const fn with_icon(mut self, icon: &'a str) -> Self {
        self.icon = Some(icon);
        self
    }
}
