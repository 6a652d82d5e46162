//! The physical node behind the registered entities

/// Identity every sensor and switch record points back to
///
/// Turned into the `device` block of a discovery record by
/// [`crate::ha::mapping::device_to_ha`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Device<'a> {
    /// Node id; prefixes every entity's `unique_id`
    pub id: &'a str,
    pub name: &'a str,
    pub manufacturer: Option<&'a str>,
    pub model: Option<&'a str>,
    /// Firmware version
    pub sw_version: Option<&'a str>,
}

impl<'a> Device<'a> {
    pub const fn new(id: &'a str, name: &'a str) -> Self {
        Self {
            id,
            name,
            manufacturer: None,
            model: None,
            sw_version: None,
        }
    }

    #[must_use]
    pub const fn with_manufacturer(self, manufacturer: &'a str) -> Self {
        Self {
            manufacturer: Some(manufacturer),
            ..self
        }
    }

    #[must_use]
    pub const fn with_model(self, model: &'a str) -> Self {
        Self {
            model: Some(model),
            ..self
        }
    }

    #[must_use]
    pub const fn with_sw_version(self, sw_version: &'a str) -> Self {
        Self {
            sw_version: Some(sw_version),
            ..self
        }
    }
}
