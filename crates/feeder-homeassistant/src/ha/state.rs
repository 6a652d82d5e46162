//! Home Assistant state payload structures

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Wire representation of a switch state
pub const fn switch_state(is_on: bool) -> &'static str {
    if is_on { "ON" } else { "OFF" }
}

/// Shared state payload for a group of switches
///
/// Serializes as `{"relay1":"ON","relay2":"OFF",...}` in the given order.
#[derive(Debug, Clone, Copy)]
pub struct HaSwitchStates<'a, K: AsRef<str>>(pub &'a [(K, bool)]);

impl<K: AsRef<str>> Serialize for HaSwitchStates<'_, K> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, is_on) in self.0 {
            map.serialize_entry(key.as_ref(), switch_state(*is_on))?;
        }
        map.end()
    }
}
