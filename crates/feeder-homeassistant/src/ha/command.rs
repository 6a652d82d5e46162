//! Home Assistant command payloads
//!
//! Switch commands arrive as a bare state string rather than JSON.

/// Requested switch state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchCommand {
    On,
    Off,
}

impl SwitchCommand {
    /// Parse a switch payload
    ///
    /// Accepts `ON`/`OFF`, `1`/`0` and `true`/`false`, ignoring case and
    /// surrounding whitespace. Anything else yields `None`.
    pub fn parse(payload: &[u8]) -> Option<Self> {
        let text = core::str::from_utf8(payload).ok()?.trim();
        if text.eq_ignore_ascii_case("on") || text == "1" || text.eq_ignore_ascii_case("true") {
            Some(Self::On)
        } else if text.eq_ignore_ascii_case("off")
            || text == "0"
            || text.eq_ignore_ascii_case("false")
        {
            Some(Self::Off)
        } else {
            None
        }
    }

    /// Check if this is a turn on command
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

impl From<bool> for SwitchCommand {
    fn from(is_on: bool) -> Self {
        if is_on { Self::On } else { Self::Off }
    }
}
