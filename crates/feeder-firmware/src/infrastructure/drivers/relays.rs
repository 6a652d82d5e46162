use esp_hal::gpio::{AnyPin, Level, Output, OutputConfig};
use feeder_node::error::OutputError;
use feeder_node::ports::OutputBank;

pub(crate) const RELAY_COUNT: usize = 4;

/// Relay board driven by plain GPIO outputs, active high
pub(crate) struct RelayBank {
    relays: [Output<'static>; RELAY_COUNT],
}

impl RelayBank {
    /// Configure the pins as outputs with every relay off
    pub(crate) fn new(pins: [AnyPin<'static>; RELAY_COUNT]) -> Self {
        Self {
            relays: pins.map(|pin| Output::new(pin, Level::Low, OutputConfig::default())),
        }
    }
}

impl OutputBank for RelayBank {
    fn output_count(&self) -> usize {
        RELAY_COUNT
    }

    fn set_output(&mut self, index: usize, on: bool) -> Result<(), OutputError> {
        let relay = self.relays.get_mut(index).ok_or(OutputError::OutOfRange {
            index,
            count: RELAY_COUNT,
        })?;
        relay.set_level(Level::from(on));
        Ok(())
    }

    fn output(&self, index: usize) -> Option<bool> {
        self.relays.get(index).map(Output::is_set_high)
    }
}
