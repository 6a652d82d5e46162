mod at24c;
mod bme280;
mod ds3231;
mod relays;
mod vl6180x;
mod wifi;

use feeder_node::SensorValue;
use feeder_node::error::SensorReadError;
use feeder_node::ports::SensorSource;

pub(crate) use at24c::At24c;
pub(crate) use bme280::{Bme280, ClimateSource, Quantity};
pub(crate) use ds3231::Ds3231;
pub(crate) use relays::RelayBank;
pub(crate) use vl6180x::{FillLevelSource, RangeSource, Vl6180x};
pub(crate) use wifi::{WifiLink, init_network_stack, resolve_host};

/// Channel of a sensor that did not answer at boot
pub(crate) struct Unfitted(pub &'static str);

impl SensorSource for Unfitted {
    fn channel(&self) -> &str {
        self.0
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        Err(SensorReadError::NotReady)
    }
}
