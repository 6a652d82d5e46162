//! VL6180X time-of-flight distance sensor
//!
//! Measures the distance to the food surface in the hopper. Two channels are
//! derived from one sensor: the raw distance (`cr`) and the fill level in
//! percent (`c`).

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use feeder_node::SensorValue;
use feeder_node::error::SensorReadError;
use feeder_node::ports::SensorSource;
use log::debug;

const ADDRESS: u8 = 0x29;

const REG_MODEL_ID: u16 = 0x000;
const REG_FRESH_OUT_OF_RESET: u16 = 0x016;
const REG_SYSRANGE_START: u16 = 0x018;
const REG_INTERRUPT_CLEAR: u16 = 0x015;
const REG_RESULT_RANGE_STATUS: u16 = 0x04D;
const REG_RESULT_INTERRUPT_STATUS: u16 = 0x04F;
const REG_RESULT_RANGE_VAL: u16 = 0x062;

const MODEL_ID: u8 = 0xB4;
const RANGE_READY: u8 = 0x04;
const MAX_POLLS: usize = 1000;

/// Mandatory private settings from the ST application note, then the
/// recommended public defaults
const SETTINGS: &[(u16, u8)] = &[
    (0x0207, 0x01),
    (0x0208, 0x01),
    (0x0096, 0x00),
    (0x0097, 0xFD),
    (0x00E3, 0x00),
    (0x00E4, 0x04),
    (0x00E5, 0x02),
    (0x00E6, 0x01),
    (0x00E7, 0x03),
    (0x00F5, 0x02),
    (0x00D9, 0x05),
    (0x00DB, 0xCE),
    (0x00DC, 0x03),
    (0x00DD, 0xF8),
    (0x009F, 0x00),
    (0x00A3, 0x3C),
    (0x00B7, 0x00),
    (0x00BB, 0x3C),
    (0x00B2, 0x09),
    (0x00CA, 0x09),
    (0x0198, 0x01),
    (0x01B0, 0x17),
    (0x01AD, 0x00),
    (0x00FF, 0x05),
    (0x0100, 0x05),
    (0x0199, 0x05),
    (0x01A6, 0x1B),
    (0x01AC, 0x3E),
    (0x01A7, 0x1F),
    (0x0030, 0x00),
    // public defaults
    (0x0011, 0x10),
    (0x010A, 0x30),
    (0x003F, 0x46),
    (0x0031, 0xFF),
    (0x0041, 0x63),
    (0x002E, 0x01),
    (0x001B, 0x09),
    (0x003E, 0x31),
    (0x0014, 0x24),
];

pub(crate) struct Vl6180x<'a, I: I2c> {
    bus: &'a RefCell<I>,
}

impl<I: I2c> Clone for Vl6180x<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: I2c> Copy for Vl6180x<'_, I> {}

impl<'a, I: I2c> Vl6180x<'a, I> {
    /// Probe the sensor and load its settings after a reset
    pub(crate) fn new(bus: &'a RefCell<I>) -> Result<Self, SensorReadError> {
        let sensor = Self { bus };
        if sensor.read_register(REG_MODEL_ID)? != MODEL_ID {
            return Err(SensorReadError::NotReady);
        }
        if sensor.read_register(REG_FRESH_OUT_OF_RESET)? == 1 {
            for &(register, value) in SETTINGS {
                sensor.write_register(register, value)?;
            }
            sensor.write_register(REG_FRESH_OUT_OF_RESET, 0)?;
        }
        Ok(sensor)
    }

    /// Single-shot range measurement in millimetres
    pub(crate) fn range_mm(&self) -> Result<u8, SensorReadError> {
        self.write_register(REG_SYSRANGE_START, 0x01)?;

        let mut ready = false;
        for _ in 0..MAX_POLLS {
            if self.read_register(REG_RESULT_INTERRUPT_STATUS)? & 0x07 == RANGE_READY {
                ready = true;
                break;
            }
        }
        if !ready {
            return Err(SensorReadError::NotReady);
        }

        let range = self.read_register(REG_RESULT_RANGE_VAL)?;
        let status = self.read_register(REG_RESULT_RANGE_STATUS)? >> 4;
        self.write_register(REG_INTERRUPT_CLEAR, 0x07)?;
        if status != 0 {
            debug!("distance: range error code {}", status);
            return Err(SensorReadError::Invalid);
        }
        Ok(range)
    }

    fn read_register(&self, register: u16) -> Result<u8, SensorReadError> {
        let mut value = [0u8; 1];
        self.bus
            .borrow_mut()
            .write_read(ADDRESS, &register.to_be_bytes(), &mut value)
            .map_err(|_| SensorReadError::Bus)?;
        Ok(value[0])
    }

    fn write_register(&self, register: u16, value: u8) -> Result<(), SensorReadError> {
        let [high, low] = register.to_be_bytes();
        self.bus
            .borrow_mut()
            .write(ADDRESS, &[high, low, value])
            .map_err(|_| SensorReadError::Bus)
    }
}

/// Raw distance channel
pub(crate) struct RangeSource<'a, I: I2c> {
    sensor: Vl6180x<'a, I>,
}

impl<'a, I: I2c> RangeSource<'a, I> {
    pub(crate) fn new(sensor: Vl6180x<'a, I>) -> Self {
        Self { sensor }
    }
}

impl<I: I2c> SensorSource for RangeSource<'_, I> {
    fn channel(&self) -> &str {
        "cr"
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        self.sensor
            .range_mm()
            .map(|range| SensorValue::Numeric(i64::from(range)))
    }
}

/// Hopper fill level derived from the distance to the food surface
pub(crate) struct FillLevelSource<'a, I: I2c> {
    sensor: Vl6180x<'a, I>,
    full_mm: u16,
    empty_mm: u16,
}

impl<'a, I: I2c> FillLevelSource<'a, I> {
    pub(crate) fn new(sensor: Vl6180x<'a, I>, full_mm: u16, empty_mm: u16) -> Self {
        Self {
            sensor,
            full_mm,
            empty_mm,
        }
    }
}

/// Percent full, clamped to 0..=100
fn fill_percent(range_mm: u16, full_mm: u16, empty_mm: u16) -> i64 {
    if empty_mm <= full_mm {
        return 0;
    }
    let range = range_mm.clamp(full_mm, empty_mm);
    i64::from(empty_mm - range) * 100 / i64::from(empty_mm - full_mm)
}

impl<I: I2c> SensorSource for FillLevelSource<'_, I> {
    fn channel(&self) -> &str {
        "c"
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        let range = self.sensor.range_mm()?;
        Ok(SensorValue::Numeric(fill_percent(
            u16::from(range),
            self.full_mm,
            self.empty_mm,
        )))
    }
}
