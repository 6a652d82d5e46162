//! BME280 temperature, pressure and humidity sensor
//!
//! Runs in normal mode with x1 oversampling. Compensation uses the integer
//! formulas from the Bosch datasheet; readings are reported as milli-degrees
//! Celsius, milli-pascals and hundredths of a percent.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use feeder_node::SensorValue;
use feeder_node::error::SensorReadError;
use feeder_node::ports::SensorSource;

const ADDRESS: u8 = 0x76;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_TP: u8 = 0x88;
const REG_CALIB_H1: u8 = 0xA1;
const REG_CALIB_H2: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

const CHIP_ID: u8 = 0x60;

#[derive(Debug, Clone, Copy, Default)]
struct Calibration {
    t1: u16,
    t2: i16,
    t3: i16,
    p1: u16,
    p2: i16,
    p3: i16,
    p4: i16,
    p5: i16,
    p6: i16,
    p7: i16,
    p8: i16,
    p9: i16,
    h1: u8,
    h2: i16,
    h3: u8,
    h4: i16,
    h5: i16,
    h6: i8,
}

impl Calibration {
    #[allow(clippy::cast_possible_wrap)]
    fn parse(tp: &[u8; 24], h1: u8, h: &[u8; 7]) -> Self {
        let unsigned = |i: usize| u16::from_le_bytes([tp[i], tp[i + 1]]);
        let signed = |i: usize| i16::from_le_bytes([tp[i], tp[i + 1]]);
        Self {
            t1: unsigned(0),
            t2: signed(2),
            t3: signed(4),
            p1: unsigned(6),
            p2: signed(8),
            p3: signed(10),
            p4: signed(12),
            p5: signed(14),
            p6: signed(16),
            p7: signed(18),
            p8: signed(20),
            p9: signed(22),
            h1,
            h2: i16::from_le_bytes([h[0], h[1]]),
            h3: h[2],
            h4: (i16::from(h[3] as i8) << 4) | i16::from(h[4] & 0x0F),
            h5: (i16::from(h[5] as i8) << 4) | i16::from(h[4] >> 4),
            h6: h[6] as i8,
        }
    }
}

/// One compensated measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Measurement {
    pub temperature_milli_c: i32,
    pub pressure_milli_pa: i64,
    pub humidity_centi_pct: i32,
}

fn compensate(calib: &Calibration, adc_t: i32, adc_p: i32, adc_h: i32) -> Measurement {
    let t1 = i32::from(calib.t1);
    let var1 = (((adc_t >> 3) - (t1 << 1)) * i32::from(calib.t2)) >> 11;
    let var2 = (((((adc_t >> 4) - t1) * ((adc_t >> 4) - t1)) >> 12) * i32::from(calib.t3)) >> 14;
    let t_fine = var1 + var2;
    let temperature_centi = (t_fine * 5 + 128) >> 8;

    let mut var1 = i64::from(t_fine) - 128_000;
    let mut var2 = var1 * var1 * i64::from(calib.p6);
    var2 += (var1 * i64::from(calib.p5)) << 17;
    var2 += i64::from(calib.p4) << 35;
    var1 = ((var1 * var1 * i64::from(calib.p3)) >> 8) + ((var1 * i64::from(calib.p2)) << 12);
    var1 = (((1_i64 << 47) + var1) * i64::from(calib.p1)) >> 33;
    let pressure_q24_8 = if var1 == 0 {
        0
    } else {
        let mut p = 1_048_576 - i64::from(adc_p);
        p = (((p << 31) - var2) * 3125) / var1;
        let var1 = (i64::from(calib.p9) * (p >> 13) * (p >> 13)) >> 25;
        let var2 = (i64::from(calib.p8) * p) >> 19;
        ((p + var1 + var2) >> 8) + (i64::from(calib.p7) << 4)
    };

    let mut v = t_fine - 76_800;
    v = ((((adc_h << 14) - (i32::from(calib.h4) << 20) - (i32::from(calib.h5) * v)) + 16_384)
        >> 15)
        * (((((((v * i32::from(calib.h6)) >> 10)
            * (((v * i32::from(calib.h3)) >> 11) + 32_768))
            >> 10)
            + 2_097_152)
            * i32::from(calib.h2)
            + 8192)
            >> 14);
    v -= ((((v >> 15) * (v >> 15)) >> 7) * i32::from(calib.h1)) >> 4;
    let humidity_q22_10 = v.clamp(0, 419_430_400) >> 12;

    Measurement {
        temperature_milli_c: temperature_centi * 10,
        pressure_milli_pa: pressure_q24_8 * 1000 / 256,
        humidity_centi_pct: humidity_q22_10 * 100 / 1024,
    }
}

pub(crate) struct Bme280<'a, I: I2c> {
    bus: &'a RefCell<I>,
    calibration: Calibration,
}

impl<I: I2c> Clone for Bme280<'_, I> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<I: I2c> Copy for Bme280<'_, I> {}

impl<'a, I: I2c> Bme280<'a, I> {
    /// Probe the sensor, read its calibration and start normal mode
    pub(crate) fn new(bus: &'a RefCell<I>) -> Result<Self, SensorReadError> {
        let mut sensor = Self {
            bus,
            calibration: Calibration::default(),
        };
        let mut id = [0u8; 1];
        sensor.read(REG_CHIP_ID, &mut id)?;
        if id[0] != CHIP_ID {
            return Err(SensorReadError::NotReady);
        }

        let mut tp = [0u8; 24];
        let mut h1 = [0u8; 1];
        let mut h = [0u8; 7];
        sensor.read(REG_CALIB_TP, &mut tp)?;
        sensor.read(REG_CALIB_H1, &mut h1)?;
        sensor.read(REG_CALIB_H2, &mut h)?;
        sensor.calibration = Calibration::parse(&tp, h1[0], &h);

        // humidity x1, then temperature x1 + pressure x1 + normal mode
        sensor.write(REG_CTRL_HUM, 0x01)?;
        sensor.write(REG_CTRL_MEAS, 0x27)?;
        sensor.write(REG_CONFIG, 0xA0)?;
        Ok(sensor)
    }

    pub(crate) fn measure(&self) -> Result<Measurement, SensorReadError> {
        let mut raw = [0u8; 8];
        self.read(REG_DATA, &mut raw)?;
        let adc_p = (i32::from(raw[0]) << 12) | (i32::from(raw[1]) << 4) | (i32::from(raw[2]) >> 4);
        let adc_t = (i32::from(raw[3]) << 12) | (i32::from(raw[4]) << 4) | (i32::from(raw[5]) >> 4);
        let adc_h = (i32::from(raw[6]) << 8) | i32::from(raw[7]);
        // 0x80000 is what the chip reports before its first conversion
        if adc_t == 0x8_0000 {
            return Err(SensorReadError::NotReady);
        }
        Ok(compensate(&self.calibration, adc_t, adc_p, adc_h))
    }

    fn read(&self, register: u8, buffer: &mut [u8]) -> Result<(), SensorReadError> {
        self.bus
            .borrow_mut()
            .write_read(ADDRESS, &[register], buffer)
            .map_err(|_| SensorReadError::Bus)
    }

    fn write(&self, register: u8, value: u8) -> Result<(), SensorReadError> {
        self.bus
            .borrow_mut()
            .write(ADDRESS, &[register, value])
            .map_err(|_| SensorReadError::Bus)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Quantity {
    Temperature,
    Pressure,
    Humidity,
}

impl Quantity {
    fn channel(self) -> &'static str {
        match self {
            Quantity::Temperature => "t",
            Quantity::Pressure => "p",
            Quantity::Humidity => "h",
        }
    }
}

/// One quantity of the BME280 as a telemetry channel
pub(crate) struct ClimateSource<'a, I: I2c> {
    sensor: Bme280<'a, I>,
    quantity: Quantity,
}

impl<'a, I: I2c> ClimateSource<'a, I> {
    pub(crate) fn new(sensor: Bme280<'a, I>, quantity: Quantity) -> Self {
        Self { sensor, quantity }
    }
}

impl<I: I2c> SensorSource for ClimateSource<'_, I> {
    fn channel(&self) -> &str {
        self.quantity.channel()
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        let measurement = self.sensor.measure()?;
        let value = match self.quantity {
            Quantity::Temperature => i64::from(measurement.temperature_milli_c),
            Quantity::Pressure => measurement.pressure_milli_pa,
            Quantity::Humidity => i64::from(measurement.humidity_centi_pct),
        };
        Ok(SensorValue::Numeric(value))
    }
}
