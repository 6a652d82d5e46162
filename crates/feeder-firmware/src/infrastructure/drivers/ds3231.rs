//! DS3231 real-time clock

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use feeder_node::SensorValue;
use feeder_node::error::SensorReadError;
use feeder_node::ports::{Clock, SensorSource};
use log::{info, warn};

const ADDRESS: u8 = 0x68;

const REG_SECONDS: u8 = 0x00;
const REG_CONTROL: u8 = 0x0E;
const REG_STATUS: u8 = 0x0F;

/// Oscillator disabled while on battery
const CONTROL_EOSC: u8 = 1 << 7;
/// Oscillator stopped at some point, time is not valid
const STATUS_OSF: u8 = 1 << 7;
const MONTH_CENTURY: u8 = 1 << 7;

/// Time loaded into a clock that lost power: 2023-05-14 15:49:07 UTC
const FALLBACK_TIME: DateTime = DateTime {
    year: 2023,
    month: 5,
    day: 14,
    hour: 15,
    minute: 49,
    second: 7,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DateTime {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl DateTime {
    fn unix_seconds(self) -> i64 {
        let days = days_from_civil(i64::from(self.year), self.month, self.day);
        days * 86_400
            + i64::from(self.hour) * 3600
            + i64::from(self.minute) * 60
            + i64::from(self.second)
    }
}

/// Days since 1970-01-01 of a proleptic Gregorian date
fn days_from_civil(year: i64, month: u8, day: u8) -> i64 {
    let year = if month <= 2 { year - 1 } else { year };
    let era = year.div_euclid(400);
    let year_of_era = year - era * 400;
    let month = i64::from(month);
    let shifted_month = if month > 2 { month - 3 } else { month + 9 };
    let day_of_year = (153 * shifted_month + 2) / 5 + i64::from(day) - 1;
    let day_of_era = year_of_era * 365 + year_of_era / 4 - year_of_era / 100 + day_of_year;
    era * 146_097 + day_of_era - 719_468
}

fn from_bcd(value: u8) -> u8 {
    (value >> 4) * 10 + (value & 0x0F)
}

fn to_bcd(value: u8) -> u8 {
    ((value / 10) << 4) | (value % 10)
}

pub(crate) struct Ds3231<'a, I: I2c> {
    bus: &'a RefCell<I>,
}

impl<'a, I: I2c> Ds3231<'a, I> {
    pub(crate) fn new(bus: &'a RefCell<I>) -> Self {
        Self { bus }
    }

    /// Start the oscillator and load a fallback time if the clock lost power
    pub(crate) fn configure(&mut self) -> Result<(), SensorReadError> {
        let control = self.read_register(REG_CONTROL)?;
        if control & CONTROL_EOSC != 0 {
            self.write_register(REG_CONTROL, control & !CONTROL_EOSC)?;
            info!("rtc: oscillator enabled");
        }

        let status = self.read_register(REG_STATUS)?;
        if status & STATUS_OSF != 0 {
            warn!("rtc: time not valid, loading fallback");
            self.set_time(FALLBACK_TIME)?;
            self.write_register(REG_STATUS, status & !STATUS_OSF)?;
        }
        Ok(())
    }

    fn read_time(&mut self) -> Result<DateTime, SensorReadError> {
        let mut raw = [0u8; 7];
        self.bus
            .borrow_mut()
            .write_read(ADDRESS, &[REG_SECONDS], &mut raw)
            .map_err(|_| SensorReadError::Bus)?;

        let century = if raw[5] & MONTH_CENTURY != 0 { 100 } else { 0 };
        let time = DateTime {
            second: from_bcd(raw[0] & 0x7F),
            minute: from_bcd(raw[1] & 0x7F),
            hour: from_bcd(raw[2] & 0x3F),
            day: from_bcd(raw[4] & 0x3F),
            month: from_bcd(raw[5] & 0x1F),
            year: 2000 + century + u16::from(from_bcd(raw[6])),
        };
        if !(1..=12).contains(&time.month) || !(1..=31).contains(&time.day) {
            return Err(SensorReadError::Invalid);
        }
        Ok(time)
    }

    fn set_time(&mut self, time: DateTime) -> Result<(), SensorReadError> {
        let year = time.year.saturating_sub(2000);
        let century = if year >= 100 { MONTH_CENTURY } else { 0 };
        #[allow(clippy::cast_possible_truncation)]
        let frame = [
            REG_SECONDS,
            to_bcd(time.second),
            to_bcd(time.minute),
            to_bcd(time.hour),
            1,
            to_bcd(time.day),
            to_bcd(time.month) | century,
            to_bcd((year % 100) as u8),
        ];
        self.bus
            .borrow_mut()
            .write(ADDRESS, &frame)
            .map_err(|_| SensorReadError::Bus)
    }

    fn read_register(&mut self, register: u8) -> Result<u8, SensorReadError> {
        let mut value = [0u8; 1];
        self.bus
            .borrow_mut()
            .write_read(ADDRESS, &[register], &mut value)
            .map_err(|_| SensorReadError::Bus)?;
        Ok(value[0])
    }

    fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorReadError> {
        self.bus
            .borrow_mut()
            .write(ADDRESS, &[register, value])
            .map_err(|_| SensorReadError::Bus)
    }
}

impl<I: I2c> Clock for Ds3231<'_, I> {
    fn now(&mut self) -> Result<i64, SensorReadError> {
        self.read_time().map(DateTime::unix_seconds)
    }
}

/// The clock reported as the `rtc` channel
impl<I: I2c> SensorSource for Ds3231<'_, I> {
    fn channel(&self) -> &str {
        "rtc"
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        self.now().map(SensorValue::Timestamp)
    }
}
