//! AT24C32 EEPROM
//!
//! Only the first [`MEMORY_WINDOW`] bytes are exposed. Writes are split at page
//! boundaries and each page is confirmed by acknowledge polling.

use core::cell::RefCell;

use embedded_hal::i2c::I2c;
use feeder_node::SensorValue;
use feeder_node::error::{MemoryError, SensorReadError};
use feeder_node::ports::{MemoryStore, SensorSource};

const ADDRESS: u8 = 0x50;
const PAGE_SIZE: usize = 32;
const MAX_WRITE_POLLS: usize = 100;

/// Bytes of EEPROM the node reads and writes
pub(crate) const MEMORY_WINDOW: usize = 48;

pub(crate) struct At24c<'a, I: I2c> {
    bus: &'a RefCell<I>,
}

impl<'a, I: I2c> At24c<'a, I> {
    pub(crate) fn new(bus: &'a RefCell<I>) -> Self {
        Self { bus }
    }

    fn check_range(offset: usize, len: usize) -> Result<(), MemoryError> {
        match offset.checked_add(len) {
            Some(end) if end <= MEMORY_WINDOW => Ok(()),
            _ => Err(MemoryError::OutOfRange),
        }
    }

    fn write_page(&mut self, offset: usize, chunk: &[u8]) -> Result<(), MemoryError> {
        let mut frame = [0u8; PAGE_SIZE + 2];
        #[allow(clippy::cast_possible_truncation)]
        let address = (offset as u16).to_be_bytes();
        frame[..2].copy_from_slice(&address);
        frame[2..2 + chunk.len()].copy_from_slice(chunk);

        let mut bus = self.bus.borrow_mut();
        bus.write(ADDRESS, &frame[..2 + chunk.len()])
            .map_err(|_| MemoryError::Bus)?;

        // the chip NAKs its address until the internal write cycle finishes
        for _ in 0..MAX_WRITE_POLLS {
            if bus.write(ADDRESS, &address).is_ok() {
                return Ok(());
            }
        }
        Err(MemoryError::Bus)
    }
}

impl<I: I2c> MemoryStore for At24c<'_, I> {
    fn capacity(&self) -> usize {
        MEMORY_WINDOW
    }

    fn read(&mut self, offset: usize, buffer: &mut [u8]) -> Result<(), MemoryError> {
        Self::check_range(offset, buffer.len())?;
        #[allow(clippy::cast_possible_truncation)]
        let address = (offset as u16).to_be_bytes();
        self.bus
            .borrow_mut()
            .write_read(ADDRESS, &address, buffer)
            .map_err(|_| MemoryError::Bus)
    }

    fn write(&mut self, offset: usize, data: &[u8]) -> Result<(), MemoryError> {
        Self::check_range(offset, data.len())?;
        let mut position = offset;
        let mut remaining = data;
        while !remaining.is_empty() {
            let room = PAGE_SIZE - position % PAGE_SIZE;
            let (chunk, rest) = remaining.split_at(room.min(remaining.len()));
            self.write_page(position, chunk)?;
            position += chunk.len();
            remaining = rest;
        }
        Ok(())
    }
}

/// The memory window reported as the `m` channel
impl<I: I2c> SensorSource for At24c<'_, I> {
    fn channel(&self) -> &str {
        "m"
    }

    fn sample(&mut self) -> Result<SensorValue, SensorReadError> {
        let mut dump = alloc::vec![0u8; MEMORY_WINDOW];
        self.read(0, &mut dump).map_err(|_| SensorReadError::Bus)?;
        Ok(SensorValue::Bytes(dump))
    }
}
