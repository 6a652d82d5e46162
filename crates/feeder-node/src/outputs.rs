//! Mutex-guarded access to the output bank
//!
//! The control loop projects the bank while the dispatcher switches it, and
//! firmware tasks may hold it too, so every access goes through one lock.

use core::cell::RefCell;

use alloc::vec::Vec;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::RawMutex;

use crate::domain::OutputState;
use crate::error::OutputError;
use crate::ports::OutputBank;

/// Interface through which the node observes and drives its outputs
pub trait OutputControl {
    fn output_count(&self) -> usize;

    fn set(&self, index: usize, on: bool) -> Result<(), OutputError>;

    fn get(&self, index: usize) -> Option<bool>;

    /// Consistent projection of every output
    fn snapshot(&self) -> OutputState;
}

/// Output bank shared behind an `embassy-sync` mutex
pub struct SharedOutputs<M: RawMutex, B: OutputBank> {
    bank: Mutex<M, RefCell<B>>,
}

impl<M: RawMutex, B: OutputBank> SharedOutputs<M, B> {
    pub const fn new(bank: B) -> Self {
        Self {
            bank: Mutex::new(RefCell::new(bank)),
        }
    }

    /// Run `f` with exclusive access to the bank
    pub fn with_bank<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        self.bank.lock(|bank| f(&mut bank.borrow_mut()))
    }
}

impl<M: RawMutex, B: OutputBank> OutputControl for SharedOutputs<M, B> {
    fn output_count(&self) -> usize {
        self.bank.lock(|bank| bank.borrow().output_count())
    }

    fn set(&self, index: usize, on: bool) -> Result<(), OutputError> {
        self.with_bank(|bank| {
            let count = bank.output_count();
            if index >= count {
                return Err(OutputError::OutOfRange { index, count });
            }
            bank.set_output(index, on)
        })
    }

    fn get(&self, index: usize) -> Option<bool> {
        self.bank.lock(|bank| bank.borrow().output(index))
    }

    fn snapshot(&self) -> OutputState {
        self.bank.lock(|bank| {
            let bank = bank.borrow();
            let states: Vec<bool> = (0..bank.output_count())
                .map(|index| bank.output(index).unwrap_or(false))
                .collect();
            OutputState::new(states)
        })
    }
}
