use core::sync::atomic::Ordering;

use feeder_node::error::FeedError;
use feeder_node::ports::Feeder;

use crate::infrastructure::tasks::{FEED_SIGNAL, FEEDING};

/// Hands feed requests to the motor task without waiting for it
pub(crate) struct SignalFeeder;

impl Feeder for SignalFeeder {
    fn request_feed(&mut self, portions: u8) -> Result<(), FeedError> {
        if portions == 0 {
            return Err(FeedError::NothingToDo);
        }
        if FEEDING.load(Ordering::Acquire) || FEED_SIGNAL.signaled() {
            return Err(FeedError::Busy);
        }
        FEED_SIGNAL.signal(portions);
        Ok(())
    }
}
