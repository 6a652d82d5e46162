//! Network link management
//!
//! Joining is retried forever with a fixed backoff. After a successful join
//! the manager polls for an address a bounded number of times; a join that
//! never yields an address counts as failed.

use core::net::IpAddr;

use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{debug, info, warn};

use crate::config::{LinkConfig, delay_millis};
use crate::error::LinkError;
use crate::ports::{LinkCredentials, LinkDriver};

/// Retry discipline of the link manager
#[derive(Debug, Clone, Copy)]
pub struct LinkTiming {
    pub retry_backoff: Duration,
    pub address_attempts: u32,
    pub address_poll_interval: Duration,
}

impl From<&LinkConfig> for LinkTiming {
    fn from(config: &LinkConfig) -> Self {
        Self {
            retry_backoff: config.retry_backoff,
            address_attempts: config.address_attempts,
            address_poll_interval: config.address_poll_interval,
        }
    }
}

pub struct LinkManager<L: LinkDriver, D: DelayNs> {
    driver: L,
    delay: D,
    timing: LinkTiming,
    connected: bool,
}

impl<L: LinkDriver, D: DelayNs> LinkManager<L, D> {
    pub fn new(driver: L, delay: D, timing: LinkTiming) -> Self {
        Self {
            driver,
            delay,
            timing,
            connected: false,
        }
    }

    /// Join the network and wait for an address
    ///
    /// Only returns once the link is up. The single error it reports is a
    /// configuration without a network name.
    pub async fn connect(
        &mut self,
        credentials: &LinkCredentials<'_>,
        timeout: Duration,
    ) -> Result<IpAddr, LinkError> {
        if credentials.ssid.is_empty() {
            return Err(LinkError::MissingCredentials);
        }
        self.connected = false;

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.wrapping_add(1);
            info!("link: joining '{}' (attempt {})", credentials.ssid, attempt);

            let failure = match self.driver.join(credentials, timeout).await {
                Ok(()) => match self.wait_for_address().await {
                    Ok(address) => {
                        info!("link: up, address {}", address);
                        self.connected = true;
                        return Ok(address);
                    }
                    Err(e) => e,
                },
                Err(e) => e,
            };

            warn!(
                "link: {}, retrying in {}s",
                failure,
                self.timing.retry_backoff.as_secs()
            );
            self.delay
                .delay_ms(delay_millis(self.timing.retry_backoff))
                .await;
        }
    }

    async fn wait_for_address(&mut self) -> Result<IpAddr, LinkError> {
        for poll in 0..self.timing.address_attempts {
            match self.driver.address().await {
                Ok(address) => return Ok(address),
                Err(e) => debug!("link: address poll {}: {}", poll + 1, e),
            }
            self.delay
                .delay_ms(delay_millis(self.timing.address_poll_interval))
                .await;
        }
        Err(LinkError::NoAddress)
    }

    pub fn is_connected(&self) -> bool {
        self.connected && self.driver.is_connected()
    }

    /// Forget the current link so the next `connect` performs a full join
    pub fn mark_down(&mut self) {
        self.connected = false;
    }

    pub fn driver(&self) -> &L {
        &self.driver
    }
}
