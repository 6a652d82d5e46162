//! The node's main task
//!
//! Startup runs once: join the link, open the session, announce, settle. The
//! steady state then repeats forever: sample, publish the snapshot and the
//! output state, and idle for the sample period while dispatching inbound
//! commands. Every publish goes through the one [`SessionManager`] owned here,
//! which serializes them.

use core::pin::pin;

use embassy_futures::select::{Either, select};
use embassy_time::Duration;
use embedded_hal_async::delay::DelayNs;
use log::{error, info, warn};
use serde::Serialize;

use crate::config::{NodeConfig, delay_millis};
use crate::discovery::DiscoveryAdvertiser;
use crate::dispatch::{CommandDispatcher, DispatchOutcome, Peripherals};
use crate::domain::DeviceManifest;
use crate::link::{LinkManager, LinkTiming};
use crate::outputs::OutputControl;
use crate::ports::{BrokerClient, LinkCredentials, LinkDriver};
use crate::session::{ReopenHook, SessionConfig, SessionManager};
use crate::telemetry::TelemetrySampler;

pub struct ControlLoop<'a, L, C, D>
where
    L: LinkDriver,
    C: BrokerClient,
    D: DelayNs + Clone,
{
    config: &'a NodeConfig,
    link: LinkManager<L, D>,
    session: SessionManager<C>,
    announcer: Announcer<'a, D>,
    sampler: TelemetrySampler<'a>,
    dispatcher: CommandDispatcher<'a>,
    outputs: &'a dyn OutputControl,
    delay: D,
}

impl<'a, L, C, D> ControlLoop<'a, L, C, D>
where
    L: LinkDriver,
    C: BrokerClient,
    D: DelayNs + Clone,
{
    pub fn new(
        config: &'a NodeConfig,
        manifest: &'a DeviceManifest,
        link_driver: L,
        client: C,
        delay: D,
        sampler: TelemetrySampler<'a>,
        peripherals: Peripherals<'a>,
    ) -> Self {
        let outputs = peripherals.outputs;
        let dispatcher = CommandDispatcher::new(manifest, config, peripherals);

        let mut session = SessionManager::new(client, session_config(config));
        for filter in dispatcher.subscriptions() {
            session.register(&filter);
        }

        Self {
            config,
            link: LinkManager::new(link_driver, delay.clone(), LinkTiming::from(&config.link)),
            session,
            announcer: Announcer {
                advertiser: DiscoveryAdvertiser::new(manifest, config),
                delay: delay.clone(),
                settle: config.timing.settle_delay,
            },
            sampler,
            dispatcher,
            outputs,
            delay,
        }
    }

    pub fn session(&self) -> &SessionManager<C> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<C> {
        &mut self.session
    }

    pub fn link(&self) -> &LinkManager<L, D> {
        &self.link
    }

    /// Run the node forever
    pub async fn run(&mut self) -> ! {
        self.start().await;
        loop {
            self.tick().await;
            self.idle().await;
        }
    }

    /// Startup phases: link, session, announcement, settle delay
    pub async fn start(&mut self) {
        info!("node: starting '{}'", self.config.device_id);
        self.establish().await;
    }

    /// Bring link and session up, retrying until both are established
    async fn establish(&mut self) {
        let config = self.config;
        let credentials = LinkCredentials {
            ssid: &config.link.ssid,
            password: &config.link.password,
        };
        loop {
            if !self.link.is_connected() {
                if let Err(e) = self.link.connect(&credentials, config.link.join_timeout).await {
                    error!("node: cannot join: {}", e);
                    self.delay
                        .delay_ms(delay_millis(config.link.retry_backoff))
                        .await;
                    continue;
                }
            }

            match self.session.open().await {
                Ok(()) => {
                    self.session.take_established();
                    self.announcer.announce(&mut self.session).await;
                    return;
                }
                Err(e) => {
                    warn!(
                        "node: {}, retrying in {}s",
                        e,
                        config.timing.session_retry.as_secs()
                    );
                    self.link.mark_down();
                    self.delay
                        .delay_ms(delay_millis(config.timing.session_retry))
                        .await;
                }
            }
        }
    }

    /// One sampling cycle: sample, project outputs, publish both
    pub async fn tick(&mut self) {
        if !self.session.is_ready() {
            self.establish().await;
        }

        if self.session.take_established() {
            self.announcer.announce(&mut self.session).await;
        }

        let config = self.config;
        let topics = config.topics();
        let snapshot = self.sampler.sample();
        publish_json(&mut self.session, &topics.telemetry, &snapshot, &mut self.announcer).await;
        let outputs = self.outputs.snapshot();
        publish_json(&mut self.session, &topics.outputs, &outputs, &mut self.announcer).await;
    }

    /// Sleep for one sample period, dispatching inbound messages meanwhile
    ///
    /// Inbound traffic interrupts the sleep but does not move its deadline.
    pub async fn idle(&mut self) {
        let Self {
            config,
            session,
            announcer,
            dispatcher,
            outputs,
            delay,
            ..
        } = self;

        let mut sleep = pin!(delay.delay_ms(delay_millis(config.timing.sample_period)));
        loop {
            if !session.is_ready() {
                sleep.await;
                return;
            }
            let event = select(sleep.as_mut(), session.next_message()).await;
            match event {
                Either::First(()) => return,
                Either::Second(Ok(message)) => {
                    let outcome = dispatcher.handle(&message);
                    apply_outcome(*config, session, announcer, *outputs, outcome).await;
                }
                Either::Second(Err(e)) => {
                    warn!("node: inbound traffic lost: {}", e);
                    session.teardown().await;
                }
            }
        }
    }
}

fn session_config(config: &NodeConfig) -> SessionConfig {
    let mut session = SessionConfig::new(config.device_id.clone());
    session.username.clone_from(&config.broker.username);
    session.password.clone_from(&config.broker.password);
    session.keep_alive = config.broker.keep_alive;
    if config.availability {
        session.availability_topic = Some(config.topics().availability.clone());
    }
    session
}

async fn publish_json<C: BrokerClient, T: Serialize>(
    session: &mut SessionManager<C>,
    topic: &str,
    value: &T,
    announcer: &mut impl ReopenHook<C>,
) {
    let payload = match serde_json::to_vec(value) {
        Ok(payload) => payload,
        Err(e) => {
            error!("node: encoding for '{}' failed: {}", topic, e);
            return;
        }
    };
    if let Err(e) = session.publish_with(topic, &payload, announcer).await {
        warn!("node: publish to '{}' failed: {}", topic, e);
    }
}

/// Publish what a dispatched message asked for
async fn apply_outcome<C: BrokerClient, D: DelayNs>(
    config: &NodeConfig,
    session: &mut SessionManager<C>,
    announcer: &mut Announcer<'_, D>,
    outputs: &dyn OutputControl,
    outcome: DispatchOutcome,
) {
    let topics = config.topics();
    if outcome.announce {
        if let Err(e) = announcer.advertiser.announce_manifest(session).await {
            warn!("node: announcement failed: {}", e);
        }
    }
    for reply in &outcome.replies {
        publish_json(session, &topics.reply, reply, &mut *announcer).await;
    }
    if outcome.publish_outputs {
        publish_json(session, &topics.outputs, &outputs.snapshot(), &mut *announcer).await;
    }
    if session.take_established() {
        announcer.announce(session).await;
    }
}

/// Announces new sessions and lets them settle before regular traffic
struct Announcer<'a, D: DelayNs> {
    advertiser: DiscoveryAdvertiser<'a>,
    delay: D,
    settle: Duration,
}

impl<D: DelayNs> Announcer<'_, D> {
    /// Announce and settle, again if the announcement had to reopen the session
    async fn announce<C: BrokerClient>(&mut self, session: &mut SessionManager<C>) {
        loop {
            if let Err(e) = self.advertiser.announce(session).await {
                warn!("node: announcement failed: {}", e);
            }
            self.delay.delay_ms(delay_millis(self.settle)).await;
            if !session.take_established() {
                return;
            }
        }
    }
}

impl<C: BrokerClient, D: DelayNs> ReopenHook<C> for Announcer<'_, D> {
    async fn reopened(&mut self, session: &mut SessionManager<C>) {
        if session.take_established() {
            self.announce(session).await;
        }
    }
}
