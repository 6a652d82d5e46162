//! Broker session lifecycle
//!
//! The session advances `Disconnected -> Connecting -> Connected ->
//! SubscriptionPending -> Ready` and falls straight back to `Disconnected` on
//! any failure. Publishing is only possible while `Ready`; a failed publish
//! reopens the session once and retries once before the payload is dropped.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use embassy_time::Duration;
use log::{debug, error, info, warn};

use crate::error::{BrokerError, SessionError};
use crate::ports::{BrokerClient, ConnectOptions, InboundMessage, LastWill, QoS};

const ONLINE_PAYLOAD: &[u8] = b"online";
const OFFLINE_PAYLOAD: &[u8] = b"offline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Connected,
    SubscriptionPending,
    Ready,
}

impl SessionState {
    /// Whether `self -> next` is a legal transition
    pub fn can_advance_to(self, next: SessionState) -> bool {
        use SessionState::{Connected, Connecting, Disconnected, Ready, SubscriptionPending};
        matches!(
            (self, next),
            (_, Disconnected)
                | (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connected, SubscriptionPending)
                | (SubscriptionPending, Ready)
        )
    }
}

/// Callback invoked with `(from, to)` on every state change
pub type TransitionObserver = fn(SessionState, SessionState);

/// Work that must reach a session reopened by a failed publish before the
/// publish is retried on it
#[allow(async_fn_in_trait)]
pub trait ReopenHook<C: BrokerClient> {
    async fn reopened(&mut self, session: &mut SessionManager<C>);
}

/// No work on reopen
impl<C: BrokerClient> ReopenHook<C> for () {
    async fn reopened(&mut self, _session: &mut SessionManager<C>) {}
}

/// Identity and credentials presented to the broker
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
    /// Topic for the retained `online` birth and `offline` last will
    pub availability_topic: Option<String>,
}

impl SessionConfig {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
            availability_topic: None,
        }
    }
}

/// Check an MQTT topic against a filter with `+` and `#` wildcards
pub fn topic_matches(filter: &str, topic: &str) -> bool {
    let mut filter_levels = filter.split('/');
    let mut topic_levels = topic.split('/');
    loop {
        match (filter_levels.next(), topic_levels.next()) {
            (Some("#"), _) => return true,
            (Some("+"), Some(_)) => {}
            (Some(expected), Some(level)) if expected == level => {}
            (None, None) => return true,
            _ => return false,
        }
    }
}

pub struct SessionManager<C: BrokerClient> {
    client: C,
    config: SessionConfig,
    state: SessionState,
    filters: Vec<String>,
    established: bool,
    observer: Option<TransitionObserver>,
}

impl<C: BrokerClient> SessionManager<C> {
    pub fn new(client: C, config: SessionConfig) -> Self {
        Self {
            client,
            config,
            state: SessionState::Disconnected,
            filters: Vec::new(),
            established: false,
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: TransitionObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == SessionState::Ready
    }

    pub fn filters(&self) -> &[String] {
        &self.filters
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Reports once whether a session was established since the last call
    pub fn take_established(&mut self) -> bool {
        core::mem::take(&mut self.established)
    }

    fn transition(&mut self, next: SessionState) {
        if self.state == next {
            return;
        }
        debug_assert!(
            self.state.can_advance_to(next),
            "illegal session transition {:?} -> {:?}",
            self.state,
            next
        );
        debug!("session: {:?} -> {:?}", self.state, next);
        if let Some(observer) = self.observer {
            observer(self.state, next);
        }
        self.state = next;
    }

    /// Register a filter to be subscribed on every `open`
    pub fn register(&mut self, filter: &str) {
        if !self.filters.iter().any(|known| known == filter) {
            self.filters.push(filter.to_string());
        }
    }

    /// Register a filter and subscribe to it right away
    ///
    /// When the session is not ready the filter stays registered for the next
    /// `open` and `SessionError::NotReady` is returned.
    pub async fn subscribe(&mut self, filter: &str) -> Result<(), SessionError> {
        self.register(filter);
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }
        self.client
            .subscribe(filter)
            .await
            .map_err(SessionError::Subscribe)
    }

    /// Connect and subscribe every registered filter
    pub async fn open(&mut self) -> Result<(), SessionError> {
        if self.state != SessionState::Disconnected {
            self.teardown().await;
        }

        self.transition(SessionState::Connecting);
        let will = self.config.availability_topic.as_deref().map(|topic| LastWill {
            topic,
            payload: OFFLINE_PAYLOAD,
            retain: true,
        });
        let options = ConnectOptions {
            client_id: &self.config.client_id,
            username: self.config.username.as_deref(),
            password: self.config.password.as_deref(),
            keep_alive: self.config.keep_alive,
            last_will: will,
        };
        if let Err(e) = self.client.connect(&options).await {
            warn!("session: connect as '{}' failed: {}", self.config.client_id, e);
            self.client.disconnect().await;
            self.transition(SessionState::Disconnected);
            return Err(SessionError::Connect(e));
        }
        self.transition(SessionState::Connected);

        self.transition(SessionState::SubscriptionPending);
        let mut refused: Option<(usize, BrokerError)> = None;
        for (index, filter) in self.filters.iter().enumerate() {
            if let Err(e) = self.client.subscribe(filter).await {
                refused = Some((index, e));
                break;
            }
        }
        if let Some((index, e)) = refused {
            warn!("session: subscribe to '{}' failed: {}", self.filters[index], e);
            self.teardown().await;
            return Err(SessionError::Subscribe(e));
        }

        self.transition(SessionState::Ready);
        self.established = true;
        info!(
            "session: ready as '{}' ({} subscriptions)",
            self.config.client_id,
            self.filters.len()
        );

        if let Some(topic) = self.config.availability_topic.as_deref() {
            if let Err(e) = self
                .client
                .publish(topic, ONLINE_PAYLOAD, QoS::AtMostOnce, true)
                .await
            {
                warn!("session: birth message to '{}' failed: {}", topic, e);
            }
        }
        Ok(())
    }

    /// Disconnect and return to `Disconnected`
    ///
    /// A session torn down before anyone took notice of it is forgotten.
    pub async fn teardown(&mut self) {
        self.established = false;
        if self.state != SessionState::Disconnected {
            self.client.disconnect().await;
            self.transition(SessionState::Disconnected);
        }
    }

    /// Publish with QoS 0, reopening the session and retrying once on failure
    pub async fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<(), SessionError> {
        self.publish_with(topic, payload, &mut ()).await
    }

    /// Like [`Self::publish`], running `hook` on the reopened session
    /// before the retry
    pub async fn publish_with<H: ReopenHook<C>>(
        &mut self,
        topic: &str,
        payload: &[u8],
        hook: &mut H,
    ) -> Result<(), SessionError> {
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }

        let first = match self
            .client
            .publish(topic, payload, QoS::AtMostOnce, false)
            .await
        {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };
        warn!("session: publish to '{}' failed: {}, reopening", topic, first);

        self.teardown().await;
        if let Err(e) = self.open().await {
            error!(
                "session: reopen failed ({}), dropped {} bytes for '{}'",
                e,
                payload.len(),
                topic
            );
            return Err(SessionError::Dropped(first));
        }

        hook.reopened(self).await;
        if !self.is_ready() {
            error!(
                "session: lost again before retry, dropped {} bytes for '{}'",
                payload.len(),
                topic
            );
            return Err(SessionError::Dropped(first));
        }

        match self
            .client
            .publish(topic, payload, QoS::AtMostOnce, false)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(
                    "session: retry to '{}' failed: {}, dropped {} bytes",
                    topic,
                    e,
                    payload.len()
                );
                self.teardown().await;
                Err(SessionError::Dropped(e))
            }
        }
    }

    /// Wait for the next inbound message matching a registered filter
    pub async fn next_message(&mut self) -> Result<InboundMessage, SessionError> {
        if !self.is_ready() {
            return Err(SessionError::NotReady);
        }
        loop {
            let message = self.client.receive().await.map_err(SessionError::Receive)?;
            if self
                .filters
                .iter()
                .any(|filter| topic_matches(filter, &message.topic))
            {
                return Ok(message);
            }
            debug!("session: ignoring message on '{}'", message.topic);
        }
    }
}
