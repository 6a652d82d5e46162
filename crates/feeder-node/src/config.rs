//! Node configuration
//!
//! Defaults carry the timings the feeder has always used: a 30 s link retry,
//! address polling once per second and a 60 s sampling period.

use alloc::format;
use alloc::string::{String, ToString};
use embassy_time::Duration;
use feeder_homeassistant::ha;

use crate::discovery::DiscoveryMode;
use crate::dispatch::CommandProfile;

/// Default Home Assistant discovery prefix
pub const DEFAULT_NAMESPACE: &str = "homeassistant";
/// Well-known channel carrying manifests
pub const DISCOVERY_TOPIC: &str = "discovery";

const MAX_TOPIC_LEN: usize = 128;

/// Network join settings
#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub ssid: String,
    pub password: String,
    /// Upper bound of a single join attempt
    pub join_timeout: Duration,
    /// Pause between failed join attempts
    pub retry_backoff: Duration,
    /// Number of address polls after a join before it counts as failed
    pub address_attempts: u32,
    pub address_poll_interval: Duration,
}

impl LinkConfig {
    pub fn new(ssid: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            password: password.into(),
            join_timeout: Duration::from_secs(10),
            retry_backoff: Duration::from_secs(30),
            address_attempts: 10,
            address_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Broker session settings
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive: Duration,
}

impl BrokerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            keep_alive: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        let username = username.into();
        if !username.is_empty() {
            self.username = Some(username);
            self.password = Some(password.into());
        }
        self
    }
}

/// Control loop timings
#[derive(Debug, Clone, Copy)]
pub struct TimingConfig {
    pub sample_period: Duration,
    /// Pause after discovery before regular traffic starts
    pub settle_delay: Duration,
    /// Pause before retrying a session that could not be opened
    pub session_retry: Duration,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            sample_period: Duration::from_secs(60),
            settle_delay: Duration::from_secs(2),
            session_retry: Duration::from_secs(15),
        }
    }
}

/// Every channel name the node uses, derived from its device id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub namespace: String,
    /// Manifest announcements
    pub discovery: String,
    /// Sensor snapshots
    pub telemetry: String,
    /// Output state
    pub outputs: String,
    /// Replies to introspection methods
    pub reply: String,
    /// `online`/`offline` availability
    pub availability: String,
    /// Batch command channel
    pub commands: String,
    /// Filter matching every routed switch command
    pub switch_commands: String,
}

impl Topics {
    pub fn new(device_id: &str, namespace: &str) -> Self {
        let switch_commands = ha::command_filter::<MAX_TOPIC_LEN>(namespace, "switch")
            .map(|filter| filter.as_str().to_string())
            .unwrap_or_else(|_| format!("{}/switch/+/set", namespace));
        Self {
            namespace: namespace.to_string(),
            discovery: DISCOVERY_TOPIC.to_string(),
            telemetry: device_id.to_string(),
            outputs: format!("{}/outputs", device_id),
            reply: format!("{}/reply", device_id),
            availability: format!("{}/availability", device_id),
            commands: format!("{}-call", device_id),
            switch_commands,
        }
    }
}

/// Complete node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    pub device_id: String,
    pub link: LinkConfig,
    pub broker: BrokerConfig,
    pub timing: TimingConfig,
    pub discovery: DiscoveryMode,
    pub commands: CommandProfile,
    /// Publish a retained `online` birth and register an `offline` last will
    pub availability: bool,
    /// Subscribe to the discovery channel and log other nodes' announcements
    pub listen_for_peers: bool,
    topics: Topics,
}

impl NodeConfig {
    pub fn new(device_id: impl Into<String>, link: LinkConfig, broker: BrokerConfig) -> Self {
        let device_id = device_id.into();
        let topics = Topics::new(&device_id, DEFAULT_NAMESPACE);
        Self {
            device_id,
            link,
            broker,
            timing: TimingConfig::default(),
            discovery: DiscoveryMode::Manifest,
            commands: CommandProfile::Batch,
            availability: false,
            listen_for_peers: false,
            topics,
        }
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.topics = Topics::new(&self.device_id, namespace);
        self
    }

    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        self.timing = timing;
        self
    }

    #[must_use]
    pub fn with_discovery(mut self, discovery: DiscoveryMode) -> Self {
        self.discovery = discovery;
        self
    }

    #[must_use]
    pub fn with_commands(mut self, commands: CommandProfile) -> Self {
        self.commands = commands;
        self
    }

    #[must_use]
    pub fn with_availability(mut self, availability: bool) -> Self {
        self.availability = availability;
        self
    }

    #[must_use]
    pub fn with_peer_listening(mut self, listen: bool) -> Self {
        self.listen_for_peers = listen;
        self
    }

    pub fn topics(&self) -> &Topics {
        &self.topics
    }
}

/// Duration in whole milliseconds, saturated to what a delay call accepts
pub(crate) fn delay_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
