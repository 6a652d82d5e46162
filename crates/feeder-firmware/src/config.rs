//! Compile-time provisioning
//!
//! Credentials and identity come from the environment (or `.env`) at build
//! time. Pin assignments live in the macros at the bottom of this file.

use embassy_time::Duration;
use feeder_node::NodeConfig;
use feeder_node::config::{BrokerConfig, LinkConfig};
use log::warn;

pub(crate) struct WifiConfig {
    pub ssid: &'static str,
    pub password: &'static str,
}

pub(crate) struct MqttConfig {
    pub host: &'static str,
    pub port: &'static str,
    pub username: Option<&'static str>,
    pub password: Option<&'static str>,
}

pub(crate) struct DeviceConfig {
    pub id: &'static str,
    pub name: &'static str,
    pub manufacturer: &'static str,
    pub model: &'static str,
}

pub(crate) struct FeederConfig {
    /// Steps turning the auger forward for one portion
    pub forward_steps: u32,
    /// Steps back after each portion to clear jams
    pub reverse_steps: u32,
    pub step_interval: Duration,
    pub pause: Duration,
}

pub(crate) struct HopperConfig {
    /// Distance reading of a full hopper
    pub full_mm: u16,
    /// Distance reading of an empty hopper
    pub empty_mm: u16,
}

pub(crate) const WIFI: WifiConfig = WifiConfig {
    ssid: env!("WIFI_SSID"),
    password: env!("WIFI_PASSWORD"),
};

pub(crate) const MQTT: MqttConfig = MqttConfig {
    host: env!("MQTT_HOST"),
    port: env!("MQTT_PORT"),
    username: option_env!("MQTT_USER"),
    password: option_env!("MQTT_PASSWORD"),
};

pub(crate) const DEVICE: DeviceConfig = DeviceConfig {
    id: env!("DEVICE_ID"),
    name: "Rabbit Feeder Supreme",
    manufacturer: "@conejo@social.tinygo.org",
    model: "Rabbit Feeder Supreme F3",
};

pub(crate) const FEEDER: FeederConfig = FeederConfig {
    forward_steps: 6000,
    reverse_steps: 600,
    step_interval: Duration::from_millis(1),
    pause: Duration::from_secs(2),
};

pub(crate) const HOPPER: HopperConfig = HopperConfig {
    full_mm: 20,
    empty_mm: 180,
};

pub(crate) const FIRMWARE_VERSION: &str = env!("BUILD_VERSION");

const DEFAULT_MQTT_PORT: u16 = 1883;

/// Assemble the node configuration from the provisioned values
pub(crate) fn node_config() -> NodeConfig {
    let port = MQTT.port.parse().unwrap_or_else(|_| {
        warn!(
            "config: invalid MQTT_PORT '{}', using {}",
            MQTT.port, DEFAULT_MQTT_PORT
        );
        DEFAULT_MQTT_PORT
    });

    let mut broker = BrokerConfig::new(MQTT.host, port);
    if let Some(username) = MQTT.username.filter(|user| !user.is_empty()) {
        broker = broker.with_credentials(username, MQTT.password.unwrap_or_default());
    }

    NodeConfig::new(DEVICE.id, LinkConfig::new(WIFI.ssid, WIFI.password), broker)
        .with_availability(true)
}

#[macro_export]
macro_rules! relay_gpios {
    ($p:expr) => {
        [
            $p.GPIO25.into(),
            $p.GPIO26.into(),
            $p.GPIO27.into(),
            $p.GPIO14.into(),
        ]
    };
}

#[macro_export]
macro_rules! i2c_gpios {
    ($p:expr) => {
        ($p.GPIO21, $p.GPIO22)
    };
}

#[macro_export]
macro_rules! stepper_gpios {
    ($p:expr) => {
        ($p.GPIO18, $p.GPIO19, $p.GPIO23)
    };
}
