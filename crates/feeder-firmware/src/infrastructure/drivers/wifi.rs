use core::net::IpAddr;

use alloc::string::String;
use embassy_net::{DhcpConfig, IpAddress, Runner, Stack, StackResources, dns::DnsQueryType};
use embassy_time::{Duration, with_timeout};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{
    AuthMethod, ClientConfig, Config as WifiConfig, ModeConfig, WifiController, WifiDevice,
    WifiStaState,
};
use feeder_node::error::{BrokerError, LinkError};
use feeder_node::ports::{LinkCredentials, LinkDriver};
use heapless::String as HString;
use log::{debug, warn};
use static_cell::make_static;

const MAX_CONNECTIONS: usize = 4;
const MAX_HOSTNAME_LEN: usize = 32;

/// Bring up the radio and the DHCP network stack
///
/// Panics only when the radio cannot be initialised at boot.
pub(crate) fn init_network_stack(
    wifi_device: WIFI<'static>,
    hostname: &str,
) -> (
    Stack<'static>,
    Runner<'static, WifiDevice<'static>>,
    WifiController<'static>,
) {
    let radio = &*make_static!(esp_radio::init().expect("radio init failed"));
    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi_device, WifiConfig::default())
        .expect("wifi init failed");

    let mut dhcp_config = DhcpConfig::default();
    let mut name = HString::<MAX_HOSTNAME_LEN>::new();
    for c in hostname.chars() {
        if name.push(c).is_err() {
            break;
        }
    }
    dhcp_config.hostname = Some(name);

    let net_config = embassy_net::Config::dhcpv4(dhcp_config);
    let resources = make_static!(StackResources::<MAX_CONNECTIONS>::new());
    let (stack, runner) = embassy_net::new(interfaces.sta, net_config, resources, seed());

    (stack, runner, controller)
}

fn seed() -> u64 {
    let rng = Rng::new();
    (u64::from(rng.random()) << 32) | u64::from(rng.random())
}

/// Resolve a host name or dotted address
pub(crate) async fn resolve_host(stack: Stack<'static>, host: &str) -> Result<IpAddress, BrokerError> {
    if let Ok(ip) = host.parse::<embassy_net::Ipv4Address>() {
        return Ok(IpAddress::Ipv4(ip));
    }
    let addresses = stack
        .dns_query(host, DnsQueryType::A)
        .await
        .map_err(|_| BrokerError::Resolve)?;
    addresses.first().copied().ok_or(BrokerError::Resolve)
}

/// WiFi station as the node's link driver
pub(crate) struct WifiLink {
    controller: WifiController<'static>,
    stack: Stack<'static>,
}

impl WifiLink {
    pub(crate) fn new(controller: WifiController<'static>, stack: Stack<'static>) -> Self {
        Self { controller, stack }
    }

    async fn start(&mut self, credentials: &LinkCredentials<'_>) -> Result<(), LinkError> {
        let client = if credentials.password.is_empty() {
            ClientConfig::default()
                .with_ssid(String::from(credentials.ssid))
                .with_auth_method(AuthMethod::None)
        } else {
            ClientConfig::default()
                .with_ssid(String::from(credentials.ssid))
                .with_password(String::from(credentials.password))
        };
        self.controller
            .set_config(&ModeConfig::Client(client))
            .map_err(|e| {
                warn!("wifi: invalid configuration: {:?}", e);
                LinkError::JoinFailed
            })?;
        self.controller.start_async().await.map_err(|e| {
            warn!("wifi: cannot start: {:?}", e);
            LinkError::JoinFailed
        })
    }
}

impl LinkDriver for WifiLink {
    async fn join(
        &mut self,
        credentials: &LinkCredentials<'_>,
        timeout: Duration,
    ) -> Result<(), LinkError> {
        if !matches!(self.controller.is_started(), Ok(true)) {
            self.start(credentials).await?;
        }
        if esp_radio::wifi::sta_state() == WifiStaState::Connected {
            // stale association from before the link was marked down
            let _ = self.controller.disconnect_async().await;
        }

        match with_timeout(timeout, self.controller.connect_async()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                debug!("wifi: connect error: {:?}", e);
                Err(LinkError::JoinFailed)
            }
            Err(_) => Err(LinkError::Timeout),
        }
    }

    async fn address(&mut self) -> Result<IpAddr, LinkError> {
        if !self.stack.is_link_up() {
            return Err(LinkError::NoAddress);
        }
        self.stack
            .config_v4()
            .map(|config| IpAddr::V4(config.address.address()))
            .ok_or(LinkError::NoAddress)
    }

    fn is_connected(&self) -> bool {
        esp_radio::wifi::sta_state() == WifiStaState::Connected && self.stack.is_config_up()
    }
}
