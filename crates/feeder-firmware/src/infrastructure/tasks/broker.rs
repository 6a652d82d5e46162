//! MQTT connection task
//!
//! The task owns the TCP socket, the rust-mqtt client and its buffers. The
//! control loop talks to it through [`ChannelBroker`], which turns every
//! `BrokerClient` call into a request on [`REQUESTS`] and waits for the answer
//! on [`RESPONSES`]. Inbound publishes are copied into [`INBOUND`].
//!
//! A packet read is never raced against requests or pings: the task waits for
//! the socket to become readable and then reads the whole packet before it
//! looks at anything else. A packet that does not fit [`MQTT_BUF_SIZE`] ends
//! the connection.
//!
//! [`ChannelBroker`]: crate::infrastructure::adapters::ChannelBroker

use alloc::string::String;
use alloc::vec::Vec;
use embassy_futures::select::{Either3, select3};
use embassy_net::Stack;
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex};
use embassy_sync::channel::Channel;
use embassy_sync::mutex::Mutex;
use embassy_time::{Duration, Instant, Timer};
use feeder_node::error::BrokerError;
use feeder_node::ports::InboundMessage;
use log::{debug, info, warn};
use rust_mqtt::client::client::MqttClient;
use rust_mqtt::client::client_config::{ClientConfig, MqttVersion};
use rust_mqtt::packet::v5::publish_packet::QualityOfService;
use rust_mqtt::packet::v5::reason_codes::ReasonCode;
use rust_mqtt::utils::rng_generator::CountingRng;

use crate::infrastructure::drivers::resolve_host;

const MQTT_BUF_SIZE: usize = 4096;
const SOCKET_BUF_SIZE: usize = MQTT_BUF_SIZE;
const MQTT_MAX_PROPERTIES: usize = 5;
const INBOUND_DEPTH: usize = 4;
const SOCKET_TIMEOUT: Duration = Duration::from_secs(60);

/// Will message registered with the broker on connect
pub(crate) struct WillRequest {
    pub topic: String,
    pub payload: Vec<u8>,
    pub retain: bool,
}

/// Owned copy of the connect options
pub(crate) struct ConnectRequest {
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub keep_alive_secs: u16,
    pub will: Option<WillRequest>,
}

pub(crate) enum BrokerRequest {
    Connect(ConnectRequest),
    Subscribe(String),
    Publish {
        topic: String,
        payload: Vec<u8>,
        retain: bool,
    },
    /// Close the connection; not answered
    Disconnect,
}

pub(crate) static REQUESTS: Channel<CriticalSectionRawMutex, BrokerRequest, 1> = Channel::new();
pub(crate) static RESPONSES: Channel<CriticalSectionRawMutex, Result<(), BrokerError>, 1> =
    Channel::new();
pub(crate) static INBOUND: Channel<
    CriticalSectionRawMutex,
    Result<InboundMessage, BrokerError>,
    INBOUND_DEPTH,
> = Channel::new();

/// Broker endpoint the task connects to
pub(crate) struct BrokerTarget {
    pub host: &'static str,
    pub port: u16,
}

#[embassy_executor::task]
pub(crate) async fn broker_task(stack: Stack<'static>, target: BrokerTarget) {
    info!("broker: task started for {}:{}", target.host, target.port);
    loop {
        match REQUESTS.receive().await {
            BrokerRequest::Connect(request) => {
                run_connection(stack, &target, &request).await;
                info!("broker: connection closed");
            }
            BrokerRequest::Disconnect => {}
            BrokerRequest::Subscribe(_) | BrokerRequest::Publish { .. } => {
                RESPONSES.send(Err(BrokerError::Closed)).await;
            }
        }
    }
}

/// TCP socket shared between the MQTT client and the readiness wait
///
/// The two never run at the same time, so the lock is never contended.
struct Transport<'s, 'b> {
    socket: &'s Mutex<NoopRawMutex, TcpSocket<'b>>,
}

impl embedded_io_async::ErrorType for Transport<'_, '_> {
    type Error = TcpError;
}

impl embedded_io_async::Read for Transport<'_, '_> {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, TcpError> {
        self.socket.lock().await.read(buf).await
    }
}

impl embedded_io_async::Write for Transport<'_, '_> {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, TcpError> {
        self.socket.lock().await.write(buf).await
    }

    async fn flush(&mut self) -> Result<(), TcpError> {
        self.socket.lock().await.flush().await
    }
}

/// Resolves once the socket has data or was closed by the peer
async fn readable(socket: &Mutex<NoopRawMutex, TcpSocket<'_>>) {
    socket.lock().await.wait_read_ready().await;
}

fn broker_error(code: ReasonCode) -> BrokerError {
    match code {
        ReasonCode::NetworkError => BrokerError::Transport,
        ReasonCode::BuffError => BrokerError::BufferTooSmall,
        _ => BrokerError::Rejected,
    }
}

/// Connect, answer the pending connect request and serve until the
/// connection ends
async fn run_connection(stack: Stack<'static>, target: &BrokerTarget, request: &ConnectRequest) {
    let address = match resolve_host(stack, target.host).await {
        Ok(address) => address,
        Err(e) => {
            warn!("broker: cannot resolve '{}'", target.host);
            RESPONSES.send(Err(e)).await;
            return;
        }
    };

    let mut rx_buffer = [0u8; SOCKET_BUF_SIZE];
    let mut tx_buffer = [0u8; SOCKET_BUF_SIZE];
    let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
    socket.set_timeout(Some(SOCKET_TIMEOUT));
    if let Err(e) = socket.connect((address, target.port)).await {
        warn!("broker: TCP connect to {:?} failed: {:?}", address, e);
        socket.abort();
        RESPONSES.send(Err(BrokerError::Transport)).await;
        return;
    }
    debug!("broker: TCP connected to {:?}", address);
    let socket = Mutex::<NoopRawMutex, _>::new(socket);

    let mut config = ClientConfig::new(MqttVersion::MQTTv5, CountingRng(0));
    config.add_client_id(&request.client_id);
    config.keep_alive = request.keep_alive_secs;
    if let Some(username) = request.username.as_deref() {
        config.add_username(username);
    }
    if let Some(password) = request.password.as_deref() {
        config.add_password(password);
    }
    if let Some(will) = &request.will {
        config.add_will(&will.topic, &will.payload, will.retain);
    }

    let mut write_buffer = [0u8; MQTT_BUF_SIZE];
    let mut recv_buffer = [0u8; MQTT_BUF_SIZE];
    let mut client = MqttClient::<_, MQTT_MAX_PROPERTIES, _>::new(
        Transport { socket: &socket },
        &mut write_buffer,
        MQTT_BUF_SIZE,
        &mut recv_buffer,
        MQTT_BUF_SIZE,
        config,
    );

    if let Err(code) = client.connect_to_broker().await {
        warn!("broker: CONNECT refused: {:?}", code);
        RESPONSES.send(Err(broker_error(code))).await;
        return;
    }
    RESPONSES.send(Ok(())).await;
    INBOUND.clear();

    let ping_interval = Duration::from_secs(u64::from(request.keep_alive_secs.max(2) / 2));
    serve(&mut client, &socket, ping_interval).await;
}

async fn serve(
    client: &mut MqttClient<'_, Transport<'_, '_>, MQTT_MAX_PROPERTIES, CountingRng>,
    socket: &Mutex<NoopRawMutex, TcpSocket<'_>>,
    ping_interval: Duration,
) {
    let mut next_ping = Instant::now() + ping_interval;
    loop {
        let event = select3(REQUESTS.receive(), readable(socket), Timer::at(next_ping)).await;

        match event {
            Either3::First(BrokerRequest::Subscribe(filter)) => {
                let result = client.subscribe_to_topic(&filter).await.map_err(broker_error);
                let failed = result.is_err();
                RESPONSES.send(result).await;
                if failed {
                    return;
                }
            }
            Either3::First(BrokerRequest::Publish {
                topic,
                payload,
                retain,
            }) => {
                let result = match client
                    .send_message(&topic, &payload, QualityOfService::QoS0, retain)
                    .await
                {
                    Ok(()) | Err(ReasonCode::NoMatchingSubscribers) => Ok(()),
                    Err(code) => Err(broker_error(code)),
                };
                let failed = result.is_err();
                RESPONSES.send(result).await;
                if failed {
                    return;
                }
            }
            Either3::First(BrokerRequest::Disconnect) => {
                let _ = client.disconnect().await;
                return;
            }
            Either3::First(BrokerRequest::Connect(_)) => {
                warn!("broker: connect requested on a live connection");
                RESPONSES.send(Err(BrokerError::Closed)).await;
                let _ = client.disconnect().await;
                return;
            }
            Either3::Second(()) => match client.receive_message().await {
                Ok((topic, payload)) => {
                    let message = InboundMessage::new(topic, payload);
                    if INBOUND.try_send(Ok(message)).is_err() {
                        warn!("broker: inbound queue full, message dropped");
                    }
                }
                Err(code) => {
                    warn!("broker: receive failed: {:?}", code);
                    let _ = INBOUND.try_send(Err(broker_error(code)));
                    return;
                }
            },
            Either3::Third(()) => {
                next_ping = Instant::now() + ping_interval;
                if let Err(code) = client.send_ping().await {
                    warn!("broker: ping failed: {:?}", code);
                    let _ = INBOUND.try_send(Err(broker_error(code)));
                    return;
                }
            }
        }
    }
}
