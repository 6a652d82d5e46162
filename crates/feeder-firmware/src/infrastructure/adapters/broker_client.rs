use alloc::string::ToString;
use feeder_node::error::BrokerError;
use feeder_node::ports::{BrokerClient, ConnectOptions, InboundMessage, QoS};
use log::warn;

use crate::infrastructure::tasks::{
    BrokerRequest, ConnectRequest, INBOUND, REQUESTS, RESPONSES, WillRequest,
};

/// `BrokerClient` backed by the broker task
pub(crate) struct ChannelBroker;

impl ChannelBroker {
    async fn request(&mut self, request: BrokerRequest) -> Result<(), BrokerError> {
        REQUESTS.send(request).await;
        RESPONSES.receive().await
    }
}

impl BrokerClient for ChannelBroker {
    async fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), BrokerError> {
        let keep_alive_secs = u16::try_from(options.keep_alive.as_secs()).unwrap_or(u16::MAX);
        let request = ConnectRequest {
            client_id: options.client_id.to_string(),
            username: options.username.map(ToString::to_string),
            password: options.password.map(ToString::to_string),
            keep_alive_secs,
            will: options.last_will.map(|will| WillRequest {
                topic: will.topic.to_string(),
                payload: will.payload.to_vec(),
                retain: will.retain,
            }),
        };
        self.request(BrokerRequest::Connect(request)).await
    }

    async fn subscribe(&mut self, filter: &str) -> Result<(), BrokerError> {
        self.request(BrokerRequest::Subscribe(filter.to_string()))
            .await
    }

    async fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<(), BrokerError> {
        if qos != QoS::AtMostOnce {
            warn!("broker: only QoS 0 is supported, downgrading '{}'", topic);
        }
        self.request(BrokerRequest::Publish {
            topic: topic.to_string(),
            payload: payload.to_vec(),
            retain,
        })
        .await
    }

    async fn receive(&mut self) -> Result<InboundMessage, BrokerError> {
        INBOUND.receive().await
    }

    async fn disconnect(&mut self) {
        REQUESTS.send(BrokerRequest::Disconnect).await;
        INBOUND.clear();
    }
}
