mod broker;
mod feeder;
mod network;

pub(crate) use broker::{
    BrokerRequest, BrokerTarget, ConnectRequest, INBOUND, REQUESTS, RESPONSES, WillRequest,
    broker_task,
};
pub(crate) use feeder::{FEED_SIGNAL, FEEDING, Stepper, feeder_task};
pub(crate) use network::network_runner_task;
