mod broker_client;
mod feeder;

pub(crate) use broker_client::ChannelBroker;
pub(crate) use feeder::SignalFeeder;
