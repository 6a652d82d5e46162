//! Integration tests for the control loop driving every component together.

mod support;

use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use feeder_node::config::LinkConfig;
use feeder_node::error::{BrokerError, LinkError};
use feeder_node::link::LinkTiming;
use feeder_node::ports::LinkCredentials;
use feeder_node::{
    ControlLoop, DiscoveryMode, LinkManager, Peripherals, SessionState, SharedOutputs,
    TelemetrySampler,
};
use support::{
    Event, FailingSensor, FakeBroker, FakeDelay, FakeLink, FixedSensor, RelayBank, delays,
    manifest, new_log, node_config, publishes, publishes_to,
};

type Outputs = SharedOutputs<NoopRawMutex, RelayBank>;

fn sampler<'a>() -> TelemetrySampler<'a> {
    TelemetrySampler::new()
        .with_source(FixedSensor::numeric("cr", 80))
        .with_source(FixedSensor::numeric("t", 21_500))
        .with_source(FailingSensor("p"))
}

#[test]
fn startup_announces_before_first_telemetry() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        FakeBroker::new(&log),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(async {
        node.start().await;
        node.tick().await;
    });

    let events = log.borrow().clone();
    assert!(matches!(events[0], Event::Join));
    assert!(matches!(events[1], Event::Connect { .. }));
    assert_eq!(events[2], Event::Subscribe("rabbitf3-call".to_string()));
    assert!(matches!(&events[3], Event::Publish { topic, .. } if topic == "discovery"));
    assert_eq!(events[4], Event::Delay(2000));
    assert!(matches!(&events[5], Event::Publish { topic, .. } if topic == "rabbitf3"));
    assert!(matches!(&events[6], Event::Publish { topic, .. } if topic == "rabbitf3/outputs"));

    assert_eq!(
        publishes_to(&log, "rabbitf3"),
        vec![r#"{"cr":80,"t":21500,"p":null}"#]
    );
    assert_eq!(
        publishes_to(&log, "rabbitf3/outputs"),
        vec![r#"{"relay1":"OFF","relay2":"OFF","relay3":"OFF","relay4":"OFF"}"#]
    );
    let manifest_json = &publishes_to(&log, "discovery")[0];
    assert!(manifest_json.starts_with(r#"{"id":"rabbitf3","name":"Rabbit Feeder Supreme""#));
}

#[test]
fn inbound_relay_command_publishes_outputs_immediately() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::yielding(&log, 3),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(async {
        node.start().await;
        node.tick().await;
    });
    broker.deliver(
        "rabbitf3-call",
        r#"[{"name":"relay","params":[{"r":"2"},{"s":"on"}]}]"#,
    );
    block_on(node.idle());

    let states = publishes_to(&log, "rabbitf3/outputs");
    assert_eq!(states.len(), 2);
    assert!(states[1].contains(r#""relay3":"ON""#));
    assert!(states[1].contains(r#""relay2":"OFF""#));
    assert_eq!(delays(&log), vec![2000, 60_000]);
}

#[test]
fn info_request_repeats_manifest() {
    let log = new_log();
    let config = node_config().with_discovery(DiscoveryMode::ShortManifest);
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::yielding(&log, 2),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());
    broker.deliver("rabbitf3-call", r#"{"name":"info"}"#);
    block_on(node.idle());

    let announcements = publishes_to(&log, "discovery");
    assert_eq!(announcements.len(), 2);
    assert_eq!(
        announcements[0],
        r#"{"id":"rabbitf3","name":"Rabbit Feeder Supreme"}"#
    );
    assert!(announcements[1].contains(r#""methods":"#));
}

#[test]
fn dropped_publish_does_not_stop_the_loop() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());
    // telemetry, then the re-announcement on the reopened session and its retry
    broker.fail_publishes(3);
    block_on(node.tick());

    assert_eq!(node.session().state(), SessionState::Disconnected);
    assert!(publishes_to(&log, "rabbitf3").is_empty());

    block_on(async {
        node.idle().await;
        node.tick().await;
    });

    assert!(node.session().is_ready());
    assert_eq!(publishes_to(&log, "rabbitf3").len(), 1);
    assert_eq!(publishes_to(&log, "discovery").len(), 2);
}

#[test]
fn reopened_session_is_announced_before_telemetry() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());
    broker.fail_publishes(1);
    block_on(node.tick());

    let topics: Vec<_> = publishes(&log).into_iter().map(|(topic, _)| topic).collect();
    assert_eq!(
        topics,
        vec!["discovery", "discovery", "rabbitf3", "rabbitf3/outputs"]
    );
    assert_eq!(delays(&log), vec![2000, 2000]);

    let events = log.borrow().clone();
    let last_connect = events
        .iter()
        .rposition(|event| matches!(event, Event::Connect { .. }))
        .unwrap();
    let last_discovery = events
        .iter()
        .rposition(|event| matches!(event, Event::Publish { topic, .. } if topic == "discovery"))
        .unwrap();
    let telemetry = events
        .iter()
        .position(|event| matches!(event, Event::Publish { topic, .. } if topic == "rabbitf3"))
        .unwrap();
    assert!(last_connect < last_discovery);
    assert!(last_discovery < telemetry);
    assert!(node.session().is_ready());
}

#[test]
fn reopen_during_startup_announces_again() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    broker.fail_publishes(1);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(async {
        node.start().await;
        node.tick().await;
    });

    let events = log.borrow().clone();
    let last_connect = events
        .iter()
        .rposition(|event| matches!(event, Event::Connect { .. }))
        .unwrap();
    let last_discovery = events
        .iter()
        .rposition(|event| matches!(event, Event::Publish { topic, .. } if topic == "discovery"))
        .unwrap();
    let telemetry = events
        .iter()
        .position(|event| matches!(event, Event::Publish { topic, .. } if topic == "rabbitf3"))
        .unwrap();
    assert!(last_connect < last_discovery);
    assert!(last_discovery < telemetry);
    assert_eq!(publishes_to(&log, "discovery").len(), 2);
    assert_eq!(publishes_to(&log, "rabbitf3").len(), 1);
}

#[test]
fn lost_inbound_traffic_reopens_on_next_cycle() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker.clone(),
        FakeDelay::yielding(&log, 2),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());
    broker
        .script
        .borrow_mut()
        .inbound
        .push_back(Err(BrokerError::Closed));
    block_on(node.idle());

    assert_eq!(node.session().state(), SessionState::Disconnected);
    assert!(log.borrow().contains(&Event::Disconnect));

    block_on(node.tick());

    assert!(node.session().is_ready());
    assert_eq!(publishes_to(&log, "discovery").len(), 2);
    assert_eq!(publishes_to(&log, "rabbitf3").len(), 1);
}

#[test]
fn manifest_and_registration_announces_manifest_first() {
    let log = new_log();
    let config = node_config().with_discovery(DiscoveryMode::ManifestAndRegistration);
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        FakeBroker::new(&log),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());

    let topics: Vec<_> = publishes(&log).into_iter().map(|(topic, _)| topic).collect();
    assert_eq!(topics.len(), 8);
    assert_eq!(topics[0], "discovery");
    assert!(topics[1..].iter().all(|topic| topic.ends_with("/config")));
    assert_eq!(topics[1], "homeassistant/sensor/rabbitf3_cr/config");
    assert_eq!(topics[7], "homeassistant/switch/rabbitf3_relay4/config");
}

#[test]
fn dropped_manifest_skips_registration() {
    let log = new_log();
    let config = node_config().with_discovery(DiscoveryMode::ManifestAndRegistration);
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let broker = FakeBroker::new(&log);
    broker.fail_publishes(2);
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        broker,
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());

    assert!(publishes(&log).is_empty());
    assert_eq!(node.session().state(), SessionState::Disconnected);
}

#[test]
fn registration_mode_publishes_one_record_per_entity() {
    let log = new_log();
    let config = node_config()
        .with_discovery(DiscoveryMode::Registration)
        .with_availability(true);
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        FakeLink::new(&log),
        FakeBroker::new(&log),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());

    let records: Vec<_> = publishes(&log)
        .into_iter()
        .filter(|(topic, _)| topic.ends_with("/config"))
        .collect();
    assert_eq!(records.len(), 7);
    assert_eq!(records[0].0, "homeassistant/sensor/rabbitf3_cr/config");
    assert_eq!(records[6].0, "homeassistant/switch/rabbitf3_relay4/config");
    assert!(records[1].1.contains(r#""value_template":"{{ value_json.t / 1000 }}""#));
    assert!(records[6].1.contains(r#""availability_topic":"rabbitf3/availability""#));
    assert!(publishes_to(&log, "discovery").is_empty());
    assert_eq!(publishes_to(&log, "rabbitf3/availability"), vec!["online"]);
}

#[test]
fn failed_join_waits_for_backoff() {
    let log = new_log();
    let config = node_config();
    let manifest = manifest();
    let outputs = Outputs::new(RelayBank(vec![false; 4]));
    let link = FakeLink::new(&log);
    link.script
        .borrow_mut()
        .joins
        .push_back(Err(LinkError::Timeout));
    let mut node = ControlLoop::new(
        &config,
        &manifest,
        link.clone(),
        FakeBroker::new(&log),
        FakeDelay::new(&log),
        sampler(),
        Peripherals::new(&outputs),
    );

    block_on(node.start());

    assert_eq!(link.script.borrow().joined, 2);
    assert_eq!(delays(&log), vec![30_000, 2000]);
    assert!(node.link().is_connected());
}

#[test]
fn address_polling_is_bounded() {
    let log = new_log();
    let link = FakeLink::new(&log);
    link.script
        .borrow_mut()
        .addresses
        .extend((0..10).map(|_| Err(LinkError::NoAddress)));
    let timing = LinkTiming::from(&LinkConfig::new("burrow", "carrots"));
    let mut manager = LinkManager::new(link.clone(), FakeDelay::new(&log), timing);
    let credentials = LinkCredentials {
        ssid: "burrow",
        password: "carrots",
    };

    let address = block_on(manager.connect(&credentials, embassy_time::Duration::from_secs(10)));

    assert_eq!(address, Ok(support::address()));
    assert_eq!(link.script.borrow().joined, 2);
    let mut expected = vec![1000; 10];
    expected.push(30_000);
    assert_eq!(delays(&log), expected);
}

#[test]
fn missing_network_name_is_reported() {
    let log = new_log();
    let link = FakeLink::new(&log);
    let timing = LinkTiming::from(&LinkConfig::new("", ""));
    let mut manager = LinkManager::new(link, FakeDelay::new(&log), timing);
    let credentials = LinkCredentials {
        ssid: "",
        password: "",
    };

    let result = block_on(manager.connect(&credentials, embassy_time::Duration::from_secs(10)));

    assert_eq!(result, Err(LinkError::MissingCredentials));
    assert!(log.borrow().is_empty());
    assert!(!manager.is_connected());
}
