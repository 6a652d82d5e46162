//! Integration tests for the broker session state machine.

mod support;

use std::cell::RefCell;

use embassy_futures::block_on;
use feeder_node::error::{BrokerError, SessionError};
use feeder_node::session::{ReopenHook, SessionConfig};
use feeder_node::{SessionManager, SessionState};
use proptest::prelude::*;
use support::{Event, FakeBroker, Log, new_log, publishes, publishes_to};

fn session(log: &Log) -> (FakeBroker, SessionManager<FakeBroker>) {
    let broker = FakeBroker::new(log);
    let mut session = SessionManager::new(broker.clone(), SessionConfig::new("rabbitf3"));
    session.register("rabbitf3-call");
    (broker, session)
}

// -----------------------------------------------------------------------------
// Opening
// -----------------------------------------------------------------------------

#[test]
fn open_connects_then_subscribes() {
    let log = new_log();
    let (_broker, mut session) = session(&log);
    session.register("discovery");

    block_on(session.open()).unwrap();

    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.take_established());
    assert!(!session.take_established());
    assert_eq!(
        *log.borrow(),
        vec![
            Event::Connect {
                client_id: "rabbitf3".to_string(),
                will: None
            },
            Event::Subscribe("rabbitf3-call".to_string()),
            Event::Subscribe("discovery".to_string()),
        ]
    );
}

#[test]
fn refused_connect_leaves_session_disconnected() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    broker
        .script
        .borrow_mut()
        .connects
        .push_back(Err(BrokerError::Rejected));

    let result = block_on(session.open());

    assert_eq!(result, Err(SessionError::Connect(BrokerError::Rejected)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(!session.take_established());
}

#[test]
fn refused_subscription_leaves_session_disconnected() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    broker
        .script
        .borrow_mut()
        .subscribes
        .push_back(Err(BrokerError::Rejected));

    let result = block_on(session.open());

    assert_eq!(result, Err(SessionError::Subscribe(BrokerError::Rejected)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(log.borrow().last(), Some(&Event::Disconnect));
}

#[test]
fn availability_sets_will_and_birth() {
    let log = new_log();
    let broker = FakeBroker::new(&log);
    let mut config = SessionConfig::new("rabbitf3");
    config.availability_topic = Some("rabbitf3/availability".to_string());
    let mut session = SessionManager::new(broker, config);

    block_on(session.open()).unwrap();

    assert_eq!(
        log.borrow()[0],
        Event::Connect {
            client_id: "rabbitf3".to_string(),
            will: Some("rabbitf3/availability".to_string())
        }
    );
    assert_eq!(
        log.borrow().last(),
        Some(&Event::Publish {
            topic: "rabbitf3/availability".to_string(),
            payload: b"online".to_vec(),
            retain: true
        })
    );
}

// -----------------------------------------------------------------------------
// Publishing
// -----------------------------------------------------------------------------

#[test]
fn publish_before_open_fails_fast() {
    let log = new_log();
    let (_broker, mut session) = session(&log);

    let result = block_on(session.publish("rabbitf3", b"{}"));

    assert_eq!(result, Err(SessionError::NotReady));
    assert!(log.borrow().is_empty());
}

#[test]
fn single_failure_is_retried_once() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    session.take_established();
    broker.fail_publishes(1);

    block_on(session.publish("rabbitf3", br#"{"cr":80}"#)).unwrap();

    assert_eq!(publishes_to(&log, "rabbitf3"), vec![r#"{"cr":80}"#]);
    assert_eq!(session.state(), SessionState::Ready);
    assert!(session.take_established());
    let connects = log
        .borrow()
        .iter()
        .filter(|event| matches!(event, Event::Connect { .. }))
        .count();
    assert_eq!(connects, 2);
}

#[test]
fn double_failure_drops_payload() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    broker.fail_publishes(2);

    let result = block_on(session.publish("rabbitf3", b"{}"));

    assert_eq!(result, Err(SessionError::Dropped(BrokerError::Transport)));
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(publishes(&log).is_empty());

    // the next open starts from a clean slate
    block_on(session.open()).unwrap();
    block_on(session.publish("rabbitf3", b"{}")).unwrap();
    assert_eq!(publishes(&log).len(), 1);
}

/// Publishes a marker on every fresh session
struct Greeter;

impl ReopenHook<FakeBroker> for Greeter {
    async fn reopened(&mut self, session: &mut SessionManager<FakeBroker>) {
        if session.take_established() {
            session.publish("discovery", b"hello").await.unwrap();
        }
    }
}

#[test]
fn reopen_hook_runs_before_retry() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    session.take_established();
    broker.fail_publishes(1);

    block_on(session.publish_with("rabbitf3", b"{}", &mut Greeter)).unwrap();

    assert_eq!(
        publishes(&log),
        vec![
            ("discovery".to_string(), "hello".to_string()),
            ("rabbitf3".to_string(), "{}".to_string()),
        ]
    );
    assert!(!session.take_established());
}

/// Drops the session it was handed
struct Quitter;

impl ReopenHook<FakeBroker> for Quitter {
    async fn reopened(&mut self, session: &mut SessionManager<FakeBroker>) {
        session.teardown().await;
    }
}

#[test]
fn retry_is_skipped_when_hook_loses_session() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    broker.fail_publishes(1);

    let result = block_on(session.publish_with("rabbitf3", b"{}", &mut Quitter));

    assert_eq!(result, Err(SessionError::Dropped(BrokerError::Transport)));
    assert!(publishes(&log).is_empty());
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[test]
fn failed_reopen_drops_payload() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    broker.fail_publishes(1);
    broker
        .script
        .borrow_mut()
        .connects
        .push_back(Err(BrokerError::Resolve));

    let result = block_on(session.publish("rabbitf3/outputs", b"{}"));

    assert_eq!(result, Err(SessionError::Dropped(BrokerError::Transport)));
    assert_eq!(session.state(), SessionState::Disconnected);
}

// -----------------------------------------------------------------------------
// Receiving
// -----------------------------------------------------------------------------

#[test]
fn next_message_skips_unsubscribed_topics() {
    let log = new_log();
    let (broker, mut session) = session(&log);
    block_on(session.open()).unwrap();
    broker.deliver("otherf1-call", "[]");
    broker.deliver("rabbitf3-call", r#"[{"name":"info"}]"#);

    let message = block_on(session.next_message()).unwrap();

    assert_eq!(message.topic, "rabbitf3-call");
    assert_eq!(message.payload, br#"[{"name":"info"}]"#.to_vec());
}

#[test]
fn late_subscription_is_kept_for_next_open() {
    let log = new_log();
    let (_broker, mut session) = session(&log);

    assert_eq!(
        block_on(session.subscribe("discovery")),
        Err(SessionError::NotReady)
    );
    block_on(session.open()).unwrap();

    assert_eq!(session.filters(), ["rabbitf3-call", "discovery"]);
    assert!(log
        .borrow()
        .contains(&Event::Subscribe("discovery".to_string())));
}

// -----------------------------------------------------------------------------
// State machine property
// -----------------------------------------------------------------------------

thread_local! {
    static TRANSITIONS: RefCell<Vec<(SessionState, SessionState)>> =
        const { RefCell::new(Vec::new()) };
}

fn record(from: SessionState, to: SessionState) {
    TRANSITIONS.with(|transitions| transitions.borrow_mut().push((from, to)));
}

fn outcome(ok: bool) -> Result<(), BrokerError> {
    if ok { Ok(()) } else { Err(BrokerError::Transport) }
}

proptest! {
    #[test]
    fn ready_is_only_reached_through_connected(
        connects in proptest::collection::vec(any::<bool>(), 0..6),
        subscribes in proptest::collection::vec(any::<bool>(), 0..6),
        publishes in proptest::collection::vec(any::<bool>(), 0..8),
        rounds in 1usize..6,
    ) {
        TRANSITIONS.with(|transitions| transitions.borrow_mut().clear());
        let log = new_log();
        let broker = FakeBroker::new(&log);
        {
            let mut script = broker.script.borrow_mut();
            script.connects.extend(connects.into_iter().map(outcome));
            script.subscribes.extend(subscribes.into_iter().map(outcome));
            script.publishes.extend(publishes.into_iter().map(outcome));
        }
        let mut session =
            SessionManager::new(broker, SessionConfig::new("rabbitf3")).with_observer(record);
        session.register("rabbitf3-call");

        for _ in 0..rounds {
            if !session.is_ready() {
                let _ = block_on(session.open());
            }
            let _ = block_on(session.publish("rabbitf3", b"{}"));
        }

        let transitions = TRANSITIONS.with(|transitions| transitions.borrow().clone());
        let mut previous = SessionState::Disconnected;
        for (from, to) in transitions {
            prop_assert_eq!(from, previous);
            prop_assert!(from.can_advance_to(to), "{:?} -> {:?}", from, to);
            if to == SessionState::Ready {
                prop_assert_eq!(from, SessionState::SubscriptionPending);
            }
            previous = to;
        }
        prop_assert_eq!(previous, session.state());
    }
}
