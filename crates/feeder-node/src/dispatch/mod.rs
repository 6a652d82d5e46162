//! Inbound command dispatch
//!
//! Two command profiles share one dispatcher:
//!
//! - **Batch**: JSON command lists on `<device-id>-call`, resolved against the
//!   manifest's method table
//! - **Routed**: one switch per topic, `<namespace>/switch/<device-id>_relayN/set`
//!   with a bare `ON`/`OFF` payload
//!
//! The dispatcher never publishes itself. It reports what has to be published
//! in a [`DispatchOutcome`] and the control loop sends it through the session.

mod batch;
mod routed;

use core::fmt;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;
use log::{debug, info, warn};

use crate::config::{NodeConfig, Topics};
use crate::domain::{
    Command, DeviceManifest, MethodAction, ParamValue, PeerAnnouncement, SensorValue, ValueRecord,
};
use crate::error::{CommandParamError, FeedError, MemoryError, OutputError, SensorReadError};
use crate::outputs::OutputControl;
use crate::ports::{Clock, Feeder, InboundMessage, MemoryStore};

/// How commands reach the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandProfile {
    Batch,
    Routed,
}

/// Collaborators lent to the dispatcher
pub struct Peripherals<'a> {
    pub outputs: &'a dyn OutputControl,
    pub memory: Option<Box<dyn MemoryStore + 'a>>,
    pub clock: Option<Box<dyn Clock + 'a>>,
    pub feeder: Option<Box<dyn Feeder + 'a>>,
}

impl<'a> Peripherals<'a> {
    pub fn new(outputs: &'a dyn OutputControl) -> Self {
        Self {
            outputs,
            memory: None,
            clock: None,
            feeder: None,
        }
    }

    #[must_use]
    pub fn with_memory(mut self, memory: impl MemoryStore + 'a) -> Self {
        self.memory = Some(Box::new(memory));
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'a) -> Self {
        self.clock = Some(Box::new(clock));
        self
    }

    #[must_use]
    pub fn with_feeder(mut self, feeder: impl Feeder + 'a) -> Self {
        self.feeder = Some(Box::new(feeder));
        self
    }
}

/// Follow-up work requested by one inbound message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    /// Commands that ran to completion
    pub executed: usize,
    /// Commands that were ignored or rejected
    pub skipped: usize,
    /// Re-announce the full manifest
    pub announce: bool,
    /// Publish the output state out of cycle
    pub publish_outputs: bool,
    /// Records to publish on the reply channel
    pub replies: Vec<ValueRecord>,
}

/// Reason a resolved command was not executed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Param(CommandParamError),
    Output(OutputError),
    Memory(MemoryError),
    Clock(SensorReadError),
    Feed(FeedError),
    /// The collaborator the method needs is not fitted
    Unsupported(&'static str),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Param(e) => write!(f, "{}", e),
            Rejection::Output(e) => write!(f, "{}", e),
            Rejection::Memory(e) => write!(f, "{}", e),
            Rejection::Clock(e) => write!(f, "clock: {}", e),
            Rejection::Feed(e) => write!(f, "{}", e),
            Rejection::Unsupported(what) => write!(f, "no {} fitted", what),
        }
    }
}

impl From<CommandParamError> for Rejection {
    fn from(e: CommandParamError) -> Self {
        Rejection::Param(e)
    }
}

impl From<OutputError> for Rejection {
    fn from(e: OutputError) -> Self {
        Rejection::Output(e)
    }
}

impl From<MemoryError> for Rejection {
    fn from(e: MemoryError) -> Self {
        Rejection::Memory(e)
    }
}

impl From<FeedError> for Rejection {
    fn from(e: FeedError) -> Self {
        Rejection::Feed(e)
    }
}

pub struct CommandDispatcher<'a> {
    manifest: &'a DeviceManifest,
    topics: &'a Topics,
    device_id: &'a str,
    profile: CommandProfile,
    listen_for_peers: bool,
    peripherals: Peripherals<'a>,
}

impl<'a> CommandDispatcher<'a> {
    pub fn new(
        manifest: &'a DeviceManifest,
        config: &'a NodeConfig,
        peripherals: Peripherals<'a>,
    ) -> Self {
        Self {
            manifest,
            topics: config.topics(),
            device_id: &config.device_id,
            profile: config.commands,
            listen_for_peers: config.listen_for_peers,
            peripherals,
        }
    }

    pub fn profile(&self) -> CommandProfile {
        self.profile
    }

    /// Subscription filters the dispatcher handles
    pub fn subscriptions(&self) -> Vec<String> {
        let mut filters = vec![match self.profile {
            CommandProfile::Batch => self.topics.commands.clone(),
            CommandProfile::Routed => self.topics.switch_commands.clone(),
        }];
        if self.listen_for_peers {
            filters.push(self.topics.discovery.clone());
        }
        filters
    }

    /// Decode and execute one inbound message
    pub fn handle(&mut self, message: &InboundMessage) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        if message.topic == self.topics.discovery {
            self.note_peer(&message.payload);
            return outcome;
        }

        match self.profile {
            CommandProfile::Batch if message.topic == self.topics.commands => {
                batch::handle(self, &message.payload, &mut outcome);
            }
            CommandProfile::Routed => routed::handle(self, message, &mut outcome),
            CommandProfile::Batch => {
                debug!("dispatch: no handler for '{}'", message.topic);
            }
        }
        outcome
    }

    /// Resolve a command against the manifest and execute it
    pub fn execute(&mut self, command: &Command, outcome: &mut DispatchOutcome) {
        let Some(method) = self.manifest.resolve(&command.name) else {
            debug!("dispatch: ignoring unknown method '{}'", command.name);
            outcome.skipped += 1;
            return;
        };
        let action = method.action;

        match self.run(action, command, outcome) {
            Ok(()) => {
                debug!("dispatch: '{}' executed", command.name);
                outcome.executed += 1;
                if action.changes_outputs() {
                    outcome.publish_outputs = true;
                }
            }
            Err(e) => {
                warn!("dispatch: '{}' skipped: {}", command.name, e);
                outcome.skipped += 1;
            }
        }
    }

    fn run(
        &mut self,
        action: MethodAction,
        command: &Command,
        outcome: &mut DispatchOutcome,
    ) -> Result<(), Rejection> {
        match action {
            MethodAction::Info => {
                outcome.announce = true;
                Ok(())
            }
            MethodAction::Relay => {
                let index = command.typed_param("r", ParamValue::as_index)?;
                let on = command.typed_param("s", ParamValue::as_switch)?;
                self.switch_output(index, on)
            }
            MethodAction::GetMemory => {
                let dump = self.read_memory()?;
                outcome.replies.push(reply(&command.name, SensorValue::Bytes(dump)));
                Ok(())
            }
            MethodAction::SetMemory => {
                let position = command.typed_param("p", ParamValue::as_index)?;
                let data = command.typed_param("v", ParamValue::as_bytes)?;
                let memory = self
                    .peripherals
                    .memory
                    .as_mut()
                    .ok_or(Rejection::Unsupported("memory"))?;
                memory.write(position, &data)?;
                let dump = self.read_memory()?;
                outcome.replies.push(reply(&command.name, SensorValue::Bytes(dump)));
                Ok(())
            }
            MethodAction::GetClock => {
                let clock = self
                    .peripherals
                    .clock
                    .as_mut()
                    .ok_or(Rejection::Unsupported("clock"))?;
                let now = clock.now().map_err(Rejection::Clock)?;
                outcome.replies.push(reply(&command.name, SensorValue::Timestamp(now)));
                Ok(())
            }
            MethodAction::Feed => {
                let portions = match command.optional_param("n") {
                    Some(value) => value
                        .as_byte()
                        .ok_or(Rejection::Param(CommandParamError::Invalid("n")))?,
                    None => 1,
                };
                let feeder = self
                    .peripherals
                    .feeder
                    .as_mut()
                    .ok_or(Rejection::Unsupported("feeder"))?;
                feeder.request_feed(portions)?;
                info!("dispatch: feeding {} portion(s)", portions);
                Ok(())
            }
        }
    }

    fn switch_output(&mut self, index: usize, on: bool) -> Result<(), Rejection> {
        self.peripherals.outputs.set(index, on)?;
        info!(
            "dispatch: output {} ({}) -> {}",
            index,
            crate::domain::output_key(index),
            if on { "ON" } else { "OFF" }
        );
        Ok(())
    }

    fn read_memory(&mut self) -> Result<Vec<u8>, Rejection> {
        let memory = self
            .peripherals
            .memory
            .as_mut()
            .ok_or(Rejection::Unsupported("memory"))?;
        let mut dump = vec![0u8; memory.capacity()];
        memory.read(0, &mut dump)?;
        Ok(dump)
    }

    fn note_peer(&self, payload: &[u8]) {
        match serde_json::from_slice::<PeerAnnouncement>(payload) {
            Ok(peer) if peer.id == self.device_id => {}
            Ok(peer) => info!("dispatch: peer '{}' ({}) announced", peer.id, peer.name),
            Err(_) => debug!("dispatch: unreadable announcement on discovery channel"),
        }
    }
}

fn reply(method: &str, value: SensorValue) -> ValueRecord {
    ValueRecord {
        id: method.to_string(),
        value,
    }
}
