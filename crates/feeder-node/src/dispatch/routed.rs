//! Topic-routed command profile: `<namespace>/switch/<device-id>_relayN/set`

use feeder_homeassistant::SwitchCommand;
use feeder_homeassistant::ha;
use log::{debug, warn};

use super::{CommandDispatcher, DispatchOutcome};
use crate::domain::parse_output_key;
use crate::ports::InboundMessage;

pub(super) fn handle(
    dispatcher: &mut CommandDispatcher<'_>,
    message: &InboundMessage,
    outcome: &mut DispatchOutcome,
) {
    let Some(index) = target_output(dispatcher, &message.topic) else {
        debug!("dispatch: '{}' is not a switch command", message.topic);
        return;
    };
    let Some(command) = SwitchCommand::parse(&message.payload) else {
        warn!("dispatch: unknown switch payload on '{}'", message.topic);
        outcome.skipped += 1;
        return;
    };

    match dispatcher.switch_output(index, command.is_on()) {
        Ok(()) => {
            outcome.executed += 1;
            outcome.publish_outputs = true;
        }
        Err(e) => {
            warn!("dispatch: '{}' skipped: {}", message.topic, e);
            outcome.skipped += 1;
        }
    }
}

/// Output index addressed by a command topic of this device
fn target_output(dispatcher: &CommandDispatcher<'_>, topic: &str) -> Option<usize> {
    let object = ha::parse_command_topic(topic, &dispatcher.topics.namespace, "switch")?;
    let key = object
        .strip_prefix(dispatcher.device_id)?
        .strip_prefix('_')?;
    parse_output_key(key)
}
