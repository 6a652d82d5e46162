//! Batch command profile: JSON command lists on `<device-id>-call`

use log::warn;

use super::{CommandDispatcher, DispatchOutcome};
use crate::domain::decode_batch;

pub(super) fn handle(
    dispatcher: &mut CommandDispatcher<'_>,
    payload: &[u8],
    outcome: &mut DispatchOutcome,
) {
    let commands = match decode_batch(payload) {
        Ok(commands) => commands,
        Err(e) => {
            warn!(
                "dispatch: dropping {} byte payload: {}",
                payload.len(),
                e
            );
            return;
        }
    };

    for (position, command) in commands.iter().enumerate() {
        match command {
            Ok(command) => dispatcher.execute(command, outcome),
            Err(e) => {
                warn!("dispatch: command #{} skipped: {}", position, e);
                outcome.skipped += 1;
            }
        }
    }
}
