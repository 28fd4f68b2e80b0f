//! The live unit stream task.

use std::sync::Arc;

use dcscribe_types::{Change, Unit, UnitEvent};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::cancel::CancelScope;
use crate::error::TaskError;
use crate::stream::StreamConsumer;

/// Forward unit events onto the unit accumulator's queue.
///
/// Returns `Ok` when `scope` is cancelled. Any other exit means the live
/// connection is gone.
///
/// # Errors
///
/// Returns [`TaskError::Stream`] if the stream fails and
/// [`TaskError::StreamEnded`] if it runs dry.
pub async fn stream_units(
    session: Arc<str>,
    consumer: Arc<dyn StreamConsumer>,
    poll_rate: u32,
    queue: UnboundedSender<Change<Unit>>,
    scope: CancelScope,
) -> Result<(), TaskError> {
    let mut events = tokio::select! {
        () = scope.cancelled() => return Ok(()),
        opened = consumer.stream_units(poll_rate) => opened?,
    };
    info!(session = %session, poll_rate, "Streaming units");

    loop {
        let event = tokio::select! {
            () = scope.cancelled() => return Ok(()),
            next = events.next() => next,
        };
        let change = match event {
            Some(Ok(UnitEvent::Updated(unit))) => {
                debug!(session = %session, id = unit.id, name = %unit.name, "Unit updated");
                Change::Upsert(unit)
            }
            Some(Ok(UnitEvent::Gone { id, name })) => {
                debug!(session = %session, id, name = %name, "Unit gone");
                Change::Remove(id)
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TaskError::StreamEnded),
        };
        // The accumulator only goes away during teardown.
        if queue.send(change).is_err() {
            return Ok(());
        }
    }
}
