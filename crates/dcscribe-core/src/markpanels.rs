//! Mark panel stream and initial snapshot tasks.
//!
//! Live add and change events carry the mark's text and visibility scope
//! but not its position. Each one is resolved against a fresh snapshot
//! before it is queued; a mark missing from the snapshot was removed in the
//! meantime and its event is dropped.

use std::sync::Arc;

use dcscribe_types::{Change, MarkPanel, MarkPanelChange, MarkPanelEvent};
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::cancel::CancelScope;
use crate::error::TaskError;
use crate::stream::{StreamConsumer, StreamError};

/// Complete a live change with the position of the mark it refers to.
///
/// Returns `Ok(None)` when the mark is no longer present.
///
/// # Errors
///
/// Returns the snapshot query's [`StreamError`].
pub async fn resolve(
    consumer: &dyn StreamConsumer,
    change: MarkPanelChange,
) -> Result<Option<MarkPanel>, StreamError> {
    let snapshot = consumer.markpanels().await?;
    Ok(snapshot
        .into_iter()
        .find(|panel| panel.id == change.id)
        .map(|found| MarkPanel {
            id: change.id,
            time: change.time,
            position: found.position,
            text: change.text,
            initiator: change.initiator,
            visibility: change.visibility,
        }))
}

/// Forward mark panel events onto the mark panel accumulator's queue.
///
/// # Errors
///
/// Returns [`TaskError::Stream`] if the stream fails and
/// [`TaskError::StreamEnded`] if it runs dry.
pub async fn stream_markpanels(
    session: Arc<str>,
    consumer: Arc<dyn StreamConsumer>,
    queue: UnboundedSender<Change<MarkPanel>>,
    scope: CancelScope,
) -> Result<(), TaskError> {
    let mut events = tokio::select! {
        () = scope.cancelled() => return Ok(()),
        opened = consumer.stream_markpanels() => opened?,
    };
    info!(session = %session, "Streaming mark panels");

    loop {
        let event = tokio::select! {
            () = scope.cancelled() => return Ok(()),
            next = events.next() => next,
        };
        let live = match event {
            Some(Ok(MarkPanelEvent::Added(live) | MarkPanelEvent::Changed(live))) => live,
            Some(Ok(MarkPanelEvent::Removed { id })) => {
                debug!(session = %session, id, "Mark panel removed");
                if queue.send(Change::Remove(id)).is_err() {
                    return Ok(());
                }
                continue;
            }
            Some(Err(e)) => return Err(e.into()),
            None => return Err(TaskError::StreamEnded),
        };

        let id = live.id;
        let resolved = tokio::select! {
            () = scope.cancelled() => return Ok(()),
            resolved = resolve(consumer.as_ref(), live) => resolved,
        };
        match resolved {
            Ok(Some(panel)) => {
                debug!(session = %session, id, "Mark panel updated");
                if queue.send(Change::Upsert(panel)).is_err() {
                    return Ok(());
                }
            }
            Ok(None) => debug!(session = %session, id, "Mark panel vanished before lookup"),
            Err(e) => warn!(session = %session, id, error = %e, "Mark panel lookup failed"),
        }
    }
}

/// Queue every mark panel present when the session connects.
///
/// After loading, the task waits for cancellation so that finishing the
/// load is not mistaken for a lost connection.
///
/// # Errors
///
/// Never returns an error; a failed snapshot is logged and the live
/// stream still delivers new marks.
pub async fn load_markpanels(
    session: Arc<str>,
    consumer: Arc<dyn StreamConsumer>,
    queue: UnboundedSender<Change<MarkPanel>>,
    scope: CancelScope,
) -> Result<(), TaskError> {
    let snapshot = tokio::select! {
        () = scope.cancelled() => return Ok(()),
        snapshot = consumer.markpanels() => snapshot,
    };
    match snapshot {
        Ok(panels) => {
            info!(session = %session, count = panels.len(), "Loaded mark panels");
            for panel in panels {
                if queue.send(Change::Upsert(panel)).is_err() {
                    break;
                }
            }
        }
        Err(StreamError::Cancelled) => return Ok(()),
        Err(e) => warn!(session = %session, error = %e, "Failed to load mark panels"),
    }
    scope.cancelled().await;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use dcscribe_types::{Position, Visibility};
    use tokio::sync::mpsc;

    use super::*;
    use crate::testing::MockConsumer;

    fn panel(id: u32, text: &str, visibility: Visibility) -> MarkPanel {
        MarkPanel {
            id,
            time: 120.0,
            position: Position::new(41.5, 42.5),
            text: text.to_owned(),
            initiator: Some("Uzi11".to_owned()),
            visibility,
        }
    }

    fn live(id: u32, text: &str, visibility: Visibility) -> MarkPanelChange {
        MarkPanelChange {
            id,
            time: 130.0,
            text: text.to_owned(),
            initiator: Some("Uzi11".to_owned()),
            visibility,
        }
    }

    #[tokio::test]
    async fn resolve_takes_position_from_snapshot_and_the_rest_from_the_event() {
        let consumer = MockConsumer::default();
        consumer.set_markpanels(Ok(vec![panel(3, "old", Visibility::Global)]));

        let resolved = resolve(&consumer, live(3, "new", Visibility::Coalition(2)))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.position, Position::new(41.5, 42.5));
        assert_eq!(resolved.text, "new");
        assert!((resolved.time - 130.0).abs() < f64::EPSILON);
        assert_eq!(resolved.visibility, Visibility::Coalition(2));
    }

    #[tokio::test]
    async fn resolve_of_missing_mark_is_none() {
        let consumer = MockConsumer::default();
        let resolved = resolve(&consumer, live(9, "gone", Visibility::Global)).await;
        assert_eq!(resolved, Ok(None));
    }

    #[tokio::test]
    async fn stream_resolves_drops_and_removes() {
        let consumer = Arc::new(MockConsumer::default());
        consumer.set_markpanels(Ok(vec![panel(1, "x", Visibility::Global)]));
        let feed = consumer.feed_markpanels();
        feed.send(Ok(MarkPanelEvent::Added(live(1, "SAM", Visibility::Group(7)))))
            .unwrap();
        feed.send(Ok(MarkPanelEvent::Changed(live(2, "lost", Visibility::Global))))
            .unwrap();
        feed.send(Ok(MarkPanelEvent::Removed { id: 1 })).unwrap();
        drop(feed);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result =
            stream_markpanels(Arc::from("test"), consumer, tx, CancelScope::new()).await;
        assert_eq!(result, Err(TaskError::StreamEnded));

        let expected = MarkPanel {
            time: 130.0,
            ..panel(1, "SAM", Visibility::Group(7))
        };
        assert_eq!(rx.recv().await.unwrap(), Change::Upsert(expected));
        assert_eq!(rx.recv().await.unwrap(), Change::Remove(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn failed_lookup_keeps_streaming() {
        let consumer = Arc::new(MockConsumer::default());
        consumer.set_markpanels(Err(StreamError::Other("busy".to_owned())));
        let feed = consumer.feed_markpanels();
        feed.send(Ok(MarkPanelEvent::Added(live(1, "a", Visibility::Global))))
            .unwrap();
        feed.send(Ok(MarkPanelEvent::Removed { id: 4 })).unwrap();
        drop(feed);

        let (tx, mut rx) = mpsc::unbounded_channel();
        let result =
            stream_markpanels(Arc::from("test"), consumer, tx, CancelScope::new()).await;
        assert_eq!(result, Err(TaskError::StreamEnded));
        assert_eq!(rx.recv().await.unwrap(), Change::Remove(4));
    }

    #[tokio::test(start_paused = true)]
    async fn initial_load_queues_everything_then_parks() {
        let consumer = Arc::new(MockConsumer::default());
        consumer.set_markpanels(Ok(vec![
            panel(1, "a", Visibility::Global),
            panel(2, "b", Visibility::Coalition(1)),
        ]));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let scope = CancelScope::new();

        let task = tokio::spawn(load_markpanels(
            Arc::from("test"),
            consumer,
            tx,
            scope.clone(),
        ));
        tokio::time::sleep(Duration::from_secs(30)).await;

        assert_eq!(
            rx.recv().await.unwrap(),
            Change::Upsert(panel(1, "a", Visibility::Global))
        );
        assert_eq!(
            rx.recv().await.unwrap(),
            Change::Upsert(panel(2, "b", Visibility::Coalition(1)))
        );
        assert!(!task.is_finished());

        scope.cancel();
        assert_eq!(task.await.unwrap(), Ok(()));
    }
}
