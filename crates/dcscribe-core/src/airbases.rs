//! Periodic airbase snapshot task.

use std::sync::Arc;
use std::time::Duration;

use dcscribe_db::{DbError, Table};
use dcscribe_types::Airbase;
use tracing::{debug, error, info, warn};

use crate::accumulator::Prepare;
use crate::cancel::CancelScope;
use crate::error::TaskError;
use crate::stream::{StreamConsumer, StreamError};
use crate::symbols::Symbolizer;

/// Replace the airbase table with a fresh snapshot every `interval`.
///
/// An empty snapshot means the session has no data yet and leaves the
/// table alone. Failures are logged and the loop keeps its schedule.
///
/// # Errors
///
/// Never returns an error; the result type is shared with the other
/// session tasks.
pub async fn poll_airbases(
    session: Arc<str>,
    consumer: Arc<dyn StreamConsumer>,
    table: Arc<dyn Table<Airbase>>,
    symbolizer: Symbolizer,
    interval: Duration,
    scope: CancelScope,
) -> Result<(), TaskError> {
    while !scope.is_cancelled() {
        let snapshot = tokio::select! {
            () = scope.cancelled() => break,
            snapshot = consumer.airbases() => snapshot,
        };

        match snapshot {
            Ok(airbases) => {
                let airbases: Vec<Airbase> = airbases
                    .into_iter()
                    .filter_map(|airbase| symbolizer.prepare(airbase))
                    .collect();
                if airbases.is_empty() {
                    debug!(session = %session, "No airbases yet");
                } else if let Err(e) = replace(table.as_ref(), &airbases).await {
                    warn!(session = %session, error = %e, "Failed to write airbases");
                } else {
                    info!(
                        session = %session,
                        count = airbases.len(),
                        "Wrote {} airbase(s)",
                        airbases.len()
                    );
                }
            }
            Err(StreamError::Cancelled) => {
                info!(session = %session, "Airbase query cancelled");
            }
            Err(e) if e.is_transport() => {
                warn!(session = %session, error = %e, "Airbase query failed");
            }
            Err(e) => {
                error!(session = %session, error = %e, "Unexpected airbase query failure");
            }
        }

        tokio::select! {
            () = scope.cancelled() => break,
            () = tokio::time::sleep(interval) => {}
        }
    }
    Ok(())
}

async fn replace(table: &dyn Table<Airbase>, airbases: &[Airbase]) -> Result<(), DbError> {
    table.truncate().await?;
    table.upsert(airbases).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dcscribe_db::{MemoryTable, TableCall};
    use dcscribe_symbology::{Encyclopedia, Symbology};
    use dcscribe_types::{AirbaseCategory, Coalition, Position};

    use super::*;
    use crate::testing::MockConsumer;

    const INTERVAL: Duration = Duration::from_secs(60);

    fn airbase(name: &str) -> Airbase {
        Airbase {
            name: name.to_owned(),
            callsign: name.to_owned(),
            position: Position::new(41.6, 41.6),
            altitude: 10.0,
            category: AirbaseCategory::Aerodrome,
            airbase_type: name.to_owned(),
            coalition: Coalition::Friendly,
            symbology: Symbology::new(2),
        }
    }

    fn spawn(
        consumer: &Arc<MockConsumer>,
    ) -> (
        Arc<MemoryTable<Airbase>>,
        CancelScope,
        tokio::task::JoinHandle<Result<(), TaskError>>,
    ) {
        let table = Arc::new(MemoryTable::new());
        let scope = CancelScope::new();
        let symbolizer = Symbolizer::new(Arc::from("test"), Arc::new(Encyclopedia::default()));
        let handle = tokio::spawn(poll_airbases(
            Arc::from("test"),
            Arc::clone(consumer) as Arc<dyn StreamConsumer>,
            Arc::clone(&table) as Arc<dyn Table<Airbase>>,
            symbolizer,
            INTERVAL,
            scope.clone(),
        ));
        (table, scope, handle)
    }

    #[tokio::test(start_paused = true)]
    async fn empty_snapshot_skips_the_write() {
        let consumer = Arc::new(MockConsumer::default());
        consumer.reply_airbases(Ok(Vec::new()));
        consumer.reply_airbases(Ok(vec![airbase("Batumi"), airbase("Kobuleti")]));
        let (table, scope, handle) = spawn(&consumer);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(MockConsumer::count(&consumer.airbase_calls), 1);
        assert!(table.calls().await.is_empty());

        tokio::time::sleep(INTERVAL).await;
        assert_eq!(MockConsumer::count(&consumer.airbase_calls), 2);
        let calls = table.calls().await;
        assert_eq!(calls.len(), 2);
        assert_eq!(calls.first(), Some(&TableCall::Truncate));
        assert_eq!(table.rows().await.len(), 2);

        scope.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_timer() {
        let consumer = Arc::new(MockConsumer::default());
        consumer.reply_airbases(Err(StreamError::Transport("timeout".to_owned())));
        consumer.reply_airbases(Ok(vec![airbase("Batumi")]));
        consumer.reply_airbases(Ok(vec![airbase("Senaki")]));
        let (table, scope, handle) = spawn(&consumer);
        table.fail_next(1);

        // Query error, then a failed truncate, then a good write.
        tokio::time::sleep(Duration::from_secs(121)).await;
        assert_eq!(MockConsumer::count(&consumer.airbase_calls), 3);
        assert_eq!(table.rows().await, vec![airbase("Senaki")]);

        scope.cancel();
        handle.await.unwrap().unwrap();
    }
}
