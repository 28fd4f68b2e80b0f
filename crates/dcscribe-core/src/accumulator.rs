//! Time-windowed batch accumulation.
//!
//! A stream task pushes [`Change`]s onto an unbounded queue. The
//! [`Accumulator`] owning the other end folds them into a [`Batch`] holding
//! the latest state per id and the ids pending deletion, and writes the
//! batch to its [`Table`] once the flush window has elapsed.
//!
//! Within one window the only ordering guarantee is last-write-wins per id.
//! A remove drops any pending update for its id; an upsert that follows a
//! remove in the same window takes the id back out of the delete set.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use dcscribe_db::{DbError, Table};
use dcscribe_types::{Change, Record};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cancel::CancelScope;
use crate::error::TaskError;

/// Sleep between polls of an empty queue.
pub const DEFAULT_IDLE_BACKOFF: Duration = Duration::from_millis(5);

/// Minimum gap between two mark panel flushes.
pub const MARKPANEL_FLUSH_GAP: Duration = Duration::from_millis(40);

/// When an accumulator writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Time that must pass since the last flush before the next one.
    pub window: Duration,
    /// Sleep after an iteration that dequeued nothing.
    pub idle_backoff: Duration,
}

impl FlushPolicy {
    /// A policy with the given window and the default idle backoff.
    pub const fn new(window: Duration) -> Self {
        Self {
            window,
            idle_backoff: DEFAULT_IDLE_BACKOFF,
        }
    }

    /// The fixed policy of the mark panel accumulator.
    pub const fn markpanels() -> Self {
        Self::new(MARKPANEL_FLUSH_GAP)
    }
}

/// Pending changes for one flush window.
#[derive(Debug, Clone)]
pub struct Batch<T: Record> {
    updates: BTreeMap<T::Id, T>,
    deletes: BTreeSet<T::Id>,
}

impl<T: Record> Default for Batch<T> {
    fn default() -> Self {
        Self {
            updates: BTreeMap::new(),
            deletes: BTreeSet::new(),
        }
    }
}

impl<T: Record> Batch<T> {
    /// An empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one change into the batch.
    pub fn apply(&mut self, change: Change<T>) {
        match change {
            Change::Upsert(record) => {
                let id = record.id();
                self.deletes.remove(&id);
                self.updates.insert(id, record);
            }
            Change::Remove(id) => {
                self.updates.remove(&id);
                self.deletes.insert(id);
            }
        }
    }

    /// Whether nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.deletes.is_empty()
    }

    /// Number of pending updates.
    pub fn update_count(&self) -> usize {
        self.updates.len()
    }

    /// Number of pending deletes.
    pub fn delete_count(&self) -> usize {
        self.deletes.len()
    }

    /// Drain the batch into `(updates, deletes)`, both ordered by id.
    ///
    /// Updates whose id is also pending deletion are dropped.
    pub fn take(&mut self) -> (Vec<T>, Vec<T::Id>) {
        let updates = std::mem::take(&mut self.updates);
        let deletes = std::mem::take(&mut self.deletes);
        let updates = updates
            .into_iter()
            .filter(|(id, _)| !deletes.contains(id))
            .map(|(_, record)| record)
            .collect();
        (updates, deletes.into_iter().collect())
    }
}

/// Per-record transformation applied just before a flush.
///
/// Returning `None` drops the record from the batch.
pub trait Prepare<T>: Send + Sync {
    /// Transform or drop one record.
    fn prepare(&self, record: T) -> Option<T>;
}

/// Writes records unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unchanged;

impl<T> Prepare<T> for Unchanged {
    fn prepare(&self, record: T) -> Option<T> {
        Some(record)
    }
}

/// Drains one change queue into one table.
pub struct Accumulator<T: Record> {
    session: Arc<str>,
    kind: &'static str,
    policy: FlushPolicy,
    table: Arc<dyn Table<T>>,
    prepare: Arc<dyn Prepare<T>>,
}

impl<T: Record> Accumulator<T> {
    /// Create an accumulator writing `kind` records of `session` to `table`.
    pub fn new(
        session: Arc<str>,
        kind: &'static str,
        policy: FlushPolicy,
        table: Arc<dyn Table<T>>,
    ) -> Self {
        Self {
            session,
            kind,
            policy,
            table,
            prepare: Arc::new(Unchanged),
        }
    }

    /// Apply `prepare` to every record before it is written.
    #[must_use]
    pub fn with_prepare(mut self, prepare: Arc<dyn Prepare<T>>) -> Self {
        self.prepare = prepare;
        self
    }

    /// Run until `scope` is cancelled.
    ///
    /// Store failures are logged and the batch for that window is dropped;
    /// they never end the loop. A closed queue is treated as empty.
    ///
    /// # Errors
    ///
    /// Never returns an error today; the signature matches the other
    /// session tasks.
    pub async fn run(
        self,
        mut queue: UnboundedReceiver<Change<T>>,
        scope: CancelScope,
    ) -> Result<(), TaskError> {
        let mut batch = Batch::new();
        let mut last_flush = Instant::now();

        while !scope.is_cancelled() {
            let dequeued = match queue.try_recv() {
                Ok(change) => {
                    batch.apply(change);
                    true
                }
                Err(_) => false,
            };

            if !batch.is_empty() && last_flush.elapsed() > self.policy.window {
                self.flush(&mut batch).await;
                last_flush = Instant::now();
            }

            if !dequeued {
                tokio::select! {
                    () = scope.cancelled() => break,
                    () = tokio::time::sleep(self.policy.idle_backoff) => {}
                }
            }
        }

        debug!(session = %self.session, kind = self.kind, "Accumulator stopped");
        Ok(())
    }

    async fn flush(&self, batch: &mut Batch<T>) {
        let (updates, deletes) = batch.take();
        let updates: Vec<T> = updates
            .into_iter()
            .filter_map(|record| self.prepare.prepare(record))
            .collect();

        if let Err(e) = self.write(&updates, &deletes).await {
            warn!(
                session = %self.session,
                kind = self.kind,
                error = %e,
                updates = updates.len(),
                deletes = deletes.len(),
                "Failed to flush batch, discarding it"
            );
        }
    }

    async fn write(&self, updates: &[T], deletes: &[T::Id]) -> Result<(), DbError> {
        if !updates.is_empty() {
            info!(
                session = %self.session,
                count = updates.len(),
                "Writing {} {}(s)",
                updates.len(),
                self.kind
            );
            self.table.upsert(updates).await?;
        }
        if !deletes.is_empty() {
            info!(
                session = %self.session,
                count = deletes.len(),
                "Deleting {} {}(s)",
                deletes.len(),
                self.kind
            );
            self.table.delete(deletes).await?;
        }
        Ok(())
    }
}

impl<T: Record> std::fmt::Debug for Accumulator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Accumulator")
            .field("session", &self.session)
            .field("kind", &self.kind)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dcscribe_db::{MemoryTable, TableCall};
    use dcscribe_types::{MarkPanel, Position, Visibility};
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;

    use super::*;

    fn panel(id: u32, text: &str) -> MarkPanel {
        MarkPanel {
            id,
            time: 10.0,
            position: Position::new(42.0, 41.0),
            text: text.to_owned(),
            initiator: None,
            visibility: Visibility::Global,
        }
    }

    fn spawn(
        window: Duration,
    ) -> (
        Arc<MemoryTable<MarkPanel>>,
        mpsc::UnboundedSender<Change<MarkPanel>>,
        CancelScope,
        JoinHandle<Result<(), TaskError>>,
    ) {
        let table = Arc::new(MemoryTable::new());
        let (tx, rx) = mpsc::unbounded_channel();
        let scope = CancelScope::new();
        let accumulator = Accumulator::new(
            Arc::from("test"),
            "markpanel",
            FlushPolicy::new(window),
            Arc::clone(&table) as Arc<dyn Table<MarkPanel>>,
        );
        let handle = tokio::spawn(accumulator.run(rx, scope.clone()));
        (table, tx, scope, handle)
    }

    #[test]
    fn last_write_wins_per_id() {
        let mut batch = Batch::new();
        batch.apply(Change::Upsert(panel(1, "first")));
        batch.apply(Change::Upsert(panel(1, "second")));

        let (updates, deletes) = batch.take();
        assert_eq!(updates, vec![panel(1, "second")]);
        assert!(deletes.is_empty());
        assert!(batch.is_empty());
    }

    #[test]
    fn remove_after_upsert_wins() {
        let mut batch = Batch::new();
        batch.apply(Change::Upsert(panel(2, "doomed")));
        batch.apply(Change::Upsert(panel(3, "kept")));
        batch.apply(Change::Remove(2));

        assert_eq!(batch.update_count(), 1);
        assert_eq!(batch.delete_count(), 1);
        let (updates, deletes) = batch.take();
        assert_eq!(updates, vec![panel(3, "kept")]);
        assert_eq!(deletes, vec![2]);
    }

    #[test]
    fn remove_of_unknown_id_is_recorded() {
        let mut batch = Batch::<MarkPanel>::new();
        batch.apply(Change::Remove(9));
        assert!(!batch.is_empty());
        assert_eq!(batch.take().1, vec![9]);
    }

    #[test]
    fn upsert_after_remove_revives_the_id() {
        let mut batch = Batch::new();
        batch.apply(Change::Remove(4));
        batch.apply(Change::Upsert(panel(4, "back")));

        let (updates, deletes) = batch.take();
        assert_eq!(updates, vec![panel(4, "back")]);
        assert!(deletes.is_empty());
    }

    #[test]
    fn prepare_can_drop_records() {
        struct DropBlank;
        impl Prepare<MarkPanel> for DropBlank {
            fn prepare(&self, record: MarkPanel) -> Option<MarkPanel> {
                (!record.text.is_empty()).then_some(record)
            }
        }
        assert_eq!(DropBlank.prepare(panel(1, "")), None);
        assert!(DropBlank.prepare(panel(1, "x")).is_some());
        assert!(Unchanged.prepare(panel(1, "x")).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn no_flush_before_window_then_exactly_one() {
        let (table, tx, scope, handle) = spawn(Duration::from_secs(2));

        tx.send(Change::Upsert(panel(1, "a"))).unwrap();
        tx.send(Change::Upsert(panel(1, "b"))).unwrap();
        tx.send(Change::Upsert(panel(2, "c"))).unwrap();

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert!(table.calls().await.is_empty());

        tokio::time::sleep(Duration::from_millis(200)).await;
        let calls = table.calls().await;
        assert_eq!(
            calls,
            vec![TableCall::Upsert(vec![panel(1, "b"), panel(2, "c")])]
        );

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(table.calls().await.len(), 1);

        scope.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn deletes_follow_updates_in_one_flush() {
        let (table, tx, scope, handle) = spawn(Duration::from_millis(40));

        tx.send(Change::Upsert(panel(1, "kept"))).unwrap();
        tx.send(Change::Upsert(panel(2, "gone"))).unwrap();
        tx.send(Change::Remove(2)).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(
            table.calls().await,
            vec![
                TableCall::Upsert(vec![panel(1, "kept")]),
                TableCall::Delete(vec![2]),
            ]
        );

        scope.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn store_failure_drops_batch_and_loop_continues() {
        let (table, tx, scope, handle) = spawn(Duration::from_millis(40));
        table.fail_next(1);

        tx.send(Change::Upsert(panel(1, "lost"))).unwrap();
        tx.send(Change::Remove(5)).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        // The failed upsert skips the delete of the same batch.
        assert_eq!(
            table.calls().await,
            vec![TableCall::Upsert(vec![panel(1, "lost")])]
        );
        assert!(table.rows().await.is_empty());

        tx.send(Change::Upsert(panel(2, "saved"))).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(table.rows().await, vec![panel(2, "saved")]);

        scope.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_within_one_backoff() {
        let (_table, _tx, scope, handle) = spawn(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_millis(50)).await;

        scope.cancel();
        let stopped = tokio::time::timeout(DEFAULT_IDLE_BACKOFF, handle).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_queue_keeps_running_until_cancelled() {
        let (table, tx, scope, handle) = spawn(Duration::from_millis(40));
        tx.send(Change::Upsert(panel(1, "last"))).unwrap();
        drop(tx);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(table.rows().await, vec![panel(1, "last")]);
        assert!(!handle.is_finished());

        scope.cancel();
        handle.await.unwrap().unwrap();
    }
}
