//! In-memory [`Table`] implementation.
//!
//! Keeps the current rows plus a log of every call so tests can assert on
//! exactly which batches were written, and can be told to fail upcoming
//! calls to exercise error paths.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dcscribe_types::Record;
use tokio::sync::Mutex;

use crate::error::DbError;
use crate::table::Table;

/// One recorded call against a [`MemoryTable`].
#[derive(Debug, Clone, PartialEq)]
pub enum TableCall<T: Record> {
    /// `truncate()` was called.
    Truncate,
    /// `upsert()` was called with these records.
    Upsert(Vec<T>),
    /// `delete()` was called with these ids.
    Delete(Vec<T::Id>),
}

#[derive(Debug)]
struct State<T: Record> {
    rows: BTreeMap<T::Id, T>,
    calls: Vec<TableCall<T>>,
}

/// A table that lives in process memory.
#[derive(Debug)]
pub struct MemoryTable<T: Record> {
    state: Mutex<State<T>>,
    failures: AtomicUsize,
}

impl<T: Record> Default for MemoryTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> MemoryTable<T> {
    /// Create an empty table.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                rows: BTreeMap::new(),
                calls: Vec::new(),
            }),
            failures: AtomicUsize::new(0),
        }
    }

    /// Make the next `count` calls fail (they are still recorded).
    pub fn fail_next(&self, count: usize) {
        self.failures.store(count, Ordering::SeqCst);
    }

    /// Current rows ordered by id.
    pub async fn rows(&self) -> Vec<T> {
        self.state.lock().await.rows.values().cloned().collect()
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<TableCall<T>> {
        self.state.lock().await.calls.clone()
    }

    /// Number of `truncate()` calls made so far.
    pub async fn truncate_count(&self) -> usize {
        self.state
            .lock()
            .await
            .calls
            .iter()
            .filter(|call| matches!(call, TableCall::Truncate))
            .count()
    }

    fn take_failure(&self, operation: &'static str) -> Result<(), DbError> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if injected {
            Err(DbError::Injected { operation })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl<T: Record> Table<T> for MemoryTable<T> {
    async fn truncate(&self) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.calls.push(TableCall::Truncate);
        self.take_failure("truncate")?;
        state.rows.clear();
        Ok(())
    }

    async fn upsert(&self, records: &[T]) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.calls.push(TableCall::Upsert(records.to_vec()));
        self.take_failure("upsert")?;
        for record in records {
            state.rows.insert(record.id(), record.clone());
        }
        Ok(())
    }

    async fn delete(&self, ids: &[T::Id]) -> Result<(), DbError> {
        let mut state = self.state.lock().await;
        state.calls.push(TableCall::Delete(ids.to_vec()));
        self.take_failure("delete")?;
        for id in ids {
            state.rows.remove(id);
        }
        Ok(())
    }
}
