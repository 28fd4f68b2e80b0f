//! The write-side store contract.
//!
//! A [`Table`] accepts truncate, bulk upsert and bulk delete for one record
//! kind. A [`Sink`] bundles the three tables a session writes to.

use std::sync::Arc;

use async_trait::async_trait;
use dcscribe_types::{Airbase, MarkPanel, Record, Unit};

use crate::airbase_store::AirbaseStore;
use crate::error::DbError;
use crate::markpanel_store::MarkPanelStore;
use crate::postgres::PostgresPool;
use crate::unit_store::UnitStore;

/// Bulk write operations for one record kind.
#[async_trait]
pub trait Table<T: Record>: Send + Sync {
    /// Remove every row.
    async fn truncate(&self) -> Result<(), DbError>;

    /// Insert or replace rows keyed by record id.
    async fn upsert(&self, records: &[T]) -> Result<(), DbError>;

    /// Remove the rows with these ids.
    async fn delete(&self, ids: &[T::Id]) -> Result<(), DbError>;
}

/// The tables one session mirrors into.
#[derive(Clone)]
pub struct Sink {
    /// Live units.
    pub units: Arc<dyn Table<Unit>>,
    /// Map annotations.
    pub markpanels: Arc<dyn Table<MarkPanel>>,
    /// Airbase snapshot.
    pub airbases: Arc<dyn Table<Airbase>>,
    schema: Option<PostgresPool>,
}

impl Sink {
    /// Bundle arbitrary table implementations.
    pub fn new(
        units: Arc<dyn Table<Unit>>,
        markpanels: Arc<dyn Table<MarkPanel>>,
        airbases: Arc<dyn Table<Airbase>>,
    ) -> Self {
        Self {
            units,
            markpanels,
            airbases,
            schema: None,
        }
    }

    /// Tables backed by a `PostgreSQL` pool; migrations run on every reset.
    pub fn postgres(pool: &PostgresPool) -> Self {
        Self {
            units: Arc::new(UnitStore::new(pool.pool().clone())),
            markpanels: Arc::new(MarkPanelStore::new(pool.pool().clone())),
            airbases: Arc::new(AirbaseStore::new(pool.pool().clone())),
            schema: Some(pool.clone()),
        }
    }

    /// Prepare the schema and empty every table.
    ///
    /// # Errors
    ///
    /// Returns the first [`DbError`] raised by a migration or truncate.
    pub async fn reset(&self) -> Result<(), DbError> {
        if let Some(pool) = &self.schema {
            pool.run_migrations().await?;
        }
        self.units.truncate().await?;
        self.markpanels.truncate().await?;
        self.airbases.truncate().await?;
        Ok(())
    }
}

impl std::fmt::Debug for Sink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sink")
            .field("postgres", &self.schema.is_some())
            .finish_non_exhaustive()
    }
}
