//! Store layer for DCScribe.
//!
//! The store is a live mirror of each session, not a history: every
//! connection cycle starts by truncating the tables, and the accumulators
//! keep them current with bulk upserts and deletes.
//!
//! ```text
//! Unit accumulator -------> UnitStore      (units)
//! MarkPanel accumulator --> MarkPanelStore (markpanels)
//! Airbase poller ---------> AirbaseStore   (airbases)
//! ```
//!
//! # Modules
//!
//! - [`table`] -- the [`Table`] contract and the per-session [`Sink`]
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`unit_store`], [`markpanel_store`], [`airbase_store`] -- `PostgreSQL` tables
//! - `memory` -- in-memory tables for tests (`test-util` feature)
//! - [`error`] -- Shared error types

pub mod airbase_store;
pub mod error;
pub mod markpanel_store;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod postgres;
pub mod table;
pub mod unit_store;

// Re-export primary types for convenience.
pub use airbase_store::AirbaseStore;
pub use error::DbError;
pub use markpanel_store::MarkPanelStore;
#[cfg(any(test, feature = "test-util"))]
pub use memory::{MemoryTable, TableCall};
pub use postgres::{PostgresConfig, PostgresPool};
pub use table::{Sink, Table};
pub use unit_store::UnitStore;
