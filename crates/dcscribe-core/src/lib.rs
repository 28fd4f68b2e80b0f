//! Session supervision and ingestion pipeline for DCScribe.
//!
//! For every configured game server a [`SessionSupervisor`] connects to the
//! live session, streams units and mark panels through time-windowed
//! accumulators into the store, polls airbases on a timer, and rebuilds the
//! whole mirror whenever the connection drops.
//!
//! ```text
//! StreamConsumer --> queue --> Accumulator (+ Symbolizer) --> Sink
//!        ^                                                      ^
//!        +------------------ SessionSupervisor -----------------+
//! ```
//!
//! # Modules
//!
//! - [`cancel`] -- Hierarchical cancellation scopes.
//! - [`config`] -- Configuration loading from `dcscribe.yaml`.
//! - [`stream`] -- The [`StreamConsumer`] and [`Connector`] contracts.
//! - [`accumulator`] -- Batch accumulation with last-write-wins and delete
//!   precedence.
//! - [`symbols`] -- Symbology derivation for units and airbases.
//! - [`units`], [`markpanels`], [`airbases`] -- The session tasks.
//! - [`tasks`] -- Declarative task composition.
//! - [`supervisor`] -- The per-session restart loop.
//! - [`runner`] -- One supervisor per session.
//! - [`error`] -- Task errors.

pub mod accumulator;
pub mod airbases;
pub mod cancel;
pub mod config;
pub mod error;
pub mod markpanels;
pub mod runner;
pub mod stream;
pub mod supervisor;
pub mod symbols;
pub mod tasks;
pub mod units;

#[cfg(test)]
mod testing;

pub use accumulator::{Accumulator, Batch, FlushPolicy, Prepare};
pub use cancel::CancelScope;
pub use config::{Config, ConfigError, SessionConfig, TaskKind, TaskSpec};
pub use error::TaskError;
pub use runner::{build_supervisors, run_sessions};
pub use stream::{Connector, EventStream, StreamConsumer, StreamError};
pub use supervisor::{SessionSupervisor, SupervisorState};
pub use symbols::Symbolizer;
pub use tasks::{TaskPlan, TaskName};
