//! Shared data model for DCScribe.
//!
//! # Modules
//!
//! - [`enums`] -- coalition, airbase category and mark panel visibility
//! - [`structs`] -- units, mark panels, airbases and the [`Record`] trait
//! - [`events`] -- live stream events and queued changes

pub mod enums;
pub mod events;
pub mod structs;

pub use enums::{AirbaseCategory, Coalition, NO_SCOPE, Visibility};
pub use events::{Change, MarkPanelChange, MarkPanelEvent, UnitEvent};
pub use structs::{Airbase, MarkPanel, Position, Record, Unit};
