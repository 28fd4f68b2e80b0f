//! Change events flowing from the live session towards the store.
//!
//! [`UnitEvent`] and [`MarkPanelEvent`] are what the stream consumer yields.
//! [`Change`] is what the stream tasks put on the per-kind queue for the
//! batch accumulators.

use crate::enums::Visibility;
use crate::structs::{Record, Unit};

/// A queued change to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Change<T: Record> {
    /// Insert or replace the record.
    Upsert(T),
    /// Remove the record with this id.
    Remove(T::Id),
}

/// One update from the live unit stream.
#[derive(Debug, Clone, PartialEq)]
pub enum UnitEvent {
    /// A unit appeared or changed.
    Updated(Unit),
    /// A unit left the mission.
    Gone {
        /// Id of the departed unit.
        id: u32,
        /// Name of the departed unit.
        name: String,
    },
}

/// Mark panel fields carried by a live add or change event.
///
/// The live event has no position; it is resolved with a snapshot lookup
/// before the panel is queued.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkPanelChange {
    /// DCS mark id.
    pub id: u32,
    /// Mission time the mark was created, in seconds.
    pub time: f64,
    /// Free text of the mark.
    pub text: String,
    /// Name of the unit or player who placed the mark.
    pub initiator: Option<String>,
    /// Who can see the mark.
    pub visibility: Visibility,
}

/// One update from the live mark panel stream.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkPanelEvent {
    /// A mark was placed.
    Added(MarkPanelChange),
    /// A mark's text or scope changed.
    Changed(MarkPanelChange),
    /// A mark was removed.
    Removed {
        /// Id of the removed mark.
        id: u32,
    },
}
