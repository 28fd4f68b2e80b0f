//! JSON messages exchanged with the game server's NATS bridge.
//!
//! The bridge publishes `UnitUpdate` and `MarkPanelUpdate` messages on the
//! session's stream subjects and answers snapshot requests with JSON
//! arrays. These types only exist at the edge; everything past
//! [`NatsConsumer`](crate::nats::NatsConsumer) works with the domain types.

use dcscribe_symbology::Symbology;
use dcscribe_types::{
    Airbase, AirbaseCategory, Coalition, MarkPanel, MarkPanelChange, MarkPanelEvent, Position,
    Unit, UnitEvent, Visibility,
};
use serde::Deserialize;

/// Geographic position as sent by the bridge.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct WirePosition {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Altitude in metres.
    #[serde(default)]
    pub alt: f64,
}

impl From<WirePosition> for Position {
    fn from(wire: WirePosition) -> Self {
        Self::new(wire.lat, wire.lon)
    }
}

/// A unit as sent by the bridge.
#[derive(Debug, Clone, Deserialize)]
pub struct WireUnit {
    /// Unit id.
    pub id: u32,
    /// Unit name.
    pub name: String,
    /// Pilot callsign.
    #[serde(default)]
    pub callsign: Option<String>,
    /// Player name.
    #[serde(default)]
    pub player_name: Option<String>,
    /// Group name.
    #[serde(default)]
    pub group_name: Option<String>,
    /// DCS coalition number.
    pub coalition: i32,
    /// DCS type name.
    #[serde(rename = "type")]
    pub unit_type: String,
    /// Position and altitude.
    pub position: WirePosition,
    /// Heading in degrees.
    #[serde(default)]
    pub heading: f64,
    /// Speed in metres per second.
    #[serde(default)]
    pub speed: f64,
}

impl From<WireUnit> for Unit {
    fn from(wire: WireUnit) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            callsign: wire.callsign,
            player_name: wire.player_name,
            group_name: wire.group_name,
            coalition: Coalition::from(wire.coalition),
            unit_type: wire.unit_type,
            position: wire.position.into(),
            altitude: wire.position.alt,
            heading: wire.heading,
            speed: wire.speed,
            symbology: Symbology::new(wire.coalition),
        }
    }
}

/// A message on the unit stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitUpdate {
    /// A unit appeared or changed.
    Unit(WireUnit),
    /// A unit left the mission.
    Gone {
        /// Unit id.
        id: u32,
        /// Unit name.
        #[serde(default)]
        name: String,
    },
}

impl From<UnitUpdate> for UnitEvent {
    fn from(update: UnitUpdate) -> Self {
        match update {
            UnitUpdate::Unit(unit) => Self::Updated(unit.into()),
            UnitUpdate::Gone { id, name } => Self::Gone { id, name },
        }
    }
}

/// Visibility fields shared by live mark events and snapshots.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WireScope {
    /// Coalition the mark is shown to.
    #[serde(default)]
    pub coalition: Option<i32>,
    /// Group the mark is shown to.
    #[serde(default)]
    pub group_id: Option<i32>,
}

impl From<WireScope> for Visibility {
    fn from(scope: WireScope) -> Self {
        match (scope.coalition, scope.group_id) {
            (Some(coalition), _) => Self::Coalition(coalition),
            (None, Some(group)) => Self::Group(group),
            (None, None) => Self::Global,
        }
    }
}

/// A live mark add or change.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMarkChange {
    /// Mark id.
    pub id: u32,
    /// Mission time of creation.
    #[serde(default)]
    pub time: f64,
    /// Mark text.
    #[serde(default)]
    pub text: String,
    /// Who placed the mark.
    #[serde(default)]
    pub initiator: Option<String>,
    /// Visibility scope.
    #[serde(flatten)]
    pub scope: WireScope,
}

impl From<WireMarkChange> for MarkPanelChange {
    fn from(wire: WireMarkChange) -> Self {
        Self {
            id: wire.id,
            time: wire.time,
            text: wire.text,
            initiator: wire.initiator,
            visibility: wire.scope.into(),
        }
    }
}

/// A message on the mark panel stream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkPanelUpdate {
    /// A mark was placed.
    Added(WireMarkChange),
    /// A mark changed.
    Changed(WireMarkChange),
    /// A mark was removed.
    Removed {
        /// Mark id.
        id: u32,
    },
}

impl From<MarkPanelUpdate> for MarkPanelEvent {
    fn from(update: MarkPanelUpdate) -> Self {
        match update {
            MarkPanelUpdate::Added(change) => Self::Added(change.into()),
            MarkPanelUpdate::Changed(change) => Self::Changed(change.into()),
            MarkPanelUpdate::Removed { id } => Self::Removed { id },
        }
    }
}

/// A mark in a snapshot reply.
#[derive(Debug, Clone, Deserialize)]
pub struct WireMarkPanel {
    /// Mark id.
    pub id: u32,
    /// Mission time of creation.
    #[serde(default)]
    pub time: f64,
    /// Where the mark is.
    pub position: WirePosition,
    /// Mark text.
    #[serde(default)]
    pub text: String,
    /// Who placed the mark.
    #[serde(default)]
    pub initiator: Option<String>,
    /// Visibility scope.
    #[serde(flatten)]
    pub scope: WireScope,
}

impl From<WireMarkPanel> for MarkPanel {
    fn from(wire: WireMarkPanel) -> Self {
        Self {
            id: wire.id,
            time: wire.time,
            position: wire.position.into(),
            text: wire.text,
            initiator: wire.initiator,
            visibility: wire.scope.into(),
        }
    }
}

/// An airbase in a snapshot reply.
#[derive(Debug, Clone, Deserialize)]
pub struct WireAirbase {
    /// Airbase name.
    pub name: String,
    /// Radio callsign.
    #[serde(default)]
    pub callsign: String,
    /// Position and elevation.
    pub position: WirePosition,
    /// Kind of airbase.
    pub category: AirbaseCategory,
    /// DCS type name.
    #[serde(rename = "type", default)]
    pub airbase_type: String,
    /// DCS coalition number.
    pub coalition: i32,
}

impl From<WireAirbase> for Airbase {
    fn from(wire: WireAirbase) -> Self {
        Self {
            name: wire.name,
            callsign: wire.callsign,
            position: wire.position.into(),
            altitude: wire.position.alt,
            category: wire.category,
            airbase_type: wire.airbase_type,
            coalition: Coalition::from(wire.coalition),
            symbology: Symbology::new(wire.coalition),
        }
    }
}
