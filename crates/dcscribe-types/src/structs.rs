//! Entity records mirrored into the store.

use std::fmt::Debug;
use std::hash::Hash;

use dcscribe_symbology::Symbology;

use crate::enums::{AirbaseCategory, Coalition, Visibility};

/// Maximum absolute latitude accepted by [`Position::new`].
const LATITUDE_LIMIT: f64 = 90.0;

/// A record keyed by a stable identifier within one session.
pub trait Record: Clone + Send + Sync + 'static {
    /// Identifier type.
    type Id: Clone + Eq + Hash + Ord + Debug + Send + Sync + 'static;

    /// The record's identifier.
    fn id(&self) -> Self::Id;
}

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    /// Latitude, clamped to `[-90, 90]`.
    pub latitude: f64,
    /// Longitude, stored as received.
    pub longitude: f64,
}

impl Position {
    /// Build a position, clamping the latitude into range.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude: latitude.clamp(-LATITUDE_LIMIT, LATITUDE_LIMIT),
            longitude,
        }
    }
}

/// A live unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    /// DCS unit id, stable within one connection.
    pub id: u32,
    /// Unit name.
    pub name: String,
    /// Callsign of the pilot, if any.
    pub callsign: Option<String>,
    /// Name of the player flying the unit, if any.
    pub player_name: Option<String>,
    /// Name of the group the unit belongs to.
    pub group_name: Option<String>,
    /// Owning coalition.
    pub coalition: Coalition,
    /// DCS type name (e.g. `F-16C_50`).
    pub unit_type: String,
    /// Where the unit is.
    pub position: Position,
    /// Altitude in metres.
    pub altitude: f64,
    /// Heading in degrees.
    pub heading: f64,
    /// Speed in metres per second.
    pub speed: f64,
    /// Tactical symbol derived from coalition and type.
    pub symbology: Symbology,
}

impl Record for Unit {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// A map annotation placed by a player or script.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkPanel {
    /// DCS mark id.
    pub id: u32,
    /// Mission time the mark was created, in seconds.
    pub time: f64,
    /// Where the mark is.
    pub position: Position,
    /// Free text of the mark.
    pub text: String,
    /// Name of the unit or player who placed the mark.
    pub initiator: Option<String>,
    /// Who can see the mark.
    pub visibility: Visibility,
}

impl Record for MarkPanel {
    type Id = u32;

    fn id(&self) -> u32 {
        self.id
    }
}

/// An airfield, helipad or ship flight deck.
#[derive(Debug, Clone, PartialEq)]
pub struct Airbase {
    /// Airbase name, unique within a mission.
    pub name: String,
    /// Radio callsign.
    pub callsign: String,
    /// Where the airbase is.
    pub position: Position,
    /// Elevation in metres.
    pub altitude: f64,
    /// Kind of airbase.
    pub category: AirbaseCategory,
    /// DCS type name.
    pub airbase_type: String,
    /// Owning coalition.
    pub coalition: Coalition,
    /// Tactical symbol derived from coalition and type.
    pub symbology: Symbology,
}

impl Record for Airbase {
    type Id = String;

    fn id(&self) -> String {
        self.name.clone()
    }
}
