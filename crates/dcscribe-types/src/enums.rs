//! Enumeration types shared across DCScribe.

use serde::{Deserialize, Serialize};

/// The side an entity belongs to, as numbered by DCS.
///
/// DCS uses 0 for neutral, 1 for red and 2 for blue. Red is treated as
/// hostile and blue as friendly. Any other number is kept verbatim so it
/// can be written back to the store unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i32", into = "i32")]
pub enum Coalition {
    /// DCS coalition 0.
    Neutral,
    /// DCS coalition 1 (red).
    Hostile,
    /// DCS coalition 2 (blue).
    Friendly,
    /// Any other coalition number.
    Unknown(i32),
}

impl Coalition {
    /// The DCS coalition number.
    pub const fn as_raw(self) -> i32 {
        match self {
            Self::Neutral => 0,
            Self::Hostile => 1,
            Self::Friendly => 2,
            Self::Unknown(raw) => raw,
        }
    }
}

impl From<i32> for Coalition {
    fn from(raw: i32) -> Self {
        match raw {
            0 => Self::Neutral,
            1 => Self::Hostile,
            2 => Self::Friendly,
            other => Self::Unknown(other),
        }
    }
}

impl From<Coalition> for i32 {
    fn from(coalition: Coalition) -> Self {
        coalition.as_raw()
    }
}

/// Kind of airbase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirbaseCategory {
    /// Fixed runway airfield.
    Aerodrome,
    /// Helicopter landing pad.
    Helipad,
    /// Carrier or other ship with a flight deck.
    Ship,
}

impl AirbaseCategory {
    /// Numeric category as stored in the database.
    pub const fn as_raw(self) -> i16 {
        match self {
            Self::Aerodrome => 0,
            Self::Helipad => 1,
            Self::Ship => 2,
        }
    }
}

/// Who can see a mark panel.
///
/// Coalition and group scopes are mutually exclusive; a panel with neither
/// is visible to everyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    /// Visible to all players.
    #[default]
    Global,
    /// Visible to one coalition (raw DCS coalition number).
    Coalition(i32),
    /// Visible to one group (DCS group id).
    Group(i32),
}

/// Column value the store uses for "no scope".
pub const NO_SCOPE: i32 = -1;

impl Visibility {
    /// Coalition column value, [`NO_SCOPE`] unless coalition-scoped.
    pub const fn coalition_column(self) -> i32 {
        match self {
            Self::Coalition(coalition) => coalition,
            Self::Global | Self::Group(_) => NO_SCOPE,
        }
    }

    /// Group column value, [`NO_SCOPE`] unless group-scoped.
    pub const fn group_column(self) -> i32 {
        match self {
            Self::Group(group) => group,
            Self::Global | Self::Coalition(_) => NO_SCOPE,
        }
    }
}
