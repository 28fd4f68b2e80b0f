//! MIL-STD-2525D symbol identification codes.
//!
//! A [`Symbology`] record is the structured form of a SIDC: a string of
//! decimal digits where every field owns a fixed column span.
//!
//! ```text
//! version | context | identity | symbol set | status | HQ/TF/dummy | amplifier
//!  (n)    |   1     |    1     |     2      |   1    |      1      |     2
//!
//! entity | entity type | entity subtype | sector 1 | sector 2
//!   2    |      2      |       2        |    2     |    2
//! ```
//!
//! The version column is as wide as the decimal version value (`10` is two
//! digits, which yields the standard 20-digit code). Context and identity
//! together form the two-column "standard identity" span of the standard.
//!
//! The standard identity is never read back from a code. It always follows
//! the coalition of the entity the record is attached to, so a friendly unit
//! reusing a dataset code authored as hostile still renders as friendly.

use std::fmt;

use crate::error::SymbologyError;

/// Version emitted for freshly built records.
pub const DEFAULT_VERSION: u8 = 10;

/// Number of digits following the version column.
const TRAILING_DIGITS: usize = 18;

/// Generates a fieldless enum whose values map one-to-one onto SIDC digits.
macro_rules! digit_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// Numeric value of this field as written into a SIDC.
            pub const fn code(self) -> u8 {
                match self {
                    $(Self::$variant => $value,)+
                }
            }

            /// Decode a numeric SIDC value.
            ///
            /// # Errors
            ///
            /// Returns [`SymbologyError::OutOfRange`] for values the field
            /// does not define.
            pub const fn from_code(value: u8) -> Result<Self, SymbologyError> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(SymbologyError::OutOfRange { field: $field, value }),
                }
            }
        }
    };
}

digit_enum! {
    /// Whether the symbol describes the real world, an exercise, or a simulation.
    Context, "context" {
        /// Real-world entity.
        Reality = 0,
        /// Exercise entity.
        Exercise = 1,
        /// Simulated entity.
        Simulation = 2,
    }
}

digit_enum! {
    /// Allegiance of the entity as seen by the observer.
    StandardIdentity, "standard identity" {
        /// Not yet identified.
        Pending = 0,
        /// Identified as unknown.
        Unknown = 1,
        /// Assumed friendly.
        AssumedFriend = 2,
        /// Friendly.
        Friend = 3,
        /// Neutral.
        Neutral = 4,
        /// Suspect or joker.
        SuspectJoker = 5,
        /// Hostile or faker.
        HostileFaker = 6,
    }
}

digit_enum! {
    /// Battle dimension the symbol belongs to.
    SymbolSet, "symbol set" {
        /// Air.
        Air = 1,
        /// Air missile.
        AirMissile = 2,
        /// Space.
        Space = 5,
        /// Space missile.
        SpaceMissile = 6,
        /// Land units.
        LandUnits = 10,
        /// Land civilian units and organizations.
        LandCivilian = 11,
        /// Land equipment.
        LandEquipment = 15,
        /// Land installations.
        LandInstallation = 20,
        /// Control measures.
        ControlMeasure = 25,
        /// Sea surface.
        SeaSurface = 30,
        /// Sea subsurface.
        SeaSubSurface = 35,
        /// Mine warfare.
        MineWarfare = 36,
        /// Activities.
        Activities = 40,
        /// Meteorological, atmospheric.
        MeteorologicalAtmospheric = 45,
        /// Meteorological, oceanographic.
        MeteorologicalOceanographic = 46,
        /// Meteorological, space.
        MeteorologicalSpace = 47,
        /// Signals intelligence, space.
        SignalsIntelligenceSpace = 50,
        /// Signals intelligence, air.
        SignalsIntelligenceAir = 51,
        /// Signals intelligence, land.
        SignalsIntelligenceLand = 52,
        /// Signals intelligence, surface.
        SignalsIntelligenceSurface = 53,
        /// Signals intelligence, subsurface.
        SignalsIntelligenceSubSurface = 54,
        /// Cyberspace.
        Cyberspace = 60,
    }
}

digit_enum! {
    /// Operational status of the entity.
    Status, "status" {
        /// Present.
        Present = 0,
        /// Planned, anticipated or suspect.
        PlannedAnticipatedSuspect = 1,
        /// Present and fully capable.
        PresentFullyCapable = 2,
        /// Present and damaged.
        PresentDamaged = 3,
        /// Present and destroyed.
        PresentDestroyed = 4,
        /// Present and full to capacity.
        PresentFullToCapacity = 5,
    }
}

digit_enum! {
    /// Top-level entity class.
    Entity, "entity" {
        /// Military.
        Military = 11,
        /// Civilian.
        Civilian = 12,
        /// Weapon.
        Weapon = 13,
        /// Manual track.
        ManualTrack = 14,
    }
}

/// A free numeric column, `WIDTH` digits wide (one or two).
///
/// Construction rejects values that would not fit the column, so a
/// rendered record always keeps every later field in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digits<const WIDTH: usize>(u8);

/// A one-digit column.
pub type OneDigit = Digits<1>;

/// A two-digit column.
pub type TwoDigits = Digits<2>;

impl<const WIDTH: usize> Digits<WIDTH> {
    /// Largest value the column holds.
    pub const MAX: u8 = if WIDTH == 1 { 9 } else { 99 };

    /// The all-zero column.
    pub const ZERO: Self = Self(0);

    /// Wrap `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SymbologyError::TooWide`] if `value` needs more than
    /// `WIDTH` digits.
    pub const fn new(value: u8) -> Result<Self, SymbologyError> {
        if value > Self::MAX {
            Err(SymbologyError::TooWide {
                value,
                width: WIDTH,
            })
        } else {
            Ok(Self(value))
        }
    }

    /// The column value.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl<const WIDTH: usize> TryFrom<u8> for Digits<WIDTH> {
    type Error = SymbologyError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl<const WIDTH: usize> fmt::Display for Digits<WIDTH> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:0width$}", self.0, width = WIDTH)
    }
}

impl StandardIdentity {
    /// Map a DCS coalition number onto a standard identity.
    ///
    /// Returns `None` for coalitions without a fixed mapping.
    pub const fn from_coalition(coalition: i32) -> Option<Self> {
        match coalition {
            0 => Some(Self::Neutral),
            1 => Some(Self::HostileFaker),
            2 => Some(Self::Friend),
            _ => None,
        }
    }
}

/// A decoded tactical symbol identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Symbology {
    /// Standard version.
    pub version: u8,
    /// Reality, exercise or simulation.
    pub context: Context,
    /// Allegiance, always derived from the coalition.
    pub standard_identity: StandardIdentity,
    /// Battle dimension.
    pub symbol_set: SymbolSet,
    /// Operational status.
    pub status: Status,
    /// Headquarters, task force and dummy indicator.
    pub hq_tf_dummy: OneDigit,
    /// Echelon or mobility amplifier.
    pub amplifier: TwoDigits,
    /// Entity class.
    pub entity: Entity,
    /// Entity type within the class.
    pub entity_type: TwoDigits,
    /// Entity subtype within the type.
    pub entity_subtype: TwoDigits,
    /// Sector one modifier.
    pub sector_one_modifier: TwoDigits,
    /// Sector two modifier.
    pub sector_two_modifier: TwoDigits,
}

impl Default for Symbology {
    fn default() -> Self {
        Self {
            version: DEFAULT_VERSION,
            context: Context::Reality,
            standard_identity: StandardIdentity::Pending,
            symbol_set: SymbolSet::LandUnits,
            status: Status::Present,
            hq_tf_dummy: Digits::ZERO,
            amplifier: Digits::ZERO,
            entity: Entity::Military,
            entity_type: Digits::ZERO,
            entity_subtype: Digits::ZERO,
            sector_one_modifier: Digits::ZERO,
            sector_two_modifier: Digits::ZERO,
        }
    }
}

impl Symbology {
    /// Build a default record for an entity of the given coalition.
    pub fn new(coalition: i32) -> Self {
        let mut record = Self::default();
        record.apply_coalition(coalition);
        record
    }

    /// Build a record for `coalition`, seeded from an existing code if any.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbologyError`] when `code` is present but malformed.
    pub fn encode(coalition: i32, code: Option<&str>) -> Result<Self, SymbologyError> {
        code.map_or_else(|| Ok(Self::new(coalition)), |code| Self::decode(coalition, code))
    }

    /// Decode `code`, taking every field except the standard identity from it.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbologyError`] if the code is too short, contains
    /// non-digits, has a non-canonical version, or holds an out-of-range
    /// enumerated value.
    pub fn decode(coalition: i32, code: &str) -> Result<Self, SymbologyError> {
        let min = TRAILING_DIGITS.saturating_add(1);
        if code.len() < min {
            return Err(SymbologyError::Length {
                code: code.to_owned(),
                len: code.len(),
                min,
            });
        }
        if !code.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SymbologyError::NonDigit {
                code: code.to_owned(),
            });
        }

        let version_width = code.len().saturating_sub(TRAILING_DIGITS);
        let version_error = || SymbologyError::Version {
            code: code.to_owned(),
        };
        if version_width > 1 && code.starts_with('0') {
            return Err(version_error());
        }

        let mut columns = Columns { rest: code };
        let version = columns.take(version_width).ok_or_else(version_error)?;
        let context = Context::from_code(columns.field(1, code)?)?;
        // Identity column is skipped; the coalition decides it below.
        columns.field(1, code)?;
        let symbol_set = SymbolSet::from_code(columns.field(2, code)?)?;
        let status = Status::from_code(columns.field(1, code)?)?;
        let hq_tf_dummy = columns.digits(code)?;
        let amplifier = columns.digits(code)?;
        let entity = Entity::from_code(columns.field(2, code)?)?;
        let entity_type = columns.digits(code)?;
        let entity_subtype = columns.digits(code)?;
        let sector_one_modifier = columns.digits(code)?;
        let sector_two_modifier = columns.digits(code)?;

        let mut record = Self {
            version,
            context,
            standard_identity: StandardIdentity::Pending,
            symbol_set,
            status,
            hq_tf_dummy,
            amplifier,
            entity,
            entity_type,
            entity_subtype,
            sector_one_modifier,
            sector_two_modifier,
        };
        record.apply_coalition(coalition);
        Ok(record)
    }

    /// Overwrite the standard identity from a coalition number.
    ///
    /// Coalitions without a mapping leave the current identity in place.
    pub fn apply_coalition(&mut self, coalition: i32) {
        if let Some(identity) = StandardIdentity::from_coalition(coalition) {
            self.standard_identity = identity;
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{:02}{}{}{}{:02}{}{}{}{}",
            self.version,
            self.context.code(),
            self.standard_identity.code(),
            self.symbol_set.code(),
            self.status.code(),
            self.hq_tf_dummy,
            self.amplifier,
            self.entity.code(),
            self.entity_type,
            self.entity_subtype,
            self.sector_one_modifier,
            self.sector_two_modifier,
        )
    }
}

/// Cursor over the remaining columns of a SIDC.
struct Columns<'a> {
    rest: &'a str,
}

impl Columns<'_> {
    fn take(&mut self, width: usize) -> Option<u8> {
        let (head, tail) = self.rest.split_at_checked(width)?;
        self.rest = tail;
        head.parse().ok()
    }

    fn field(&mut self, width: usize, code: &str) -> Result<u8, SymbologyError> {
        self.take(width).ok_or_else(|| SymbologyError::Length {
            code: code.to_owned(),
            len: code.len(),
            min: TRAILING_DIGITS.saturating_add(1),
        })
    }

    fn digits<const WIDTH: usize>(
        &mut self,
        code: &str,
    ) -> Result<Digits<WIDTH>, SymbologyError> {
        Digits::new(self.field(WIDTH, code)?)
    }
}


#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod proptests {
    use proptest::prelude::*;
    use proptest::sample::select;

    use super::*;

    fn one_digit() -> impl Strategy<Value = OneDigit> {
        (0..=OneDigit::MAX).prop_map(Digits)
    }

    fn two_digits() -> impl Strategy<Value = TwoDigits> {
        (0..=TwoDigits::MAX).prop_map(Digits)
    }

    // Every record whose fields are in range.
    fn record() -> impl Strategy<Value = Symbology> {
        (
            (
                any::<u8>(),
                select(Context::ALL),
                select(StandardIdentity::ALL),
                select(SymbolSet::ALL),
                select(Status::ALL),
                one_digit(),
            ),
            (
                two_digits(),
                select(Entity::ALL),
                two_digits(),
                two_digits(),
                two_digits(),
                two_digits(),
            ),
        )
            .prop_map(
                |(
                    (version, context, standard_identity, symbol_set, status, hq_tf_dummy),
                    (
                        amplifier,
                        entity,
                        entity_type,
                        entity_subtype,
                        sector_one_modifier,
                        sector_two_modifier,
                    ),
                )| Symbology {
                    version,
                    context,
                    standard_identity,
                    symbol_set,
                    status,
                    hq_tf_dummy,
                    amplifier,
                    entity,
                    entity_type,
                    entity_subtype,
                    sector_one_modifier,
                    sector_two_modifier,
                },
            )
    }

    proptest! {
        /// Decoding a rendered record gives it back, with the identity
        /// taken from the coalition.
        #[test]
        fn rendered_records_decode_to_themselves(record in record(), coalition in -1i32..=3) {
            let text = record.to_string();
            prop_assert_eq!(text.len(), TRAILING_DIGITS + record.version.to_string().len());

            let decoded = Symbology::decode(coalition, &text);
            let identity = StandardIdentity::from_coalition(coalition)
                .unwrap_or(StandardIdentity::Pending);
            prop_assert_eq!(decoded, Ok(Symbology { standard_identity: identity, ..record }));
        }
    }
}
