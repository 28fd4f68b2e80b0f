//! Tactical symbology for DCScribe.
//!
//! Every unit and airbase mirrored into the store carries a MIL-STD-2525D
//! symbol identification code so map layers can render it without knowing
//! anything about DCS unit types.
//!
//! # Modules
//!
//! - [`sidc`] -- the [`Symbology`] record and its fixed-width digit codec
//! - [`encyclopedia`] -- lookup from DCS type names to SIDC seeds
//! - [`error`] -- codec and dataset errors

pub mod encyclopedia;
pub mod error;
pub mod sidc;

pub use encyclopedia::{Encyclopedia, EncyclopediaEntry};
pub use error::{EncyclopediaError, SymbologyError};
pub use sidc::{
    Context, DEFAULT_VERSION, Digits, Entity, OneDigit, StandardIdentity, Status, SymbolSet,
    Symbology, TwoDigits,
};
