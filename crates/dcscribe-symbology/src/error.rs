//! Error types for the symbology crate.

/// Errors raised while decoding a symbol identification code (SIDC).
///
/// A malformed code is a hard failure for the record it belongs to: callers
/// drop that record rather than publishing a wrong symbol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SymbologyError {
    /// The code is too short to hold every field.
    #[error("SIDC {code:?} has {len} digits, at least {min} are required")]
    Length {
        /// The offending code.
        code: String,
        /// Number of characters in the code.
        len: usize,
        /// Minimum accepted length.
        min: usize,
    },

    /// The code contains something other than ASCII digits.
    #[error("SIDC {code:?} contains a non-digit character")]
    NonDigit {
        /// The offending code.
        code: String,
    },

    /// The version column is not in canonical form (leading zero or too large).
    #[error("SIDC {code:?} has an invalid version field")]
    Version {
        /// The offending code.
        code: String,
    },

    /// A column decoded to a value outside its field's range.
    #[error("{field} value {value} is out of range")]
    OutOfRange {
        /// Name of the field being decoded.
        field: &'static str,
        /// The decoded value.
        value: u8,
    },

    /// A value does not fit its fixed-width column.
    #[error("{value} does not fit a {width}-digit column")]
    TooWide {
        /// The rejected value.
        value: u8,
        /// Width of the column in digits.
        width: usize,
    },
}

/// Errors raised while building the unit-type encyclopedia.
#[derive(Debug, thiserror::Error)]
pub enum EncyclopediaError {
    /// A dataset could not be parsed.
    #[error("failed to parse encyclopedia dataset {dataset}: {source}")]
    Yaml {
        /// Name of the dataset (e.g. `air`).
        dataset: String,
        /// The underlying YAML error.
        source: serde_yml::Error,
    },
}
