//! Symbology derivation for records about to be written.

use std::sync::Arc;

use dcscribe_symbology::{Encyclopedia, Symbology, SymbologyError};
use dcscribe_types::{Airbase, Unit};
use tracing::warn;

use crate::accumulator::Prepare;

/// Derives the tactical symbol of units and airbases from their DCS type.
///
/// A record whose dataset code is malformed is dropped with a warning.
#[derive(Debug, Clone)]
pub struct Symbolizer {
    session: Arc<str>,
    encyclopedia: Arc<Encyclopedia>,
}

impl Symbolizer {
    /// Create a symbolizer for `session`.
    pub const fn new(session: Arc<str>, encyclopedia: Arc<Encyclopedia>) -> Self {
        Self {
            session,
            encyclopedia,
        }
    }

    fn derive(&self, coalition: i32, dcs_type: &str) -> Result<Symbology, SymbologyError> {
        self.encyclopedia.symbology(coalition, dcs_type)
    }

    fn report(&self, kind: &str, name: &str, dcs_type: &str, err: &SymbologyError) {
        warn!(
            session = %self.session,
            kind,
            name,
            dcs_type,
            error = %err,
            "Dropping record with invalid symbology"
        );
    }
}

impl Prepare<Unit> for Symbolizer {
    fn prepare(&self, mut unit: Unit) -> Option<Unit> {
        match self.derive(unit.coalition.as_raw(), &unit.unit_type) {
            Ok(symbology) => {
                unit.symbology = symbology;
                Some(unit)
            }
            Err(e) => {
                self.report("unit", &unit.name, &unit.unit_type, &e);
                None
            }
        }
    }
}

impl Prepare<Airbase> for Symbolizer {
    fn prepare(&self, mut airbase: Airbase) -> Option<Airbase> {
        match self.derive(airbase.coalition.as_raw(), &airbase.airbase_type) {
            Ok(symbology) => {
                airbase.symbology = symbology;
                Some(airbase)
            }
            Err(e) => {
                self.report("airbase", &airbase.name, &airbase.airbase_type, &e);
                None
            }
        }
    }
}
