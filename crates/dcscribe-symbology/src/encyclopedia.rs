//! Read-only lookup from DCS unit type names to symbology seeds.
//!
//! The encyclopedia is built once at startup from YAML datasets bundled
//! into the binary and then shared (behind an `Arc`) by every session.
//! Each entry lists the DCS type names it covers and an optional
//! MIL-STD-2525D code used to seed the [`Symbology`] of matching units.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::debug;

use crate::error::{EncyclopediaError, SymbologyError};
use crate::sidc::Symbology;

/// Datasets compiled into the crate, as `(name, yaml)` pairs.
const BUNDLED: [(&str, &str); 3] = [
    ("air", include_str!("../data/encyclopedia/air.yaml")),
    ("land", include_str!("../data/encyclopedia/land.yaml")),
    ("sea", include_str!("../data/encyclopedia/sea.yaml")),
];

/// One encyclopedia entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EncyclopediaEntry {
    /// Human-readable name.
    pub name: String,
    /// Short code.
    pub code: String,
    /// MIL-STD-2525D SIDC seed, if the entry has one.
    #[serde(default)]
    pub mil_std_2525_d: Option<String>,
    /// DCS type names covered by this entry.
    #[serde(default)]
    pub dcs_codes: Vec<String>,
}

/// Index of encyclopedia entries keyed by DCS type name.
#[derive(Debug, Clone, Default)]
pub struct Encyclopedia {
    entries: Vec<EncyclopediaEntry>,
    by_dcs_code: HashMap<String, usize>,
}

impl Encyclopedia {
    /// Build the encyclopedia from the datasets bundled with the crate.
    ///
    /// # Errors
    ///
    /// Returns [`EncyclopediaError::Yaml`] if a bundled dataset is invalid.
    pub fn bundled() -> Result<Self, EncyclopediaError> {
        Self::from_datasets(BUNDLED)
    }

    /// Build the encyclopedia from `(name, yaml)` dataset pairs.
    ///
    /// When several entries claim the same DCS type name the first one wins.
    ///
    /// # Errors
    ///
    /// Returns [`EncyclopediaError::Yaml`] if any dataset is invalid.
    pub fn from_datasets<'a>(
        datasets: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, EncyclopediaError> {
        let mut encyclopedia = Self::default();
        for (dataset, yaml) in datasets {
            let entries: Vec<EncyclopediaEntry> =
                serde_yml::from_str(yaml).map_err(|source| EncyclopediaError::Yaml {
                    dataset: dataset.to_owned(),
                    source,
                })?;
            debug!(dataset, count = entries.len(), "loaded encyclopedia dataset");
            for entry in entries {
                encyclopedia.insert(entry);
            }
        }
        Ok(encyclopedia)
    }

    fn insert(&mut self, entry: EncyclopediaEntry) {
        let index = self.entries.len();
        for dcs_code in &entry.dcs_codes {
            self.by_dcs_code.entry(dcs_code.clone()).or_insert(index);
        }
        self.entries.push(entry);
    }

    /// Find the entry covering a DCS type name.
    pub fn lookup(&self, dcs_type: &str) -> Option<&EncyclopediaEntry> {
        self.by_dcs_code
            .get(dcs_type)
            .and_then(|index| self.entries.get(*index))
    }

    /// Derive the symbology for an entity of the given coalition and type.
    ///
    /// Types missing from the encyclopedia get the default record.
    ///
    /// # Errors
    ///
    /// Returns a [`SymbologyError`] if the matching entry's code is malformed.
    pub fn symbology(&self, coalition: i32, dcs_type: &str) -> Result<Symbology, SymbologyError> {
        let code = self
            .lookup(dcs_type)
            .and_then(|entry| entry.mil_std_2525_d.as_deref());
        Symbology::encode(coalition, code)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the encyclopedia holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
