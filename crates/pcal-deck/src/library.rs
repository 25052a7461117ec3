//! # Bundled Labware Library
//!
//! Definitions for the labware the calibration workflow places on its own:
//! default tip racks for every pipette volume class, both calibration
//! blocks, and both fixed-trash variants. Documents are embedded at compile
//! time and parsed once on first use.

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use pcal_core::LabwareUri;

use crate::definition::LabwareDefinition;
use crate::error::DeckError;

/// Namespace of every bundled definition.
pub const OPENTRONS_NAMESPACE: &str = "opentrons";

const BUNDLED: &[(&str, &str)] = &[
    (
        "opentrons_96_tiprack_10ul",
        include_str!("../labware/opentrons_96_tiprack_10ul.json"),
    ),
    (
        "opentrons_96_tiprack_20ul",
        include_str!("../labware/opentrons_96_tiprack_20ul.json"),
    ),
    (
        "opentrons_96_tiprack_300ul",
        include_str!("../labware/opentrons_96_tiprack_300ul.json"),
    ),
    (
        "opentrons_96_tiprack_1000ul",
        include_str!("../labware/opentrons_96_tiprack_1000ul.json"),
    ),
    (
        "opentrons_calibrationblock_short_side_left",
        include_str!("../labware/opentrons_calibrationblock_short_side_left.json"),
    ),
    (
        "opentrons_calibrationblock_short_side_right",
        include_str!("../labware/opentrons_calibrationblock_short_side_right.json"),
    ),
    (
        "opentrons_1_trash_1100ml_fixed",
        include_str!("../labware/opentrons_1_trash_1100ml_fixed.json"),
    ),
    (
        "opentrons_1_trash_850ml_fixed",
        include_str!("../labware/opentrons_1_trash_850ml_fixed.json"),
    ),
];

/// Read-only catalogue of bundled labware definitions, keyed by URI.
#[derive(Debug)]
pub struct LabwareLibrary {
    definitions: BTreeMap<LabwareUri, Arc<LabwareDefinition>>,
}

impl LabwareLibrary {
    /// The shared bundled library.
    ///
    /// # Errors
    ///
    /// Returns `LibraryUnavailable` if a bundled document does not parse.
    pub fn bundled() -> Result<&'static LabwareLibrary, DeckError> {
        static LIBRARY: OnceLock<Result<LabwareLibrary, String>> = OnceLock::new();
        LIBRARY
            .get_or_init(|| Self::parse_bundled().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| DeckError::LibraryUnavailable(e.clone()))
    }

    fn parse_bundled() -> Result<LabwareLibrary, DeckError> {
        let mut definitions = BTreeMap::new();
        for (_, text) in BUNDLED {
            let def: LabwareDefinition = serde_json::from_str(text)?;
            definitions.insert(def.uri(), Arc::new(def));
        }
        Ok(LabwareLibrary { definitions })
    }

    /// Look up a definition by its full URI.
    pub fn get(&self, uri: &LabwareUri) -> Result<Arc<LabwareDefinition>, DeckError> {
        self.definitions
            .get(uri)
            .cloned()
            .ok_or_else(|| DeckError::DefinitionNotFound(uri.to_string()))
    }

    /// Look up a version-1 definition in the `opentrons` namespace.
    pub fn load(&self, load_name: &str) -> Result<Arc<LabwareDefinition>, DeckError> {
        self.get(&LabwareUri::new(OPENTRONS_NAMESPACE, load_name, 1))
    }

    /// Parse `uri` and look it up.
    pub fn get_by_str(&self, uri: &str) -> Result<Arc<LabwareDefinition>, DeckError> {
        self.get(&LabwareUri::parse(uri)?)
    }

    pub fn uris(&self) -> impl Iterator<Item = &LabwareUri> {
        self.definitions.keys()
    }
}
