//! Errors raised by deck and labware operations.

use thiserror::Error;

use pcal_core::{CanonicalizationError, GeometryError};

/// Error in deck placement, labware lookup, or definition handling.
#[derive(Error, Debug)]
pub enum DeckError {
    /// Slot name is not one of `1`..`12`.
    #[error("unknown deck slot {0:?}")]
    UnknownSlot(String),

    /// The slot already holds labware.
    #[error("slot {slot} is already occupied by {occupant}")]
    SlotOccupied {
        /// The requested slot.
        slot: String,
        /// Load name of the labware already there.
        occupant: String,
    },

    /// The slot holds a fixture that cannot be removed or replaced.
    #[error("slot {0} holds a fixed fixture")]
    FixedSlot(String),

    /// A well name is not present in the labware definition.
    #[error("labware {labware} has no well {well}")]
    WellNotFound {
        /// Load name of the labware.
        labware: String,
        /// The requested well.
        well: String,
    },

    /// The labware definition has an empty well ordering.
    #[error("labware {0} has no wells in its ordering")]
    EmptyOrdering(String),

    /// No bundled definition matches the requested identity.
    #[error("no labware definition found for {0}")]
    DefinitionNotFound(String),

    /// The bundled library failed to initialise.
    #[error("bundled labware library unavailable: {0}")]
    LibraryUnavailable(String),

    /// A definition document could not be parsed into the typed model.
    #[error("invalid labware definition: {0}")]
    InvalidDefinition(#[from] serde_json::Error),

    /// A definition document failed schema validation.
    #[error(transparent)]
    Schema(#[from] pcal_schema::SchemaValidationError),

    /// A labware URI could not be parsed.
    #[error(transparent)]
    Uri(#[from] GeometryError),

    /// Canonical serialization for hashing failed.
    #[error("cannot hash labware definition: {0}")]
    Hash(#[from] CanonicalizationError),
}
