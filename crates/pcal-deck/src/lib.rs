//! # pcal-deck — Deck and Labware Model
//!
//! The calibration engine reasons about the deck as twelve numbered slots,
//! each holding at most one piece of labware. This crate turns labware
//! definition documents into deck-space geometry the engine can move to.
//!
//! ## Components
//!
//! - **Definitions** (`definition.rs`): the typed labware definition
//!   document, and [`hash_definition`] which derives the content identity
//!   calibration records are keyed on.
//! - **Library** (`library.rs`): definitions bundled with the crate,
//!   looked up by load name or URI.
//! - **Labware** (`labware.rs`): a definition placed in a slot; wells
//!   resolve to deck-space points.
//! - **Deck** (`deck.rs`): slot geometry, single-occupancy placement, the
//!   fixed trash, and calibration points. The [`DeckModel`] trait is the
//!   read-only view handed to motion planners.

pub mod deck;
pub mod definition;
pub mod error;
pub mod labware;
pub mod library;

pub use deck::{Deck, DeckModel, TrashKind, FIXED_TRASH_SLOT, SLOT_NAMES};
pub use definition::{hash_definition, LabwareDefinition, WellDefinition, WellShape};
pub use error::DeckError;
pub use labware::{Labware, Well};
pub use library::{LabwareLibrary, OPENTRONS_NAMESPACE};
