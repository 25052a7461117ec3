//! # Deck Model
//!
//! Twelve slots in a 3×4 grid, numbered left to right, front to back:
//!
//! ```text
//!   back   10  11  12 (fixed trash)
//!           7   8   9
//!           4   5   6
//!   front   1   2   3
//! ```
//!
//! Each slot holds at most one labware. Slot 12 always holds the fixed
//! trash, in one of two heights depending on the robot's trash insert.
//!
//! ## Calibration Points
//!
//! The deck carries etched crosses used as known reference positions. Their
//! coordinates are fixed by the deck geometry, not by labware.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use pcal_core::Point;

use crate::definition::LabwareDefinition;
use crate::error::DeckError;
use crate::labware::Labware;
use crate::library::LabwareLibrary;

/// Every slot name, in numeric order.
pub const SLOT_NAMES: [&str; 12] = ["1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11", "12"];

/// The slot reserved for the fixed trash.
pub const FIXED_TRASH_SLOT: &str = "12";

const SLOT_COLUMN_X: [f64; 3] = [0.0, 132.5, 265.0];
const SLOT_ROW_Y: [f64; 4] = [0.0, 90.5, 181.0, 271.5];
const SLOT_X_DIMENSION: f64 = 128.0;
const SLOT_Y_DIMENSION: f64 = 86.0;

const CALIBRATION_POINTS: [(&str, Point); 3] = [
    ("1BLC", Point::new(12.13, 9.0, 0.0)),
    ("3BRC", Point::new(380.87, 9.0, 0.0)),
    ("7TLC", Point::new(12.13, 258.0, 0.0)),
];

/// Which fixed-trash insert the robot has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrashKind {
    /// The full-height 1100 mL insert.
    #[default]
    Standard,
    /// The shortened 850 mL insert.
    Short,
}

impl TrashKind {
    pub fn load_name(&self) -> &'static str {
        match self {
            Self::Standard => "opentrons_1_trash_1100ml_fixed",
            Self::Short => "opentrons_1_trash_850ml_fixed",
        }
    }
}

/// Read-only deck geometry, as consumed by motion planning.
pub trait DeckModel: Send + Sync {
    /// Front-left-bottom corner of a slot.
    fn position_for(&self, slot: &str) -> Result<Point, DeckError>;

    /// Centre of a slot's footprint at deck height.
    fn slot_center(&self, slot: &str) -> Result<Point, DeckError>;

    /// `(front-left-bottom, back-right-top)` of a slot and whatever it holds.
    fn bounding_box(&self, slot: &str) -> Result<(Point, Point), DeckError>;

    /// Position of a named calibration point.
    fn calibration_point(&self, id: &str) -> Option<Point>;

    /// Height of the tallest labware on the deck.
    fn highest_z(&self) -> f64;
}

/// The deck: slot geometry plus the labware currently placed.
#[derive(Debug, Clone)]
pub struct Deck {
    trash_kind: TrashKind,
    slots: BTreeMap<String, Labware>,
}

impl Deck {
    /// An empty deck with the fixed trash loaded.
    pub fn new(trash_kind: TrashKind) -> Result<Self, DeckError> {
        let trash_def = LabwareLibrary::bundled()?.load(trash_kind.load_name())?;
        let trash = Labware::new(trash_def, FIXED_TRASH_SLOT, slot_position(FIXED_TRASH_SLOT)?);
        let mut slots = BTreeMap::new();
        slots.insert(FIXED_TRASH_SLOT.to_string(), trash);
        Ok(Self { trash_kind, slots })
    }

    pub fn trash_kind(&self) -> TrashKind {
        self.trash_kind
    }

    /// The labware in `slot`, if any.
    pub fn get(&self, slot: &str) -> Option<&Labware> {
        self.slots.get(slot)
    }

    /// Place labware in an empty slot.
    ///
    /// # Errors
    ///
    /// `UnknownSlot` for a name outside `1`..`12`, `FixedSlot` for the trash
    /// slot, `SlotOccupied` if the slot already holds labware.
    pub fn set(&mut self, slot: &str, labware: Labware) -> Result<(), DeckError> {
        slot_position(slot)?;
        if slot == FIXED_TRASH_SLOT {
            return Err(DeckError::FixedSlot(slot.to_string()));
        }
        if let Some(existing) = self.slots.get(slot) {
            return Err(DeckError::SlotOccupied {
                slot: slot.to_string(),
                occupant: existing.load_name().to_string(),
            });
        }
        tracing::debug!(slot, labware = %labware.uri(), "labware placed");
        self.slots.insert(slot.to_string(), labware);
        Ok(())
    }

    /// Empty a slot, returning what it held.
    pub fn remove(&mut self, slot: &str) -> Result<Option<Labware>, DeckError> {
        slot_position(slot)?;
        if slot == FIXED_TRASH_SLOT {
            return Err(DeckError::FixedSlot(slot.to_string()));
        }
        let removed = self.slots.remove(slot);
        if let Some(lw) = &removed {
            tracing::debug!(slot, labware = %lw.uri(), "labware removed");
        }
        Ok(removed)
    }

    /// Place labware, evicting whatever the slot held.
    pub fn replace(&mut self, slot: &str, labware: Labware) -> Result<Option<Labware>, DeckError> {
        let previous = self.remove(slot)?;
        self.set(slot, labware)?;
        Ok(previous)
    }

    /// Build a [`Labware`] positioned at `slot` without placing it.
    pub fn position_labware(
        &self,
        definition: Arc<LabwareDefinition>,
        slot: &str,
    ) -> Result<Labware, DeckError> {
        Ok(Labware::new(definition, slot, slot_position(slot)?))
    }

    /// The fixed trash.
    pub fn trash(&self) -> Result<&Labware, DeckError> {
        self.slots
            .get(FIXED_TRASH_SLOT)
            .ok_or_else(|| DeckError::DefinitionNotFound(self.trash_kind.load_name().to_string()))
    }

    /// Occupied slots other than the fixed trash, in slot order.
    pub fn non_fixture_slots(&self) -> Vec<(&str, &Labware)> {
        let mut occupied: Vec<(&str, &Labware)> = self
            .slots
            .iter()
            .filter(|(slot, _)| slot.as_str() != FIXED_TRASH_SLOT)
            .map(|(slot, lw)| (slot.as_str(), lw))
            .collect();
        occupied.sort_by_key(|(slot, _)| slot.parse::<u8>().unwrap_or(u8::MAX));
        occupied
    }
}

impl DeckModel for Deck {
    fn position_for(&self, slot: &str) -> Result<Point, DeckError> {
        slot_position(slot)
    }

    fn slot_center(&self, slot: &str) -> Result<Point, DeckError> {
        Ok(slot_position(slot)? + Point::new(SLOT_X_DIMENSION / 2.0, SLOT_Y_DIMENSION / 2.0, 0.0))
    }

    fn bounding_box(&self, slot: &str) -> Result<(Point, Point), DeckError> {
        let min = slot_position(slot)?;
        let height = self.slots.get(slot).map_or(0.0, Labware::highest_z);
        Ok((
            min,
            Point::new(min.x + SLOT_X_DIMENSION, min.y + SLOT_Y_DIMENSION, height),
        ))
    }

    fn calibration_point(&self, id: &str) -> Option<Point> {
        CALIBRATION_POINTS
            .iter()
            .find(|(name, _)| *name == id)
            .map(|(_, p)| *p)
    }

    fn highest_z(&self) -> f64 {
        self.slots
            .values()
            .map(Labware::highest_z)
            .fold(0.0, f64::max)
    }
}

fn slot_position(slot: &str) -> Result<Point, DeckError> {
    let index = SLOT_NAMES
        .iter()
        .position(|s| *s == slot)
        .ok_or_else(|| DeckError::UnknownSlot(slot.to_string()))?;
    Ok(Point::new(SLOT_COLUMN_X[index % 3], SLOT_ROW_Y[index / 3], 0.0))
}
