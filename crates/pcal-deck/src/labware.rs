//! Labware placed in a deck slot, and its wells in deck coordinates.

use std::sync::Arc;

use pcal_core::{LabwareUri, Point};

use crate::definition::LabwareDefinition;
use crate::error::DeckError;

/// A labware definition placed at a slot.
///
/// `origin` is the labware's front-left-bottom corner in deck space: the
/// slot position plus the definition's `cornerOffsetFromSlot`.
#[derive(Debug, Clone)]
pub struct Labware {
    definition: Arc<LabwareDefinition>,
    slot: String,
    origin: Point,
}

impl Labware {
    pub fn new(definition: Arc<LabwareDefinition>, slot: impl Into<String>, slot_position: Point) -> Self {
        let origin = slot_position + definition.corner_offset_from_slot;
        Self {
            definition,
            slot: slot.into(),
            origin,
        }
    }

    pub fn definition(&self) -> &Arc<LabwareDefinition> {
        &self.definition
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn uri(&self) -> LabwareUri {
        self.definition.uri()
    }

    pub fn load_name(&self) -> &str {
        self.definition.load_name()
    }

    pub fn is_tiprack(&self) -> bool {
        self.definition.is_tiprack()
    }

    /// Nominal tip length for a tip rack; `None` for other labware.
    pub fn tip_length(&self) -> Option<f64> {
        self.definition.parameters.tip_length
    }

    /// Height of the labware's top surface in deck space.
    pub fn highest_z(&self) -> f64 {
        self.origin.z + self.definition.dimensions.z_dimension
    }

    /// Resolve a well by name.
    pub fn well(&self, name: &str) -> Result<Well, DeckError> {
        let def = self
            .definition
            .wells
            .get(name)
            .ok_or_else(|| DeckError::WellNotFound {
                labware: self.load_name().to_string(),
                well: name.to_string(),
            })?;
        Ok(Well {
            name: name.to_string(),
            bottom_center: self.origin + Point::new(def.x, def.y, def.z),
            depth: def.depth,
        })
    }

    /// The first well in the definition's ordering.
    pub fn first_well(&self) -> Result<Well, DeckError> {
        let name = self
            .definition
            .first_well()
            .ok_or_else(|| DeckError::EmptyOrdering(self.load_name().to_string()))?;
        self.well(name)
    }

    /// Every well, column by column as the definition orders them.
    pub fn wells(&self) -> Result<Vec<Well>, DeckError> {
        self.definition
            .ordering
            .iter()
            .flatten()
            .map(|name| self.well(name))
            .collect()
    }
}

/// A single well resolved to deck space.
#[derive(Debug, Clone, PartialEq)]
pub struct Well {
    name: String,
    bottom_center: Point,
    depth: f64,
}

impl Well {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Centre of the well opening.
    pub fn top(&self) -> Point {
        self.bottom_center + Point::new(0.0, 0.0, self.depth)
    }

    /// Centre of the well floor.
    pub fn bottom(&self) -> Point {
        self.bottom_center
    }

    /// Centre of the well's volume.
    pub fn center(&self) -> Point {
        self.bottom_center + Point::new(0.0, 0.0, self.depth / 2.0)
    }
}
