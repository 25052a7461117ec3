//! # Labware Definitions
//!
//! The typed form of a labware definition document (schema version 2).
//! Field names follow the document's camelCase keys. Keys this model does
//! not name are kept in `extra` maps so that re-serializing a definition
//! loses nothing, which matters for [`hash_definition`].
//!
//! ## Content Identity
//!
//! Calibration records refer to the tip rack they were measured on by
//! content hash, not by name: two racks with the same load name but
//! different geometry must not share a tip length. The hash covers the
//! whole document except the presentation-only `metadata`, `brand`, and
//! `groups` sections.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use pcal_core::{sha256_hex, CanonicalBytes, LabwareUri, Point};
use pcal_schema::SchemaValidator;

use crate::error::DeckError;

/// Top-level keys excluded from the content hash.
const HASH_EXCLUDED_KEYS: [&str; 3] = ["metadata", "brand", "groups"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareDefinition {
    pub schema_version: u32,
    pub version: u32,
    pub namespace: String,
    pub metadata: LabwareMetadata,
    pub brand: Value,
    pub parameters: LabwareParameters,
    pub ordering: Vec<Vec<String>>,
    pub corner_offset_from_slot: Point,
    pub dimensions: Dimensions,
    pub wells: BTreeMap<String, WellDefinition>,
    #[serde(default)]
    pub groups: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareMetadata {
    pub display_name: String,
    pub display_category: String,
    pub display_volume_units: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabwareParameters {
    pub format: String,
    pub is_tiprack: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_length: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tip_overlap: Option<f64>,
    pub load_name: String,
    pub is_magnetic_module_compatible: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dimensions {
    pub x_dimension: f64,
    pub y_dimension: f64,
    pub z_dimension: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WellShape {
    Circular,
    Rectangular,
}

/// One well, positioned relative to the labware's front-left-bottom corner.
/// `(x, y, z)` is the centre of the well bottom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WellDefinition {
    pub depth: f64,
    pub total_liquid_volume: f64,
    pub shape: WellShape,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diameter: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x_dimension: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y_dimension: Option<f64>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LabwareDefinition {
    /// Schema-validate a raw document, then parse it.
    pub fn from_value(document: Value, validator: &SchemaValidator) -> Result<Self, DeckError> {
        validator.validate_labware(&document)?;
        Ok(serde_json::from_value(document)?)
    }

    /// `namespace/loadName/version`.
    pub fn uri(&self) -> LabwareUri {
        LabwareUri::new(
            self.namespace.clone(),
            self.parameters.load_name.clone(),
            self.version,
        )
    }

    pub fn load_name(&self) -> &str {
        &self.parameters.load_name
    }

    pub fn is_tiprack(&self) -> bool {
        self.parameters.is_tiprack
    }

    /// The name of the first well in ordering (`A1` for standard racks).
    pub fn first_well(&self) -> Option<&str> {
        self.ordering
            .first()
            .and_then(|column| column.first())
            .map(String::as_str)
    }

    /// The content hash calibration records are keyed on.
    pub fn content_hash(&self) -> Result<String, DeckError> {
        hash_definition(self)
    }
}

/// SHA-256 hex of the canonical definition, ignoring `metadata`, `brand`,
/// and `groups`.
///
/// Accepts either a typed [`LabwareDefinition`] or a raw JSON document;
/// both hash identically for the same content.
pub fn hash_definition(definition: &impl Serialize) -> Result<String, DeckError> {
    let canonical = CanonicalBytes::excluding_keys(definition, &HASH_EXCLUDED_KEYS)?;
    Ok(sha256_hex(&canonical))
}
