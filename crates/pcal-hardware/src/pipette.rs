//! # Pipette Models and Descriptors
//!
//! A [`PipetteModelConfig`] is the static configuration shared by every
//! pipette of one model, loaded from the bundled `pipette_models.yaml`. A
//! [`PipetteDescriptor`] is one physical pipette on one mount: its model
//! configuration plus its serial number and live instrument state.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use pcal_core::{LabwareUri, Mount, PipetteId, Point};

use crate::error::HardwareError;

const PIPETTE_MODELS_YAML: &str = include_str!("../data/pipette_models.yaml");

/// Static configuration for one pipette model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipetteModelConfig {
    pub name: String,
    pub display_name: String,
    pub channels: u8,
    pub max_volume: u32,
    /// Nominal tip length before any calibration, in mm.
    pub tip_length: f64,
    /// Fraction of the tip length kept above the rack when returning a tip.
    pub return_tip_height: f64,
    /// Motor current for tip pick-up, in amperes.
    pub pick_up_current: f64,
    pub default_tipracks: Vec<LabwareUri>,
    /// Tip overlap in mm, keyed by tip-rack URI.
    #[serde(default)]
    pub tip_overlap: BTreeMap<String, f64>,
}

impl PipetteModelConfig {
    /// Look up a model (e.g. `p300_single_v2.0`) in the bundled table.
    pub fn lookup(model: &str) -> Result<&'static PipetteModelConfig, HardwareError> {
        models()?
            .get(model)
            .ok_or_else(|| HardwareError::UnknownModel(model.to_string()))
    }

    /// Every model name in the bundled table, sorted.
    pub fn model_names() -> Result<Vec<&'static str>, HardwareError> {
        Ok(models()?.keys().map(String::as_str).collect())
    }
}

fn models() -> Result<&'static BTreeMap<String, PipetteModelConfig>, HardwareError> {
    static MODELS: OnceLock<Result<BTreeMap<String, PipetteModelConfig>, String>> =
        OnceLock::new();
    MODELS
        .get_or_init(|| serde_yaml::from_str(PIPETTE_MODELS_YAML).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| HardwareError::ModelTable(e.clone()))
}

/// One physical pipette attached to a mount.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipetteDescriptor {
    pub model: String,
    pub name: String,
    pub display_name: String,
    pub pipette_id: PipetteId,
    pub mount: Mount,
    pub channels: u8,
    pub max_volume: u32,
    pub tip_overlap: BTreeMap<String, f64>,
    pub default_tipracks: Vec<LabwareUri>,
    pub return_tip_height: f64,
    /// Nominal tip length from the model configuration.
    pub config_tip_length: f64,
    /// Pick-up current currently configured on the instrument.
    pub pick_up_current: f64,
    /// Tip length the instrument is currently using, once overridden.
    pub current_tip_length: Option<f64>,
    /// Offset correction currently applied to the instrument.
    pub pipette_offset: Point,
    pub has_tip: bool,
}

impl PipetteDescriptor {
    /// A freshly attached pipette of `model`, with no tip and no offset.
    pub fn from_model(
        model: &str,
        pipette_id: PipetteId,
        mount: Mount,
    ) -> Result<Self, HardwareError> {
        let config = PipetteModelConfig::lookup(model)?;
        Ok(Self {
            model: model.to_string(),
            name: config.name.clone(),
            display_name: config.display_name.clone(),
            pipette_id,
            mount,
            channels: config.channels,
            max_volume: config.max_volume,
            tip_overlap: config.tip_overlap.clone(),
            default_tipracks: config.default_tipracks.clone(),
            return_tip_height: config.return_tip_height,
            config_tip_length: config.tip_length,
            pick_up_current: config.pick_up_current,
            current_tip_length: None,
            pipette_offset: Point::ZERO,
            has_tip: false,
        })
    }

    pub fn is_multichannel(&self) -> bool {
        self.channels > 1
    }

    /// Tip overlap for a rack; racks not in the table have none.
    pub fn tip_overlap_for(&self, tiprack: &LabwareUri) -> f64 {
        self.tip_overlap
            .get(&tiprack.to_string())
            .copied()
            .unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_table_parses() {
        let names = PipetteModelConfig::model_names().unwrap();
        assert!(names.contains(&"p300_single_v2.0"));
        assert!(names.contains(&"p20_multi_v2.0"));
        assert_eq!(names.len(), 8);
    }

    #[test]
    fn test_lookup_model() {
        let cfg = PipetteModelConfig::lookup("p300_multi_v2.0").unwrap();
        assert_eq!(cfg.channels, 8);
        assert_eq!(cfg.max_volume, 300);
        assert_eq!(
            cfg.default_tipracks,
            vec![LabwareUri::new("opentrons", "opentrons_96_tiprack_300ul", 1)]
        );
    }

    #[test]
    fn test_unknown_model() {
        assert_eq!(
            PipetteModelConfig::lookup("p5000_single"),
            Err(HardwareError::UnknownModel("p5000_single".into()))
        );
    }

    #[test]
    fn test_descriptor_from_model() {
        let d = PipetteDescriptor::from_model(
            "p1000_single_v2.0",
            PipetteId::new("P1KSV2020010101"),
            Mount::Left,
        )
        .unwrap();
        assert_eq!(d.name, "p1000_single_gen2");
        assert!(!d.is_multichannel());
        assert!(!d.has_tip);
        assert_eq!(d.current_tip_length, None);
        assert_eq!(d.pipette_offset, Point::ZERO);
        assert_eq!(d.return_tip_height, 0.71);
    }

    #[test]
    fn test_tip_overlap_defaults_to_zero() {
        let d = PipetteDescriptor::from_model(
            "p300_single_v2.0",
            PipetteId::new("P3HSV2020041502"),
            Mount::Right,
        )
        .unwrap();
        let default_rack = LabwareUri::new("opentrons", "opentrons_96_tiprack_300ul", 1);
        assert_eq!(d.tip_overlap_for(&default_rack), 8.2);
        let custom = LabwareUri::new("custom_beta", "my_rack", 1);
        assert_eq!(d.tip_overlap_for(&custom), 0.0);
    }
}
