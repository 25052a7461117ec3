//! Shared fixtures for session integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use serde_json::{json, Value};

use pcal_core::{Mount, PipetteId, Point};
use pcal_deck::{LabwareDefinition, LabwareLibrary};
use pcal_hardware::{ArcPlanner, SimulatedHardware};
use pcal_session::{CalibrationConfig, CalibrationSession, SessionError, SessionParams};
use pcal_state::{OffsetState, TipLengthOffsetState, WorkflowState};
use pcal_store::{CalibrationStore, MemoryCalibrationStore, PipetteOffsetRecord, TipLengthRecord};

pub const SINGLE_300: &str = "p300_single_v2.0";
pub const MULTI_20: &str = "p20_multi_v2.0";

pub const TIPRACK_300_URI: &str = "opentrons/opentrons_96_tiprack_300ul/1";

/// Nominal 300 µL tip length less the P300's overlap on that rack.
pub const EXPECTED_300_TIP_LENGTH: f64 = 59.3 - 8.2;

/// A simulated robot with one pipette and an in-memory store.
pub struct Rig {
    pub hw: SimulatedHardware,
    pub store: MemoryCalibrationStore,
    pub mount: Mount,
    pub serial: PipetteId,
}

impl Rig {
    pub fn new(mount: Mount, model: &str, serial: &str) -> Self {
        let hw = SimulatedHardware::new()
            .with_pipette(mount, model, serial)
            .unwrap();
        Self {
            hw,
            store: MemoryCalibrationStore::new(),
            mount,
            serial: PipetteId::new(serial),
        }
    }

    pub fn params(&self) -> SessionParams {
        SessionParams::new(self.mount)
    }

    pub async fn open(&self, params: SessionParams) -> Result<CalibrationSession, SessionError> {
        self.open_with(params, &CalibrationConfig::default()).await
    }

    pub async fn open_with(
        &self,
        params: SessionParams,
        config: &CalibrationConfig,
    ) -> Result<CalibrationSession, SessionError> {
        CalibrationSession::new(
            Arc::new(self.hw.clone()),
            Arc::new(ArcPlanner::default()),
            Arc::new(self.store.clone()),
            params,
            config,
        )
        .await
    }

    /// Store an offset record naming `tiprack_uri`.
    pub async fn seed_offset(&self, offset: Point, tiprack_uri: &str) {
        self.store
            .save_offset(PipetteOffsetRecord::new(
                self.serial.clone(),
                self.mount,
                offset,
                rack_300_hash(),
                tiprack_uri,
            ))
            .await
            .unwrap();
    }

    /// Store a tip length for the bundled 300 µL rack.
    pub async fn seed_tip_length(&self, tip_length: f64) {
        self.store
            .save_tip_length(TipLengthRecord::new(
                self.serial.clone(),
                rack_300_hash(),
                TIPRACK_300_URI,
                tip_length,
            ))
            .await
            .unwrap();
    }
}

pub fn rack_300() -> Arc<LabwareDefinition> {
    LabwareLibrary::bundled()
        .unwrap()
        .load("opentrons_96_tiprack_300ul")
        .unwrap()
}

pub fn rack_300_hash() -> String {
    rack_300().content_hash().unwrap()
}

/// The bundled 20 µL rack document, moved into the `custom` namespace.
pub fn custom_20ul_document() -> Value {
    let mut doc: Value = serde_json::from_str(include_str!(
        "../../../pcal-deck/labware/opentrons_96_tiprack_20ul.json"
    ))
    .unwrap();
    doc["namespace"] = json!("custom");
    doc
}

pub fn trash_document() -> Value {
    serde_json::from_str(include_str!(
        "../../../pcal-deck/labware/opentrons_1_trash_1100ml_fixed.json"
    ))
    .unwrap()
}

pub fn offset(state: OffsetState) -> WorkflowState {
    WorkflowState::PipetteOffset(state)
}

pub fn combined(state: TipLengthOffsetState) -> WorkflowState {
    WorkflowState::TipLengthAndOffset(state)
}

/// Send a command that is expected to succeed.
pub async fn send(session: &mut CalibrationSession, name: &str, data: Value) -> WorkflowState {
    match session.handle_command(name, data).await {
        Ok(state) => state,
        Err(e) => panic!("{name} failed in {}: {e}", session.current_state()),
    }
}

pub fn jog(z: f64) -> Value {
    json!({ "vector": [0.0, 0.0, z] })
}
