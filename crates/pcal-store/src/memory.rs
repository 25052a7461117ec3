//! In-memory calibration store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use pcal_core::{Mount, PipetteId};

use crate::error::StoreError;
use crate::record::{PipetteOffsetRecord, TipLengthRecord};
use crate::store::CalibrationStore;

#[derive(Debug, Default)]
struct Inner {
    offsets: HashMap<(PipetteId, Mount), PipetteOffsetRecord>,
    tip_lengths: HashMap<(PipetteId, String), TipLengthRecord>,
}

/// Calibration records held in process memory.
///
/// Cheaply cloneable via `Arc`; all clones share the same records.
#[derive(Debug, Clone, Default)]
pub struct MemoryCalibrationStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryCalibrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn offset_count(&self) -> usize {
        self.inner.read().offsets.len()
    }

    pub fn tip_length_count(&self) -> usize {
        self.inner.read().tip_lengths.len()
    }
}

#[async_trait]
impl CalibrationStore for MemoryCalibrationStore {
    async fn load_offset(
        &self,
        pipette_id: &PipetteId,
        mount: Mount,
    ) -> Result<Option<PipetteOffsetRecord>, StoreError> {
        Ok(self
            .inner
            .read()
            .offsets
            .get(&(pipette_id.clone(), mount))
            .cloned())
    }

    async fn save_offset(&self, record: PipetteOffsetRecord) -> Result<(), StoreError> {
        let key = (record.pipette_id.clone(), record.mount);
        self.inner.write().offsets.insert(key, record);
        Ok(())
    }

    async fn load_tip_length(
        &self,
        pipette_id: &PipetteId,
        tiprack_hash: &str,
    ) -> Result<TipLengthRecord, StoreError> {
        self.inner
            .read()
            .tip_lengths
            .get(&(pipette_id.clone(), tiprack_hash.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                pipette_id: pipette_id.clone(),
                tiprack_hash: tiprack_hash.to_string(),
            })
    }

    async fn save_tip_length(&self, record: TipLengthRecord) -> Result<(), StoreError> {
        let key = (record.pipette_id.clone(), record.tiprack_hash.clone());
        self.inner.write().tip_lengths.insert(key, record);
        Ok(())
    }

    async fn delete_offset(&self, pipette_id: &PipetteId, mount: Mount) -> Result<(), StoreError> {
        self.inner
            .write()
            .offsets
            .remove(&(pipette_id.clone(), mount));
        Ok(())
    }
}
