//! The calibration store interface.

use async_trait::async_trait;

use pcal_core::{Mount, PipetteId};

use crate::error::StoreError;
use crate::record::{PipetteOffsetRecord, TipLengthRecord};

/// Persistent calibration records shared across sessions.
///
/// A save is visible to every later load for the same pipette once the
/// save's future has resolved.
#[async_trait]
pub trait CalibrationStore: Send + Sync {
    /// The offset record for `pipette_id` on `mount`, if one exists.
    async fn load_offset(
        &self,
        pipette_id: &PipetteId,
        mount: Mount,
    ) -> Result<Option<PipetteOffsetRecord>, StoreError>;

    /// Insert or replace the offset record for the record's pipette and mount.
    async fn save_offset(&self, record: PipetteOffsetRecord) -> Result<(), StoreError>;

    /// The tip-length record for `pipette_id` and the rack hashing to
    /// `tiprack_hash`.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no such record exists.
    async fn load_tip_length(
        &self,
        pipette_id: &PipetteId,
        tiprack_hash: &str,
    ) -> Result<TipLengthRecord, StoreError>;

    /// Insert or replace the tip-length record for the record's pipette and rack.
    async fn save_tip_length(&self, record: TipLengthRecord) -> Result<(), StoreError>;

    /// Remove the offset record for `pipette_id` on `mount`. Absent records
    /// are not an error.
    async fn delete_offset(&self, pipette_id: &PipetteId, mount: Mount) -> Result<(), StoreError>;
}
