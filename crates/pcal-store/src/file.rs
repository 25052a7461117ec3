//! # Filesystem Calibration Store
//!
//! One JSON document per record under a calibration directory:
//!
//! ```text
//! <root>/pipette_offset/<mount>/<pipette id>.json
//! <root>/tip_length/<pipette id>/<tip rack hash>.json
//! ```
//!
//! Writes go to a sibling `.tmp` file first and are renamed into place, so
//! a reader never observes a half-written record.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use pcal_core::{Mount, PipetteId};

use crate::error::StoreError;
use crate::record::{PipetteOffsetRecord, TipLengthRecord};
use crate::store::CalibrationStore;

const OFFSET_DIR: &str = "pipette_offset";
const TIP_LENGTH_DIR: &str = "tip_length";

#[derive(Debug, Clone)]
pub struct FileCalibrationStore {
    root: PathBuf,
}

impl FileCalibrationStore {
    /// A store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn offset_path(&self, pipette_id: &PipetteId, mount: Mount) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(OFFSET_DIR)
            .join(mount.as_str())
            .join(format!("{}.json", path_component(pipette_id.as_str())?)))
    }

    fn tip_length_path(
        &self,
        pipette_id: &PipetteId,
        tiprack_hash: &str,
    ) -> Result<PathBuf, StoreError> {
        Ok(self
            .root
            .join(TIP_LENGTH_DIR)
            .join(path_component(pipette_id.as_str())?)
            .join(format!("{}.json", path_component(tiprack_hash)?)))
    }
}

/// Reject keys that would escape their directory.
fn path_component(key: &str) -> Result<&str, StoreError> {
    if key.is_empty()
        || key == "."
        || key == ".."
        || key.contains(['/', '\\', '\0'])
    {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    Ok(key)
}

async fn read_record<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, StoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    serde_json::from_slice(&bytes)
        .map(Some)
        .map_err(|source| StoreError::Corrupt {
            path: path.to_path_buf(),
            source,
        })
}

async fn write_record<T: Serialize>(path: &Path, record: &T) -> Result<(), StoreError> {
    let io_err = |source: std::io::Error| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    let bytes = serde_json::to_vec_pretty(record)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, &bytes).await.map_err(io_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_err)?;
    tracing::debug!(path = %path.display(), "calibration record written");
    Ok(())
}

#[async_trait]
impl CalibrationStore for FileCalibrationStore {
    async fn load_offset(
        &self,
        pipette_id: &PipetteId,
        mount: Mount,
    ) -> Result<Option<PipetteOffsetRecord>, StoreError> {
        read_record(&self.offset_path(pipette_id, mount)?).await
    }

    async fn save_offset(&self, record: PipetteOffsetRecord) -> Result<(), StoreError> {
        let path = self.offset_path(&record.pipette_id, record.mount)?;
        write_record(&path, &record).await
    }

    async fn load_tip_length(
        &self,
        pipette_id: &PipetteId,
        tiprack_hash: &str,
    ) -> Result<TipLengthRecord, StoreError> {
        read_record(&self.tip_length_path(pipette_id, tiprack_hash)?)
            .await?
            .ok_or_else(|| StoreError::NotFound {
                pipette_id: pipette_id.clone(),
                tiprack_hash: tiprack_hash.to_string(),
            })
    }

    async fn save_tip_length(&self, record: TipLengthRecord) -> Result<(), StoreError> {
        let path = self.tip_length_path(&record.pipette_id, &record.tiprack_hash)?;
        write_record(&path, &record).await
    }

    async fn delete_offset(&self, pipette_id: &PipetteId, mount: Mount) -> Result<(), StoreError> {
        let path = self.offset_path(pipette_id, mount)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "calibration record deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcal_core::Point;

    fn rack() -> &'static str {
        "opentrons/opentrons_96_tiprack_20ul/1"
    }

    #[tokio::test]
    async fn test_offset_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let id = PipetteId::new("P20MV2020052201");
        let rec = PipetteOffsetRecord::new(id.clone(), Mount::Left, Point::new(0.5, -1.5, 2.0), "abc", rack());
        FileCalibrationStore::new(dir.path())
            .save_offset(rec.clone())
            .await
            .unwrap();

        let reopened = FileCalibrationStore::new(dir.path());
        assert_eq!(reopened.load_offset(&id, Mount::Left).await.unwrap(), Some(rec));
        assert!(dir
            .path()
            .join("pipette_offset/left/P20MV2020052201.json")
            .exists());
    }

    #[tokio::test]
    async fn test_missing_offset_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path());
        assert_eq!(
            store.load_offset(&PipetteId::new("P20"), Mount::Right).await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_tip_length_not_found_then_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path());
        let id = PipetteId::new("P20");
        assert!(store.load_tip_length(&id, "abc").await.unwrap_err().is_not_found());
        store
            .save_tip_length(TipLengthRecord::new(id.clone(), "abc", rack(), 31.25))
            .await
            .unwrap();
        let rec = store.load_tip_length(&id, "abc").await.unwrap();
        assert_eq!(rec.tip_length, 31.25);
        assert_eq!(rec.tiprack_uri, rack());
    }

    #[tokio::test]
    async fn test_save_replaces_previous() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path());
        let id = PipetteId::new("P20");
        for z in [1.0, 2.0] {
            store
                .save_offset(PipetteOffsetRecord::new(id.clone(), Mount::Right, Point::new(0.0, 0.0, z), "h", rack()))
                .await
                .unwrap();
        }
        let rec = store.load_offset(&id, Mount::Right).await.unwrap().unwrap();
        assert_eq!(rec.offset.z, 2.0);
    }

    #[tokio::test]
    async fn test_delete_offset() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path());
        let id = PipetteId::new("P20");
        store
            .save_offset(PipetteOffsetRecord::new(id.clone(), Mount::Right, Point::ZERO, "h", rack()))
            .await
            .unwrap();
        store.delete_offset(&id, Mount::Right).await.unwrap();
        store.delete_offset(&id, Mount::Right).await.unwrap();
        assert_eq!(store.load_offset(&id, Mount::Right).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_record_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipette_offset/right");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("P20.json"), b"{not json").unwrap();
        let err = FileCalibrationStore::new(dir.path())
            .load_offset(&PipetteId::new("P20"), Mount::Right)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCalibrationStore::new(dir.path());
        let err = store
            .load_offset(&PipetteId::new("../escape"), Mount::Left)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidKey(_)));
    }
}
