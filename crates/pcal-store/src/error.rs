//! Errors raised by calibration stores.

use std::path::PathBuf;

use thiserror::Error;

use pcal_core::PipetteId;

#[derive(Error, Debug)]
pub enum StoreError {
    /// No tip-length record exists for the pipette and tip rack.
    #[error("no tip length calibration for pipette {pipette_id} with tip rack {tiprack_hash}")]
    NotFound {
        /// The pipette queried.
        pipette_id: PipetteId,
        /// Content hash of the tip rack queried.
        tiprack_hash: String,
    },

    /// A record key cannot be used as a storage path component.
    #[error("invalid record key {0:?}")]
    InvalidKey(String),

    /// Reading or writing a record file failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// A record file does not hold a valid record.
    #[error("corrupt record {path}: {source}")]
    Corrupt {
        /// The file involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// A record could not be serialized.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this error only reports an absent record.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
