//! # Error Types — Structured Error Hierarchy
//!
//! Errors raised by the foundational types. All errors use `thiserror` for
//! derive-based `Display` and `Error` implementations.
//!
//! ## Design
//!
//! - Parsing errors carry the offending input verbatim.
//! - Canonicalization errors wrap the underlying serde failure.

use thiserror::Error;

/// Top-level error type for the foundational crate.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Canonicalization failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),

    /// A geometric value could not be parsed.
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A timestamp was malformed or not UTC.
    #[error("invalid timestamp: {0}")]
    Timestamp(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Top-level key exclusion was requested on a non-object document.
    #[error("cannot exclude keys from a non-object JSON value")]
    NotAnObject,
}

/// Error parsing geometric and identifier primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    /// Mount name was neither `left` nor `right`.
    #[error("unknown mount {0:?}; expected \"left\" or \"right\"")]
    UnknownMount(String),

    /// Labware URI did not have the `namespace/loadName/version` shape.
    #[error("invalid labware uri {uri:?}: {reason}")]
    InvalidUri {
        /// The URI as supplied.
        uri: String,
        /// Which part was malformed.
        reason: String,
    },

    /// A vector literal did not have exactly three components.
    #[error("expected a 3-component vector, got {0} components")]
    VectorArity(usize),
}
