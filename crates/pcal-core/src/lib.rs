//! # pcal-core — Foundational Types for Pipette Calibration
//!
//! This crate is the leaf of the workspace DAG. It defines the primitives
//! every other crate speaks in: deck-space geometry, mounts and critical
//! points, identifier newtypes, canonical JSON bytes, content digests, and
//! UTC timestamps.
//!
//! ## Key Design Principles
//!
//! 1. **Millimetre deck coordinates.** `Point` is the only positional type.
//!    Vector arithmetic is defined on it directly so offsets compose the way
//!    they are written in calibration formulas.
//!
//! 2. **Newtype identifiers.** `PipetteId`, `SessionId`, `LabwareUri` are
//!    distinct types. A pipette serial cannot be passed where a labware URI
//!    is expected.
//!
//! 3. **`CanonicalBytes` newtype.** All content hashing flows through
//!    `CanonicalBytes::new()` (RFC 8785). Two documents with the same content
//!    and different key order hash identically.
//!
//! 4. **UTC-only timestamps.** `Timestamp` is truncated to seconds and renders
//!    with a `Z` suffix.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `pcal-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod geometry;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError, GeometryError};
pub use geometry::{CriticalPoint, Mount, Point};
pub use identity::{LabwareUri, PipetteId, SessionId};
pub use temporal::Timestamp;
