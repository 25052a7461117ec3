//! # Canonical Serialization — JCS Byte Production
//!
//! This module defines `CanonicalBytes`, the sole construction path for bytes
//! used in content hashing across the workspace.
//!
//! ## Invariant
//!
//! The `CanonicalBytes` newtype has a private inner field. The only ways to
//! construct it are [`CanonicalBytes::new()`] and
//! [`CanonicalBytes::excluding_keys()`], both of which serialize through
//! `serde_jcs` (RFC 8785: sorted keys, compact separators, ECMAScript number
//! formatting). Any function requiring canonical bytes for a digest must
//! accept `&CanonicalBytes`.
//!
//! Labware definitions carry fractional millimetre dimensions, so floats are
//! accepted and rendered in their shortest round-trip form.

use serde::Serialize;
use serde_json::Value;

use crate::error::CanonicalizationError;

/// Bytes produced exclusively by JCS canonicalization.
///
/// # Invariants
///
/// - Object keys are sorted, at every depth.
/// - Separators are compact; there is no insignificant whitespace.
/// - The inner `Vec<u8>` is private.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalBytes(Vec<u8>);

impl CanonicalBytes {
    /// Construct canonical bytes from any serializable value.
    pub fn new(obj: &impl Serialize) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        Ok(Self(serialize_canonical(&value)?))
    }

    /// Construct canonical bytes from a JSON object with the named top-level
    /// keys removed.
    ///
    /// Used for content identity of documents that carry presentation-only
    /// sections (display names, vendor branding) which must not affect the
    /// digest.
    ///
    /// # Errors
    ///
    /// Returns `CanonicalizationError::NotAnObject` if the value does not
    /// serialize to a JSON object.
    pub fn excluding_keys(
        obj: &impl Serialize,
        excluded: &[&str],
    ) -> Result<Self, CanonicalizationError> {
        let value = serde_json::to_value(obj)?;
        let Value::Object(mut map) = value else {
            return Err(CanonicalizationError::NotAnObject);
        };
        for key in excluded {
            map.remove(*key);
        }
        Ok(Self(serialize_canonical(&Value::Object(map))?))
    }

    /// Access the canonical bytes for digest computation.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the length of the canonical byte sequence.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the canonical byte sequence is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[u8]> for CanonicalBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

fn serialize_canonical(value: &Value) -> Result<Vec<u8>, CanonicalizationError> {
    let s = serde_jcs::to_string(value)?;
    Ok(s.into_bytes())
}
