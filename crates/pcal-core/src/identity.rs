//! # Identity Newtypes
//!
//! Newtype wrappers for the identifiers that key calibration data. A
//! pipette serial, a session id, and a labware URI are distinct types and
//! cannot be confused at call sites.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::GeometryError;

/// Serial number of a physical pipette. Calibration records are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PipetteId(pub String);

impl PipetteId {
    pub fn new(serial: impl Into<String>) -> Self {
        Self(serial.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PipetteId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique identifier for one calibration session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new random session identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session:{}", self.0)
    }
}

/// Fully-qualified labware identity: `namespace/loadName/version`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LabwareUri {
    pub namespace: String,
    pub load_name: String,
    pub version: u32,
}

impl LabwareUri {
    pub fn new(namespace: impl Into<String>, load_name: impl Into<String>, version: u32) -> Self {
        Self {
            namespace: namespace.into(),
            load_name: load_name.into(),
            version,
        }
    }

    /// Parse a `namespace/loadName/version` string.
    pub fn parse(uri: &str) -> Result<Self, GeometryError> {
        let invalid = |reason: &str| GeometryError::InvalidUri {
            uri: uri.to_string(),
            reason: reason.to_string(),
        };
        let parts: Vec<&str> = uri.split('/').collect();
        let [namespace, load_name, version] = parts.as_slice() else {
            return Err(invalid("expected exactly three '/'-separated parts"));
        };
        if namespace.is_empty() {
            return Err(invalid("empty namespace"));
        }
        if load_name.is_empty() {
            return Err(invalid("empty load name"));
        }
        let version = version
            .parse::<u32>()
            .map_err(|_| invalid("version is not a non-negative integer"))?;
        Ok(Self::new(*namespace, *load_name, version))
    }
}

impl std::fmt::Display for LabwareUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.namespace, self.load_name, self.version)
    }
}

impl FromStr for LabwareUri {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for LabwareUri {
    type Error = GeometryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LabwareUri> for String {
    fn from(uri: LabwareUri) -> Self {
        uri.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labware_uri_parse() {
        let uri = LabwareUri::parse("opentrons/opentrons_96_tiprack_300ul/1").unwrap();
        assert_eq!(uri.namespace, "opentrons");
        assert_eq!(uri.load_name, "opentrons_96_tiprack_300ul");
        assert_eq!(uri.version, 1);
        assert_eq!(uri.to_string(), "opentrons/opentrons_96_tiprack_300ul/1");
    }

    #[test]
    fn test_labware_uri_rejects_malformed() {
        assert!(LabwareUri::parse("").is_err());
        assert!(LabwareUri::parse("opentrons/rack").is_err());
        assert!(LabwareUri::parse("opentrons/rack/1/extra").is_err());
        assert!(LabwareUri::parse("/rack/1").is_err());
        assert!(LabwareUri::parse("opentrons//1").is_err());
        assert!(LabwareUri::parse("opentrons/rack/v1").is_err());
    }

    #[test]
    fn test_labware_uri_serde_as_string() {
        let uri = LabwareUri::new("custom", "my_rack", 2);
        let json = serde_json::to_string(&uri).unwrap();
        assert_eq!(json, "\"custom/my_rack/2\"");
        let back: LabwareUri = serde_json::from_str(&json).unwrap();
        assert_eq!(back, uri);
        assert!(serde_json::from_str::<LabwareUri>("\"bad\"").is_err());
    }

    #[test]
    fn test_pipette_id_transparent() {
        let id = PipetteId::new("P3HSV2020041502");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"P3HSV2020041502\"");
        assert_eq!(id.to_string(), "P3HSV2020041502");
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(SessionId::new(), SessionId::new());
        assert!(SessionId::new().to_string().starts_with("session:"));
    }
}
