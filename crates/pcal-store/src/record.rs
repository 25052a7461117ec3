//! # Calibration Records
//!
//! The two persisted results of a calibration session. Both carry the
//! content hash of the tip rack they were measured with, so a record can be
//! matched against a rack definition regardless of where it was loaded
//! from.

use serde::{Deserialize, Serialize};

use pcal_core::{Mount, PipetteId, Point, Timestamp};

/// Correction for a pipette's mounting variance on one mount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipetteOffsetRecord {
    pub pipette_id: PipetteId,
    pub mount: Mount,
    pub offset: Point,
    pub tiprack_hash: String,
    /// URI of the rack used, as recorded. Not validated on load.
    pub tiprack_uri: String,
    pub last_modified: Timestamp,
}

impl PipetteOffsetRecord {
    pub fn new(
        pipette_id: PipetteId,
        mount: Mount,
        offset: Point,
        tiprack_hash: impl Into<String>,
        tiprack_uri: impl Into<String>,
    ) -> Self {
        Self {
            pipette_id,
            mount,
            offset,
            tiprack_hash: tiprack_hash.into(),
            tiprack_uri: tiprack_uri.into(),
            last_modified: Timestamp::now(),
        }
    }
}

/// Length a tip from one rack adds below a pipette's nozzle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TipLengthRecord {
    pub pipette_id: PipetteId,
    pub tiprack_hash: String,
    pub tiprack_uri: String,
    pub tip_length: f64,
    pub last_modified: Timestamp,
}

impl TipLengthRecord {
    pub fn new(
        pipette_id: PipetteId,
        tiprack_hash: impl Into<String>,
        tiprack_uri: impl Into<String>,
        tip_length: f64,
    ) -> Self {
        Self {
            pipette_id,
            tiprack_hash: tiprack_hash.into(),
            tiprack_uri: tiprack_uri.into(),
            tip_length,
            last_modified: Timestamp::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_record_wire_format() {
        let rec = PipetteOffsetRecord {
            pipette_id: PipetteId::new("P3HSV2020041502"),
            mount: Mount::Right,
            offset: Point::new(1.0, -2.0, 0.5),
            tiprack_hash: "abc".into(),
            tiprack_uri: "opentrons/opentrons_96_tiprack_300ul/1".into(),
            last_modified: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
        };
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["pipetteId"], "P3HSV2020041502");
        assert_eq!(v["mount"], "right");
        assert_eq!(v["offset"]["y"], -2.0);
        assert_eq!(v["tiprackUri"], "opentrons/opentrons_96_tiprack_300ul/1");
        let back: PipetteOffsetRecord = serde_json::from_value(v).unwrap();
        assert_eq!(back, rec);
    }

    #[test]
    fn test_tip_length_record_keeps_unparsed_uri() {
        let v = serde_json::json!({
            "pipetteId": "P20",
            "tiprackHash": "abc",
            "tiprackUri": "not-a-uri",
            "tipLength": 30.0,
            "lastModified": "2026-01-15T12:00:00Z",
        });
        let rec: TipLengthRecord = serde_json::from_value(v).unwrap();
        assert_eq!(rec.tiprack_uri, "not-a-uri");
        assert_eq!(rec.tip_length, 30.0);
    }
}
