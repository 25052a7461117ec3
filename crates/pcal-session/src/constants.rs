//! Fixed deck locations and motion parameters used by calibration workflows.

use pcal_core::{Mount, Point};

/// Slot the tip rack is placed in.
pub const TIP_RACK_SLOT: &str = "8";

/// Slot whose centre-front the pipette is jogged to before point one.
pub const JOG_TO_DECK_SLOT: &str = "5";

/// Deck calibration point used as the offset reference.
pub const POINT_ONE_ID: &str = "1BLC";

pub const MOVE_TO_DECK_SAFETY_BUFFER: Point = Point::new(0.0, 10.0, 5.0);
pub const MOVE_TO_TIP_RACK_SAFETY_BUFFER: Point = Point::new(0.0, 0.0, 10.0);
pub const MOVE_TO_REFERENCE_SAFETY_BUFFER: Point = Point::new(0.0, 0.0, 5.0);

/// Well of the fixed trash used as a height reference when no block is present.
pub const TRASH_REFERENCE_WELL: &str = "A1";

/// From the trash reference well's top to the flat reference surface.
pub const TRASH_REFERENCE_OFFSET: Point = Point::new(-57.84, -55.0, 0.0);

/// Pick-up current for multi-channel pipettes during calibration, in amperes.
pub const MULTI_CHANNEL_PICK_UP_CURRENT: f64 = 0.1;

/// Distance the mount retracts after a tip length is saved, in mm.
pub const TIP_LENGTH_RETRACT_DISTANCE: f64 = 20.0;

/// Where the calibration block goes for a mount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationBlockPlacement {
    pub load_name: &'static str,
    pub slot: &'static str,
    /// Well whose top is the short (reference) side of the block.
    pub well: &'static str,
}

pub fn calibration_block_for(mount: Mount) -> CalibrationBlockPlacement {
    match mount {
        Mount::Left => CalibrationBlockPlacement {
            load_name: "opentrons_calibrationblock_short_side_left",
            slot: "3",
            well: "A2",
        },
        Mount::Right => CalibrationBlockPlacement {
            load_name: "opentrons_calibrationblock_short_side_right",
            slot: "1",
            well: "A1",
        },
    }
}

/// Default tip rack load name for a pipette's maximum volume.
pub fn default_tiprack_for_volume(max_volume: u32) -> Option<&'static str> {
    match max_volume {
        10 => Some("opentrons_96_tiprack_10ul"),
        20 => Some("opentrons_96_tiprack_20ul"),
        50 | 300 => Some("opentrons_96_tiprack_300ul"),
        1000 => Some("opentrons_96_tiprack_1000ul"),
        _ => None,
    }
}
