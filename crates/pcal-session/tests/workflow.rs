//! End-to-end runs through both calibration graphs on simulated hardware.

mod common;

use serde_json::json;

use pcal_core::{Mount, Point};
use pcal_hardware::{HardwareController, HardwareEvent};
use pcal_session::ErrorClass;
use pcal_state::{CommandKind, GraphKind, OffsetState, TipLengthOffsetState};
use pcal_store::CalibrationStore;

use common::*;

// ── Tip length, then offset ──────────────────────────────────────────

#[tokio::test]
async fn test_combined_graph_happy_path() {
    use TipLengthOffsetState::*;

    let rig = Rig::new(Mount::Right, SINGLE_300, "P3HSV2020041502");
    let mut s = rig.open(rig.params()).await.unwrap();
    assert_eq!(s.graph_kind(), GraphKind::TipLengthAndOffset);
    assert_eq!(s.current_state(), combined(SessionStarted));
    assert!(!s.has_calibrated_tip_length());
    assert!(s.should_perform_tip_length());

    assert_eq!(send(&mut s, "loadLabware", json!({})).await, combined(LabwareLoaded));

    // Nozzle height on the trash reference surface.
    assert_eq!(
        send(&mut s, "moveToReferencePoint", json!({})).await,
        combined(MeasuringNozzleOffset)
    );
    send(&mut s, "jog", jog(-5.0)).await;
    assert_eq!(
        send(&mut s, "saveOffset", json!({})).await,
        combined(MeasuringNozzleOffset)
    );

    assert_eq!(send(&mut s, "moveToTipRack", json!({})).await, combined(PreparingPipette));
    assert_eq!(send(&mut s, "pickUpTip", json!({})).await, combined(InspectingTip));
    assert!(s.tip_origin().is_some());
    assert!(rig.hw.attached_pipette(Mount::Right).await.unwrap().unwrap().has_tip);

    // Tip height on the same surface.
    assert_eq!(
        send(&mut s, "moveToReferencePoint", json!({})).await,
        combined(MeasuringTipOffset)
    );
    send(&mut s, "jog", jog(-5.0)).await;
    assert_eq!(send(&mut s, "saveOffset", json!({})).await, combined(TipLengthComplete));

    let record = rig
        .store
        .load_tip_length(&rig.serial, &rack_300_hash())
        .await
        .unwrap();
    assert!((record.tip_length - EXPECTED_300_TIP_LENGTH).abs() < 1e-9);
    assert_eq!(record.tiprack_uri, TIPRACK_300_URI);
    assert!(s.has_calibrated_tip_length());
    assert_eq!(
        rig.hw.events().last(),
        Some(&HardwareEvent::Retract {
            mount: Mount::Right,
            margin: 20.0
        })
    );
    assert_eq!(rig.store.offset_count(), 0);

    // The offset has not been saved yet, so the deck is out of reach from here.
    let before = rig.hw.events().len();
    let err = s.handle_command("moveToDeck", json!({})).await.unwrap_err();
    assert_eq!(err.class(), ErrorClass::PreconditionViolation);
    assert_eq!(rig.hw.events().len(), before);
    assert_eq!(s.current_state(), combined(TipLengthComplete));

    assert_eq!(send(&mut s, "invalidateTip", json!({})).await, combined(PreparingPipette));
    assert!(s.tip_origin().is_none());
    assert!(!rig.hw.attached_pipette(Mount::Right).await.unwrap().unwrap().has_tip);

    send(&mut s, "pickUpTip", json!({})).await;
    assert_eq!(send(&mut s, "moveToDeck", json!({})).await, combined(JoggingToDeck));
    assert!(!s.should_perform_tip_length());

    assert_eq!(send(&mut s, "saveOffset", json!({})).await, combined(JoggingToDeck));
    assert_eq!(send(&mut s, "moveToPointOne", json!({})).await, combined(SavingPointOne));
    assert_eq!(
        send(&mut s, "saveOffset", json!({})).await,
        combined(CalibrationComplete)
    );
    assert!(s.saved_offset_this_session());

    let saved = rig
        .store
        .load_offset(&rig.serial, Mount::Right)
        .await
        .unwrap()
        .unwrap();
    // Point one sits at deck height; the tip was saved 5 mm above the deck.
    assert!(saved.offset.approx_eq(&Point::new(0.0, 0.0, -5.0), 1e-9));
    assert_eq!(saved.tiprack_hash, rack_300_hash());
    assert_eq!(saved.tiprack_uri, TIPRACK_300_URI);
}

#[tokio::test]
async fn test_nozzle_reference_uses_trash_surface() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    send(&mut s, "loadLabware", json!({})).await;
    send(&mut s, "moveToReferencePoint", json!({})).await;

    let trash_top = s.deck().trash().unwrap().well("A1").unwrap().top();
    let expected = trash_top + Point::new(-57.84, -55.0, 5.0);
    match rig.hw.events().last() {
        Some(HardwareEvent::MoveTo { target, .. }) => assert!(target.approx_eq(&expected, 1e-9)),
        other => panic!("expected a move, got {other:?}"),
    }
}

// ── Offset only ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_offset_graph_with_stored_calibration() {
    use OffsetState::*;

    let rig = Rig::new(Mount::Left, SINGLE_300, "P3LSV2020041503");
    let stored_offset = Point::new(0.5, -0.5, 0.2);
    rig.seed_offset(stored_offset, TIPRACK_300_URI).await;
    rig.seed_tip_length(50.0).await;

    let mut s = rig.open(rig.params()).await.unwrap();
    assert_eq!(s.graph_kind(), GraphKind::PipetteOffset);
    assert_eq!(s.current_state(), offset(SessionStarted));
    assert!(s.has_calibrated_tip_length());
    assert!(!s.should_perform_tip_length());
    assert!(s.using_default_tiprack());
    assert_eq!(
        rig.hw
            .attached_pipette(Mount::Left)
            .await
            .unwrap()
            .unwrap()
            .pipette_offset,
        stored_offset
    );

    assert_eq!(send(&mut s, "loadLabware", json!({})).await, offset(LabwareLoaded));
    assert_eq!(send(&mut s, "moveToTipRack", json!({})).await, offset(PreparingPipette));
    assert_eq!(send(&mut s, "pickUpTip", json!({})).await, offset(InspectingTip));
    assert!(matches!(
        rig.hw.events().last(),
        Some(HardwareEvent::PickUpTip { tip_length, .. }) if *tip_length == 50.0
    ));

    assert_eq!(send(&mut s, "moveToDeck", json!({})).await, offset(JoggingToDeck));
    send(&mut s, "jog", jog(-1.0)).await;
    send(&mut s, "saveOffset", json!({})).await;
    assert_eq!(send(&mut s, "moveToPointOne", json!({})).await, offset(SavingPointOne));
    assert_eq!(send(&mut s, "saveOffset", json!({})).await, offset(CalibrationComplete));

    let saved = rig
        .store
        .load_offset(&rig.serial, Mount::Left)
        .await
        .unwrap()
        .unwrap();
    assert!(saved.offset.approx_eq(&Point::new(0.0, 0.0, -4.0), 1e-9));
    assert_eq!(rig.store.tip_length_count(), 1);
}

#[tokio::test]
async fn test_move_to_deck_targets_slot_5_front() {
    let rig = Rig::new(Mount::Left, SINGLE_300, "P3L");
    rig.seed_tip_length(50.0).await;
    let mut s = rig.open(rig.params()).await.unwrap();
    for name in ["loadLabware", "moveToTipRack", "pickUpTip", "moveToDeck"] {
        send(&mut s, name, json!({})).await;
    }
    // Slot 5 centre is (196.5, 133.5); its front edge is 43 mm nearer.
    match rig.hw.events().last() {
        Some(HardwareEvent::MoveTo { target, .. }) => {
            assert!(target.approx_eq(&Point::new(196.5, 100.5, 5.0), 1e-9))
        }
        other => panic!("expected a move, got {other:?}"),
    }
}

// ── Exit ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_exit_with_tip_returns_it_first() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    for name in ["loadLabware", "moveToTipRack", "pickUpTip"] {
        send(&mut s, name, json!({})).await;
    }
    let origin = s.tip_origin().unwrap();
    rig.hw.clear_events();

    assert_eq!(
        send(&mut s, "exit", json!({})).await,
        combined(TipLengthOffsetState::SessionExited)
    );
    let events = rig.hw.events();
    assert_eq!(events.len(), 5, "{events:?}");
    assert_eq!(
        events[0],
        HardwareEvent::MoveTo {
            mount: Mount::Right,
            target: origin,
            critical_point: None
        }
    );
    match &events[1] {
        HardwareEvent::MoveTo { target, .. } => {
            let depth = EXPECTED_300_TIP_LENGTH * 0.5;
            assert!(target.approx_eq(&(origin - Point::new(0.0, 0.0, depth)), 1e-9));
        }
        other => panic!("expected the return move, got {other:?}"),
    }
    assert_eq!(events[2], HardwareEvent::DropTip { mount: Mount::Right });
    assert_eq!(events[3], HardwareEvent::ResetInstrument { mount: Mount::Right });
    assert_eq!(
        events[4],
        HardwareEvent::Home {
            mount: Some(Mount::Right)
        }
    );
    assert!(s.tip_origin().is_none());
}

#[tokio::test]
async fn test_exit_without_tip_resets_and_homes() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    send(&mut s, "exit", json!({})).await;
    assert_eq!(
        rig.hw.events(),
        vec![
            HardwareEvent::ResetInstrument { mount: Mount::Right },
            HardwareEvent::Home {
                mount: Some(Mount::Right)
            },
        ]
    );
    assert!(s.current_state().is_exited());
}

// ── Recovery ─────────────────────────────────────────────────────────

#[tokio::test]
async fn test_invalidate_last_action_while_preparing() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    send(&mut s, "loadLabware", json!({})).await;
    send(&mut s, "moveToTipRack", json!({})).await;
    rig.hw.clear_events();

    assert_eq!(
        send(&mut s, "invalidateLastAction", json!({})).await,
        combined(TipLengthOffsetState::PreparingPipette)
    );
    let events = rig.hw.events();
    assert_eq!(events[0], HardwareEvent::Home { mount: None });
    let rack_top = s.tip_rack().first_well().unwrap().top();
    assert!(matches!(
        events.last(),
        Some(HardwareEvent::MoveTo { target, .. })
            if target.approx_eq(&(rack_top + Point::new(0.0, 0.0, 10.0)), 1e-9)
    ));
}

#[tokio::test]
async fn test_invalidate_last_action_drops_tip_in_trash() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    for name in ["loadLabware", "moveToTipRack", "pickUpTip"] {
        send(&mut s, name, json!({})).await;
    }
    rig.hw.clear_events();

    send(&mut s, "invalidateLastAction", json!({})).await;
    let events = rig.hw.events();
    assert_eq!(events[0], HardwareEvent::Home { mount: None });
    let drop_at = events
        .iter()
        .position(|e| *e == HardwareEvent::DropTip { mount: Mount::Right })
        .unwrap();
    let trash_top = s.deck().trash().unwrap().well("A1").unwrap().top();
    assert_eq!(
        events[drop_at - 1],
        HardwareEvent::MoveTo {
            mount: Mount::Right,
            target: trash_top,
            critical_point: Some(pcal_core::CriticalPoint::XyCenter)
        }
    );
    assert!(!rig.hw.attached_pipette(Mount::Right).await.unwrap().unwrap().has_tip);
}

#[tokio::test]
async fn test_invalidate_last_action_remeasures_nozzle() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    send(&mut s, "loadLabware", json!({})).await;
    send(&mut s, "moveToReferencePoint", json!({})).await;
    let reference = match rig.hw.events().last() {
        Some(HardwareEvent::MoveTo { target, .. }) => *target,
        other => panic!("expected a move, got {other:?}"),
    };
    rig.hw.clear_events();

    // The wildcard entry wins over measuringNozzleOffset's own mapping.
    assert_eq!(
        send(&mut s, "invalidateLastAction", json!({})).await,
        combined(TipLengthOffsetState::PreparingPipette)
    );
    let events = rig.hw.events();
    assert_eq!(events[0], HardwareEvent::Home { mount: None });
    assert!(matches!(
        events.last(),
        Some(HardwareEvent::MoveTo { target, .. }) if *target == reference
    ));
}

// ── Session views ────────────────────────────────────────────────────

#[tokio::test]
async fn test_supported_commands_until_load_labware() {
    let rig = Rig::new(Mount::Right, SINGLE_300, "P3H");
    let mut s = rig.open(rig.params()).await.unwrap();
    assert_eq!(s.supported_commands(), vec![CommandKind::LoadLabware]);
    send(&mut s, "loadLabware", json!({})).await;
    assert!(s.supported_commands().is_empty());
}

#[tokio::test]
async fn test_required_labware_and_attached_pipette() {
    let rig = Rig::new(Mount::Left, SINGLE_300, "P3L");
    let mut params = rig.params();
    params.has_calibration_block = true;
    let s = rig.open(params).await.unwrap();

    let required = s.required_labware();
    let slots: Vec<&str> = required.iter().map(|r| r.slot.as_str()).collect();
    assert_eq!(slots, ["3", "8"]);
    assert_eq!(required[0].load_name, "opentrons_calibrationblock_short_side_left");
    assert!(!required[0].is_tiprack);
    assert_eq!(required[1].load_name, "opentrons_96_tiprack_300ul");
    assert_eq!(required[1].namespace, "opentrons");
    assert_eq!(required[1].version, 1);
    assert!(required[1].is_tiprack);

    let pipette = s.attached_pipette();
    assert_eq!(pipette.model, SINGLE_300);
    assert_eq!(pipette.mount, Mount::Left);
    assert_eq!(pipette.serial, rig.serial);
    assert_eq!(pipette.tip_length, 51.7);
    assert_eq!(pipette.default_tipracks.len(), 1);
    assert_eq!(
        pipette.default_tipracks[0].load_name(),
        "opentrons_96_tiprack_300ul"
    );

    let wire = serde_json::to_value(&pipette).unwrap();
    assert_eq!(wire["tipLength"], 51.7);
    assert_eq!(wire["serial"], "P3L");
}
