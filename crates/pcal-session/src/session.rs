//! # Calibration Session
//!
//! [`CalibrationSession`] drives one pipette on one mount through either
//! calibration graph. It owns the deck model and a snapshot of the pipette
//! descriptor; hardware and calibration records are reached through the
//! shared collaborators it was built with.
//!
//! ## Command Lifecycle
//!
//! 1. Reject the command if the session has exited.
//! 2. Look up the next state. No transition means `BadStateTransition`,
//!    raised before the handler runs.
//! 3. Run the handler. Every guard and capture check completes before the
//!    handler's first hardware call.
//! 4. Commit the next state only if the handler returned `Ok`.
//!
//! A fault in step 3 leaves the state unchanged. Motion already issued by
//! the handler stays applied.
//!
//! ## Tip Rack Resolution
//!
//! The rack in slot 8 is chosen once at construction, and again whenever
//! `loadLabware` supplies a definition:
//!
//! 1. an explicit definition;
//! 2. the rack named by the stored pipette offset record, if it resolves in
//!    the bundled library (failures fall through silently);
//! 3. the default rack for the pipette's volume class.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use pcal_core::{CriticalPoint, Mount, PipetteId, Point, SessionId};
use pcal_deck::{
    Deck, DeckError, DeckModel, Labware, LabwareDefinition, LabwareLibrary, TrashKind,
};
use pcal_hardware::{HardwareController, MotionPlanner, PipetteDescriptor};
use pcal_schema::SchemaValidator;
use pcal_state::{
    CalibrationGraph, CommandKind, GraphKind, OffsetState, TipLengthOffsetState, WorkflowState,
};
use pcal_store::{CalibrationStore, PipetteOffsetRecord, TipLengthRecord};

use crate::command::CalibrationCommand;
use crate::config::CalibrationConfig;
use crate::constants::{
    calibration_block_for, default_tiprack_for_volume, JOG_TO_DECK_SLOT,
    MOVE_TO_DECK_SAFETY_BUFFER, MOVE_TO_TIP_RACK_SAFETY_BUFFER, POINT_ONE_ID,
    TIP_LENGTH_RETRACT_DISTANCE, TIP_RACK_SLOT, TRASH_REFERENCE_WELL,
};
use crate::error::SessionError;
use crate::motion::MotionCoordinator;

// ─── Parameters and Views ────────────────────────────────────────────

/// What the caller asks for when opening a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionParams {
    pub mount: Mount,
    /// Measure tip length even when a stored value exists.
    pub recalibrate_tip_length: bool,
    /// Use the calibration block as the height reference. Honoured only
    /// when tip length is being measured.
    pub has_calibration_block: bool,
    /// A tip rack definition document to use instead of the stored or
    /// default rack.
    pub tiprack_definition: Option<Value>,
}

impl SessionParams {
    pub fn new(mount: Mount) -> Self {
        Self {
            mount,
            recalibrate_tip_length: false,
            has_calibration_block: false,
            tiprack_definition: None,
        }
    }
}

/// Labware the operator must place before starting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequiredLabware {
    pub slot: String,
    pub load_name: String,
    pub namespace: String,
    pub version: u32,
    pub is_tiprack: bool,
    pub definition: LabwareDefinition,
}

impl RequiredLabware {
    fn from_labware(slot: &str, labware: &Labware) -> Self {
        let definition = labware.definition().as_ref().clone();
        Self {
            slot: slot.to_string(),
            load_name: definition.load_name().to_string(),
            namespace: definition.namespace.clone(),
            version: definition.version,
            is_tiprack: definition.is_tiprack(),
            definition,
        }
    }
}

/// The session's pipette as reported to callers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachedPipette {
    pub model: String,
    pub name: String,
    /// Nominal tip length from the model configuration.
    pub tip_length: f64,
    pub mount: Mount,
    pub serial: PipetteId,
    pub default_tipracks: Vec<LabwareDefinition>,
}

// ─── Guard Conditions ────────────────────────────────────────────────

const TIP_LENGTH_NOT_SCHEDULED: &str = "tip length calibration is not scheduled";
const TIP_LENGTH_NEITHER_KNOWN_NOR_SCHEDULED: &str =
    "tip length is neither calibrated nor scheduled";
const NO_TIP_LENGTH_DATA: &str = "no tip length calibration data exists";
const OFFSET_NOT_SAVED: &str = "offset not saved this session";

// ─── Session ─────────────────────────────────────────────────────────

pub struct CalibrationSession {
    id: SessionId,
    mount: Mount,
    hardware: Arc<dyn HardwareController>,
    store: Arc<dyn CalibrationStore>,
    motion: MotionCoordinator,
    validator: SchemaValidator,
    deck: Deck,
    tip_rack: Labware,
    tip_rack_hash: String,
    graph: CalibrationGraph,
    current_state: WorkflowState,
    pipette: PipetteDescriptor,
    default_tipracks: Vec<Arc<LabwareDefinition>>,
    reference_point: Point,

    using_default_tiprack: bool,
    has_calibration_block: bool,
    has_calibrated_tip_length: bool,
    should_perform_tip_length: bool,
    saved_offset_this_session: bool,
    load_labware_supported: bool,

    tip_origin: Option<Point>,
    nozzle_height_at_reference: Option<f64>,
    z_height_reference: Option<f64>,
}

impl std::fmt::Debug for CalibrationSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CalibrationSession")
            .field("id", &self.id)
            .field("mount", &self.mount)
            .field("pipette_id", &self.pipette.pipette_id)
            .field("graph", &self.graph.kind())
            .field("current_state", &self.current_state)
            .field("tip_rack", &self.tip_rack.uri())
            .field("should_perform_tip_length", &self.should_perform_tip_length)
            .field("has_calibrated_tip_length", &self.has_calibrated_tip_length)
            .field("tip_origin", &self.tip_origin)
            .finish_non_exhaustive()
    }
}

impl CalibrationSession {
    /// Open a session for the pipette on `params.mount`.
    ///
    /// # Errors
    ///
    /// Construction faults (`NoPipetteOnMount`, `NoDefaultTipRack`,
    /// `DeckSetup`, ...), precondition violations for an invalid or
    /// non-rack `tiprack_definition`, and store or hardware faults from
    /// the lookups made here.
    pub async fn new(
        hardware: Arc<dyn HardwareController>,
        planner: Arc<dyn MotionPlanner>,
        store: Arc<dyn CalibrationStore>,
        params: SessionParams,
        config: &CalibrationConfig,
    ) -> Result<Self, SessionError> {
        let mount = params.mount;
        let pipette = hardware
            .attached_pipette(mount)
            .await?
            .ok_or(SessionError::NoPipetteOnMount { mount })?;

        let trash_kind = if config.short_fixed_trash {
            TrashKind::Short
        } else {
            TrashKind::Standard
        };
        let mut deck = Deck::new(trash_kind).map_err(SessionError::DeckSetup)?;
        let reference_point = deck
            .calibration_point(POINT_ONE_ID)
            .ok_or_else(|| SessionError::MissingCalibrationPoint(POINT_ONE_ID.to_string()))?;
        let validator =
            SchemaValidator::bundled().map_err(|e| SessionError::DeckSetup(e.into()))?;

        let explicit = params
            .tiprack_definition
            .map(|document| tiprack_from_document(document, &validator))
            .transpose()?;
        let existing = store.load_offset(&pipette.pipette_id, mount).await?;
        let (using_default_tiprack, rack_definition) =
            resolve_tip_rack(explicit, existing.as_ref(), pipette.max_volume)?;
        let tip_rack_hash = rack_definition
            .content_hash()
            .map_err(SessionError::DeckSetup)?;
        let tip_rack =
            place_tip_rack(&mut deck, rack_definition).map_err(SessionError::DeckSetup)?;

        let stored_tip_length =
            load_stored_tip_length(store.as_ref(), &pipette.pipette_id, &tip_rack_hash).await?;
        let implicit = using_default_tiprack && config.implicit_default_tip_length;
        let should_perform_tip_length =
            params.recalibrate_tip_length || (stored_tip_length.is_none() && !implicit);

        let has_calibration_block = should_perform_tip_length && params.has_calibration_block;
        if has_calibration_block {
            load_calibration_block(&mut deck, mount).map_err(SessionError::DeckSetup)?;
        }
        let has_calibrated_tip_length = stored_tip_length.is_some() || implicit;

        let graph = CalibrationGraph::for_kind(if should_perform_tip_length {
            GraphKind::TipLengthAndOffset
        } else {
            GraphKind::PipetteOffset
        })?;

        hardware.set_pipette_offset(mount, existing.as_ref().map_or(Point::ZERO, |r| r.offset))?;

        let library = LabwareLibrary::bundled().map_err(SessionError::DeckSetup)?;
        let default_tipracks: Vec<_> = pipette
            .default_tipracks
            .iter()
            .filter_map(|uri| match library.get(uri) {
                Ok(def) => Some(def),
                Err(e) => {
                    tracing::debug!(%uri, error = %e, "default tip rack not in library");
                    None
                }
            })
            .collect();

        let id = SessionId::new();
        tracing::info!(
            session = %id,
            %mount,
            pipette = %pipette.pipette_id,
            model = %pipette.model,
            graph = %graph.kind(),
            tip_rack = %tip_rack.uri(),
            using_default_tiprack,
            should_perform_tip_length,
            has_calibrated_tip_length,
            has_calibration_block,
            "calibration session opened"
        );

        let motion = MotionCoordinator::new(
            Arc::clone(&hardware),
            planner,
            mount,
            pipette.channels,
        );

        Ok(Self {
            id,
            mount,
            hardware,
            store,
            motion,
            validator,
            deck,
            tip_rack,
            tip_rack_hash,
            current_state: graph.initial_state(),
            graph,
            pipette,
            default_tipracks,
            reference_point,
            using_default_tiprack,
            has_calibration_block,
            has_calibrated_tip_length,
            should_perform_tip_length,
            saved_offset_this_session: false,
            load_labware_supported: true,
            tip_origin: None,
            nozzle_height_at_reference: None,
            z_height_reference: None,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn mount(&self) -> Mount {
        self.mount
    }

    pub fn current_state(&self) -> WorkflowState {
        self.current_state
    }

    pub fn graph_kind(&self) -> GraphKind {
        self.graph.kind()
    }

    pub fn has_calibrated_tip_length(&self) -> bool {
        self.has_calibrated_tip_length
    }

    pub fn should_perform_tip_length(&self) -> bool {
        self.should_perform_tip_length
    }

    pub fn saved_offset_this_session(&self) -> bool {
        self.saved_offset_this_session
    }

    pub fn using_default_tiprack(&self) -> bool {
        self.using_default_tiprack
    }

    pub fn has_calibration_block(&self) -> bool {
        self.has_calibration_block
    }

    /// Where the current tip was picked up from, while one is held.
    pub fn tip_origin(&self) -> Option<Point> {
        self.tip_origin
    }

    pub fn deck(&self) -> &Deck {
        &self.deck
    }

    pub fn tip_rack(&self) -> &Labware {
        &self.tip_rack
    }

    /// Deck calibration point one, the target of the offset measurement.
    pub fn reference_point(&self) -> Point {
        self.reference_point
    }

    /// Every labware on the deck apart from the fixed trash.
    pub fn required_labware(&self) -> Vec<RequiredLabware> {
        self.deck
            .non_fixture_slots()
            .into_iter()
            .map(|(slot, labware)| RequiredLabware::from_labware(slot, labware))
            .collect()
    }

    pub fn attached_pipette(&self) -> AttachedPipette {
        AttachedPipette {
            model: self.pipette.model.clone(),
            name: self.pipette.name.clone(),
            tip_length: self.pipette.config_tip_length,
            mount: self.mount,
            serial: self.pipette.pipette_id.clone(),
            default_tipracks: self
                .default_tipracks
                .iter()
                .map(|def| def.as_ref().clone())
                .collect(),
        }
    }

    /// Optional commands this session currently accepts.
    pub fn supported_commands(&self) -> Vec<CommandKind> {
        if self.load_labware_supported {
            vec![CommandKind::LoadLabware]
        } else {
            Vec::new()
        }
    }

    // ── Dispatch ────────────────────────────────────────────────────

    /// Parse and handle a wire command.
    pub async fn handle_command(
        &mut self,
        name: &str,
        data: Value,
    ) -> Result<WorkflowState, SessionError> {
        let command = CalibrationCommand::from_parts(name, data)?;
        self.handle(command).await
    }

    /// Handle a command and return the state committed for it.
    pub async fn handle(
        &mut self,
        command: CalibrationCommand,
    ) -> Result<WorkflowState, SessionError> {
        let kind = command.kind();
        let from = self.current_state;
        if from.is_exited() {
            return Err(SessionError::SessionExited);
        }
        let Some(next) = self.graph.get_next_state(from, kind) else {
            tracing::warn!(session = %self.id, command = %kind, state = %from, "no transition");
            return Err(SessionError::BadStateTransition {
                command: kind,
                state: from,
            });
        };

        let result = match command {
            CalibrationCommand::LoadLabware { tiprack_definition } => {
                self.load_labware(tiprack_definition)
            }
            CalibrationCommand::MoveToReferencePoint => self.move_to_reference_point().await,
            CalibrationCommand::Jog { vector } => self.jog(vector).await,
            CalibrationCommand::PickUpTip => self.pick_up_tip().await,
            CalibrationCommand::InvalidateTip => self.invalidate_tip().await,
            CalibrationCommand::SaveOffset => self.save_offset().await,
            CalibrationCommand::MoveToTipRack => self.move_to_tip_rack().await,
            CalibrationCommand::MoveToDeck => self.move_to_deck().await,
            CalibrationCommand::MoveToPointOne => self.move_to_point_one().await,
            CalibrationCommand::SetHasCalibrationBlock { has_block } => {
                self.set_has_calibration_block(has_block)
            }
            CalibrationCommand::Exit => self.exit().await,
            CalibrationCommand::InvalidateLastAction => self.invalidate_last_action().await,
        };
        if let Err(e) = &result {
            tracing::warn!(
                session = %self.id,
                command = %kind,
                state = %from,
                class = %e.class(),
                error = %e,
                "command failed"
            );
        }
        result?;

        self.current_state = next;
        tracing::info!(session = %self.id, command = %kind, %from, to = %next, "command handled");
        Ok(next)
    }

    // ── Guards ──────────────────────────────────────────────────────

    /// Whether the session is at `offset` (offset graph) or `combined`
    /// (combined graph).
    fn at(&self, offset: OffsetState, combined: TipLengthOffsetState) -> bool {
        match self.current_state {
            WorkflowState::PipetteOffset(s) => s == offset,
            WorkflowState::TipLengthAndOffset(s) => s == combined,
        }
    }

    fn unmet(&self, handler: CommandKind, condition: &'static str) -> SessionError {
        SessionError::UnmetStateTransitionRequirement {
            handler,
            state: self.current_state,
            condition,
        }
    }

    fn check_move_to_reference_point(&self) -> Result<(), SessionError> {
        let guarded = self.at(OffsetState::LabwareLoaded, TipLengthOffsetState::LabwareLoaded)
            || self.at(OffsetState::InspectingTip, TipLengthOffsetState::InspectingTip);
        if !self.should_perform_tip_length && guarded {
            return Err(self.unmet(CommandKind::MoveToReferencePoint, TIP_LENGTH_NOT_SCHEDULED));
        }
        Ok(())
    }

    fn check_move_to_tip_rack(&self) -> Result<(), SessionError> {
        if self.at(OffsetState::LabwareLoaded, TipLengthOffsetState::LabwareLoaded)
            && !self.has_calibrated_tip_length
            && !self.should_perform_tip_length
        {
            return Err(self.unmet(
                CommandKind::MoveToTipRack,
                TIP_LENGTH_NEITHER_KNOWN_NOR_SCHEDULED,
            ));
        }
        Ok(())
    }

    fn check_move_to_deck(&self) -> Result<(), SessionError> {
        if !self.has_calibrated_tip_length
            && self.at(OffsetState::InspectingTip, TipLengthOffsetState::InspectingTip)
        {
            return Err(self.unmet(CommandKind::MoveToDeck, NO_TIP_LENGTH_DATA));
        }
        if self.should_perform_tip_length
            && self.current_state
                == WorkflowState::TipLengthAndOffset(TipLengthOffsetState::TipLengthComplete)
            && !self.saved_offset_this_session
        {
            return Err(self.unmet(CommandKind::MoveToDeck, OFFSET_NOT_SAVED));
        }
        Ok(())
    }

    // ── Handlers ────────────────────────────────────────────────────

    fn load_labware(&mut self, tiprack_definition: Option<Value>) -> Result<(), SessionError> {
        if let Some(document) = tiprack_definition {
            let definition = tiprack_from_document(document, &self.validator)?;
            let (using_default, definition) =
                resolve_tip_rack(Some(definition), None, self.pipette.max_volume)?;
            let hash = definition.content_hash().map_err(SessionError::InvalidLabware)?;
            self.tip_rack = place_tip_rack(&mut self.deck, definition)?;
            self.tip_rack_hash = hash;
            self.using_default_tiprack = using_default;
            tracing::info!(session = %self.id, tip_rack = %self.tip_rack.uri(), "tip rack replaced");
        }
        self.load_labware_supported = false;
        Ok(())
    }

    async fn move_to_reference_point(&mut self) -> Result<(), SessionError> {
        self.check_move_to_reference_point()?;
        let target = self.reference_target()?;
        self.motion.move_to(&self.deck, target, None).await?;
        Ok(())
    }

    async fn jog(&mut self, vector: Point) -> Result<(), SessionError> {
        self.motion.jog(vector).await?;
        Ok(())
    }

    async fn pick_up_tip(&mut self) -> Result<(), SessionError> {
        let tip_length = self.tip_length().await?;
        let origin = self.motion.pick_up_tip(tip_length).await?;
        self.tip_origin = Some(origin);
        Ok(())
    }

    async fn invalidate_tip(&mut self) -> Result<(), SessionError> {
        self.check_move_to_tip_rack()?;
        self.return_tip().await?;
        self.tip_origin = None;
        self.approach_tip_rack().await
    }

    async fn move_to_tip_rack(&mut self) -> Result<(), SessionError> {
        self.check_move_to_tip_rack()?;
        self.approach_tip_rack().await
    }

    async fn move_to_deck(&mut self) -> Result<(), SessionError> {
        self.check_move_to_deck()?;
        let center = self.deck.slot_center(JOG_TO_DECK_SLOT)?;
        let (min, max) = self.deck.bounding_box(JOG_TO_DECK_SLOT)?;
        let target = center
            + Point::new(0.0, -(max.y - min.y) / 2.0, 0.0)
            + MOVE_TO_DECK_SAFETY_BUFFER;
        self.motion.move_to(&self.deck, target, None).await?;
        self.should_perform_tip_length = false;
        Ok(())
    }

    async fn move_to_point_one(&mut self) -> Result<(), SessionError> {
        let z = self
            .z_height_reference
            .ok_or(SessionError::WorkflowAssertion {
                handler: CommandKind::MoveToPointOne,
                reason: "no deck height has been saved",
            })?;
        let target = self.reference_point + Point::new(0.0, 0.0, z);
        self.motion.move_to(&self.deck, target, None).await?;
        Ok(())
    }

    async fn save_offset(&mut self) -> Result<(), SessionError> {
        use OffsetState as O;
        use TipLengthOffsetState as T;
        use WorkflowState::{PipetteOffset, TipLengthAndOffset};

        match self.current_state {
            PipetteOffset(O::JoggingToDeck) | TipLengthAndOffset(T::JoggingToDeck) => {
                let current = self.motion.current_point(None).await?;
                self.z_height_reference = Some(current.z);
                tracing::info!(session = %self.id, z = current.z, "deck height saved");
            }
            PipetteOffset(O::SavingPointOne) | TipLengthAndOffset(T::SavingPointOne) => {
                self.save_pipette_offset().await?;
            }
            TipLengthAndOffset(T::MeasuringNozzleOffset) => {
                let current = self.motion.current_point(None).await?;
                self.nozzle_height_at_reference = Some(current.z);
                tracing::info!(session = %self.id, z = current.z, "nozzle height saved");
            }
            TipLengthAndOffset(T::MeasuringTipOffset) => {
                self.save_tip_length().await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn save_pipette_offset(&mut self) -> Result<(), SessionError> {
        let critical_point = self
            .pipette
            .is_multichannel()
            .then_some(CriticalPoint::FrontNozzle);
        let current = self.motion.current_point(critical_point).await?;
        let offset = self.reference_point - current;
        let record = PipetteOffsetRecord::new(
            self.pipette.pipette_id.clone(),
            self.mount,
            offset,
            self.tip_rack_hash.clone(),
            self.tip_rack.uri().to_string(),
        );
        self.store.save_offset(record).await?;
        self.saved_offset_this_session = true;
        tracing::info!(
            session = %self.id,
            pipette = %self.pipette.pipette_id,
            mount = %self.mount,
            %offset,
            "pipette offset saved"
        );
        Ok(())
    }

    async fn save_tip_length(&mut self) -> Result<(), SessionError> {
        if !self.has_tip().await? {
            return Err(SessionError::WorkflowAssertion {
                handler: CommandKind::SaveOffset,
                reason: "no tip is attached",
            });
        }
        let reference = self
            .nozzle_height_at_reference
            .ok_or(SessionError::WorkflowAssertion {
                handler: CommandKind::SaveOffset,
                reason: "no nozzle height has been saved",
            })?;

        let nozzle = self
            .motion
            .current_point(Some(CriticalPoint::Nozzle))
            .await?;
        let tip_length = nozzle.z - reference;
        let pipette_id = self.pipette.pipette_id.clone();
        self.store
            .save_tip_length(TipLengthRecord::new(
                pipette_id.clone(),
                self.tip_rack_hash.clone(),
                self.tip_rack.uri().to_string(),
                tip_length,
            ))
            .await?;
        // A new tip length invalidates any offset measured with the old one.
        self.store.delete_offset(&pipette_id, self.mount).await?;
        tracing::info!(session = %self.id, pipette = %pipette_id, tip_length, "tip length saved");

        let stored = self.stored_tip_length().await?;
        self.has_calibrated_tip_length = stored.is_some();
        if let Some(stored) = stored {
            self.hardware.set_current_tip_length(self.mount, stored)?;
        }
        self.hardware
            .retract(self.mount, TIP_LENGTH_RETRACT_DISTANCE)
            .await?;
        Ok(())
    }

    fn set_has_calibration_block(&mut self, has_block: bool) -> Result<(), SessionError> {
        match (self.has_calibration_block, has_block) {
            (true, false) => {
                self.deck.remove(calibration_block_for(self.mount).slot)?;
            }
            (false, true) => load_calibration_block(&mut self.deck, self.mount)?,
            _ => {}
        }
        self.has_calibration_block = has_block;
        Ok(())
    }

    async fn exit(&mut self) -> Result<(), SessionError> {
        if self.has_tip().await? {
            self.check_move_to_tip_rack()?;
            self.approach_tip_rack().await?;
            self.return_tip().await?;
        }
        self.hardware.reset_instrument(self.mount).await?;
        self.hardware.home(Some(self.mount)).await?;
        tracing::info!(session = %self.id, "calibration session exited");
        Ok(())
    }

    async fn invalidate_last_action(&mut self) -> Result<(), SessionError> {
        use WorkflowState::{PipetteOffset, TipLengthAndOffset};

        match self.current_state {
            TipLengthAndOffset(TipLengthOffsetState::MeasuringNozzleOffset) => {
                self.check_move_to_reference_point()?;
                let target = self.reference_target()?;
                self.rehome().await?;
                self.motion.move_to(&self.deck, target, None).await?;
            }
            PipetteOffset(OffsetState::PreparingPipette)
            | TipLengthAndOffset(TipLengthOffsetState::PreparingPipette) => {
                self.check_move_to_tip_rack()?;
                self.tip_origin = None;
                self.rehome().await?;
                self.approach_tip_rack().await?;
            }
            _ => {
                self.check_move_to_tip_rack()?;
                let trash_top = self.deck.trash()?.well(TRASH_REFERENCE_WELL)?.top();
                self.rehome().await?;
                self.motion
                    .move_to(&self.deck, trash_top, Some(CriticalPoint::XyCenter))
                    .await?;
                self.hardware.drop_tip(self.mount).await?;
                self.approach_tip_rack().await?;
            }
        }
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────

    async fn rehome(&self) -> Result<(), SessionError> {
        self.hardware.home(None).await?;
        self.hardware.refresh_position(self.mount).await?;
        Ok(())
    }

    async fn has_tip(&self) -> Result<bool, SessionError> {
        Ok(self
            .hardware
            .attached_pipette(self.mount)
            .await?
            .is_some_and(|p| p.has_tip))
    }

    async fn stored_tip_length(&self) -> Result<Option<f64>, SessionError> {
        load_stored_tip_length(
            self.store.as_ref(),
            &self.pipette.pipette_id,
            &self.tip_rack_hash,
        )
        .await
    }

    /// Length of the tip being handled: the stored calibration once tip
    /// length is no longer being measured, otherwise the rack's nominal
    /// length less the pipette's overlap for that rack.
    async fn tip_length(&self) -> Result<f64, SessionError> {
        if !self.should_perform_tip_length {
            if let Some(stored) = self.stored_tip_length().await? {
                return Ok(stored);
            }
        }
        let uri = self.tip_rack.uri();
        let nominal = self
            .tip_rack
            .tip_length()
            .ok_or_else(|| SessionError::NotATipRack {
                uri: uri.to_string(),
            })?;
        Ok(nominal - self.pipette.tip_overlap_for(&uri))
    }

    fn tip_rack_approach(&self) -> Result<Point, SessionError> {
        match self.tip_origin {
            Some(origin) => Ok(origin),
            None => Ok(self.tip_rack.first_well()?.top() + MOVE_TO_TIP_RACK_SAFETY_BUFFER),
        }
    }

    async fn approach_tip_rack(&self) -> Result<(), SessionError> {
        let target = self.tip_rack_approach()?;
        tracing::info!(session = %self.id, %target, "moving to tip rack");
        self.motion.move_to(&self.deck, target, None).await?;
        Ok(())
    }

    /// Put the held tip back where it came from. Does nothing unless a tip
    /// is attached and its origin is known.
    async fn return_tip(&mut self) -> Result<(), SessionError> {
        let Some(origin) = self.tip_origin else {
            return Ok(());
        };
        if !self.has_tip().await? {
            return Ok(());
        }
        let tip_length = self.tip_length().await?;
        self.motion
            .return_tip(origin, tip_length, self.pipette.return_tip_height)
            .await?;
        self.tip_origin = None;
        Ok(())
    }

    fn reference_target(&self) -> Result<Point, SessionError> {
        let block_well = if self.has_calibration_block {
            let placement = calibration_block_for(self.mount);
            let block = self
                .deck
                .get(placement.slot)
                .ok_or_else(|| DeckError::DefinitionNotFound(placement.load_name.to_string()))?;
            Some(block.well(placement.well)?)
        } else {
            None
        };
        Ok(MotionCoordinator::reference_location(
            &self.deck,
            block_well.as_ref(),
        )?)
    }
}

// ─── Construction Helpers ────────────────────────────────────────────

fn tiprack_from_document(
    document: Value,
    validator: &SchemaValidator,
) -> Result<Arc<LabwareDefinition>, SessionError> {
    let definition =
        LabwareDefinition::from_value(document, validator).map_err(SessionError::InvalidLabware)?;
    if !definition.is_tiprack() {
        return Err(SessionError::NotATipRack {
            uri: definition.uri().to_string(),
        });
    }
    Ok(Arc::new(definition))
}

/// Pick the tip rack by priority. Returns whether the choice counts as a
/// default rack, and the definition.
fn resolve_tip_rack(
    explicit: Option<Arc<LabwareDefinition>>,
    existing: Option<&PipetteOffsetRecord>,
    max_volume: u32,
) -> Result<(bool, Arc<LabwareDefinition>), SessionError> {
    if let Some(definition) = explicit {
        return Ok((false, definition));
    }
    let library = LabwareLibrary::bundled().map_err(SessionError::DeckSetup)?;
    if let Some(record) = existing.filter(|r| !r.tiprack_uri.is_empty()) {
        match library.get_by_str(&record.tiprack_uri) {
            Ok(definition) if definition.is_tiprack() => return Ok((true, definition)),
            Ok(_) => {
                tracing::debug!(uri = %record.tiprack_uri, "stored rack is not a tip rack");
            }
            Err(e) => {
                tracing::debug!(uri = %record.tiprack_uri, error = %e, "stored rack not resolvable");
            }
        }
    }
    let load_name =
        default_tiprack_for_volume(max_volume).ok_or(SessionError::NoDefaultTipRack { max_volume })?;
    let definition = library.load(load_name).map_err(SessionError::DeckSetup)?;
    Ok((true, definition))
}

fn place_tip_rack(
    deck: &mut Deck,
    definition: Arc<LabwareDefinition>,
) -> Result<Labware, DeckError> {
    let rack = deck.position_labware(definition, TIP_RACK_SLOT)?;
    deck.replace(TIP_RACK_SLOT, rack.clone())?;
    Ok(rack)
}

fn load_calibration_block(deck: &mut Deck, mount: Mount) -> Result<(), DeckError> {
    let placement = calibration_block_for(mount);
    let definition = LabwareLibrary::bundled()?.load(placement.load_name)?;
    let block = deck.position_labware(definition, placement.slot)?;
    deck.replace(placement.slot, block)?;
    Ok(())
}

async fn load_stored_tip_length(
    store: &dyn CalibrationStore,
    pipette_id: &PipetteId,
    tiprack_hash: &str,
) -> Result<Option<f64>, SessionError> {
    match store.load_tip_length(pipette_id, tiprack_hash).await {
        Ok(record) => Ok(Some(record.tip_length)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e.into()),
    }
}
