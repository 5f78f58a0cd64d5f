//! Validates editing actions, gates them one at a time, runs them against
//! the generator and commits successful results to the edit history.
//!
//! Every generated action is split in two halves: `submit_*` validates input,
//! closes the busy gate and returns a [`PendingAction`]; [`finish`] applies the
//! generator's result. [`run`] does both inline, [`spawn`] runs the generator
//! on a worker thread so the caller's loop stays responsive.
//!
//! [`finish`]: ActionCoordinator::finish
//! [`run`]: ActionCoordinator::run
//! [`spawn`]: ActionCoordinator::spawn

mod worker;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::ai::{
    AiError, AiResult, EditInstruction, GenerationRequest, ImageGenerator, ImagePayload,
    UpscaleFactor,
};
use crate::display::DisplaySlot;
use crate::editor::{compose_expand_canvas, extract_crop, EditorTools, ExpandPlan, ToolKind};
use crate::geometry::{scale_factor, Point, Rect, Size};
use crate::history::{EditHistory, Snapshot, SnapshotError};
use crate::state::{SessionEvent, SessionState, StateError, StateMachine};
use crate::storage::{SnapshotExporter, StorageError};

pub use worker::{spawn_generation, GenerationHandle, WorkerPoll, RESULT_POLL_INTERVAL};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Retouch,
    Filter,
    Adjustment,
    Crop,
    Expand,
    Upscale,
    GenerateNew,
}

impl ActionKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Retouch => "retouch",
            Self::Filter => "filter",
            Self::Adjustment => "adjustment",
            Self::Crop => "crop",
            Self::Expand => "expand",
            Self::Upscale => "upscale",
            Self::GenerateNew => "generate",
        }
    }

    const fn failure_phrase(self) -> &'static str {
        match self {
            Self::Retouch => "generate the image",
            Self::Filter => "apply the filter",
            Self::Adjustment => "apply the adjustment",
            Self::Crop => "crop the image",
            Self::Expand => "expand the image",
            Self::Upscale => "upscale the image",
            Self::GenerateNew => "generate a new image",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Input problems caught before any external call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no image is loaded")]
    NoImage,
    #[error("please enter a description for the {action}")]
    EmptyPrompt { action: ActionKind },
    #[error("click on the image to choose the area to retouch")]
    MissingHotspot,
    #[error("select an area to crop first")]
    NoCropSelection,
    #[error("drag the frame handles outward to enlarge the canvas first")]
    ExpandNotEnlarged,
    #[error("upscaling supports 2x or 4x, not {0}x")]
    UnsupportedUpscaleFactor(u32),
    #[error("the image has not been laid out yet")]
    NoLayout,
}

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("{active} is already in progress")]
    Busy { active: ActionKind },
    #[error("failed to {}: {source}", action.failure_phrase())]
    Generation {
        action: ActionKind,
        #[source]
        source: AiError,
    },
    #[error("failed to {}: {source}", action.failure_phrase())]
    Local {
        action: ActionKind,
        #[source]
        source: SnapshotError,
    },
    #[error("failed to load the image: {source}")]
    Load {
        #[source]
        source: SnapshotError,
    },
    #[error("result for {action} arrived after the session moved on")]
    Stale { action: ActionKind },
    #[error("failed to save the image: {0}")]
    Export(#[from] StorageError),
    #[error(transparent)]
    State(#[from] StateError),
}

pub type CoordinatorResult<T> = std::result::Result<T, CoordinatorError>;

/// An accepted action waiting for the generator. Must be handed back to
/// [`ActionCoordinator::finish`] exactly once.
#[derive(Debug)]
pub struct PendingAction {
    ticket: u64,
    kind: ActionKind,
    request: GenerationRequest,
    replaces_history: bool,
}

impl PendingAction {
    pub fn kind(&self) -> ActionKind {
        self.kind
    }

    pub fn request(&self) -> &GenerationRequest {
        &self.request
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationDecision {
    /// Nothing to lose; the session was cleared.
    Proceed,
    /// Unsaved edits exist; call `confirm_navigation` or `cancel_navigation`.
    NeedsConfirmation,
}

pub struct ActionCoordinator<G> {
    generator: Arc<G>,
    history: EditHistory,
    tools: EditorTools,
    display: DisplaySlot,
    session: StateMachine,
    in_flight: Option<(u64, ActionKind)>,
    next_ticket: u64,
    error: Option<String>,
    navigation_pending: bool,
    device_pixel_ratio: f64,
}

impl<G> fmt::Debug for ActionCoordinator<G> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionCoordinator")
            .field("history_len", &self.history.len())
            .field("index", &self.history.index())
            .field("state", &self.session.state())
            .field("in_flight", &self.in_flight)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<G: ImageGenerator> ActionCoordinator<G> {
    pub fn new(generator: Arc<G>) -> Self {
        Self {
            generator,
            history: EditHistory::new(),
            tools: EditorTools::new(),
            display: DisplaySlot::new(),
            session: StateMachine::new(),
            in_flight: None,
            next_ticket: 1,
            error: None,
            navigation_pending: false,
            device_pixel_ratio: 1.0,
        }
    }

    /// Scales exported crops for high-density displays.
    pub fn with_device_pixel_ratio(mut self, ratio: f64) -> Self {
        self.device_pixel_ratio = crate::editor::crop::sanitize_pixel_ratio(ratio);
        self
    }

    pub fn generator(&self) -> &Arc<G> {
        &self.generator
    }

    pub fn history(&self) -> &EditHistory {
        &self.history
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.history.current()
    }

    pub fn original(&self) -> Option<&Snapshot> {
        self.history.original()
    }

    pub fn display(&self) -> &DisplaySlot {
        &self.display
    }

    pub fn natural_size(&self) -> Option<Size> {
        self.display.natural_size()
    }

    pub fn tools(&self) -> &EditorTools {
        &self.tools
    }

    /// Pointer and option input for the crop and expand tools.
    pub fn tools_mut(&mut self) -> &mut EditorTools {
        &mut self.tools
    }

    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn in_flight(&self) -> Option<ActionKind> {
        self.in_flight.map(|(_, kind)| kind)
    }

    /// Message shown in place of the working view until acknowledged.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn navigation_pending(&self) -> bool {
        self.navigation_pending
    }

    pub fn select_tool(&mut self, tool: ToolKind) {
        self.tools.select_tool(tool);
    }

    /// Records where the view rendered the current image, relative to its container.
    pub fn set_image_box(&mut self, image_box: Rect) {
        self.tools.fit_to_display(image_box);
    }

    /// Places the retouch hotspot from a click relative to the displayed image.
    pub fn place_hotspot(&mut self, click: Point) -> CoordinatorResult<()> {
        let (natural, image_box) = self.layout()?;
        let scale = scale_factor(natural, image_box.size());
        self.tools.set_hotspot(click, scale);
        Ok(())
    }

    pub fn set_reference_image(&mut self, reference: Option<Snapshot>) {
        self.tools.set_reference(reference);
    }

    /// Starts a new session from an uploaded image.
    pub fn upload(&mut self, snapshot: Snapshot) -> CoordinatorResult<()> {
        if let Some((_, kind)) = self.in_flight.take() {
            tracing::info!(%kind, "upload supersedes in-flight action");
        }
        if let Err(source) = self.display.show(&snapshot).map(|_| ()) {
            tracing::warn!(name = snapshot.name(), %source, "uploaded image could not be decoded");
            let err = CoordinatorError::Load { source };
            self.record_failure(&err)?;
            return Err(err);
        }
        self.history.replace_all(snapshot);
        self.tools.clear_pending();
        self.error = None;
        self.navigation_pending = false;
        if self.session.state() == SessionState::Busy {
            self.session.transition(SessionEvent::Clear)?;
        }
        self.session.transition(SessionEvent::Load)?;
        tracing::info!("image uploaded");
        Ok(())
    }

    /// Drops the whole session and returns to the empty state.
    pub fn upload_new(&mut self) {
        self.history.clear();
        self.display.release();
        self.tools.reset();
        self.in_flight = None;
        self.error = None;
        self.navigation_pending = false;
        if let Err(err) = self.session.transition(SessionEvent::Clear) {
            tracing::warn!(%err, "failed to clear session state");
        }
        tracing::info!("session cleared");
    }

    pub fn undo(&mut self) -> bool {
        self.navigate_history("undo", EditHistory::undo)
    }

    pub fn redo(&mut self) -> bool {
        self.navigate_history("redo", EditHistory::redo)
    }

    pub fn reset(&mut self) -> bool {
        self.navigate_history("reset", EditHistory::reset)
    }

    fn navigate_history(&mut self, label: &'static str, step: fn(&mut EditHistory) -> bool) -> bool {
        if let Some(active) = self.in_flight() {
            tracing::debug!(%active, operation = label, "history navigation ignored while busy");
            return false;
        }
        if !step(&mut self.history) {
            tracing::debug!(operation = label, "history navigation had no effect");
            return false;
        }
        self.tools.clear_pending();
        self.sync_display();
        tracing::debug!(operation = label, index = ?self.history.index(), "history navigated");
        true
    }

    fn sync_display(&mut self) {
        match self.history.current().cloned() {
            Some(current) => {
                if let Err(err) = self.display.show(&current) {
                    tracing::warn!(%err, "current snapshot could not be decoded");
                    self.display.release();
                }
            }
            None => self.display.release(),
        }
    }

    pub fn submit_retouch(&mut self, prompt: &str) -> CoordinatorResult<PendingAction> {
        let action = ActionKind::Retouch;
        self.ensure_idle()?;
        let validated = self.require_current().and_then(|current| {
            let prompt = require_prompt(prompt, action)?;
            let hotspot = self.tools.hotspot().ok_or(ValidationError::MissingHotspot)?;
            Ok((current, prompt, hotspot))
        });
        let (current, prompt, hotspot) = self.validated(validated)?;

        let reference = self.tools.reference().cloned();
        let instruction = EditInstruction::Retouch {
            prompt,
            hotspot: hotspot.natural,
            with_reference: reference.is_some(),
        };
        let mut images = vec![&current];
        if let Some(reference) = reference.as_ref() {
            images.push(reference);
        }
        let request = GenerationRequest::new(&images, &instruction);
        self.begin(action, request, false)
    }

    pub fn submit_filter(&mut self, prompt: &str) -> CoordinatorResult<PendingAction> {
        self.submit_global(ActionKind::Filter, prompt)
    }

    pub fn submit_adjustment(&mut self, prompt: &str) -> CoordinatorResult<PendingAction> {
        self.submit_global(ActionKind::Adjustment, prompt)
    }

    fn submit_global(&mut self, action: ActionKind, prompt: &str) -> CoordinatorResult<PendingAction> {
        self.ensure_idle()?;
        let validated = self
            .require_current()
            .and_then(|current| Ok((current, require_prompt(prompt, action)?)));
        let (current, prompt) = self.validated(validated)?;

        let instruction = match action {
            ActionKind::Filter => EditInstruction::Filter { prompt },
            _ => EditInstruction::Adjustment { prompt },
        };
        let request = GenerationRequest::new(&[&current], &instruction);
        self.begin(action, request, false)
    }

    /// Out-paints around the current image using the expand frame's geometry.
    pub fn submit_expand(&mut self, prompt: Option<&str>) -> CoordinatorResult<PendingAction> {
        let action = ActionKind::Expand;
        self.ensure_idle()?;
        let validated = self.require_current().and_then(|_| {
            let (natural, _) = self.layout_checked()?;
            let frame = self.tools.expand();
            let plan = ExpandPlan::from_frame(frame.rect(), frame.image_box(), natural);
            if !plan.enlarges() {
                return Err(ValidationError::ExpandNotEnlarged);
            }
            Ok(plan)
        });
        let plan = self.validated(validated)?;

        let canvas = match self.display.image() {
            Some(image) => compose_expand_canvas(image, &plan),
            None => return Err(self.fail_validation(ValidationError::NoImage)),
        };
        let canvas = image::DynamicImage::ImageRgba8(canvas);
        let snapshot = match Snapshot::from_image(&canvas, "expand-canvas.png") {
            Ok(snapshot) => snapshot,
            Err(source) => {
                let err = CoordinatorError::Local { action, source };
                self.record_failure(&err)?;
                return Err(err);
            }
        };
        tracing::debug!(
            target_width = plan.target.width,
            target_height = plan.target.height,
            offset_x = plan.offset.x,
            offset_y = plan.offset.y,
            "expand plan computed"
        );

        let instruction = EditInstruction::Expand {
            prompt: prompt.map(str::to_string),
            target: plan.target,
            offset: plan.offset,
            source: plan.source,
        };
        let request = GenerationRequest::new(&[&snapshot], &instruction);
        self.begin(action, request, false)
    }

    pub fn submit_upscale(&mut self, multiplier: u32) -> CoordinatorResult<PendingAction> {
        self.ensure_idle()?;
        let validated = self.require_current().and_then(|current| {
            let factor = UpscaleFactor::from_multiplier(multiplier)
                .ok_or(ValidationError::UnsupportedUpscaleFactor(multiplier))?;
            Ok((current, factor))
        });
        let (current, factor) = self.validated(validated)?;

        let request = GenerationRequest::new(&[&current], &EditInstruction::Upscale { factor });
        self.begin(ActionKind::Upscale, request, false)
    }

    /// Text-to-image; the result starts a fresh history.
    pub fn submit_generate_new(&mut self, prompt: &str) -> CoordinatorResult<PendingAction> {
        let action = ActionKind::GenerateNew;
        self.ensure_idle()?;
        let prompt = self.validated(require_prompt(prompt, action))?;
        let request = GenerationRequest::new(&[], &EditInstruction::Generate { prompt });
        self.begin(action, request, true)
    }

    /// Crops the current image locally; no generator round-trip.
    pub fn apply_crop(&mut self) -> CoordinatorResult<()> {
        let action = ActionKind::Crop;
        self.ensure_idle()?;
        let validated = self.require_current().and_then(|_| {
            let (_, image_box) = self.layout_checked()?;
            let selection = self
                .tools
                .crop()
                .selection()
                .ok_or(ValidationError::NoCropSelection)?;
            let image = self.display.image().ok_or(ValidationError::NoImage)?;
            extract_crop(image, selection, image_box.size(), self.device_pixel_ratio)
                .ok_or(ValidationError::NoCropSelection)
        });
        let cropped = self.validated(validated)?;

        let name = format!("{}-{}.png", action.label(), self.next_ticket);
        self.next_ticket += 1;
        let commit = Snapshot::from_image(&image::DynamicImage::ImageRgba8(cropped), name)
            .and_then(|snapshot| self.display.show(&snapshot).map(|_| snapshot));
        match commit {
            Ok(snapshot) => {
                self.history.append(snapshot);
                self.tools.clear_pending();
                self.settle_loaded()?;
                tracing::info!(index = ?self.history.index(), "crop applied");
                Ok(())
            }
            Err(source) => {
                let err = CoordinatorError::Local { action, source };
                self.record_failure(&err)?;
                Err(err)
            }
        }
    }

    /// Calls the generator inline and applies its result.
    pub fn run(&mut self, pending: PendingAction) -> CoordinatorResult<()> {
        let result = self.generator.generate(pending.request());
        self.finish(pending, result)
    }

    pub fn apply_filter(&mut self, prompt: &str) -> CoordinatorResult<()> {
        let pending = self.submit_filter(prompt)?;
        self.run(pending)
    }

    pub fn apply_adjustment(&mut self, prompt: &str) -> CoordinatorResult<()> {
        let pending = self.submit_adjustment(prompt)?;
        self.run(pending)
    }

    pub fn retouch(&mut self, prompt: &str) -> CoordinatorResult<()> {
        let pending = self.submit_retouch(prompt)?;
        self.run(pending)
    }

    pub fn apply_expand(&mut self, prompt: Option<&str>) -> CoordinatorResult<()> {
        let pending = self.submit_expand(prompt)?;
        self.run(pending)
    }

    pub fn upscale(&mut self, multiplier: u32) -> CoordinatorResult<()> {
        let pending = self.submit_upscale(multiplier)?;
        self.run(pending)
    }

    pub fn generate_new(&mut self, prompt: &str) -> CoordinatorResult<()> {
        let pending = self.submit_generate_new(prompt)?;
        self.run(pending)
    }

    /// Applies a generator result. The busy gate reopens whatever the outcome;
    /// history changes only on success.
    pub fn finish(
        &mut self,
        pending: PendingAction,
        result: AiResult<ImagePayload>,
    ) -> CoordinatorResult<()> {
        let action = pending.kind;
        if self.in_flight.map(|(ticket, _)| ticket) != Some(pending.ticket) {
            tracing::info!(%action, "discarding result for a superseded action");
            return Err(CoordinatorError::Stale { action });
        }
        self.in_flight = None;

        let payload = match result {
            Ok(payload) => payload,
            Err(source) => {
                let err = CoordinatorError::Generation { action, source };
                self.record_failure(&err)?;
                return Err(err);
            }
        };

        let snapshot = payload.into_snapshot(format!("{}-{}", action.label(), pending.ticket));
        if let Err(source) = self.display.show(&snapshot).map(|_| ()) {
            let err = CoordinatorError::Local { action, source };
            self.record_failure(&err)?;
            return Err(err);
        }

        if pending.replaces_history {
            self.history.replace_all(snapshot);
        } else {
            self.history.append(snapshot);
        }
        self.tools.clear_pending();
        if action == ActionKind::Retouch {
            self.tools.take_reference();
        }
        self.settle_loaded()?;
        tracing::info!(%action, index = ?self.history.index(), "action applied");
        Ok(())
    }

    /// "Try again": clears the error and any busy flag, back to the last good snapshot.
    pub fn acknowledge_error(&mut self) -> CoordinatorResult<bool> {
        if self.session.state() != SessionState::Failed {
            return Ok(false);
        }
        self.error = None;
        self.in_flight = None;
        let event = if self.history.is_empty() {
            SessionEvent::Clear
        } else {
            SessionEvent::Acknowledge
        };
        self.session.transition(event)?;
        Ok(true)
    }

    /// Asks to leave the page. Edits on top of the original need confirmation.
    pub fn request_navigation(&mut self) -> NavigationDecision {
        if self.history.has_edits() {
            self.navigation_pending = true;
            NavigationDecision::NeedsConfirmation
        } else {
            self.upload_new();
            NavigationDecision::Proceed
        }
    }

    pub fn confirm_navigation(&mut self) -> bool {
        if !self.navigation_pending {
            return false;
        }
        self.upload_new();
        true
    }

    pub fn cancel_navigation(&mut self) {
        self.navigation_pending = false;
    }

    /// Saves the current snapshot's bytes unchanged.
    pub fn download<E: SnapshotExporter>(&self, exporter: &E) -> CoordinatorResult<PathBuf> {
        let current = self.history.current().ok_or(ValidationError::NoImage)?;
        Ok(exporter.export_snapshot(current)?)
    }

    fn ensure_idle(&self) -> CoordinatorResult<()> {
        match self.in_flight() {
            Some(active) => {
                tracing::debug!(%active, "submission rejected while busy");
                Err(CoordinatorError::Busy { active })
            }
            None => Ok(()),
        }
    }

    fn require_current(&self) -> Result<Snapshot, ValidationError> {
        self.history.current().cloned().ok_or(ValidationError::NoImage)
    }

    fn layout_checked(&self) -> Result<(Size, Rect), ValidationError> {
        let natural = self.display.natural_size().ok_or(ValidationError::NoImage)?;
        let image_box = self
            .tools
            .image_box()
            .filter(Rect::has_area)
            .ok_or(ValidationError::NoLayout)?;
        Ok((natural, image_box))
    }

    fn layout(&self) -> CoordinatorResult<(Size, Rect)> {
        Ok(self.layout_checked()?)
    }

    /// Validation failures are returned to the caller and leave the session untouched.
    fn validated<T>(&self, outcome: Result<T, ValidationError>) -> CoordinatorResult<T> {
        outcome.map_err(|err| self.fail_validation(err))
    }

    fn fail_validation(&self, err: ValidationError) -> CoordinatorError {
        tracing::info!(%err, "action rejected by validation");
        CoordinatorError::Validation(err)
    }

    /// Puts the session into the error view with `err`'s message.
    fn record_failure(&mut self, err: &CoordinatorError) -> CoordinatorResult<()> {
        tracing::warn!(%err, "action failed");
        self.error = Some(capitalize(&err.to_string()));
        if self.session.state() != SessionState::Failed {
            self.session.transition(SessionEvent::Fail)?;
        }
        Ok(())
    }

    /// Moves the session into `Loaded` after a successful commit.
    fn settle_loaded(&mut self) -> CoordinatorResult<()> {
        self.error = None;
        let event = match self.session.state() {
            SessionState::Busy => SessionEvent::Succeed,
            SessionState::Failed => SessionEvent::Acknowledge,
            SessionState::Empty => SessionEvent::Load,
            SessionState::Loaded => return Ok(()),
        };
        self.session.transition(event)?;
        Ok(())
    }

    fn begin(
        &mut self,
        kind: ActionKind,
        request: GenerationRequest,
        replaces_history: bool,
    ) -> CoordinatorResult<PendingAction> {
        self.session.transition(SessionEvent::Submit)?;
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        self.in_flight = Some((ticket, kind));
        self.error = None;
        tracing::info!(action = %kind, ticket, parts = request.parts.len(), "action submitted");
        Ok(PendingAction {
            ticket,
            kind,
            request,
            replaces_history,
        })
    }
}

impl<G: ImageGenerator + 'static> ActionCoordinator<G> {
    /// Runs the pending action's generator call on a worker thread.
    pub fn spawn(&self, pending: PendingAction) -> GenerationHandle {
        spawn_generation(Arc::clone(&self.generator), pending)
    }
}

fn require_prompt(prompt: &str, action: ActionKind) -> Result<String, ValidationError> {
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ValidationError::EmptyPrompt { action });
    }
    Ok(prompt.to_string())
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
