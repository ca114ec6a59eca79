use std::sync::mpsc;
use std::time::{Duration, Instant};

use egui::{Color32, Key, Modifiers};
use image::RgbaImage;
use uuid::Uuid;

use crate::canvas::{Layer, LayerId, LayerStack, Point};
use crate::components::history::{HistoryManager, HistoryOp, HistoryRequest};
use crate::components::tools::{PenVariant, StrokeEngine, StrokeEvent, Tool, ToolProperties, parse_hex_color};
use crate::io::{EncodedImage, ExportedImage, SnapshotError};
use crate::keybindings::BindableAction;
use crate::ops::shapes::ShapeKind;
use crate::settings::{EngineSettings, ThemeMode};

pub const MIN_CANVAS_WIDTH: u32 = 400;
pub const MIN_CANVAS_HEIGHT: u32 = 300;
/// Drag-resize upper bounds; button nudges are only held to the minimum.
pub const MAX_CANVAS_WIDTH: u32 = 2000;
pub const MAX_CANVAS_HEIGHT: u32 = 1500;
pub const NUDGE_STEP: i32 = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResizeSource {
    /// Explicit size (buttons, settings): minimum clamp only.
    Exact,
    /// Drag handle: clamped to both minimum and maximum.
    Drag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    Width,
    Height,
}

pub fn clamp_canvas_size(width: u32, height: u32, source: ResizeSource) -> (u32, u32) {
    let width = width.max(MIN_CANVAS_WIDTH);
    let height = height.max(MIN_CANVAS_HEIGHT);
    match source {
        ResizeSource::Exact => (width, height),
        ResizeSource::Drag => (width.min(MAX_CANVAS_WIDTH), height.min(MAX_CANVAS_HEIGHT)),
    }
}

// ============================================================================
// ASYNC RESTORE PLUMBING
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RestoreKind {
    /// Undo/redo: a decode failure repaints and records a fallback entry.
    History,
    /// Content carried across a canvas resize; always recorded afterwards.
    Resize,
}

/// Sent back from the decode worker.
struct RestoreResult {
    layer_id: LayerId,
    kind: RestoreKind,
    result: Result<RgbaImage, SnapshotError>,
}

#[derive(Clone, Copy, Debug)]
struct PendingResize {
    width: u32,
    height: u32,
    requested_at: Instant,
}

// ============================================================================
// PROJECT - one drawing document and everything that edits it
// ============================================================================

/// A drawing document: the layer stack plus per-layer history, the current
/// drawing configuration and the gesture in progress.
///
/// Every public operation absorbs failure.  Results come back as `bool` or
/// `Option` and problems go to the session log.
pub struct Project {
    pub id: Uuid,
    canvas_state: LayerStack,
    history: HistoryManager<LayerId>,
    properties: ToolProperties,
    stroke_engine: StrokeEngine,
    settings: EngineSettings,
    restore_sender: mpsc::Sender<RestoreResult>,
    restore_receiver: mpsc::Receiver<RestoreResult>,
    pending_restores: usize,
    pending_resize: Option<PendingResize>,
}

impl Default for Project {
    fn default() -> Self {
        Self::new(EngineSettings::default())
    }
}

impl Project {
    /// Background / Sketch / Details document.
    pub fn new(settings: EngineSettings) -> Self {
        let (w, h) = clamp_canvas_size(settings.canvas_width, settings.canvas_height, ResizeSource::Exact);
        let stack = LayerStack::new(w, h, settings.theme_mode.background());
        Self::from_stack(stack, settings)
    }

    /// One opaque layer with one undo domain.
    pub fn new_single_canvas(settings: EngineSettings) -> Self {
        let (w, h) = clamp_canvas_size(settings.canvas_width, settings.canvas_height, ResizeSource::Exact);
        let stack = LayerStack::single_canvas(w, h, settings.theme_mode.background());
        Self::from_stack(stack, settings)
    }

    fn from_stack(mut canvas_state: LayerStack, settings: EngineSettings) -> Self {
        canvas_state.show_grid = settings.show_grid;
        let (restore_sender, restore_receiver) = mpsc::channel();
        let mut properties = ToolProperties::default();
        properties.color = settings.theme_mode.default_ink();
        let mut project = Self {
            id: Uuid::new_v4(),
            canvas_state,
            history: HistoryManager::new(settings.max_undo_steps),
            properties,
            stroke_engine: StrokeEngine::default(),
            settings,
            restore_sender,
            restore_receiver,
            pending_restores: 0,
            pending_resize: None,
        };
        let ids: Vec<LayerId> = project.canvas_state.layers().iter().map(|l| l.id.clone()).collect();
        for id in &ids {
            project.seed_history(id);
        }
        project.canvas_state.render_frame();
        log_info!(
            "Project {} created: {}×{}, {} layer(s)",
            project.id,
            project.canvas_state.width(),
            project.canvas_state.height(),
            ids.len()
        );
        project
    }

    // --- read access ---

    pub fn canvas(&self) -> &LayerStack {
        &self.canvas_state
    }

    pub fn history(&self) -> &HistoryManager<LayerId> {
        &self.history
    }

    pub fn properties(&self) -> &ToolProperties {
        &self.properties
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn layers(&self) -> &[Layer] {
        self.canvas_state.layers()
    }

    pub fn active_layer_id(&self) -> Option<&LayerId> {
        self.canvas_state.active_layer_id()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.canvas_state.dimensions()
    }

    pub fn is_drawing(&self) -> bool {
        self.stroke_engine.is_drawing()
    }

    // ========================================================================
    // POINTER INPUT
    // ========================================================================

    /// Ignored while resizing, or while the active layer is being restored.
    pub fn pointer_down(&mut self, point: Point) -> bool {
        if self.is_resizing() {
            return false;
        }
        let Some(id) = self.canvas_state.active_layer_id() else {
            log_warn!("pointer_down: no active layer");
            return false;
        };
        if self.history.is_restoring(id) {
            log_info!("pointer_down: '{}' is restoring, input ignored", id);
            return false;
        }
        self.stroke_engine.pointer_down(point, &self.properties, &mut self.canvas_state)
    }

    pub fn pointer_move(&mut self, point: Point) -> bool {
        if self.is_resizing() {
            return false;
        }
        let moved = self.stroke_engine.pointer_move(point, &mut self.canvas_state);
        if moved {
            self.canvas_state.render_frame();
        }
        moved
    }

    /// Completes the gesture and records one snapshot.  No-op while idle.
    pub fn pointer_up(&mut self, point: Option<Point>) -> bool {
        let event = self.stroke_engine.pointer_up(point, &mut self.canvas_state);
        self.commit_stroke(event)
    }

    pub fn pointer_leave(&mut self, point: Option<Point>) -> bool {
        let event = self.stroke_engine.pointer_leave(point, &mut self.canvas_state);
        self.commit_stroke(event)
    }

    fn commit_stroke(&mut self, event: Option<StrokeEvent>) -> bool {
        let Some(event) = event else {
            return false;
        };
        self.capture_layer(&event.layer_id);
        self.canvas_state.render_frame();
        true
    }

    // ========================================================================
    // DRAWING CONFIGURATION
    // ========================================================================

    pub fn set_tool(&mut self, tool: Tool) {
        self.properties.tool = tool;
    }

    pub fn set_tool_by_name(&mut self, name: &str) -> bool {
        match name.parse::<Tool>() {
            Ok(tool) => {
                self.set_tool(tool);
                true
            }
            Err(e) => {
                log_warn!("set_tool: {}", e);
                false
            }
        }
    }

    pub fn set_color(&mut self, color: Color32) {
        self.properties.color = color;
    }

    /// `#rrggbb`; anything else is rejected and the color kept.
    pub fn set_color_hex(&mut self, hex: &str) -> bool {
        match parse_hex_color(hex) {
            Some(color) => {
                self.set_color(color);
                true
            }
            None => {
                log_warn!("set_color: rejected '{}'", hex);
                false
            }
        }
    }

    /// Returns the clamped size actually stored.
    pub fn set_brush_size(&mut self, size: f32) -> f32 {
        self.properties.set_size(size)
    }

    pub fn set_pen_variant(&mut self, variant: PenVariant) {
        self.properties.pen_variant = variant;
    }

    pub fn set_pen_variant_by_name(&mut self, name: &str) -> bool {
        match name.parse::<PenVariant>() {
            Ok(v) => {
                self.set_pen_variant(v);
                true
            }
            Err(e) => {
                log_warn!("set_pen_variant: {}", e);
                false
            }
        }
    }

    pub fn set_shape(&mut self, shape: ShapeKind) {
        self.properties.shape = shape;
    }

    pub fn set_shape_by_name(&mut self, name: &str) -> bool {
        match name.parse::<ShapeKind>() {
            Ok(shape) => {
                self.set_shape(shape);
                true
            }
            Err(e) => {
                log_warn!("set_shape: {}", e);
                false
            }
        }
    }

    /// Changes the fill used by later clears and resets, and the ink color.
    pub fn set_theme(&mut self, mode: ThemeMode) {
        self.settings.theme_mode = mode;
        self.canvas_state.set_background_color(mode.background());
        self.properties.color = mode.default_ink();
    }

    // ========================================================================
    // LAYERS
    // ========================================================================

    pub fn select_layer(&mut self, id: &LayerId) -> bool {
        self.canvas_state.set_active_layer(id)
    }

    pub fn set_layer_visibility(&mut self, id: &LayerId, visible: bool) -> bool {
        let changed = self.canvas_state.set_visibility(id, visible);
        if changed {
            self.canvas_state.render_frame();
        }
        changed
    }

    pub fn toggle_layer_visibility(&mut self, id: &LayerId) -> Option<bool> {
        let visible = self.canvas_state.toggle_visibility(id)?;
        self.canvas_state.render_frame();
        Some(visible)
    }

    /// Clamped to `[0, 1]`; returns the stored value.
    pub fn set_layer_opacity(&mut self, id: &LayerId, opacity: f32) -> Option<f32> {
        let stored = self.canvas_state.set_opacity(id, opacity)?;
        self.canvas_state.render_frame();
        Some(stored)
    }

    /// Append a transparent layer on top, with its own history.
    pub fn add_layer(&mut self, name: &str) -> LayerId {
        let id = self.canvas_state.add_layer(name);
        self.seed_history(&id);
        self.canvas_state.render_frame();
        log_info!("Added layer '{}' ({})", name, id);
        id
    }

    /// Wipe the active layer to its background and record it.
    pub fn clear_active_layer(&mut self) -> bool {
        let Some(id) = self.canvas_state.active_layer_id().cloned() else {
            return false;
        };
        if self.stroke_engine.target_layer() == Some(&id) || self.history.is_restoring(&id) {
            log_info!("clear: '{}' is busy, ignored", id);
            return false;
        }
        self.canvas_state.reset_layer(&id);
        self.capture_layer(&id);
        self.canvas_state.render_frame();
        true
    }

    // ========================================================================
    // HISTORY
    // ========================================================================

    pub fn undo(&mut self) -> bool {
        match self.canvas_state.active_layer_id().cloned() {
            Some(id) => self.undo_layer(&id),
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.canvas_state.active_layer_id().cloned() {
            Some(id) => self.redo_layer(&id),
            None => false,
        }
    }

    /// Starts (or queues) an undo on one layer.  The surface changes when the
    /// restore lands; see [`poll_restores`](Self::poll_restores).
    pub fn undo_layer(&mut self, id: &LayerId) -> bool {
        if self.stroke_engine.target_layer() == Some(id) {
            log_info!("undo: gesture in progress on '{}', ignored", id);
            return false;
        }
        let request = self.history.undo(id);
        self.dispatch(id, request)
    }

    pub fn redo_layer(&mut self, id: &LayerId) -> bool {
        if self.stroke_engine.target_layer() == Some(id) {
            log_info!("redo: gesture in progress on '{}', ignored", id);
            return false;
        }
        let request = self.history.redo(id);
        self.dispatch(id, request)
    }

    fn dispatch(&mut self, id: &LayerId, request: HistoryRequest) -> bool {
        match request {
            HistoryRequest::Restore(snapshot) => {
                self.spawn_restore(id.clone(), snapshot, RestoreKind::History);
                true
            }
            HistoryRequest::Queued => true,
            HistoryRequest::Ignored => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.canvas_state.active_layer_id().is_some_and(|id| self.history.can_undo(id))
    }

    pub fn can_redo(&self) -> bool {
        self.canvas_state.active_layer_id().is_some_and(|id| self.history.can_redo(id))
    }

    pub fn can_undo_layer(&self, id: &LayerId) -> bool {
        self.history.can_undo(id)
    }

    pub fn can_redo_layer(&self, id: &LayerId) -> bool {
        self.history.can_redo(id)
    }

    /// Install the layer's current content as its history floor.
    fn seed_history(&mut self, id: &LayerId) {
        let Some(layer) = self.canvas_state.layer(id) else {
            return;
        };
        match layer.surface.to_image() {
            Ok(snapshot) => self.history.reset(id.clone(), snapshot),
            Err(e) => {
                log_err!("Initial snapshot of '{}' failed: {}", id, e);
            }
        }
    }

    /// Record the layer's current content, or queue that behind a restore.
    fn capture_layer(&mut self, id: &LayerId) -> bool {
        if self.history.is_restoring(id) {
            self.history.defer(id, HistoryOp::Snapshot);
            return true;
        }
        let Some(layer) = self.canvas_state.layer(id) else {
            log_warn!("snapshot: no layer '{}'", id);
            return false;
        };
        match layer.surface.to_image() {
            Ok(snapshot) => self.history.push(id.clone(), snapshot),
            Err(e) => {
                log_err!("Snapshot of '{}' failed, edit not recorded: {}", id, e);
                false
            }
        }
    }

    // ========================================================================
    // ASYNC RESTORES
    // ========================================================================

    fn spawn_restore(&mut self, layer_id: LayerId, snapshot: EncodedImage, kind: RestoreKind) {
        let sender = self.restore_sender.clone();
        self.pending_restores += 1;
        rayon::spawn(move || {
            let result = snapshot.decode();
            let _ = sender.send(RestoreResult { layer_id, kind, result });
        });
    }

    pub fn restores_in_flight(&self) -> usize {
        self.pending_restores
    }

    /// Apply every restore that has finished decoding.  Returns how many landed.
    pub fn poll_restores(&mut self) -> usize {
        let mut landed = 0;
        while let Ok(result) = self.restore_receiver.try_recv() {
            self.pending_restores = self.pending_restores.saturating_sub(1);
            self.apply_restore(result);
            landed += 1;
        }
        if landed > 0 {
            self.canvas_state.render_frame();
        }
        landed
    }

    /// Block until no restore is in flight, including any started by
    /// replaying queued operations.
    pub fn wait_for_restores(&mut self) {
        let mut landed = false;
        while self.pending_restores > 0 {
            match self.restore_receiver.recv() {
                Ok(result) => {
                    self.pending_restores -= 1;
                    self.apply_restore(result);
                    landed = true;
                }
                Err(_) => {
                    log_err!("Restore channel closed with {} pending", self.pending_restores);
                    self.pending_restores = 0;
                }
            }
        }
        if landed {
            self.canvas_state.render_frame();
        }
    }

    fn apply_restore(&mut self, restore: RestoreResult) {
        let RestoreResult { layer_id, kind, result } = restore;
        let Some(fill) = self.canvas_state.fill_for(&layer_id) else {
            log_warn!("Restore for missing layer '{}' dropped", layer_id);
            self.history.finish_restore(&layer_id);
            return;
        };

        let mut record = kind == RestoreKind::Resize;
        match result {
            Ok(decoded) => {
                if let Some(layer) = self.canvas_state.layer_mut(&layer_id) {
                    layer.surface.restore_decoded(&decoded, fill);
                }
            }
            Err(e) => {
                log_err!("Restore of '{}' failed, repainting background: {}", layer_id, e);
                self.canvas_state.reset_layer(&layer_id);
                record = true;
            }
        }

        let queued = self.history.finish_restore(&layer_id);
        if record {
            self.capture_layer(&layer_id);
        }
        for op in queued {
            match op {
                HistoryOp::Undo => {
                    self.undo_layer(&layer_id);
                }
                HistoryOp::Redo => {
                    self.redo_layer(&layer_id);
                }
                HistoryOp::Snapshot => {
                    self.capture_layer(&layer_id);
                }
            }
        }
    }

    // ========================================================================
    // CANVAS RESIZE (debounced)
    // ========================================================================

    /// Clamp and schedule a resize.  Repeated requests inside the debounce
    /// window coalesce into the last one.  A gesture in progress is finalised.
    /// A request that clamps to the current size changes nothing, apart from
    /// cancelling a pending resize to some other size.
    pub fn request_resize(&mut self, width: u32, height: u32, source: ResizeSource, now: Instant) -> (u32, u32) {
        let (width, height) = clamp_canvas_size(width, height, source);
        if (width, height) == self.canvas_state.dimensions() {
            // Back at the current size: nothing to apply, drop any pending request.
            self.pending_resize = None;
            return (width, height);
        }
        if self.stroke_engine.is_drawing() {
            let event = self.stroke_engine.pointer_leave(None, &mut self.canvas_state);
            self.commit_stroke(event);
        }
        self.pending_resize = Some(PendingResize {
            width,
            height,
            requested_at: now,
        });
        (width, height)
    }

    /// Step one axis by `delta` pixels from the pending (or current) size.
    pub fn nudge_canvas(&mut self, axis: Axis, delta: i32, now: Instant) -> (u32, u32) {
        let (w, h) = match self.pending_resize {
            Some(p) => (p.width, p.height),
            None => self.canvas_state.dimensions(),
        };
        let step = |v: u32| (v as i64 + delta as i64).clamp(0, u32::MAX as i64) as u32;
        let (w, h) = match axis {
            Axis::Width => (step(w), h),
            Axis::Height => (w, step(h)),
        };
        self.request_resize(w, h, ResizeSource::Exact, now)
    }

    pub fn is_resizing(&self) -> bool {
        self.pending_resize.is_some()
    }

    /// Per-frame driver: lands finished restores, then applies a pending
    /// resize once it has settled.  Returns `true` if a resize was applied.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.poll_restores();
        let Some(pending) = self.pending_resize else {
            return false;
        };
        let debounce = Duration::from_millis(self.settings.resize_debounce_ms);
        if now.saturating_duration_since(pending.requested_at) < debounce {
            return false;
        }
        if self.history.any_restoring() {
            return false;
        }
        self.pending_resize = None;
        self.apply_resize(pending.width, pending.height);
        true
    }

    fn apply_resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.canvas_state.dimensions() {
            return;
        }
        let captures: Vec<(LayerId, Result<EncodedImage, SnapshotError>)> = self
            .canvas_state
            .layers()
            .iter()
            .map(|l| (l.id.clone(), l.surface.to_image()))
            .collect();

        self.canvas_state.resize(width, height);
        log_info!("Canvas resized to {}×{}", width, height);

        for (id, capture) in captures {
            match capture {
                Ok(snapshot) => {
                    if self.history.begin_restore(&id) {
                        self.spawn_restore(id, snapshot, RestoreKind::Resize);
                    }
                }
                Err(e) => {
                    log_err!("Resize capture of '{}' failed, content reset: {}", id, e);
                    self.capture_layer(&id);
                }
            }
        }
        self.canvas_state.render_frame();
    }

    // ========================================================================
    // OUTPUT
    // ========================================================================

    pub fn set_grid(&mut self, show: bool) {
        self.canvas_state.show_grid = show;
        self.settings.show_grid = show;
        self.canvas_state.render_frame();
    }

    pub fn toggle_grid(&mut self) -> bool {
        let show = !self.canvas_state.show_grid;
        self.set_grid(show);
        show
    }

    pub fn render_frame(&mut self) -> &RgbaImage {
        self.canvas_state.render_frame()
    }

    /// Frame from the last render.
    pub fn frame(&self) -> &RgbaImage {
        self.canvas_state.frame()
    }

    /// PNG of the composited layers (no grid, no preview), once every
    /// in-flight restore has landed.
    pub fn export_png(&mut self) -> Option<ExportedImage> {
        self.wait_for_restores();
        let composite = self.canvas_state.composite();
        match ExportedImage::new(&self.settings.export_prefix, &composite) {
            Ok(export) => {
                log_info!("Exported {}", export.filename);
                Some(export)
            }
            Err(e) => {
                log_err!("Export failed: {}", e);
                None
            }
        }
    }

    // ========================================================================
    // SHORTCUTS
    // ========================================================================

    /// Resolve and perform a shortcut.  `ToggleToolbar` is only reported.
    pub fn handle_key(&mut self, key: Key, modifiers: Modifiers) -> Option<BindableAction> {
        let action = self.settings.keybindings.resolve(key, modifiers)?;
        match action {
            BindableAction::Undo => {
                self.undo();
            }
            BindableAction::Redo => {
                self.redo();
            }
            BindableAction::ToolPen => self.set_tool(Tool::Pen),
            BindableAction::ToolEraser => self.set_tool(Tool::Eraser),
            BindableAction::ToolHighlighter => self.set_tool(Tool::Highlighter),
            BindableAction::ToolShapes => self.set_tool(Tool::Shapes),
            BindableAction::ToggleToolbar => {}
        }
        Some(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::Pos2;
    use image::Rgba;

    fn sketch() -> LayerId {
        LayerId::from("layer-1")
    }

    fn stroke(p: &mut Project, y: f32) {
        assert!(p.pointer_down(Pos2::new(20.0, y)));
        p.pointer_move(Pos2::new(200.0, y));
        assert!(p.pointer_up(None));
    }

    #[test]
    fn clamps() {
        assert_eq!(clamp_canvas_size(10, 10, ResizeSource::Exact), (400, 300));
        assert_eq!(clamp_canvas_size(5000, 5000, ResizeSource::Exact), (5000, 5000));
        assert_eq!(clamp_canvas_size(5000, 5000, ResizeSource::Drag), (2000, 1500));
    }

    #[test]
    fn history_decode_failure_repaints_and_records() {
        let mut p = Project::default();
        stroke(&mut p, 50.0);
        p.history.push(sketch(), EncodedImage::from_bytes(b"broken".to_vec(), 800, 600));
        stroke(&mut p, 80.0);

        assert!(p.undo());
        p.wait_for_restores();

        let layer = p.canvas().layer(&sketch()).unwrap();
        assert!(layer.surface.is_blank());
        assert_eq!(p.history().undo_len(&sketch()), 4);
        assert!(p.can_undo());
        assert!(!p.can_redo());
    }

    #[test]
    fn resize_decode_failure_gives_fresh_background() {
        let mut p = Project::default();
        let bg = LayerId::from("layer-0");
        p.canvas_state.layer_mut(&bg).unwrap().surface.clear(Some(Rgba([1, 2, 3, 255])));
        p.canvas_state.resize(1000, 600);
        assert!(p.history.begin_restore(&bg));
        p.spawn_restore(bg.clone(), EncodedImage::from_bytes(Vec::new(), 800, 600), RestoreKind::Resize);
        p.wait_for_restores();

        let surface = &p.canvas().layer(&bg).unwrap().surface;
        assert_eq!(surface.dimensions(), (1000, 600));
        assert!(surface.pixels().pixels().all(|px| *px == Rgba([255, 255, 255, 255])));
        assert_eq!(p.history().undo_len(&bg), 2);
    }

    #[test]
    fn stroke_during_restore_is_ignored_then_allowed() {
        let mut p = Project::default();
        stroke(&mut p, 50.0);
        assert!(p.undo());
        assert!(!p.can_undo());
        assert!(!p.can_redo());
        assert!(!p.pointer_down(Pos2::new(10.0, 10.0)));
        p.wait_for_restores();
        assert!(p.can_redo());
        assert!(p.pointer_down(Pos2::new(10.0, 10.0)));
    }

    #[test]
    fn queued_undo_runs_after_restore() {
        let mut p = Project::default();
        stroke(&mut p, 50.0);
        stroke(&mut p, 80.0);
        assert!(p.undo());
        assert!(p.undo());
        p.wait_for_restores();
        assert_eq!(p.history().undo_len(&sketch()), 1);
        assert_eq!(p.history().redo_len(&sketch()), 2);
        assert!(p.canvas().layer(&sketch()).unwrap().surface.is_blank());
    }

    #[test]
    fn undo_during_gesture_on_same_layer_is_ignored() {
        let mut p = Project::default();
        stroke(&mut p, 50.0);
        p.pointer_down(Pos2::new(20.0, 90.0));
        assert!(!p.undo());
        assert!(p.pointer_up(None));
    }

    #[test]
    fn theme_switch_changes_ink_and_fill() {
        let mut p = Project::default();
        p.set_theme(ThemeMode::Dark);
        assert_eq!(p.properties().color, Color32::WHITE);
        assert_eq!(p.canvas().background_color(), ThemeMode::Dark.background());
        // Existing pixels untouched until the next clear.
        let bg = LayerId::from("layer-0");
        assert_eq!(p.canvas().layer(&bg).unwrap().surface.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
        p.select_layer(&bg);
        assert!(p.clear_active_layer());
        assert_eq!(p.canvas().layer(&bg).unwrap().surface.get_pixel(0, 0), ThemeMode::Dark.background());
    }
}
