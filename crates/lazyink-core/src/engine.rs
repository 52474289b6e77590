//! The drawing engine.
//!
//! [`DrawEngine`] owns the layer stack, the view, the pointer smoother and
//! the line history, and exposes the operations a host widget binds to its
//! buttons and input events. Everything runs on the host's UI thread: input
//! handlers, [`DrawEngine::advance`] for timed replay and [`DrawEngine::frame`]
//! for the interface repaint loop.

use crate::catenary::{Catenary, ConnectorCurve};
use crate::color::BrushColor;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::grid::{paint_background_image, paint_grid};
use crate::history::History;
use crate::layers::{LayerKind, LayerStack};
use crate::line::{Line, SaveDocument, is_valid_dimension};
use crate::replay::{ReplayQueue, ReplayStep};
use crate::smoother::{LazyBrush, PointerSmoother};
use crate::stroke::{StrokePipeline, preview_stroke};
use crate::surface::{ImageSource, RecordingSurface, Surface, clear_client, round_stroke, with_identity};
use crate::view::{ViewState, ViewTransform};
use kurbo::{Point, Size, Vec2};
use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use std::time::Duration;

/// Radius of the dot drawn at the raw pointer.
const POINTER_DOT_RADIUS: f64 = 4.0;
/// Radius of the dot drawn at the brush centre.
const BRUSH_DOT_RADIUS: f64 = 2.0;
/// Width of the dashed connector.
const CONNECTOR_WIDTH: f64 = 2.0;

/// Callback run after every change to the lines or history.
pub type ChangeListener<S> = Box<dyn FnMut(&DrawEngine<S>)>;

/// How [`DrawEngine::frame`] was invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameMode {
    /// Part of the host's display-refresh loop.
    Continuous,
    /// A one-off repaint; never asks to be rescheduled.
    SingleShot,
}

/// What the host should do after a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameRequest {
    /// Call `frame` again on the next display refresh.
    Reschedule,
    Done,
}

/// Freehand drawing engine over surfaces of type `S`.
pub struct DrawEngine<S: Surface = RecordingSurface> {
    config: EngineConfig,
    layers: Option<LayerStack<S>>,
    view: ViewTransform,
    view_changed: Rc<Cell<bool>>,
    smoother: Box<dyn PointerSmoother>,
    connector: Box<dyn ConnectorCurve>,
    stroke: StrokePipeline,
    history: History,
    replay: ReplayQueue,
    is_pressing: bool,
    pointer_moved: bool,
    values_changed: bool,
    defer_view_redraw: bool,
    on_change: Option<ChangeListener<S>>,
}

impl<S: Surface> std::fmt::Debug for DrawEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawEngine")
            .field("lines", &self.history.lines().len())
            .field("erased_groups", &self.history.erased_groups().len())
            .field("undo_depth", &self.history.undo_depth())
            .field("ready", &self.layers.is_some())
            .field("view", &self.view.view())
            .field("pending_replay", &self.replay.pending())
            .finish()
    }
}

impl<S: Surface> DrawEngine<S> {
    /// Create an engine with the default smoother and connector.
    ///
    /// Fails only if `config.save_data` is present and invalid.
    pub fn new(config: EngineConfig) -> EngineResult<Self> {
        let smoother = LazyBrush::new(
            config.lazy_radius * config.device_pixel_ratio,
            true,
            Point::new(config.canvas_width / 2.0, config.canvas_height / 2.0),
        );
        Self::with_collaborators(config, Box::new(smoother), Box::new(Catenary::default()))
    }

    /// Create an engine with host-supplied collaborators.
    pub fn with_collaborators(
        config: EngineConfig,
        smoother: Box<dyn PointerSmoother>,
        connector: Box<dyn ConnectorCurve>,
    ) -> EngineResult<Self> {
        let mut view = ViewTransform::new(config.canvas_size(), config.zoom_extents);
        let view_changed = Rc::new(Cell::new(false));
        let flag = view_changed.clone();
        view.attach_view_change_listener(move || flag.set(true));

        let save_data = config.save_data.clone();
        let mut engine = Self {
            config,
            layers: None,
            view,
            view_changed,
            smoother,
            connector,
            stroke: StrokePipeline::new(),
            history: History::new(),
            replay: ReplayQueue::new(),
            is_pressing: false,
            pointer_moved: false,
            values_changed: true,
            defer_view_redraw: false,
            on_change: None,
        };

        if let Some(data) = save_data {
            engine.load_save_data(&data, None)?;
        }
        Ok(engine)
    }

    /// Attach the host surfaces. Until this is called the engine is not
    /// ready and painting is skipped; history operations still work.
    pub fn attach(&mut self, mut layers: LayerStack<S>) {
        let surface_size = self.surface_size();
        if layers.size() != surface_size {
            layers.resize_all(surface_size);
        }
        layers.set_transform_all(self.view.transform_matrix());
        self.layers = Some(layers);

        self.repaint_background();
        self.redraw_lines();
        self.values_changed = true;
        self.frame(FrameMode::SingleShot);
    }

    /// Detach and return the surfaces.
    pub fn detach(&mut self) -> Option<LayerStack<S>> {
        self.layers.take()
    }

    pub fn is_ready(&self) -> bool {
        self.layers.is_some()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn layers(&self) -> Option<&LayerStack<S>> {
        self.layers.as_ref()
    }

    pub fn view(&self) -> &ViewTransform {
        &self.view
    }

    pub fn smoother(&self) -> &dyn PointerSmoother {
        self.smoother.as_ref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Committed lines, oldest first.
    pub fn lines(&self) -> &[Line] {
        self.history.lines()
    }

    /// Points of the stroke being captured.
    pub fn pending_points(&self) -> &[Point] {
        self.stroke.points()
    }

    /// Document size: what saves are stamped with and loads are fitted to.
    pub fn document_size(&self) -> Size {
        self.config.canvas_size()
    }

    /// Pixel size of the layer surfaces. Starts at the document size and
    /// follows [`DrawEngine::resize`].
    pub fn surface_size(&self) -> Size {
        self.view.document_size()
    }

    /// Change the document size used for saving and for fitting loads.
    /// Existing lines are not rescaled.
    pub fn set_document_size(&mut self, size: Size) {
        self.config.canvas_width = size.width;
        self.config.canvas_height = size.height;
    }

    /// Paints still waiting in a timed replay.
    pub fn pending_replay(&self) -> usize {
        self.replay.pending()
    }

    /// Register the change callback, replacing any previous one.
    pub fn set_on_change(&mut self, listener: impl FnMut(&DrawEngine<S>) + 'static) {
        self.on_change = Some(Box::new(listener));
    }

    fn trigger_on_change(&mut self) {
        if let Some(mut listener) = self.on_change.take() {
            listener(self);
            if self.on_change.is_none() {
                self.on_change = Some(listener);
            }
        }
    }

    // ---- stroke pipeline ----

    /// Start capturing a stroke.
    pub fn begin_stroke(&mut self) {
        self.stroke.begin();
    }

    /// Append a document-space point to the stroke being captured.
    pub fn append_point(&mut self, point: Point) {
        self.stroke.append_point(point);
    }

    /// Repaint the temp layer from the capture buffer with the current brush.
    pub fn preview_stroke(&mut self) {
        if let Some(layers) = self.layers.as_mut() {
            self.stroke
                .preview(layers, &self.config.brush_color, self.config.brush_radius);
        }
    }

    /// Commit the captured stroke as a new line.
    ///
    /// Overrides fall back to the current brush. Returns false when fewer
    /// than two points were captured; nothing is recorded in that case.
    pub fn commit_stroke(&mut self, color: Option<BrushColor>, radius: Option<f64>) -> bool {
        let color = color.unwrap_or_else(|| self.config.brush_color.clone());
        let radius = radius.unwrap_or(self.config.brush_radius);

        match self.stroke.commit(self.layers.as_mut(), color, radius) {
            Some(line) => {
                self.history.invalidate_redo();
                self.history.push_line(line);
                self.trigger_on_change();
                true
            }
            None => false,
        }
    }

    /// Pointer went down at a document-space point. The brush snaps to the
    /// pointer and the stroke starts there.
    pub fn handle_draw_start(&mut self, point: Point) {
        self.smoother.update(point, true);
        self.pointer_moved = true;
        if self.config.disabled {
            return;
        }
        self.is_pressing = true;
        self.stroke.begin();
        let brush = self.clamp_to_document(self.smoother.brush());
        self.stroke.append_point(brush);
        self.preview_stroke();
    }

    /// Pointer moved to a document-space point, pressed or not.
    pub fn handle_draw_move(&mut self, point: Point) {
        self.smoother.update(point, false);
        if self.is_pressing && self.smoother.brush_has_moved() {
            let brush = self.clamp_to_document(self.smoother.brush());
            self.stroke.append_point(brush);
            self.preview_stroke();
        }
        self.pointer_moved = true;
    }

    /// Pointer went up: commit the stroke.
    pub fn handle_draw_end(&mut self) {
        self.is_pressing = false;
        if self.stroke.is_capturing() {
            self.commit_stroke(None, None);
        }
    }

    /// Abandon the stroke being captured, for example when a second finger
    /// turns the gesture into a pinch.
    pub fn cancel_stroke(&mut self) {
        self.is_pressing = false;
        self.stroke.abandon();
        if let Some(layers) = self.layers.as_mut() {
            layers.clear_client(LayerKind::Temp);
        }
    }

    pub fn is_pressing(&self) -> bool {
        self.is_pressing
    }

    fn clamp_to_document(&self, point: Point) -> Point {
        if !self.config.clamp_lines_to_document {
            return point;
        }
        let size = self.document_size();
        Point::new(point.x.clamp(0.0, size.width), point.y.clamp(0.0, size.height))
    }

    // ---- history ----

    /// Remove the newest line, or restore the newest erased group when
    /// there are no lines left.
    pub fn undo(&mut self) {
        let Some(lines) = self.history.undo() else {
            return;
        };
        self.clear_drawing_layers();
        self.replay_immediate(lines);
        self.trigger_on_change();
    }

    /// Restore the state before the most recent undo.
    pub fn redo(&mut self) {
        let Some(lines) = self.history.redo() else {
            return;
        };
        self.clear_drawing_layers();
        self.replay_immediate(lines);
        self.trigger_on_change();
    }

    /// Move every line into an erased group that `undo` can restore. The
    /// view is left alone.
    pub fn erase_all(&mut self) {
        self.replay.cancel();
        self.history.erase_all();
        self.clear_drawing_layers();
        self.values_changed = true;
        self.trigger_on_change();
    }

    /// Drop all lines and history, including erased groups, and reset the
    /// view.
    pub fn clear(&mut self) {
        log::info!("Clearing drawing");
        self.replay.cancel();
        self.history.clear();
        self.clear_drawing_layers();
        self.values_changed = true;
        self.reset_view();
        self.trigger_on_change();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn clear_drawing_layers(&mut self) {
        if let Some(layers) = self.layers.as_mut() {
            layers.clear_client(LayerKind::Drawing);
            layers.clear_client(LayerKind::Temp);
        }
    }

    // ---- replay ----

    /// Paint and record `lines` synchronously, each with its own color and
    /// radius.
    fn replay_immediate(&mut self, lines: Vec<Line>) {
        for line in lines {
            self.commit_replayed(line);
        }
    }

    /// Paint and record one replayed line. Lines too short to have been
    /// committed live are dropped here too.
    fn commit_replayed(&mut self, line: Line) -> bool {
        if !line.is_drawable() {
            log::debug!("Skipping replayed line with {} points", line.len());
            return false;
        }
        self.paint_committed(&line);
        self.history.push_line(line);
        true
    }

    /// Replay `lines` on top of the current drawing.
    pub fn replay(&mut self, lines: Vec<Line>, immediate: bool) {
        if immediate {
            self.replay_immediate(lines);
            self.trigger_on_change();
        } else {
            let lines: Vec<Line> = lines.into_iter().filter(Line::is_drawable).collect();
            self.replay.schedule_lines(lines, self.config.load_time_offset());
        }
    }

    fn paint_committed(&mut self, line: &Line) {
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        preview_stroke(
            layers.get_mut(LayerKind::Temp),
            &line.points,
            &line.brush_color,
            line.brush_radius,
        );
        if let Some((drawing, temp)) = layers.pair_mut(LayerKind::Drawing, LayerKind::Temp) {
            with_identity(drawing, |d| d.composite(&*temp));
            clear_client(temp);
        }
    }

    fn run_replay_step(&mut self, step: ReplayStep) {
        match step {
            ReplayStep::Preview { line, upto } => {
                if let Some(layers) = self.layers.as_mut() {
                    let upto = upto.min(line.points.len());
                    preview_stroke(
                        layers.get_mut(LayerKind::Temp),
                        &line.points[..upto],
                        &line.brush_color,
                        line.brush_radius,
                    );
                }
            }
            ReplayStep::Commit { line } => {
                if self.commit_replayed(Line::clone(&line)) {
                    self.trigger_on_change();
                }
            }
        }
    }

    /// Advance the replay clock and run every paint that is now due.
    /// Returns the number of paints run.
    pub fn advance(&mut self, dt: Duration) -> usize {
        self.replay.advance(dt);
        let mut ran = 0;
        while let Some(step) = self.replay.pop_due() {
            self.run_replay_step(step);
            ran += 1;
        }
        ran
    }

    /// Run every pending replay paint now, in order.
    pub fn finish_replay(&mut self) -> usize {
        let steps = self.replay.drain_all();
        let ran = steps.len();
        for step in steps {
            self.run_replay_step(step);
        }
        ran
    }

    /// Repaint the drawing layer from the current lines.
    fn redraw_lines(&mut self) {
        let lines = self.history.take_lines();
        self.clear_drawing_layers();
        self.replay_immediate(lines);
    }

    // ---- save / load ----

    /// Current lines with the live document size.
    pub fn serialize(&self) -> SaveDocument {
        SaveDocument::new(self.history.lines().to_vec(), self.document_size())
    }

    /// Serialize to the save string.
    pub fn get_save_data(&self) -> EngineResult<String> {
        Ok(self.serialize().to_json()?)
    }

    /// Parse and load a save string.
    ///
    /// The string is fully validated before anything is touched; on error
    /// the current drawing is unchanged. `immediate` defaults to the
    /// configured `immediateLoading`.
    pub fn load_save_data(&mut self, data: &str, immediate: Option<bool>) -> EngineResult<()> {
        let document = match parse_save_data(data, self.document_size()) {
            Ok(document) => document,
            Err(e) => {
                log::warn!("Rejected save data: {}", e);
                return Err(e);
            }
        };
        let immediate = immediate.unwrap_or(self.config.immediate_loading);
        self.load(document, immediate);
        Ok(())
    }

    /// Replace the drawing with `document`, rescaling it to the live
    /// document size if it was saved at another size.
    pub fn load(&mut self, document: SaveDocument, immediate: bool) {
        log::info!(
            "Loading {} lines saved at {}x{} (immediate: {})",
            document.lines.len(),
            document.width,
            document.height,
            immediate
        );
        self.replay.cancel();
        self.history.clear();
        self.clear_drawing_layers();
        self.values_changed = true;

        let lines = document.lines_for_size(self.document_size());
        self.replay(lines, immediate);
    }

    // ---- view ----

    /// Install a view.
    pub fn set_view(&mut self, view: ViewState) {
        self.view.set_view(view);
        self.process_view_change();
    }

    /// Back to the identity view.
    pub fn reset_view(&mut self) {
        self.view.reset_view();
        self.process_view_change();
    }

    /// Pan by a client-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.view.pan(delta);
        self.process_view_change();
    }

    /// Zoom by `factor` about a client-space point.
    pub fn zoom_at(&mut self, client_point: Point, factor: f64) {
        self.view.zoom_at(client_point, factor);
        self.process_view_change();
    }

    /// Set an absolute scale about a client-space point.
    pub fn set_scale_at(&mut self, client_point: Point, scale: f64) {
        self.view.set_scale_at(client_point, scale);
        self.process_view_change();
    }

    /// Convert a client-space point to document space.
    pub fn client_to_document(&self, client_point: Point) -> Point {
        self.view.client_to_document(client_point)
    }

    fn process_view_change(&mut self) {
        if self.view_changed.replace(false) {
            self.apply_view();
        }
    }

    /// Reinstall the view transform on every layer and, unless a resize is
    /// in progress, repaint everything under it.
    fn apply_view(&mut self) {
        let transform = self.view.transform_matrix();
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        for kind in LayerKind::ALL {
            layers.clear_client(kind);
        }
        layers.set_transform_all(transform);

        if self.defer_view_redraw {
            return;
        }
        self.repaint_background();
        self.values_changed = true;
        self.frame(FrameMode::SingleShot);
        self.redraw_lines();
    }

    // ---- resize ----

    /// Reflow onto surfaces of a new size, keeping the drawing, the view
    /// and the history. The document size is unchanged.
    ///
    /// Any timed replay still in flight is finished first so the reflow
    /// sees the whole drawing.
    pub fn resize(&mut self, size: Size) {
        if size == self.surface_size() {
            return;
        }
        if !self.replay.is_idle() {
            let flushed = self.finish_replay();
            log::debug!("Flushed {} replay paints before resize", flushed);
        }

        log::debug!(
            "Resizing surfaces from {:?} to {:?} with {} lines",
            self.surface_size(),
            size,
            self.history.lines().len()
        );
        let snapshot = self.serialize();

        let mut engine = DeferViewRedraw::new(self);
        if let Some(layers) = engine.layers.as_mut() {
            layers.resize_all(size);
        }
        engine.view.set_document_size(size);
        engine.process_view_change();
        engine.repaint_background();

        // Saved at the document size, so this repaints without rescaling.
        let lines = snapshot.lines_for_size(engine.document_size());
        engine.history.take_lines();
        engine.clear_drawing_layers();
        engine.replay_immediate(lines);
        engine.values_changed = true;
        engine.frame(FrameMode::SingleShot);
        drop(engine);

        self.trigger_on_change();
    }

    // ---- background ----

    fn repaint_background(&mut self) {
        let bounds = self.view.canvas_bounds();
        let style = self.config.grid_style();
        let document = self.document_size();
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        let grid = layers.get_mut(LayerKind::Grid);
        paint_grid(grid, bounds, &style);
        if let Some(image) = &self.config.img_src {
            paint_background_image(grid, image, document);
        }
    }

    /// Replace the background image.
    pub fn set_background_image(&mut self, image: Option<ImageSource>) {
        self.config.img_src = image;
        self.repaint_background();
    }

    // ---- runtime settings ----

    pub fn set_brush_color(&mut self, color: BrushColor) {
        self.config.brush_color = color;
        self.values_changed = true;
    }

    pub fn set_brush_radius(&mut self, radius: f64) {
        self.config.brush_radius = radius;
        self.values_changed = true;
    }

    pub fn set_lazy_radius(&mut self, radius: f64) {
        self.config.lazy_radius = radius;
        self.smoother
            .set_radius(radius * self.config.device_pixel_ratio);
        self.values_changed = true;
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.config.disabled = disabled;
        if disabled {
            self.cancel_stroke();
        }
        self.values_changed = true;
    }

    pub fn set_hide_interface(&mut self, hide: bool) {
        self.config.hide_interface = hide;
        self.values_changed = true;
    }

    // ---- render loop ----

    /// One tick of the interface loop.
    ///
    /// Repaints the interface layer if the pointer moved or a brush setting
    /// changed since the last paint.
    pub fn frame(&mut self, mode: FrameMode) -> FrameRequest {
        if (self.pointer_moved || self.values_changed) && self.layers.is_some() {
            let pointer = self.smoother.pointer();
            let brush = self.smoother.brush();
            self.paint_interface(pointer, brush);
            self.pointer_moved = false;
            self.values_changed = false;
        }

        match mode {
            FrameMode::Continuous => FrameRequest::Reschedule,
            FrameMode::SingleShot => FrameRequest::Done,
        }
    }

    fn paint_interface(&mut self, pointer: Point, brush: Point) {
        let Some(layers) = self.layers.as_mut() else {
            return;
        };
        let surface = layers.get_mut(LayerKind::Interface);
        clear_client(surface);
        if self.config.hide_interface {
            return;
        }
        log::trace!("Interface repaint: pointer {:?}, brush {:?}", pointer, brush);

        let catenary = self.config.catenary_color.to_color();
        if !self.config.disabled {
            surface.fill_circle(brush, self.config.brush_radius, self.config.brush_color.to_color());
        }
        surface.fill_circle(pointer, POINTER_DOT_RADIUS, catenary);
        if self.config.disabled {
            return;
        }

        if self.smoother.is_enabled() {
            let stroke = round_stroke(CONNECTOR_WIDTH).with_dashes(0.0, [2.0, 4.0]);
            self.connector.draw_to_surface(
                &mut *surface,
                brush,
                pointer,
                self.config.chain_length(),
                &stroke,
                catenary,
            );
        }
        surface.fill_circle(brush, BRUSH_DOT_RADIUS, catenary);
    }
}

/// Suppresses view-change repaints for as long as it lives.
struct DeferViewRedraw<'a, S: Surface> {
    engine: &'a mut DrawEngine<S>,
}

impl<'a, S: Surface> DeferViewRedraw<'a, S> {
    fn new(engine: &'a mut DrawEngine<S>) -> Self {
        engine.defer_view_redraw = true;
        Self { engine }
    }
}

impl<S: Surface> Deref for DeferViewRedraw<'_, S> {
    type Target = DrawEngine<S>;

    fn deref(&self) -> &DrawEngine<S> {
        self.engine
    }
}

impl<S: Surface> DerefMut for DeferViewRedraw<'_, S> {
    fn deref_mut(&mut self) -> &mut DrawEngine<S> {
        self.engine
    }
}

impl<S: Surface> Drop for DeferViewRedraw<'_, S> {
    fn drop(&mut self) {
        self.engine.defer_view_redraw = false;
    }
}

/// Validate a save string without touching any engine state.
///
/// A missing or non-positive `width`/`height` is taken to mean the drawing
/// was saved at `live_size`. Every line's `brushRadius` must be a positive
/// number.
pub fn parse_save_data(data: &str, live_size: Size) -> EngineResult<SaveDocument> {
    if data.trim().is_empty() {
        return Err(EngineError::InvalidSaveData("empty string".to_string()));
    }

    let value: serde_json::Value =
        serde_json::from_str(data).map_err(|e| EngineError::InvalidSaveData(e.to_string()))?;
    let object = value
        .as_object()
        .ok_or_else(|| EngineError::InvalidSaveData("expected a JSON object".to_string()))?;
    let raw_lines = object
        .get("lines")
        .and_then(|l| l.as_array())
        .ok_or(EngineError::MissingLines)?;

    let lines = raw_lines
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let line = serde_json::from_value::<Line>(raw.clone()).map_err(|e| EngineError::MalformedLine {
                index,
                reason: e.to_string(),
            })?;
            if !(line.brush_radius.is_finite() && line.brush_radius > 0.0) {
                return Err(EngineError::MalformedLine {
                    index,
                    reason: format!("brushRadius must be positive, got {}", line.brush_radius),
                });
            }
            Ok(line)
        })
        .collect::<EngineResult<Vec<Line>>>()?;

    let dimension = |key: &str, fallback: f64| {
        object
            .get(key)
            .and_then(|v| v.as_f64())
            .filter(|v| is_valid_dimension(*v))
            .unwrap_or(fallback)
    };

    Ok(SaveDocument {
        lines,
        width: dimension("width", live_size.width),
        height: dimension("height", live_size.height),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::DrawCommand;
    use std::cell::RefCell;

    fn engine() -> DrawEngine {
        let mut engine = DrawEngine::new(EngineConfig {
            lazy_radius: 0.0,
            ..EngineConfig::default()
        })
        .unwrap();
        engine.attach(LayerStack::recording(Size::new(400.0, 400.0)));
        engine
    }

    fn draw(engine: &mut DrawEngine, points: &[(f64, f64)]) {
        let mut iter = points.iter();
        if let Some(&(x, y)) = iter.next() {
            engine.handle_draw_start(Point::new(x, y));
        }
        for &(x, y) in iter {
            engine.handle_draw_move(Point::new(x, y));
        }
        engine.handle_draw_end();
    }

    fn layer(engine: &DrawEngine, kind: LayerKind) -> &RecordingSurface {
        engine.layers().unwrap().get(kind)
    }

    #[test]
    fn test_draw_commits_line() {
        let mut e = engine();
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0), (20.0, 5.0)]);

        assert_eq!(e.lines().len(), 1);
        assert_eq!(e.lines()[0].points.len(), 3);
        assert_eq!(e.lines()[0].brush_color.as_str(), "#444");
        assert_eq!(layer(&e, LayerKind::Drawing).stroke_count(), 1);
        assert!(layer(&e, LayerKind::Temp).is_blank());
    }

    #[test]
    fn test_tap_commits_nothing() {
        let mut e = engine();
        draw(&mut e, &[(5.0, 5.0)]);
        assert!(e.lines().is_empty());
        assert!(layer(&e, LayerKind::Temp).is_blank());
    }

    #[test]
    fn test_lazy_radius_lags_points() {
        let mut e = DrawEngine::<RecordingSurface>::new(EngineConfig::default()).unwrap();
        e.attach(LayerStack::recording(Size::new(400.0, 400.0)));
        draw(&mut e, &[(100.0, 100.0), (105.0, 100.0), (130.0, 100.0)]);

        let line = &e.lines()[0];
        assert_eq!(line.points.len(), 2);
        assert!((line.points[1].x - 118.0).abs() < 1e-9);
    }

    #[test]
    fn test_commit_with_overrides() {
        let mut e = engine();
        e.begin_stroke();
        e.append_point(Point::new(0.0, 0.0));
        e.append_point(Point::new(10.0, 0.0));
        assert!(e.commit_stroke(Some(BrushColor::new("#f00")), Some(3.0)));

        assert_eq!(e.lines()[0].brush_color.as_str(), "#f00");
        assert!((e.lines()[0].brush_radius - 3.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_change_listener_sees_new_state() {
        let mut e = engine();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        e.set_on_change(move |engine| log.borrow_mut().push(engine.lines().len()));

        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);
        draw(&mut e, &[(0.0, 10.0), (10.0, 10.0)]);
        e.undo();
        e.erase_all();

        assert_eq!(*seen.borrow(), vec![1, 2, 1, 0]);
    }

    #[test]
    fn test_undo_repaints_drawing() {
        let mut e = engine();
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);
        draw(&mut e, &[(0.0, 10.0), (10.0, 10.0)]);
        e.undo();

        assert_eq!(e.lines().len(), 1);
        assert_eq!(layer(&e, LayerKind::Drawing).stroke_count(), 1);
    }

    #[test]
    fn test_new_stroke_invalidates_redo() {
        let mut e = engine();
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);
        e.undo();
        assert!(e.can_redo());

        draw(&mut e, &[(0.0, 10.0), (10.0, 10.0)]);
        assert!(!e.can_redo());
    }

    #[test]
    fn test_erase_keeps_view_clear_resets_it() {
        let mut e = engine();
        e.set_view(ViewState { scale: 2.0, x: 10.0, y: 0.0 });
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);

        e.erase_all();
        assert!((e.view().scale() - 2.0).abs() < f64::EPSILON);
        assert!(layer(&e, LayerKind::Drawing).is_blank());

        e.clear();
        assert!((e.view().scale() - 1.0).abs() < f64::EPSILON);
        assert!(e.history().erased_groups().is_empty());
    }

    #[test]
    fn test_view_change_reinstalls_transform_and_replays() {
        let mut e = engine();
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);
        e.set_view(ViewState { scale: 2.0, x: 5.0, y: 5.0 });

        let expected = e.view().transform_matrix();
        for (_, surface) in e.layers().unwrap().iter() {
            assert_eq!(surface.transform(), expected);
        }
        let drawing = layer(&e, LayerKind::Drawing);
        assert_eq!(drawing.stroke_count(), 1);
        assert_eq!(drawing.commands()[0].transform(), expected);
        assert_eq!(e.lines().len(), 1);
    }

    #[test]
    fn test_timed_load_animates_and_cancel_wins() {
        let mut e = engine();
        let data = r##"{"lines":[{"points":[{"x":0,"y":0},{"x":5,"y":0},{"x":10,"y":0}],"brushColor":"#123","brushRadius":2}],"width":400,"height":400}"##;
        e.load_save_data(data, Some(false)).unwrap();
        assert!(e.lines().is_empty());
        assert_eq!(e.pending_replay(), 3);

        assert_eq!(e.advance(Duration::from_millis(5)), 1);
        assert_eq!(layer(&e, LayerKind::Temp).stroke_count(), 1);

        e.clear();
        assert_eq!(e.advance(Duration::from_secs(1)), 0);
        assert!(e.lines().is_empty());
        assert!(layer(&e, LayerKind::Drawing).is_blank());
    }

    #[test]
    fn test_timed_load_completes() {
        let mut e = engine();
        let doc = SaveDocument::new(
            vec![Line::new(vec![Point::ZERO, Point::new(1.0, 1.0)], BrushColor::default(), 1.0)],
            Size::new(400.0, 400.0),
        );
        e.load(doc.clone(), false);
        e.advance(Duration::from_millis(100));
        assert_eq!(e.serialize(), doc);
    }

    #[test]
    fn test_resize_flushes_pending_replay() {
        let mut e = engine();
        let doc = SaveDocument::new(
            vec![Line::new(vec![Point::ZERO, Point::new(1.0, 1.0)], BrushColor::default(), 1.0)],
            Size::new(400.0, 400.0),
        );
        e.load(doc, false);
        e.resize(Size::new(300.0, 200.0));

        assert_eq!(e.pending_replay(), 0);
        assert_eq!(e.lines().len(), 1);
        assert_eq!(e.lines()[0].points[1], Point::new(1.0, 1.0));
    }

    #[test]
    fn test_resize_keeps_history_and_unblocks_view() {
        let mut e = engine();
        draw(&mut e, &[(0.0, 0.0), (10.0, 0.0)]);
        e.erase_all();
        draw(&mut e, &[(0.0, 10.0), (10.0, 10.0)]);

        e.resize(Size::new(600.0, 300.0));
        assert_eq!(e.history().erased_groups().len(), 1);
        assert_eq!(e.layers().unwrap().size(), Size::new(600.0, 300.0));
        assert_eq!(e.surface_size(), Size::new(600.0, 300.0));
        assert_eq!(e.serialize().size(), Size::new(400.0, 400.0));

        // View changes repaint again once the resize is done.
        e.set_view(ViewState { scale: 1.5, x: 0.0, y: 0.0 });
        assert_eq!(layer(&e, LayerKind::Drawing).stroke_count(), 1);
        assert!(!layer(&e, LayerKind::Grid).is_blank());
    }

    #[test]
    fn test_frame_gating() {
        let mut e = engine();
        assert_eq!(e.frame(FrameMode::Continuous), FrameRequest::Reschedule);
        let painted = layer(&e, LayerKind::Interface).commands().len();
        assert!(painted > 0);

        e.handle_draw_move(Point::new(50.0, 50.0));
        assert_eq!(e.frame(FrameMode::SingleShot), FrameRequest::Done);
        let fills = layer(&e, LayerKind::Interface)
            .commands()
            .iter()
            .filter(|c| matches!(c, DrawCommand::FillCircle { .. }))
            .count();
        assert_eq!(fills, 3);
    }

    #[test]
    fn test_hide_interface() {
        let mut e = engine();
        e.set_hide_interface(true);
        e.frame(FrameMode::SingleShot);
        assert!(layer(&e, LayerKind::Interface).is_blank());
    }

    #[test]
    fn test_not_ready_still_records_history() {
        let mut e = DrawEngine::<RecordingSurface>::new(EngineConfig::default()).unwrap();
        e.begin_stroke();
        e.append_point(Point::ZERO);
        e.append_point(Point::new(3.0, 4.0));
        e.preview_stroke();
        assert!(e.commit_stroke(None, None));
        assert_eq!(e.frame(FrameMode::Continuous), FrameRequest::Reschedule);

        e.attach(LayerStack::recording(Size::new(10.0, 10.0)));
        assert_eq!(e.layers().unwrap().size(), Size::new(400.0, 400.0));
        assert_eq!(layer(&e, LayerKind::Drawing).stroke_count(), 1);
    }

    #[test]
    fn test_clamp_lines_to_document() {
        let mut e = DrawEngine::<RecordingSurface>::new(EngineConfig {
            lazy_radius: 0.0,
            clamp_lines_to_document: true,
            canvas_width: 100.0,
            canvas_height: 100.0,
            ..EngineConfig::default()
        })
        .unwrap();
        draw(&mut e, &[(-20.0, 50.0), (150.0, 120.0)]);
        assert_eq!(e.lines()[0].points, vec![Point::new(0.0, 50.0), Point::new(100.0, 100.0)]);
    }

    #[test]
    fn test_save_data_in_config_loads_immediately() {
        let config = EngineConfig {
            immediate_loading: true,
            save_data: Some(r##"{"lines":[{"points":[{"x":0,"y":0},{"x":1,"y":1}],"brushColor":"#000","brushRadius":1}],"width":400,"height":400}"##.to_string()),
            ..EngineConfig::default()
        };
        let e = DrawEngine::<RecordingSurface>::new(config).unwrap();
        assert_eq!(e.lines().len(), 1);
    }

    #[test]
    fn test_parse_rejects_bad_line() {
        let err = parse_save_data(r#"{"lines":[{"points":"nope"}]}"#, Size::new(1.0, 1.0)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedLine { index: 0, .. }));
    }

    #[test]
    fn test_parse_rejects_non_positive_radius() {
        for radius in ["0", "-3"] {
            let data = format!(
                r##"{{"lines":[{{"points":[{{"x":0,"y":0}},{{"x":1,"y":1}}],"brushColor":"#000","brushRadius":{radius}}}]}}"##
            );
            let err = parse_save_data(&data, Size::new(400.0, 400.0)).unwrap_err();
            assert!(matches!(err, EngineError::MalformedLine { index: 0, .. }));
        }
    }

    fn short_lines() -> Vec<Line> {
        vec![
            Line::new(vec![Point::new(5.0, 5.0)], BrushColor::default(), 2.0),
            Line::new(Vec::new(), BrushColor::default(), 3.0),
            Line::new(vec![Point::ZERO, Point::new(8.0, 8.0)], BrushColor::new("#0f0"), 2.0),
        ]
    }

    #[test]
    fn test_immediate_load_skips_short_lines() {
        let mut e = engine();
        e.load(SaveDocument::new(short_lines(), Size::new(400.0, 400.0)), true);

        assert_eq!(e.lines().len(), 1);
        assert_eq!(e.lines()[0].brush_color.as_str(), "#0f0");
        assert_eq!(layer(&e, LayerKind::Drawing).stroke_count(), 1);
    }

    #[test]
    fn test_timed_load_skips_short_lines() {
        let mut e = engine();
        e.load(SaveDocument::new(short_lines(), Size::new(400.0, 400.0)), false);
        assert_eq!(e.pending_replay(), 2);

        e.advance(Duration::from_secs(1));
        assert_eq!(e.lines().len(), 1);
        assert!(e.lines().iter().all(Line::is_drawable));
    }

    #[test]
    fn test_timed_commit_skips_short_line() {
        let mut e = engine();
        e.replay.schedule_lines(short_lines(), Duration::from_millis(5));
        e.advance(Duration::from_secs(1));

        assert_eq!(e.lines().len(), 1);
        assert_eq!(e.lines()[0].len(), 2);
    }

    #[test]
    fn test_load_with_zero_size_keeps_coordinates() {
        let mut e = engine();
        let line = Line::new(vec![Point::new(3.0, 4.0), Point::new(9.0, 1.0)], BrushColor::default(), 2.0);
        e.load(
            SaveDocument {
                lines: vec![line.clone()],
                width: 0.0,
                height: 400.0,
            },
            true,
        );
        assert_eq!(e.lines(), std::slice::from_ref(&line));

        let data = e.get_save_data().unwrap();
        let mut other = engine();
        other.load_save_data(&data, Some(true)).unwrap();
        assert_eq!(other.lines(), std::slice::from_ref(&line));
    }

    #[test]
    fn test_parse_missing_dimensions_means_live_size() {
        let doc = parse_save_data(r#"{"lines":[]}"#, Size::new(320.0, 240.0)).unwrap();
        assert_eq!(doc.size(), Size::new(320.0, 240.0));
    }

    #[test]
    fn test_background_image_painted() {
        let mut e = engine();
        e.set_background_image(Some(ImageSource {
            src: "paper.png".to_string(),
            width: 800.0,
            height: 400.0,
        }));
        assert!(
            layer(&e, LayerKind::Grid)
                .commands()
                .iter()
                .any(|c| matches!(c, DrawCommand::DrawImage { .. }))
        );
    }
}
