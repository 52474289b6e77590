//! Pan/zoom view transform.
//!
//! Owns the document-to-client affine transform, its scale bounds and the
//! document size, and notifies registered listeners whenever the transform
//! changes.

use kurbo::{Affine, Point, Size, Vec2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A view expressed as uniform scale plus translation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub scale: f64,
    pub x: f64,
    pub y: f64,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            x: 0.0,
            y: 0.0,
        }
    }
}

/// Allowed zoom range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleExtents {
    pub min: f64,
    pub max: f64,
}

impl Default for ScaleExtents {
    fn default() -> Self {
        Self { min: 0.33, max: 3.0 }
    }
}

impl ScaleExtents {
    pub fn clamp(&self, scale: f64) -> f64 {
        scale.clamp(self.min.min(self.max), self.max.max(self.min))
    }
}

/// Visible region of the document, in document space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CanvasBounds {
    pub view_min: Point,
    pub view_max: Point,
}

/// Identifies a registered view-change listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(usize);

type ViewListener = Box<dyn FnMut()>;

/// The affine view collaborator.
pub struct ViewTransform {
    offset: Vec2,
    scale: f64,
    extents: ScaleExtents,
    document_size: Size,
    listeners: Vec<(ListenerId, ViewListener)>,
    next_listener: usize,
}

impl fmt::Debug for ViewTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViewTransform")
            .field("offset", &self.offset)
            .field("scale", &self.scale)
            .field("extents", &self.extents)
            .field("document_size", &self.document_size)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ViewTransform {
    pub fn new(document_size: Size, extents: ScaleExtents) -> Self {
        Self {
            offset: Vec2::ZERO,
            scale: 1.0,
            extents,
            document_size,
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    /// Document-to-client transform.
    pub fn transform_matrix(&self) -> Affine {
        Affine::translate(self.offset) * Affine::scale(self.scale)
    }

    /// Client-to-document transform.
    pub fn inverse_matrix(&self) -> Affine {
        Affine::scale(1.0 / self.scale) * Affine::translate(-self.offset)
    }

    pub fn view(&self) -> ViewState {
        ViewState {
            scale: self.scale,
            x: self.offset.x,
            y: self.offset.y,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn scale_extents(&self) -> ScaleExtents {
        self.extents
    }

    /// Change the zoom range. The current scale is re-clamped.
    pub fn set_scale_extents(&mut self, extents: ScaleExtents) {
        self.extents = extents;
        let clamped = extents.clamp(self.scale);
        if clamped != self.scale {
            self.scale = clamped;
            self.notify();
        }
    }

    pub fn document_size(&self) -> Size {
        self.document_size
    }

    /// Change the document size. Notifies listeners, since the visible
    /// bounds change with it.
    pub fn set_document_size(&mut self, size: Size) {
        self.document_size = size;
        self.notify();
    }

    /// Visible document region, assuming the client area matches the
    /// document's pixel size.
    pub fn canvas_bounds(&self) -> CanvasBounds {
        let inverse = self.inverse_matrix();
        CanvasBounds {
            view_min: inverse * Point::ZERO,
            view_max: inverse * Point::new(self.document_size.width, self.document_size.height),
        }
    }

    /// Install a view, clamping the scale to the extents.
    pub fn set_view(&mut self, view: ViewState) {
        self.scale = self.extents.clamp(view.scale);
        self.offset = Vec2::new(view.x, view.y);
        self.notify();
    }

    /// Back to identity.
    pub fn reset_view(&mut self) {
        self.set_view(ViewState::default());
    }

    /// Pan by a client-space delta.
    pub fn pan(&mut self, delta: Vec2) {
        self.offset += delta;
        self.notify();
    }

    /// Zoom by `factor`, keeping `client_point` fixed on screen.
    pub fn zoom_at(&mut self, client_point: Point, factor: f64) {
        self.set_scale_at(client_point, self.scale * factor);
    }

    /// Set an absolute scale, keeping `client_point` fixed on screen.
    pub fn set_scale_at(&mut self, client_point: Point, scale: f64) {
        let new_scale = self.extents.clamp(scale);
        if (new_scale - self.scale).abs() < f64::EPSILON {
            return;
        }

        let anchor = self.client_to_document(client_point);
        self.scale = new_scale;
        let moved = self.document_to_client(anchor);
        self.offset += client_point - moved;
        self.notify();
    }

    pub fn client_to_document(&self, client_point: Point) -> Point {
        self.inverse_matrix() * client_point
    }

    pub fn document_to_client(&self, document_point: Point) -> Point {
        self.transform_matrix() * document_point
    }

    /// Register a callback run after every view change.
    pub fn attach_view_change_listener(&mut self, listener: impl FnMut() + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn detach_view_change_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(lid, _)| *lid != id);
        self.listeners.len() != before
    }

    fn notify(&mut self) {
        for (_, listener) in &mut self.listeners {
            listener();
        }
    }
}
