//! Drawing surface abstraction.
//!
//! A [`Surface`] behaves like a 2D canvas context: it has a pixel size, an
//! installed document transform, and paint operations expressed in the
//! coordinates of that transform. [`RecordingSurface`] is the implementation
//! shipped with the crate; it keeps a display list that a host replays into
//! whatever real canvas it owns.

use kurbo::{Affine, BezPath, Cap, Circle, Join, Point, Rect, Size, Stroke};
use peniko::Color;
use serde::{Deserialize, Serialize};
use std::ops::{Deref, DerefMut};

/// An image referenced by the host (for example the background `imgSrc`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Host-defined locator (URL, path, asset key).
    pub src: String,
    /// Intrinsic width in pixels.
    pub width: f64,
    /// Intrinsic height in pixels.
    pub height: f64,
}

/// Stroke style used for all freehand paths: round caps and joins.
pub fn round_stroke(width: f64) -> Stroke {
    Stroke::new(width).with_caps(Cap::Round).with_join(Join::Round)
}

/// A paintable, resizable, transformable surface.
pub trait Surface {
    /// Raw pixel size.
    fn size(&self) -> Size;

    /// Change the pixel size. Discards the contents and resets the transform.
    fn resize(&mut self, size: Size);

    /// Currently installed transform.
    fn transform(&self) -> Affine;

    /// Install a new transform for subsequent paints.
    fn set_transform(&mut self, transform: Affine);

    /// Clear the rectangle `(0, 0, width, height)` under the installed
    /// transform. Use [`clear_client`] to clear the whole raw surface.
    fn clear(&mut self);

    /// Stroke a path.
    fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color);

    /// Fill a circle.
    fn fill_circle(&mut self, center: Point, radius: f64, color: Color);

    /// Fill a rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color);

    /// Draw the `src` region of an image (in image pixels) into `dest`.
    fn draw_image(&mut self, image: &ImageSource, src: Rect, dest: Rect);

    /// Blit `source` onto this surface at the origin, under the installed
    /// transform.
    fn composite(&mut self, source: &Self)
    where
        Self: Sized;
}

/// Restores a surface's transform when dropped.
///
/// Installs the identity transform on construction. The saved transform is
/// put back on every exit path, including unwinding.
pub struct IdentityScope<'a, S: Surface + ?Sized> {
    surface: &'a mut S,
    saved: Affine,
}

impl<'a, S: Surface + ?Sized> IdentityScope<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        let saved = surface.transform();
        surface.set_transform(Affine::IDENTITY);
        Self { surface, saved }
    }
}

impl<S: Surface + ?Sized> Deref for IdentityScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: Surface + ?Sized> DerefMut for IdentityScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: Surface + ?Sized> Drop for IdentityScope<'_, S> {
    fn drop(&mut self) {
        self.surface.set_transform(self.saved);
    }
}

/// Run `f` with the identity transform installed on `surface`.
pub fn with_identity<S: Surface + ?Sized, R>(surface: &mut S, f: impl FnOnce(&mut S) -> R) -> R {
    let mut scope = IdentityScope::new(surface);
    f(&mut *scope)
}

/// Clear the full raw pixel rectangle regardless of the installed transform.
pub fn clear_client<S: Surface + ?Sized>(surface: &mut S) {
    with_identity(surface, |s| s.clear());
}

/// One recorded paint operation.
///
/// Every command carries the transform that was installed when it was
/// issued, so the list can be replayed in raw pixel space.
#[derive(Debug, Clone)]
pub enum DrawCommand {
    /// Clear a rectangle that did not cover the whole surface.
    Clear { rect: Rect, transform: Affine },
    StrokePath {
        path: BezPath,
        stroke: Stroke,
        color: Color,
        transform: Affine,
    },
    FillCircle {
        circle: Circle,
        color: Color,
        transform: Affine,
    },
    FillRect {
        rect: Rect,
        color: Color,
        transform: Affine,
    },
    DrawImage {
        image: ImageSource,
        src: Rect,
        dest: Rect,
        transform: Affine,
    },
}

impl DrawCommand {
    /// Transform the command was recorded under.
    pub fn transform(&self) -> Affine {
        match self {
            DrawCommand::Clear { transform, .. }
            | DrawCommand::StrokePath { transform, .. }
            | DrawCommand::FillCircle { transform, .. }
            | DrawCommand::FillRect { transform, .. }
            | DrawCommand::DrawImage { transform, .. } => *transform,
        }
    }

    fn pre_transformed(&self, outer: Affine) -> Self {
        let mut cmd = self.clone();
        match &mut cmd {
            DrawCommand::Clear { transform, .. }
            | DrawCommand::StrokePath { transform, .. }
            | DrawCommand::FillCircle { transform, .. }
            | DrawCommand::FillRect { transform, .. }
            | DrawCommand::DrawImage { transform, .. } => *transform = outer * *transform,
        }
        cmd
    }
}

/// A surface that records a display list instead of rasterizing.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    size: Size,
    transform: Affine,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            transform: Affine::IDENTITY,
            commands: Vec::new(),
        }
    }

    /// Recorded commands, oldest first.
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// True if nothing has been painted since the last full clear.
    pub fn is_blank(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of recorded path strokes.
    pub fn stroke_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::StrokePath { .. }))
            .count()
    }

    fn covers_surface(&self) -> bool {
        let [_, b, c, _, _, _] = self.transform.as_coeffs();
        if b != 0.0 || c != 0.0 {
            return false;
        }
        let full = self.size.to_rect();
        let cleared = self.transform.transform_rect_bbox(full);
        cleared.x0 <= full.x0
            && cleared.y0 <= full.y0
            && cleared.x1 >= full.x1
            && cleared.y1 >= full.y1
    }
}

impl Default for RecordingSurface {
    fn default() -> Self {
        Self::new(Size::ZERO)
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> Size {
        self.size
    }

    fn resize(&mut self, size: Size) {
        self.size = size;
        self.transform = Affine::IDENTITY;
        self.commands.clear();
    }

    fn transform(&self) -> Affine {
        self.transform
    }

    fn set_transform(&mut self, transform: Affine) {
        self.transform = transform;
    }

    fn clear(&mut self) {
        if self.covers_surface() {
            self.commands.clear();
        } else {
            self.commands.push(DrawCommand::Clear {
                rect: self.size.to_rect(),
                transform: self.transform,
            });
        }
    }

    fn stroke_path(&mut self, path: &BezPath, stroke: &Stroke, color: Color) {
        self.commands.push(DrawCommand::StrokePath {
            path: path.clone(),
            stroke: stroke.clone(),
            color,
            transform: self.transform,
        });
    }

    fn fill_circle(&mut self, center: Point, radius: f64, color: Color) {
        self.commands.push(DrawCommand::FillCircle {
            circle: Circle::new(center, radius),
            color,
            transform: self.transform,
        });
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect {
            rect,
            color,
            transform: self.transform,
        });
    }

    fn draw_image(&mut self, image: &ImageSource, src: Rect, dest: Rect) {
        self.commands.push(DrawCommand::DrawImage {
            image: image.clone(),
            src,
            dest,
            transform: self.transform,
        });
    }

    fn composite(&mut self, source: &Self) {
        let outer = self.transform;
        self.commands
            .extend(source.commands.iter().map(|cmd| cmd.pre_transformed(outer)));
    }
}
