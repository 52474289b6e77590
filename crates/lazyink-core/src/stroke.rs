//! Stroke capture, smoothed preview and commit.

use crate::color::BrushColor;
use crate::layers::{LayerKind, LayerStack};
use crate::line::{Line, MIN_LINE_POINTS};
use crate::surface::{Surface, clear_client, round_stroke, with_identity};
use kurbo::{BezPath, Point};

/// Build the smoothed path through `points`.
///
/// Each point becomes the control point of a quadratic segment ending at the
/// midpoint to its successor, and the path finishes with a straight segment
/// to the last raw point so the tip never trails the input.
pub fn smoothed_path(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = points.first() else {
        return path;
    };

    path.move_to(first);
    for pair in points.windows(2) {
        let (control, next) = (pair[0], pair[1]);
        path.quad_to(control, control.midpoint(next));
    }
    let last = points[points.len() - 1];
    path.line_to(last);
    path
}

/// Repaint `temp` with the smoothed stroke through `points`.
///
/// Always redraws from scratch, so calling it again with a longer buffer
/// replaces the previous preview.
pub fn preview_stroke<S: Surface + ?Sized>(temp: &mut S, points: &[Point], color: &BrushColor, radius: f64) {
    clear_client(temp);
    if points.is_empty() {
        return;
    }
    temp.stroke_path(&smoothed_path(points), &round_stroke(radius * 2.0), color.to_color());
}

/// Buffer for the stroke being captured.
#[derive(Debug, Clone, Default)]
pub struct StrokePipeline {
    points: Vec<Point>,
    capturing: bool,
}

impl StrokePipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new gesture, dropping anything left in the buffer.
    pub fn begin(&mut self) {
        self.points.clear();
        self.capturing = true;
    }

    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn append_point(&mut self, point: Point) {
        self.capturing = true;
        self.points.push(point);
    }

    /// Points captured so far.
    pub fn points(&self) -> &[Point] {
        &self.points
    }

    /// Paint the buffered points onto the temp layer.
    pub fn preview<S: Surface>(&self, layers: &mut LayerStack<S>, color: &BrushColor, radius: f64) {
        preview_stroke(layers.get_mut(LayerKind::Temp), &self.points, color, radius);
    }

    /// Finish the gesture.
    ///
    /// With fewer than two points nothing is committed and the gesture is
    /// abandoned. Otherwise the temp layer is blitted onto the drawing layer
    /// as painted, the temp layer is cleared, and the new line is returned.
    /// `color` and `radius` must be what was used for the preview.
    pub fn commit<S: Surface>(
        &mut self,
        layers: Option<&mut LayerStack<S>>,
        color: BrushColor,
        radius: f64,
    ) -> Option<Line> {
        self.capturing = false;
        if self.points.len() < MIN_LINE_POINTS {
            if !self.points.is_empty() {
                log::debug!("Discarding single-point stroke");
            }
            self.points.clear();
            if let Some(layers) = layers {
                layers.clear_client(LayerKind::Temp);
            }
            return None;
        }

        let line = Line::new(std::mem::take(&mut self.points), color, radius);

        if let Some(layers) = layers {
            if let Some((drawing, temp)) = layers.pair_mut(LayerKind::Drawing, LayerKind::Temp) {
                with_identity(drawing, |d| d.composite(&*temp));
                clear_client(temp);
            }
        }

        log::debug!("Committed stroke with {} points", line.len());
        Some(line)
    }

    /// Drop the buffer without committing.
    pub fn abandon(&mut self) {
        self.points.clear();
        self.capturing = false;
    }
}
