//! Completed strokes and the save document format.

use crate::color::BrushColor;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Fewest points a stroke needs to become a [`Line`].
pub const MIN_LINE_POINTS: usize = 2;

/// A completed freehand stroke in document space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Line {
    /// Points in capture order.
    pub points: Vec<Point>,
    /// Stroke color.
    pub brush_color: BrushColor,
    /// Half the stroke width.
    pub brush_radius: f64,
}

impl Line {
    pub fn new(points: Vec<Point>, brush_color: BrushColor, brush_radius: f64) -> Self {
        Self {
            points,
            brush_color,
            brush_radius,
        }
    }

    /// Number of points in the stroke.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the stroke has enough points to be committed.
    pub fn is_drawable(&self) -> bool {
        self.points.len() >= MIN_LINE_POINTS
    }

    /// Produce a copy scaled independently along each axis.
    ///
    /// The radius has no axis of its own, so it is scaled by the mean of the
    /// two factors.
    pub fn rescaled(&self, scale_x: f64, scale_y: f64) -> Self {
        let scale_avg = (scale_x + scale_y) / 2.0;
        Self {
            points: self
                .points
                .iter()
                .map(|p| Point::new(p.x * scale_x, p.y * scale_y))
                .collect(),
            brush_color: self.brush_color.clone(),
            brush_radius: self.brush_radius * scale_avg,
        }
    }

    /// Bounding box of the stroke's centre line, inflated by the brush radius.
    pub fn bounds(&self) -> Rect {
        let mut points = self.points.iter();
        let Some(first) = points.next() else {
            return Rect::ZERO;
        };
        points
            .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p))
            .inflate(self.brush_radius, self.brush_radius)
    }
}

/// Serialized drawing: the lines plus the document size they were drawn at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveDocument {
    pub lines: Vec<Line>,
    pub width: f64,
    pub height: f64,
}

impl SaveDocument {
    pub fn new(lines: Vec<Line>, size: Size) -> Self {
        Self {
            lines,
            width: size.width,
            height: size.height,
        }
    }

    /// Document size the lines were authored against.
    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Lines fitted to `target`. Returns the lines unchanged when the sizes
    /// already match, or when either saved dimension is not a positive
    /// number and so cannot be scaled from.
    pub fn lines_for_size(&self, target: Size) -> Vec<Line> {
        if self.width == target.width && self.height == target.height {
            return self.lines.clone();
        }
        if !is_valid_dimension(self.width) || !is_valid_dimension(self.height) {
            log::debug!(
                "Saved size {}x{} is unusable, keeping {} lines at their coordinates",
                self.width,
                self.height,
                self.lines.len()
            );
            return self.lines.clone();
        }

        let scale_x = target.width / self.width;
        let scale_y = target.height / self.height;
        log::debug!(
            "Rescaling {} lines from {}x{} to {}x{} (x{}, y{})",
            self.lines.len(),
            self.width,
            self.height,
            target.width,
            target.height,
            scale_x,
            scale_y
        );
        self.lines
            .iter()
            .map(|line| line.rescaled(scale_x, scale_y))
            .collect()
    }

    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A saved width or height that lines can be scaled from.
pub(crate) fn is_valid_dimension(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(points: &[(f64, f64)], radius: f64) -> Line {
        Line::new(
            points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            BrushColor::new("#444"),
            radius,
        )
    }

    #[test]
    fn test_rescale_uses_mean_for_radius() {
        let l = line(&[(10.0, 10.0), (20.0, 40.0)], 4.0);
        let scaled = l.rescaled(2.0, 1.0);

        assert_eq!(scaled.points, vec![Point::new(20.0, 10.0), Point::new(40.0, 40.0)]);
        assert!((scaled.brush_radius - 6.0).abs() < f64::EPSILON);
        assert_eq!(scaled.brush_color, l.brush_color);
    }

    #[test]
    fn test_lines_for_same_size_are_untouched() {
        let doc = SaveDocument::new(vec![line(&[(1.0, 2.0), (3.0, 4.0)], 3.0)], Size::new(100.0, 100.0));
        assert_eq!(doc.lines_for_size(Size::new(100.0, 100.0)), doc.lines);
    }

    #[test]
    fn test_lines_for_other_size() {
        let doc = SaveDocument::new(vec![line(&[(50.0, 50.0), (100.0, 0.0)], 10.0)], Size::new(100.0, 100.0));
        let lines = doc.lines_for_size(Size::new(200.0, 100.0));

        assert_eq!(lines[0].points, vec![Point::new(100.0, 50.0), Point::new(200.0, 0.0)]);
        assert!((lines[0].brush_radius - 15.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_unusable_saved_size_is_not_scaled() {
        let lines = vec![line(&[(50.0, 50.0), (100.0, 0.0)], 10.0)];
        for size in [
            Size::new(0.0, 100.0),
            Size::new(100.0, -1.0),
            Size::new(f64::NAN, 100.0),
            Size::new(100.0, f64::INFINITY),
        ] {
            let doc = SaveDocument::new(lines.clone(), size);
            assert_eq!(doc.lines_for_size(Size::new(400.0, 400.0)), lines);
        }
    }

    #[test]
    fn test_drawable_needs_two_points() {
        assert!(!line(&[], 1.0).is_drawable());
        assert!(!line(&[(1.0, 1.0)], 1.0).is_drawable());
        assert!(line(&[(1.0, 1.0), (1.0, 1.0)], 1.0).is_drawable());
    }

    #[test]
    fn test_json_field_names() {
        let doc = SaveDocument::new(vec![line(&[(0.0, 0.0), (10.0, 0.0)], 10.0)], Size::new(400.0, 400.0));
        let value: serde_json::Value = serde_json::from_str(&doc.to_json().unwrap()).unwrap();

        assert_eq!(value["width"], 400.0);
        assert_eq!(value["lines"][0]["brushColor"], "#444");
        assert_eq!(value["lines"][0]["brushRadius"], 10.0);
        assert_eq!(value["lines"][0]["points"][1]["x"], 10.0);
    }

    #[test]
    fn test_bounds() {
        let l = line(&[(10.0, 10.0), (30.0, 20.0)], 2.0);
        let b = l.bounds();
        assert!((b.x0 - 8.0).abs() < f64::EPSILON);
        assert!((b.y1 - 22.0).abs() < f64::EPSILON);
    }
}
