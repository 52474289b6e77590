//! The sagging connector drawn between pointer and brush.
//!
//! Purely visual feedback; nothing here feeds back into stroke geometry.

use crate::surface::Surface;
use kurbo::{BezPath, Point, Stroke};
use peniko::Color;

/// Renders a connector between two points.
pub trait ConnectorCurve {
    /// Path of a chain of `chain_length` hanging between `from` and `to`.
    fn curve_path(&self, from: Point, to: Point, chain_length: f64) -> BezPath;

    /// Stroke the connector onto `surface`.
    fn draw_to_surface(
        &self,
        surface: &mut dyn Surface,
        from: Point,
        to: Point,
        chain_length: f64,
        stroke: &Stroke,
        color: Color,
    ) {
        let path = self.curve_path(from, to, chain_length);
        surface.stroke_path(&path, stroke, color);
    }
}

/// Default [`ConnectorCurve`]: a true catenary, y axis pointing down.
#[derive(Debug, Clone)]
pub struct Catenary {
    segments: usize,
    iteration_limit: usize,
}

impl Default for Catenary {
    fn default() -> Self {
        Self {
            segments: 50,
            iteration_limit: 100,
        }
    }
}

impl Catenary {
    pub fn new(segments: usize, iteration_limit: usize) -> Self {
        Self {
            segments: segments.max(1),
            iteration_limit,
        }
    }

    /// Solve `sinh(xi) = ratio * xi` for the positive root.
    fn solve_xi(&self, ratio: f64) -> f64 {
        let mut xi = if ratio < 3.0 {
            (6.0 * (ratio - 1.0)).sqrt()
        } else {
            let l = (2.0 * ratio).ln();
            l + l.ln()
        };

        for _ in 0..self.iteration_limit {
            let f = xi.sinh() - ratio * xi;
            let df = xi.cosh() - ratio;
            if df.abs() < f64::EPSILON {
                break;
            }
            let next = xi - f / df;
            if (next - xi).abs() < 1e-10 {
                return next;
            }
            xi = next;
        }
        xi
    }
}

fn straight(from: Point, to: Point) -> BezPath {
    let mut path = BezPath::new();
    path.move_to(from);
    path.line_to(to);
    path
}

impl ConnectorCurve for Catenary {
    fn curve_path(&self, from: Point, to: Point, chain_length: f64) -> BezPath {
        if from.distance(to) >= chain_length {
            return straight(from, to);
        }

        let (left, right) = if from.x <= to.x { (from, to) } else { (to, from) };
        let h = right.x - left.x;
        if h < 1e-6 {
            return straight(from, to);
        }

        // Work with y pointing up so the chain sags towards negative y.
        let (y1, y2) = (-left.y, -right.y);
        let v = y2 - y1;
        let ratio = (chain_length * chain_length - v * v).sqrt() / h;
        if !ratio.is_finite() || ratio <= 1.0 {
            return straight(from, to);
        }

        let xi = self.solve_xi(ratio);
        if !xi.is_finite() || xi <= 0.0 {
            return straight(from, to);
        }
        let a = h / (2.0 * xi);
        let x0 = (left.x + right.x) / 2.0 - a * (v / chain_length).atanh();
        let c = y1 - a * ((left.x - x0) / a).cosh();

        let mut path = BezPath::new();
        path.move_to(left);
        for i in 1..self.segments {
            let x = left.x + h * (i as f64) / (self.segments as f64);
            let y = a * ((x - x0) / a).cosh() + c;
            path.line_to(Point::new(x, -y));
        }
        path.line_to(right);
        path
    }
}
