//! Pointer smoothing ("lazy brush").
//!
//! The brush trails the pointer on an invisible string of length `radius`:
//! it stays put while the pointer moves inside that radius and is dragged
//! along once the string goes taut.

use kurbo::Point;

/// Decouples the raw pointer position from the drawn brush position.
pub trait PointerSmoother {
    /// Feed a pointer sample. With `both`, the brush jumps to the pointer.
    /// Returns false if the sample was ignored.
    fn update(&mut self, point: Point, both: bool) -> bool;

    /// Latest raw pointer position.
    fn pointer(&self) -> Point;

    /// Current brush position.
    fn brush(&self) -> Point;

    /// Whether the last update moved the brush.
    fn brush_has_moved(&self) -> bool;

    fn is_enabled(&self) -> bool;

    fn set_enabled(&mut self, enabled: bool);

    fn radius(&self) -> f64;

    fn set_radius(&mut self, radius: f64);
}

/// Default [`PointerSmoother`].
#[derive(Debug, Clone)]
pub struct LazyBrush {
    radius: f64,
    enabled: bool,
    pointer: Point,
    brush: Point,
    has_moved: bool,
}

impl LazyBrush {
    pub fn new(radius: f64, enabled: bool, initial_point: Point) -> Self {
        Self {
            radius,
            enabled,
            pointer: initial_point,
            brush: initial_point,
            has_moved: false,
        }
    }

    /// Distance between pointer and brush.
    pub fn distance(&self) -> f64 {
        self.pointer.distance(self.brush)
    }
}

impl PointerSmoother for LazyBrush {
    fn update(&mut self, point: Point, both: bool) -> bool {
        self.has_moved = false;
        if self.pointer == point && !both {
            return false;
        }

        self.pointer = point;

        if both || !self.enabled {
            self.brush = point;
            self.has_moved = true;
            return true;
        }

        let distance = self.distance();
        let slack = distance - self.radius;
        // Round to a tenth so sub-pixel jitter at the rim does not drag the brush.
        if (slack * 10.0).round() / 10.0 > 0.0 {
            let direction = (self.pointer - self.brush) / distance;
            self.brush += direction * slack;
            self.has_moved = true;
        }
        true
    }

    fn pointer(&self) -> Point {
        self.pointer
    }

    fn brush(&self) -> Point {
        self.brush
    }

    fn brush_has_moved(&self) -> bool {
        self.has_moved
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn radius(&self) -> f64 {
        self.radius
    }

    fn set_radius(&mut self, radius: f64) {
        self.radius = radius;
    }
}
