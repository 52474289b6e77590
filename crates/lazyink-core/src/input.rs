//! Input routing: decides whether a gesture draws, pans or zooms.
//!
//! [`transition`] consumes one [`InputEvent`] in the current [`InputMode`],
//! calls into the engine, and returns the successor mode. All event points
//! are in client space; they are converted to document space through the
//! engine's view before reaching the stroke pipeline.

use crate::engine::DrawEngine;
use crate::surface::Surface;
use kurbo::Point;

/// Zoom factor applied by [`InputEvent::ZoomIn`] and [`InputEvent::ZoomOut`].
pub const ZOOM_STEP: f64 = 1.25;

/// A raw pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Pointers went down. `pan_modifier` is true when the host's pan key
    /// (or button) is held.
    Start { points: Vec<Point>, pan_modifier: bool },
    /// Pointers moved, pressed or hovering.
    Move { points: Vec<Point> },
    /// All pointers went up.
    End,
    /// Mouse wheel over `point`.
    Wheel { point: Point, delta_y: f64 },
    ZoomIn,
    ZoomOut,
}

/// Current gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum InputMode {
    /// The engine is disabled; pointer events are ignored.
    Disabled,
    /// Waiting for a gesture. Moves only update the pointer.
    #[default]
    Idle,
    /// A stroke is being captured.
    Drawing,
    /// Dragging the view.
    Panning {
        /// Client position of the previous sample.
        last: Point,
    },
    /// Two-pointer zoom.
    Pinching {
        start_distance: f64,
        start_scale: f64,
        /// Client midpoint of the previous sample.
        center: Point,
    },
}

/// Feed one event and return the next mode.
pub fn transition<S: Surface>(mode: InputMode, event: &InputEvent, engine: &mut DrawEngine<S>) -> InputMode {
    if engine.config().disabled {
        if mode == InputMode::Drawing {
            engine.cancel_stroke();
        }
        return InputMode::Disabled;
    }
    let mode = match mode {
        InputMode::Disabled => InputMode::Idle,
        other => other,
    };

    match event {
        InputEvent::Wheel { point, delta_y } => {
            if engine.config().enable_pan_and_zoom {
                let factor = (-delta_y * engine.config().mouse_zoom_factor).exp();
                engine.zoom_at(*point, factor);
            }
            mode
        }
        InputEvent::ZoomIn => {
            zoom_step(engine, ZOOM_STEP);
            mode
        }
        InputEvent::ZoomOut => {
            zoom_step(engine, 1.0 / ZOOM_STEP);
            mode
        }
        InputEvent::Start { points, pan_modifier } => start(mode, points, *pan_modifier, engine),
        InputEvent::Move { points } => move_to(mode, points, engine),
        InputEvent::End => {
            if mode == InputMode::Drawing {
                engine.handle_draw_end();
            }
            InputMode::Idle
        }
    }
}

fn start<S: Surface>(mode: InputMode, points: &[Point], pan_modifier: bool, engine: &mut DrawEngine<S>) -> InputMode {
    let pan_and_zoom = engine.config().enable_pan_and_zoom;

    match points {
        [] => mode,
        [a, b, ..] if pan_and_zoom => {
            if mode == InputMode::Drawing {
                engine.cancel_stroke();
            }
            InputMode::Pinching {
                start_distance: a.distance(*b),
                start_scale: engine.view().scale(),
                center: a.midpoint(*b),
            }
        }
        [first, ..] if pan_modifier && pan_and_zoom => {
            if mode == InputMode::Drawing {
                engine.cancel_stroke();
            }
            InputMode::Panning { last: *first }
        }
        [first, ..] => match mode {
            // A second pointer landing mid-stroke without pinch support is ignored.
            InputMode::Drawing => InputMode::Drawing,
            _ => {
                let document = engine.client_to_document(*first);
                engine.handle_draw_start(document);
                if engine.is_pressing() {
                    InputMode::Drawing
                } else {
                    InputMode::Idle
                }
            }
        },
    }
}

fn move_to<S: Surface>(mode: InputMode, points: &[Point], engine: &mut DrawEngine<S>) -> InputMode {
    let Some(&first) = points.first() else {
        return mode;
    };

    match mode {
        InputMode::Disabled => mode,
        InputMode::Idle | InputMode::Drawing => {
            let document = engine.client_to_document(first);
            engine.handle_draw_move(document);
            mode
        }
        InputMode::Panning { last } => {
            engine.pan(first - last);
            InputMode::Panning { last: first }
        }
        InputMode::Pinching {
            start_distance,
            start_scale,
            center,
        } => {
            let [a, b, ..] = points else {
                return mode;
            };
            let midpoint = a.midpoint(*b);
            engine.pan(midpoint - center);
            if start_distance > 0.0 {
                let scale = start_scale * a.distance(*b) / start_distance;
                engine.set_scale_at(midpoint, scale);
            }
            InputMode::Pinching {
                start_distance,
                start_scale,
                center: midpoint,
            }
        }
    }
}

fn zoom_step<S: Surface>(engine: &mut DrawEngine<S>, factor: f64) {
    if !engine.config().enable_pan_and_zoom {
        return;
    }
    let center = engine.surface_size().to_rect().center();
    engine.zoom_at(center, factor);
}

/// Holds the current [`InputMode`] between events.
#[derive(Debug, Clone, Default)]
pub struct InputRouter {
    mode: InputMode,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Route one event to `engine`.
    pub fn handle<S: Surface>(&mut self, event: &InputEvent, engine: &mut DrawEngine<S>) -> InputMode {
        self.mode = transition(self.mode, event, engine);
        self.mode
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::layers::LayerStack;
    use crate::view::ViewState;
    use kurbo::Size;

    fn engine(pan_and_zoom: bool) -> DrawEngine {
        let mut engine = DrawEngine::new(EngineConfig {
            lazy_radius: 0.0,
            enable_pan_and_zoom: pan_and_zoom,
            ..EngineConfig::default()
        })
        .unwrap();
        engine.attach(LayerStack::recording(Size::new(400.0, 400.0)));
        engine
    }

    fn start(points: &[(f64, f64)]) -> InputEvent {
        InputEvent::Start {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
            pan_modifier: false,
        }
    }

    fn moved(points: &[(f64, f64)]) -> InputEvent {
        InputEvent::Move {
            points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        }
    }

    #[test]
    fn test_single_pointer_draws() {
        let mut e = engine(false);
        let mut router = InputRouter::new();

        assert_eq!(router.handle(&start(&[(10.0, 10.0)]), &mut e), InputMode::Drawing);
        router.handle(&moved(&[(30.0, 10.0)]), &mut e);
        assert_eq!(router.handle(&InputEvent::End, &mut e), InputMode::Idle);
        assert_eq!(e.lines().len(), 1);
    }

    #[test]
    fn test_points_go_through_view() {
        let mut e = engine(true);
        e.set_view(ViewState { scale: 2.0, x: 100.0, y: 0.0 });
        let mut router = InputRouter::new();

        router.handle(&start(&[(100.0, 0.0)]), &mut e);
        router.handle(&moved(&[(120.0, 20.0)]), &mut e);
        router.handle(&InputEvent::End, &mut e);

        assert_eq!(e.lines()[0].points, vec![Point::new(0.0, 0.0), Point::new(10.0, 10.0)]);
    }

    #[test]
    fn test_pan_modifier_pans() {
        let mut e = engine(true);
        let mut mode = transition(
            InputMode::Idle,
            &InputEvent::Start {
                points: vec![Point::new(10.0, 10.0)],
                pan_modifier: true,
            },
            &mut e,
        );
        assert!(matches!(mode, InputMode::Panning { .. }));

        mode = transition(mode, &moved(&[(25.0, 5.0)]), &mut e);
        assert_eq!(mode, InputMode::Panning { last: Point::new(25.0, 5.0) });
        assert!((e.view().view().x - 15.0).abs() < f64::EPSILON);
        assert!((e.view().view().y + 5.0).abs() < f64::EPSILON);
        assert!(e.lines().is_empty());
    }

    #[test]
    fn test_pan_modifier_ignored_without_pan_and_zoom() {
        let mut e = engine(false);
        let mode = transition(
            InputMode::Idle,
            &InputEvent::Start {
                points: vec![Point::new(10.0, 10.0)],
                pan_modifier: true,
            },
            &mut e,
        );
        assert_eq!(mode, InputMode::Drawing);
    }

    #[test]
    fn test_pinch_abandons_stroke_and_zooms() {
        let mut e = engine(true);
        let mut mode = transition(InputMode::Idle, &start(&[(100.0, 100.0)]), &mut e);
        mode = transition(mode, &moved(&[(110.0, 100.0)]), &mut e);
        mode = transition(mode, &start(&[(100.0, 100.0), (200.0, 100.0)]), &mut e);
        assert!(matches!(mode, InputMode::Pinching { .. }));

        mode = transition(mode, &moved(&[(100.0, 100.0), (300.0, 100.0)]), &mut e);
        transition(mode, &InputEvent::End, &mut e);

        assert!((e.view().scale() - 2.0).abs() < 1e-9);
        assert!(e.lines().is_empty());
        assert!(e.pending_points().is_empty());
    }

    #[test]
    fn test_wheel_zoom() {
        let mut e = engine(true);
        transition(
            InputMode::Idle,
            &InputEvent::Wheel {
                point: Point::new(200.0, 200.0),
                delta_y: -50.0,
            },
            &mut e,
        );
        assert!((e.view().scale() - 0.5_f64.exp()).abs() < 1e-9);

        let mut locked = engine(false);
        transition(
            InputMode::Idle,
            &InputEvent::Wheel {
                point: Point::ZERO,
                delta_y: -50.0,
            },
            &mut locked,
        );
        assert!((locked.view().scale() - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zoom_buttons() {
        let mut e = engine(true);
        transition(InputMode::Idle, &InputEvent::ZoomIn, &mut e);
        assert!((e.view().scale() - ZOOM_STEP).abs() < 1e-9);
        transition(InputMode::Idle, &InputEvent::ZoomOut, &mut e);
        assert!((e.view().scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_disabled_ignores_input() {
        let mut e = engine(false);
        let mut mode = transition(InputMode::Idle, &start(&[(10.0, 10.0)]), &mut e);
        e.set_disabled(true);
        mode = transition(mode, &moved(&[(50.0, 10.0)]), &mut e);
        assert_eq!(mode, InputMode::Disabled);
        assert!(e.lines().is_empty());

        e.set_disabled(false);
        mode = transition(mode, &start(&[(10.0, 10.0)]), &mut e);
        assert_eq!(mode, InputMode::Drawing);
    }
}
