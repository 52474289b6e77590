//! LazyInk Core Library
//!
//! A layered freehand drawing engine: lazy-brush stroke capture, smoothed
//! previews, undo/redo/erase history, save/load with animated replay, and
//! pan/zoom view handling. Rendering goes through the [`Surface`] trait so a
//! host can back it with any 2D canvas.

pub mod catenary;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod grid;
pub mod history;
pub mod input;
pub mod layers;
pub mod line;
pub mod replay;
pub mod smoother;
pub mod stroke;
pub mod surface;
pub mod view;

pub use catenary::{Catenary, ConnectorCurve};
pub use color::BrushColor;
pub use config::EngineConfig;
pub use engine::{ChangeListener, DrawEngine, FrameMode, FrameRequest, parse_save_data};
pub use error::{EngineError, EngineResult};
pub use history::History;
pub use input::{InputEvent, InputMode, InputRouter, transition};
pub use layers::{LayerKind, LayerStack};
pub use line::{Line, SaveDocument};
pub use smoother::{LazyBrush, PointerSmoother};
pub use surface::{DrawCommand, ImageSource, RecordingSurface, Surface};
pub use view::{ScaleExtents, ViewState, ViewTransform};
