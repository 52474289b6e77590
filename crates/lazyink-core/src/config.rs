//! Engine configuration.
//!
//! Keys are camelCase so a host can hand its widget props object straight
//! to [`EngineConfig::from_json`].

use crate::color::BrushColor;
use crate::grid::GridStyle;
use crate::surface::ImageSource;
use crate::view::ScaleExtents;
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`crate::DrawEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub canvas_width: f64,
    pub canvas_height: f64,
    pub brush_color: BrushColor,
    pub brush_radius: f64,
    pub lazy_radius: f64,
    pub catenary_color: BrushColor,
    pub background_color: BrushColor,
    pub grid_color: BrushColor,
    pub grid_size_x: f64,
    pub grid_size_y: f64,
    pub grid_line_width: f64,
    pub hide_grid: bool,
    pub hide_grid_x: bool,
    pub hide_grid_y: bool,
    pub hide_interface: bool,
    pub disabled: bool,
    /// Milliseconds between replayed points.
    pub load_time_offset: u64,
    pub immediate_loading: bool,
    pub enable_pan_and_zoom: bool,
    pub mouse_zoom_factor: f64,
    pub zoom_extents: ScaleExtents,
    pub clamp_lines_to_document: bool,
    pub img_src: Option<ImageSource>,
    /// Save string loaded at construction.
    pub save_data: Option<String>,
    pub device_pixel_ratio: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            canvas_width: 400.0,
            canvas_height: 400.0,
            brush_color: BrushColor::new("#444"),
            brush_radius: 10.0,
            lazy_radius: 12.0,
            catenary_color: BrushColor::new("#0a0302"),
            background_color: BrushColor::new("#FFF"),
            grid_color: BrushColor::new("rgba(150,150,150,0.17)"),
            grid_size_x: 25.0,
            grid_size_y: 25.0,
            grid_line_width: 0.5,
            hide_grid: false,
            hide_grid_x: false,
            hide_grid_y: false,
            hide_interface: false,
            disabled: false,
            load_time_offset: 5,
            immediate_loading: false,
            enable_pan_and_zoom: false,
            mouse_zoom_factor: 0.01,
            zoom_extents: ScaleExtents::default(),
            clamp_lines_to_document: false,
            img_src: None,
            save_data: None,
            device_pixel_ratio: 1.0,
        }
    }
}

impl EngineConfig {
    /// Parse a props object. Missing keys take their defaults.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }

    /// Delay between replayed points.
    pub fn load_time_offset(&self) -> Duration {
        Duration::from_millis(self.load_time_offset)
    }

    /// Chain length of the pointer connector.
    pub fn chain_length(&self) -> f64 {
        self.lazy_radius * self.device_pixel_ratio
    }

    pub fn grid_style(&self) -> GridStyle {
        GridStyle {
            background: self.background_color.clone(),
            color: self.grid_color.clone(),
            size_x: self.grid_size_x,
            size_y: self.grid_size_y,
            line_width: self.grid_line_width,
            hide: self.hide_grid,
            hide_x: self.hide_grid_x,
            hide_y: self.hide_grid_y,
        }
    }
}
