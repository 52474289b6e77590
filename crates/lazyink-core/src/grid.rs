//! Background layer: fill, grid lines and background image.

use crate::color::BrushColor;
use crate::surface::{ImageSource, Surface, clear_client, with_identity};
use crate::view::CanvasBounds;
use kurbo::{BezPath, Point, Rect, Size, Stroke};

/// How the grid layer is painted.
#[derive(Debug, Clone, PartialEq)]
pub struct GridStyle {
    pub background: BrushColor,
    pub color: BrushColor,
    pub size_x: f64,
    pub size_y: f64,
    pub line_width: f64,
    pub hide: bool,
    pub hide_x: bool,
    pub hide_y: bool,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self {
            background: BrushColor::new("#FFF"),
            color: BrushColor::new("rgba(150,150,150,0.17)"),
            size_x: 25.0,
            size_y: 25.0,
            line_width: 0.5,
            hide: false,
            hide_x: false,
            hide_y: false,
        }
    }
}

/// Grid lines covering `bounds`, one grid cell past each edge.
pub fn grid_path(bounds: CanvasBounds, style: &GridStyle) -> BezPath {
    let mut path = BezPath::new();
    let (size_x, size_y) = (style.size_x, style.size_y);

    let min_x = (bounds.view_min.x / size_x - 1.0).floor() * size_x;
    let min_y = (bounds.view_min.y / size_y - 1.0).floor() * size_y;
    let max_x = bounds.view_max.x + size_x;
    let max_y = bounds.view_max.y + size_y;

    if !style.hide_x && size_x > 0.0 {
        let mut x = min_x;
        while x < max_x {
            x += size_x;
            path.move_to(Point::new(x, min_y));
            path.line_to(Point::new(x, max_y));
        }
    }

    if !style.hide_y && size_y > 0.0 {
        let mut y = min_y;
        while y < max_y {
            y += size_y;
            path.move_to(Point::new(min_x, y));
            path.line_to(Point::new(max_x, y));
        }
    }

    path
}

/// Repaint the grid layer. The background fill is in client space; grid
/// lines are in document space under the installed transform.
pub fn paint_grid<S: Surface + ?Sized>(surface: &mut S, bounds: CanvasBounds, style: &GridStyle) {
    clear_client(surface);

    let client = surface.size().to_rect();
    with_identity(surface, |s| s.fill_rect(client, style.background.to_color()));

    if style.hide {
        return;
    }

    let path = grid_path(bounds, style);
    if !path.elements().is_empty() {
        surface.stroke_path(&path, &Stroke::new(style.line_width), style.color.to_color());
    }
}

/// Source crop that makes `image` cover `dest` with its aspect ratio kept,
/// centred.
pub fn cover_source_rect(image: Size, dest: Size) -> Rect {
    if image.width <= 0.0 || image.height <= 0.0 || dest.width <= 0.0 || dest.height <= 0.0 {
        return Rect::ZERO;
    }

    let fit = (dest.width / image.width).min(dest.height / image.height);
    let (mut w, mut h) = (image.width * fit, image.height * fit);
    let mut grow = 1.0;
    if w < dest.width {
        grow = dest.width / w;
    }
    if (grow - 1.0_f64).abs() < 1e-14 && h < dest.height {
        grow = dest.height / h;
    }
    w *= grow;
    h *= grow;

    let crop_w = (image.width / (w / dest.width)).min(image.width);
    let crop_h = (image.height / (h / dest.height)).min(image.height);
    let x = (image.width - crop_w) * 0.5;
    let y = (image.height - crop_h) * 0.5;
    Rect::new(x, y, x + crop_w, y + crop_h)
}

/// Draw the background image so it covers the whole document.
pub fn paint_background_image<S: Surface + ?Sized>(surface: &mut S, image: &ImageSource, document: Size) {
    let src = cover_source_rect(Size::new(image.width, image.height), document);
    if src.area() <= 0.0 {
        log::warn!("Skipping background image {:?} with empty size", image.src);
        return;
    }
    surface.draw_image(image, src, document.to_rect());
}
