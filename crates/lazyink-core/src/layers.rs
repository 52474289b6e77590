//! The four stacked drawing surfaces.

use crate::surface::{RecordingSurface, Surface, clear_client};
use kurbo::{Affine, Size};

/// Identifies one of the layers, in back-to-front paint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Background color, grid lines and background image.
    Grid,
    /// Committed strokes.
    Drawing,
    /// The stroke currently being captured.
    Temp,
    /// Pointer, brush and connector feedback.
    Interface,
}

impl LayerKind {
    /// All layers, back to front.
    pub const ALL: [LayerKind; 4] = [
        LayerKind::Grid,
        LayerKind::Drawing,
        LayerKind::Temp,
        LayerKind::Interface,
    ];

    /// Position in the stack (0 = back).
    pub fn z_index(self) -> usize {
        match self {
            LayerKind::Grid => 0,
            LayerKind::Drawing => 1,
            LayerKind::Temp => 2,
            LayerKind::Interface => 3,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            LayerKind::Grid => "grid",
            LayerKind::Drawing => "drawing",
            LayerKind::Temp => "temp",
            LayerKind::Interface => "interface",
        }
    }
}

/// Four equally sized surfaces with a fixed paint order.
#[derive(Debug, Clone)]
pub struct LayerStack<S: Surface> {
    layers: [S; 4],
}

impl LayerStack<RecordingSurface> {
    /// A stack of recording surfaces of the given size.
    pub fn recording(size: Size) -> Self {
        Self::from_surfaces(
            RecordingSurface::new(size),
            RecordingSurface::new(size),
            RecordingSurface::new(size),
            RecordingSurface::new(size),
        )
    }
}

impl<S: Surface> LayerStack<S> {
    /// Build a stack from host surfaces. They are resized to the size of
    /// `grid` so the stack starts out uniform.
    pub fn from_surfaces(grid: S, drawing: S, temp: S, interface: S) -> Self {
        let size = grid.size();
        let mut stack = Self {
            layers: [grid, drawing, temp, interface],
        };
        for layer in stack.layers.iter_mut().skip(1) {
            if layer.size() != size {
                layer.resize(size);
            }
        }
        stack
    }

    pub fn get(&self, kind: LayerKind) -> &S {
        &self.layers[kind.z_index()]
    }

    pub fn get_mut(&mut self, kind: LayerKind) -> &mut S {
        &mut self.layers[kind.z_index()]
    }

    /// Mutable access to two distinct layers at once.
    pub fn pair_mut(&mut self, a: LayerKind, b: LayerKind) -> Option<(&mut S, &mut S)> {
        let (ia, ib) = (a.z_index(), b.z_index());
        if ia == ib {
            return None;
        }
        let (lo, hi) = self.layers.split_at_mut(ia.max(ib));
        let (first, second) = (&mut lo[ia.min(ib)], &mut hi[0]);
        Some(if ia < ib { (first, second) } else { (second, first) })
    }

    /// Shared pixel size.
    pub fn size(&self) -> Size {
        self.layers[0].size()
    }

    /// Resize every layer. Contents are discarded and must be repainted.
    pub fn resize_all(&mut self, size: Size) {
        for layer in &mut self.layers {
            layer.resize(size);
        }
    }

    /// Install the same document transform on every layer.
    pub fn set_transform_all(&mut self, transform: Affine) {
        for layer in &mut self.layers {
            layer.set_transform(transform);
        }
    }

    /// Clear one layer in client space.
    pub fn clear_client(&mut self, kind: LayerKind) {
        clear_client(self.get_mut(kind));
    }

    /// Iterate layers back to front.
    pub fn iter(&self) -> impl Iterator<Item = (LayerKind, &S)> {
        LayerKind::ALL.into_iter().zip(self.layers.iter())
    }
}
