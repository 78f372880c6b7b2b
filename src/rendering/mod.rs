//! # Rendering Module
//!
//! Turns surfaces into draw calls through per-surface render pipelines.
//!
//! The engine never rasterizes. Render steps build cached geometry
//! ([`GlyphQuad`]s) during `refresh` and hand it to a [`DrawTarget`] during
//! `render`; the host's target does the actual drawing.

pub mod pipeline;
pub mod registry;
pub mod step;
pub mod steps;

pub use pipeline::*;
pub use registry::*;
pub use step::*;
pub use steps::*;

use crate::{CellSurface, Color, FontMetrics, Mirror, PixelRect, Point};
use std::sync::Arc;

/// One glyph to draw: where, which glyph and in what colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlyphQuad {
    /// Destination relative to the draw call's origin
    pub dest: PixelRect,
    pub glyph: u32,
    pub foreground: Color,
    pub background: Color,
    pub mirror: Mirror,
}

/// A unit of work handed to a [`DrawTarget`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCall {
    /// Cached glyph geometry drawn at `origin`
    Quads {
        layer: &'static str,
        origin: Point,
        quads: Arc<[GlyphQuad]>,
        opacity: u8,
    },
    /// A solid rectangle
    Fill {
        layer: &'static str,
        rect: PixelRect,
        color: Color,
    },
    /// The finished surface composited onto the screen
    Composite { area: PixelRect, opacity: u8 },
}

impl DrawCall {
    /// Name of the step layer that produced the call.
    pub fn layer(&self) -> &'static str {
        match self {
            DrawCall::Quads { layer, .. } | DrawCall::Fill { layer, .. } => layer,
            DrawCall::Composite { .. } => OutputStep::NAME,
        }
    }
}

/// Receives draw calls; implemented by the host's graphics backend.
pub trait DrawTarget {
    fn draw(&mut self, call: DrawCall);
}

/// A draw target that keeps every call, for headless hosts and tests.
#[derive(Debug, Clone, Default)]
pub struct RecordingTarget {
    calls: Vec<DrawCall>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> &[DrawCall] {
        &self.calls
    }

    /// Layers in the order their calls arrived, consecutive repeats collapsed.
    pub fn layers(&self) -> Vec<&'static str> {
        let mut layers: Vec<&'static str> = Vec::new();
        for call in &self.calls {
            if layers.last() != Some(&call.layer()) {
                layers.push(call.layer());
            }
        }
        layers
    }

    /// Total number of glyph quads across all calls.
    pub fn quad_count(&self) -> usize {
        self.calls
            .iter()
            .map(|call| match call {
                DrawCall::Quads { quads, .. } => quads.len(),
                _ => 0,
            })
            .sum()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn take(&mut self) -> Vec<DrawCall> {
        std::mem::take(&mut self.calls)
    }
}

impl DrawTarget for RecordingTarget {
    fn draw(&mut self, call: DrawCall) {
        self.calls.push(call);
    }
}

/// Builds quads for every visible cell of `cells`, offset by `offset` pixels.
/// Decorators follow their cell as transparent-background quads.
pub fn cell_quads(cells: &CellSurface, font: &FontMetrics, offset: Point, out: &mut Vec<GlyphQuad>) {
    for (index, cell) in cells.cells().iter().enumerate() {
        if !cell.is_visible() {
            continue;
        }
        let dest = font.cell_rect(cells.point_of(index)).offset(offset);
        out.push(GlyphQuad {
            dest,
            glyph: cell.glyph(),
            foreground: cell.foreground(),
            background: cell.background(),
            mirror: cell.mirror(),
        });
        out.extend(cell.decorators().iter().map(|decorator| GlyphQuad {
            dest,
            glyph: decorator.glyph,
            foreground: decorator.color,
            background: Color::TRANSPARENT,
            mirror: decorator.mirror,
        }));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellDecorator;

    #[test]
    fn test_cell_quads_skip_hidden_and_add_decorators() {
        let font = FontMetrics::new(8, 8, 256);
        let mut cells = CellSurface::new(2, 1).unwrap();
        cells.cell_mut(0).unwrap().set_visible(false);
        cells
            .cell_mut(1)
            .unwrap()
            .add_decorator(CellDecorator::new(95, Color::RED));

        let mut quads = Vec::new();
        cell_quads(&cells, &font, Point::new(100, 0), &mut quads);
        assert_eq!(quads.len(), 2);
        assert_eq!(quads[0].dest, PixelRect::new(108, 0, 8, 8));
        assert_eq!(quads[1].glyph, 95);
        assert_eq!(quads[1].background, Color::TRANSPARENT);
    }

    #[test]
    fn test_recording_target_collapses_layers() {
        let mut target = RecordingTarget::new();
        let rect = PixelRect::new(0, 0, 1, 1);
        target.draw(DrawCall::Fill {
            layer: "a",
            rect,
            color: Color::RED,
        });
        target.draw(DrawCall::Fill {
            layer: "a",
            rect,
            color: Color::BLUE,
        });
        target.draw(DrawCall::Composite {
            area: rect,
            opacity: 255,
        });
        assert_eq!(target.layers(), vec!["a", "output"]);
    }
}
