//! # Appearance Module
//!
//! Plain value types describing what a grid cell looks like: geometry, colors,
//! glyph appearances and the snapshots effects restore from.

pub mod color;
pub mod glyph;

pub use color::*;
pub use glyph::*;

use crate::{config, GridError, GridResult};
use serde::{Deserialize, Serialize};

/// A 2D coordinate, in cells or pixels depending on context.
///
/// # Examples
///
/// ```
/// use gridglyph::Point;
///
/// let p = Point::new(3, 4) + Point::new(1, 1);
/// assert_eq!(p, Point::new(4, 5));
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// The origin (0, 0).
    pub const ZERO: Point = Point { x: 0, y: 0 };

    /// Creates a new point with the given coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl std::ops::Add for Point {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }
}

/// A rectangle in pixel space.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Returns the rectangle moved by `offset`.
    pub fn offset(self, offset: Point) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }
}

/// Glyph cell metrics supplied by the font layer.
///
/// The engine never loads fonts; it only needs to know how many pixels a cell
/// covers and how many glyphs exist so indices can be range-checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FontMetrics {
    /// Cell width in pixels
    pub glyph_width: u32,
    /// Cell height in pixels
    pub glyph_height: u32,
    /// Number of glyphs the font provides
    pub glyph_count: u32,
}

impl FontMetrics {
    pub const fn new(glyph_width: u32, glyph_height: u32, glyph_count: u32) -> Self {
        Self {
            glyph_width,
            glyph_height,
            glyph_count,
        }
    }

    /// Rejects glyph indices the font cannot draw.
    pub fn check_glyph(&self, glyph: u32) -> GridResult<()> {
        if glyph >= self.glyph_count {
            return Err(GridError::OutOfRange {
                what: "glyph",
                index: glyph as usize,
                limit: self.glyph_count as usize,
            });
        }
        Ok(())
    }

    /// Converts a cell coordinate to the pixel coordinate of its top-left corner.
    pub fn cell_to_pixel(&self, cell: Point) -> Point {
        Point::new(
            cell.x * self.glyph_width as i32,
            cell.y * self.glyph_height as i32,
        )
    }

    /// Pixel rectangle covered by the cell at `cell`.
    pub fn cell_rect(&self, cell: Point) -> PixelRect {
        let origin = self.cell_to_pixel(cell);
        PixelRect::new(origin.x, origin.y, self.glyph_width, self.glyph_height)
    }
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self::new(
            config::DEFAULT_GLYPH_WIDTH,
            config::DEFAULT_GLYPH_HEIGHT,
            config::DEFAULT_GLYPH_COUNT,
        )
    }
}
