//! # Colors
//!
//! RGBA colors, indexed palettes and gradients used by fade effects.

use crate::{GridError, GridResult};
use serde::{Deserialize, Serialize};

/// An 8-bit RGBA color.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::new(0, 0, 0, 0);
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const GRAY: Color = Color::rgb(128, 128, 128);
    pub const RED: Color = Color::rgb(255, 0, 0);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Creates an opaque color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Returns the same color with a different alpha.
    pub const fn with_alpha(self, a: u8) -> Self {
        Self::new(self.r, self.g, self.b, a)
    }

    /// Linear interpolation between `self` and `other`; `t` is clamped to [0, 1].
    ///
    /// # Examples
    ///
    /// ```
    /// use gridglyph::Color;
    ///
    /// let mid = Color::BLACK.lerp(Color::WHITE, 0.5);
    /// assert_eq!(mid, Color::rgb(128, 128, 128));
    /// ```
    pub fn lerp(self, other: Color, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

/// An indexed color table, used when appearances come from external data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Palette {
    colors: Vec<Color>,
}

impl Palette {
    pub fn new(colors: Vec<Color>) -> Self {
        Self { colors }
    }

    /// The 16 standard ANSI colors.
    pub fn ansi() -> Self {
        Self::new(vec![
            Color::rgb(0, 0, 0),
            Color::rgb(170, 0, 0),
            Color::rgb(0, 170, 0),
            Color::rgb(170, 85, 0),
            Color::rgb(0, 0, 170),
            Color::rgb(170, 0, 170),
            Color::rgb(0, 170, 170),
            Color::rgb(170, 170, 170),
            Color::rgb(85, 85, 85),
            Color::rgb(255, 85, 85),
            Color::rgb(85, 255, 85),
            Color::rgb(255, 255, 85),
            Color::rgb(85, 85, 255),
            Color::rgb(255, 85, 255),
            Color::rgb(85, 255, 255),
            Color::rgb(255, 255, 255),
        ])
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Looks up a color, failing for indices beyond the table.
    pub fn get(&self, index: usize) -> GridResult<Color> {
        self.colors.get(index).copied().ok_or(GridError::OutOfRange {
            what: "palette",
            index,
            limit: self.colors.len(),
        })
    }
}

/// A sequence of color stops sampled over [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gradient {
    stops: Vec<(f32, Color)>,
}

impl Gradient {
    /// A two-stop gradient from `start` to `end`.
    pub fn new(start: Color, end: Color) -> Self {
        Self {
            stops: vec![(0.0, start), (1.0, end)],
        }
    }

    /// Builds a gradient from explicit stops.
    ///
    /// Stops must be non-empty, lie within [0, 1] and be in ascending order.
    pub fn with_stops(stops: Vec<(f32, Color)>) -> GridResult<Self> {
        let gradient = Self { stops };
        gradient.validate()?;
        Ok(gradient)
    }

    pub fn validate(&self) -> GridResult<()> {
        if self.stops.is_empty() {
            return Err(GridError::InvalidEffect("gradient has no stops".to_string()));
        }
        let mut previous = 0.0f32;
        for (position, _) in &self.stops {
            if !(0.0..=1.0).contains(position) || *position < previous {
                return Err(GridError::InvalidEffect(format!(
                    "gradient stop {} is out of order or outside [0, 1]",
                    position
                )));
            }
            previous = *position;
        }
        Ok(())
    }

    pub fn stops(&self) -> &[(f32, Color)] {
        &self.stops
    }

    /// Returns a copy whose first stop uses `color`.
    pub fn with_first_color(&self, color: Color) -> Gradient {
        let mut stops = self.stops.clone();
        if let Some(first) = stops.first_mut() {
            first.1 = color;
        }
        Gradient { stops }
    }

    /// Samples the gradient at `t`.
    pub fn sample(&self, t: f32) -> Color {
        let t = t.clamp(0.0, 1.0);
        let (first_pos, first) = match self.stops.first() {
            Some(stop) => *stop,
            None => return Color::TRANSPARENT,
        };
        if t <= first_pos {
            return first;
        }
        for pair in self.stops.windows(2) {
            let (start_pos, start) = pair[0];
            let (end_pos, end) = pair[1];
            if t <= end_pos {
                let span = end_pos - start_pos;
                if span <= f32::EPSILON {
                    return end;
                }
                return start.lerp(end, (t - start_pos) / span);
            }
        }
        self.stops.last().map(|(_, c)| *c).unwrap_or(first)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        assert_eq!(Color::RED.lerp(Color::BLUE, 0.0), Color::RED);
        assert_eq!(Color::RED.lerp(Color::BLUE, 1.0), Color::BLUE);
        assert_eq!(Color::RED.lerp(Color::BLUE, 7.0), Color::BLUE);
    }

    #[test]
    fn test_palette_rejects_out_of_range_index() {
        let palette = Palette::ansi();
        assert_eq!(palette.len(), 16);
        assert_eq!(palette.get(15).unwrap(), Color::WHITE);
        assert!(matches!(
            palette.get(16),
            Err(GridError::OutOfRange { what: "palette", index: 16, limit: 16 })
        ));
    }

    #[test]
    fn test_gradient_sampling() {
        let gradient = Gradient::with_stops(vec![
            (0.0, Color::BLACK),
            (0.5, Color::WHITE),
            (1.0, Color::BLACK),
        ])
        .unwrap();
        assert_eq!(gradient.sample(0.0), Color::BLACK);
        assert_eq!(gradient.sample(0.5), Color::WHITE);
        assert_eq!(gradient.sample(1.0), Color::BLACK);
    }

    #[test]
    fn test_gradient_rejects_unordered_stops() {
        let result = Gradient::with_stops(vec![(0.8, Color::BLACK), (0.2, Color::WHITE)]);
        assert!(result.is_err());
        assert!(Gradient::with_stops(Vec::new()).is_err());
    }
}
