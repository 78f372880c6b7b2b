//! # Glyph Appearances
//!
//! [`ColoredGlyph`] is the visual payload of one grid cell. Every setter marks
//! the glyph dirty when it actually changes a value; only the render step that
//! consumes the glyph clears the flag again.
//!
//! [`AppearanceState`] is a detached snapshot of the visual fields. Effects
//! compute their output from a snapshot, and the same shape is what gets
//! persisted, so it doubles as the stored record of an appearance.

use crate::{Color, FontMetrics, GridResult, Palette};
use serde::{Deserialize, Serialize};

/// Mirroring applied when a glyph is drawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mirror {
    #[default]
    None,
    Horizontal,
    Vertical,
}

/// An extra glyph drawn on top of a cell (underline, strike, accent...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellDecorator {
    pub glyph: u32,
    pub color: Color,
    pub mirror: Mirror,
}

impl CellDecorator {
    pub fn new(glyph: u32, color: Color) -> Self {
        Self {
            glyph,
            color,
            mirror: Mirror::None,
        }
    }
}

/// The appearance of one cell.
///
/// Equality compares the visual fields only; the dirty bit is bookkeeping.
///
/// # Examples
///
/// ```
/// use gridglyph::{Color, ColoredGlyph};
///
/// let mut cell = ColoredGlyph::new(Color::WHITE, Color::BLACK, 64);
/// cell.set_dirty(false);
/// cell.set_glyph(64);
/// assert!(!cell.is_dirty());
/// cell.set_glyph(65);
/// assert!(cell.is_dirty());
/// ```
#[derive(Debug, Clone)]
pub struct ColoredGlyph {
    foreground: Color,
    background: Color,
    glyph: u32,
    mirror: Mirror,
    is_visible: bool,
    decorators: Vec<CellDecorator>,
    dirty: bool,
}

impl ColoredGlyph {
    /// Creates a visible, undecorated glyph. New glyphs start dirty.
    pub fn new(foreground: Color, background: Color, glyph: u32) -> Self {
        Self {
            foreground,
            background,
            glyph,
            mirror: Mirror::None,
            is_visible: true,
            decorators: Vec::new(),
            dirty: true,
        }
    }

    /// Creates a glyph after checking the index against the font.
    pub fn checked(
        foreground: Color,
        background: Color,
        glyph: u32,
        font: &FontMetrics,
    ) -> GridResult<Self> {
        font.check_glyph(glyph)?;
        Ok(Self::new(foreground, background, glyph))
    }

    /// Creates a glyph from palette indices, as produced by imported art.
    ///
    /// Every index is range-checked; nothing is clamped.
    pub fn from_indexed(
        glyph: u32,
        foreground: usize,
        background: usize,
        palette: &Palette,
        font: &FontMetrics,
    ) -> GridResult<Self> {
        font.check_glyph(glyph)?;
        Ok(Self::new(palette.get(foreground)?, palette.get(background)?, glyph))
    }

    pub fn foreground(&self) -> Color {
        self.foreground
    }

    pub fn background(&self) -> Color {
        self.background
    }

    pub fn glyph(&self) -> u32 {
        self.glyph
    }

    pub fn mirror(&self) -> Mirror {
        self.mirror
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn decorators(&self) -> &[CellDecorator] {
        &self.decorators
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    pub fn set_foreground(&mut self, color: Color) {
        if self.foreground != color {
            self.foreground = color;
            self.dirty = true;
        }
    }

    pub fn set_background(&mut self, color: Color) {
        if self.background != color {
            self.background = color;
            self.dirty = true;
        }
    }

    pub fn set_glyph(&mut self, glyph: u32) {
        if self.glyph != glyph {
            self.glyph = glyph;
            self.dirty = true;
        }
    }

    pub fn set_mirror(&mut self, mirror: Mirror) {
        if self.mirror != mirror {
            self.mirror = mirror;
            self.dirty = true;
        }
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.is_visible != visible {
            self.is_visible = visible;
            self.dirty = true;
        }
    }

    pub fn set_decorators(&mut self, decorators: Vec<CellDecorator>) {
        if self.decorators != decorators {
            self.decorators = decorators;
            self.dirty = true;
        }
    }

    pub fn add_decorator(&mut self, decorator: CellDecorator) {
        self.decorators.push(decorator);
        self.dirty = true;
    }

    /// Copies every visual field of `other` into this glyph.
    pub fn copy_appearance_from(&mut self, other: &ColoredGlyph) {
        self.set_foreground(other.foreground);
        self.set_background(other.background);
        self.set_glyph(other.glyph);
        self.set_mirror(other.mirror);
        self.set_visible(other.is_visible);
        if self.decorators != other.decorators {
            self.decorators.clone_from(&other.decorators);
            self.dirty = true;
        }
    }
}

impl PartialEq for ColoredGlyph {
    fn eq(&self, other: &Self) -> bool {
        self.foreground == other.foreground
            && self.background == other.background
            && self.glyph == other.glyph
            && self.mirror == other.mirror
            && self.is_visible == other.is_visible
            && self.decorators == other.decorators
    }
}

impl Default for ColoredGlyph {
    fn default() -> Self {
        Self::new(Color::WHITE, Color::TRANSPARENT, 0)
    }
}

/// A detached snapshot of a glyph's visual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppearanceState {
    pub foreground: Color,
    pub background: Color,
    pub glyph: u32,
    #[serde(default)]
    pub mirror: Mirror,
    #[serde(default = "visible_by_default")]
    pub is_visible: bool,
    #[serde(default)]
    pub decorators: Vec<CellDecorator>,
}

fn visible_by_default() -> bool {
    true
}

impl AppearanceState {
    /// Writes the snapshot back into `target`, returning whether anything changed.
    pub fn restore(&self, target: &mut ColoredGlyph) -> bool {
        let was_dirty = target.dirty;
        target.dirty = false;
        target.set_foreground(self.foreground);
        target.set_background(self.background);
        target.set_glyph(self.glyph);
        target.set_mirror(self.mirror);
        target.set_visible(self.is_visible);
        target.set_decorators(self.decorators.clone());
        let changed = target.dirty;
        target.dirty |= was_dirty;
        changed
    }

    /// Checks the snapshot against the font before it is turned into a glyph.
    pub fn validate(&self, font: &FontMetrics) -> GridResult<()> {
        font.check_glyph(self.glyph)?;
        for decorator in &self.decorators {
            font.check_glyph(decorator.glyph)?;
        }
        Ok(())
    }

    /// Rebuilds a live glyph from a stored snapshot, running the same checks
    /// as [`ColoredGlyph::checked`].
    pub fn to_glyph(&self, font: &FontMetrics) -> GridResult<ColoredGlyph> {
        self.validate(font)?;
        let mut glyph = ColoredGlyph::new(self.foreground, self.background, self.glyph);
        glyph.mirror = self.mirror;
        glyph.is_visible = self.is_visible;
        glyph.decorators = self.decorators.clone();
        Ok(glyph)
    }
}

impl From<&ColoredGlyph> for AppearanceState {
    fn from(glyph: &ColoredGlyph) -> Self {
        Self {
            foreground: glyph.foreground,
            background: glyph.background,
            glyph: glyph.glyph,
            mirror: glyph.mirror,
            is_visible: glyph.is_visible,
            decorators: glyph.decorators.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridError;

    #[test]
    fn test_setters_mark_dirty_only_on_change() {
        let mut cell = ColoredGlyph::new(Color::WHITE, Color::BLACK, 1);
        cell.set_dirty(false);

        cell.set_foreground(Color::WHITE);
        cell.set_background(Color::BLACK);
        assert!(!cell.is_dirty());

        cell.set_mirror(Mirror::Horizontal);
        assert!(cell.is_dirty());
    }

    #[test]
    fn test_equality_ignores_dirty_bit() {
        let a = ColoredGlyph::new(Color::RED, Color::BLACK, 2);
        let mut b = a.clone();
        b.set_dirty(false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_snapshot_restore_reverts_every_field() {
        let mut cell = ColoredGlyph::new(Color::RED, Color::BLACK, 10);
        cell.add_decorator(CellDecorator::new(95, Color::YELLOW));
        let snapshot = AppearanceState::from(&cell);

        cell.set_foreground(Color::GREEN);
        cell.set_visible(false);
        cell.set_decorators(Vec::new());
        cell.set_dirty(false);

        assert!(snapshot.restore(&mut cell));
        assert!(cell.is_dirty());
        assert_eq!(AppearanceState::from(&cell), snapshot);
    }

    #[test]
    fn test_restore_without_difference_reports_no_change() {
        let mut cell = ColoredGlyph::new(Color::RED, Color::BLACK, 10);
        cell.set_dirty(false);
        let snapshot = AppearanceState::from(&cell);
        assert!(!snapshot.restore(&mut cell));
        assert!(!cell.is_dirty());
    }

    #[test]
    fn test_from_indexed_rejects_bad_indices() {
        let palette = Palette::ansi();
        let font = FontMetrics::new(8, 8, 256);

        let cell = ColoredGlyph::from_indexed(65, 15, 0, &palette, &font).unwrap();
        assert_eq!(cell.foreground(), Color::WHITE);
        assert_eq!(cell.glyph(), 65);

        assert!(matches!(
            ColoredGlyph::from_indexed(300, 1, 0, &palette, &font),
            Err(GridError::OutOfRange { what: "glyph", .. })
        ));
        assert!(matches!(
            ColoredGlyph::from_indexed(1, 40, 0, &palette, &font),
            Err(GridError::OutOfRange { what: "palette", .. })
        ));
    }

    #[test]
    fn test_stored_snapshot_is_validated() {
        let font = FontMetrics::new(8, 8, 16);
        let mut state = AppearanceState::from(&ColoredGlyph::new(Color::RED, Color::BLACK, 3));
        assert!(state.to_glyph(&font).is_ok());
        state.decorators.push(CellDecorator::new(99, Color::WHITE));
        assert!(state.to_glyph(&font).is_err());
    }
}
