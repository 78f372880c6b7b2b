//! # Cell Grids
//!
//! A rectangular grid of [`ColoredGlyph`]s with an optional effect per cell.

use crate::{
    config, AppearanceState, CellEffect, Color, ColoredGlyph, EffectKind, EffectSlot, FontMetrics,
    GridError, GridResult, Point,
};
use log::trace;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// A `width` x `height` grid of glyphs stored row-major.
///
/// The grid keeps a single dirty flag. Any mutable access to a cell raises
/// it; only the final output step of a render pipeline lowers it again.
///
/// # Examples
///
/// ```
/// use gridglyph::{CellSurface, Color, Point};
///
/// let mut cells = CellSurface::new(4, 2).unwrap();
/// cells.set_dirty(false);
/// cells.cell_at_mut(Point::new(3, 1)).unwrap().set_foreground(Color::RED);
/// assert!(cells.is_dirty());
/// assert_eq!(cells.cell(7).unwrap().foreground(), Color::RED);
/// ```
#[derive(Debug, Clone)]
pub struct CellSurface {
    width: usize,
    height: usize,
    cells: Vec<ColoredGlyph>,
    effects: BTreeMap<usize, EffectSlot>,
    dirty: bool,
}

impl CellSurface {
    /// Creates a grid filled with default glyphs. Both dimensions must be
    /// non-zero.
    pub fn new(width: usize, height: usize) -> GridResult<Self> {
        if width == 0 || height == 0 {
            return Err(GridError::InvalidOperation(format!(
                "cell surface must have a non-zero size, got {}x{}",
                width, height
            )));
        }
        Ok(Self {
            width,
            height,
            cells: vec![ColoredGlyph::default(); width * height],
            effects: BTreeMap::new(),
            dirty: true,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Number of cells in the grid.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    /// Converts a cell coordinate into a row-major index.
    pub fn index_of(&self, point: Point) -> GridResult<usize> {
        let inside = point.x >= 0
            && point.y >= 0
            && (point.x as usize) < self.width
            && (point.y as usize) < self.height;
        if !inside {
            return Err(GridError::InvalidOperation(format!(
                "cell ({}, {}) is outside a {}x{} surface",
                point.x, point.y, self.width, self.height
            )));
        }
        Ok(point.y as usize * self.width + point.x as usize)
    }

    /// Converts a row-major index back into a cell coordinate.
    pub fn point_of(&self, index: usize) -> Point {
        Point::new((index % self.width) as i32, (index / self.width) as i32)
    }

    pub fn cells(&self) -> &[ColoredGlyph] {
        &self.cells
    }

    pub fn cell(&self, index: usize) -> GridResult<&ColoredGlyph> {
        self.cells.get(index).ok_or(GridError::OutOfRange {
            what: "cell",
            index,
            limit: self.cells.len(),
        })
    }

    pub fn cell_at(&self, point: Point) -> GridResult<&ColoredGlyph> {
        self.cell(self.index_of(point)?)
    }

    /// Mutable access to a cell; marks the surface dirty.
    ///
    /// Edits made here are seen by a running cell effect only through its
    /// output; use [`set_cell`](Self::set_cell) to replace what the effect
    /// computes from.
    pub fn cell_mut(&mut self, index: usize) -> GridResult<&mut ColoredGlyph> {
        let limit = self.cells.len();
        let cell = self.cells.get_mut(index).ok_or(GridError::OutOfRange {
            what: "cell",
            index,
            limit,
        })?;
        self.dirty = true;
        Ok(cell)
    }

    pub fn cell_at_mut(&mut self, point: Point) -> GridResult<&mut ColoredGlyph> {
        let index = self.index_of(point)?;
        self.cell_mut(index)
    }

    /// Replaces a cell outright. A running effect on the cell rebases onto the
    /// new glyph.
    pub fn set_cell(&mut self, index: usize, glyph: ColoredGlyph) -> GridResult<()> {
        let cell = self.cell_mut(index)?;
        *cell = glyph;
        cell.set_dirty(true);
        if let Some(slot) = self.effects.get_mut(&index) {
            slot.rebase(&self.cells[index]);
        }
        Ok(())
    }

    /// Writes `text` left to right starting at `at`, one glyph per char.
    ///
    /// Characters past the right edge are dropped; characters the font cannot
    /// draw are rejected before anything is written.
    pub fn print(
        &mut self,
        at: Point,
        text: &str,
        foreground: Color,
        font: &FontMetrics,
    ) -> GridResult<()> {
        let start = self.index_of(at)?;
        let room = self.width - at.x as usize;
        let glyphs = text
            .chars()
            .take(room)
            .map(|c| {
                let glyph = c as u32;
                font.check_glyph(glyph).map(|_| glyph)
            })
            .collect::<GridResult<Vec<_>>>()?;

        for (offset, glyph) in glyphs.into_iter().enumerate() {
            let cell = &mut self.cells[start + offset];
            cell.set_glyph(glyph);
            cell.set_foreground(foreground);
        }
        self.dirty = true;
        Ok(())
    }

    /// Sets every cell to the same colors and glyph.
    pub fn fill(&mut self, foreground: Color, background: Color, glyph: u32) {
        for cell in &mut self.cells {
            cell.set_foreground(foreground);
            cell.set_background(background);
            cell.set_glyph(glyph);
        }
        self.dirty = true;
    }

    /// Resets every cell to the default glyph and drops all cell effects.
    pub fn clear(&mut self) {
        self.effects.clear();
        let blank = ColoredGlyph::default();
        for cell in &mut self.cells {
            cell.copy_appearance_from(&blank);
        }
        self.dirty = true;
    }

    /// Clears the per-cell dirty bits after the cells were consumed, without
    /// touching the surface flag.
    pub fn clear_cell_dirty(&mut self) {
        for cell in &mut self.cells {
            cell.set_dirty(false);
        }
    }

    /// The effect running on a cell, if any.
    pub fn effect(&self, index: usize) -> Option<&dyn CellEffect> {
        self.effects.get(&index).and_then(EffectSlot::effect)
    }

    /// Number of cells with an attached effect.
    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Attaches, replaces or removes (`None`) the effect of one cell.
    pub fn set_effect(&mut self, index: usize, effect: Option<Box<dyn CellEffect>>) -> GridResult<()> {
        let limit = self.cells.len();
        let cell = self.cells.get_mut(index).ok_or(GridError::OutOfRange {
            what: "cell",
            index,
            limit,
        })?;
        let slot = self
            .effects
            .entry(index)
            .or_insert_with(|| EffectSlot::new(cell));
        let changed = slot.set_effect(cell, effect);
        if !slot.has_effect() {
            self.effects.remove(&index);
        }
        self.dirty |= changed;
        Ok(())
    }

    /// Attaches a private copy of a shared `clone_on_add` template to every
    /// listed cell.
    pub fn set_effect_from(&mut self, indices: &[usize], template: &dyn CellEffect) -> GridResult<()> {
        if !template.settings().clone_on_add {
            return Err(GridError::InvalidOperation(format!(
                "effect '{}' is not marked clone_on_add and cannot be shared",
                template.name()
            )));
        }
        for &index in indices {
            self.set_effect(index, Some(template.clone_effect()))?;
        }
        Ok(())
    }

    /// Advances every cell effect. Returns whether any cell changed; the
    /// surface is marked dirty if so.
    pub fn update_effects(&mut self, delta: Duration) -> bool {
        if self.effects.is_empty() {
            return false;
        }
        let mut changed = false;
        for (&index, slot) in self.effects.iter_mut() {
            changed |= slot.update(&mut self.cells[index], delta);
        }
        self.effects.retain(|_, slot| slot.has_effect());
        if changed {
            trace!("Cell effects changed the surface");
            self.dirty = true;
        }
        changed
    }

    pub fn to_record(&self) -> CellSurfaceRecord {
        CellSurfaceRecord {
            width: self.width,
            height: self.height,
            cells: self.cells.iter().map(AppearanceState::from).collect(),
            effects: self
                .effects
                .iter()
                .filter_map(|(&index, slot)| {
                    slot.effect().map(|effect| CellEffectRecord {
                        index,
                        baseline: slot.baseline().clone(),
                        effect: effect.to_kind(),
                    })
                })
                .collect(),
        }
    }

    /// Rebuilds a grid, validating every glyph and effect against `font`.
    pub fn from_record(record: CellSurfaceRecord, font: &FontMetrics) -> GridResult<Self> {
        let mut surface = Self::new(record.width, record.height)?;
        if record.cells.len() != surface.len() {
            return Err(GridError::InvalidState(format!(
                "cell surface record holds {} cells, expected {}",
                record.cells.len(),
                surface.len()
            )));
        }
        surface.cells = record
            .cells
            .iter()
            .map(|state| state.to_glyph(font))
            .collect::<GridResult<Vec<_>>>()?;

        for stored in record.effects {
            surface.cell(stored.index)?;
            stored.baseline.validate(font)?;
            let effect = stored.effect.into_effect(font)?;
            surface
                .effects
                .insert(stored.index, EffectSlot::from_parts(stored.baseline, Some(effect)));
        }
        Ok(surface)
    }
}

impl Default for CellSurface {
    fn default() -> Self {
        let width = config::DEFAULT_SURFACE_WIDTH;
        let height = config::DEFAULT_SURFACE_HEIGHT;
        Self {
            width,
            height,
            cells: vec![ColoredGlyph::default(); width * height],
            effects: BTreeMap::new(),
            dirty: true,
        }
    }
}

/// Stored form of a [`CellSurface`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSurfaceRecord {
    pub width: usize,
    pub height: usize,
    pub cells: Vec<AppearanceState>,
    #[serde(default)]
    pub effects: Vec<CellEffectRecord>,
}

/// A running cell effect together with the snapshot it computes from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellEffectRecord {
    pub index: usize,
    pub baseline: AppearanceState,
    pub effect: EffectKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{EffectSettings, Recolor};

    #[test]
    fn test_zero_sized_surface_is_rejected() {
        assert!(CellSurface::new(0, 4).is_err());
        assert!(CellSurface::new(4, 0).is_err());
    }

    #[test]
    fn test_index_conversions() {
        let cells = CellSurface::new(10, 5).unwrap();
        assert_eq!(cells.index_of(Point::new(3, 2)).unwrap(), 23);
        assert_eq!(cells.point_of(23), Point::new(3, 2));
        assert!(cells.index_of(Point::new(10, 0)).is_err());
        assert!(cells.index_of(Point::new(-1, 0)).is_err());
    }

    #[test]
    fn test_print_clips_at_right_edge() {
        let font = FontMetrics::default();
        let mut cells = CellSurface::new(4, 1).unwrap();
        cells.print(Point::new(2, 0), "abc", Color::GREEN, &font).unwrap();
        assert_eq!(cells.cell(2).unwrap().glyph(), 'a' as u32);
        assert_eq!(cells.cell(3).unwrap().glyph(), 'b' as u32);
        assert_eq!(cells.cell(3).unwrap().foreground(), Color::GREEN);
    }

    #[test]
    fn test_print_rejects_glyphs_outside_font() {
        let font = FontMetrics::new(8, 8, 128);
        let mut cells = CellSurface::new(8, 1).unwrap();
        assert!(cells.print(Point::ZERO, "é", Color::WHITE, &font).is_err());
        assert_eq!(cells.cell(0).unwrap().glyph(), 0);
    }

    #[test]
    fn test_cell_effects_update_and_are_removed() {
        let mut cells = CellSurface::new(2, 2).unwrap();
        let effect = Recolor::new(Some(Color::RED), None)
            .with_duration(Duration::from_millis(100))
            .with_settings(
                EffectSettings::default()
                    .with_remove_on_finished(true)
                    .with_restore_cell_on_removed(true),
            );
        cells.set_effect(1, Some(Box::new(effect))).unwrap();
        cells.set_dirty(false);

        assert!(cells.update_effects(Duration::from_millis(50)));
        assert!(cells.is_dirty());
        assert_eq!(cells.cell(1).unwrap().foreground(), Color::RED);
        assert_eq!(cells.cell(0).unwrap().foreground(), Color::WHITE);

        cells.update_effects(Duration::from_millis(60));
        assert_eq!(cells.effect_count(), 0);
        assert_eq!(cells.cell(1).unwrap().foreground(), Color::WHITE);
    }

    #[test]
    fn test_shared_template_needs_clone_on_add() {
        let mut cells = CellSurface::new(3, 1).unwrap();
        let template = Recolor::new(None, Some(Color::BLUE));
        assert!(cells.set_effect_from(&[0, 1], &template).is_err());

        let template = template.with_settings(EffectSettings::default().with_clone_on_add(true));
        cells.set_effect_from(&[0, 2], &template).unwrap();
        assert_eq!(cells.effect_count(), 2);
        assert!(cells.effect(1).is_none());
    }

    #[test]
    fn test_record_preserves_running_effects() {
        let font = FontMetrics::default();
        let mut cells = CellSurface::new(2, 1).unwrap();
        cells.set_effect(0, Some(Box::new(Recolor::new(Some(Color::RED), None)))).unwrap();
        cells.update_effects(Duration::from_millis(10));

        let record = cells.to_record();
        let rebuilt = CellSurface::from_record(record.clone(), &font).unwrap();
        assert_eq!(rebuilt.to_record(), record);
        assert_eq!(rebuilt.cell(0).unwrap().foreground(), Color::RED);
    }

    #[test]
    fn test_record_with_wrong_cell_count_is_rejected() {
        let mut record = CellSurface::new(2, 2).unwrap().to_record();
        record.cells.pop();
        assert!(CellSurface::from_record(record, &FontMetrics::default()).is_err());
    }
}
