//! # Surface Module
//!
//! Drawable surfaces: what a render pipeline is attached to.
//!
//! The [`Surface`] trait is the narrow interface render steps see: the cell
//! grid, the font metrics that turn cells into pixels, a dirty flag, and the
//! optional overlays (cursor, window chrome, controls, entities) individual
//! steps draw. [`ScreenSurface`] is the concrete surface a host drives each
//! frame; it owns its pipeline.

pub mod cells;
pub mod overlays;

pub use cells::*;
pub use overlays::*;

use crate::{
    Color, DrawTarget, Entity, EntityId, FontMetrics, GridError, GridResult, Point, RenderPipeline,
};
use log::{debug, trace};
use std::fmt;
use std::time::Duration;

/// A drawable grid as seen by render steps.
pub trait Surface {
    fn cells(&self) -> &CellSurface;

    fn cells_mut(&mut self) -> &mut CellSurface;

    fn font(&self) -> &FontMetrics;

    /// Top-left corner of the surface in pixels.
    fn position(&self) -> Point;

    /// Color blended over the whole surface by the tint step.
    fn tint(&self) -> Color {
        Color::TRANSPARENT
    }

    fn is_dirty(&self) -> bool {
        self.cells().is_dirty()
    }

    fn set_dirty(&mut self, dirty: bool) {
        self.cells_mut().set_dirty(dirty);
    }

    /// Pixel size of the whole grid.
    fn pixel_size(&self) -> (u32, u32) {
        let font = self.font();
        (
            self.cells().width() as u32 * font.glyph_width,
            self.cells().height() as u32 * font.glyph_height,
        )
    }

    fn cursor(&self) -> Option<&Cursor> {
        None
    }

    fn cursor_mut(&mut self) -> Option<&mut Cursor> {
        None
    }

    fn window(&self) -> Option<&WindowChrome> {
        None
    }

    fn window_mut(&mut self) -> Option<&mut WindowChrome> {
        None
    }

    fn controls(&self) -> Option<&ControlHost> {
        None
    }

    fn controls_mut(&mut self) -> Option<&mut ControlHost> {
        None
    }

    fn entities(&self) -> &[Entity] {
        Default::default()
    }

    fn entities_mut(&mut self) -> &mut [Entity] {
        Default::default()
    }
}

/// A top-level surface with its own render pipeline.
///
/// # Examples
///
/// ```
/// use gridglyph::{FontMetrics, RecordingTarget, ScreenSurface, StepRegistry, Surface};
///
/// let registry = StepRegistry::with_builtins();
/// let mut screen = ScreenSurface::new("main", 20, 10, FontMetrics::default()).unwrap();
/// screen.set_renderer(Some(registry.default_pipeline().unwrap())).unwrap();
///
/// let mut target = RecordingTarget::new();
/// screen.refresh(false).unwrap();
/// screen.render(&mut target).unwrap();
/// assert!(!target.calls().is_empty());
/// assert!(!screen.cells().is_dirty());
/// ```
pub struct ScreenSurface {
    name: String,
    cells: CellSurface,
    font: FontMetrics,
    position: Point,
    tint: Color,
    cursor: Option<Cursor>,
    window: Option<WindowChrome>,
    controls: Option<ControlHost>,
    entities: Vec<Entity>,
    renderer: Option<RenderPipeline>,
}

impl ScreenSurface {
    pub fn new(name: impl Into<String>, width: usize, height: usize, font: FontMetrics) -> GridResult<Self> {
        Ok(Self {
            name: name.into(),
            cells: CellSurface::new(width, height)?,
            font,
            position: Point::ZERO,
            tint: Color::TRANSPARENT,
            cursor: None,
            window: None,
            controls: None,
            entities: Vec::new(),
            renderer: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Moves the surface to a new pixel position.
    pub fn set_position(&mut self, position: Point) {
        if self.position != position {
            self.position = position;
            self.cells.set_dirty(true);
        }
    }

    pub fn set_tint(&mut self, tint: Color) {
        if self.tint != tint {
            self.tint = tint;
            self.cells.set_dirty(true);
        }
    }

    /// Writes text using this surface's font.
    pub fn print(&mut self, at: Point, text: &str, foreground: Color) -> GridResult<()> {
        self.cells.print(at, text, foreground, &self.font)
    }

    /// Installs or removes the cursor overlay. Steps drawing the old
    /// overlay rebuild on the next refresh.
    pub fn set_cursor(&mut self, cursor: Option<Cursor>) {
        if self.cursor.is_some() || cursor.is_some() {
            self.cells.set_dirty(true);
        }
        self.cursor = cursor;
    }

    pub fn set_window(&mut self, window: Option<WindowChrome>) {
        if self.window != window {
            self.window = window;
            self.cells.set_dirty(true);
        }
    }

    pub fn set_controls(&mut self, controls: Option<ControlHost>) {
        if self.controls.is_some() || controls.is_some() {
            self.cells.set_dirty(true);
        }
        self.controls = controls;
    }

    /// Adds an entity to the entity layer.
    pub fn add_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id();
        debug!("Surface '{}' adding entity {}", self.name, id);
        self.entities.push(entity);
        id
    }

    pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|e| e.id() == id)?;
        self.cells.set_dirty(true);
        Some(self.entities.remove(index))
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id() == id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id() == id)
    }

    pub fn renderer(&self) -> Option<&RenderPipeline> {
        self.renderer.as_ref()
    }

    pub fn renderer_mut(&mut self) -> Option<&mut RenderPipeline> {
        self.renderer.as_mut()
    }

    /// Swaps the render pipeline, detaching the old one and attaching the new.
    pub fn set_renderer(&mut self, renderer: Option<RenderPipeline>) -> GridResult<()> {
        if let Some(mut old) = self.renderer.take() {
            if let Err(err) = old.detach(self) {
                self.renderer = Some(old);
                return Err(err);
            }
        }
        if let Some(mut pipeline) = renderer {
            pipeline.attach(self)?;
            self.renderer = Some(pipeline);
        }
        Ok(())
    }

    /// Runs the update phase: cell effects and entities. Returns whether
    /// anything changed.
    pub fn update(&mut self, delta: Duration) -> bool {
        let mut changed = self.cells.update_effects(delta);
        for entity in &mut self.entities {
            changed |= entity.update(delta);
        }
        trace!("Surface '{}' updated (changed: {})", self.name, changed);
        changed
    }

    /// Refreshes the attached pipeline; a surface without one has nothing to
    /// regenerate.
    pub fn refresh(&mut self, force: bool) -> GridResult<()> {
        let Some(mut pipeline) = self.renderer.take() else {
            return Ok(());
        };
        let result = pipeline.refresh(self, force);
        self.renderer = Some(pipeline);
        result
    }

    /// Renders the attached pipeline into `target` and flushes pending step
    /// edits afterwards.
    pub fn render(&mut self, target: &mut dyn DrawTarget) -> GridResult<()> {
        let Some(mut pipeline) = self.renderer.take() else {
            return Ok(());
        };
        let result = pipeline.render(self, target);
        self.renderer = Some(pipeline);
        result
    }

    /// Detaches the pipeline, failing when none is attached.
    pub fn detach_renderer(&mut self) -> GridResult<RenderPipeline> {
        let mut pipeline = self
            .renderer
            .take()
            .ok_or_else(|| GridError::NotAttached(format!("surface '{}' has no renderer", self.name)))?;
        pipeline.detach(self)?;
        Ok(pipeline)
    }
}

impl fmt::Debug for ScreenSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScreenSurface")
            .field("name", &self.name)
            .field("width", &self.cells.width())
            .field("height", &self.cells.height())
            .field("position", &self.position)
            .field("entities", &self.entities.len())
            .field("renderer", &self.renderer)
            .finish()
    }
}

impl Surface for ScreenSurface {
    fn cells(&self) -> &CellSurface {
        &self.cells
    }

    fn cells_mut(&mut self) -> &mut CellSurface {
        &mut self.cells
    }

    fn font(&self) -> &FontMetrics {
        &self.font
    }

    fn position(&self) -> Point {
        self.position
    }

    fn tint(&self) -> Color {
        self.tint
    }

    fn cursor(&self) -> Option<&Cursor> {
        self.cursor.as_ref()
    }

    fn cursor_mut(&mut self) -> Option<&mut Cursor> {
        self.cursor.as_mut()
    }

    fn window(&self) -> Option<&WindowChrome> {
        self.window.as_ref()
    }

    fn window_mut(&mut self) -> Option<&mut WindowChrome> {
        self.window.as_mut()
    }

    fn controls(&self) -> Option<&ControlHost> {
        self.controls.as_ref()
    }

    fn controls_mut(&mut self) -> Option<&mut ControlHost> {
        self.controls.as_mut()
    }

    fn entities(&self) -> &[Entity] {
        &self.entities
    }

    fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }
}
