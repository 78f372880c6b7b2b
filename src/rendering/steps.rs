//! # Built-in Render Steps
//!
//! | Step | Name | Order |
//! |---|---|---|
//! | [`WindowStep`] | `window` | 10 |
//! | [`SurfaceStep`] | `surface` | 20 |
//! | [`EntityStep`] | `entities` | 30 |
//! | [`ControlsStep`] | `controls` | 40 |
//! | [`OutputStep`] | `output` | 50 |
//! | [`CursorStep`] | `cursor` | 70 |
//! | [`TintStep`] | `tint` | 90 |

use super::{cell_quads, DrawCall, DrawTarget, GlyphQuad, RefreshContext, RenderStep, StepLifecycle};
use crate::{Color, EntityAppearance, GridResult, PixelRect, Point, Surface};
use log::trace;
use std::sync::Arc;

fn surface_area(surface: &dyn Surface) -> PixelRect {
    let origin = surface.position();
    let (width, height) = surface.pixel_size();
    PixelRect::new(origin.x, origin.y, width, height)
}

fn empty_quads() -> Arc<[GlyphQuad]> {
    Arc::from(Vec::new())
}

/// Draws the surface's cells.
#[derive(Debug)]
pub struct SurfaceStep {
    lifecycle: StepLifecycle,
    quads: Arc<[GlyphQuad]>,
    capacity: usize,
}

impl SurfaceStep {
    pub const NAME: &'static str = "surface";

    pub fn new() -> Self {
        Self {
            lifecycle: StepLifecycle::default(),
            quads: empty_quads(),
            capacity: 0,
        }
    }
}

impl Default for SurfaceStep {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStep for SurfaceStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        20
    }

    fn attach(&mut self, surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)?;
        self.capacity = surface.cells().len();
        Ok(())
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.detach(Self::NAME)?;
        self.quads = empty_quads();
        self.capacity = 0;
        Ok(())
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        if !self.lifecycle.take_refresh(ctx) {
            return Ok(false);
        }
        let mut quads = Vec::with_capacity(self.capacity);
        cell_quads(surface.cells(), surface.font(), Point::ZERO, &mut quads);
        surface.cells_mut().clear_cell_dirty();
        trace!("Surface step rebuilt {} quads", quads.len());
        self.quads = Arc::from(quads);
        Ok(true)
    }

    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        target.draw(DrawCall::Quads {
            layer: Self::NAME,
            origin: surface.position(),
            quads: Arc::clone(&self.quads),
            opacity,
        });
        Ok(())
    }
}

/// Composites the finished surface and clears its dirty flag.
#[derive(Debug, Default)]
pub struct OutputStep {
    lifecycle: StepLifecycle,
}

impl OutputStep {
    pub const NAME: &'static str = "output";

    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStep for OutputStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        50
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        self.lifecycle.take_refresh(ctx);
        if surface.is_dirty() {
            surface.set_dirty(false);
        }
        Ok(false)
    }

    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        target.draw(DrawCall::Composite {
            area: surface_area(surface),
            opacity,
        });
        Ok(())
    }
}

/// Blends the surface tint over everything drawn before it.
#[derive(Debug, Default)]
pub struct TintStep {
    lifecycle: StepLifecycle,
    fill: Option<(PixelRect, Color)>,
}

impl TintStep {
    pub const NAME: &'static str = "tint";

    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStep for TintStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        90
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.fill = None;
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        if !self.lifecycle.take_refresh(ctx) {
            return Ok(false);
        }
        let tint = surface.tint();
        let area = surface_area(surface);
        self.fill = (tint.a > 0).then_some((area, tint));
        Ok(true)
    }

    fn render(&self, _surface: &dyn Surface, target: &mut dyn DrawTarget, _opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        if let Some((rect, color)) = self.fill {
            target.draw(DrawCall::Fill {
                layer: Self::NAME,
                rect,
                color,
            });
        }
        Ok(())
    }
}

/// Draws the surface cursor on top of the composited cells.
#[derive(Debug)]
pub struct CursorStep {
    lifecycle: StepLifecycle,
    quads: Arc<[GlyphQuad]>,
}

impl CursorStep {
    pub const NAME: &'static str = "cursor";

    pub fn new() -> Self {
        Self {
            lifecycle: StepLifecycle::default(),
            quads: empty_quads(),
        }
    }
}

impl Default for CursorStep {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStep for CursorStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        70
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.quads = empty_quads();
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        let cursor_dirty = surface.cursor().is_some_and(|cursor| cursor.is_dirty());
        if !self.lifecycle.take_refresh(ctx) && !cursor_dirty {
            return Ok(false);
        }

        let font = *surface.font();
        let quad = surface
            .cursor()
            .filter(|cursor| cursor.is_visible())
            .map(|cursor| {
                let appearance = cursor.appearance();
                GlyphQuad {
                    dest: font.cell_rect(cursor.position()),
                    glyph: appearance.glyph(),
                    foreground: appearance.foreground(),
                    background: appearance.background(),
                    mirror: appearance.mirror(),
                }
            });
        self.quads = quad.into_iter().collect();
        if let Some(cursor) = surface.cursor_mut() {
            cursor.set_dirty(false);
        }
        Ok(true)
    }

    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        if !self.quads.is_empty() {
            target.draw(DrawCall::Quads {
                layer: Self::NAME,
                origin: surface.position(),
                quads: Arc::clone(&self.quads),
                opacity,
            });
        }
        Ok(())
    }
}

/// Draws the window border and title bar around the surface.
#[derive(Debug)]
pub struct WindowStep {
    lifecycle: StepLifecycle,
    fills: Vec<(PixelRect, Color)>,
    title: Arc<[GlyphQuad]>,
}

impl WindowStep {
    pub const NAME: &'static str = "window";

    pub fn new() -> Self {
        Self {
            lifecycle: StepLifecycle::default(),
            fills: Vec::new(),
            title: empty_quads(),
        }
    }
}

impl Default for WindowStep {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStep for WindowStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        10
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.fills.clear();
        self.title = empty_quads();
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        let window_dirty = surface.window().is_some_and(|window| window.is_dirty());
        if !self.lifecycle.take_refresh(ctx) && !window_dirty {
            return Ok(false);
        }

        self.fills.clear();
        let mut title = Vec::new();
        let area = surface_area(surface);
        let font = *surface.font();
        if let Some(window) = surface.window() {
            let border = window.border_width();
            let bar_height = font.glyph_height;
            let frame = PixelRect::new(
                area.x - border as i32,
                area.y - (border + bar_height) as i32,
                area.width + border * 2,
                area.height + border * 2 + bar_height,
            );
            let bar = PixelRect::new(area.x, area.y - bar_height as i32, area.width, bar_height);
            self.fills.push((frame, window.border_color()));
            self.fills.push((bar, window.title_color()));

            let max_chars = (area.width / font.glyph_width.max(1)) as usize;
            for (column, c) in window.title().chars().take(max_chars).enumerate() {
                let glyph = c as u32;
                if font.check_glyph(glyph).is_err() {
                    continue;
                }
                title.push(GlyphQuad {
                    dest: PixelRect::new(
                        bar.x + (column as u32 * font.glyph_width) as i32,
                        bar.y,
                        font.glyph_width,
                        font.glyph_height,
                    ),
                    glyph,
                    foreground: Color::WHITE,
                    background: Color::TRANSPARENT,
                    mirror: Default::default(),
                });
            }
        }
        self.title = Arc::from(title);
        if let Some(window) = surface.window_mut() {
            window.set_dirty(false);
        }
        Ok(true)
    }

    fn render(&self, _surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        for &(rect, color) in &self.fills {
            target.draw(DrawCall::Fill {
                layer: Self::NAME,
                rect,
                color,
            });
        }
        if !self.title.is_empty() {
            target.draw(DrawCall::Quads {
                layer: Self::NAME,
                origin: Point::ZERO,
                quads: Arc::clone(&self.title),
                opacity,
            });
        }
        Ok(())
    }
}

/// Draws the surface's entities, lowest z-index first.
#[derive(Debug)]
pub struct EntityStep {
    lifecycle: StepLifecycle,
    quads: Arc<[GlyphQuad]>,
}

impl EntityStep {
    pub const NAME: &'static str = "entities";

    pub fn new() -> Self {
        Self {
            lifecycle: StepLifecycle::default(),
            quads: empty_quads(),
        }
    }
}

impl Default for EntityStep {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderStep for EntityStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        30
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.quads = empty_quads();
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        let any_dirty = surface.entities().iter().any(|entity| entity.is_dirty());
        if !self.lifecycle.take_refresh(ctx) && !any_dirty {
            return Ok(false);
        }

        let font = *surface.font();
        let mut order: Vec<_> = surface
            .entities()
            .iter()
            .filter(|entity| entity.is_visible())
            .collect();
        order.sort_by_key(|entity| entity.z_index());

        let mut quads = Vec::new();
        for entity in order {
            let origin = entity.pixel_position(&font);
            match entity.appearance() {
                EntityAppearance::Single(engine) => {
                    let cell = engine.appearance();
                    if !cell.is_visible() {
                        continue;
                    }
                    let dest = PixelRect::new(origin.x, origin.y, font.glyph_width, font.glyph_height);
                    quads.push(GlyphQuad {
                        dest,
                        glyph: cell.glyph(),
                        foreground: cell.foreground(),
                        background: cell.background(),
                        mirror: cell.mirror(),
                    });
                    quads.extend(cell.decorators().iter().map(|decorator| GlyphQuad {
                        dest,
                        glyph: decorator.glyph,
                        foreground: decorator.color,
                        background: Color::TRANSPARENT,
                        mirror: decorator.mirror,
                    }));
                }
                EntityAppearance::Surface(animation) => {
                    cell_quads(animation.current_frame(), &font, origin, &mut quads);
                }
            }
        }
        trace!("Entity step rebuilt {} quads", quads.len());
        self.quads = Arc::from(quads);

        for entity in surface.entities_mut() {
            entity.set_dirty(false);
        }
        Ok(true)
    }

    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        if !self.quads.is_empty() {
            target.draw(DrawCall::Quads {
                layer: Self::NAME,
                origin: surface.position(),
                quads: Arc::clone(&self.quads),
                opacity,
            });
        }
        Ok(())
    }
}

/// Draws hosted controls and the focus highlight.
#[derive(Debug, Default)]
pub struct ControlsStep {
    lifecycle: StepLifecycle,
    fills: Vec<(PixelRect, Color)>,
}

impl ControlsStep {
    pub const NAME: &'static str = "controls";

    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderStep for ControlsStep {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn sort_order(&self) -> u32 {
        40
    }

    fn attach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.lifecycle.attach(Self::NAME)
    }

    fn detach(&mut self, _surface: &dyn Surface) -> GridResult<()> {
        self.fills.clear();
        self.lifecycle.detach(Self::NAME)
    }

    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        let controls_dirty = surface.controls().is_some_and(|host| host.is_dirty());
        if !self.lifecycle.take_refresh(ctx) && !controls_dirty {
            return Ok(false);
        }

        self.fills.clear();
        let font = *surface.font();
        if let Some(host) = surface.controls() {
            let rect_of = |origin: Point, width: u32, height: u32| {
                let corner = font.cell_to_pixel(origin);
                PixelRect::new(
                    corner.x,
                    corner.y,
                    width * font.glyph_width,
                    height * font.glyph_height,
                )
            };
            for control in host.controls() {
                self.fills
                    .push((rect_of(control.origin, control.width, control.height), control.color));
            }
            if let Some(focused) = host.focused() {
                self.fills.push((
                    rect_of(focused.origin, focused.width, focused.height),
                    host.focus_color(),
                ));
            }
        }
        if let Some(host) = surface.controls_mut() {
            host.set_dirty(false);
        }
        Ok(true)
    }

    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, _opacity: u8) -> GridResult<()> {
        self.lifecycle.ensure_attached(Self::NAME)?;
        let origin = surface.position();
        for &(rect, color) in &self.fills {
            target.draw(DrawCall::Fill {
                layer: Self::NAME,
                rect: rect.offset(origin),
                color,
            });
        }
        Ok(())
    }
}
