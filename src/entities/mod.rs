//! # Entities Module
//!
//! Positioned objects drawn by the entity layer of a surface.
//!
//! An entity's look is a tagged union: either a single animated cell
//! ([`AppearanceEffectEngine`]) or a multi-cell [`AnimatedSurface`]. Only one
//! variant exists at a time, so there is no inactive payload to fall out of
//! sync. Asking for the variant that is not active is an error, and the only
//! way to switch is to hand over the new payload.
//!
//! Every visual change raises the entity's dirty flag. An optional observer
//! registered at construction hears every transition of that flag.

pub mod animated;
pub mod record;

pub use animated::*;
pub use record::*;

use crate::{
    AppearanceEffectEngine, CellEffect, ColoredGlyph, FontMetrics, GridError, GridResult, Point,
};
use log::debug;
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Stable identity of an entity across saves.
pub type EntityId = Uuid;

/// Which appearance variant an entity is using.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppearanceMode {
    Single,
    Surface,
}

impl AppearanceMode {
    pub fn name(self) -> &'static str {
        match self {
            AppearanceMode::Single => "single",
            AppearanceMode::Surface => "surface",
        }
    }
}

impl fmt::Display for AppearanceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The active look of an entity.
#[derive(Debug, Clone)]
pub enum EntityAppearance {
    Single(AppearanceEffectEngine),
    Surface(AnimatedSurface),
}

impl EntityAppearance {
    pub fn mode(&self) -> AppearanceMode {
        match self {
            EntityAppearance::Single(_) => AppearanceMode::Single,
            EntityAppearance::Surface(_) => AppearanceMode::Surface,
        }
    }

    pub fn is_dirty(&self) -> bool {
        match self {
            EntityAppearance::Single(engine) => engine.is_dirty(),
            EntityAppearance::Surface(animation) => animation.is_dirty(),
        }
    }

    fn set_dirty(&mut self, dirty: bool) {
        match self {
            EntityAppearance::Single(engine) => engine.set_dirty(dirty),
            EntityAppearance::Surface(animation) => animation.set_dirty(dirty),
        }
    }
}

impl From<ColoredGlyph> for EntityAppearance {
    fn from(glyph: ColoredGlyph) -> Self {
        EntityAppearance::Single(AppearanceEffectEngine::new(glyph))
    }
}

impl From<AnimatedSurface> for EntityAppearance {
    fn from(animation: AnimatedSurface) -> Self {
        EntityAppearance::Surface(animation)
    }
}

/// A change of an entity's dirty flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyChange {
    pub entity: EntityId,
    pub is_dirty: bool,
}

/// Callback notified whenever an entity's dirty flag flips.
pub type DirtyObserver = Box<dyn FnMut(DirtyChange)>;

/// A positioned object with a single-cell or multi-cell appearance.
///
/// Positions are in cells unless pixel positioning is enabled.
///
/// # Examples
///
/// ```
/// use std::cell::RefCell;
/// use std::rc::Rc;
/// use gridglyph::{Color, ColoredGlyph, Entity, Point};
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let log = Rc::clone(&seen);
/// let mut entity = Entity::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 64), 1)
///     .with_dirty_observer(move |change| log.borrow_mut().push(change.is_dirty));
///
/// entity.set_dirty(false);
/// entity.set_position(Point::new(2, 3));
/// assert_eq!(*seen.borrow(), vec![false, true]);
/// ```
pub struct Entity {
    id: EntityId,
    name: String,
    position: Point,
    z_index: i32,
    use_pixel_positioning: bool,
    is_visible: bool,
    appearance: EntityAppearance,
    observer: Option<DirtyObserver>,
    reported_dirty: bool,
}

impl Entity {
    /// Creates a single-cell entity drawn at `z_index`.
    pub fn new(appearance: ColoredGlyph, z_index: i32) -> Self {
        Self::with_appearance(EntityAppearance::from(appearance), z_index)
    }

    /// Creates a multi-cell entity drawn at `z_index`.
    pub fn with_surface(animation: AnimatedSurface, z_index: i32) -> Self {
        Self::with_appearance(EntityAppearance::from(animation), z_index)
    }

    pub fn with_appearance(appearance: EntityAppearance, z_index: i32) -> Self {
        let mut entity = Self {
            id: Uuid::new_v4(),
            name: String::new(),
            position: Point::ZERO,
            z_index,
            use_pixel_positioning: false,
            is_visible: true,
            appearance,
            observer: None,
            reported_dirty: false,
        };
        entity.anchor_surface();
        entity.reported_dirty = entity.is_dirty();
        entity
    }

    /// Registers the dirty observer. It hears transitions from here on.
    pub fn with_dirty_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(DirtyChange) + 'static,
    {
        self.observer = Some(Box::new(observer));
        self.reported_dirty = self.is_dirty();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_position(mut self, position: Point) -> Self {
        self.set_position(position);
        self
    }

    pub fn with_pixel_positioning(mut self, enabled: bool) -> Self {
        self.set_use_pixel_positioning(enabled);
        self
    }

    pub(crate) fn with_id(mut self, id: EntityId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> EntityId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn position(&self) -> Point {
        self.position
    }

    /// Moves the entity; any actual move marks it dirty.
    pub fn set_position(&mut self, position: Point) {
        if self.position == position {
            return;
        }
        self.position = position;
        self.anchor_surface();
        self.appearance.set_dirty(true);
        self.report();
    }

    pub fn z_index(&self) -> i32 {
        self.z_index
    }

    pub fn set_z_index(&mut self, z_index: i32) {
        if self.z_index != z_index {
            self.z_index = z_index;
            self.appearance.set_dirty(true);
            self.report();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.is_visible != visible {
            self.is_visible = visible;
            self.appearance.set_dirty(true);
            self.report();
        }
    }

    pub fn use_pixel_positioning(&self) -> bool {
        self.use_pixel_positioning
    }

    pub fn set_use_pixel_positioning(&mut self, enabled: bool) {
        if self.use_pixel_positioning != enabled {
            self.use_pixel_positioning = enabled;
            self.appearance.set_dirty(true);
            self.report();
        }
    }

    pub fn mode(&self) -> AppearanceMode {
        self.appearance.mode()
    }

    pub fn appearance(&self) -> &EntityAppearance {
        &self.appearance
    }

    /// Confirms the entity already uses `mode`.
    ///
    /// Switching variants needs the new payload, so any other mode is
    /// rejected; use [`replace_appearance`](Self::replace_appearance).
    pub fn set_mode(&mut self, mode: AppearanceMode) -> GridResult<()> {
        let active = self.mode();
        if mode != active {
            return Err(GridError::InactiveAppearance {
                requested: mode.name(),
                active: active.name(),
            });
        }
        Ok(())
    }

    /// Swaps in a new appearance, switching variants if needed. Returns the
    /// previous appearance.
    pub fn replace_appearance(&mut self, appearance: EntityAppearance) -> EntityAppearance {
        debug!(
            "Entity {} switching appearance {} -> {}",
            self.id,
            self.mode(),
            appearance.mode()
        );
        let previous = std::mem::replace(&mut self.appearance, appearance);
        self.anchor_surface();
        self.appearance.set_dirty(true);
        self.report();
        previous
    }

    fn inactive(&self, requested: AppearanceMode) -> GridError {
        GridError::InactiveAppearance {
            requested: requested.name(),
            active: self.mode().name(),
        }
    }

    fn engine(&self) -> GridResult<&AppearanceEffectEngine> {
        match &self.appearance {
            EntityAppearance::Single(engine) => Ok(engine),
            EntityAppearance::Surface(_) => Err(self.inactive(AppearanceMode::Single)),
        }
    }

    fn engine_mut(&mut self) -> GridResult<&mut AppearanceEffectEngine> {
        match &mut self.appearance {
            EntityAppearance::Single(engine) => Ok(engine),
            EntityAppearance::Surface(_) => Err(GridError::InactiveAppearance {
                requested: AppearanceMode::Single.name(),
                active: AppearanceMode::Surface.name(),
            }),
        }
    }

    /// The single-cell appearance; fails for surface-backed entities.
    pub fn single_appearance(&self) -> GridResult<&ColoredGlyph> {
        self.engine().map(AppearanceEffectEngine::appearance)
    }

    /// Assigns the single-cell appearance outright; fails for surface-backed
    /// entities.
    pub fn set_single_appearance(&mut self, appearance: ColoredGlyph) -> GridResult<()> {
        self.engine_mut()?.set_appearance(appearance);
        self.report();
        Ok(())
    }

    /// The multi-cell appearance; fails for single-cell entities.
    pub fn surface(&self) -> GridResult<&AnimatedSurface> {
        match &self.appearance {
            EntityAppearance::Surface(animation) => Ok(animation),
            EntityAppearance::Single(_) => Err(self.inactive(AppearanceMode::Surface)),
        }
    }

    /// Mutable multi-cell appearance; fails for single-cell entities.
    ///
    /// Frame edits raise the animation's dirty flag; the observer hears about
    /// it on the next [`update`](Self::update).
    pub fn surface_mut(&mut self) -> GridResult<&mut AnimatedSurface> {
        match &mut self.appearance {
            EntityAppearance::Surface(animation) => Ok(animation),
            EntityAppearance::Single(_) => Err(GridError::InactiveAppearance {
                requested: AppearanceMode::Surface.name(),
                active: AppearanceMode::Single.name(),
            }),
        }
    }

    /// The effect on the single-cell appearance.
    pub fn effect(&self) -> GridResult<Option<&dyn CellEffect>> {
        Ok(self.engine()?.effect())
    }

    /// Attaches, replaces or removes the effect; returns whether the
    /// appearance changed.
    pub fn set_effect(&mut self, effect: Option<Box<dyn CellEffect>>) -> GridResult<bool> {
        let changed = self.engine_mut()?.set_effect(effect);
        self.report();
        Ok(changed)
    }

    /// Attaches a private copy of a `clone_on_add` template.
    pub fn set_effect_from(&mut self, template: &dyn CellEffect) -> GridResult<bool> {
        let changed = self.engine_mut()?.set_effect_from(template)?;
        self.report();
        Ok(changed)
    }

    /// Advances the active appearance. Returns whether it changed.
    pub fn update(&mut self, delta: Duration) -> bool {
        let changed = match &mut self.appearance {
            EntityAppearance::Single(engine) => engine.update(delta),
            EntityAppearance::Surface(animation) => animation.update(delta),
        };
        self.report();
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.appearance.is_dirty()
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.appearance.set_dirty(dirty);
        self.report();
    }

    /// Position the entity is drawn from.
    ///
    /// A surface-backed entity reports its own position only under pixel
    /// positioning; otherwise it reports the top-left cell of its frame.
    pub fn absolute_position(&self) -> Point {
        match &self.appearance {
            EntityAppearance::Single(_) => self.position,
            EntityAppearance::Surface(_) if self.use_pixel_positioning => self.position,
            EntityAppearance::Surface(animation) => animation.position(),
        }
    }

    /// Top-left pixel of the entity's drawing area.
    pub fn pixel_position(&self, font: &FontMetrics) -> Point {
        match &self.appearance {
            EntityAppearance::Surface(animation) if self.use_pixel_positioning => {
                self.position - font.cell_to_pixel(animation.center())
            }
            _ if self.use_pixel_positioning => self.position,
            _ => font.cell_to_pixel(self.absolute_position()),
        }
    }

    fn anchor_surface(&mut self) {
        if let EntityAppearance::Surface(animation) = &mut self.appearance {
            animation.anchor_at(self.position);
        }
    }

    /// Notifies the observer when the dirty flag differs from what it last
    /// heard.
    fn report(&mut self) {
        let is_dirty = self.is_dirty();
        if is_dirty == self.reported_dirty {
            return;
        }
        self.reported_dirty = is_dirty;
        if let Some(observer) = self.observer.as_mut() {
            observer(DirtyChange {
                entity: self.id,
                is_dirty,
            });
        }
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("position", &self.position)
            .field("z_index", &self.z_index)
            .field("use_pixel_positioning", &self.use_pixel_positioning)
            .field("is_visible", &self.is_visible)
            .field("appearance", &self.appearance)
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}
