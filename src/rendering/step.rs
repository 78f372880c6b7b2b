//! # Render Steps
//!
//! The polymorphic drawing unit of a pipeline.

use crate::{DrawTarget, GridError, GridResult, Surface};
use std::fmt;

/// A named drawing stage attached to one surface.
///
/// `refresh` may mutate the surface (the output step clears its dirty flag)
/// and rebuilds cached draw data when needed, returning whether it did.
/// `render` only reads and emits draw calls.
pub trait RenderStep: fmt::Debug {
    /// Stable identifier used by registries and name lookups.
    fn name(&self) -> &'static str;

    /// Position used when the pipeline is sorted; lower runs first.
    fn sort_order(&self) -> u32;

    /// Allocates per-surface resources.
    fn attach(&mut self, surface: &dyn Surface) -> GridResult<()>;

    /// Releases what `attach` allocated.
    fn detach(&mut self, surface: &dyn Surface) -> GridResult<()>;

    /// Regenerates cached draw data if needed; returns whether it did.
    fn refresh(&mut self, surface: &mut dyn Surface, ctx: &mut RefreshContext) -> GridResult<bool>;

    /// Emits draw calls from cached data.
    fn render(&self, surface: &dyn Surface, target: &mut dyn DrawTarget, opacity: u8) -> GridResult<()>;
}

/// Attach bookkeeping shared by the built-in steps.
///
/// A freshly attached step has never built its cache, so it counts as dirty
/// until its first refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepLifecycle {
    attached: bool,
    needs_refresh: bool,
}

impl StepLifecycle {
    pub fn attach(&mut self, step: &str) -> GridResult<()> {
        if self.attached {
            return Err(GridError::AlreadyAttached(format!("render step '{}'", step)));
        }
        self.attached = true;
        self.needs_refresh = true;
        Ok(())
    }

    pub fn detach(&mut self, step: &str) -> GridResult<()> {
        self.ensure_attached(step)?;
        self.attached = false;
        Ok(())
    }

    pub fn ensure_attached(&self, step: &str) -> GridResult<()> {
        if !self.attached {
            return Err(GridError::NotAttached(format!("render step '{}'", step)));
        }
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Whether the step must rebuild this pass; clears the step's own flag.
    pub fn take_refresh(&mut self, ctx: &RefreshContext) -> bool {
        let needed = self.needs_refresh || ctx.should_regenerate();
        self.needs_refresh = false;
        needed
    }

    /// Forces a rebuild on the next refresh.
    pub fn invalidate(&mut self) {
        self.needs_refresh = true;
    }
}

/// State shared by every step during one refresh pass.
///
/// Steps can ask for their own removal or queue new steps. Both edits hit the
/// pipeline's live list only, so the pass in progress keeps iterating the
/// list it started with.
#[derive(Debug, Default)]
pub struct RefreshContext {
    forced: bool,
    surface_dirty: bool,
    remove_current: bool,
    additions: Vec<Box<dyn RenderStep>>,
}

impl RefreshContext {
    /// `surface_dirty` is captured once, so later steps still see the surface
    /// as dirty after the output step cleared it.
    pub fn new(forced: bool, surface_dirty: bool) -> Self {
        Self {
            forced,
            surface_dirty,
            ..Self::default()
        }
    }

    pub fn is_forced(&self) -> bool {
        self.forced
    }

    pub fn surface_dirty(&self) -> bool {
        self.surface_dirty
    }

    pub fn should_regenerate(&self) -> bool {
        self.forced || self.surface_dirty
    }

    /// Removes the step currently refreshing once the frame is flushed.
    pub fn request_removal(&mut self) {
        self.remove_current = true;
    }

    /// Adds a step to the pipeline once the frame is flushed.
    pub fn request_add(&mut self, step: Box<dyn RenderStep>) {
        self.additions.push(step);
    }

    pub(crate) fn take_removal(&mut self) -> bool {
        std::mem::take(&mut self.remove_current)
    }

    pub(crate) fn take_additions(&mut self) -> Vec<Box<dyn RenderStep>> {
        std::mem::take(&mut self.additions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle_rejects_double_attach_and_stray_detach() {
        let mut lifecycle = StepLifecycle::default();
        assert!(matches!(lifecycle.detach("x"), Err(GridError::NotAttached(_))));
        lifecycle.attach("x").unwrap();
        assert!(matches!(lifecycle.attach("x"), Err(GridError::AlreadyAttached(_))));
        lifecycle.detach("x").unwrap();
        assert!(!lifecycle.is_attached());
    }

    #[test]
    fn test_fresh_step_refreshes_once() {
        let mut lifecycle = StepLifecycle::default();
        lifecycle.attach("x").unwrap();
        let clean = RefreshContext::new(false, false);
        assert!(lifecycle.take_refresh(&clean));
        assert!(!lifecycle.take_refresh(&clean));
        assert!(lifecycle.take_refresh(&RefreshContext::new(true, false)));
    }
}
