//! # Render Pipelines
//!
//! A pipeline owns the render steps of one surface and runs them in order.
//!
//! Steps live in a generational arena and the ordered step list holds only
//! copyable [`StepId`]s in a [`DeferredList`]. Edits (add, insert, replace,
//! remove, sort) apply to the live list at once, while `refresh` and `render`
//! walk the materialized list. The two are reconciled after every render:
//! new steps are attached, removed ones detached and their slots recycled.
//! A step can therefore remove itself, or add another step, in the middle of
//! a pass without disturbing the pass.

use super::{DrawTarget, RefreshContext, RenderStep};
use crate::{config, DeferredList, GridError, GridResult, Surface};
use log::{debug, trace};
use std::collections::HashMap;

/// Handle to a step inside a pipeline.
///
/// The generation makes handles to removed steps stale, even after their
/// slot has been reused.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StepId {
    index: u32,
    generation: u32,
}

impl StepId {
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.index
    }

    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

#[derive(Debug)]
struct StepSlot {
    generation: u32,
    step: Option<Box<dyn RenderStep>>,
    attached: bool,
}

/// Counters kept across the life of a pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub refreshes: u64,
    pub renders: u64,
    /// Steps that rebuilt their cached data, over all refreshes
    pub regenerations: u64,
    /// Steps that rebuilt their cached data during the latest refresh
    pub last_regenerations: u32,
}

/// The ordered render steps of one surface.
///
/// # Examples
///
/// ```
/// use gridglyph::{
///     FontMetrics, OutputStep, RecordingTarget, RenderPipeline, ScreenSurface, SurfaceStep,
/// };
///
/// let mut pipeline = RenderPipeline::new();
/// pipeline.add_render_step(Box::new(SurfaceStep::new()));
/// pipeline.add_render_step(Box::new(OutputStep::new()));
///
/// let mut screen = ScreenSurface::new("main", 10, 5, FontMetrics::default()).unwrap();
/// pipeline.attach(&screen).unwrap();
/// assert_eq!(pipeline.step_names(), vec!["surface", "output"]);
///
/// pipeline.refresh(&mut screen, false).unwrap();
/// let mut target = RecordingTarget::new();
/// pipeline.render(&screen, &mut target).unwrap();
/// assert_eq!(target.layers(), vec!["surface", "output"]);
/// ```
#[derive(Debug)]
pub struct RenderPipeline {
    steps: DeferredList<StepId>,
    slots: Vec<StepSlot>,
    free: Vec<u32>,
    opacity: u8,
    is_forced: bool,
    is_attached: bool,
    stats: PipelineStats,
}

impl RenderPipeline {
    /// An empty, unattached pipeline at the default opacity.
    pub fn new() -> Self {
        Self {
            steps: DeferredList::new(),
            slots: Vec::new(),
            free: Vec::new(),
            opacity: config::DEFAULT_OPACITY,
            is_forced: false,
            is_attached: false,
            stats: PipelineStats::default(),
        }
    }

    /// Builds a pipeline whose steps are already materialized, in the given
    /// order.
    pub fn from_steps(steps: Vec<Box<dyn RenderStep>>) -> GridResult<Self> {
        let mut pipeline = Self::new();
        for step in steps {
            pipeline.add_render_step(step);
        }
        pipeline.flush(None)?;
        Ok(pipeline)
    }

    /// Opacity applied to every step's draw calls.
    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    /// Takes effect on the next render; cached data stays valid.
    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
    }

    pub fn is_forced(&self) -> bool {
        self.is_forced
    }

    /// Makes the next refresh regenerate every step.
    pub fn set_forced(&mut self, forced: bool) {
        self.is_forced = forced;
    }

    /// Whether the pipeline currently belongs to a surface.
    pub fn is_attached(&self) -> bool {
        self.is_attached
    }

    /// Refresh and render counters since the pipeline was created.
    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    /// Number of materialized steps.
    pub fn len(&self) -> usize {
        self.steps.cached().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.cached().is_empty()
    }

    /// Edits waiting for the next flush.
    pub fn pending_changes(&self) -> usize {
        self.steps.pending_changes()
    }

    /// Looks up a step by id; stale ids yield `None`.
    pub fn step(&self, id: StepId) -> Option<&dyn RenderStep> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.step.as_deref())
    }

    /// The materialized steps, in execution order.
    pub fn render_steps(&self) -> impl Iterator<Item = &dyn RenderStep> + '_ {
        self.steps.cached().iter().filter_map(move |&id| self.step(id))
    }

    /// Names of the materialized steps, in execution order.
    pub fn step_names(&self) -> Vec<&'static str> {
        self.render_steps().map(|step| step.name()).collect()
    }

    /// Names of the live steps, including edits not yet flushed.
    pub fn live_step_names(&self) -> Vec<&'static str> {
        self.steps
            .items()
            .iter()
            .filter_map(|&id| self.step(id))
            .map(|step| step.name())
            .collect()
    }

    /// Whether a live step is called `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.find_live(name).is_some()
    }

    /// Live id of the step called `name`.
    pub fn find_live(&self, name: &str) -> Option<StepId> {
        self.steps
            .items()
            .iter()
            .copied()
            .find(|&id| self.step(id).is_some_and(|step| step.name() == name))
    }

    fn allocate(&mut self, step: Box<dyn RenderStep>) -> StepId {
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.step = Some(step);
                slot.attached = false;
                StepId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(StepSlot {
                    generation: 0,
                    step: Some(step),
                    attached: false,
                });
                StepId { index, generation: 0 }
            }
        }
    }

    fn release(&mut self, index: u32) {
        if let Some(slot) = self.slots.get_mut(index as usize) {
            slot.step = None;
            slot.attached = false;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(index);
        }
    }

    /// Appends a step. It runs from the next frame on.
    pub fn add_render_step(&mut self, step: Box<dyn RenderStep>) -> StepId {
        debug!("Adding render step '{}'", step.name());
        let id = self.allocate(step);
        self.steps.add(id);
        id
    }

    /// Inserts a step at `index` of the live list.
    pub fn insert_render_step(&mut self, index: usize, step: Box<dyn RenderStep>) -> GridResult<StepId> {
        debug!("Inserting render step '{}' at {}", step.name(), index);
        let id = self.allocate(step);
        if let Err(err) = self.steps.insert(index, id) {
            self.release(id.index);
            return Err(err);
        }
        Ok(id)
    }

    /// Removes a step. It keeps running until the next flush. Returns whether
    /// the step was in the live list.
    pub fn remove_render_step(&mut self, id: StepId) -> bool {
        let removed = self.steps.remove(&id);
        if removed {
            debug!("Removing render step {:?}", id);
        }
        removed
    }

    /// Removes the live step called `name`.
    pub fn remove_by_name(&mut self, name: &str) -> Option<StepId> {
        let id = self.find_live(name)?;
        self.remove_render_step(id);
        Some(id)
    }

    /// Puts `step` in place of the live step called `name`.
    pub fn replace_render_step(&mut self, name: &str, step: Box<dyn RenderStep>) -> GridResult<StepId> {
        let old = self
            .find_live(name)
            .ok_or_else(|| GridError::UnknownStep(name.to_string()))?;
        let index = self
            .steps
            .index_of(&old)
            .ok_or_else(|| GridError::InvalidState(format!("step '{}' lost its position", name)))?;
        debug!("Replacing render step '{}' with '{}'", name, step.name());
        let id = self.allocate(step);
        self.steps.replace(index, id)?;
        Ok(id)
    }

    /// Orders the live steps by their sort order. Steps with equal order keep
    /// their relative position.
    pub fn sort_steps(&mut self) {
        let orders: HashMap<StepId, u32> = self
            .steps
            .items()
            .iter()
            .filter_map(|&id| self.step(id).map(|step| (id, step.sort_order())))
            .collect();
        self.steps
            .sort_by(move |a, b| orders.get(a).cmp(&orders.get(b)));
    }

    /// Associates the pipeline with `surface`, attaching every step.
    pub fn attach(&mut self, surface: &dyn Surface) -> GridResult<()> {
        if self.is_attached {
            return Err(GridError::AlreadyAttached("render pipeline".to_string()));
        }
        self.flush(Some(surface))?;
        self.is_attached = true;
        self.is_forced = true;
        debug!("Render pipeline attached with {} steps", self.len());
        Ok(())
    }

    /// Releases every step's resources for `surface`.
    pub fn detach(&mut self, surface: &dyn Surface) -> GridResult<()> {
        if !self.is_attached {
            return Err(GridError::NotAttached("render pipeline".to_string()));
        }
        for slot in &mut self.slots {
            if let (Some(step), true) = (slot.step.as_mut(), slot.attached) {
                step.detach(surface)?;
                slot.attached = false;
            }
        }
        self.is_attached = false;
        debug!("Render pipeline detached");
        Ok(())
    }

    fn ensure_attached(&self) -> GridResult<()> {
        if !self.is_attached {
            return Err(GridError::NotAttached("render pipeline".to_string()));
        }
        Ok(())
    }

    /// Lets every materialized step regenerate its cached data.
    ///
    /// A step error aborts the pass and is returned as is.
    pub fn refresh(&mut self, surface: &mut dyn Surface, force: bool) -> GridResult<()> {
        self.ensure_attached()?;
        let mut ctx = RefreshContext::new(force || self.is_forced, surface.is_dirty());
        let mut regenerated = 0u32;

        for position in 0..self.steps.cached().len() {
            let id = self.steps.cached()[position];
            let step = self
                .slots
                .get_mut(id.index as usize)
                .filter(|slot| slot.generation == id.generation)
                .and_then(|slot| slot.step.as_mut())
                .ok_or_else(|| GridError::InvalidState(format!("stale render step {:?}", id)))?;
            if step.refresh(surface, &mut ctx)? {
                regenerated += 1;
            }
            if ctx.take_removal() {
                debug!("Render step {:?} asked to be removed", id);
                self.steps.remove(&id);
            }
        }
        for step in ctx.take_additions() {
            self.add_render_step(step);
        }

        trace!("Pipeline refresh regenerated {} steps", regenerated);
        self.stats.refreshes += 1;
        self.stats.regenerations += u64::from(regenerated);
        self.stats.last_regenerations = regenerated;
        self.is_forced = false;
        Ok(())
    }

    /// Emits every materialized step's draw calls, then flushes pending
    /// edits.
    pub fn render(&mut self, surface: &dyn Surface, target: &mut dyn DrawTarget) -> GridResult<()> {
        self.ensure_attached()?;
        for step in self.render_steps() {
            step.render(surface, target, self.opacity)?;
        }
        self.stats.renders += 1;
        self.flush(Some(surface))
    }

    /// Applies pending edits to the materialized list and reconciles the
    /// arena with it: listed steps get attached, unlisted ones detached and
    /// their slots recycled.
    fn flush(&mut self, surface: Option<&dyn Surface>) -> GridResult<()> {
        if self.steps.pending_changes() > 0 {
            self.steps.flush_changes_to_cache()?;
            trace!("Pipeline flushed to {} steps", self.steps.cached().len());
        }

        for index in 0..self.slots.len() {
            if self.slots[index].step.is_none() {
                continue;
            }
            let id = StepId {
                index: index as u32,
                generation: self.slots[index].generation,
            };
            let in_list = self.steps.cached().contains(&id);
            let attached = self.slots[index].attached;
            match (in_list, attached, surface) {
                (true, false, Some(surface)) => {
                    if let Some(step) = self.slots[index].step.as_mut() {
                        step.attach(surface)?;
                    }
                    self.slots[index].attached = true;
                }
                (false, true, Some(surface)) => {
                    if let Some(step) = self.slots[index].step.as_mut() {
                        step.detach(surface)?;
                    }
                    self.release(id.index);
                }
                (false, _, _) => self.release(id.index),
                _ => {}
            }
        }
        Ok(())
    }
}

impl Default for RenderPipeline {
    fn default() -> Self {
        Self::new()
    }
}
