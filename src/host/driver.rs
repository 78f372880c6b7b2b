//! # Frame Driver
//!
//! Runs the two-phase frame over a set of surfaces: update everything first,
//! then refresh and render each surface's pipeline in insertion order.

use super::EngineConfig;
use crate::{DrawCall, DrawTarget, GridError, GridResult, ScreenSurface, StepRegistry};
use log::{debug, info, trace};
use std::time::Duration;

/// What happened during one call to [`FrameDriver::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame number, starting at 1
    pub frame: u64,
    /// Surfaces that were drawn
    pub surfaces: usize,
    /// Surfaces whose update phase changed something
    pub changed: usize,
    /// Render steps that rebuilt cached data this frame
    pub regenerations: u32,
    /// Draw calls handed to the target
    pub draw_calls: usize,
}

/// Forwards calls to the host target while counting them.
struct CountingTarget<'a> {
    inner: &'a mut dyn DrawTarget,
    count: usize,
}

impl DrawTarget for CountingTarget<'_> {
    fn draw(&mut self, call: DrawCall) {
        self.count += 1;
        self.inner.draw(call);
    }
}

/// Owns the surfaces of a host and drives them frame by frame.
///
/// # Examples
///
/// ```
/// use gridglyph::{Color, EngineConfig, FrameDriver, Point, RecordingTarget};
/// use std::time::Duration;
///
/// let mut driver = FrameDriver::new(EngineConfig::for_testing()).unwrap();
/// let index = driver.create_surface("main").unwrap();
/// driver.surface_mut(index).unwrap().print(Point::new(0, 0), "hi", Color::WHITE).unwrap();
///
/// let mut target = RecordingTarget::new();
/// let report = driver.tick(Duration::from_millis(16), &mut target).unwrap();
/// assert_eq!(report.frame, 1);
/// assert!(report.regenerations > 0);
/// assert!(target.quad_count() >= 2);
/// ```
#[derive(Debug)]
pub struct FrameDriver {
    config: EngineConfig,
    registry: StepRegistry,
    surfaces: Vec<ScreenSurface>,
    frame: u64,
}

impl FrameDriver {
    /// Creates a driver that knows the built-in render steps.
    pub fn new(config: EngineConfig) -> GridResult<Self> {
        Self::with_registry(config, StepRegistry::with_builtins())
    }

    /// Creates a driver with a host-supplied registry.
    pub fn with_registry(config: EngineConfig, registry: StepRegistry) -> GridResult<Self> {
        config.validate(&registry)?;
        info!(
            "Frame driver ready: {}x{} surfaces, steps {:?}",
            config.surface_width, config.surface_height, config.render_steps
        );
        Ok(Self {
            config,
            registry,
            surfaces: Vec::new(),
            frame: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    /// Adds a surface; one without a renderer gets the configured pipeline.
    /// Returns the surface's index.
    pub fn add_surface(&mut self, mut surface: ScreenSurface) -> GridResult<usize> {
        if surface.renderer().is_none() {
            let mut pipeline = self.registry.pipeline(&self.config.render_steps)?;
            pipeline.set_opacity(self.config.opacity);
            surface.set_renderer(Some(pipeline))?;
        }
        debug!("Adding surface '{}'", surface.name());
        self.surfaces.push(surface);
        Ok(self.surfaces.len() - 1)
    }

    /// Creates a surface sized and rendered as configured.
    pub fn create_surface(&mut self, name: &str) -> GridResult<usize> {
        let surface = ScreenSurface::new(
            name,
            self.config.surface_width,
            self.config.surface_height,
            self.config.font,
        )?;
        self.add_surface(surface)
    }

    /// Removes a surface and detaches its renderer.
    pub fn remove_surface(&mut self, index: usize) -> GridResult<ScreenSurface> {
        self.check_index(index)?;
        let mut surface = self.surfaces.remove(index);
        if surface.renderer().is_some() {
            surface.detach_renderer()?;
        }
        debug!("Removed surface '{}'", surface.name());
        Ok(surface)
    }

    pub fn surfaces(&self) -> &[ScreenSurface] {
        &self.surfaces
    }

    pub fn surface(&self, index: usize) -> Option<&ScreenSurface> {
        self.surfaces.get(index)
    }

    pub fn surface_mut(&mut self, index: usize) -> Option<&mut ScreenSurface> {
        self.surfaces.get_mut(index)
    }

    pub fn surface_by_name(&self, name: &str) -> Option<&ScreenSurface> {
        self.surfaces.iter().find(|surface| surface.name() == name)
    }

    /// Runs one frame: every surface updates by `delta`, then each one
    /// refreshes and renders into `target`. The first failing step aborts the
    /// frame.
    pub fn tick(&mut self, delta: Duration, target: &mut dyn DrawTarget) -> GridResult<FrameReport> {
        self.frame += 1;
        let mut report = FrameReport {
            frame: self.frame,
            surfaces: self.surfaces.len(),
            ..FrameReport::default()
        };

        report.changed = self
            .surfaces
            .iter_mut()
            .map(|surface| surface.update(delta))
            .filter(|changed| *changed)
            .count();

        let mut counting = CountingTarget {
            inner: target,
            count: 0,
        };
        for surface in &mut self.surfaces {
            surface.refresh(false)?;
            report.regenerations += surface
                .renderer()
                .map_or(0, |pipeline| pipeline.stats().last_regenerations);
            surface.render(&mut counting)?;
        }
        report.draw_calls = counting.count;

        trace!("Frame {} finished: {:?}", self.frame, report);
        Ok(report)
    }

    /// Forces every pipeline to rebuild on the next frame.
    pub fn invalidate_all(&mut self) {
        for pipeline in self.surfaces.iter_mut().filter_map(ScreenSurface::renderer_mut) {
            pipeline.set_forced(true);
        }
    }

    fn check_index(&self, index: usize) -> GridResult<()> {
        if index >= self.surfaces.len() {
            return Err(GridError::OutOfRange {
                what: "surface",
                index,
                limit: self.surfaces.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, ColoredGlyph, Entity, Point, RecordingTarget};

    const FRAME: Duration = Duration::from_millis(16);

    #[test]
    fn test_second_frame_without_changes_regenerates_nothing() {
        let mut driver = FrameDriver::new(EngineConfig::new()).unwrap();
        driver.create_surface("main").unwrap();

        let mut target = RecordingTarget::new();
        let first = driver.tick(FRAME, &mut target).unwrap();
        assert!(first.regenerations > 0);
        assert!(first.draw_calls > 0);

        target.clear();
        let second = driver.tick(FRAME, &mut target).unwrap();
        assert_eq!(second.frame, 2);
        assert_eq!(second.regenerations, 0);
        assert_eq!(second.changed, 0);
        assert_eq!(second.draw_calls, target.calls().len());
    }

    #[test]
    fn test_invalidate_all_forces_rebuild() {
        let mut driver = FrameDriver::new(EngineConfig::new()).unwrap();
        driver.create_surface("a").unwrap();
        let mut target = RecordingTarget::new();
        driver.tick(FRAME, &mut target).unwrap();

        driver.invalidate_all();
        let report = driver.tick(FRAME, &mut target).unwrap();
        // surface and tint rebuild; output has no cache
        assert_eq!(report.regenerations, 2);
    }

    #[test]
    fn test_surfaces_render_in_insertion_order() {
        let mut driver = FrameDriver::new(EngineConfig::for_testing()).unwrap();
        driver.create_surface("back").unwrap();
        let front = driver.create_surface("front").unwrap();
        driver
            .surface_mut(front)
            .unwrap()
            .add_entity(Entity::new(ColoredGlyph::new(Color::RED, Color::BLACK, 64), 0));

        let mut target = RecordingTarget::new();
        let report = driver.tick(FRAME, &mut target).unwrap();
        assert_eq!(report.surfaces, 2);
        let composites = target
            .calls()
            .iter()
            .filter(|call| matches!(call, DrawCall::Composite { .. }))
            .count();
        assert_eq!(composites, 2);
        assert!(driver.surface_by_name("front").is_some());
    }

    #[test]
    fn test_remove_surface_checks_index() {
        let mut driver = FrameDriver::new(EngineConfig::new()).unwrap();
        driver.create_surface("only").unwrap();
        assert!(matches!(
            driver.remove_surface(3),
            Err(GridError::OutOfRange { what: "surface", .. })
        ));
        let surface = driver.remove_surface(0).unwrap();
        assert!(surface.renderer().is_none());
        assert!(driver.surfaces().is_empty());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::new();
        config.render_steps = vec!["surface".to_string(), "glow".to_string()];
        assert!(FrameDriver::new(config).is_err());
    }

    #[test]
    fn test_print_marks_surface_for_redraw() {
        let mut driver = FrameDriver::new(EngineConfig::new()).unwrap();
        let index = driver.create_surface("main").unwrap();
        let mut target = RecordingTarget::new();
        driver.tick(FRAME, &mut target).unwrap();

        driver
            .surface_mut(index)
            .unwrap()
            .print(Point::new(1, 1), "x", Color::GREEN)
            .unwrap();
        let report = driver.tick(FRAME, &mut target).unwrap();
        assert!(report.regenerations > 0);
    }
}
