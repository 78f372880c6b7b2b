//! # Step Registry
//!
//! Maps stable step names to factories so pipelines can be described by
//! name, in configuration files or by the host.

use super::{
    ControlsStep, CursorStep, EntityStep, OutputStep, RenderPipeline, RenderStep, SurfaceStep,
    TintStep, WindowStep,
};
use crate::{config, GridError, GridResult};
use log::debug;
use std::collections::BTreeMap;
use std::fmt;

fn boxed<S: RenderStep + Default + 'static>() -> Box<dyn RenderStep> {
    Box::new(S::default())
}

/// Creates a fresh, unattached step.
pub type StepFactory = Box<dyn Fn() -> Box<dyn RenderStep>>;

/// Name to factory lookup for render steps.
///
/// # Examples
///
/// ```
/// use gridglyph::StepRegistry;
///
/// let registry = StepRegistry::with_builtins();
/// let pipeline = registry.pipeline(&["surface", "entities", "output"]).unwrap();
/// assert_eq!(pipeline.step_names(), vec!["surface", "entities", "output"]);
/// assert!(registry.create("sparkles").is_err());
/// ```
#[derive(Default)]
pub struct StepRegistry {
    factories: BTreeMap<String, StepFactory>,
}

impl StepRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry knowing every built-in step.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, fn() -> Box<dyn RenderStep>); 7] = [
            (WindowStep::NAME, boxed::<WindowStep>),
            (SurfaceStep::NAME, boxed::<SurfaceStep>),
            (EntityStep::NAME, boxed::<EntityStep>),
            (ControlsStep::NAME, boxed::<ControlsStep>),
            (OutputStep::NAME, boxed::<OutputStep>),
            (CursorStep::NAME, boxed::<CursorStep>),
            (TintStep::NAME, boxed::<TintStep>),
        ];
        for (name, factory) in builtins {
            registry.factories.insert(name.to_string(), Box::new(factory));
        }
        registry
    }

    /// Registers a factory under `name`; names are unique.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> GridResult<()>
    where
        F: Fn() -> Box<dyn RenderStep> + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(GridError::InvalidOperation(format!(
                "render step '{}' is already registered",
                name
            )));
        }
        debug!("Registering render step '{}'", name);
        self.factories.insert(name, Box::new(factory));
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.factories.keys().map(String::as_str)
    }

    pub fn create(&self, name: &str) -> GridResult<Box<dyn RenderStep>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| GridError::UnknownStep(name.to_string()))?;
        Ok(factory())
    }

    /// Checks that every name is registered.
    pub fn validate<S: AsRef<str>>(&self, names: &[S]) -> GridResult<()> {
        match names.iter().find(|name| !self.contains(name.as_ref())) {
            Some(unknown) => Err(GridError::UnknownStep(unknown.as_ref().to_string())),
            None => Ok(()),
        }
    }

    /// Builds an unattached pipeline with the named steps, in order.
    pub fn pipeline<S: AsRef<str>>(&self, names: &[S]) -> GridResult<RenderPipeline> {
        let steps = names
            .iter()
            .map(|name| self.create(name.as_ref()))
            .collect::<GridResult<Vec<_>>>()?;
        RenderPipeline::from_steps(steps)
    }

    /// Builds a pipeline with the default steps every new surface gets.
    pub fn default_pipeline(&self) -> GridResult<RenderPipeline> {
        self.pipeline(config::DEFAULT_RENDER_STEPS)
    }
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.factories.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_are_registered() {
        let registry = StepRegistry::with_builtins();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["controls", "cursor", "entities", "output", "surface", "tint", "window"]
        );
        for name in names {
            assert_eq!(registry.create(name).unwrap().name(), name);
        }
    }

    #[test]
    fn test_duplicate_registration_fails() {
        let mut registry = StepRegistry::with_builtins();
        assert!(registry.register("tint", boxed::<TintStep>).is_err());
        registry
            .register("tint-again", || -> Box<dyn RenderStep> { Box::new(TintStep::new()) })
            .unwrap();
        assert!(registry.contains("tint-again"));
    }

    #[test]
    fn test_unknown_names_are_reported() {
        let registry = StepRegistry::with_builtins();
        assert!(matches!(
            registry.validate(&["surface", "blur"]),
            Err(GridError::UnknownStep(name)) if name == "blur"
        ));
        assert!(registry.pipeline(&["surface", "blur"]).is_err());
    }

    #[test]
    fn test_default_pipeline_order() {
        let registry = StepRegistry::with_builtins();
        let pipeline = registry.default_pipeline().unwrap();
        assert_eq!(pipeline.step_names(), config::DEFAULT_RENDER_STEPS.to_vec());
    }
}
