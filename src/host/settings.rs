//! # Engine Configuration
//!
//! Runtime settings a host loads at startup. Every field has a default, so a
//! configuration file only needs to name what it changes.

use crate::{config, Color, FontMetrics, GridError, GridResult, StepRegistry};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Settings shared by every surface a [`FrameDriver`](crate::FrameDriver) creates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Glyph cell metrics of the font in use
    pub font: FontMetrics,
    /// Render steps each new surface receives, in order
    pub render_steps: Vec<String>,
    /// Opacity assigned to new pipelines
    pub opacity: u8,
    /// Color the host clears the screen with before drawing
    pub clear_color: Color,
    /// Frames per second the host loop aims for
    pub target_fps: u64,
    /// Width in cells of surfaces created by the driver
    pub surface_width: usize,
    /// Height in cells of surfaces created by the driver
    pub surface_height: usize,
}

impl EngineConfig {
    /// Creates the default configuration.
    ///
    /// # Examples
    ///
    /// ```
    /// use gridglyph::{EngineConfig, StepRegistry};
    ///
    /// let config = EngineConfig::new();
    /// assert_eq!(config.render_steps, vec!["surface", "output", "tint"]);
    /// assert!(config.validate(&StepRegistry::with_builtins()).is_ok());
    /// ```
    pub fn new() -> Self {
        Self {
            font: FontMetrics::default(),
            render_steps: config::DEFAULT_RENDER_STEPS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            opacity: config::DEFAULT_OPACITY,
            clear_color: Color::BLACK,
            target_fps: config::TARGET_FPS,
            surface_width: config::DEFAULT_SURFACE_WIDTH,
            surface_height: config::DEFAULT_SURFACE_HEIGHT,
        }
    }

    /// Small surfaces with every built-in layer, for tests.
    pub fn for_testing() -> Self {
        Self {
            font: FontMetrics::new(8, 8, 256),
            render_steps: ["window", "surface", "entities", "controls", "output", "cursor", "tint"]
                .iter()
                .map(|name| name.to_string())
                .collect(),
            surface_width: 10,
            surface_height: 4,
            ..Self::new()
        }
    }

    pub fn from_json_str(json: &str) -> GridResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> GridResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&contents)?;
        info!("Loaded engine configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks values the type system cannot, including that every render
    /// step name is known to `registry`.
    pub fn validate(&self, registry: &StepRegistry) -> GridResult<()> {
        if self.font.glyph_width == 0 || self.font.glyph_height == 0 || self.font.glyph_count == 0 {
            return Err(GridError::InvalidState(
                "font metrics must be non-zero".to_string(),
            ));
        }
        if self.surface_width == 0 || self.surface_height == 0 {
            return Err(GridError::InvalidState(
                "surface size must be non-zero".to_string(),
            ));
        }
        if self.target_fps == 0 {
            return Err(GridError::InvalidState(
                "target_fps must be positive".to_string(),
            ));
        }
        registry.validate(&self.render_steps)
    }

    /// Time budget of one frame at the target rate.
    pub fn frame_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.target_fps.max(1))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}
