//! Gradient fades over time.

use super::{CellEffect, EffectKind, EffectSettings, EffectTimer};
use crate::{AppearanceState, FontMetrics, Gradient, GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Fades the foreground and/or background of a cell along a gradient.
///
/// With `use_cell_foreground` / `use_cell_background` the first gradient stop
/// is replaced by the cell's own color, so the fade starts from whatever the
/// cell looked like when the effect was attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fade {
    pub foreground: Option<Gradient>,
    pub background: Option<Gradient>,
    pub use_cell_foreground: bool,
    pub use_cell_background: bool,
    pub duration: Duration,
    /// Loop the fade forever
    pub repeat: bool,
    /// Run the gradient forward then backward
    pub auto_reverse: bool,
    settings: EffectSettings,
    timer: EffectTimer,
}

impl Fade {
    /// Creates a fade; at least one of the gradients must be present.
    pub fn new(
        foreground: Option<Gradient>,
        background: Option<Gradient>,
        duration: Duration,
    ) -> GridResult<Self> {
        let fade = Self {
            foreground,
            background,
            use_cell_foreground: false,
            use_cell_background: false,
            duration,
            repeat: false,
            auto_reverse: false,
            settings: EffectSettings::default(),
            timer: EffectTimer::default(),
        };
        fade.check_parameters()?;
        Ok(fade)
    }

    pub fn with_settings(mut self, settings: EffectSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_auto_reverse(mut self, auto_reverse: bool) -> Self {
        self.auto_reverse = auto_reverse;
        self
    }

    pub fn with_cell_colors(mut self, foreground: bool, background: bool) -> Self {
        self.use_cell_foreground = foreground;
        self.use_cell_background = background;
        self
    }

    fn check_parameters(&self) -> GridResult<()> {
        if self.foreground.is_none() && self.background.is_none() {
            return Err(GridError::InvalidEffect(
                "fade needs a foreground or background gradient".to_string(),
            ));
        }
        for gradient in self.foreground.iter().chain(self.background.iter()) {
            gradient.validate()?;
        }
        Ok(())
    }

    fn run_length(&self) -> Duration {
        if self.auto_reverse {
            self.duration * 2
        } else {
            self.duration
        }
    }

    /// Position along the gradient, or `None` before the start delay ends.
    fn progress(&self) -> Option<f32> {
        let active = self.timer.active_time(self.settings.start_delay)?;
        if self.duration.is_zero() {
            return Some(1.0);
        }
        let cycle = active.as_secs_f32() / self.duration.as_secs_f32();
        let position = if self.auto_reverse {
            let phase = if self.repeat { cycle % 2.0 } else { cycle.min(2.0) };
            if phase <= 1.0 {
                phase
            } else {
                2.0 - phase
            }
        } else if self.repeat {
            cycle % 1.0
        } else {
            cycle.min(1.0)
        };
        Some(position)
    }
}

impl CellEffect for Fade {
    fn name(&self) -> &'static str {
        "fade"
    }

    fn settings(&self) -> &EffectSettings {
        &self.settings
    }

    fn settings_mut(&mut self) -> &mut EffectSettings {
        &mut self.settings
    }

    fn timer(&self) -> &EffectTimer {
        &self.timer
    }

    fn play_time(&self) -> Option<Duration> {
        (!self.repeat).then(|| self.run_length())
    }

    fn update(&mut self, delta: Duration) {
        self.timer.advance(delta);
        if self.repeat {
            return;
        }
        if let Some(active) = self.timer.active_time(self.settings.start_delay) {
            if active >= self.run_length() {
                self.timer.finish();
            }
        }
    }

    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState> {
        let t = self.progress()?;
        let mut state = baseline.clone();
        if let Some(gradient) = &self.foreground {
            state.foreground = if self.use_cell_foreground {
                gradient.with_first_color(baseline.foreground).sample(t)
            } else {
                gradient.sample(t)
            };
        }
        if let Some(gradient) = &self.background {
            state.background = if self.use_cell_background {
                gradient.with_first_color(baseline.background).sample(t)
            } else {
                gradient.sample(t)
            };
        }
        Some(state)
    }

    fn restart(&mut self) {
        self.timer.reset();
    }

    fn validate(&self, _font: &FontMetrics) -> GridResult<()> {
        self.check_parameters()
    }

    fn clone_effect(&self) -> Box<dyn CellEffect> {
        Box::new(self.clone())
    }

    fn to_kind(&self) -> EffectKind {
        EffectKind::Fade(self.clone())
    }
}
