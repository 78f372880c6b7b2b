//! Recolors a cell, optionally for a limited time.

use super::{CellEffect, EffectKind, EffectSettings, EffectTimer};
use crate::{AppearanceState, Color, FontMetrics, GridResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Replaces the foreground and/or background of a cell.
///
/// Without a duration the recolor holds until the effect is removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recolor {
    pub foreground: Option<Color>,
    pub background: Option<Color>,
    pub duration: Option<Duration>,
    settings: EffectSettings,
    timer: EffectTimer,
}

impl Recolor {
    pub fn new(foreground: Option<Color>, background: Option<Color>) -> Self {
        Self {
            foreground,
            background,
            duration: None,
            settings: EffectSettings::default(),
            timer: EffectTimer::default(),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_settings(mut self, settings: EffectSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl CellEffect for Recolor {
    fn name(&self) -> &'static str {
        "recolor"
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
        self.duration
    }

    fn update(&mut self, delta: Duration) {
        self.timer.advance(delta);
        if let (Some(active), Some(duration)) =
            (self.timer.active_time(self.settings.start_delay), self.duration)
        {
            if active >= duration {
                self.timer.finish();
            }
        }
    }

    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState> {
        self.timer.active_time(self.settings.start_delay)?;
        let mut state = baseline.clone();
        if let Some(foreground) = self.foreground {
            state.foreground = foreground;
        }
        if let Some(background) = self.background {
            state.background = background;
        }
        Some(state)
    }

    fn restart(&mut self) {
        self.timer.reset();
    }

    fn validate(&self, _font: &FontMetrics) -> GridResult<()> {
        Ok(())
    }

    fn clone_effect(&self) -> Box<dyn CellEffect> {
        Box::new(self.clone())
    }

    fn to_kind(&self) -> EffectKind {
        EffectKind::Recolor(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColoredGlyph;

    #[test]
    fn test_recolor_applies_from_baseline() {
        let cell = ColoredGlyph::new(Color::WHITE, Color::BLACK, 1);
        let baseline = AppearanceState::from(&cell);
        let mut effect = Recolor::new(None, Some(Color::BLUE));
        effect.update(Duration::from_millis(16));

        let state = effect.transform(&baseline).unwrap();
        assert_eq!(state.foreground, Color::WHITE);
        assert_eq!(state.background, Color::BLUE);
        assert!(!effect.is_finished());
    }

    #[test]
    fn test_recolor_finishes_after_duration() {
        let mut effect = Recolor::new(Some(Color::RED), None).with_duration(Duration::from_millis(100));
        effect.update(Duration::from_millis(60));
        assert!(!effect.is_finished());
        effect.update(Duration::from_millis(60));
        assert!(effect.is_finished());
    }
}
