//! Blinking and glyph-cycling effects.

use super::{CellEffect, EffectKind, EffectSettings, EffectTimer};
use crate::{AppearanceState, Color, FontMetrics, GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

fn check_speed(speed: Duration, effect: &str) -> GridResult<()> {
    if speed.is_zero() {
        return Err(GridError::InvalidEffect(format!(
            "{} speed must be greater than zero",
            effect
        )));
    }
    Ok(())
}

/// Number of whole `speed` intervals contained in `active`.
fn ticks(active: Duration, speed: Duration) -> u128 {
    active.as_nanos() / speed.as_nanos().max(1)
}

/// Blinks a cell out and back in.
///
/// While blinked out, the foreground takes `out_color` or, when no color is
/// set, the glyph is hidden.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blink {
    /// Number of out-and-in blinks; `None` blinks forever
    pub blink_count: Option<u32>,
    /// Time spent in each half of a blink
    pub speed: Duration,
    pub out_color: Option<Color>,
    settings: EffectSettings,
    timer: EffectTimer,
}

impl Blink {
    pub fn new(speed: Duration) -> GridResult<Self> {
        check_speed(speed, "blink")?;
        Ok(Self {
            blink_count: None,
            speed,
            out_color: None,
            settings: EffectSettings::default(),
            timer: EffectTimer::default(),
        })
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.blink_count = Some(count);
        self
    }

    pub fn with_out_color(mut self, color: Color) -> Self {
        self.out_color = Some(color);
        self
    }

    pub fn with_settings(mut self, settings: EffectSettings) -> Self {
        self.settings = settings;
        self
    }

    fn is_out(&self, active: Duration) -> bool {
        !self.timer.is_finished() && ticks(active, self.speed) % 2 == 1
    }
}

impl CellEffect for Blink {
    fn name(&self) -> &'static str {
        "blink"
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
        self.blink_count
            .and_then(|count| self.speed.checked_mul(count.saturating_mul(2)))
    }

    fn update(&mut self, delta: Duration) {
        self.timer.advance(delta);
        let (Some(active), Some(count)) =
            (self.timer.active_time(self.settings.start_delay), self.blink_count)
        else {
            return;
        };
        if ticks(active, self.speed) >= u128::from(count) * 2 {
            self.timer.finish();
        }
    }

    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState> {
        let active = self.timer.active_time(self.settings.start_delay)?;
        let mut state = baseline.clone();
        if self.is_out(active) {
            match self.out_color {
                Some(color) => state.foreground = color,
                None => state.is_visible = false,
            }
        }
        Some(state)
    }

    fn restart(&mut self) {
        self.timer.reset();
    }

    fn validate(&self, _font: &FontMetrics) -> GridResult<()> {
        check_speed(self.speed, "blink")
    }

    fn clone_effect(&self) -> Box<dyn CellEffect> {
        Box::new(self.clone())
    }

    fn to_kind(&self) -> EffectKind {
        EffectKind::Blink(self.clone())
    }
}

/// Steps a cell through a list of glyphs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleGlyphs {
    pub glyphs: Vec<u32>,
    /// Time each glyph is shown
    pub speed: Duration,
    pub repeat: bool,
    settings: EffectSettings,
    timer: EffectTimer,
}

impl CycleGlyphs {
    pub fn new(glyphs: Vec<u32>, speed: Duration) -> GridResult<Self> {
        let effect = Self {
            glyphs,
            speed,
            repeat: true,
            settings: EffectSettings::default(),
            timer: EffectTimer::default(),
        };
        effect.check_parameters()?;
        Ok(effect)
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_settings(mut self, settings: EffectSettings) -> Self {
        self.settings = settings;
        self
    }

    fn check_parameters(&self) -> GridResult<()> {
        if self.glyphs.is_empty() {
            return Err(GridError::InvalidEffect(
                "glyph cycle needs at least one glyph".to_string(),
            ));
        }
        check_speed(self.speed, "glyph cycle")
    }

    fn frame(&self, active: Duration) -> usize {
        let len = self.glyphs.len() as u128;
        let tick = ticks(active, self.speed);
        let index = if self.repeat { tick % len } else { tick.min(len - 1) };
        index as usize
    }
}

impl CellEffect for CycleGlyphs {
    fn name(&self) -> &'static str {
        "cycle-glyphs"
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
        let steps = u32::try_from(self.glyphs.len()).unwrap_or(u32::MAX);
        if self.repeat {
            None
        } else {
            self.speed.checked_mul(steps)
        }
    }

    fn update(&mut self, delta: Duration) {
        self.timer.advance(delta);
        if self.repeat {
            return;
        }
        if let Some(active) = self.timer.active_time(self.settings.start_delay) {
            if ticks(active, self.speed) >= self.glyphs.len() as u128 {
                self.timer.finish();
            }
        }
    }

    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState> {
        let active = self.timer.active_time(self.settings.start_delay)?;
        let glyph = *self.glyphs.get(self.frame(active))?;
        let mut state = baseline.clone();
        state.glyph = glyph;
        Some(state)
    }

    fn restart(&mut self) {
        self.timer.reset();
    }

    fn validate(&self, font: &FontMetrics) -> GridResult<()> {
        self.check_parameters()?;
        for glyph in &self.glyphs {
            font.check_glyph(*glyph)?;
        }
        Ok(())
    }

    fn clone_effect(&self) -> Box<dyn CellEffect> {
        Box::new(self.clone())
    }

    fn to_kind(&self) -> EffectKind {
        EffectKind::CycleGlyphs(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ColoredGlyph;

    fn baseline() -> AppearanceState {
        AppearanceState::from(&ColoredGlyph::new(Color::WHITE, Color::BLACK, 7))
    }

    #[test]
    fn test_blink_rejects_zero_speed() {
        assert!(Blink::new(Duration::ZERO).is_err());
    }

    #[test]
    fn test_blink_toggles_and_finishes_visible() {
        let mut blink = Blink::new(Duration::from_millis(100)).unwrap().with_count(1);

        blink.update(Duration::from_millis(50));
        assert!(blink.transform(&baseline()).unwrap().is_visible);

        blink.update(Duration::from_millis(100));
        assert!(!blink.transform(&baseline()).unwrap().is_visible);

        blink.update(Duration::from_millis(100));
        assert!(blink.is_finished());
        assert!(blink.transform(&baseline()).unwrap().is_visible);
    }

    #[test]
    fn test_blink_out_color() {
        let mut blink = Blink::new(Duration::from_millis(10))
            .unwrap()
            .with_out_color(Color::BLACK);
        blink.update(Duration::from_millis(15));
        let state = blink.transform(&baseline()).unwrap();
        assert_eq!(state.foreground, Color::BLACK);
        assert!(state.is_visible);
    }

    #[test]
    fn test_cycle_glyphs_without_repeat_holds_last() {
        let mut cycle = CycleGlyphs::new(vec![1, 2, 3], Duration::from_millis(10))
            .unwrap()
            .with_repeat(false);

        cycle.update(Duration::from_millis(25));
        assert_eq!(cycle.transform(&baseline()).unwrap().glyph, 3);
        assert!(!cycle.is_finished());

        cycle.update(Duration::from_millis(10));
        assert!(cycle.is_finished());
        assert_eq!(cycle.transform(&baseline()).unwrap().glyph, 3);
    }

    #[test]
    fn test_cycle_glyphs_validates_against_font() {
        let cycle = CycleGlyphs::new(vec![1, 300], Duration::from_millis(10)).unwrap();
        assert!(cycle.validate(&FontMetrics::new(8, 8, 256)).is_err());
        assert!(CycleGlyphs::new(Vec::new(), Duration::from_millis(10)).is_err());
    }
}
