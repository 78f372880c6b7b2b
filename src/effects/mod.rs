//! # Effects Module
//!
//! Timed transforms over a cell's appearance.
//!
//! An effect never edits a glyph incrementally. Each frame it maps the
//! snapshot taken when it was attached (an [`AppearanceState`]) to a new
//! state, and the engine writes that state into the live glyph. Applying the
//! same effect twice from the same snapshot therefore never compounds.
//!
//! Every effect can be turned into a tagged, versioned [`EffectRecord`] and
//! rebuilt from one with the same checks its constructor performs.

pub mod blink;
pub mod engine;
pub mod fade;
pub mod recolor;
pub mod sequence;

pub use blink::*;
pub use engine::*;
pub use fade::*;
pub use recolor::*;
pub use sequence::*;

use crate::{config, AppearanceState, ColoredGlyph, FontMetrics, GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle flags shared by every effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectSettings {
    /// Detach the effect from its cell once it finishes
    pub remove_on_finished: bool,
    /// Revert the cell to its pre-effect snapshot when the effect is removed
    pub restore_cell_on_removed: bool,
    /// Store a private copy when the effect is attached from a shared template
    pub clone_on_add: bool,
    /// Time to wait before the effect starts changing the cell
    pub start_delay: Duration,
}

impl EffectSettings {
    pub fn with_remove_on_finished(mut self, value: bool) -> Self {
        self.remove_on_finished = value;
        self
    }

    pub fn with_restore_cell_on_removed(mut self, value: bool) -> Self {
        self.restore_cell_on_removed = value;
        self
    }

    pub fn with_clone_on_add(mut self, value: bool) -> Self {
        self.clone_on_add = value;
        self
    }

    pub fn with_start_delay(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }
}

impl Default for EffectSettings {
    fn default() -> Self {
        Self {
            remove_on_finished: false,
            restore_cell_on_removed: false,
            clone_on_add: false,
            start_delay: Duration::ZERO,
        }
    }
}

/// Elapsed time and completion of a running effect.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectTimer {
    elapsed: Duration,
    is_finished: bool,
}

impl EffectTimer {
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn is_finished(&self) -> bool {
        self.is_finished
    }

    /// Adds `delta` to the elapsed time unless the effect already finished.
    pub fn advance(&mut self, delta: Duration) {
        if !self.is_finished {
            self.elapsed += delta;
        }
    }

    pub fn finish(&mut self) {
        self.is_finished = true;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Time spent past `start_delay`, or `None` while still waiting.
    pub fn active_time(&self, start_delay: Duration) -> Option<Duration> {
        self.elapsed.checked_sub(start_delay)
    }
}

/// A timed transform applied to one cell.
pub trait CellEffect: fmt::Debug {
    /// Stable identifier of the effect kind.
    fn name(&self) -> &'static str;

    fn settings(&self) -> &EffectSettings;

    fn settings_mut(&mut self) -> &mut EffectSettings;

    fn timer(&self) -> &EffectTimer;

    /// Active time the effect needs before it finishes on its own, or `None`
    /// when it runs until removed.
    fn play_time(&self) -> Option<Duration> {
        None
    }

    /// Advances the effect clock by `delta`.
    fn update(&mut self, delta: Duration);

    /// Computes the appearance this effect produces from `baseline`, or
    /// `None` when the effect has nothing to show yet (start delay).
    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState>;

    /// Rewinds the effect to its initial state.
    fn restart(&mut self);

    /// Checks effect parameters, including glyph indices against `font`.
    fn validate(&self, font: &FontMetrics) -> GridResult<()>;

    fn clone_effect(&self) -> Box<dyn CellEffect>;

    /// Captures the exact current state, mid-animation included.
    fn to_kind(&self) -> EffectKind;

    /// Writes this effect's output into `cell`; returns whether the cell changed.
    fn apply(&self, cell: &mut ColoredGlyph, baseline: &AppearanceState) -> bool {
        match self.transform(baseline) {
            Some(state) => state.restore(cell),
            None => false,
        }
    }

    fn is_finished(&self) -> bool {
        self.timer().is_finished()
    }
}

impl Clone for Box<dyn CellEffect> {
    fn clone(&self) -> Self {
        self.clone_effect()
    }
}

/// The stored form of an effect: a kind tag and the full field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum EffectKind {
    Recolor(Recolor),
    Fade(Fade),
    Blink(Blink),
    CycleGlyphs(CycleGlyphs),
    Sequence(SequenceRecord),
}

impl EffectKind {
    /// Rebuilds the live effect, validating it exactly like a constructor would.
    pub fn into_effect(self, font: &FontMetrics) -> GridResult<Box<dyn CellEffect>> {
        let effect: Box<dyn CellEffect> = match self {
            EffectKind::Recolor(effect) => Box::new(effect),
            EffectKind::Fade(effect) => Box::new(effect),
            EffectKind::Blink(effect) => Box::new(effect),
            EffectKind::CycleGlyphs(effect) => Box::new(effect),
            EffectKind::Sequence(record) => Box::new(EffectSequence::from_record(record, font)?),
        };
        effect.validate(font)?;
        Ok(effect)
    }
}

/// A versioned effect record.
///
/// # Examples
///
/// ```
/// use gridglyph::{Color, EffectRecord, FontMetrics, Recolor};
///
/// let record = EffectRecord::from_effect(&Recolor::new(Some(Color::RED), None));
/// let json = serde_json::to_string(&record).unwrap();
/// let restored: EffectRecord = serde_json::from_str(&json).unwrap();
/// let effect = restored.into_effect(&FontMetrics::default()).unwrap();
/// assert_eq!(effect.name(), "recolor");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRecord {
    pub version: u32,
    pub effect: EffectKind,
}

impl EffectRecord {
    pub fn from_effect(effect: &dyn CellEffect) -> Self {
        Self {
            version: config::RECORD_VERSION,
            effect: effect.to_kind(),
        }
    }

    pub fn into_effect(self, font: &FontMetrics) -> GridResult<Box<dyn CellEffect>> {
        if self.version != config::RECORD_VERSION {
            return Err(GridError::UnsupportedVersion {
                found: self.version,
                expected: config::RECORD_VERSION,
            });
        }
        self.effect.into_effect(font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Color;

    #[test]
    fn test_timer_waits_for_start_delay() {
        let mut timer = EffectTimer::default();
        timer.advance(Duration::from_millis(50));
        assert_eq!(timer.active_time(Duration::from_millis(100)), None);
        timer.advance(Duration::from_millis(70));
        assert_eq!(
            timer.active_time(Duration::from_millis(100)),
            Some(Duration::from_millis(20))
        );
    }

    #[test]
    fn test_finished_timer_stops_advancing() {
        let mut timer = EffectTimer::default();
        timer.advance(Duration::from_millis(10));
        timer.finish();
        timer.advance(Duration::from_millis(10));
        assert_eq!(timer.elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn test_record_version_is_checked() {
        let mut record = EffectRecord::from_effect(&Recolor::new(Some(Color::RED), None));
        record.version = 99;
        assert!(matches!(
            record.into_effect(&FontMetrics::default()),
            Err(GridError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn test_boxed_effect_clone_is_independent() {
        let original: Box<dyn CellEffect> =
            Box::new(Recolor::new(Some(Color::RED), None).with_duration(Duration::from_secs(1)));
        let mut copy = original.clone();
        copy.update(Duration::from_secs(2));
        assert!(copy.is_finished());
        assert!(!original.is_finished());
    }
}
