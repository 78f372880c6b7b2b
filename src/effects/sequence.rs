//! Runs several effects one after another.

use super::{CellEffect, EffectKind, EffectSettings, EffectTimer};
use crate::{AppearanceState, FontMetrics, GridError, GridResult};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// An ordered list of effects played back to back on the same cell.
///
/// Child lifecycle flags are ignored; the sequence's own settings decide
/// what happens when the last child finishes.
#[derive(Debug, Clone)]
pub struct EffectSequence {
    effects: Vec<Box<dyn CellEffect>>,
    current: usize,
    pub repeat: bool,
    settings: EffectSettings,
    timer: EffectTimer,
}

/// Stored form of an [`EffectSequence`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub effects: Vec<EffectKind>,
    pub current: usize,
    pub repeat: bool,
    pub settings: EffectSettings,
    pub timer: EffectTimer,
}

impl EffectSequence {
    pub fn new(effects: Vec<Box<dyn CellEffect>>) -> GridResult<Self> {
        if effects.is_empty() {
            return Err(GridError::InvalidEffect(
                "effect sequence needs at least one effect".to_string(),
            ));
        }
        Ok(Self {
            effects,
            current: 0,
            repeat: false,
            settings: EffectSettings::default(),
            timer: EffectTimer::default(),
        })
    }

    pub fn with_repeat(mut self, repeat: bool) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn with_settings(mut self, settings: EffectSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Index of the child currently playing.
    pub fn current(&self) -> usize {
        self.current
    }

    pub fn effects(&self) -> &[Box<dyn CellEffect>] {
        &self.effects
    }

    /// Rebuilds a sequence, validating every child and the playback index.
    pub fn from_record(record: SequenceRecord, font: &FontMetrics) -> GridResult<Self> {
        let effects = record
            .effects
            .into_iter()
            .map(|kind| kind.into_effect(font))
            .collect::<GridResult<Vec<_>>>()?;
        let mut sequence = Self::new(effects)?;
        if record.current >= sequence.effects.len() {
            return Err(GridError::OutOfRange {
                what: "sequence effect",
                index: record.current,
                limit: sequence.effects.len(),
            });
        }
        sequence.current = record.current;
        sequence.repeat = record.repeat;
        sequence.settings = record.settings;
        sequence.timer = record.timer;
        Ok(sequence)
    }
}

/// Time a finished child ran past its own end; carried into the next child.
fn overrun(effect: &dyn CellEffect) -> Duration {
    match (
        effect.timer().active_time(effect.settings().start_delay),
        effect.play_time(),
    ) {
        (Some(active), Some(play_time)) => active.saturating_sub(play_time),
        _ => Duration::ZERO,
    }
}

impl CellEffect for EffectSequence {
    fn name(&self) -> &'static str {
        "sequence"
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
        if self.repeat {
            return None;
        }
        self.effects
            .iter()
            .try_fold(Duration::ZERO, |total, effect| total.checked_add(effect.play_time()?))
    }

    fn update(&mut self, delta: Duration) {
        if self.timer.is_finished() {
            return;
        }
        self.timer.advance(delta);
        let Some(active) = self.timer.active_time(self.settings.start_delay) else {
            return;
        };
        // Children only see the part of this tick past the start delay.
        let mut remaining = active.min(delta);

        for _ in 0..=self.effects.len() {
            let Some(effect) = self.effects.get_mut(self.current) else {
                self.timer.finish();
                return;
            };
            effect.update(remaining);
            if !effect.is_finished() {
                return;
            }
            remaining = overrun(&**effect);

            if self.current + 1 < self.effects.len() {
                self.current += 1;
            } else if self.repeat {
                self.current = 0;
            } else {
                self.timer.finish();
                return;
            }
            self.effects[self.current].restart();
            if remaining.is_zero() {
                return;
            }
        }
    }

    fn transform(&self, baseline: &AppearanceState) -> Option<AppearanceState> {
        self.timer.active_time(self.settings.start_delay)?;
        self.effects.get(self.current)?.transform(baseline)
    }

    fn restart(&mut self) {
        self.timer.reset();
        self.current = 0;
        for effect in &mut self.effects {
            effect.restart();
        }
    }

    fn validate(&self, font: &FontMetrics) -> GridResult<()> {
        if self.effects.is_empty() {
            return Err(GridError::InvalidEffect(
                "effect sequence needs at least one effect".to_string(),
            ));
        }
        self.effects.iter().try_for_each(|effect| effect.validate(font))
    }

    fn clone_effect(&self) -> Box<dyn CellEffect> {
        Box::new(self.clone())
    }

    fn to_kind(&self) -> EffectKind {
        EffectKind::Sequence(SequenceRecord {
            effects: self.effects.iter().map(|effect| effect.to_kind()).collect(),
            current: self.current,
            repeat: self.repeat,
            settings: self.settings.clone(),
            timer: self.timer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, ColoredGlyph, EffectRecord, Recolor};

    fn two_step() -> EffectSequence {
        EffectSequence::new(vec![
            Box::new(Recolor::new(Some(Color::RED), None).with_duration(Duration::from_millis(100))),
            Box::new(Recolor::new(Some(Color::BLUE), None).with_duration(Duration::from_millis(100))),
        ])
        .unwrap()
    }

    #[test]
    fn test_sequence_plays_children_in_order() {
        let baseline = AppearanceState::from(&ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
        let mut sequence = two_step();

        sequence.update(Duration::from_millis(50));
        assert_eq!(sequence.transform(&baseline).unwrap().foreground, Color::RED);

        sequence.update(Duration::from_millis(60));
        assert_eq!(sequence.current(), 1);
        sequence.update(Duration::from_millis(10));
        assert_eq!(sequence.transform(&baseline).unwrap().foreground, Color::BLUE);

        sequence.update(Duration::from_millis(100));
        assert!(sequence.is_finished());
    }

    #[test]
    fn test_sequence_record_keeps_playback_position() {
        let mut sequence = two_step();
        sequence.update(Duration::from_millis(120));

        let record = EffectRecord::from_effect(&sequence);
        let json = serde_json::to_string(&record).unwrap();
        let restored: EffectRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, record);

        let rebuilt = restored.into_effect(&FontMetrics::default()).unwrap();
        assert_eq!(rebuilt.to_kind(), sequence.to_kind());
    }

    #[test]
    fn test_start_delay_is_not_charged_to_children() {
        let child = Recolor::new(Some(Color::RED), None).with_duration(Duration::from_millis(100));
        let mut sequence = EffectSequence::new(vec![Box::new(child)])
            .unwrap()
            .with_settings(EffectSettings::default().with_start_delay(Duration::from_millis(100)));

        sequence.update(Duration::from_millis(150));
        assert_eq!(sequence.effects()[0].timer().elapsed(), Duration::from_millis(50));
        assert!(!sequence.is_finished());

        sequence.update(Duration::from_millis(40));
        assert!(!sequence.is_finished());
        sequence.update(Duration::from_millis(10));
        assert!(sequence.is_finished());
    }

    #[test]
    fn test_leftover_time_carries_into_next_child() {
        let mut sequence = two_step();
        sequence.update(Duration::from_millis(150));
        assert_eq!(sequence.current(), 1);
        assert_eq!(sequence.effects()[1].timer().elapsed(), Duration::from_millis(50));

        sequence.update(Duration::from_millis(50));
        assert!(sequence.is_finished());
        assert_eq!(sequence.play_time(), Some(Duration::from_millis(200)));
    }

    #[test]
    fn test_empty_sequence_is_rejected() {
        assert!(EffectSequence::new(Vec::new()).is_err());
    }
}
