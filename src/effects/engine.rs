//! # Appearance Effect Engine
//!
//! Drives the effect lifecycle of a single cell:
//!
//! ```text
//! NoEffect -> EffectActive -> EffectFinished -> Removed
//!                                           \-> Retained
//! ```
//!
//! [`EffectSlot`] holds the effect and the private pre-effect snapshot and
//! operates on a glyph owned elsewhere, so surfaces can drive per-cell effects
//! without giving up ownership of their cells. [`AppearanceEffectEngine`]
//! bundles a slot with the glyph it animates.

use super::CellEffect;
use crate::{AppearanceState, ColoredGlyph, GridError, GridResult};
use log::{debug, trace};
use std::time::Duration;

/// An effect attached to a glyph, plus the snapshot it computes from.
#[derive(Debug, Clone)]
pub struct EffectSlot {
    effect: Option<Box<dyn CellEffect>>,
    baseline: AppearanceState,
}

impl EffectSlot {
    /// Creates an empty slot whose baseline is the current look of `target`.
    pub fn new(target: &ColoredGlyph) -> Self {
        Self {
            effect: None,
            baseline: AppearanceState::from(target),
        }
    }

    /// Rebuilds a slot from stored parts without replaying the attach logic,
    /// so a mid-animation effect keeps its original snapshot.
    pub(crate) fn from_parts(baseline: AppearanceState, effect: Option<Box<dyn CellEffect>>) -> Self {
        Self { effect, baseline }
    }

    pub fn effect(&self) -> Option<&dyn CellEffect> {
        self.effect.as_deref()
    }

    /// The snapshot the current effect computes from.
    pub fn baseline(&self) -> &AppearanceState {
        &self.baseline
    }

    pub fn has_effect(&self) -> bool {
        self.effect.is_some()
    }

    /// Takes a fresh snapshot of `target`; used when the glyph is replaced
    /// outright.
    pub fn rebase(&mut self, target: &ColoredGlyph) {
        self.baseline = AppearanceState::from(target);
    }

    /// Swaps the active effect, returning whether `target` changed.
    ///
    /// The outgoing effect either restores the snapshot or, when it keeps its
    /// changes, the current look of `target` becomes the new snapshot. Only
    /// then is the incoming effect attached, so it never restores over a
    /// change another effect meant to keep.
    pub fn set_effect(
        &mut self,
        target: &mut ColoredGlyph,
        effect: Option<Box<dyn CellEffect>>,
    ) -> bool {
        let mut changed = false;
        match self.effect.take() {
            Some(outgoing) if outgoing.settings().restore_cell_on_removed => {
                debug!("Removing effect '{}' and restoring cell", outgoing.name());
                changed = self.baseline.restore(target);
            }
            Some(outgoing) => {
                debug!("Removing effect '{}' and keeping its changes", outgoing.name());
                self.baseline = AppearanceState::from(&*target);
            }
            None => self.baseline = AppearanceState::from(&*target),
        }

        if let Some(incoming) = &effect {
            debug!("Attaching effect '{}'", incoming.name());
        }
        self.effect = effect;
        changed
    }

    /// Attaches a private copy of a shared template.
    ///
    /// Only templates flagged `clone_on_add` can be shared; any other effect
    /// has a single owner and must be handed over with [`set_effect`].
    ///
    /// [`set_effect`]: EffectSlot::set_effect
    pub fn set_effect_from(
        &mut self,
        target: &mut ColoredGlyph,
        template: &dyn CellEffect,
    ) -> GridResult<bool> {
        if !template.settings().clone_on_add {
            return Err(GridError::InvalidOperation(format!(
                "effect '{}' is not marked clone_on_add and cannot be shared",
                template.name()
            )));
        }
        Ok(self.set_effect(target, Some(template.clone_effect())))
    }

    /// Advances the effect and applies it to `target`.
    ///
    /// Returns whether `target` changed. Finished effects flagged
    /// `remove_on_finished` are detached here; all others are retained with
    /// their last applied output.
    pub fn update(&mut self, target: &mut ColoredGlyph, delta: Duration) -> bool {
        let Some(effect) = self.effect.as_mut() else {
            return false;
        };
        if effect.is_finished() {
            return false;
        }

        effect.update(delta);
        let mut changed = effect.apply(target, &self.baseline);
        trace!("Effect '{}' applied (changed: {})", effect.name(), changed);

        if effect.is_finished() && effect.settings().remove_on_finished {
            let restore = effect.settings().restore_cell_on_removed;
            debug!("Effect '{}' finished and removed", effect.name());
            self.effect = None;
            if restore {
                changed |= self.baseline.restore(target);
            }
        }
        changed
    }
}

/// The appearance of one entity or cell together with its effect state.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use gridglyph::{AppearanceEffectEngine, Color, ColoredGlyph, EffectSettings, Recolor};
///
/// let mut engine = AppearanceEffectEngine::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
/// let effect = Recolor::new(Some(Color::RED), None)
///     .with_duration(Duration::from_millis(100))
///     .with_settings(
///         EffectSettings::default()
///             .with_remove_on_finished(true)
///             .with_restore_cell_on_removed(true),
///     );
/// engine.set_effect(Some(Box::new(effect)));
///
/// engine.update(Duration::from_millis(50));
/// assert_eq!(engine.appearance().foreground(), Color::RED);
///
/// engine.update(Duration::from_millis(50));
/// assert!(engine.effect().is_none());
/// assert_eq!(engine.appearance().foreground(), Color::WHITE);
/// ```
#[derive(Debug, Clone)]
pub struct AppearanceEffectEngine {
    appearance: ColoredGlyph,
    slot: EffectSlot,
}

impl AppearanceEffectEngine {
    pub fn new(appearance: ColoredGlyph) -> Self {
        let slot = EffectSlot::new(&appearance);
        Self { appearance, slot }
    }

    pub(crate) fn from_parts(appearance: ColoredGlyph, slot: EffectSlot) -> Self {
        Self { appearance, slot }
    }

    pub fn appearance(&self) -> &ColoredGlyph {
        &self.appearance
    }

    /// Replaces the appearance outright; the new look becomes the snapshot
    /// any running effect computes from.
    pub fn set_appearance(&mut self, appearance: ColoredGlyph) {
        self.appearance = appearance;
        self.appearance.set_dirty(true);
        self.slot.rebase(&self.appearance);
    }

    pub fn effect(&self) -> Option<&dyn CellEffect> {
        self.slot.effect()
    }

    pub fn baseline(&self) -> &AppearanceState {
        self.slot.baseline()
    }

    /// Swaps the active effect; returns whether the appearance changed.
    pub fn set_effect(&mut self, effect: Option<Box<dyn CellEffect>>) -> bool {
        self.slot.set_effect(&mut self.appearance, effect)
    }

    pub fn set_effect_from(&mut self, template: &dyn CellEffect) -> GridResult<bool> {
        self.slot.set_effect_from(&mut self.appearance, template)
    }

    /// Advances the effect; returns whether the appearance changed.
    pub fn update(&mut self, delta: Duration) -> bool {
        self.slot.update(&mut self.appearance, delta)
    }

    pub fn is_dirty(&self) -> bool {
        self.appearance.is_dirty()
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.appearance.set_dirty(dirty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Color, EffectSettings, Recolor};

    fn timed_recolor(color: Color, settings: EffectSettings) -> Box<dyn CellEffect> {
        Box::new(
            Recolor::new(Some(color), None)
                .with_duration(Duration::from_millis(100))
                .with_settings(settings),
        )
    }

    #[test]
    fn test_update_without_effect_is_noop() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::default());
        assert!(!engine.update(Duration::from_secs(1)));
    }

    #[test]
    fn test_effect_marks_appearance_dirty() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
        engine.set_dirty(false);
        engine.set_effect(Some(timed_recolor(Color::RED, EffectSettings::default())));

        assert!(engine.update(Duration::from_millis(10)));
        assert!(engine.is_dirty());

        engine.set_dirty(false);
        assert!(!engine.update(Duration::from_millis(10)));
        assert!(!engine.is_dirty());
    }

    #[test]
    fn test_replacing_restoring_effect_reverts_first() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
        engine.set_effect(Some(timed_recolor(
            Color::RED,
            EffectSettings::default().with_restore_cell_on_removed(true),
        )));
        engine.update(Duration::from_millis(10));
        assert_eq!(engine.appearance().foreground(), Color::RED);

        engine.set_effect(None);
        assert_eq!(engine.appearance().foreground(), Color::WHITE);
    }

    #[test]
    fn test_replacing_keeping_effect_rebases_snapshot() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
        engine.set_effect(Some(timed_recolor(Color::RED, EffectSettings::default())));
        engine.update(Duration::from_millis(10));

        let restoring = Recolor::new(None, Some(Color::BLUE))
            .with_settings(EffectSettings::default().with_restore_cell_on_removed(true));
        engine.set_effect(Some(Box::new(restoring)));
        assert_eq!(engine.baseline().foreground, Color::RED);

        engine.update(Duration::from_millis(10));
        engine.set_effect(None);
        assert_eq!(engine.appearance().foreground(), Color::RED);
        assert_eq!(engine.appearance().background(), Color::BLACK);
    }

    #[test]
    fn test_shared_template_requires_clone_on_add() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::default());
        let single_owner = Recolor::new(Some(Color::RED), None);
        assert!(engine.set_effect_from(&single_owner).is_err());

        let template = Recolor::new(Some(Color::RED), None)
            .with_settings(EffectSettings::default().with_clone_on_add(true));
        engine.set_effect_from(&template).unwrap();
        engine.update(Duration::from_millis(10));
        assert_eq!(template.timer().elapsed(), Duration::ZERO);
        assert_eq!(engine.effect().unwrap().timer().elapsed(), Duration::from_millis(10));
    }

    #[test]
    fn test_direct_assignment_rebases_running_effect() {
        let mut engine = AppearanceEffectEngine::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 1));
        engine.set_effect(Some(timed_recolor(Color::RED, EffectSettings::default())));
        engine.set_appearance(ColoredGlyph::new(Color::WHITE, Color::GREEN, 2));
        engine.update(Duration::from_millis(10));

        assert_eq!(engine.appearance().foreground(), Color::RED);
        assert_eq!(engine.appearance().background(), Color::GREEN);
        assert_eq!(engine.appearance().glyph(), 2);
    }
}
