//! Stored forms of entities.
//!
//! Records carry the active appearance variant under a `mode` tag and a
//! format version. Rebuilding one runs the same checks as building the
//! entity by hand: glyphs against the font, effects through their
//! validating factories, frame sizes against the animation.

use super::{AnimatedSurface, AnimatedSurfaceRecord, Entity, EntityAppearance, EntityId};
use crate::{
    config, AppearanceEffectEngine, AppearanceState, EffectKind, EffectSlot, FontMetrics,
    GridError, GridResult, Point,
};
use serde::{Deserialize, Serialize};

/// Stored form of an [`EntityAppearance`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AppearanceRecord {
    Single {
        appearance: AppearanceState,
        /// Snapshot the running effect computes from
        baseline: AppearanceState,
        #[serde(default)]
        effect: Option<EffectKind>,
    },
    Surface(AnimatedSurfaceRecord),
}

/// Stored form of an [`Entity`]. The dirty observer is not persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub version: u32,
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    pub position: Point,
    pub z_index: i32,
    #[serde(default)]
    pub use_pixel_positioning: bool,
    pub is_visible: bool,
    pub appearance: AppearanceRecord,
}

impl AppearanceRecord {
    fn into_appearance(self, font: &FontMetrics) -> GridResult<EntityAppearance> {
        match self {
            AppearanceRecord::Single {
                appearance,
                baseline,
                effect,
            } => {
                let glyph = appearance.to_glyph(font)?;
                baseline.validate(font)?;
                let effect = effect.map(|kind| kind.into_effect(font)).transpose()?;
                let slot = EffectSlot::from_parts(baseline, effect);
                Ok(EntityAppearance::Single(AppearanceEffectEngine::from_parts(glyph, slot)))
            }
            AppearanceRecord::Surface(record) => Ok(EntityAppearance::Surface(
                AnimatedSurface::from_record(record, font)?,
            )),
        }
    }
}

impl Entity {
    pub fn to_record(&self) -> EntityRecord {
        let appearance = match self.appearance() {
            EntityAppearance::Single(engine) => AppearanceRecord::Single {
                appearance: AppearanceState::from(engine.appearance()),
                baseline: engine.baseline().clone(),
                effect: engine.effect().map(|effect| effect.to_kind()),
            },
            EntityAppearance::Surface(animation) => AppearanceRecord::Surface(animation.to_record()),
        };
        EntityRecord {
            version: config::RECORD_VERSION,
            id: self.id(),
            name: self.name().to_string(),
            position: self.position(),
            z_index: self.z_index(),
            use_pixel_positioning: self.use_pixel_positioning(),
            is_visible: self.is_visible(),
            appearance,
        }
    }

    /// Rebuilds an entity. The result starts dirty so it is drawn at least
    /// once.
    pub fn from_record(record: EntityRecord, font: &FontMetrics) -> GridResult<Self> {
        if record.version != config::RECORD_VERSION {
            return Err(GridError::UnsupportedVersion {
                found: record.version,
                expected: config::RECORD_VERSION,
            });
        }
        let appearance = record.appearance.into_appearance(font)?;
        let mut entity = Entity::with_appearance(appearance, record.z_index)
            .with_id(record.id)
            .with_name(record.name)
            .with_pixel_positioning(record.use_pixel_positioning)
            .with_position(record.position);
        entity.set_visible(record.is_visible);
        entity.set_dirty(true);
        Ok(entity)
    }

    pub fn to_json(&self) -> GridResult<String> {
        Ok(serde_json::to_string_pretty(&self.to_record())?)
    }

    pub fn from_json(json: &str, font: &FontMetrics) -> GridResult<Self> {
        let record: EntityRecord = serde_json::from_str(json)?;
        Self::from_record(record, font)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppearanceMode, Color, ColoredGlyph, Fade, Gradient};
    use std::time::Duration;

    #[test]
    fn test_single_entity_json_round_trip() {
        let font = FontMetrics::default();
        let mut entity = Entity::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 2), 3)
            .with_name("player")
            .with_position(Point::new(4, 5));
        let fade = Fade::new(
            Some(Gradient::new(Color::WHITE, Color::RED)),
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        entity.set_effect(Some(Box::new(fade))).unwrap();
        entity.update(Duration::from_millis(250));

        let json = entity.to_json().unwrap();
        let restored = Entity::from_json(&json, &font).unwrap();
        assert_eq!(restored.to_record(), entity.to_record());
        assert_eq!(restored.id(), entity.id());
        assert!(restored.is_dirty());
    }

    #[test]
    fn test_surface_entity_record_keeps_variant() {
        let font = FontMetrics::default();
        let animation = AnimatedSurface::new("box", 2, 2, 2, Duration::from_millis(50)).unwrap();
        let entity = Entity::with_surface(animation, 1).with_position(Point::new(3, 3));

        let restored = Entity::from_record(entity.to_record(), &font).unwrap();
        assert_eq!(restored.mode(), AppearanceMode::Surface);
        assert_eq!(restored.to_record(), entity.to_record());
    }

    #[test]
    fn test_record_glyph_outside_font_is_rejected() {
        let entity = Entity::new(ColoredGlyph::new(Color::WHITE, Color::BLACK, 200), 0);
        let record = entity.to_record();
        assert!(matches!(
            Entity::from_record(record, &FontMetrics::new(8, 8, 128)),
            Err(GridError::OutOfRange { what: "glyph", .. })
        ));
    }

    #[test]
    fn test_record_version_mismatch_is_rejected() {
        let mut record = Entity::new(ColoredGlyph::default(), 0).to_record();
        record.version = 2;
        assert!(matches!(
            Entity::from_record(record, &FontMetrics::default()),
            Err(GridError::UnsupportedVersion { found: 2, .. })
        ));
    }
}
