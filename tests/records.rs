//! Stored records: rebuilding resumes state exactly and runs constructor checks.

use gridglyph::{
    AppearanceState, CellSurface, CellSurfaceRecord, Color, ColoredGlyph, CycleGlyphs,
    EffectKind, EffectRecord, EffectSettings, Entity, EntityRecord, Fade, FontMetrics, GridError,
    GridResult, Gradient, Point,
};
use std::time::Duration;

#[test]
fn test_mid_animation_entity_resumes_identically() -> GridResult<()> {
    let font = FontMetrics::default();
    let fade = Fade::new(
        Some(Gradient::new(Color::BLACK, Color::WHITE)),
        None,
        Duration::from_millis(400),
    )?;
    let mut original = Entity::new(ColoredGlyph::new(Color::GRAY, Color::BLACK, 2), 3)
        .with_name("torch")
        .with_position(Point::new(4, 1));
    original.set_effect(Some(Box::new(fade)))?;
    original.update(Duration::from_millis(100));

    let mut restored = Entity::from_json(&original.to_json()?, &font)?;
    assert_eq!(restored.id(), original.id());
    assert_eq!(restored.name(), "torch");
    assert!(restored.is_dirty());

    for _ in 0..3 {
        original.update(Duration::from_millis(80));
        restored.update(Duration::from_millis(80));
        assert_eq!(
            AppearanceState::from(restored.single_appearance()?),
            AppearanceState::from(original.single_appearance()?)
        );
    }
    Ok(())
}

#[test]
fn test_entity_record_written_to_disk() -> GridResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("entity.json");
    let entity = Entity::new(ColoredGlyph::new(Color::CYAN, Color::BLACK, 9), 0).with_position(Point::new(7, 2));
    std::fs::write(&path, entity.to_json()?)?;

    let json = std::fs::read_to_string(&path)?;
    let record: EntityRecord = serde_json::from_str(&json)?;
    assert_eq!(record.position, Point::new(7, 2));
    let loaded = Entity::from_record(record, &FontMetrics::default())?;
    assert_eq!(loaded.single_appearance()?.foreground(), Color::CYAN);
    Ok(())
}

#[test]
fn test_cell_surface_record_keeps_running_effects() -> GridResult<()> {
    let font = FontMetrics::default();
    let mut cells = CellSurface::new(4, 2)?;
    cells.print(Point::new(0, 0), "ab", Color::WHITE, &font)?;
    let cycle = CycleGlyphs::new(vec![1, 2, 3], Duration::from_millis(50))?
        .with_settings(EffectSettings::default().with_clone_on_add(true));
    cells.set_effect_from(&[0, 5], &cycle)?;
    cells.update_effects(Duration::from_millis(60));

    let json = serde_json::to_string(&cells.to_record())?;
    let record: CellSurfaceRecord = serde_json::from_str(&json)?;
    assert_eq!(record.effects.len(), 2);
    let mut restored = CellSurface::from_record(record, &font)?;

    cells.update_effects(Duration::from_millis(50));
    restored.update_effects(Duration::from_millis(50));
    for index in 0..cells.len() {
        assert_eq!(restored.cell(index)?.glyph(), cells.cell(index)?.glyph());
    }
    Ok(())
}

#[test]
fn test_records_are_validated_like_constructors() {
    let small_font = FontMetrics::new(8, 8, 16);

    // A glyph cycle naming a glyph the font lacks.
    let record = EffectRecord::from_effect(&CycleGlyphs::new(vec![1, 200], Duration::from_millis(10)).unwrap());
    assert!(record.into_effect(&small_font).is_err());

    // A cycle with no glyphs at all.
    let json = r#"{ "version": 1, "effect": { "kind": "CycleGlyphs", "glyphs": [], "speed": { "secs": 0, "nanos": 10000000 }, "repeat": true, "settings": { "remove_on_finished": false, "restore_cell_on_removed": false, "clone_on_add": false, "start_delay": { "secs": 0, "nanos": 0 } }, "timer": { "elapsed": { "secs": 0, "nanos": 0 }, "is_finished": false } } }"#;
    let record: EffectRecord = serde_json::from_str(json).unwrap();
    assert!(matches!(record.effect, EffectKind::CycleGlyphs(_)));
    assert!(matches!(
        record.into_effect(&small_font),
        Err(GridError::InvalidEffect(_))
    ));

    // A surface record whose cell count does not match its size.
    let mut stored = CellSurface::new(2, 2).unwrap().to_record();
    stored.cells.pop();
    assert!(matches!(
        CellSurface::from_record(stored, &small_font),
        Err(GridError::InvalidState(_))
    ));
}
