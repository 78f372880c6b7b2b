//! Entity appearance variants, positioning and dirty notification.

use gridglyph::{
    AnimatedSurface, AppearanceMode, Color, ColoredGlyph, DirtyChange, Entity, EntityAppearance,
    FontMetrics, GridError, GridResult, Point, Recolor,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

fn glyph(g: u32) -> ColoredGlyph {
    ColoredGlyph::new(Color::WHITE, Color::BLACK, g)
}

#[test]
fn test_inactive_variant_accessors_fail() -> GridResult<()> {
    let mut single = Entity::new(glyph(64), 0);
    assert!(matches!(
        single.surface(),
        Err(GridError::InactiveAppearance { requested: "surface", active: "single" })
    ));
    assert!(single.surface_mut().is_err());
    assert_eq!(single.single_appearance()?.glyph(), 64);

    let animation = AnimatedSurface::new("blob", 2, 2, 2, Duration::from_millis(100))?;
    let mut multi = Entity::with_surface(animation, 0);
    assert!(matches!(
        multi.single_appearance(),
        Err(GridError::InactiveAppearance { requested: "single", active: "surface" })
    ));
    assert!(multi.set_effect(Some(Box::new(Recolor::new(Some(Color::RED), None)))).is_err());
    assert!(multi.effect().is_err());
    assert_eq!(multi.surface()?.frame_count(), 2);

    // Switching without a payload is refused; confirming the active mode is fine.
    assert!(single.set_mode(AppearanceMode::Surface).is_err());
    single.set_mode(AppearanceMode::Single)?;
    assert_eq!(single.mode(), AppearanceMode::Single);
    Ok(())
}

#[test]
fn test_replacing_the_appearance_switches_variant() -> GridResult<()> {
    let mut entity = Entity::new(glyph(64), 0).with_position(Point::new(5, 5));
    let animation = AnimatedSurface::new("blob", 3, 3, 1, Duration::from_millis(100))?
        .with_center(Point::new(1, 1));

    let previous = entity.replace_appearance(EntityAppearance::from(animation));
    assert_eq!(previous.mode(), AppearanceMode::Single);
    assert_eq!(entity.mode(), AppearanceMode::Surface);
    assert!(entity.single_appearance().is_err());

    // The frame is anchored on the entity position by its center.
    assert_eq!(entity.absolute_position(), Point::new(4, 4));
    entity.set_use_pixel_positioning(true);
    assert_eq!(entity.absolute_position(), Point::new(5, 5));

    entity.replace_appearance(EntityAppearance::from(glyph(1)));
    assert_eq!(entity.single_appearance()?.glyph(), 1);
    Ok(())
}

#[test]
fn test_pixel_position_follows_font() {
    let font = FontMetrics::new(8, 16, 256);
    let entity = Entity::new(glyph(64), 0).with_position(Point::new(2, 3));
    assert_eq!(entity.pixel_position(&font), Point::new(16, 48));

    let entity = Entity::new(glyph(64), 0)
        .with_pixel_positioning(true)
        .with_position(Point::new(2, 3));
    assert_eq!(entity.pixel_position(&font), Point::new(2, 3));
}

#[test]
fn test_observer_hears_each_transition_once() {
    let seen: Rc<RefCell<Vec<DirtyChange>>> = Rc::new(RefCell::new(Vec::new()));
    let log = Rc::clone(&seen);
    let mut entity = Entity::new(glyph(64), 0).with_dirty_observer(move |change| log.borrow_mut().push(change));
    let id = entity.id();

    entity.set_dirty(false);
    entity.set_dirty(false);
    entity.set_position(Point::new(1, 0));
    entity.set_position(Point::new(2, 0));
    entity.set_z_index(4);

    let flags: Vec<bool> = seen.borrow().iter().map(|change| change.is_dirty).collect();
    assert_eq!(flags, vec![false, true]);
    assert!(seen.borrow().iter().all(|change| change.entity == id));
}

#[test]
fn test_effect_update_reports_dirty() -> GridResult<()> {
    let seen = Rc::new(RefCell::new(0usize));
    let count = Rc::clone(&seen);
    let mut entity = Entity::new(glyph(64), 0).with_dirty_observer(move |change| {
        if change.is_dirty {
            *count.borrow_mut() += 1;
        }
    });
    entity.set_dirty(false);
    entity.set_effect(Some(Box::new(Recolor::new(Some(Color::RED), None))))?;
    assert_eq!(*seen.borrow(), 0);

    assert!(entity.update(Duration::from_millis(16)));
    assert_eq!(*seen.borrow(), 1);
    assert_eq!(entity.single_appearance()?.foreground(), Color::RED);
    Ok(())
}

#[test]
fn test_animation_frames_advance_and_stop() -> GridResult<()> {
    let mut animation = AnimatedSurface::new("steps", 1, 1, 3, Duration::from_millis(100))?.with_repeat(false);
    animation.play();
    let mut entity = Entity::with_surface(animation, 0);
    entity.set_dirty(false);

    assert!(entity.update(Duration::from_millis(100)));
    assert_eq!(entity.surface()?.current_index(), 1);
    assert!(entity.is_dirty());

    entity.update(Duration::from_millis(250));
    assert_eq!(entity.surface()?.current_index(), 2);
    assert!(!entity.surface()?.is_playing());
    Ok(())
}

#[test]
fn test_changing_center_moves_the_frame() -> GridResult<()> {
    let animation = AnimatedSurface::new("blob", 3, 3, 1, Duration::from_millis(100))?;
    let mut entity = Entity::with_surface(animation, 0).with_position(Point::new(5, 5));
    assert_eq!(entity.absolute_position(), Point::new(5, 5));

    entity.surface_mut()?.set_center(Point::new(1, 1));
    assert_eq!(entity.absolute_position(), Point::new(4, 4));
    assert_eq!(entity.pixel_position(&FontMetrics::new(8, 8, 256)), Point::new(32, 32));
    Ok(())
}
