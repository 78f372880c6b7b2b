//! End-to-end render ordering and dirty suppression through a surface's pipeline.

use gridglyph::{
    Color, Cursor, CursorStep, FontMetrics, GridError, GridResult, OutputStep, Point,
    RecordingTarget, RenderPipeline, ScreenSurface, StepRegistry, Surface, SurfaceStep,
    TintStep, WindowChrome,
};

fn tinted_surface() -> GridResult<ScreenSurface> {
    let mut screen = ScreenSurface::new("ordering", 6, 3, FontMetrics::new(8, 8, 256))?;
    screen.set_tint(Color::BLUE.with_alpha(64));
    screen.set_cursor(Some(Cursor::new()));
    screen.print(Point::new(0, 0), "abc", Color::WHITE)?;
    Ok(screen)
}

fn frame(screen: &mut ScreenSurface) -> GridResult<Vec<&'static str>> {
    let mut target = RecordingTarget::new();
    screen.refresh(false)?;
    screen.render(&mut target)?;
    Ok(target.layers())
}

#[test]
fn test_layer_order_survives_unrelated_edits() -> GridResult<()> {
    let mut screen = tinted_surface()?;
    let mut pipeline = RenderPipeline::new();
    pipeline.add_render_step(Box::new(SurfaceStep::new()));
    pipeline.add_render_step(Box::new(TintStep::new()));
    pipeline.add_render_step(Box::new(CursorStep::new()));
    screen.set_renderer(Some(pipeline))?;

    assert_eq!(frame(&mut screen)?, vec!["surface", "tint", "cursor"]);

    // An addition is only visible after the frame that queued it flushes.
    let renderer = screen.renderer_mut().ok_or_else(|| GridError::InvalidState("no renderer".into()))?;
    renderer.add_render_step(Box::new(OutputStep::new()));
    assert_eq!(renderer.live_step_names(), vec!["surface", "tint", "cursor", "output"]);
    assert_eq!(renderer.step_names(), vec!["surface", "tint", "cursor"]);
    assert_eq!(frame(&mut screen)?, vec!["surface", "tint", "cursor"]);
    assert_eq!(frame(&mut screen)?, vec!["surface", "tint", "cursor", "output"]);

    let renderer = screen.renderer_mut().ok_or_else(|| GridError::InvalidState("no renderer".into()))?;
    assert!(renderer.remove_by_name("output").is_some());
    assert_eq!(frame(&mut screen)?, vec!["surface", "tint", "cursor", "output"]);
    assert_eq!(frame(&mut screen)?, vec!["surface", "tint", "cursor"]);
    Ok(())
}

#[test]
fn test_sorting_orders_registry_steps() -> GridResult<()> {
    let registry = StepRegistry::with_builtins();
    let mut pipeline = registry.pipeline(&["cursor", "tint", "output", "surface"])?;
    pipeline.sort_steps();
    assert_eq!(pipeline.live_step_names(), vec!["surface", "output", "cursor", "tint"]);

    let mut screen = tinted_surface()?;
    screen.set_renderer(Some(pipeline))?;
    assert_eq!(frame(&mut screen)?, vec!["surface", "output", "cursor", "tint"]);
    Ok(())
}

#[test]
fn test_second_refresh_without_changes_regenerates_nothing() -> GridResult<()> {
    let registry = StepRegistry::with_builtins();
    let mut screen = tinted_surface()?;
    screen.set_renderer(Some(registry.pipeline(&["surface", "output", "cursor", "tint"])?))?;

    screen.refresh(false)?;
    let stats = screen.renderer().map(|r| r.stats()).unwrap_or_default();
    assert_eq!(stats.last_regenerations, 3);

    screen.refresh(false)?;
    let stats = screen.renderer().map(|r| r.stats()).unwrap_or_default();
    assert_eq!(stats.last_regenerations, 0);
    assert_eq!(stats.refreshes, 2);

    // Marking the surface dirty brings the cell-driven steps back.
    screen.set_tint(Color::RED.with_alpha(32));
    screen.refresh(false)?;
    let stats = screen.renderer().map(|r| r.stats()).unwrap_or_default();
    assert!(stats.last_regenerations > 0);

    screen.refresh(true)?;
    let stats = screen.renderer().map(|r| r.stats()).unwrap_or_default();
    assert_eq!(stats.last_regenerations, 3);
    Ok(())
}

#[test]
fn test_detached_pipeline_rejects_refresh() {
    let mut pipeline = RenderPipeline::new();
    pipeline.add_render_step(Box::new(SurfaceStep::new()));
    let mut screen = ScreenSurface::new("loose", 2, 2, FontMetrics::default()).unwrap();
    assert!(matches!(
        pipeline.refresh(&mut screen, false),
        Err(GridError::NotAttached(_))
    ));
    assert!(matches!(screen.detach_renderer(), Err(GridError::NotAttached(_))));
}

#[test]
fn test_removed_overlays_stop_drawing() -> GridResult<()> {
    let mut screen = tinted_surface()?;
    screen.set_window(Some(WindowChrome::new("log")));
    let pipeline = StepRegistry::with_builtins().pipeline(&["window", "surface", "output", "cursor"])?;
    screen.set_renderer(Some(pipeline))?;
    assert_eq!(frame(&mut screen)?, vec!["window", "surface", "output", "cursor"]);

    screen.set_dirty(false);
    screen.set_cursor(None);
    screen.set_window(None);
    assert!(screen.is_dirty());
    assert_eq!(frame(&mut screen)?, vec!["surface", "output"]);

    // Clearing an overlay that is already gone leaves the frame cached.
    screen.set_cursor(None);
    screen.set_window(None);
    assert!(!screen.is_dirty());
    Ok(())
}
