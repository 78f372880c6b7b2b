//! # Gridglyph Demo Host
//!
//! Opens a macroquad window, builds one surface with a few animated entities
//! and per-cell effects, and drives it through the frame driver.

use clap::Parser;
use gridglyph::{
    AnimatedSurface, Blink, CellEffect, Color, ColoredGlyph, Control, ControlHost, Cursor,
    CycleGlyphs, DrawCall, DrawTarget, EffectSettings, EngineConfig, Entity, Fade, FrameDriver,
    GlyphQuad, Gradient, GridError, GridResult, Point, Surface, WindowChrome,
};
use macroquad::prelude::{
    clear_background, draw_rectangle, draw_rectangle_lines, draw_text, get_frame_time,
    is_key_pressed, next_frame, request_new_screen_size, KeyCode,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

#[cfg(feature = "dev-tools")]
use tracing::{error, info, Level};
#[cfg(not(feature = "dev-tools"))]
use log::{error, info};

/// Command line arguments for the demo host.
#[derive(Parser, Debug)]
#[command(name = "gridglyph-demo")]
#[command(about = "Animated glyph surfaces drawn through render pipelines")]
#[command(version)]
struct Args {
    /// Random seed for entity placement
    #[arg(short, long)]
    seed: Option<u64>,

    /// JSON engine configuration file
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of wandering entities to spawn
    #[arg(short, long, default_value_t = 12)]
    entities: usize,
}

/// Draw target backed by macroquad's immediate-mode drawing.
struct MacroquadTarget {
    origin: Point,
}

impl MacroquadTarget {
    fn draw_quad(&self, origin: Point, quad: &GlyphQuad, opacity: u8) {
        let x = (origin.x + quad.dest.x) as f32;
        let y = (origin.y + quad.dest.y) as f32;
        let (w, h) = (quad.dest.width as f32, quad.dest.height as f32);
        if quad.background.a > 0 {
            draw_rectangle(x, y, w, h, to_screen(quad.background, opacity));
        }
        if let Some(symbol) = glyph_symbol(quad.glyph) {
            let mut buffer = [0u8; 4];
            draw_text(
                symbol.encode_utf8(&mut buffer),
                x,
                y + h * 0.8,
                h,
                to_screen(quad.foreground, opacity),
            );
        }
    }
}

impl DrawTarget for MacroquadTarget {
    fn draw(&mut self, call: DrawCall) {
        match call {
            DrawCall::Quads {
                origin,
                quads,
                opacity,
                ..
            } => {
                let origin = origin + self.origin;
                for quad in quads.iter() {
                    self.draw_quad(origin, quad, opacity);
                }
            }
            DrawCall::Fill { rect, color, .. } => draw_rectangle(
                (self.origin.x + rect.x) as f32,
                (self.origin.y + rect.y) as f32,
                rect.width as f32,
                rect.height as f32,
                to_screen(color, 255),
            ),
            DrawCall::Composite { area, opacity } => draw_rectangle_lines(
                (self.origin.x + area.x) as f32,
                (self.origin.y + area.y) as f32,
                area.width as f32,
                area.height as f32,
                1.0,
                to_screen(Color::GRAY, opacity),
            ),
        }
    }
}

fn to_screen(color: Color, opacity: u8) -> macroquad::color::Color {
    let alpha = (u16::from(color.a) * u16::from(opacity) / 255) as u8;
    macroquad::color::Color::from_rgba(color.r, color.g, color.b, alpha)
}

/// Printable ASCII glyphs are drawn as text; everything else is a block.
fn glyph_symbol(glyph: u32) -> Option<char> {
    match glyph {
        0 | 32 => None,
        33..=126 => char::from_u32(glyph),
        _ => Some('#'),
    }
}

#[macroquad::main("Gridglyph Demo")]
async fn main() -> GridResult<()> {
    let args = Args::parse();
    initialize_logging(&args.log_level)?;

    info!("Starting Gridglyph demo v{}", gridglyph::VERSION);

    if let Err(e) = run_demo(&args).await {
        error!("Demo failed: {}", e);
        return Err(e);
    }
    Ok(())
}

/// Initializes logging based on the specified level.
fn initialize_logging(log_level: &str) -> GridResult<()> {
    #[cfg(feature = "dev-tools")]
    {
        let level = match log_level.to_lowercase().as_str() {
            "error" => Level::ERROR,
            "warn" => Level::WARN,
            "info" => Level::INFO,
            "debug" => Level::DEBUG,
            "trace" => Level::TRACE,
            _ => Level::INFO,
        };

        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
    }

    #[cfg(not(feature = "dev-tools"))]
    {
        env_logger::Builder::new()
            .parse_filters(log_level)
            .try_init()
            .map_err(|e| GridError::InvalidState(format!("logger already set: {}", e)))?;
    }

    Ok(())
}

fn load_config(args: &Args) -> GridResult<EngineConfig> {
    match &args.config {
        Some(path) => EngineConfig::load(path),
        None => {
            let mut config = EngineConfig::new();
            config.render_steps = ["window", "surface", "entities", "controls", "output", "cursor", "tint"]
                .iter()
                .map(|name| name.to_string())
                .collect();
            config.surface_width = 60;
            config.surface_height = 30;
            Ok(config)
        }
    }
}

async fn run_demo(args: &Args) -> GridResult<()> {
    let config = load_config(args)?;
    let seed = args.seed.unwrap_or_else(rand::random);
    info!("Using seed {}", seed);
    let mut rng = StdRng::seed_from_u64(seed);

    let (width, height) = (config.surface_width, config.surface_height);
    let clear_color = config.clear_color;
    let frame_budget = config.frame_duration();
    let screen_w = (width as u32 * config.font.glyph_width + 64) as f32;
    let screen_h = (height as u32 * config.font.glyph_height + 96) as f32;
    request_new_screen_size(screen_w, screen_h);

    let mut driver = FrameDriver::new(config)?;
    let index = driver.create_surface("main")?;
    let surface = driver
        .surface_mut(index)
        .ok_or_else(|| GridError::InvalidState("surface vanished after creation".to_string()))?;
    populate(surface, &mut rng, args.entities)?;

    let mut target = MacroquadTarget {
        origin: Point::new(32, 48),
    };
    let mut tinted = false;
    loop {
        if is_key_pressed(KeyCode::Escape) {
            info!("Exiting after {} frames", driver.frame_count());
            break;
        }
        if is_key_pressed(KeyCode::Space) {
            tinted = !tinted;
            let tint = if tinted {
                Color::BLUE.with_alpha(64)
            } else {
                Color::TRANSPARENT
            };
            if let Some(surface) = driver.surface_mut(index) {
                surface.set_tint(tint);
            }
        }
        if let Some(surface) = driver.surface_mut(index) {
            wander(surface, &mut rng);
        }

        clear_background(to_screen(clear_color, 255));
        let delta = Duration::from_secs_f32(get_frame_time()).min(frame_budget * 4);
        let report = driver.tick(delta, &mut target)?;
        draw_text(
            &format!(
                "frame {}  regenerated {}  draws {}  [space] tint  [esc] quit",
                report.frame, report.regenerations, report.draw_calls
            ),
            8.0,
            20.0,
            18.0,
            macroquad::color::WHITE,
        );
        next_frame().await;
    }
    Ok(())
}

/// Fills the surface with a title, a fading border row, overlays and entities.
fn populate(
    surface: &mut gridglyph::ScreenSurface,
    rng: &mut StdRng,
    count: usize,
) -> GridResult<()> {
    let (width, height) = (surface.cells().width(), surface.cells().height());
    if width < 16 || height < 4 {
        return Err(GridError::InvalidState(format!(
            "demo surface must be at least 16x4 cells, got {}x{}",
            width, height
        )));
    }
    surface.print(Point::new(1, 0), "gridglyph", Color::CYAN)?;

    let pulse = Fade::new(
        Some(Gradient::new(Color::GRAY, Color::WHITE)),
        None,
        Duration::from_millis(900),
    )?
    .with_repeat(true)
    .with_auto_reverse(true)
    .with_settings(EffectSettings::default().with_clone_on_add(true));
    let bottom_row: Vec<usize> = (0..width).map(|x| (height - 1) * width + x).collect();
    for &cell in &bottom_row {
        surface.cells_mut().cell_mut(cell)?.set_glyph(61);
    }
    surface.cells_mut().set_effect_from(&bottom_row, &pulse)?;

    surface.set_window(Some(
        WindowChrome::new("Gridglyph").with_colors(Color::GRAY, Color::rgb(40, 40, 90)),
    ));
    surface.set_cursor(Some(Cursor::new()));
    let mut controls = ControlHost::new();
    controls.add(Control::new("status", Point::new(width as i32 - 12, 0), 12, 1).with_color(Color::rgb(30, 60, 30)));
    surface.set_controls(Some(controls));

    for n in 0..count {
        let position = Point::new(
            rng.gen_range(0..width as i32),
            rng.gen_range(1..height as i32 - 1),
        );
        let glyph = rng.gen_range(65..91);
        let color = Color::rgb(rng.gen_range(80..=255), rng.gen_range(80..=255), rng.gen_range(80..=255));
        let mut entity = Entity::new(ColoredGlyph::new(color, Color::TRANSPARENT, glyph), n as i32 % 3)
            .with_name(format!("wanderer-{}", n))
            .with_position(position)
            .with_dirty_observer(|change| log::trace!("Entity {} dirty: {}", change.entity, change.is_dirty));
        let effect: Box<dyn CellEffect> = match n % 3 {
            0 => Box::new(Blink::new(Duration::from_millis(rng.gen_range(200..600)))?),
            1 => Box::new(CycleGlyphs::new(vec![glyph, 42, 43], Duration::from_millis(300))?.with_repeat(true)),
            _ => Box::new(
                Fade::new(Some(Gradient::new(color, Color::RED)), None, Duration::from_secs(1))?
                    .with_repeat(true)
                    .with_auto_reverse(true),
            ),
        };
        entity.set_effect(Some(effect))?;
        surface.add_entity(entity);
    }

    let mut spinner = AnimatedSurface::new("spinner", 1, 1, 4, Duration::from_millis(150))?;
    for (frame, glyph) in [124u32, 47, 45, 92].into_iter().enumerate() {
        spinner
            .frame_mut(frame)?
            .set_cell(0, ColoredGlyph::new(Color::YELLOW, Color::TRANSPARENT, glyph))?;
    }
    spinner.play();
    surface.add_entity(
        Entity::with_surface(spinner, 10)
            .with_name("spinner")
            .with_position(Point::new(width as i32 / 2, height as i32 / 2)),
    );
    Ok(())
}

/// Nudges a random entity and the cursor by one cell now and then.
fn wander(surface: &mut gridglyph::ScreenSurface, rng: &mut StdRng) {
    if !rng.gen_bool(0.1) {
        return;
    }
    let (width, height) = (surface.cells().width() as i32, surface.cells().height() as i32);
    let step = Point::new(rng.gen_range(-1..=1), rng.gen_range(-1..=1));
    let ids: Vec<_> = surface.entities().iter().map(|entity| entity.id()).collect();
    if ids.is_empty() {
        return;
    }
    let id = ids[rng.gen_range(0..ids.len())];
    if let Some(entity) = surface.entity_mut(id) {
        let next = entity.position() + step;
        if (0..width).contains(&next.x) && (1..height - 1).contains(&next.y) {
            entity.set_position(next);
        }
    }
    if let Some(cursor) = surface.cursor_mut() {
        let next = cursor.position() + step;
        if (0..width).contains(&next.x) && (0..height).contains(&next.y) {
            cursor.set_position(next);
        }
    }
}
