//! Objects drawn over a surface's cells: the cursor, window chrome and
//! hosted controls. Each tracks its own dirty flag so its render step can
//! skip regeneration independently of the cell grid.

use crate::{Color, ColoredGlyph, GridError, GridResult, Point};
use serde::{Deserialize, Serialize};

/// A text cursor positioned on a cell.
#[derive(Debug, Clone)]
pub struct Cursor {
    position: Point,
    appearance: ColoredGlyph,
    is_visible: bool,
    dirty: bool,
}

impl Cursor {
    /// Underscore glyph in the default code page.
    const DEFAULT_GLYPH: u32 = 95;

    pub fn new() -> Self {
        Self {
            position: Point::ZERO,
            appearance: ColoredGlyph::new(Color::WHITE, Color::TRANSPARENT, Self::DEFAULT_GLYPH),
            is_visible: true,
            dirty: true,
        }
    }

    pub fn with_appearance(mut self, appearance: ColoredGlyph) -> Self {
        self.appearance = appearance;
        self
    }

    pub fn position(&self) -> Point {
        self.position
    }

    pub fn set_position(&mut self, position: Point) {
        if self.position != position {
            self.position = position;
            self.dirty = true;
        }
    }

    /// Moves the cursor by `delta` cells.
    pub fn move_by(&mut self, delta: Point) {
        self.set_position(self.position + delta);
    }

    pub fn appearance(&self) -> &ColoredGlyph {
        &self.appearance
    }

    pub fn set_appearance(&mut self, appearance: ColoredGlyph) {
        self.appearance = appearance;
        self.dirty = true;
    }

    pub fn is_visible(&self) -> bool {
        self.is_visible
    }

    pub fn set_visible(&mut self, visible: bool) {
        if self.is_visible != visible {
            self.is_visible = visible;
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

impl Default for Cursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Border and title bar drawn around a surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowChrome {
    title: String,
    border_color: Color,
    title_color: Color,
    /// Border thickness in pixels
    border_width: u32,
    #[serde(skip, default = "dirty_by_default")]
    dirty: bool,
}

fn dirty_by_default() -> bool {
    true
}

impl WindowChrome {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            border_color: Color::GRAY,
            title_color: Color::BLUE,
            border_width: 2,
            dirty: true,
        }
    }

    pub fn with_colors(mut self, border: Color, title: Color) -> Self {
        self.border_color = border;
        self.title_color = title;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        self.dirty = true;
    }

    pub fn border_color(&self) -> Color {
        self.border_color
    }

    pub fn title_color(&self) -> Color {
        self.title_color
    }

    pub fn border_width(&self) -> u32 {
        self.border_width
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}

/// A rectangular control hosted on a surface, in cell coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Control {
    pub name: String,
    pub origin: Point,
    pub width: u32,
    pub height: u32,
    pub color: Color,
}

impl Control {
    pub fn new(name: impl Into<String>, origin: Point, width: u32, height: u32) -> Self {
        Self {
            name: name.into(),
            origin,
            width,
            height,
            color: Color::GRAY,
        }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }
}

/// The controls hosted on a surface and which one has focus.
#[derive(Debug, Clone, Default)]
pub struct ControlHost {
    controls: Vec<Control>,
    focused: Option<usize>,
    focus_color: Option<Color>,
    dirty: bool,
}

impl ControlHost {
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Self::default()
        }
    }

    pub fn add(&mut self, control: Control) {
        self.controls.push(control);
        self.dirty = true;
    }

    /// Removes the control named `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Control> {
        let index = self.controls.iter().position(|c| c.name == name)?;
        self.focused = match self.focused {
            Some(focused) if focused == index => None,
            Some(focused) if focused > index => Some(focused - 1),
            other => other,
        };
        self.dirty = true;
        Some(self.controls.remove(index))
    }

    pub fn controls(&self) -> &[Control] {
        &self.controls
    }

    pub fn focused(&self) -> Option<&Control> {
        self.focused.and_then(|index| self.controls.get(index))
    }

    pub fn focus(&mut self, index: usize) -> GridResult<()> {
        if index >= self.controls.len() {
            return Err(GridError::OutOfRange {
                what: "control",
                index,
                limit: self.controls.len(),
            });
        }
        if self.focused != Some(index) {
            self.focused = Some(index);
            self.dirty = true;
        }
        Ok(())
    }

    /// Highlight drawn over the focused control.
    pub fn focus_color(&self) -> Color {
        self.focus_color.unwrap_or(Color::YELLOW.with_alpha(96))
    }

    pub fn set_focus_color(&mut self, color: Color) {
        self.focus_color = Some(color);
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn set_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }
}
