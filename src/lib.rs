//! # Gridglyph
//!
//! A grid-based glyph engine: surfaces made of colored glyph cells are composed,
//! animated, and drawn each frame through a pluggable render pipeline.
//!
//! ## Architecture Overview
//!
//! The engine is organised around three tightly coupled pieces:
//!
//! - **Deferred lists**: [`DeferredList`] records mutations against a live
//!   sequence and replays them into a materialized snapshot at a safe point,
//!   so render steps can be added or removed while a frame is mid-render.
//! - **Render pipelines**: [`RenderPipeline`] owns an ordered, named set of
//!   [`RenderStep`]s attached to one drawable surface. Steps consult dirty
//!   flags during `refresh` and emit draw calls during `render`.
//! - **Appearance effects**: [`AppearanceEffectEngine`] holds a cell's live
//!   appearance, a private pre-effect snapshot and at most one timed
//!   [`CellEffect`], deciding when the cell becomes dirty and how it is
//!   restored when the effect ends.
//!
//! A frame runs in two phases: the host calls `update(dt)` on its surfaces and
//! entities, then `refresh` followed by `render` on every pipeline. Pending
//! pipeline edits are flushed after the render pass.

pub mod appearance;
pub mod collections;
pub mod effects;
pub mod entities;
pub mod host;
pub mod rendering;
pub mod surface;

// Core module re-exports
pub use appearance::*;
pub use collections::*;
pub use effects::*;
pub use entities::*;
pub use host::*;
pub use rendering::*;
pub use surface::*;

/// Core error type for the Gridglyph engine.
#[derive(thiserror::Error, Debug)]
pub enum GridError {
    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// An API contract was violated by the caller
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Internal state is inconsistent
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The requested appearance variant is not the active one
    #[error("Appearance variant '{requested}' is not active (active: '{active}')")]
    InactiveAppearance {
        requested: &'static str,
        active: &'static str,
    },

    /// A pipeline or step was attached twice
    #[error("Already attached: {0}")]
    AlreadyAttached(String),

    /// A pipeline or step was used without being attached
    #[error("Not attached: {0}")]
    NotAttached(String),

    /// A referenced index is outside the available range
    #[error("{what} index {index} is out of range (limit {limit})")]
    OutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    /// No render step is registered under the given name
    #[error("Unknown render step: {0}")]
    UnknownStep(String),

    /// A stored record has a version this build cannot read
    #[error("Unsupported record version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    /// Effect parameters are not usable
    #[error("Invalid effect: {0}")]
    InvalidEffect(String),
}

/// Result type used throughout the Gridglyph codebase.
pub type GridResult<T> = Result<T, GridError>;

/// Version information for the engine.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine configuration constants.
pub mod config {
    /// Default glyph cell width in pixels
    pub const DEFAULT_GLYPH_WIDTH: u32 = 8;

    /// Default glyph cell height in pixels
    pub const DEFAULT_GLYPH_HEIGHT: u32 = 16;

    /// Number of glyphs in the default code page font
    pub const DEFAULT_GLYPH_COUNT: u32 = 256;

    /// Default surface width in cells
    pub const DEFAULT_SURFACE_WIDTH: usize = 80;

    /// Default surface height in cells
    pub const DEFAULT_SURFACE_HEIGHT: usize = 25;

    /// Opacity assigned to new pipelines (fully visible)
    pub const DEFAULT_OPACITY: u8 = 255;

    /// Render steps a new surface receives, in order
    pub const DEFAULT_RENDER_STEPS: &[&str] = &["surface", "output", "tint"];

    /// Version written into every stored record
    pub const RECORD_VERSION: u32 = 1;

    /// Frames per second target for the host loop
    pub const TARGET_FPS: u64 = 60;
}
