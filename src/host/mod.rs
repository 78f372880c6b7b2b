//! # Host Module
//!
//! The pieces a host application needs to run the engine: loadable
//! configuration and a frame driver that owns surfaces and runs the
//! update, refresh and render phases in order.

pub mod driver;
pub mod settings;

pub use driver::*;
pub use settings::*;
