//! # Collections Module
//!
//! Containers shared by the rendering and entity systems.

pub mod deferred;

pub use deferred::*;
