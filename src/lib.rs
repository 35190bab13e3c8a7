//! Two-layer tile compositor.
//!
//! A scene is a grid of cells, each holding a front and a back layer that
//! reference atlas tiles, carry a tint and may be mirrored. Every output
//! pixel shows the front layer where it is visible, the back layer where
//! it is not, and opaque black where neither is.
//!
//! [`compose::Compositor`] runs the rules on the CPU; [`renderer::GpuCompositor`]
//! runs the same rules as a wgpu fragment shader.

pub mod compose;
pub mod config;
pub mod error;
pub mod frame;
pub mod renderer;
pub mod scene;
pub mod tileset;
pub mod viewport;

pub use error::{Error, Result};
