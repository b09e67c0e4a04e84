//! Viewport geometry shared by the shader harness and the driver.
//!
//! Sizes are physical pixels: that is what the surface is configured with and
//! what `vRes` reports to fragment shaders.

mod viewport;

pub use viewport::Viewport;
