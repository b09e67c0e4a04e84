//! quadtoy engine crate.
//!
//! A minimal shader harness: one window, one WGSL program, a full-screen
//! quad, uniform setters and a per-frame render hook. [`driver::ShaderToy`]
//! is the usual entry point; [`shader`] can also be used on its own with any
//! wgpu device.

pub mod core;
pub mod device;
pub mod driver;
pub mod shader;
pub mod snapshot;
pub mod time;
pub mod window;

pub mod coords;
pub mod logging;
pub mod render;

pub use driver::ShaderToy;
