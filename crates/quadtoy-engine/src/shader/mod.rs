//! Single-program shader harness.
//!
//! A [`ShaderContext`] owns one WGSL program, one interleaved vertex buffer,
//! an optional 16-bit index buffer and the program's uniform block. Programs
//! are compiled and reflected on the CPU with naga, so compile errors, link
//! errors and uniform lookups never need a device. GPU objects are created
//! the first time a frame is flushed.
//!
//! [`fullscreen`] layers the covering quad and the `vRes`/`vRatio` size
//! uniforms on top.

mod context;
mod error;
mod layout;
mod options;
mod pipeline;
mod program;
mod reflect;
mod uniforms;

pub mod fullscreen;

pub use context::{DrawCall, DrawKind, SCREEN_BACKGROUND, ShaderContext};
pub use error::{ShaderError, Stage};
pub use fullscreen::FullscreenShader;
pub use layout::{AttributeDesc, DrawMode, VertexLayout};
pub use options::{CompileMode, ProgramOptions};
pub use program::Program;
pub use reflect::BlockLayout;
pub use uniforms::{UniformKind, UniformSlot, UniformValue};
