//! GPU device + surface management.
//!
//! This module is responsible for:
//! - acquiring a wgpu adapter/device/queue, falling back through backend sets
//! - creating & configuring the window surface
//! - acquiring frames and providing encoders/views for rendering

mod error;
mod frame;
mod gpu;
mod init;
mod surface;

#[cfg(test)]
pub(crate) mod headless;

pub use error::{ContextUnavailable, SurfaceErrorAction};
pub use frame::GpuFrame;
pub use gpu::Gpu;
pub use init::GpuInit;
