//! Handles passed to code that records GPU work for one frame.
//!
//! The same pair is used for the window surface and for offscreen snapshot
//! targets, so consumers never care where the pixels end up.

mod ctx;

pub use ctx::{RenderCtx, RenderTarget};
