//! Frame timing.
//!
//! One `FrameClock` per render loop; `tick()` once per presented frame. The
//! resulting `FrameTime` is what render hooks use to animate uniforms.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
