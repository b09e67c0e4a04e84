//! The render driver: one window, one shader context, two user hooks.
//!
//! ```rust,ignore
//! ShaderToy::new(include_str!("plasma.wgsl"))
//!     .title("plasma")
//!     .on_render(|ctx, time| {
//!         let _ = ctx.set_uniform_float("time", time.elapsed);
//!         ctx.draw_screen();
//!     })
//!     .run()?;
//! ```

mod state;
mod toy;

pub use toy::{RenderHook, SetupHook, ShaderToy};
