use std::f32::consts::PI;

use quadtoy_engine::shader::{ShaderContext, ShaderError};
use quadtoy_engine::time::FrameTime;
use quadtoy_engine::ShaderToy;

pub const FRAGMENT: &str = include_str!("../../shaders/mandelbulb.wgsl");

const POWER: f32 = 8.0;
/// Radians per second around the vertical axis.
const SPIN: f32 = 0.2;
const TILT: f32 = PI / 12.0;

pub fn toy() -> ShaderToy {
    ShaderToy::new(FRAGMENT)
        .title("quadtoy - mandelbulb")
        .on_render(|ctx, time| {
            if let Err(e) = update(ctx, time) {
                log::warn!("{e}");
            }
            ctx.draw_screen();
        })
}

fn update(ctx: &mut ShaderContext, time: &FrameTime) -> Result<(), ShaderError> {
    ctx.set_uniform_vec2("uWorldRot", &[time.elapsed * SPIN, TILT])?;
    ctx.set_uniform_float("power", POWER)
}
