use quadtoy_engine::ShaderToy;

pub const FRAGMENT: &str = include_str!("../../shaders/gradient.wgsl");

pub fn toy() -> ShaderToy {
    ShaderToy::new(FRAGMENT)
        .title("quadtoy - gradient")
        .on_render(|ctx, time| {
            if let Err(e) = ctx.set_uniform_float("time", time.elapsed * 20.0) {
                log::warn!("{e}");
            }
            ctx.draw_screen();
        })
}
