//! Full-screen quad on top of [`ShaderContext`].
//!
//! The quad is a four-vertex triangle strip covering clip space; the fragment
//! shader does all the work. Size uniforms:
//!
//! - `vRes`: `(W, H)` in pixels
//! - `vRatio`: `(W / H, 1)`

use super::context::ShaderContext;
use super::layout::DrawMode;
use super::uniforms::UniformKind;
use super::{ProgramOptions, ShaderError};

/// Pass-through vertex stage for the quad.
pub const DEFAULT_VERTEX: &str = r#"
@vertex
fn vs_main(@location(0) vPos: vec2<f32>) -> @builtin(position) vec4<f32> {
    return vec4<f32>(vPos, 0.0, 1.0);
}
"#;

/// Strip order: bottom-left, bottom-right, top-left, top-right.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];

pub const POSITION_ATTRIBUTE: &str = "vPos";

/// Binds the covering quad to `ctx` and pushes the size uniforms for
/// `width` x `height`.
pub fn install_quad(ctx: &mut ShaderContext, width: u32, height: u32) -> Result<(), ShaderError> {
    ctx.resize(width, height);
    ctx.upload_buffer(&QUAD_VERTICES);
    ctx.set_vertex_stride(2);
    ctx.add_attribute(POSITION_ATTRIBUTE, 2)?;
    push_size_uniforms(ctx);
    Ok(())
}

/// Writes `vRes` and `vRatio` from the context viewport.
///
/// Programs that declare neither are left alone. Nothing is written while the
/// height is zero.
pub fn push_size_uniforms(ctx: &mut ShaderContext) {
    let viewport = ctx.viewport();
    let Some(ratio) = viewport.ratio() else {
        return;
    };

    for (name, value) in [("vRes", viewport.resolution()), ("vRatio", ratio)] {
        if let Err(e) = ctx.set_uniform_quiet(name, UniformKind::Vec2, &value) {
            log::warn!("cannot update size uniform: {e}");
        }
    }
}

/// A [`ShaderContext`] that always draws the covering quad.
pub struct FullscreenShader {
    ctx: ShaderContext,
}

impl FullscreenShader {
    /// Builds the context with [`DEFAULT_VERTEX`].
    pub fn new(
        fragment_src: &str,
        options: ProgramOptions,
        width: u32,
        height: u32,
    ) -> Result<Self, ShaderError> {
        Self::with_vertex(DEFAULT_VERTEX, fragment_src, options, width, height)
    }

    /// The vertex stage must take the quad corners as `vPos: vec2<f32>`.
    pub fn with_vertex(
        vertex_src: &str,
        fragment_src: &str,
        options: ProgramOptions,
        width: u32,
        height: u32,
    ) -> Result<Self, ShaderError> {
        let mut ctx = ShaderContext::new(vertex_src, fragment_src, options)?;
        install_quad(&mut ctx, width, height)?;
        Ok(Self { ctx })
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        push_size_uniforms(&mut self.ctx);
    }

    /// Draws the quad as a triangle strip, starting at vertex `skip`.
    pub fn draw(&mut self, skip: u32) {
        self.ctx.draw(DrawMode::TriangleStrip, skip);
    }

    pub fn draw_screen(&mut self) {
        self.ctx.draw_screen();
    }

    pub fn context(&self) -> &ShaderContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ShaderContext {
        &mut self.ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::shader::{DrawKind, UniformValue};
    use crate::snapshot;

    const SIZED: &str = r#"
        struct Uniforms { vRes: vec2<f32>, vRatio: vec2<f32> }
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @fragment
        fn fs_main(@builtin(position) p: vec4<f32>) -> @location(0) vec4<f32> {
            let uv = p.xy / u.vRes;
            return vec4<f32>(uv * u.vRatio, 0.0, 1.0);
        }
    "#;

    const SOLID: &str = r#"
        struct Uniforms { color: vec3<f32> }
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @fragment
        fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(u.color, 1.0); }
    "#;

    #[test]
    fn install_quad_sets_size_uniforms() {
        let fs = FullscreenShader::new(SIZED, ProgramOptions::default(), 800, 400).unwrap();
        let ctx = fs.context();
        assert_eq!(ctx.vertex_count(), 4);
        assert_eq!(ctx.uniform_value("vRes"), Some(UniformValue::Vec2([800.0, 400.0])));
        assert_eq!(ctx.uniform_value("vRatio"), Some(UniformValue::Vec2([2.0, 1.0])));
    }

    #[test]
    fn resize_updates_size_uniforms() {
        let mut fs = FullscreenShader::new(SIZED, ProgramOptions::default(), 800, 400).unwrap();
        fs.resize(1024, 768);
        assert_eq!(fs.context().uniform_value("vRes"), Some(UniformValue::Vec2([1024.0, 768.0])));
        assert_eq!(
            fs.context().uniform_value("vRatio"),
            Some(UniformValue::Vec2([1024.0 / 768.0, 1.0]))
        );
    }

    #[test]
    fn resize_is_idempotent() {
        let mut fs = FullscreenShader::new(SIZED, ProgramOptions::default(), 640, 480).unwrap();
        fs.resize(1280, 720);
        let first = (fs.context().uniform_value("vRes"), fs.context().uniform_value("vRatio"));
        fs.resize(1280, 720);
        let second = (fs.context().uniform_value("vRes"), fs.context().uniform_value("vRatio"));
        assert_eq!(first, second);
    }

    #[test]
    fn zero_height_keeps_previous_size_uniforms() {
        let mut fs = FullscreenShader::new(SIZED, ProgramOptions::default(), 640, 480).unwrap();
        fs.resize(640, 0);
        assert_eq!(fs.context().uniform_value("vRes"), Some(UniformValue::Vec2([640.0, 480.0])));
    }

    #[test]
    fn programs_without_size_uniforms_are_left_alone() {
        // Strict names would turn an unresolved `vRes` into an error.
        let fs = FullscreenShader::new(SOLID, ProgramOptions::strict(), 320, 200).unwrap();
        assert_eq!(fs.context().uniform_value("vRes"), None);
    }

    #[test]
    fn draw_always_covers_the_quad() {
        let mut fs = FullscreenShader::new(SOLID, ProgramOptions::default(), 32, 32).unwrap();
        fs.draw(0);
        fs.draw_screen();
        let calls = fs.context().draw_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].mode, DrawMode::TriangleStrip);
        assert_eq!(calls[0].kind, DrawKind::Vertices(0..4));
    }

    #[test]
    fn uniform_colour_fills_the_frame() {
        let Some((device, queue)) = headless::device() else {
            eprintln!("no graphics adapter; skipping");
            return;
        };

        let (w, h) = (16, 8);
        let mut fs = FullscreenShader::new(SOLID, ProgramOptions::strict(), w, h).unwrap();
        fs.context_mut().set_uniform_vec3("color", &[1.0, 0.0, 1.0]).unwrap();
        fs.draw_screen();

        let image = snapshot::capture(&device, &queue, fs.context_mut(), w, h).unwrap();
        assert_eq!(image.dimensions(), (w, h));
        assert!(image.pixels().all(|p| p.0 == [255, 0, 255, 255]));
    }
}
