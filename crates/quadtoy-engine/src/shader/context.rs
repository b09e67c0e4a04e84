use std::collections::HashSet;
use std::ops::Range;

use crate::coords::Viewport;
use crate::render::{RenderCtx, RenderTarget};

use super::layout::{DrawMode, VertexLayout};
use super::pipeline::GpuResources;
use super::program::Program;
use super::uniforms::{UniformBlock, UniformKind, UniformValue};
use super::{ProgramOptions, ShaderError};

/// Linear clear value of [`ShaderContext::draw_screen`].
///
/// Fill colours are linear and get sRGB-encoded on an sRGB target. This one
/// encodes to a 0.05 grey (13/255).
pub const SCREEN_BACKGROUND: f32 = 0.003_936;

/// What a recorded draw consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawKind {
    /// Non-indexed draw over this vertex range.
    Vertices(Range<u32>),
    /// Indexed draw over this range of the 16-bit index buffer.
    Indices(Range<u32>),
}

/// One draw recorded for the current frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawCall {
    pub mode: DrawMode,
    pub kind: DrawKind,
}

#[derive(Debug, Default)]
struct FrameCommands {
    clear: Option<[f32; 4]>,
    draws: Vec<DrawCall>,
}

/// One program, one vertex buffer, one optional index buffer.
///
/// Every call records CPU-side state; nothing touches the GPU until
/// [`flush`](Self::flush), which realizes buffers and pipelines lazily and
/// replays the frame's clear and draws in a single render pass.
pub struct ShaderContext {
    program: Program,
    options: ProgramOptions,

    layout: VertexLayout,
    /// Bumped on every layout change; invalidates cached pipelines.
    layout_generation: u64,

    vertices: Vec<f32>,
    vertices_dirty: bool,
    indices: Vec<u16>,
    indices_dirty: bool,

    uniforms: UniformBlock,
    viewport: Viewport,
    frame: FrameCommands,

    /// Unresolved names already warned about.
    reported: HashSet<String>,

    gpu: GpuResources,
}

impl ShaderContext {
    /// Compiles `vertex_src` + `fragment_src` and creates an empty context.
    ///
    /// Only fails in strict compile mode; see [`ProgramOptions`].
    pub fn new(
        vertex_src: &str,
        fragment_src: &str,
        options: ProgramOptions,
    ) -> Result<Self, ShaderError> {
        let program = Program::build(vertex_src, fragment_src, &options)?;
        let uniforms = UniformBlock::new(program.uniform_layout().cloned());

        if program.is_usable() {
            log::info!("shader program linked");
        } else {
            log::warn!("shader program is unusable; draws will be skipped");
        }

        Ok(Self {
            program,
            options,
            layout: VertexLayout::default(),
            layout_generation: 0,
            vertices: Vec::new(),
            vertices_dirty: false,
            indices: Vec::new(),
            indices_dirty: false,
            uniforms,
            viewport: Viewport::default(),
            frame: FrameCommands::default(),
            reported: HashSet::new(),
            gpu: GpuResources::default(),
        })
    }

    // ---- frame recording -------------------------------------------------

    /// Clears the target to `(r, g, b, a)` this frame.
    ///
    /// Draws recorded earlier in the frame would be overwritten by the clear,
    /// so they are dropped.
    pub fn fill(&mut self, r: f32, g: f32, b: f32, a: f32) {
        self.frame.clear = Some([r, g, b, a]);
        self.frame.draws.clear();
    }

    pub fn fill_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.fill(r, g, b, 1.0);
    }

    /// Records a non-indexed draw of every whole vertex from `skip` on.
    pub fn draw(&mut self, mode: DrawMode, skip: u32) {
        if self.layout.stride() == 0 {
            self.warn_once("draw:stride", "draw() with a vertex stride of 0 issues nothing");
            return;
        }

        let total = self.vertex_count();
        if skip >= total {
            return;
        }

        self.frame.draws.push(DrawCall {
            mode,
            kind: DrawKind::Vertices(skip..total),
        });
    }

    /// Records an indexed draw of `count` indices starting at `byte_offset`.
    ///
    /// The range is clamped to the uploaded index count.
    pub fn draw_elements(&mut self, mode: DrawMode, count: u32, byte_offset: u32) {
        let available = self.indices.len() as u32;
        let first = (byte_offset / 2).min(available);
        let end = first.saturating_add(count).min(available);
        if first == end {
            return;
        }

        self.frame.draws.push(DrawCall {
            mode,
            kind: DrawKind::Indices(first..end),
        });
    }

    /// Dark clear ([`SCREEN_BACKGROUND`]) plus a triangle strip over the
    /// whole vertex buffer.
    pub fn draw_screen(&mut self) {
        self.fill_rgb(SCREEN_BACKGROUND, SCREEN_BACKGROUND, SCREEN_BACKGROUND);
        self.draw(DrawMode::TriangleStrip, 0);
    }

    /// Drops everything recorded for the current frame.
    pub fn end_frame(&mut self) {
        self.frame = FrameCommands::default();
    }

    // ---- buffers & layout ------------------------------------------------

    /// Replaces the vertex data.
    pub fn upload_buffer(&mut self, data: &[f32]) {
        self.vertices.clear();
        self.vertices.extend_from_slice(data);
        self.vertices_dirty = true;
    }

    pub fn upload_index_buffer(&mut self, indices: &[u16]) {
        self.indices.clear();
        self.indices.extend_from_slice(indices);
        self.indices_dirty = true;
    }

    /// Floats per vertex in the interleaved buffer.
    pub fn set_vertex_stride(&mut self, floats: u32) {
        self.layout.set_stride(floats);
        self.layout_generation += 1;
    }

    /// Registers the next `components` floats of each vertex as `name`.
    ///
    /// The running offset advances even when `name` is not a vertex input,
    /// so attributes must be added in buffer order.
    pub fn add_attribute(&mut self, name: &str, components: u32) -> Result<(), ShaderError> {
        if !(1..=4).contains(&components) {
            return Err(ShaderError::InvalidAttribute {
                name: name.to_string(),
                components,
            });
        }

        let location = self.program.attribute_location(name);
        self.layout.push(name, location, components);
        self.layout_generation += 1;

        if location.is_some() {
            return Ok(());
        }

        if self.options.strict_names {
            return Err(ShaderError::UnknownAttribute { name: name.to_string() });
        }
        self.warn_once(
            &format!("attribute:{name}"),
            &format!("no vertex input named `{name}`; attribute ignored"),
        );
        Ok(())
    }

    // ---- uniforms --------------------------------------------------------

    pub fn set_uniform_float(&mut self, name: &str, value: f32) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Float, &[value])
    }

    pub fn set_uniform_vec2(&mut self, name: &str, value: &[f32]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Vec2, value)
    }

    pub fn set_uniform_vec3(&mut self, name: &str, value: &[f32]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Vec3, value)
    }

    /// `value` is column-major.
    pub fn set_uniform_mat4(&mut self, name: &str, value: &[f32]) -> Result<(), ShaderError> {
        self.set_uniform(name, UniformKind::Mat4, value)
    }

    fn set_uniform(
        &mut self,
        name: &str,
        kind: UniformKind,
        values: &[f32],
    ) -> Result<(), ShaderError> {
        if self.uniforms.set(name, kind, values)? {
            return Ok(());
        }

        if self.options.strict_names {
            return Err(ShaderError::UnknownUniform { name: name.to_string() });
        }
        self.warn_once(
            &format!("uniform:{name}"),
            &format!("no uniform named `{name}`; set ignored"),
        );
        Ok(())
    }

    /// Sets a harness-owned uniform without the unresolved-name policy.
    ///
    /// Returns whether the name resolved.
    pub(crate) fn set_uniform_quiet(
        &mut self,
        name: &str,
        kind: UniformKind,
        values: &[f32],
    ) -> Result<bool, ShaderError> {
        self.uniforms.set(name, kind, values)
    }

    // ---- viewport --------------------------------------------------------

    /// Records the pixel size of the render viewport.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.viewport = Viewport::from_pixels(width, height);
    }

    // ---- inspection ------------------------------------------------------

    pub fn uniform_value(&self, name: &str) -> Option<UniformValue> {
        self.uniforms.value(name)
    }

    pub fn draw_calls(&self) -> &[DrawCall] {
        &self.frame.draws
    }

    pub fn clear_color(&self) -> Option<[f32; 4]> {
        self.frame.clear
    }

    /// Whole vertices in the uploaded buffer under the current stride.
    pub fn vertex_count(&self) -> u32 {
        self.layout.vertex_count(self.vertices.len())
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn vertex_layout(&self) -> &VertexLayout {
        &self.layout
    }

    pub fn is_usable(&self) -> bool {
        self.program.is_usable()
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    // ---- GPU -------------------------------------------------------------

    /// Replays the recorded frame into `target`.
    ///
    /// Records exactly one render pass: it clears when `fill` was called this
    /// frame and loads otherwise. Draws whose pipeline is unavailable are
    /// skipped. Recorded commands are kept; call [`end_frame`](Self::end_frame)
    /// once the frame has been presented.
    pub fn flush(&mut self, rctx: &RenderCtx<'_>, target: &mut RenderTarget<'_>) {
        let device = rctx.device;
        let format = rctx.target_format;

        if self.vertices_dirty {
            self.gpu.upload_vertices(device, &self.vertices);
            self.vertices_dirty = false;
        }
        if self.indices_dirty {
            self.gpu.upload_indices(device, &self.indices);
            self.indices_dirty = false;
        }
        self.gpu.sync_uniforms(device, rctx.queue, &mut self.uniforms);

        for call in &self.frame.draws {
            self.gpu.ensure_pipeline(
                device,
                &self.program,
                &self.layout,
                self.layout_generation,
                call.mode,
                format,
            );
        }

        let load = match self.frame.clear {
            Some([r, g, b, a]) => wgpu::LoadOp::Clear(wgpu::Color {
                r: f64::from(r),
                g: f64::from(g),
                b: f64::from(b),
                a: f64::from(a),
            }),
            None => wgpu::LoadOp::Load,
        };

        let mut rpass = target.encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("quadtoy pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if self.frame.draws.is_empty() {
            return;
        }

        // Until the first resize the viewport covers the whole target.
        let (w, h) = if self.viewport.is_valid() {
            self.viewport.clamped_to(target.width, target.height)
        } else {
            (target.width, target.height)
        };
        if w == 0 || h == 0 {
            return;
        }
        rpass.set_viewport(0.0, 0.0, w as f32, h as f32, 0.0, 1.0);

        if let Some(bind_group) = &self.gpu.bind_group {
            rpass.set_bind_group(0, bind_group, &[]);
        }
        if let Some(vbo) = &self.gpu.vertex_buffer {
            rpass.set_vertex_buffer(0, vbo.slice(..));
        }
        if let Some(ibo) = &self.gpu.index_buffer {
            rpass.set_index_buffer(ibo.slice(..), wgpu::IndexFormat::Uint16);
        }

        let vertex_total = self.vertex_count();
        let index_total = self.indices.len() as u32;

        for call in &self.frame.draws {
            let Some(built) = self.gpu.pipeline(call.mode, format) else {
                continue;
            };
            if built.uses_vertex_buffer && self.gpu.vertex_buffer.is_none() {
                continue;
            }

            match &call.kind {
                DrawKind::Vertices(range) => {
                    let range = clamp(range, vertex_total);
                    if range.is_empty() {
                        continue;
                    }
                    rpass.set_pipeline(&built.pipeline);
                    rpass.draw(range, 0..1);
                }
                DrawKind::Indices(range) => {
                    let range = clamp(range, index_total);
                    if range.is_empty() || self.gpu.index_buffer.is_none() {
                        continue;
                    }
                    rpass.set_pipeline(&built.pipeline);
                    rpass.draw_indexed(range, 0, 0..1);
                }
            }
        }
    }

    fn warn_once(&mut self, key: &str, message: &str) {
        if self.reported.insert(key.to_string()) {
            log::warn!("{message}");
        }
    }
}

/// Buffers may have shrunk since the draw was recorded.
fn clamp(range: &Range<u32>, total: u32) -> Range<u32> {
    range.start.min(total)..range.end.min(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::fullscreen::{DEFAULT_VERTEX, QUAD_VERTICES};

    const FRAGMENT: &str = r#"
        struct Uniforms { vRes: vec2<f32>, vRatio: vec2<f32>, tint: vec3<f32>, time: f32 }
        @group(0) @binding(0) var<uniform> u: Uniforms;
        @fragment
        fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(u.tint * u.time, 1.0); }
    "#;

    fn context(options: ProgramOptions) -> ShaderContext {
        ShaderContext::new(DEFAULT_VERTEX, FRAGMENT, options).unwrap()
    }

    fn quad(ctx: &mut ShaderContext) {
        ctx.upload_buffer(&QUAD_VERTICES);
        ctx.set_vertex_stride(2);
        ctx.add_attribute("vPos", 2).unwrap();
    }

    #[test]
    fn draw_issues_every_whole_vertex() {
        let mut ctx = context(ProgramOptions::default());
        quad(&mut ctx);
        ctx.draw(DrawMode::TriangleStrip, 0);
        assert_eq!(
            ctx.draw_calls(),
            &[DrawCall { mode: DrawMode::TriangleStrip, kind: DrawKind::Vertices(0..4) }]
        );

        // A trailing partial vertex is not drawn.
        ctx.upload_buffer(&[0.0; 9]);
        assert_eq!(ctx.vertex_count(), 4);
    }

    #[test]
    fn draw_skip_starts_later() {
        let mut ctx = context(ProgramOptions::default());
        quad(&mut ctx);
        ctx.draw(DrawMode::Points, 1);
        ctx.draw(DrawMode::Points, 4);
        assert_eq!(ctx.draw_calls().len(), 1);
        assert_eq!(ctx.draw_calls()[0].kind, DrawKind::Vertices(1..4));
    }

    #[test]
    fn zero_stride_draws_nothing() {
        let mut ctx = context(ProgramOptions::default());
        ctx.upload_buffer(&QUAD_VERTICES);
        ctx.draw(DrawMode::Triangles, 0);
        assert!(ctx.draw_calls().is_empty());
    }

    #[test]
    fn fill_discards_earlier_draws() {
        let mut ctx = context(ProgramOptions::default());
        quad(&mut ctx);
        ctx.draw(DrawMode::TriangleStrip, 0);
        ctx.fill(1.0, 0.0, 0.0, 1.0);
        assert!(ctx.draw_calls().is_empty());
        assert_eq!(ctx.clear_color(), Some([1.0, 0.0, 0.0, 1.0]));

        ctx.draw_screen();
        let bg = SCREEN_BACKGROUND;
        assert_eq!(ctx.clear_color(), Some([bg, bg, bg, 1.0]));
        assert_eq!(ctx.draw_calls().len(), 1);

        ctx.end_frame();
        assert!(ctx.draw_calls().is_empty());
        assert_eq!(ctx.clear_color(), None);
    }

    #[test]
    fn screen_background_encodes_to_a_dark_grey() {
        let c = f64::from(SCREEN_BACKGROUND);
        let encoded = 1.055 * c.powf(1.0 / 2.4) - 0.055;
        assert!((encoded - 0.05).abs() < 1e-4, "encoded to {encoded}");
        assert_eq!((encoded * 255.0).round(), 13.0);
    }

    #[test]
    fn draw_elements_is_clamped_to_the_index_buffer() {
        let mut ctx = context(ProgramOptions::default());
        quad(&mut ctx);
        ctx.upload_index_buffer(&[0, 1, 2, 2, 1, 3]);

        ctx.draw_elements(DrawMode::Triangles, 3, 6);
        ctx.draw_elements(DrawMode::Triangles, 100, 0);
        ctx.draw_elements(DrawMode::Triangles, 3, 12);

        let kinds: Vec<_> = ctx.draw_calls().iter().map(|c| c.kind.clone()).collect();
        assert_eq!(kinds, vec![DrawKind::Indices(3..6), DrawKind::Indices(0..6)]);
    }

    #[test]
    fn vec2_with_three_values_is_rejected_and_keeps_the_old_value() {
        let mut ctx = context(ProgramOptions::default());
        ctx.set_uniform_vec2("vRes", &[800.0, 600.0]).unwrap();

        let err = ctx.set_uniform_vec2("vRes", &[1.0, 2.0, 3.0]).unwrap_err();
        assert_eq!(
            err,
            ShaderError::UniformSizeMismatch { name: "vRes".into(), expected: 2, actual: 3 }
        );
        assert_eq!(ctx.uniform_value("vRes"), Some(UniformValue::Vec2([800.0, 600.0])));
    }

    #[test]
    fn last_write_wins() {
        let mut ctx = context(ProgramOptions::default());
        ctx.set_uniform_float("time", 1.0).unwrap();
        ctx.set_uniform_float("time", 2.0).unwrap();
        ctx.set_uniform_vec3("tint", &[0.5, 0.25, 1.0]).unwrap();
        assert_eq!(ctx.uniform_value("time"), Some(UniformValue::Float(2.0)));
        assert_eq!(ctx.uniform_value("tint"), Some(UniformValue::Vec3([0.5, 0.25, 1.0])));
    }

    #[test]
    fn unresolved_names_are_ignored_by_default() {
        let mut ctx = context(ProgramOptions::default());
        assert_eq!(ctx.set_uniform_float("power", 8.0), Ok(()));
        assert_eq!(ctx.set_uniform_float("power", 9.0), Ok(()));
        assert_eq!(ctx.add_attribute("vColor", 3), Ok(()));
        assert_eq!(ctx.reported.len(), 2);
    }

    #[test]
    fn unresolved_names_fail_with_strict_names() {
        let mut ctx = context(ProgramOptions::strict());
        assert_eq!(
            ctx.set_uniform_float("power", 8.0),
            Err(ShaderError::UnknownUniform { name: "power".into() })
        );

        ctx.set_vertex_stride(5);
        assert_eq!(
            ctx.add_attribute("vColor", 3),
            Err(ShaderError::UnknownAttribute { name: "vColor".into() })
        );
        // The offset still advanced past the unknown attribute.
        ctx.add_attribute("vPos", 2).unwrap();
        assert_eq!(ctx.vertex_layout().attributes()[1].offset, 3);
    }

    #[test]
    fn attribute_component_count_is_checked() {
        let mut ctx = context(ProgramOptions::default());
        assert_eq!(
            ctx.add_attribute("vPos", 5),
            Err(ShaderError::InvalidAttribute { name: "vPos".into(), components: 5 })
        );
        assert!(ctx.vertex_layout().attributes().is_empty());
    }

    #[test]
    fn unusable_program_still_stores_uniforms() {
        let broken = r#"
            struct Uniforms { time: f32 }
            @group(0) @binding(0) var<uniform> u: Uniforms;
            @fragment
            fn fs_main(@location(3) missing: f32) -> @location(0) vec4<f32> { return vec4<f32>(u.time * missing); }
        "#;
        let mut ctx = ShaderContext::new(DEFAULT_VERTEX, broken, ProgramOptions::default()).unwrap();
        assert!(!ctx.is_usable());
        ctx.set_uniform_float("time", 3.0).unwrap();
        assert_eq!(ctx.uniform_value("time"), Some(UniformValue::Float(3.0)));
    }
}
