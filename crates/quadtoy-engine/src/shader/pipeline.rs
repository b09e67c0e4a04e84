//! Lazily realized GPU state behind a `ShaderContext`.

use std::borrow::Cow;
use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::layout::{DrawMode, VertexLayout};
use super::program::{CompiledStage, Program};
use super::uniforms::UniformBlock;

pub(crate) struct BuiltPipeline {
    pub pipeline: wgpu::RenderPipeline,
    pub uses_vertex_buffer: bool,
}

/// GPU objects owned by one context.
///
/// Buffers are recreated when their CPU copy changes; pipelines are cached per
/// (draw mode, target format) and dropped whenever the vertex layout changes.
/// A `None` cache entry records a pipeline that could not be built, so the
/// reason is logged once rather than every frame.
#[derive(Default)]
pub(crate) struct GpuResources {
    modules: Option<(wgpu::ShaderModule, wgpu::ShaderModule)>,

    uniform_buffer: Option<wgpu::Buffer>,
    /// Set once the block was found too large for the device.
    uniforms_rejected: bool,
    bind_group_layout: Option<wgpu::BindGroupLayout>,
    pub bind_group: Option<wgpu::BindGroup>,

    pub vertex_buffer: Option<wgpu::Buffer>,
    pub index_buffer: Option<wgpu::Buffer>,

    pipelines: HashMap<(DrawMode, wgpu::TextureFormat), Option<BuiltPipeline>>,
    pipelines_generation: u64,
}

impl GpuResources {
    pub(crate) fn upload_vertices(&mut self, device: &wgpu::Device, data: &[f32]) {
        self.vertex_buffer = (!data.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quadtoy vertex buffer"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            })
        });
    }

    pub(crate) fn upload_indices(&mut self, device: &wgpu::Device, data: &[u16]) {
        // Buffer sizes must be 4-byte aligned; pad odd index counts.
        let mut padded = data.to_vec();
        if padded.len() % 2 == 1 {
            padded.push(0);
        }

        self.index_buffer = (!padded.is_empty()).then(|| {
            device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quadtoy index buffer"),
                contents: bytemuck::cast_slice(&padded),
                usage: wgpu::BufferUsages::INDEX,
            })
        });
    }

    /// Creates the uniform buffer on first use and uploads pending writes.
    pub(crate) fn sync_uniforms(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        block: &mut UniformBlock,
    ) {
        let Some(layout) = block.layout() else { return };
        if self.uniforms_rejected {
            return;
        }

        let created = self.uniform_buffer.is_none();
        if created {
            let size = layout.buffer_size();
            if let Err(e) = fits_uniform_binding(size, &device.limits()) {
                log::error!("uniform block not bound: {e}");
                self.uniforms_rejected = true;
                return;
            }

            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("quadtoy uniform buffer"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });

            let bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("quadtoy uniform bgl"),
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: layout.binding,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: wgpu::BufferSize::new(size),
                    },
                    count: None,
                }],
            });

            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("quadtoy uniform bind group"),
                layout: &bgl,
                entries: &[wgpu::BindGroupEntry {
                    binding: layout.binding,
                    resource: buffer.as_entire_binding(),
                }],
            });

            self.uniform_buffer = Some(buffer);
            self.bind_group_layout = Some(bgl);
            self.bind_group = Some(bind_group);
        }

        // A fresh buffer is zeroed; upload whatever was set before it existed.
        if block.take_dirty() || created {
            if let Some(buffer) = &self.uniform_buffer {
                queue.write_buffer(buffer, 0, block.bytes());
            }
        }
    }

    /// Builds the pipeline for `(mode, format)` unless it is cached.
    pub(crate) fn ensure_pipeline(
        &mut self,
        device: &wgpu::Device,
        program: &Program,
        layout: &VertexLayout,
        generation: u64,
        mode: DrawMode,
        format: wgpu::TextureFormat,
    ) {
        if self.pipelines_generation != generation {
            self.pipelines.clear();
            self.pipelines_generation = generation;
        }

        let key = (mode, format);
        if self.pipelines.contains_key(&key) {
            return;
        }

        let built = self.build_pipeline(device, program, layout, mode, format);
        self.pipelines.insert(key, built);
    }

    pub(crate) fn pipeline(&self, mode: DrawMode, format: wgpu::TextureFormat) -> Option<&BuiltPipeline> {
        self.pipelines.get(&(mode, format))?.as_ref()
    }

    fn build_pipeline(
        &mut self,
        device: &wgpu::Device,
        program: &Program,
        layout: &VertexLayout,
        mode: DrawMode,
        format: wgpu::TextureFormat,
    ) -> Option<BuiltPipeline> {
        // Unlinked programs were reported when they were built.
        if !program.is_usable() {
            return None;
        }
        let (Some(vs), Some(fs)) = (&program.vertex, &program.fragment) else {
            return None;
        };

        let required: Vec<u32> = vs.iface.inputs.iter().map(|v| v.location).collect();
        if let Err(e) = layout.check(&required, &device.limits()) {
            log::error!("cannot build {mode:?} pipeline: {e}");
            return None;
        }
        if program.uniform_layout().is_some() && self.bind_group_layout.is_none() {
            log::error!("cannot build {mode:?} pipeline: uniform block has no binding");
            return None;
        }

        // Anything wgpu still rejects is reported here instead of reaching
        // the uncaptured error handler, which panics.
        let scope = device.push_error_scope(wgpu::ErrorFilter::Validation);

        self.ensure_modules(device, vs, fs);
        let (vertex_module, fragment_module) = self.modules.as_ref()?;

        let bind_group_layouts: Vec<&wgpu::BindGroupLayout> =
            self.bind_group_layout.iter().collect();
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quadtoy pipeline layout"),
            bind_group_layouts: &bind_group_layouts,
            immediate_size: 0,
        });

        let attributes = layout.wgpu_attributes();
        let uses_vertex_buffer = !attributes.is_empty();
        let buffers: Vec<wgpu::VertexBufferLayout<'_>> = if uses_vertex_buffer {
            vec![wgpu::VertexBufferLayout {
                array_stride: layout.stride_bytes(),
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: &attributes,
            }]
        } else {
            Vec::new()
        };

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("quadtoy pipeline"),
            layout: Some(&pipeline_layout),

            vertex: wgpu::VertexState {
                module: vertex_module,
                entry_point: Some(vs.iface.entry_point.as_str()),
                compilation_options: Default::default(),
                buffers: &buffers,
            },

            fragment: Some(wgpu::FragmentState {
                module: fragment_module,
                entry_point: Some(fs.iface.entry_point.as_str()),
                compilation_options: Default::default(),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),

            primitive: wgpu::PrimitiveState {
                topology: mode.topology(),
                strip_index_format: mode.strip_index_format(),
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },

            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview_mask: None,
            cache: None,
        });

        if let Some(e) = pollster::block_on(scope.pop()) {
            log::error!("cannot build {mode:?} pipeline: {e}");
            return None;
        }

        log::debug!("built {mode:?} pipeline for {format:?}");
        Some(BuiltPipeline {
            pipeline,
            uses_vertex_buffer,
        })
    }

    fn ensure_modules(&mut self, device: &wgpu::Device, vs: &CompiledStage, fs: &CompiledStage) {
        if self.modules.is_some() {
            return;
        }

        let create = |label: &str, source: &str| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(label),
                source: wgpu::ShaderSource::Wgsl(Cow::Owned(source.to_string())),
            })
        };

        self.modules = Some((
            create("quadtoy vertex shader", &vs.source),
            create("quadtoy fragment shader", &fs.source),
        ));
    }
}

/// The uniform block is bound whole, so it must fit a single binding.
fn fits_uniform_binding(size: u64, limits: &wgpu::Limits) -> Result<(), String> {
    let max = u64::from(limits.max_uniform_buffer_binding_size);
    if size > max {
        return Err(format!("{size} bytes exceeds the device limit of {max}"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::headless;
    use crate::shader::{DrawMode, FullscreenShader, ProgramOptions};
    use crate::snapshot;

    const BLUE: [u8; 4] = [0, 0, 255, 255];

    fn render_blue_backdrop(fs: &mut FullscreenShader, device: &wgpu::Device, queue: &wgpu::Queue) {
        let ctx = fs.context_mut();
        ctx.fill_rgb(0.0, 0.0, 1.0);
        ctx.draw(DrawMode::TriangleStrip, 0);

        // The pipeline is unavailable: the draw is skipped and the clear stays.
        let image = snapshot::capture(device, queue, ctx, 8, 8).unwrap();
        assert!(image.pixels().all(|p| p.0 == BLUE));
    }

    #[test]
    fn uniform_blocks_must_fit_one_binding() {
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        assert!(fits_uniform_binding(16, &limits).is_ok());
        assert!(fits_uniform_binding(16 << 10, &limits).is_ok());
        assert!(fits_uniform_binding(32 << 10, &limits).is_err());
    }

    #[test]
    fn rejected_pipeline_skips_the_draw() {
        let Some((device, queue)) = headless::device() else {
            eprintln!("no graphics adapter; skipping");
            return;
        };

        // Links on the CPU, but wgpu refuses mismatched interpolation.
        let vs = r#"
            struct VsOut {
                @builtin(position) pos: vec4<f32>,
                @location(0) @interpolate(flat) shade: f32,
            }
            @vertex
            fn vs_main(@location(0) vPos: vec2<f32>) -> VsOut {
                var out: VsOut;
                out.pos = vec4<f32>(vPos, 0.0, 1.0);
                out.shade = 1.0;
                return out;
            }
        "#;
        let fs = r#"
            @fragment
            fn fs_main(@location(0) shade: f32) -> @location(0) vec4<f32> {
                return vec4<f32>(shade, shade, 0.0, 1.0);
            }
        "#;
        let mut shader = FullscreenShader::with_vertex(vs, fs, ProgramOptions::strict(), 8, 8).unwrap();
        assert!(shader.context().is_usable());

        render_blue_backdrop(&mut shader, &device, &queue);
        // Cached as unavailable; a second frame does not retry or panic.
        render_blue_backdrop(&mut shader, &device, &queue);
    }

    #[test]
    fn oversized_vertex_stride_skips_the_draw() {
        let Some((device, queue)) = headless::device() else {
            eprintln!("no graphics adapter; skipping");
            return;
        };

        let fs = "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";
        let mut shader = FullscreenShader::new(fs, ProgramOptions::default(), 8, 8).unwrap();
        let ctx = shader.context_mut();
        let stride = device.limits().max_vertex_buffer_array_stride / 4 + 1;
        ctx.upload_buffer(&vec![0.0; stride as usize * 4]);
        ctx.set_vertex_stride(stride);

        render_blue_backdrop(&mut shader, &device, &queue);
    }

    #[test]
    fn oversized_uniform_block_skips_the_draw() {
        let Some((device, queue)) = headless::device() else {
            eprintln!("no graphics adapter; skipping");
            return;
        };

        let entries = device.limits().max_uniform_buffer_binding_size / 16 + 1;
        let fs = format!(
            r#"
            struct Uniforms {{ time: f32, table: array<vec4<f32>, {entries}> }}
            @group(0) @binding(0) var<uniform> u: Uniforms;
            @fragment
            fn fs_main() -> @location(0) vec4<f32> {{ return u.table[0] * u.time; }}
            "#
        );
        let mut shader = FullscreenShader::new(&fs, ProgramOptions::default(), 8, 8).unwrap();
        shader.context_mut().set_uniform_float("time", 1.0).unwrap();

        render_blue_backdrop(&mut shader, &device, &queue);
    }
}
