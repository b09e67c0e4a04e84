use anyhow::Result;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::keyboard::PhysicalKey;

use crate::core::{App, AppControl, FrameCtx, WindowCtx};
use crate::device::Gpu;
use crate::shader::fullscreen::{self, DEFAULT_VERTEX};
use crate::shader::{ProgramOptions, ShaderContext};
use crate::snapshot::{self, PendingSnapshot, SnapshotConfig};

use super::toy::{RenderHook, SetupHook, ShaderToy};

/// Runtime side of a [`ShaderToy`]: Uninitialized until the window is ready,
/// then Ready for the rest of the run.
pub(super) struct ToyState {
    vertex: String,
    fragment: String,
    options: ProgramOptions,
    snapshot_config: SnapshotConfig,
    setup: Option<SetupHook>,
    render: Option<RenderHook>,

    ctx: Option<ShaderContext>,
    pending: PendingSnapshot,
}

impl ToyState {
    pub(super) fn new(toy: ShaderToy) -> Self {
        Self {
            vertex: toy.vertex.unwrap_or_else(|| DEFAULT_VERTEX.to_string()),
            fragment: toy.fragment,
            options: toy.options,
            snapshot_config: toy.snapshot,
            setup: toy.setup,
            render: toy.render,
            ctx: None,
            pending: PendingSnapshot::default(),
        }
    }

    /// Builds the context for a `width` x `height` surface and runs setup.
    fn load(&mut self, width: u32, height: u32) -> Result<()> {
        let mut ctx = ShaderContext::new(&self.vertex, &self.fragment, self.options.clone())?;
        fullscreen::install_quad(&mut ctx, width, height)?;

        if let Some(setup) = &mut self.setup {
            setup(&mut ctx);
        }

        log::info!("shader context ready at {width}x{height}");
        self.ctx = Some(ctx);
        Ok(())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if let Some(ctx) = &mut self.ctx {
            ctx.resize(width, height);
            fullscreen::push_size_uniforms(ctx);
        }
    }

    fn key(&mut self, event: &KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        if event.physical_key == PhysicalKey::Code(self.snapshot_config.key) {
            self.request_snapshot();
        }
    }

    fn request_snapshot(&mut self) {
        if self.pending.request() {
            log::debug!("snapshot requested");
        } else {
            log::debug!("snapshot already pending");
        }
    }

    fn take_snapshot(&mut self, gpu: &Gpu<'_>) -> Result<()> {
        let Some(ctx) = &mut self.ctx else {
            return Ok(());
        };

        let size = gpu.size();
        let image = snapshot::capture(gpu.device(), gpu.queue(), ctx, size.width, size.height)?;
        let path = snapshot::save(&image, &self.snapshot_config.directory, snapshot::unix_millis())?;
        log::info!("saved snapshot {}", path.display());
        Ok(())
    }
}

impl App for ToyState {
    fn on_window_ready(&mut self, _window: &WindowCtx<'_>, gpu: &Gpu<'_>) -> Result<()> {
        let size = gpu.size();
        self.load(size.width, size.height)
    }

    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        match event {
            WindowEvent::Resized(size) => self.resize(size.width, size.height),
            WindowEvent::KeyboardInput { event, .. } => self.key(event),
            _ => {}
        }
        AppControl::Continue
    }

    fn on_frame(&mut self, frame: &mut FrameCtx<'_, '_>) -> AppControl {
        let Some(ctx) = &mut self.ctx else {
            return AppControl::Continue;
        };

        if let Some(render) = &mut self.render {
            render(ctx, &frame.time);
        }

        if self.pending.take() {
            if let Err(e) = self.take_snapshot(frame.gpu) {
                log::error!("snapshot failed: {e:#}");
            }
        }

        let Some(ctx) = &mut self.ctx else {
            return AppControl::Continue;
        };
        let control = frame.render(|rctx, target| ctx.flush(rctx, target));
        ctx.end_frame();
        control
    }
}
