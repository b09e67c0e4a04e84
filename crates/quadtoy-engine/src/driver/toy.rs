use anyhow::Result;
use winit::dpi::LogicalSize;

use crate::device::GpuInit;
use crate::shader::{ProgramOptions, ShaderContext};
use crate::snapshot::SnapshotConfig;
use crate::time::FrameTime;
use crate::window::{Runtime, RuntimeConfig};

use super::state::ToyState;

/// Called once, right after the context is built and the quad is bound.
pub type SetupHook = Box<dyn FnMut(&mut ShaderContext)>;

/// Called every frame before the recorded work is flushed.
pub type RenderHook = Box<dyn FnMut(&mut ShaderContext, &FrameTime)>;

/// Builder for a full-screen shader window.
///
/// The context is created when the window is ready, with the default quad
/// vertex stage unless [`vertex`](Self::vertex) supplies another.
pub struct ShaderToy {
    pub(super) vertex: Option<String>,
    pub(super) fragment: String,
    pub(super) options: ProgramOptions,
    pub(super) snapshot: SnapshotConfig,
    pub(super) setup: Option<SetupHook>,
    pub(super) render: Option<RenderHook>,

    runtime: RuntimeConfig,
    gpu: GpuInit,
}

impl ShaderToy {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            vertex: None,
            fragment: fragment.into(),
            options: ProgramOptions::default(),
            snapshot: SnapshotConfig::default(),
            setup: None,
            render: None,
            runtime: RuntimeConfig::default(),
            gpu: GpuInit::default(),
        }
    }

    /// Replaces the quad vertex stage. It must still take `vPos: vec2<f32>`.
    pub fn vertex(mut self, src: impl Into<String>) -> Self {
        self.vertex = Some(src.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.runtime.title = title.into();
        self
    }

    /// Initial window size in logical pixels.
    pub fn size(mut self, width: f64, height: f64) -> Self {
        self.runtime.initial_size = LogicalSize::new(width, height);
        self
    }

    pub fn options(mut self, options: ProgramOptions) -> Self {
        self.options = options;
        self
    }

    /// Shorthand for toggling [`ProgramOptions::debug`].
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = debug;
        self
    }

    pub fn gpu(mut self, gpu: GpuInit) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn snapshot(mut self, snapshot: SnapshotConfig) -> Self {
        self.snapshot = snapshot;
        self
    }

    pub fn on_setup<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ShaderContext) + 'static,
    {
        self.setup = Some(Box::new(f));
        self
    }

    pub fn on_render<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut ShaderContext, &FrameTime) + 'static,
    {
        self.render = Some(Box::new(f));
        self
    }

    /// Opens the window and runs until it is closed.
    ///
    /// Fails when no graphics context can be acquired, or when the program
    /// fails to build in strict mode.
    pub fn run(self) -> Result<()> {
        let runtime = self.runtime.clone();
        let gpu = self.gpu.clone();
        Runtime::run(runtime, gpu, ToyState::new(self))
    }
}
