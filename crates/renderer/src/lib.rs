//! Renderer crate for fragtoy, a ShaderToy-style fragment shader playground.
//!
//! The flow from the binary down to the GPU:
//!
//! ```text
//!   fragtoy CLI
//!        │ RendererConfig
//!        ▼
//!   Renderer::run ──▶ winit event loop ──▶ AppEvent ──▶ EventBindings::dispatch
//!                           │                                 │
//!                           │ RedrawRequested                 ▼
//!                           └──▶ GpuState::render ──▶ ShaderSession (load / tick / resize)
//!                                                             │
//!                                                             ▼
//!                                                    GpuBackend (wgpu pipelines)
//! ```
//!
//! [`ShaderSession`] is the core: it owns the live program, the path it came
//! from and the `iGlobalTime`/`iMouse`/`iResolution`/`iChannel0` values. It is
//! generic over [`ShaderBackend`], so everything above the wgpu layer runs
//! without a GPU. User fragment sources are wrapped into Vulkan GLSL and
//! validated with naga before they reach the device (see [`wrap_fragment`]).

mod compile;
mod events;
mod gpu;
mod session;
mod types;
mod window;

use anyhow::Result;

pub use compile::{prepare_fragment, validate_glsl, wrap_fragment, VERTEX_SHADER_GLSL};
pub use events::{
    report_shader_error, AppEvent, EventBindings, EventHandler, EventKind, KeyPress, SessionHost,
};
pub use gpu::CaptureError;
pub use session::{
    MouseState, SessionState, ShaderBackend, ShaderError, ShaderSession, Uniform, CHANNEL0_UNIT,
};
pub use types::{
    Antialiasing, ColorSpaceMode, RendererConfig, DEFAULT_CLEAR_COLOR, DEFAULT_SCREENSHOT_KEY,
};
pub use wgpu::naga::ShaderStage;

/// Entry point that owns the start-up configuration.
pub struct Renderer {
    config: RendererConfig,
}

impl Renderer {
    pub fn new(config: RendererConfig) -> Self {
        Self { config }
    }

    /// Opens the window and blocks until it is closed.
    ///
    /// Fails only when the window, surface or device cannot be created; shader
    /// and screenshot errors are logged and the loop keeps running.
    pub fn run(&mut self) -> Result<()> {
        window::run(&self.config)
    }
}
