//! wgpu side of the renderer.
//!
//! - `context` owns instance/device/surface wiring and rebuilds the swapchain
//!   when the window resizes.
//! - `channels` decodes the startup image for `iChannel0` or binds a 1×1
//!   placeholder.
//! - `uniforms` mirrors the `FragtoyParams` block injected by the fragment header.
//! - `pipeline` implements `ShaderBackend`: each compiled program owns its render
//!   pipeline and uniform buffer.
//! - `capture` reads a frame back and writes it out as PNG.
//! - `state` glues everything together and exposes the `GpuState` API used by
//!   `window`.

mod capture;
mod channels;
mod context;
mod pipeline;
mod state;
mod uniforms;

pub use capture::CaptureError;
pub(crate) use pipeline::GpuBackend;
pub(crate) use state::GpuState;
