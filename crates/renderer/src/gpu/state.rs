use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Result;
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{error, info, trace};
use winit::dpi::PhysicalSize;

use crate::compile::VERTEX_SHADER_GLSL;
use crate::events::{report_shader_error, SessionHost};
use crate::session::{SessionState, ShaderSession};
use crate::types::RendererConfig;

use super::capture::CaptureTarget;
use super::context::GpuContext;
use super::pipeline::GpuBackend;

struct MultisampleTarget {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

impl MultisampleTarget {
    fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        size: PhysicalSize<u32>,
        sample_count: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("msaa color target"),
            size: wgpu::Extent3d {
                width: size.width.max(1),
                height: size.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Self {
            _texture: texture,
            view,
        }
    }

    fn for_context(context: &GpuContext) -> Option<Self> {
        (context.sample_count > 1).then(|| {
            Self::new(
                &context.device,
                context.surface_format,
                context.size,
                context.sample_count,
            )
        })
    }
}

/// Owns the GPU context and the shader session that draws into it.
pub(crate) struct GpuState {
    host: SessionHost<GpuBackend>,
    context: GpuContext,
    multisample_target: Option<MultisampleTarget>,
    clear_color: wgpu::Color,
    screenshot_dir: PathBuf,
    start_time: Instant,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        config: &RendererConfig,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(
            target,
            initial_size,
            config.antialiasing,
            config.color_space,
        )?;
        let backend = GpuBackend::new(
            &context,
            config.startup_texture.as_deref(),
            context.color_space,
        );
        let size = (context.size.width, context.size.height);
        let session = ShaderSession::new(backend, VERTEX_SHADER_GLSL, size);
        let multisample_target = MultisampleTarget::for_context(&context);
        let [r, g, b] = config.clear_color;

        Ok(Self {
            host: SessionHost::new(session),
            context,
            multisample_target,
            clear_color: wgpu::Color { r, g, b, a: 1.0 },
            screenshot_dir: config.screenshot_dir.clone(),
            start_time: Instant::now(),
        })
    }

    pub(crate) fn host_mut(&mut self) -> &mut SessionHost<GpuBackend> {
        &mut self.host
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    /// Loads the start-up shader; failures are logged and leave the window
    /// showing only the clear colour.
    pub(crate) fn load_initial(&mut self, path: &Path) {
        if let Err(err) = self.host.session.load(path) {
            report_shader_error(&err);
        }
    }

    /// Reconfigures the swapchain. Returns false for zero-sized windows, in
    /// which case the session should not see the new size either.
    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) -> bool {
        if !self.context.resize(new_size) {
            return false;
        }
        self.multisample_target = MultisampleTarget::for_context(&self.context);
        true
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Pushes per-frame uniforms, draws, presents, and services a pending
    /// screenshot request.
    pub(crate) fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let elapsed = self.start_time.elapsed().as_secs_f32();
        if self.host.session.tick(elapsed).is_err() {
            trace!("no shader program installed; clearing only");
        }

        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .context
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame encoder"),
            });
        self.encode_frame(&mut encoder, &view);

        let capture = if self.host.take_screenshot_request() {
            self.encode_capture(&mut encoder)
        } else {
            None
        };

        self.context.queue.submit(Some(encoder.finish()));
        frame.present();

        if let Some(capture) = capture {
            match capture.finish(&self.context.device, &self.screenshot_dir) {
                Ok(path) => info!(path = %path.display(), "saved screenshot"),
                Err(err) => error!(error = %err, "failed to save screenshot"),
            }
        }
        Ok(())
    }

    fn encode_capture(&self, encoder: &mut wgpu::CommandEncoder) -> Option<CaptureTarget> {
        let size = (self.context.size.width, self.context.size.height);
        match CaptureTarget::new(&self.context.device, self.context.surface_format, size) {
            Ok(target) => {
                self.encode_frame(encoder, target.view());
                target.encode_copy(encoder);
                Some(target)
            }
            Err(err) => {
                error!(error = %err, "failed to save screenshot");
                None
            }
        }
    }

    /// Clears `view` and, when a program is installed, draws the rectangle.
    fn encode_frame(&self, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let (attachment_view, resolve_target) = match self.multisample_target.as_ref() {
            Some(msaa) => (&msaa.view, Some(view)),
            None => (view, None),
        };
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("fragtoy pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: attachment_view,
                depth_slice: None,
                resolve_target,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        let session = &self.host.session;
        if session.state() == SessionState::Loaded {
            if let Some(program) = session.program() {
                session.backend().draw(program, &mut pass);
            }
        }
    }
}
