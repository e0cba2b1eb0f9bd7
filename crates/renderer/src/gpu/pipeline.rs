use std::path::Path;

use bytemuck::Zeroable;
use wgpu::naga::ShaderStage;

use crate::compile::{create_shader_module, prepare_fragment, validate_glsl, RECTANGLE_VERTICES};
use crate::session::{ShaderBackend, Uniform, CHANNEL0_UNIT};
use crate::types::ColorSpaceMode;

use super::channels::ChannelTexture;
use super::context::GpuContext;
use super::uniforms::FragtoyUniforms;

pub(crate) struct PipelineLayouts {
    pub uniform_layout: wgpu::BindGroupLayout,
    pub channel_layout: wgpu::BindGroupLayout,
    pub pipeline_layout: wgpu::PipelineLayout,
}

impl PipelineLayouts {
    pub fn new(device: &wgpu::Device) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("uniform layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let channel_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("channel layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        multisampled: false,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fragtoy pipeline layout"),
            bind_group_layouts: &[&uniform_layout, &channel_layout],
            push_constant_ranges: &[],
        });

        Self {
            uniform_layout,
            channel_layout,
            pipeline_layout,
        }
    }
}

/// A compiled shader pair with its own uniform buffer.
///
/// Dropping the program frees the pipeline and buffer.
pub(crate) struct GpuProgram {
    pipeline: wgpu::RenderPipeline,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniforms: FragtoyUniforms,
}

/// [`ShaderBackend`] that turns shader pairs into wgpu render pipelines.
pub(crate) struct GpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layouts: PipelineLayouts,
    _channel: ChannelTexture,
    channel_bind_group: wgpu::BindGroup,
    surface_format: wgpu::TextureFormat,
    sample_count: u32,
    live_programs: usize,
}

impl GpuBackend {
    pub fn new(
        context: &GpuContext,
        startup_texture: Option<&Path>,
        color_space: ColorSpaceMode,
    ) -> Self {
        let channel = ChannelTexture::load_or_placeholder(
            &context.device,
            &context.queue,
            startup_texture,
            color_space,
        );
        let device = context.device.clone();
        let layouts = PipelineLayouts::new(&device);
        let channel_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("iChannel0 bind group"),
            layout: &layouts.channel_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&channel.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&channel.sampler),
                },
            ],
        });

        Self {
            device,
            queue: context.queue.clone(),
            layouts,
            _channel: channel,
            channel_bind_group,
            surface_format: context.surface_format,
            sample_count: context.sample_count,
            live_programs: 0,
        }
    }

    /// Records the draw for `program` into an open render pass.
    pub fn draw(&self, program: &GpuProgram, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&program.pipeline);
        pass.set_bind_group(0, &program.uniform_bind_group, &[]);
        pass.set_bind_group(1, &self.channel_bind_group, &[]);
        pass.draw(0..RECTANGLE_VERTICES, 0..1);
    }

    fn create_pipeline(
        &self,
        vertex_module: &wgpu::ShaderModule,
        fragment_module: &wgpu::ShaderModule,
    ) -> wgpu::RenderPipeline {
        self.device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("fragtoy pipeline"),
                layout: Some(&self.layouts.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: vertex_module,
                    entry_point: Some("main"),
                    buffers: &[],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState {
                    count: self.sample_count,
                    mask: !0,
                    alpha_to_coverage_enabled: false,
                },
                fragment: Some(wgpu::FragmentState {
                    module: fragment_module,
                    entry_point: Some("main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.surface_format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                }),
                multiview: None,
                cache: None,
            })
    }

    fn write_uniforms(&self, program: &GpuProgram) {
        self.queue.write_buffer(
            &program.uniform_buffer,
            0,
            bytemuck::bytes_of(&program.uniforms),
        );
    }
}

impl ShaderBackend for GpuBackend {
    type Program = GpuProgram;

    fn compile(&mut self, vertex_source: &str, fragment_source: &str) -> Result<GpuProgram, String> {
        validate_glsl(vertex_source, ShaderStage::Vertex)
            .map_err(|diagnostic| format!("vertex shader: {diagnostic}"))?;
        let wrapped = prepare_fragment(fragment_source)?;

        // Anything naga accepted but wgpu rejects is reported here instead of
        // reaching the device's uncaptured-error handler.
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = create_shader_module(
            &self.device,
            "fragtoy vertex",
            vertex_source.to_string(),
            ShaderStage::Vertex,
        );
        let fragment_module =
            create_shader_module(&self.device, "fragtoy fragment", wrapped, ShaderStage::Fragment);
        let pipeline = self.create_pipeline(&vertex_module, &fragment_module);
        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(error.to_string());
        }

        let uniforms = FragtoyUniforms::zeroed();
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("fragtoy uniforms"),
            size: std::mem::size_of::<FragtoyUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("fragtoy uniform bind group"),
            layout: &self.layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let program = GpuProgram {
            pipeline,
            uniform_buffer,
            uniform_bind_group,
            uniforms,
        };
        self.write_uniforms(&program);
        self.live_programs += 1;
        tracing::debug!(live = self.live_programs, "created shader program");
        Ok(program)
    }

    fn release(&mut self, program: GpuProgram) {
        drop(program);
        self.live_programs = self.live_programs.saturating_sub(1);
        tracing::debug!(live = self.live_programs, "released shader program");
    }

    fn set_uniform(&mut self, program: &mut GpuProgram, uniform: Uniform) {
        match uniform {
            Uniform::Channel(unit) if unit != CHANNEL0_UNIT => {
                tracing::warn!(
                    uniform = uniform.name(),
                    unit,
                    "only texture unit 0 is bound; ignoring"
                );
            }
            uniform => {
                if program.uniforms.apply(uniform) {
                    tracing::trace!(uniform = uniform.name(), "updated uniform");
                    self.write_uniforms(program);
                }
            }
        }
    }
}
