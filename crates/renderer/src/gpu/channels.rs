use std::path::Path;

use anyhow::{bail, Context, Result};
use image::imageops::flip_vertical_in_place;
use image::RgbaImage;
use wgpu::util::{DeviceExt, TextureDataOrder};

use crate::types::ColorSpaceMode;

/// Texture, view and sampler bound to `iChannel0`.
pub(crate) struct ChannelTexture {
    pub _texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: wgpu::Sampler,
}

impl ChannelTexture {
    /// Loads `path` when given; anything that fails falls back to the 1×1
    /// placeholder so the channel is always bound.
    pub(crate) fn load_or_placeholder(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        path: Option<&Path>,
        color_space: ColorSpaceMode,
    ) -> Self {
        let Some(path) = path else {
            tracing::debug!("no startup texture; binding placeholder to iChannel0");
            return Self::placeholder(device, queue, color_space);
        };
        match decode_channel_image(path, device.limits().max_texture_dimension_2d) {
            Ok(image) => {
                tracing::info!(
                    path = %path.display(),
                    width = image.width(),
                    height = image.height(),
                    "bound iChannel0 texture"
                );
                let (width, height) = image.dimensions();
                Self::upload(device, queue, "iChannel0 texture", (width, height), &image, color_space)
            }
            Err(error) => {
                tracing::debug!(
                    path = %path.display(),
                    error = %error,
                    "startup texture unavailable; binding placeholder"
                );
                Self::placeholder(device, queue, color_space)
            }
        }
    }

    fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue, color_space: ColorSpaceMode) -> Self {
        Self::upload(
            device,
            queue,
            "iChannel0 placeholder",
            (1, 1),
            &PLACEHOLDER_TEXEL,
            color_space,
        )
    }

    fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        label: &str,
        (width, height): (u32, u32),
        rgba: &[u8],
        color_space: ColorSpaceMode,
    ) -> Self {
        let texture = device.create_texture_with_data(
            queue,
            &wgpu::TextureDescriptor {
                label: Some(label),
                size: wgpu::Extent3d {
                    width,
                    height,
                    depth_or_array_layers: 1,
                },
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: channel_format(color_space),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            },
            TextureDataOrder::LayerMajor,
            rgba,
        );

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Linear,
            ..Default::default()
        });

        Self {
            _texture: texture,
            view,
            sampler,
        }
    }
}

/// Opaque white, so `texture(iChannel0, uv)` is neutral when multiplied.
const PLACEHOLDER_TEXEL: [u8; 4] = [255, 255, 255, 255];

fn channel_format(color_space: ColorSpaceMode) -> wgpu::TextureFormat {
    match color_space {
        ColorSpaceMode::Auto | ColorSpaceMode::Gamma => wgpu::TextureFormat::Rgba8Unorm,
        ColorSpaceMode::Linear => wgpu::TextureFormat::Rgba8UnormSrgb,
    }
}

/// Decodes an image into RGBA8 rows ordered bottom-up, matching GL texture
/// coordinates where `v = 0` is the bottom edge.
pub(crate) fn decode_channel_image(path: &Path, max_dimension: u32) -> Result<RgbaImage> {
    let image = image::open(path)
        .with_context(|| format!("failed to open texture at {}", path.display()))?;
    let mut rgba = image.to_rgba8();
    let (width, height) = rgba.dimensions();
    if width > max_dimension || height > max_dimension {
        bail!("texture is {width}x{height}, the device limit is {max_dimension}");
    }
    flip_vertical_in_place(&mut rgba);
    Ok(rgba)
}
