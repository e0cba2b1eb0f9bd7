//! Screenshot readback: render into an offscreen copy of the frame, copy it
//! into a mappable buffer and write the rows out as PNG.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::RgbaImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("surface format {0:?} cannot be written as an 8-bit RGBA screenshot")]
    UnsupportedFormat(wgpu::TextureFormat),
    #[error("failed to read the frame back from the GPU: {0}")]
    Readback(String),
    #[error("failed to create screenshot directory {}: {source}", .path.display())]
    Directory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to write screenshot {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Channel order of an 8-bit surface format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelOrder {
    Rgba,
    Bgra,
}

fn channel_order(format: wgpu::TextureFormat) -> Option<ChannelOrder> {
    match format {
        wgpu::TextureFormat::Rgba8Unorm | wgpu::TextureFormat::Rgba8UnormSrgb => {
            Some(ChannelOrder::Rgba)
        }
        wgpu::TextureFormat::Bgra8Unorm | wgpu::TextureFormat::Bgra8UnormSrgb => {
            Some(ChannelOrder::Bgra)
        }
        _ => None,
    }
}

const BYTES_PER_PIXEL: u32 = 4;

/// Row pitch of the readback buffer; copies require 256-byte aligned rows.
pub(crate) fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

/// Offscreen single-sample texture the frame is re-rendered into, plus the
/// buffer it is copied to.
pub(crate) struct CaptureTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    order: ChannelOrder,
}

impl CaptureTarget {
    pub fn new(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        (width, height): (u32, u32),
    ) -> Result<Self, CaptureError> {
        let order = channel_order(format).ok_or(CaptureError::UnsupportedFormat(format))?;
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("screenshot target"),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("screenshot readback"),
            size: u64::from(padded_bytes_per_row(width)) * u64::from(height),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        Ok(Self {
            texture,
            view,
            buffer,
            width,
            height,
            order,
        })
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    /// Queues the texture-to-buffer copy; call after the capture pass.
    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.buffer,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(padded_bytes_per_row(self.width)),
                    rows_per_image: Some(self.height),
                },
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
    }

    /// Waits for the submitted copy, then writes a timestamped PNG into
    /// `directory`.
    pub fn finish(self, device: &wgpu::Device, directory: &Path) -> Result<PathBuf, CaptureError> {
        let slice = self.buffer.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        device
            .poll(wgpu::PollType::Wait)
            .map_err(|err| CaptureError::Readback(err.to_string()))?;
        rx.recv()
            .map_err(|err| CaptureError::Readback(err.to_string()))?
            .map_err(|err| CaptureError::Readback(err.to_string()))?;

        let mapped = slice.get_mapped_range();
        let mut pixels = unpad_rows(
            &mapped,
            padded_bytes_per_row(self.width) as usize,
            (self.width * BYTES_PER_PIXEL) as usize,
            self.height as usize,
        );
        drop(mapped);
        self.buffer.unmap();

        if self.order == ChannelOrder::Bgra {
            swizzle_bgra_to_rgba(&mut pixels);
        }
        write_png(directory, self.width, self.height, pixels, Local::now())
    }
}

pub(crate) fn unpad_rows(data: &[u8], padded: usize, unpadded: usize, height: usize) -> Vec<u8> {
    if padded == unpadded {
        return data[..unpadded * height].to_vec();
    }
    let mut rows = Vec::with_capacity(unpadded * height);
    for row in data.chunks(padded).take(height) {
        rows.extend_from_slice(&row[..unpadded]);
    }
    rows
}

pub(crate) fn swizzle_bgra_to_rgba(pixels: &mut [u8]) {
    for pixel in pixels.chunks_exact_mut(4) {
        pixel.swap(0, 2);
    }
}

pub(crate) fn screenshot_file_name(timestamp: DateTime<Local>) -> String {
    format!("fragtoy-{}.png", timestamp.format("%Y%m%d-%H%M%S%.3f"))
}

/// Encodes tightly packed RGBA rows (top row first) as PNG.
pub(crate) fn write_png(
    directory: &Path,
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    timestamp: DateTime<Local>,
) -> Result<PathBuf, CaptureError> {
    fs::create_dir_all(directory).map_err(|source| CaptureError::Directory {
        path: directory.to_path_buf(),
        source,
    })?;
    let path = directory.join(screenshot_file_name(timestamp));
    let image = RgbaImage::from_raw(width, height, pixels)
        .ok_or_else(|| CaptureError::Readback(format!("pixel data does not fill {width}x{height}")))?;
    image.save(&path).map_err(|source| CaptureError::Encode {
        path: path.clone(),
        source,
    })?;
    Ok(path)
}
