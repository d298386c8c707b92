//! wgpu backend
//!
//! Textures are plain `wgpu::Texture` objects with a view and a per-object
//! sampler. wgpu frees the GPU memory once the last handle is dropped.

use super::{SamplingState, TextureBackend, TextureDesc, TextureFilter};
use crate::error::{CacheError, Result};
use crate::format::GpuFormat;

impl TextureFilter {
    pub fn to_wgpu(self) -> wgpu::FilterMode {
        match self {
            TextureFilter::Nearest => wgpu::FilterMode::Nearest,
            TextureFilter::Linear => wgpu::FilterMode::Linear,
        }
    }
}

impl GpuFormat {
    /// Matching wgpu format, if the API has one
    pub fn to_wgpu(self) -> Option<wgpu::TextureFormat> {
        match self {
            GpuFormat::Rgba8 => Some(wgpu::TextureFormat::Rgba8Unorm),
            GpuFormat::Bc1 => Some(wgpu::TextureFormat::Bc1RgbaUnorm),
            // No packed 5551 format in WebGPU
            GpuFormat::Rgb5a1 => None,
        }
    }
}

/// Texture object owned by [`WgpuBackend`]
pub struct WgpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub sampler: Option<wgpu::Sampler>,
    format: GpuFormat,
}

impl WgpuTexture {
    pub fn format(&self) -> GpuFormat {
        self.format
    }
}

/// Backend writing through a wgpu device and queue
pub struct WgpuBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
}

impl WgpuBackend {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        Self { device, queue }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    /// Largest log2 dimension the device accepts, for [`crate::CacheConfig::hw_max_log2`]
    pub fn max_log2(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d.max(1).ilog2()
    }
}

impl TextureBackend for WgpuBackend {
    type Texture = WgpuTexture;

    fn supports(&self, format: GpuFormat) -> bool {
        match format {
            GpuFormat::Rgba8 => true,
            GpuFormat::Bc1 => self
                .device
                .features()
                .contains(wgpu::Features::TEXTURE_COMPRESSION_BC),
            GpuFormat::Rgb5a1 => false,
        }
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<WgpuTexture> {
        let fail = |reason: String| CacheError::Allocation {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            reason,
        };

        let Some(format) = desc.format.to_wgpu().filter(|_| self.supports(desc.format)) else {
            return Err(fail("format not supported by device".to_string()));
        };
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(fail(format!("exceeds device limit of {}", max)));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: Some("Cached Texture"),
            size: wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
            mip_level_count: desc.mip_level_count,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let invalid = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());
        if let Some(error) = out_of_memory.or(invalid) {
            return Err(fail(error.to_string()));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        Ok(WgpuTexture {
            texture,
            view,
            sampler: None,
            format: desc.format,
        })
    }

    fn write_level(
        &mut self,
        texture: &mut WgpuTexture,
        level: u32,
        width: u32,
        height: u32,
        row_pitch: usize,
        data: &[u8],
    ) {
        // Block formats copy whole blocks, even for levels smaller than 4×4
        let (width, height) = if texture.format.is_compressed() {
            (width.next_multiple_of(4), height.next_multiple_of(4))
        } else {
            (width, height)
        };

        self.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: level,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            data,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(row_pitch as u32),
                rows_per_image: None,
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn apply_sampling(&mut self, texture: &mut WgpuTexture, sampling: &SamplingState) {
        let address_mode = if sampling.clamp {
            wgpu::AddressMode::ClampToEdge
        } else {
            wgpu::AddressMode::Repeat
        };
        let filter = sampling.filter.to_wgpu();
        let mipmap_filter = if sampling.mipmapped {
            filter
        } else {
            wgpu::FilterMode::Nearest
        };
        // Anisotropy requires linear filtering everywhere
        let anisotropy_clamp = if filter == wgpu::FilterMode::Linear && sampling.mipmapped {
            sampling.anisotropy.max(1)
        } else {
            1
        };

        texture.sampler = Some(self.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Cached Texture Sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter,
            anisotropy_clamp,
            ..Default::default()
        }));
    }
}
