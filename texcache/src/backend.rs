//! GPU backend seam
//!
//! The cache never talks to a graphics API directly. A backend creates texture
//! objects, writes individual mip levels and applies sampling state. Backend
//! textures release their GPU memory when dropped, so removing an entry from
//! the cache (or overflowing the recycle pool) frees it without a separate
//! destroy call.

mod headless;
#[cfg(feature = "wgpu")]
mod wgpu_impl;

pub use headless::{HeadlessBackend, HeadlessTexture};
#[cfg(feature = "wgpu")]
pub use wgpu_impl::{WgpuBackend, WgpuTexture};

use crate::error::Result;
use crate::format::GpuFormat;

/// Texture filter mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u32)]
pub enum TextureFilter {
    /// Nearest neighbor (pixelated)
    Nearest = 0,
    /// Linear interpolation (smooth)
    #[default]
    Linear = 1,
}

/// Per-object sampling parameters, changeable without re-upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SamplingState {
    pub filter: TextureFilter,
    /// Sample between mip levels (only meaningful with more than one level)
    pub mipmapped: bool,
    /// Maximum anisotropy, 1 disables
    pub anisotropy: u16,
    /// Clamp to edge instead of repeating
    pub clamp: bool,
}

impl Default for SamplingState {
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            mipmapped: false,
            anisotropy: 1,
            clamp: false,
        }
    }
}

/// Creation parameters for a GPU texture object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub mip_level_count: u32,
    pub format: GpuFormat,
}

/// Graphics API used by the cache
pub trait TextureBackend {
    /// Owned GPU texture object; dropping it releases the GPU memory
    type Texture;

    /// Whether textures of this format can be created
    fn supports(&self, format: GpuFormat) -> bool;

    /// Create an uninitialised texture object
    fn create_texture(&mut self, desc: &TextureDesc) -> Result<Self::Texture>;

    /// Write one mip level from tightly sized rows of `row_pitch` bytes
    fn write_level(
        &mut self,
        texture: &mut Self::Texture,
        level: u32,
        width: u32,
        height: u32,
        row_pitch: usize,
        data: &[u8],
    );

    /// Update filtering/addressing state of an existing object
    fn apply_sampling(&mut self, texture: &mut Self::Texture, sampling: &SamplingState);
}
