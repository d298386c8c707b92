//! CPU-side backend
//!
//! Keeps uploaded level bytes in memory and counts live objects. Used by the
//! test suite and the replay tool; also handy for asserting on exactly what
//! the converter produced.

use std::cell::Cell;
use std::rc::Rc;

use super::{SamplingState, TextureBackend, TextureDesc};
use crate::error::{CacheError, Result};
use crate::format::GpuFormat;

/// Decrements the backend's live-object counter when the texture is dropped
#[derive(Debug)]
struct LiveToken(Rc<Cell<usize>>);

impl Drop for LiveToken {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

/// Texture object owned by [`HeadlessBackend`]
#[derive(Debug)]
pub struct HeadlessTexture {
    id: u64,
    desc: TextureDesc,
    levels: Vec<Option<Vec<u8>>>,
    sampling: Option<SamplingState>,
    _live: LiveToken,
}

impl HeadlessTexture {
    /// Backend-unique object id
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn desc(&self) -> &TextureDesc {
        &self.desc
    }

    /// Bytes last written to `level`, if any
    pub fn level(&self, level: u32) -> Option<&[u8]> {
        self.levels.get(level as usize)?.as_deref()
    }

    /// Number of levels that have been written at least once
    pub fn written_levels(&self) -> usize {
        self.levels.iter().filter(|l| l.is_some()).count()
    }

    pub fn sampling(&self) -> Option<&SamplingState> {
        self.sampling.as_ref()
    }
}

/// Headless backend with allocation accounting and failure injection
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: u64,
    live: Rc<Cell<usize>>,
    created: u64,
    level_writes: u64,
    sampling_updates: u64,
    max_dimension: u32,
    unsupported: Vec<GpuFormat>,
    fail_allocations: u32,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            live: Rc::new(Cell::new(0)),
            created: 0,
            level_writes: 0,
            sampling_updates: 0,
            max_dimension: 8192,
            unsupported: Vec::new(),
            fail_allocations: 0,
        }
    }

    /// Reject creation of textures in `format`
    pub fn without_format(mut self, format: GpuFormat) -> Self {
        self.unsupported.push(format);
        self
    }

    /// Reject textures wider or taller than `max_dimension`
    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    /// Make the next `count` allocations fail
    pub fn fail_next_allocations(&mut self, count: u32) {
        self.fail_allocations = count;
    }

    /// Texture objects currently alive (not yet dropped)
    pub fn live_textures(&self) -> usize {
        self.live.get()
    }

    /// Total texture objects ever created
    pub fn created(&self) -> u64 {
        self.created
    }

    /// Total mip level writes
    pub fn level_writes(&self) -> u64 {
        self.level_writes
    }

    /// Total sampling state updates
    pub fn sampling_updates(&self) -> u64 {
        self.sampling_updates
    }
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TextureBackend for HeadlessBackend {
    type Texture = HeadlessTexture;

    fn supports(&self, format: GpuFormat) -> bool {
        !self.unsupported.contains(&format)
    }

    fn create_texture(&mut self, desc: &TextureDesc) -> Result<HeadlessTexture> {
        let fail = |reason: &str| CacheError::Allocation {
            width: desc.width,
            height: desc.height,
            format: desc.format,
            reason: reason.to_string(),
        };

        if self.fail_allocations > 0 {
            self.fail_allocations -= 1;
            return Err(fail("injected failure"));
        }
        if !self.supports(desc.format) {
            return Err(fail("format not supported"));
        }
        if desc.width > self.max_dimension || desc.height > self.max_dimension {
            return Err(fail("exceeds maximum dimension"));
        }

        let id = self.next_id;
        self.next_id += 1;
        self.created += 1;
        self.live.set(self.live.get() + 1);

        Ok(HeadlessTexture {
            id,
            desc: *desc,
            levels: vec![None; desc.mip_level_count as usize],
            sampling: None,
            _live: LiveToken(Rc::clone(&self.live)),
        })
    }

    fn write_level(
        &mut self,
        texture: &mut HeadlessTexture,
        level: u32,
        _width: u32,
        _height: u32,
        _row_pitch: usize,
        data: &[u8],
    ) {
        if let Some(slot) = texture.levels.get_mut(level as usize) {
            *slot = Some(data.to_vec());
            self.level_writes += 1;
        }
    }

    fn apply_sampling(&mut self, texture: &mut HeadlessTexture, sampling: &SamplingState) {
        texture.sampling = Some(*sampling);
        self.sampling_updates += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(w: u32, h: u32) -> TextureDesc {
        TextureDesc {
            width: w,
            height: h,
            mip_level_count: 1,
            format: GpuFormat::Rgba8,
        }
    }

    #[test]
    fn test_drop_releases_object() {
        let mut backend = HeadlessBackend::new();
        let a = backend.create_texture(&desc(4, 4)).unwrap();
        let b = backend.create_texture(&desc(4, 4)).unwrap();
        assert_eq!(backend.live_textures(), 2);
        assert_ne!(a.id(), b.id());

        drop(a);
        assert_eq!(backend.live_textures(), 1);
        drop(b);
        assert_eq!(backend.live_textures(), 0);
        assert_eq!(backend.created(), 2);
    }

    #[test]
    fn test_injected_failures() {
        let mut backend = HeadlessBackend::new();
        backend.fail_next_allocations(1);
        assert!(matches!(
            backend.create_texture(&desc(4, 4)),
            Err(CacheError::Allocation { .. })
        ));
        assert!(backend.create_texture(&desc(4, 4)).is_ok());
    }

    #[test]
    fn test_unsupported_format_and_size() {
        let mut backend = HeadlessBackend::new()
            .without_format(GpuFormat::Bc1)
            .with_max_dimension(64);
        assert!(!backend.supports(GpuFormat::Bc1));
        assert!(
            backend
                .create_texture(&TextureDesc {
                    format: GpuFormat::Bc1,
                    ..desc(4, 4)
                })
                .is_err()
        );
        assert!(backend.create_texture(&desc(128, 4)).is_err());
        assert_eq!(backend.live_textures(), 0);
    }

    #[test]
    fn test_write_level_records_bytes() {
        let mut backend = HeadlessBackend::new();
        let mut tex = backend.create_texture(&desc(1, 1)).unwrap();
        backend.write_level(&mut tex, 0, 1, 1, 4, &[1, 2, 3, 4]);
        // Out-of-range level is ignored
        backend.write_level(&mut tex, 3, 1, 1, 4, &[9; 4]);

        assert_eq!(tex.level(0), Some(&[1u8, 2, 3, 4][..]));
        assert_eq!(tex.written_levels(), 1);
        assert_eq!(backend.level_writes(), 1);
    }
}
