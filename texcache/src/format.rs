//! Source and GPU texel formats
//!
//! Source formats are what the engine hands us; GPU formats are what the
//! backend stores. The conversion between the two lives in [`crate::convert`].

/// Engine-side pixel format of a source mip level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFormat {
    /// 8-bit palette indices (requires a [`Palette`])
    P8,
    /// 32-bit BGRA with 7 significant bits per channel (lightmaps, fog maps)
    Bgra7777,
    /// 32-bit BGRA
    Bgra8,
    /// 32-bit RGBA
    Rgba8,
    /// DXT1 / BC1 compressed, 8 bytes per 4×4 block
    Dxt1,
}

impl SourceFormat {
    /// Whether the format stores palette indices
    pub fn is_paletted(self) -> bool {
        matches!(self, SourceFormat::P8)
    }

    /// Whether the format is block compressed
    pub fn is_compressed(self) -> bool {
        matches!(self, SourceFormat::Dxt1)
    }

    /// Bytes per texel for uncompressed formats (0 for block formats)
    pub fn bytes_per_texel(self) -> usize {
        match self {
            SourceFormat::P8 => 1,
            SourceFormat::Bgra7777 | SourceFormat::Bgra8 | SourceFormat::Rgba8 => 4,
            SourceFormat::Dxt1 => 0,
        }
    }

    /// Minimum byte length of a level with the given real extent
    pub fn level_size(self, width: u32, height: u32) -> usize {
        match self {
            SourceFormat::Dxt1 => {
                let blocks_x = width.div_ceil(4).max(1) as usize;
                let blocks_y = height.div_ceil(4).max(1) as usize;
                blocks_x * blocks_y * 8
            }
            _ => width as usize * height as usize * self.bytes_per_texel(),
        }
    }
}

/// Storage class of a cache entry, fixed for the entry's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryKind {
    /// Block-compressed data, stored size depends on content
    Compressed,
    /// Expanded from palette indices
    Paletted,
    /// Direct-colour art
    Plain,
    /// Engine-generated data (lightmaps, fog maps)
    Synthetic,
}

impl EntryKind {
    pub fn of(format: SourceFormat) -> Self {
        match format {
            SourceFormat::Dxt1 => EntryKind::Compressed,
            SourceFormat::P8 => EntryKind::Paletted,
            SourceFormat::Bgra7777 => EntryKind::Synthetic,
            SourceFormat::Bgra8 | SourceFormat::Rgba8 => EntryKind::Plain,
        }
    }
}

/// GPU-side storage format of a cache entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuFormat {
    /// 32-bit RGBA, the common uncompressed format
    Rgba8,
    /// 16-bit packed RGB5A1 (little-endian `u16`, alpha in bit 15)
    Rgb5a1,
    /// BC1 compressed
    Bc1,
}

impl GpuFormat {
    pub fn is_compressed(self) -> bool {
        matches!(self, GpuFormat::Bc1)
    }

    /// Row pitch in bytes of a level `width` texels wide
    ///
    /// For block formats a "row" is a row of 4×4 blocks.
    pub fn row_pitch(self, width: u32) -> usize {
        match self {
            GpuFormat::Rgba8 => width as usize * 4,
            GpuFormat::Rgb5a1 => width as usize * 2,
            GpuFormat::Bc1 => width.div_ceil(4).max(1) as usize * 8,
        }
    }

    /// Number of pitch-sized rows in a level `height` texels tall
    pub fn row_count(self, height: u32) -> usize {
        match self {
            GpuFormat::Bc1 => height.div_ceil(4).max(1) as usize,
            _ => height as usize,
        }
    }

    /// Total backing size of one level
    pub fn level_size(self, width: u32, height: u32) -> usize {
        self.row_pitch(width) * self.row_count(height)
    }
}

/// 256-entry RGBA palette for [`SourceFormat::P8`] textures
#[derive(Clone, PartialEq, Eq)]
pub struct Palette {
    entries: [[u8; 4]; 256],
}

impl Palette {
    pub fn new(entries: [[u8; 4]; 256]) -> Self {
        Self { entries }
    }

    /// Build a palette from packed RGBA bytes (missing entries are black, opaque)
    pub fn from_rgba(bytes: &[u8]) -> Self {
        let whole = bytes.len() / 4 * 4;
        let colors: &[[u8; 4]] = bytemuck::cast_slice(&bytes[..whole]);
        let mut entries = [[0, 0, 0, 255]; 256];
        for (entry, color) in entries.iter_mut().zip(colors) {
            *entry = *color;
        }
        Self { entries }
    }

    /// Entries as packed RGBA bytes
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.entries)
    }

    /// Linear grey ramp, handy for tests and synthetic textures
    pub fn greyscale() -> Self {
        let mut entries = [[0u8; 4]; 256];
        for (i, entry) in entries.iter_mut().enumerate() {
            let v = i as u8;
            *entry = [v, v, v, 255];
        }
        Self { entries }
    }

    /// Palette entry, with index 0 made fully transparent for masked textures
    #[inline]
    pub fn lookup(&self, index: u8, masked: bool) -> [u8; 4] {
        if masked && index == 0 {
            [0, 0, 0, 0]
        } else {
            self.entries[index as usize]
        }
    }
}

impl std::fmt::Debug for Palette {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Palette")
            .field("first", &self.entries[0])
            .field("last", &self.entries[255])
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_level_size() {
        assert_eq!(SourceFormat::P8.level_size(16, 8), 128);
        assert_eq!(SourceFormat::Bgra8.level_size(16, 8), 512);
        // 6×6 rounds up to 2×2 blocks
        assert_eq!(SourceFormat::Dxt1.level_size(6, 6), 32);
        // 1×1 still occupies one block
        assert_eq!(SourceFormat::Dxt1.level_size(1, 1), 8);
    }

    #[test]
    fn test_entry_kind_of_source() {
        assert_eq!(EntryKind::of(SourceFormat::Dxt1), EntryKind::Compressed);
        assert_eq!(EntryKind::of(SourceFormat::P8), EntryKind::Paletted);
        assert_eq!(EntryKind::of(SourceFormat::Bgra7777), EntryKind::Synthetic);
        assert_eq!(EntryKind::of(SourceFormat::Rgba8), EntryKind::Plain);
        assert_eq!(EntryKind::of(SourceFormat::Bgra8), EntryKind::Plain);
    }

    #[test]
    fn test_gpu_row_pitch() {
        assert_eq!(GpuFormat::Rgba8.row_pitch(64), 256);
        assert_eq!(GpuFormat::Rgb5a1.row_pitch(64), 128);
        assert_eq!(GpuFormat::Bc1.row_pitch(64), 128);
        assert_eq!(GpuFormat::Bc1.row_pitch(2), 8);
    }

    #[test]
    fn test_bc1_level_size() {
        assert_eq!(GpuFormat::Bc1.level_size(64, 64), 16 * 16 * 8);
        assert_eq!(GpuFormat::Bc1.level_size(1, 1), 8);
    }

    #[test]
    fn test_palette_masked_lookup() {
        let palette = Palette::greyscale();
        assert_eq!(palette.lookup(0, false), [0, 0, 0, 255]);
        assert_eq!(palette.lookup(0, true), [0, 0, 0, 0]);
        assert_eq!(palette.lookup(7, true), [7, 7, 7, 255]);
    }

    #[test]
    fn test_palette_from_short_slice() {
        let palette = Palette::from_rgba(&[1, 2, 3, 4]);
        assert_eq!(palette.lookup(0, false), [1, 2, 3, 4]);
        assert_eq!(palette.lookup(1, false), [0, 0, 0, 255]);
    }

    #[test]
    fn test_palette_bytes_round_trip_through_from_rgba() {
        let palette = Palette::greyscale();
        assert_eq!(palette.as_bytes().len(), 1024);
        // Trailing partial entry is ignored
        let mut bytes = palette.as_bytes().to_vec();
        bytes.truncate(4 * 3 + 2);
        let rebuilt = Palette::from_rgba(&bytes);
        assert_eq!(rebuilt.lookup(2, false), [2, 2, 2, 255]);
        assert_eq!(rebuilt.lookup(3, false), [0, 0, 0, 255]);
    }
}
