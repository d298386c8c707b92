//! Cache key derivation and shard selection
//!
//! A cache key is the engine's 64-bit logical texture identity, optionally
//! adjusted by the render flags that change what ends up in GPU memory.
//! Only render-to-texture sources (low byte [`RENDER_TEXTURE_SENTINEL`])
//! are sensitive to masking; every other identity ignores the flags.

use bitflags::bitflags;

/// 64-bit cache key
pub type CacheKey = u64;

/// Low byte marking a render-to-texture identity
pub const RENDER_TEXTURE_SENTINEL: u64 = 0xE0;

/// Reserved low bit set on masked binds of render-to-texture identities
pub const MASKED_KEY_BIT: u64 = 0x10;

/// Number of shards in each index (must stay a power of two)
pub const SHARD_COUNT: usize = 16;

const SHARD_MASK: u64 = SHARD_COUNT as u64 - 1;
const BASE_SHARD_SHIFT: u32 = 12;
const VARIANT_SHARD_SHIFT: u32 = 20;

const _: () = assert!(SHARD_COUNT.is_power_of_two());

bitflags! {
    /// Per-draw render flags supplied with each bind
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RenderFlags: u32 {
        const TWO_SIDED   = 0x0000_0001;
        /// Palette index 0 is transparent
        const MASKED      = 0x0000_0002;
        const TRANSLUCENT = 0x0000_0004;
        const MODULATED   = 0x0000_0040;
        /// Point sampling instead of bilinear
        const NO_SMOOTH   = 0x0000_0800;
    }
}

bitflags! {
    /// Properties of the source texture itself
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TextureFlags: u32 {
        /// Masked art: palette index 0 is always transparent
        const MASKED = 0x0000_0001;
        /// UI-style asset: replicate edge texels instead of zero-filling
        const CLAMP  = 0x0000_0002;
    }
}

/// Whether `logical_id` names a render-to-texture source
#[inline]
pub fn is_render_texture(logical_id: u64) -> bool {
    logical_id & 0xFF == RENDER_TEXTURE_SENTINEL
}

/// Derive the cache key for a logical identity bound with `flags`
#[inline]
pub fn derive_key(logical_id: u64, flags: RenderFlags) -> CacheKey {
    if is_render_texture(logical_id) && flags.contains(RenderFlags::MASKED) {
        logical_id | MASKED_KEY_BIT
    } else {
        logical_id
    }
}

/// Variant identities have non-zero high 32 bits and are LRU-evictable
#[inline]
pub fn is_variant(key: CacheKey) -> bool {
    key >> 32 != 0
}

/// Base index shard: bits [12, 16) of the key
#[inline]
pub fn base_shard(key: CacheKey) -> usize {
    ((key >> BASE_SHARD_SHIFT) & SHARD_MASK) as usize
}

/// Variant index shard: bits [20, 24) of the high 32-bit suffix
#[inline]
pub fn variant_shard(key: CacheKey) -> usize {
    (((key >> 32) >> VARIANT_SHARD_SHIFT) & SHARD_MASK) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identity_ignores_flags() {
        let id = 0x0000_1234_0000_0042;
        assert_eq!(derive_key(id, RenderFlags::empty()), id);
        assert_eq!(derive_key(id, RenderFlags::MASKED), id);
        assert_eq!(derive_key(id, RenderFlags::all()), id);
    }

    #[test]
    fn test_render_texture_masked_sets_reserved_bit() {
        let id = 0x0000_0abc_0000_00E0;
        let opaque = derive_key(id, RenderFlags::empty());
        let masked = derive_key(id, RenderFlags::MASKED);

        assert_eq!(opaque, id);
        assert_ne!(opaque, masked);
        assert_eq!(opaque ^ masked, MASKED_KEY_BIT);
    }

    #[test]
    fn test_render_texture_other_flags_do_not_participate() {
        let id = 0x0000_0001_0000_00E0;
        let flags = RenderFlags::NO_SMOOTH | RenderFlags::TRANSLUCENT | RenderFlags::MODULATED;
        assert_eq!(derive_key(id, flags), id);
    }

    #[test]
    fn test_derive_key_is_idempotent_on_masked_key() {
        let id = 0x0000_0001_0000_00E0;
        let masked = derive_key(id, RenderFlags::MASKED);
        // Masked key no longer carries the sentinel, so re-deriving is a no-op
        assert_eq!(derive_key(masked, RenderFlags::MASKED), masked);
    }

    #[test]
    fn test_is_variant() {
        assert!(!is_variant(0x0000_0000_FFFF_FFFF));
        assert!(is_variant(0x0000_0001_0000_0000));
    }

    #[test]
    fn test_base_shard_uses_bits_12_to_16() {
        assert_eq!(base_shard(0x0000_0FFF), 0);
        assert_eq!(base_shard(0x0000_1000), 1);
        assert_eq!(base_shard(0x0000_F000), 15);
        assert_eq!(base_shard(0x0001_0000), 0);
    }

    #[test]
    fn test_variant_shard_uses_suffix_bits_20_to_24() {
        assert_eq!(variant_shard(0x0000_0001_FFFF_FFFF), 0);
        assert_eq!(variant_shard(0x0010_0000_0000_0000), 1);
        assert_eq!(variant_shard(0x00F0_0000_0000_0000), 15);
        assert_eq!(variant_shard(0x0100_0000_0000_0000), 0);
    }

    #[test]
    fn test_shards_in_range() {
        for key in [0u64, u64::MAX, 0xDEAD_BEEF_CAFE_F00D, 0x1234_5678] {
            assert!(base_shard(key) < SHARD_COUNT);
            assert!(variant_shard(key) < SHARD_COUNT);
        }
    }
}
