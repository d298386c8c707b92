//! Nethercore texture cache - Library interface
//!
//! Maps an engine-side "logical texture + render flags" identity to a
//! GPU-resident texture object for fixed-function style renderers.
//!
//! # Architecture
//!
//! **IdentityCodec** → **ShardIndex** → **LruChain** → **RecyclePool** →
//! **MipBudgeter** → **UploadConverter** → **Cache**
//!
//! - [`key`] derives the 64-bit cache key and selects index shards
//! - [`shard`] holds two sharded ordered indices (base and variant identities)
//! - [`lru`] orders variant entries by recency for O(1) eviction
//! - [`pool`] recycles retired GPU objects keyed by their stored dimensions
//! - [`mip`] decides which mip levels are stored and at which size
//! - [`convert`] fills one mip level of backing memory from engine pixel data
//! - [`cache`] composes everything behind `bind` / `evict_stale` / `flush`
//!
//! GPU access goes through the [`TextureBackend`] trait. The wgpu backend is
//! enabled by default; the headless backend runs on the CPU and is used by
//! the tests and the replay tool.

pub mod backend;
pub mod cache;
pub mod config;
pub mod convert;
pub mod error;
pub mod format;
pub mod key;
pub mod lru;
pub mod mip;
pub mod pool;
pub mod shard;

pub use backend::{
    HeadlessBackend, HeadlessTexture, SamplingState, TextureBackend, TextureDesc, TextureFilter,
};
#[cfg(feature = "wgpu")]
pub use backend::{WgpuBackend, WgpuTexture};
pub use cache::{
    BindRequest, Cache, CacheStats, EntryInfo, EvictReport, SourceLevel, SourceTexture,
    TextureHandle,
};
pub use config::{BudgetLimits, CacheConfig, ConfigError};
pub use convert::EdgeMode;
pub use error::{CacheError, Result};
pub use format::{EntryKind, GpuFormat, Palette, SourceFormat};
pub use key::{CacheKey, RenderFlags, TextureFlags, derive_key, is_variant};
pub use mip::{BudgetInput, MipBudget, budget};
