//! Cache orchestrator
//!
//! Per-key lifecycle:
//!
//! ```text
//! Unbound ──bind──▶ Bound(new, uploaded)
//!                     │  bind, same content ─▶ sampling patched, no upload
//!                     │  bind, content changed ─▶ re-upload in place
//!                     │  bind, format/kind/shape changed ─▶ replaced
//!                     ▼
//!          evict_stale ─▶ Recycled (pool) | Destroyed
//! ```
//!
//! Base identities live until [`Cache::flush`]. Variant identities are kept
//! in recency order and evicted from the least recently used end.

mod upload;

use crate::backend::{SamplingState, TextureBackend, TextureDesc, TextureFilter};
use crate::config::{BudgetLimits, CacheConfig};
use crate::convert::{self, ConvertFn, EdgeMode};
use crate::error::{CacheError, Result};
use crate::format::{EntryKind, GpuFormat, Palette, SourceFormat};
use crate::key::{CacheKey, RenderFlags, TextureFlags, derive_key, is_render_texture, is_variant};
use crate::lru::{EntryId, LruChain};
use crate::mip;
use crate::pool::{PoolShape, RecyclePool, is_poolable};
use crate::shard::ShardIndex;

use upload::{Geometry, clear_levels, upload_levels};

/// Stable identity of a GPU texture object
///
/// Survives pooling: a recycled object keeps the handle it was created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TextureHandle(pub u32);

impl TextureHandle {
    /// Invalid handle (no texture)
    pub const INVALID: Self = Self(0);

    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// One source mip level
#[derive(Debug, Clone, Copy)]
pub struct SourceLevel<'a> {
    /// Tightly packed texel data, `None` if the engine has not produced it
    pub data: Option<&'a [u8]>,
    /// Real width in texels
    pub width: u32,
    /// Real height in texels
    pub height: u32,
}

impl<'a> SourceLevel<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self {
            data: Some(data),
            width,
            height,
        }
    }

    pub fn missing(width: u32, height: u32) -> Self {
        Self {
            data: None,
            width,
            height,
        }
    }
}

/// Engine-side texture to upload on a miss or content change
#[derive(Debug, Clone)]
pub struct SourceTexture<'a> {
    pub format: SourceFormat,
    /// Mip chain, finest first
    pub levels: Vec<SourceLevel<'a>>,
    /// Required for [`SourceFormat::P8`]
    pub palette: Option<&'a Palette>,
    pub flags: TextureFlags,
}

impl<'a> SourceTexture<'a> {
    pub fn new(format: SourceFormat, levels: Vec<SourceLevel<'a>>) -> Self {
        Self {
            format,
            levels,
            palette: None,
            flags: TextureFlags::empty(),
        }
    }

    pub fn with_palette(mut self, palette: &'a Palette) -> Self {
        self.palette = Some(palette);
        self
    }

    pub fn with_flags(mut self, flags: TextureFlags) -> Self {
        self.flags = flags;
        self
    }

    /// log2 of the power-of-two size enclosing level 0
    fn native_bits(&self) -> (u32, u32) {
        let level = &self.levels[0];
        (
            level.width.next_power_of_two().trailing_zeros(),
            level.height.next_power_of_two().trailing_zeros(),
        )
    }

    fn validate(&self) -> Result<()> {
        let Some(first) = self.levels.first() else {
            return Err(CacheError::InvalidSource("no mip levels".to_string()));
        };
        if first.width == 0 || first.height == 0 {
            return Err(CacheError::InvalidSource(format!(
                "zero-sized level 0 ({}x{})",
                first.width, first.height
            )));
        }
        if self.format.is_paletted() && self.palette.is_none() {
            return Err(CacheError::InvalidSource(format!(
                "{:?} source without palette",
                self.format
            )));
        }
        Ok(())
    }
}

/// One bind from the renderer
#[derive(Debug, Clone)]
pub struct BindRequest<'a> {
    pub logical_id: u64,
    pub render_flags: RenderFlags,
    /// The engine reports new texel data since the last bind
    pub content_changed: bool,
    pub source: SourceTexture<'a>,
}

impl<'a> BindRequest<'a> {
    pub fn new(logical_id: u64, source: SourceTexture<'a>) -> Self {
        Self {
            logical_id,
            render_flags: RenderFlags::empty(),
            content_changed: false,
            source,
        }
    }

    pub fn with_flags(mut self, render_flags: RenderFlags) -> Self {
        self.render_flags = render_flags;
        self
    }

    pub fn changed(mut self, content_changed: bool) -> Self {
        self.content_changed = content_changed;
        self
    }
}

/// Stored state of an entry, for texture-coordinate setup and diagnostics
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EntryInfo {
    pub handle: TextureHandle,
    pub format: GpuFormat,
    pub kind: EntryKind,
    pub variant: bool,
    pub last_used_frame: u64,
    pub base_mip: u32,
    pub mip_count: u32,
    pub uploaded_levels: u32,
    pub u_bits: u32,
    pub v_bits: u32,
    pub u_copy_bits: i32,
    pub v_copy_bits: i32,
    pub native_u_bits: u32,
    pub native_v_bits: u32,
    pub edge: EdgeMode,
    pub sampling: SamplingState,
}

impl EntryInfo {
    /// Factors mapping source level-0 texel coordinates to normalized UVs
    pub fn tex_coord_scale(&self) -> (f32, f32) {
        (
            1.0 / (1u64 << self.native_u_bits) as f32,
            1.0 / (1u64 << self.native_v_bits) as f32,
        )
    }

    /// Stored (width, height) of GPU level 0
    pub fn stored_dims(&self) -> (u32, u32) {
        (1 << self.u_bits, 1 << self.v_bits)
    }
}

/// Result of one [`Cache::evict_stale`] pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EvictReport {
    pub pooled: usize,
    pub destroyed: usize,
}

impl EvictReport {
    pub fn total(&self) -> usize {
        self.pooled + self.destroyed
    }
}

/// Running counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub binds: u64,
    pub hits: u64,
    pub misses: u64,
    /// Uploads started (one per created, replaced or content-changed entry)
    pub uploads: u64,
    pub levels_uploaded: u64,
    /// Sampling state patched on a hit without re-upload
    pub sampling_updates: u64,
    /// GPU objects created through the backend
    pub created: u64,
    /// GPU objects taken back out of the pool
    pub reused: u64,
    /// GPU objects moved into the pool
    pub pooled: u64,
    /// GPU objects released
    pub destroyed: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.binds == 0 {
            0.0
        } else {
            self.hits as f64 / self.binds as f64
        }
    }
}

struct CacheEntry<T> {
    key: CacheKey,
    texture: T,
    handle: TextureHandle,
    last_used_frame: u64,
    geometry: Geometry,
    format: GpuFormat,
    kind: EntryKind,
    source_format: SourceFormat,
    edge: EdgeMode,
    convert: ConvertFn,
    masked: bool,
    dynamic_flags: RenderFlags,
    sampling: SamplingState,
    shard: usize,
    uploaded_levels: u32,
}

impl<T> CacheEntry<T> {
    fn info(&self) -> EntryInfo {
        let g = &self.geometry;
        EntryInfo {
            handle: self.handle,
            format: self.format,
            kind: self.kind,
            variant: is_variant(self.key),
            last_used_frame: self.last_used_frame,
            base_mip: g.base_mip,
            mip_count: g.mip_count,
            uploaded_levels: self.uploaded_levels,
            u_bits: g.u_bits,
            v_bits: g.v_bits,
            u_copy_bits: g.u_copy_bits,
            v_copy_bits: g.v_copy_bits,
            native_u_bits: g.native_u_bits,
            native_v_bits: g.native_v_bits,
            edge: self.edge,
            sampling: self.sampling,
        }
    }
}

/// GPU object parked in the recycle pool
struct Retired<T> {
    texture: T,
    handle: TextureHandle,
    format: GpuFormat,
    sampling: SamplingState,
    dynamic_flags: RenderFlags,
}

/// What happened to an entry leaving the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retirement {
    Pooled,
    Destroyed,
}

/// GPU object obtained for an entry that is not indexed yet
struct Acquired<T> {
    texture: T,
    handle: TextureHandle,
    /// Sampling left behind by the previous owner of a recycled object
    recycled_sampling: Option<SamplingState>,
}

/// Everything derived from a bind request that decides what gets stored
struct Plan {
    kind: EntryKind,
    format: GpuFormat,
    edge: EdgeMode,
    masked: bool,
    geometry: Geometry,
}

/// The texture cache
pub struct Cache<B: TextureBackend> {
    backend: B,
    config: CacheConfig,
    limits: BudgetLimits,

    entries: Vec<Option<CacheEntry<B::Texture>>>,
    free_slots: Vec<EntryId>,
    base: ShardIndex<EntryId>,
    variant: ShardIndex<EntryId>,
    lru: LruChain,
    pool: RecyclePool<Retired<B::Texture>>,

    next_handle: u32,
    scratch: Vec<u8>,
    stats: CacheStats,
}

impl<B: TextureBackend> Cache<B> {
    pub fn new(backend: B, config: CacheConfig) -> Self {
        tracing::debug!(
            "Texture cache: max 2^{}, min 2^{}, aspect 2^{}, pool {} (max {} per shape)",
            config.hw_max_log2,
            config.min_log2,
            config.max_aspect_log2,
            config.pool_enabled,
            config.pool_max_per_shape
        );
        Self {
            backend,
            limits: config.limits(),
            pool: RecyclePool::new(config.pool_max_per_shape),
            config,
            entries: Vec::new(),
            free_slots: Vec::new(),
            base: ShardIndex::base(),
            variant: ShardIndex::variant(),
            lru: LruChain::new(),
            next_handle: 1, // 0 is reserved for INVALID
            scratch: Vec::new(),
            stats: CacheStats::default(),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Bind a logical texture for `frame`, uploading if needed
    pub fn bind(&mut self, request: &BindRequest<'_>, frame: u64) -> Result<TextureHandle> {
        self.stats.binds += 1;
        request.source.validate()?;

        let key = derive_key(request.logical_id, request.render_flags);
        match self.lookup(key) {
            Some(id) => self.bind_existing(id, request, frame),
            None => self.bind_new(key, request, frame),
        }
    }

    /// Evict variant entries unused for more than `stale_threshold` frames
    ///
    /// Scans from the least recently used end and stops at the first entry
    /// that is still fresh. Entries bound or pinned during `frame` are never
    /// evicted.
    pub fn evict_stale(&mut self, frame: u64, stale_threshold: u64) -> EvictReport {
        let mut report = EvictReport::default();

        while let Some(id) = self.lru.headmost() {
            let Some(entry) = self.entry(id) else {
                // Chain and arena disagree; drop the dangling link
                self.lru.unlink(id);
                continue;
            };
            if frame.saturating_sub(entry.last_used_frame) <= stale_threshold {
                break;
            }

            let Some(entry) = self.detach(id) else {
                break;
            };
            tracing::trace!(
                "Evicting {:#018x} (last used {}, now {})",
                entry.key,
                entry.last_used_frame,
                frame
            );
            match self.retire(entry) {
                Retirement::Pooled => report.pooled += 1,
                Retirement::Destroyed => report.destroyed += 1,
            }
        }

        if report.total() > 0 {
            tracing::debug!(
                "Evicted {} stale textures at frame {} ({} pooled, {} destroyed)",
                report.total(),
                frame,
                report.pooled,
                report.destroyed
            );
        }
        report
    }

    /// Convenience wrapper using the configured stale threshold
    pub fn evict_stale_default(&mut self, frame: u64) -> EvictReport {
        self.evict_stale(frame, self.config.stale_frames)
    }

    /// Destroy every entry and drain the pool
    ///
    /// Returns the number of GPU objects released.
    pub fn flush(&mut self) -> usize {
        let indexed = self.base.len() + self.variant.len();
        self.base.clear();
        self.variant.clear();
        self.lru.clear();
        self.entries.clear();
        self.free_slots.clear();
        let pooled = self.pool.drain().len();

        let released = indexed + pooled;
        self.stats.destroyed += released as u64;
        if released > 0 {
            tracing::debug!("Flushed texture cache: {} indexed, {} pooled", indexed, pooled);
        }
        released
    }

    /// Mark an entry as in use for `frame` (bound to an active texture unit)
    ///
    /// Returns `false` if the key is not indexed.
    pub fn pin(&mut self, key: CacheKey, frame: u64) -> bool {
        let Some(id) = self.lookup(key) else {
            return false;
        };
        let Some(entry) = self.entry_mut(id) else {
            return false;
        };
        entry.last_used_frame = entry.last_used_frame.max(frame);
        if is_variant(key) {
            self.lru.link_to_tail(id);
        }
        true
    }

    pub fn entry_info(&self, key: CacheKey) -> Option<EntryInfo> {
        self.lookup(key)
            .and_then(|id| self.entry(id))
            .map(CacheEntry::info)
    }

    /// Backend texture currently bound to `key`
    pub fn texture(&self, key: CacheKey) -> Option<&B::Texture> {
        self.lookup(key)
            .and_then(|id| self.entry(id))
            .map(|entry| &entry.texture)
    }

    pub fn contains(&self, key: CacheKey) -> bool {
        self.lookup(key).is_some()
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.base.len() + self.variant.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of objects parked in the recycle pool
    pub fn pooled(&self) -> usize {
        self.pool.len()
    }

    /// Number of pooled objects of one stored shape
    pub fn pooled_with_shape(&self, u_bits: u8, v_bits: u8) -> usize {
        self.pool.count(PoolShape::new(u_bits, v_bits))
    }

    /// Live GPU objects owned by the cache (indexed and pooled)
    pub fn live_objects(&self) -> usize {
        self.len() + self.pool.len()
    }

    /// Variant keys from least to most recently used
    pub fn lru_keys(&self) -> Vec<CacheKey> {
        self.lru
            .iter()
            .filter_map(|id| self.entry(id))
            .map(|entry| entry.key)
            .collect()
    }

    /// Every indexed key, base identities first
    pub fn keys(&self) -> Vec<CacheKey> {
        self.base
            .iter()
            .chain(self.variant.iter())
            .map(|(key, _)| key)
            .collect()
    }

    /// Apply a (possibly) changed configuration at the start of a frame
    ///
    /// Stored geometry depends on the budgeting limits, so any change there
    /// flushes the cache. Returns whether a flush happened.
    pub fn revalidate(&mut self, config: &CacheConfig) -> bool {
        let limits = config.limits();
        let flushed = limits != self.limits;
        if flushed {
            tracing::info!("Texture budget limits changed, flushing cache");
            self.flush();
            self.limits = limits;
        }

        if !config.pool_enabled && !self.pool.is_empty() {
            let drained = self.pool.drain().len();
            self.stats.destroyed += drained as u64;
        }
        self.pool.set_max_per_shape(config.pool_max_per_shape);
        self.config = config.clone();
        flushed
    }

    fn lookup(&self, key: CacheKey) -> Option<EntryId> {
        self.index(key).find(key).copied()
    }

    fn index(&self, key: CacheKey) -> &ShardIndex<EntryId> {
        if is_variant(key) { &self.variant } else { &self.base }
    }

    fn index_mut(&mut self, key: CacheKey) -> &mut ShardIndex<EntryId> {
        if is_variant(key) {
            &mut self.variant
        } else {
            &mut self.base
        }
    }

    fn entry(&self, id: EntryId) -> Option<&CacheEntry<B::Texture>> {
        self.entries.get(id.0 as usize)?.as_ref()
    }

    fn entry_mut(&mut self, id: EntryId) -> Option<&mut CacheEntry<B::Texture>> {
        self.entries.get_mut(id.0 as usize)?.as_mut()
    }

    fn sampling_for(&self, flags: RenderFlags, texture_flags: TextureFlags, mip_count: u32) -> SamplingState {
        let filter = if flags.contains(RenderFlags::NO_SMOOTH) {
            TextureFilter::Nearest
        } else {
            TextureFilter::Linear
        };
        let mipmapped = mip_count > 1;
        SamplingState {
            filter,
            mipmapped,
            anisotropy: if mipmapped && filter == TextureFilter::Linear {
                self.config.anisotropy.max(1)
            } else {
                1
            },
            clamp: texture_flags.contains(TextureFlags::CLAMP),
        }
    }

    /// Derive storage decisions for a request
    fn plan(&self, request: &BindRequest<'_>) -> Result<Plan> {
        let source = &request.source;
        let kind = EntryKind::of(source.format);
        let format = convert::target_format(source.format, self.limits.use_16bit_textures, |f| {
            self.backend.supports(f)
        })?;

        let mut limits = self.limits;
        if format.is_compressed() {
            // Block formats never store less than one 4×4 block
            if limits.hw_max_log2 < 2 {
                return Err(CacheError::UnsupportedConversion {
                    source_format: source.format,
                    paletted: false,
                    target: format,
                });
            }
            limits.min_log2 = limits.min_log2.max(2);
        }
        let (native_u, native_v) = source.native_bits();
        let budget = mip::budget(&limits.input(native_u, native_v, source.levels.len() as u32));

        Ok(Plan {
            kind,
            format,
            edge: if source.flags.contains(TextureFlags::CLAMP) {
                EdgeMode::Clamp
            } else {
                EdgeMode::Zero
            },
            masked: source.flags.contains(TextureFlags::MASKED)
                || (is_render_texture(request.logical_id)
                    && request.render_flags.contains(RenderFlags::MASKED)),
            geometry: Geometry::new(&budget, native_u, native_v),
        })
    }

    fn bind_existing(&mut self, id: EntryId, request: &BindRequest<'_>, frame: u64) -> Result<TextureHandle> {
        let plan = self.plan(request)?;
        let Some(entry) = self.entry(id) else {
            return Err(CacheError::InvalidSource(format!(
                "index points at empty slot {}",
                id.0
            )));
        };
        let key = entry.key;
        let mip_count = entry.geometry.mip_count;

        let content_changed =
            request.content_changed || entry.edge != plan.edge || entry.masked != plan.masked;
        // Never reformat in place
        let replace = entry.kind != plan.kind
            || entry.format != plan.format
            || entry.source_format != request.source.format
            || (content_changed && !entry.geometry.same_allocation(&plan.geometry));
        if replace {
            tracing::debug!(
                "Replacing {:#018x}: {:?}/{:?} -> {:?}/{:?}",
                key,
                entry.kind,
                entry.format,
                plan.kind,
                plan.format
            );
            self.stats.misses += 1;
            let convert = convert::select(request.source.format, plan.format, plan.edge)?;
            // The old entry stays indexed until its replacement exists
            let acquired = self.acquire(key, &plan)?;
            if let Some(old) = self.detach(id) {
                self.retire(old);
            }
            return self.install(key, request, frame, plan, convert, acquired);
        }

        let sampling = self.sampling_for(request.render_flags, request.source.flags, mip_count);
        self.stats.hits += 1;
        if is_variant(key) {
            self.lru.link_to_tail(id);
        }

        let Self {
            backend,
            entries,
            scratch,
            stats,
            ..
        } = self;
        let Some(entry) = entries.get_mut(id.0 as usize).and_then(Option::as_mut) else {
            return Err(CacheError::InvalidSource(format!(
                "index points at empty slot {}",
                id.0
            )));
        };
        entry.last_used_frame = entry.last_used_frame.max(frame);
        entry.dynamic_flags = request.render_flags;

        if content_changed {
            if entry.edge != plan.edge {
                entry.convert = convert::select(request.source.format, entry.format, plan.edge)?;
                entry.edge = plan.edge;
            }
            entry.masked = plan.masked;
            entry.geometry = plan.geometry;
            entry.uploaded_levels = upload_levels(
                backend,
                &mut entry.texture,
                &entry.geometry,
                entry.format,
                entry.convert,
                entry.masked,
                &request.source,
                scratch,
            );
            stats.uploads += 1;
            stats.levels_uploaded += u64::from(entry.uploaded_levels);
            tracing::trace!("Re-uploaded {:#018x} ({} levels)", key, entry.uploaded_levels);
        }

        if entry.sampling != sampling {
            backend.apply_sampling(&mut entry.texture, &sampling);
            entry.sampling = sampling;
            stats.sampling_updates += 1;
        }

        tracing::trace!("Hit {:#018x} at frame {}", key, frame);
        Ok(entry.handle)
    }

    fn bind_new(&mut self, key: CacheKey, request: &BindRequest<'_>, frame: u64) -> Result<TextureHandle> {
        self.stats.misses += 1;
        let plan = self.plan(request)?;
        let convert = convert::select(request.source.format, plan.format, plan.edge)?;
        let acquired = self.acquire(key, &plan)?;
        self.install(key, request, frame, plan, convert, acquired)
    }

    /// Take a matching object from the pool or create a fresh one
    fn acquire(&mut self, key: CacheKey, plan: &Plan) -> Result<Acquired<B::Texture>> {
        let geometry = &plan.geometry;
        if self.config.pool_enabled && is_poolable(plan.kind, geometry.mip_count) {
            let shape = PoolShape::new(geometry.u_bits as u8, geometry.v_bits as u8);
            if let Some(retired) = self.pool.take_where(shape, |r| r.format == plan.format) {
                self.stats.reused += 1;
                tracing::trace!(
                    "Reusing pooled {:?} for {:#018x} (last flags {:?})",
                    retired.handle,
                    key,
                    retired.dynamic_flags
                );
                return Ok(Acquired {
                    texture: retired.texture,
                    handle: retired.handle,
                    recycled_sampling: Some(retired.sampling),
                });
            }
        }

        let desc = TextureDesc {
            width: 1 << geometry.u_bits,
            height: 1 << geometry.v_bits,
            mip_level_count: geometry.mip_count,
            format: plan.format,
        };
        let texture = self.backend.create_texture(&desc).inspect_err(|e| {
            tracing::warn!("Texture {:#018x}: {}", key, e);
        })?;
        self.stats.created += 1;
        Ok(Acquired {
            texture,
            handle: self.next_handle(),
            recycled_sampling: None,
        })
    }

    /// Upload into an acquired object and index it under `key`
    fn install(
        &mut self,
        key: CacheKey,
        request: &BindRequest<'_>,
        frame: u64,
        plan: Plan,
        convert: ConvertFn,
        acquired: Acquired<B::Texture>,
    ) -> Result<TextureHandle> {
        let Acquired {
            mut texture,
            handle,
            recycled_sampling,
        } = acquired;
        let geometry = plan.geometry;
        let sampling = self.sampling_for(request.render_flags, request.source.flags, geometry.mip_count);

        if recycled_sampling != Some(sampling) {
            self.backend.apply_sampling(&mut texture, &sampling);
        }

        let uploaded_levels = upload_levels(
            &mut self.backend,
            &mut texture,
            &geometry,
            plan.format,
            convert,
            plan.masked,
            &request.source,
            &mut self.scratch,
        );
        self.stats.uploads += 1;
        self.stats.levels_uploaded += u64::from(uploaded_levels);
        if recycled_sampling.is_some() && uploaded_levels < geometry.mip_count {
            clear_levels(
                &mut self.backend,
                &mut texture,
                &geometry,
                plan.format,
                uploaded_levels,
                &mut self.scratch,
            );
        }

        let id = self.free_slots.last().copied().unwrap_or(EntryId(self.entries.len() as u32));
        let shard = match self.index_mut(key).insert(key, id) {
            Ok(shard) => shard,
            Err(e) => {
                self.stats.destroyed += 1;
                return Err(e);
            }
        };
        if self.free_slots.pop().is_none() {
            self.entries.push(None);
        }

        self.entries[id.0 as usize] = Some(CacheEntry {
            key,
            texture,
            handle,
            last_used_frame: frame,
            geometry,
            format: plan.format,
            kind: plan.kind,
            source_format: request.source.format,
            edge: plan.edge,
            convert,
            masked: plan.masked,
            dynamic_flags: request.render_flags,
            sampling,
            shard,
            uploaded_levels,
        });
        if is_variant(key) {
            self.lru.link_to_tail(id);
        }

        tracing::debug!(
            "Created {:#018x}: {:?} {}x{} base mip {}, {} of {} levels, {:?}",
            key,
            plan.format,
            1u32 << geometry.u_bits,
            1u32 << geometry.v_bits,
            geometry.base_mip,
            uploaded_levels,
            geometry.mip_count,
            handle
        );
        Ok(handle)
    }

    fn next_handle(&mut self) -> TextureHandle {
        let handle = TextureHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        handle
    }

    /// Remove an entry from the index, the chain and the arena
    fn detach(&mut self, id: EntryId) -> Option<CacheEntry<B::Texture>> {
        let entry = self.entries.get_mut(id.0 as usize)?.take()?;
        self.lru.unlink(id);
        let shard = entry.shard;
        self.index_mut(entry.key).remove_in(shard, entry.key);
        self.free_slots.push(id);
        Some(entry)
    }

    /// Pool a detached entry's GPU object if eligible, otherwise release it
    fn retire(&mut self, entry: CacheEntry<B::Texture>) -> Retirement {
        let g = entry.geometry;
        if self.config.pool_enabled && is_poolable(entry.kind, g.mip_count) {
            let shape = PoolShape::new(g.u_bits as u8, g.v_bits as u8);
            let retired = Retired {
                texture: entry.texture,
                handle: entry.handle,
                format: entry.format,
                sampling: entry.sampling,
                dynamic_flags: entry.dynamic_flags,
            };
            match self.pool.give(shape, retired) {
                None => {
                    self.stats.pooled += 1;
                    return Retirement::Pooled;
                }
                Some(surplus) => drop(surplus),
            }
        }
        self.stats.destroyed += 1;
        Retirement::Destroyed
    }
}

impl<B: TextureBackend> std::fmt::Debug for Cache<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("base", &self.base)
            .field("variant", &self.variant)
            .field("lru_len", &self.lru.len())
            .field("pool", &self.pool)
            .field("stats", &self.stats)
            .finish()
    }
}
