//! Synthetic, seeded frame workload
//!
//! Three populations are bound every frame:
//! - world art: base identities in every source format, some with mip chains
//! - render targets: render-texture variants whose identity changes now and
//!   then, so the old ones go stale and their objects get recycled
//! - lightmaps: engine-generated variants, visible on a random subset of frames

use anyhow::Result;
use nethercore_texcache::{
    BindRequest, Cache, CacheConfig, CacheKey, CacheStats, HeadlessBackend, Palette, RenderFlags,
    SourceFormat, SourceLevel, SourceTexture, TextureFlags,
};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// Workload shape
#[derive(Debug, Clone)]
pub struct WorkloadParams {
    pub frames: u64,
    pub seed: u64,
    pub world_textures: usize,
    pub binds_per_frame: usize,
    pub render_targets: usize,
    pub lightmaps: usize,
    /// Per-frame probability that a render target gets a new identity
    pub churn: f64,
    /// Frame at which the size limit is halved
    pub shrink_at: Option<u64>,
}

/// Outcome of a replay
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub stats: CacheStats,
    pub peak_live: usize,
    pub final_live: usize,
    pub evicted: usize,
    pub flushes: usize,
}

/// Source pixels for one synthetic texture
struct Asset {
    format: SourceFormat,
    flags: TextureFlags,
    levels: Vec<(Vec<u8>, u32, u32)>,
}

impl Asset {
    fn generate(rng: &mut Pcg64Mcg, format: SourceFormat, width: u32, height: u32, mipmapped: bool) -> Self {
        let mut levels = Vec::new();
        let (mut w, mut h) = (width, height);
        loop {
            let mut data = vec![0u8; format.level_size(w, h)];
            rng.fill(&mut data[..]);
            levels.push((data, w, h));
            if !mipmapped || (w == 1 && h == 1) {
                break;
            }
            w = (w / 2).max(1);
            h = (h / 2).max(1);
        }
        Self {
            format,
            flags: TextureFlags::empty(),
            levels,
        }
    }

    fn source<'a>(&'a self, palette: &'a Palette) -> SourceTexture<'a> {
        let levels = self
            .levels
            .iter()
            .map(|(data, w, h)| SourceLevel::new(data, *w, *h))
            .collect();
        let source = SourceTexture::new(self.format, levels).with_flags(self.flags);
        if self.format.is_paletted() {
            source.with_palette(palette)
        } else {
            source
        }
    }
}

fn world_key(index: usize) -> CacheKey {
    index as u64 * 0x1000 + 0x42
}

fn render_target_key(slot: usize, generation: u64) -> CacheKey {
    ((generation + 1) << 32) | ((slot as u64) << 8) | 0xE0
}

fn lightmap_key(index: usize) -> CacheKey {
    ((index as u64 + 1) << 52) | 0x1
}

fn world_asset(rng: &mut Pcg64Mcg, index: usize) -> Asset {
    let u = 3 + (index % 4) as u32;
    let v = 3 + (index / 4 % 3) as u32;
    let (width, height) = (1 << u, 1 << v);
    let mut asset = match index % 5 {
        0 => Asset::generate(rng, SourceFormat::P8, width, height, true),
        1 => Asset::generate(rng, SourceFormat::Bgra8, width, height, false),
        2 => Asset::generate(rng, SourceFormat::Rgba8, width, height, true),
        3 => Asset::generate(rng, SourceFormat::Dxt1, width, height, true),
        // Non-power-of-two UI art
        _ => Asset::generate(rng, SourceFormat::Rgba8, width - 3, height - 1, false),
    };
    if index % 5 == 4 {
        asset.flags = TextureFlags::CLAMP;
    }
    if index % 7 == 0 {
        asset.flags |= TextureFlags::MASKED;
    }
    asset
}

/// Replay the workload against `cache`
pub fn run(cache: &mut Cache<HeadlessBackend>, config: &CacheConfig, params: &WorkloadParams) -> Result<Summary> {
    let mut rng = Pcg64Mcg::seed_from_u64(params.seed);
    let palette = Palette::from_rgba(&(0..1024).map(|_| rng.random::<u8>()).collect::<Vec<_>>());

    let world: Vec<Asset> = (0..params.world_textures)
        .map(|i| world_asset(&mut rng, i))
        .collect();
    let targets = [
        Asset::generate(&mut rng, SourceFormat::Rgba8, 64, 64, false),
        Asset::generate(&mut rng, SourceFormat::Rgba8, 128, 64, false),
    ];
    let lightmap = Asset::generate(&mut rng, SourceFormat::Bgra7777, 16, 16, false);

    let mut generations = vec![0u64; params.render_targets];
    let mut config = config.clone();
    let mut summary = Summary {
        stats: CacheStats::default(),
        peak_live: 0,
        final_live: 0,
        evicted: 0,
        flushes: 0,
    };

    for frame in 1..=params.frames {
        if params.shrink_at == Some(frame) {
            config.hw_max_log2 = config.hw_max_log2.saturating_sub(1).max(config.min_log2);
            tracing::info!("Frame {}: shrinking size limit to 2^{}", frame, config.hw_max_log2);
        }
        if cache.revalidate(&config) {
            summary.flushes += 1;
        }

        if !world.is_empty() {
            for _ in 0..params.binds_per_frame {
                let index = rng.random_range(0..world.len());
                let flags = if rng.random_bool(0.1) {
                    RenderFlags::NO_SMOOTH
                } else {
                    RenderFlags::empty()
                };
                let request = BindRequest::new(world_key(index), world[index].source(&palette)).with_flags(flags);
                cache.bind(&request, frame)?;
            }
        }

        for (slot, generation) in generations.iter_mut().enumerate() {
            if rng.random_bool(params.churn) {
                *generation += 1;
            }
            let flags = if rng.random_bool(0.25) {
                RenderFlags::MASKED | RenderFlags::TRANSLUCENT
            } else {
                RenderFlags::empty()
            };
            let asset = &targets[slot % targets.len()];
            let request = BindRequest::new(render_target_key(slot, *generation), asset.source(&palette))
                .with_flags(flags)
                .changed(rng.random_bool(0.3));
            cache.bind(&request, frame)?;
        }

        for index in 0..params.lightmaps {
            if rng.random_bool(0.5) {
                let request = BindRequest::new(lightmap_key(index), lightmap.source(&palette));
                cache.bind(&request, frame)?;
            }
        }

        summary.evicted += cache.evict_stale(frame, config.stale_frames).total();
        summary.peak_live = summary.peak_live.max(cache.live_objects());
    }

    summary.stats = cache.stats();
    summary.final_live = cache.live_objects();
    Ok(summary)
}
