//! texcache-replay - exercise the texture cache with a synthetic workload
//!
//! Runs a seeded, deterministic frame loop (world art, churning render
//! targets, lightmaps) against the headless backend and prints the cache
//! counters at the end.
//!
//! # Usage
//!
//! ```bash
//! # Default workload with default limits
//! texcache-replay
//!
//! # Custom limits, more frames, verbose cache logging
//! RUST_LOG=nethercore_texcache=debug texcache-replay --config texcache.toml --frames 2000
//!
//! # Write the default configuration as a starting point
//! texcache-replay --write-config texcache.toml
//! ```

mod workload;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use nethercore_texcache::{Cache, CacheConfig, HeadlessBackend};

use workload::WorkloadParams;

/// Replay a synthetic bind workload against the texture cache
#[derive(Parser)]
#[command(name = "texcache-replay")]
#[command(about = "Replay a synthetic bind workload against the texture cache")]
#[command(version)]
struct Cli {
    /// Cache configuration file (TOML); defaults are used if it does not exist
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the effective configuration to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Workload seed
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,

    /// Distinct world textures (base identities)
    #[arg(long, default_value_t = 256)]
    world_textures: usize,

    /// World texture binds per frame
    #[arg(long, default_value_t = 200)]
    binds_per_frame: usize,

    /// Render-target slots (variant identities)
    #[arg(long, default_value_t = 24)]
    render_targets: usize,

    /// Lightmaps (variant identities)
    #[arg(long, default_value_t = 64)]
    lightmaps: usize,

    /// Per-frame probability that a render target changes identity
    #[arg(long, default_value_t = 0.05)]
    churn: f64,

    /// Halve the size limit at this frame to exercise revalidation
    #[arg(long)]
    shrink_at: Option<u64>,
}

fn load_config(path: Option<&Path>) -> Result<CacheConfig> {
    match path {
        Some(path) => CacheConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(CacheConfig::default()),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Some(path) = &cli.write_config {
        config
            .save(path)
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        println!("Wrote configuration to {}", path.display());
        return Ok(());
    }

    anyhow::ensure!(
        (0.0..=1.0).contains(&cli.churn),
        "--churn must be between 0 and 1, got {}",
        cli.churn
    );

    let params = WorkloadParams {
        frames: cli.frames,
        seed: cli.seed,
        world_textures: cli.world_textures,
        binds_per_frame: cli.binds_per_frame,
        render_targets: cli.render_targets,
        lightmaps: cli.lightmaps,
        churn: cli.churn,
        shrink_at: cli.shrink_at,
    };
    tracing::info!("Replaying {} frames (seed {:#x})", params.frames, params.seed);

    let mut cache = Cache::new(HeadlessBackend::new(), config.clone());
    let summary = workload::run(&mut cache, &config, &params)?;
    let stats = summary.stats;

    println!("=== Texture Cache Replay ===");
    println!("  Frames:           {}", params.frames);
    println!("  Binds:            {}", stats.binds);
    println!(
        "  Hits / misses:    {} / {} ({:.1}% hit rate)",
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    println!(
        "  Uploads:          {} ({} levels)",
        stats.uploads, stats.levels_uploaded
    );
    println!("  Sampling patches: {}", stats.sampling_updates);
    println!(
        "  Objects:          {} created, {} reused, {} pooled, {} destroyed",
        stats.created, stats.reused, stats.pooled, stats.destroyed
    );
    println!("  Evicted:          {}", summary.evicted);
    println!("  Flushes:          {}", summary.flushes);
    println!(
        "  Live objects:     {} (peak {})",
        summary.final_live, summary.peak_live
    );
    println!(
        "  Backend:          {} live, {} level writes, {} sampler updates",
        cache.backend().live_textures(),
        cache.backend().level_writes(),
        cache.backend().sampling_updates()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_config_defaults_without_path() {
        assert_eq!(load_config(None).unwrap(), CacheConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("texcache.toml");
        std::fs::write(&path, "stale_frames = 5\nuse_16bit_textures = true\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.stale_frames, 5);
        assert!(config.use_16bit_textures);
    }

    #[test]
    fn test_load_config_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "stale_frames = [").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.toml"));
    }

    #[test]
    fn test_cli_parses_defaults() {
        let cli = Cli::parse_from(["texcache-replay"]);
        assert_eq!(cli.frames, 600);
        assert!(cli.config.is_none());
        assert!(cli.shrink_at.is_none());
    }
}
