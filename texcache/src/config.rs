//! Cache configuration (`texcache.toml`)
//!
//! Device and policy limits supplied once at device-configuration time.
//! Every field has a default so partial files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::mip::BudgetInput;

/// Errors from loading or saving a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Texture cache configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Largest stored log2 dimension (default: 12, i.e. 4096)
    #[serde(default = "default_hw_max_log2")]
    pub hw_max_log2: u32,
    /// Smallest stored log2 dimension (default: 0)
    #[serde(default)]
    pub min_log2: u32,
    /// Largest allowed log2 aspect ratio (default: 12)
    #[serde(default = "default_max_aspect_log2")]
    pub max_aspect_log2: u32,
    /// Recycle plain single-level textures on eviction (default: true)
    #[serde(default = "default_true")]
    pub pool_enabled: bool,
    /// Retired objects kept per stored shape (default: 32)
    #[serde(default = "default_pool_max_per_shape")]
    pub pool_max_per_shape: usize,
    /// Frames without a bind before a variant entry is stale (default: 64)
    #[serde(default = "default_stale_frames")]
    pub stale_frames: u64,
    /// Store paletted and direct-colour art as 16-bit where supported (default: false)
    #[serde(default)]
    pub use_16bit_textures: bool,
    /// Build mip chains for single-level sources (default: false)
    #[serde(default)]
    pub always_mipmap: bool,
    /// Maximum anisotropy for mipmapped, smooth textures (default: 1)
    #[serde(default = "default_anisotropy")]
    pub anisotropy: u16,
}

fn default_hw_max_log2() -> u32 {
    12
}
fn default_max_aspect_log2() -> u32 {
    12
}
fn default_true() -> bool {
    true
}
fn default_pool_max_per_shape() -> usize {
    32
}
fn default_stale_frames() -> u64 {
    64
}
fn default_anisotropy() -> u16 {
    1
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            hw_max_log2: default_hw_max_log2(),
            min_log2: 0,
            max_aspect_log2: default_max_aspect_log2(),
            pool_enabled: default_true(),
            pool_max_per_shape: default_pool_max_per_shape(),
            stale_frames: default_stale_frames(),
            use_16bit_textures: false,
            always_mipmap: false,
            anisotropy: default_anisotropy(),
        }
    }
}

/// The subset of the configuration that determines stored geometry and format
///
/// Entries budgeted under different limits are invalid, so a change here
/// forces a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BudgetLimits {
    pub hw_max_log2: u32,
    pub min_log2: u32,
    pub max_aspect_log2: u32,
    pub always_mipmap: bool,
    pub use_16bit_textures: bool,
}

impl BudgetLimits {
    /// Budgeting input for a source of the given native geometry
    pub fn input(&self, native_u_bits: u32, native_v_bits: u32, source_levels: u32) -> BudgetInput {
        BudgetInput {
            native_u_bits,
            native_v_bits,
            source_levels,
            hw_max_log2: self.hw_max_log2,
            min_log2: self.min_log2,
            max_aspect_log2: self.max_aspect_log2,
            always_mipmap: self.always_mipmap,
        }
    }
}

impl CacheConfig {
    pub fn limits(&self) -> BudgetLimits {
        BudgetLimits {
            hw_max_log2: self.hw_max_log2,
            min_log2: self.min_log2.min(self.hw_max_log2),
            max_aspect_log2: self.max_aspect_log2,
            always_mipmap: self.always_mipmap,
            use_16bit_textures: self.use_16bit_textures,
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load a configuration file
    ///
    /// A missing file yields the defaults; an unreadable or malformed one is
    /// an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Write the configuration, creating parent directories as needed
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }
}
