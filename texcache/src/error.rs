//! Error types for the texture cache
//!
//! Only GPU resource exhaustion and caller mistakes surface as errors.
//! Budget overflow and missing mip data are resolved locally (see
//! [`crate::mip`] and [`crate::cache`]).

use crate::format::{GpuFormat, SourceFormat};

/// Errors returned by cache operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The backend could not create a GPU texture object
    #[error("GPU texture allocation failed for {width}x{height} {format:?}: {reason}")]
    Allocation {
        width: u32,
        height: u32,
        format: GpuFormat,
        reason: String,
    },

    /// No conversion routine exists for this source/target pair
    #[error("no conversion from {source_format:?} (paletted: {paletted}) to {target:?}")]
    UnsupportedConversion {
        source_format: SourceFormat,
        paletted: bool,
        target: GpuFormat,
    },

    /// Attempted to index a key that is already present
    #[error("cache key {0:#018x} is already indexed")]
    DuplicateKey(u64),

    /// Source texture description is unusable (no levels, zero size, missing palette)
    #[error("invalid source texture: {0}")]
    InvalidSource(String),
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, CacheError>;
