//! Mip-level budgeting
//!
//! Decides which source mip becomes level 0 of the GPU object, the stored
//! log2 size of that level, how many levels are stored, and how each axis is
//! resampled when the stored shape differs from the source level's shape.
//!
//! The steps run in a fixed order. Aspect correction has to happen before the
//! maximum-size clamp, otherwise a very wide and short texture would lose its
//! short axis entirely to the mip skip.

/// Budgeting inputs: native source geometry plus device/policy limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetInput {
    /// log2 of the source width at level 0
    pub native_u_bits: u32,
    /// log2 of the source height at level 0
    pub native_v_bits: u32,
    /// Number of mip levels the source actually provides
    pub source_levels: u32,
    /// Largest log2 dimension the device (or policy) accepts
    pub hw_max_log2: u32,
    /// Smallest log2 dimension stored
    pub min_log2: u32,
    /// Largest allowed |u_bits - v_bits|
    pub max_aspect_log2: u32,
    /// Build a full chain even for single-level sources
    pub always_mipmap: bool,
}

/// Budgeting result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MipBudget {
    /// Source level uploaded as GPU level 0
    pub base_mip: u32,
    /// Stored log2 width of GPU level 0
    pub u_bits: u32,
    /// Stored log2 height of GPU level 0
    pub v_bits: u32,
    /// Stored minus source log2 width: negative subsamples, positive replicates
    pub u_copy_bits: i32,
    /// Stored minus source log2 height
    pub v_copy_bits: i32,
    /// Highest GPU level stored (level count is `max_level + 1`)
    pub max_level: u32,
    /// The coarsest source level still exceeded the limits and was subsampled
    pub degraded: bool,
}

impl MipBudget {
    pub fn mip_count(&self) -> u32 {
        self.max_level + 1
    }

    /// Stored (width, height) of GPU level `level`
    pub fn level_dims(&self, level: u32) -> (u32, u32) {
        (
            1 << self.u_bits.saturating_sub(level),
            1 << self.v_bits.saturating_sub(level),
        )
    }
}

/// Apply the aspect and minimum-size clamps to one shape
fn fit_shape(mut u: u32, mut v: u32, min_log2: u32, max_aspect_log2: u32) -> (u32, u32) {
    // Aspect: shrink the long axis, never the mip selection
    if u > v.saturating_add(max_aspect_log2) {
        u = v + max_aspect_log2;
    }
    if v > u.saturating_add(max_aspect_log2) {
        v = u + max_aspect_log2;
    }

    // Minimum size: grow short axes
    (u.max(min_log2), v.max(min_log2))
}

/// Reduce both axes by the amount the larger one exceeds `hw_max_log2`
fn clamp_max(u: u32, v: u32, hw_max_log2: u32, min_log2: u32) -> (u32, u32, u32) {
    let excess = u.max(v).saturating_sub(hw_max_log2);
    (
        excess,
        u.saturating_sub(excess).max(min_log2),
        v.saturating_sub(excess).max(min_log2),
    )
}

/// Compute the stored geometry for a source texture
pub fn budget(input: &BudgetInput) -> MipBudget {
    let BudgetInput {
        native_u_bits,
        native_v_bits,
        source_levels,
        hw_max_log2,
        min_log2,
        max_aspect_log2,
        always_mipmap,
    } = *input;
    let source_levels = source_levels.max(1);

    let (u, v) = fit_shape(native_u_bits, native_v_bits, min_log2, max_aspect_log2);
    let (mut base_mip, mut u, mut v) = clamp_max(u, v, hw_max_log2, min_log2);
    let mut degraded = false;

    if base_mip >= source_levels {
        // The skipped-to level does not exist: use the coarsest one we have
        base_mip = source_levels - 1;
        let (cu, cv) = fit_shape(
            native_u_bits.saturating_sub(base_mip),
            native_v_bits.saturating_sub(base_mip),
            min_log2,
            max_aspect_log2,
        );
        let (over, fu, fv) = clamp_max(cu, cv, hw_max_log2, min_log2);
        if over > 0 {
            degraded = true;
            tracing::warn!(
                "Coarsest of {} source levels ({}x{}) exceeds 2^{}, storing subsampled {}x{}",
                source_levels,
                1u64 << cu,
                1u64 << cv,
                hw_max_log2,
                1u64 << fu,
                1u64 << fv
            );
        }
        u = fu;
        v = fv;
    }

    let u_copy_bits = u as i32 - native_u_bits.saturating_sub(base_mip) as i32;
    let v_copy_bits = v as i32 - native_v_bits.saturating_sub(base_mip) as i32;

    let max_level = if source_levels == 1 && !always_mipmap {
        0
    } else {
        u.min(v).saturating_sub(min_log2)
    };

    MipBudget {
        base_mip,
        u_bits: u,
        v_bits: v,
        u_copy_bits,
        v_copy_bits,
        max_level,
        degraded,
    }
}
