//! Level-by-level upload into an entry's GPU object

use crate::backend::TextureBackend;
use crate::convert::{ConvertFn, LevelJob, SourceView};
use crate::format::GpuFormat;
use crate::mip::MipBudget;

use super::SourceTexture;

/// Stored geometry of an entry plus the native geometry it was derived from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Geometry {
    pub base_mip: u32,
    pub mip_count: u32,
    pub u_bits: u32,
    pub v_bits: u32,
    pub u_copy_bits: i32,
    pub v_copy_bits: i32,
    pub native_u_bits: u32,
    pub native_v_bits: u32,
}

impl Geometry {
    pub fn new(budget: &MipBudget, native_u_bits: u32, native_v_bits: u32) -> Self {
        Self {
            base_mip: budget.base_mip,
            mip_count: budget.mip_count(),
            u_bits: budget.u_bits,
            v_bits: budget.v_bits,
            u_copy_bits: budget.u_copy_bits,
            v_copy_bits: budget.v_copy_bits,
            native_u_bits,
            native_v_bits,
        }
    }

    /// Whether a GPU object allocated for `self` can hold `other`
    pub fn same_allocation(&self, other: &Geometry) -> bool {
        self.u_bits == other.u_bits && self.v_bits == other.v_bits && self.mip_count == other.mip_count
    }
}

/// Source level and resampling for GPU level `level`
///
/// Levels past the end of the source are synthesized from its last level
/// with a stride of `1 << step_bits`.
pub(super) fn plan_level(geometry: &Geometry, level: u32, source_levels: u32, masked: bool) -> (u32, LevelJob) {
    let wanted = geometry.base_mip + level;
    let last = source_levels.saturating_sub(1);
    let (src_level, step_bits) = if wanted <= last {
        (wanted, 0)
    } else {
        (last, wanted - last)
    };

    let dst_u = geometry.u_bits.saturating_sub(level);
    let dst_v = geometry.v_bits.saturating_sub(level);
    let src_u = geometry.native_u_bits.saturating_sub(wanted);
    let src_v = geometry.native_v_bits.saturating_sub(wanted);

    let job = LevelJob {
        dst_width: 1 << dst_u,
        dst_height: 1 << dst_v,
        u_shift: src_u as i32 - dst_u as i32,
        v_shift: src_v as i32 - dst_v as i32,
        step_bits,
        masked,
    };
    (src_level, job)
}

/// Convert and write levels `0..mip_count`, stopping at the first level whose
/// source data is missing. Returns the number of levels written.
#[allow(clippy::too_many_arguments)]
pub(super) fn upload_levels<B: TextureBackend>(
    backend: &mut B,
    texture: &mut B::Texture,
    geometry: &Geometry,
    format: GpuFormat,
    convert: ConvertFn,
    masked: bool,
    source: &SourceTexture<'_>,
    scratch: &mut Vec<u8>,
) -> u32 {
    let source_levels = source.levels.len() as u32;

    for level in 0..geometry.mip_count {
        let (src_level, job) = plan_level(geometry, level, source_levels, masked);
        let Some(src) = source.levels.get(src_level as usize) else {
            return level;
        };
        let Some(data) = src.data else {
            tracing::warn!(
                "Source level {} missing, stopping upload after {} of {} levels",
                src_level,
                level,
                geometry.mip_count
            );
            return level;
        };

        let view = SourceView {
            format: source.format,
            data,
            width: src.width,
            height: src.height,
            palette: source.palette,
        };
        let row_pitch = format.row_pitch(job.dst_width);
        scratch.clear();
        scratch.resize(format.level_size(job.dst_width, job.dst_height), 0);

        convert(&view, &job, scratch.as_mut_slice(), row_pitch);
        backend.write_level(texture, level, job.dst_width, job.dst_height, row_pitch, scratch.as_slice());
    }

    geometry.mip_count
}

/// Zero levels `from..mip_count` of a recycled object
///
/// A truncated upload into a pooled object would otherwise leave the
/// previous owner's texels visible.
pub(super) fn clear_levels<B: TextureBackend>(
    backend: &mut B,
    texture: &mut B::Texture,
    geometry: &Geometry,
    format: GpuFormat,
    from: u32,
    scratch: &mut Vec<u8>,
) {
    for level in from..geometry.mip_count {
        let width = 1 << geometry.u_bits.saturating_sub(level);
        let height = 1 << geometry.v_bits.saturating_sub(level);
        scratch.clear();
        scratch.resize(format.level_size(width, height), 0);
        backend.write_level(texture, level, width, height, format.row_pitch(width), scratch.as_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mip::{BudgetInput, budget};

    fn geometry(u: u32, v: u32, levels: u32, always_mipmap: bool) -> Geometry {
        let b = budget(&BudgetInput {
            native_u_bits: u,
            native_v_bits: v,
            source_levels: levels,
            hw_max_log2: 8,
            min_log2: 0,
            max_aspect_log2: 8,
            always_mipmap,
        });
        Geometry::new(&b, u, v)
    }

    #[test]
    fn test_plan_existing_levels_have_no_step() {
        let g = geometry(4, 3, 5, false);
        let (src, job) = plan_level(&g, 2, 5, false);
        assert_eq!(src, 2);
        assert_eq!((job.dst_width, job.dst_height), (4, 2));
        assert_eq!((job.u_shift, job.v_shift, job.step_bits), (0, 0, 0));
    }

    #[test]
    fn test_plan_synthesizes_past_last_level() {
        let g = geometry(3, 3, 1, true);
        assert_eq!(g.mip_count, 4);

        let (src, job) = plan_level(&g, 2, 1, false);
        assert_eq!(src, 0);
        assert_eq!(job.step_bits, 2);
        assert_eq!((job.dst_width, job.dst_height), (2, 2));
        assert_eq!((job.u_shift, job.v_shift), (0, 0));
    }

    #[test]
    fn test_plan_skipped_base_mip() {
        // 1024×1024 with a 256 ceiling starts at source level 2
        let g = geometry(10, 10, 11, false);
        let (src, job) = plan_level(&g, 0, 11, true);
        assert_eq!(src, 2);
        assert_eq!(job.dst_width, 256);
        assert!(job.masked);
    }

    #[test]
    fn test_plan_degraded_level_subsamples() {
        // Single 512×512 level under a 256 ceiling
        let g = geometry(9, 9, 1, false);
        let (src, job) = plan_level(&g, 0, 1, false);
        assert_eq!(src, 0);
        assert_eq!((job.u_shift, job.v_shift), (1, 1));
        assert_eq!(job.step_bits, 0);
    }

    #[test]
    fn test_same_allocation_ignores_base_mip() {
        let a = geometry(8, 8, 9, false);
        let b = geometry(9, 9, 10, false);
        assert_ne!(a.base_mip, b.base_mip);
        assert!(a.same_allocation(&b));
        assert!(!a.same_allocation(&geometry(8, 7, 8, false)));
    }
}
