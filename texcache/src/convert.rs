//! Upload conversion: engine pixel data → GPU level backing memory
//!
//! One routine per `(source format, target format)` pair, each filling a
//! single mip level into caller-provided memory with a known row pitch.
//! Every routine exists in two edge variants: texels past the source's real
//! extent are either zero-filled or clamped to the last row/column (UI assets
//! that must not show a seam). The variant is picked once per entry via
//! [`select`] and stored as a plain function pointer.

use crate::error::{CacheError, Result};
use crate::format::{GpuFormat, Palette, SourceFormat};

/// How texels outside the source's real extent are produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EdgeMode {
    /// Fill with zero
    #[default]
    Zero,
    /// Replicate the last source row/column
    Clamp,
}

/// Read-only view of one source mip level
#[derive(Debug, Clone, Copy)]
pub struct SourceView<'a> {
    pub format: SourceFormat,
    pub data: &'a [u8],
    /// Real width in texels (may be smaller than the power-of-two size)
    pub width: u32,
    /// Real height in texels
    pub height: u32,
    pub palette: Option<&'a Palette>,
}

/// What to produce for one destination level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelJob {
    pub dst_width: u32,
    pub dst_height: u32,
    /// Source minus destination log2 width: positive subsamples, negative replicates
    pub u_shift: i32,
    /// Source minus destination log2 height
    pub v_shift: i32,
    /// Extra subsampling for levels synthesized from a finer source level
    pub step_bits: u32,
    /// Palette index 0 is transparent
    pub masked: bool,
}

/// Conversion routine: fills `dst` (rows of `row_pitch` bytes) for one level
pub type ConvertFn = fn(&SourceView<'_>, &LevelJob, &mut [u8], usize);

/// Map a destination coordinate to a source coordinate
#[inline]
fn source_coord(d: u32, shift: i32, step_bits: u32) -> u32 {
    let c = if shift >= 0 {
        d.checked_shl(shift as u32).unwrap_or(u32::MAX)
    } else {
        d >> (-shift) as u32
    };
    c.checked_shl(step_bits).unwrap_or(u32::MAX)
}

/// Resolve a source coordinate against the real extent
#[inline]
fn edge<const CLAMP: bool>(c: u32, extent: u32) -> Option<u32> {
    if c < extent {
        Some(c)
    } else if CLAMP && extent > 0 {
        Some(extent - 1)
    } else {
        None
    }
}

/// Shared texel loop for uncompressed formats
fn convert_texels<const CLAMP: bool, const DST_BPP: usize>(
    src: &SourceView<'_>,
    job: &LevelJob,
    dst: &mut [u8],
    row_pitch: usize,
    texel: impl Fn(&[u8]) -> [u8; DST_BPP],
) {
    let src_bpp = src.format.bytes_per_texel();
    let src_pitch = src.width as usize * src_bpp;

    for (y, row) in dst
        .chunks_mut(row_pitch)
        .take(job.dst_height as usize)
        .enumerate()
    {
        let row = &mut row[..job.dst_width as usize * DST_BPP];
        let Some(sy) = edge::<CLAMP>(source_coord(y as u32, job.v_shift, job.step_bits), src.height)
        else {
            row.fill(0);
            continue;
        };
        let src_row = src.data.get(sy as usize * src_pitch..).unwrap_or(&[]);

        for (x, out) in row.chunks_exact_mut(DST_BPP).enumerate() {
            let sx = edge::<CLAMP>(source_coord(x as u32, job.u_shift, job.step_bits), src.width);
            let bytes = sx.and_then(|sx| {
                let start = sx as usize * src_bpp;
                src_row.get(start..start + src_bpp)
            });
            match bytes {
                Some(bytes) => out.copy_from_slice(&texel(bytes)),
                None => out.fill(0),
            }
        }
    }
}

#[inline]
fn pack_rgb5a1([r, g, b, a]: [u8; 4]) -> [u8; 2] {
    let packed = (u16::from(a >= 0x80) << 15)
        | (u16::from(r >> 3) << 10)
        | (u16::from(g >> 3) << 5)
        | u16::from(b >> 3);
    packed.to_le_bytes()
}

fn p8_to_rgba8<const CLAMP: bool>(src: &SourceView<'_>, job: &LevelJob, dst: &mut [u8], pitch: usize) {
    let Some(palette) = src.palette else {
        dst.fill(0);
        return;
    };
    convert_texels::<CLAMP, 4>(src, job, dst, pitch, |t| palette.lookup(t[0], job.masked));
}

fn p8_to_rgb5a1<const CLAMP: bool>(src: &SourceView<'_>, job: &LevelJob, dst: &mut [u8], pitch: usize) {
    let Some(palette) = src.palette else {
        dst.fill(0);
        return;
    };
    convert_texels::<CLAMP, 2>(src, job, dst, pitch, |t| {
        pack_rgb5a1(palette.lookup(t[0], job.masked))
    });
}

fn bgra7777_to_rgba8<const CLAMP: bool>(
    src: &SourceView<'_>,
    job: &LevelJob,
    dst: &mut [u8],
    pitch: usize,
) {
    convert_texels::<CLAMP, 4>(src, job, dst, pitch, |t| {
        [t[2] << 1, t[1] << 1, t[0] << 1, t[3] << 1]
    });
}

fn bgra8_to_rgba8<const CLAMP: bool>(src: &SourceView<'_>, job: &LevelJob, dst: &mut [u8], pitch: usize) {
    convert_texels::<CLAMP, 4>(src, job, dst, pitch, |t| [t[2], t[1], t[0], t[3]]);
}

fn bgra8_to_rgb5a1<const CLAMP: bool>(
    src: &SourceView<'_>,
    job: &LevelJob,
    dst: &mut [u8],
    pitch: usize,
) {
    convert_texels::<CLAMP, 2>(src, job, dst, pitch, |t| pack_rgb5a1([t[2], t[1], t[0], t[3]]));
}

fn rgba8_to_rgba8<const CLAMP: bool>(src: &SourceView<'_>, job: &LevelJob, dst: &mut [u8], pitch: usize) {
    convert_texels::<CLAMP, 4>(src, job, dst, pitch, |t| [t[0], t[1], t[2], t[3]]);
}

/// Block passthrough; resampling happens at 4×4 block granularity
fn dxt1_to_bc1<const CLAMP: bool>(src: &SourceView<'_>, job: &LevelJob, dst: &mut [u8], pitch: usize) {
    const BLOCK: usize = 8;
    let src_blocks_x = src.width.div_ceil(4).max(1);
    let src_blocks_y = src.height.div_ceil(4).max(1);
    let dst_blocks_x = job.dst_width.div_ceil(4).max(1) as usize;
    let dst_blocks_y = job.dst_height.div_ceil(4).max(1) as usize;
    let src_pitch = src_blocks_x as usize * BLOCK;

    for (by, row) in dst.chunks_mut(pitch).take(dst_blocks_y).enumerate() {
        let row = &mut row[..dst_blocks_x * BLOCK];
        let Some(sy) = edge::<CLAMP>(source_coord(by as u32, job.v_shift, job.step_bits), src_blocks_y)
        else {
            row.fill(0);
            continue;
        };
        let src_row = src.data.get(sy as usize * src_pitch..).unwrap_or(&[]);

        for (bx, out) in row.chunks_exact_mut(BLOCK).enumerate() {
            let block = edge::<CLAMP>(source_coord(bx as u32, job.u_shift, job.step_bits), src_blocks_x)
                .and_then(|sx| src_row.get(sx as usize * BLOCK..(sx as usize + 1) * BLOCK));
            match block {
                Some(block) => out.copy_from_slice(block),
                None => out.fill(0),
            }
        }
    }
}

macro_rules! variant {
    ($routine:ident, $edge:expr) => {
        match $edge {
            EdgeMode::Zero => $routine::<false> as ConvertFn,
            EdgeMode::Clamp => $routine::<true> as ConvertFn,
        }
    };
}

/// Look up the routine for a source/target pair and edge mode
pub fn select(source: SourceFormat, target: GpuFormat, edge: EdgeMode) -> Result<ConvertFn> {
    let routine = match (source, source.is_paletted(), target) {
        (SourceFormat::Dxt1, false, GpuFormat::Bc1) => variant!(dxt1_to_bc1, edge),
        (SourceFormat::P8, true, GpuFormat::Rgba8) => variant!(p8_to_rgba8, edge),
        (SourceFormat::P8, true, GpuFormat::Rgb5a1) => variant!(p8_to_rgb5a1, edge),
        (SourceFormat::Bgra7777, false, GpuFormat::Rgba8) => variant!(bgra7777_to_rgba8, edge),
        (SourceFormat::Bgra8, false, GpuFormat::Rgba8) => variant!(bgra8_to_rgba8, edge),
        (SourceFormat::Bgra8, false, GpuFormat::Rgb5a1) => variant!(bgra8_to_rgb5a1, edge),
        (SourceFormat::Rgba8, false, GpuFormat::Rgba8) => variant!(rgba8_to_rgba8, edge),
        (source_format, paletted, target) => {
            return Err(CacheError::UnsupportedConversion {
                source_format,
                paletted,
                target,
            });
        }
    };
    Ok(routine)
}

/// Choose the GPU format a source is stored in
///
/// Compressed data is passed through and requires backend support. Paletted
/// and plain art drop to 16-bit when requested and supported; engine-generated
/// data always keeps full precision.
pub fn target_format(
    source: SourceFormat,
    prefer_16bit: bool,
    supports: impl Fn(GpuFormat) -> bool,
) -> Result<GpuFormat> {
    match source {
        SourceFormat::Dxt1 if supports(GpuFormat::Bc1) => Ok(GpuFormat::Bc1),
        SourceFormat::Dxt1 => Err(CacheError::UnsupportedConversion {
            source_format: source,
            paletted: false,
            target: GpuFormat::Bc1,
        }),
        SourceFormat::P8 | SourceFormat::Bgra8 if prefer_16bit && supports(GpuFormat::Rgb5a1) => {
            Ok(GpuFormat::Rgb5a1)
        }
        _ => Ok(GpuFormat::Rgba8),
    }
}

#[cfg(test)]
mod tests;
