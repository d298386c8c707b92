//! Tests for upload conversion routines

use super::*;

fn job(w: u32, h: u32) -> LevelJob {
    LevelJob {
        dst_width: w,
        dst_height: h,
        u_shift: 0,
        v_shift: 0,
        step_bits: 0,
        masked: false,
    }
}

fn run(
    source: SourceFormat,
    target: GpuFormat,
    edge: EdgeMode,
    src: &SourceView<'_>,
    job: &LevelJob,
) -> Vec<u8> {
    let routine = select(source, target, edge).unwrap();
    let pitch = target.row_pitch(job.dst_width);
    let mut dst = vec![0xAAu8; pitch * target.row_count(job.dst_height)];
    routine(src, job, &mut dst, pitch);
    dst
}

fn rgba_view(data: &[u8], width: u32, height: u32) -> SourceView<'_> {
    SourceView {
        format: SourceFormat::Rgba8,
        data,
        width,
        height,
        palette: None,
    }
}

#[test]
fn test_select_rejects_unknown_pairs() {
    assert!(matches!(
        select(SourceFormat::Dxt1, GpuFormat::Rgba8, EdgeMode::Zero),
        Err(CacheError::UnsupportedConversion { .. })
    ));
    assert!(select(SourceFormat::Bgra7777, GpuFormat::Rgb5a1, EdgeMode::Zero).is_err());
    assert!(select(SourceFormat::Rgba8, GpuFormat::Bc1, EdgeMode::Clamp).is_err());
}

#[test]
fn test_edge_variants_are_distinct_routines() {
    let zero = select(SourceFormat::Bgra8, GpuFormat::Rgba8, EdgeMode::Zero).unwrap();
    let clamp = select(SourceFormat::Bgra8, GpuFormat::Rgba8, EdgeMode::Clamp).unwrap();
    assert_ne!(zero as usize, clamp as usize);
}

#[test]
fn test_rgba8_copy() {
    let data: Vec<u8> = (0..16).collect();
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Zero,
        &rgba_view(&data, 2, 2),
        &job(2, 2),
    );
    assert_eq!(out, data);
}

#[test]
fn test_bgra8_reorders_channels() {
    let data = [1u8, 2, 3, 4];
    let src = SourceView {
        format: SourceFormat::Bgra8,
        ..rgba_view(&data, 1, 1)
    };
    let out = run(SourceFormat::Bgra8, GpuFormat::Rgba8, EdgeMode::Zero, &src, &job(1, 1));
    assert_eq!(out, vec![3, 2, 1, 4]);
}

#[test]
fn test_bgra7777_widens_and_reorders() {
    let data = [0x7F_u8, 0x40, 0x01, 0x7F];
    let src = SourceView {
        format: SourceFormat::Bgra7777,
        ..rgba_view(&data, 1, 1)
    };
    let out = run(SourceFormat::Bgra7777, GpuFormat::Rgba8, EdgeMode::Zero, &src, &job(1, 1));
    assert_eq!(out, vec![0x02, 0x80, 0xFE, 0xFE]);
}

#[test]
fn test_p8_expands_through_palette() {
    let palette = Palette::greyscale();
    let data = [0u8, 5, 10, 255];
    let src = SourceView {
        format: SourceFormat::P8,
        data: &data,
        width: 2,
        height: 2,
        palette: Some(&palette),
    };
    let out = run(SourceFormat::P8, GpuFormat::Rgba8, EdgeMode::Zero, &src, &job(2, 2));
    assert_eq!(
        out,
        vec![0, 0, 0, 255, 5, 5, 5, 255, 10, 10, 10, 255, 255, 255, 255, 255]
    );
}

#[test]
fn test_p8_masked_index_zero_is_transparent() {
    let palette = Palette::greyscale();
    let data = [0u8, 9];
    let src = SourceView {
        format: SourceFormat::P8,
        data: &data,
        width: 2,
        height: 1,
        palette: Some(&palette),
    };
    let masked = LevelJob {
        masked: true,
        ..job(2, 1)
    };
    let out = run(SourceFormat::P8, GpuFormat::Rgba8, EdgeMode::Zero, &src, &masked);
    assert_eq!(out, vec![0, 0, 0, 0, 9, 9, 9, 255]);
}

#[test]
fn test_p8_to_rgb5a1_packing() {
    let mut entries = [[0u8; 4]; 256];
    entries[1] = [0xFF, 0x00, 0x00, 0xFF];
    entries[2] = [0x00, 0xFF, 0x00, 0x00];
    let palette = Palette::new(entries);
    let data = [1u8, 2];
    let src = SourceView {
        format: SourceFormat::P8,
        data: &data,
        width: 2,
        height: 1,
        palette: Some(&palette),
    };
    let out = run(SourceFormat::P8, GpuFormat::Rgb5a1, EdgeMode::Zero, &src, &job(2, 1));
    let texels: Vec<u16> = out
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(texels, vec![0x8000 | 0x7C00, 0x03E0]);
}

#[test]
fn test_p8_without_palette_writes_zero() {
    let data = [3u8; 4];
    let src = SourceView {
        format: SourceFormat::P8,
        data: &data,
        width: 2,
        height: 2,
        palette: None,
    };
    let out = run(SourceFormat::P8, GpuFormat::Rgba8, EdgeMode::Zero, &src, &job(2, 2));
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn test_beyond_real_extent_is_zero_filled() {
    // 3×1 source stored in a 4×2 level
    let data = [1u8, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Zero,
        &rgba_view(&data, 3, 1),
        &job(4, 2),
    );
    assert_eq!(&out[0..12], &data[..]);
    assert_eq!(&out[12..16], &[0, 0, 0, 0]);
    assert!(out[16..].iter().all(|&b| b == 0));
}

#[test]
fn test_clamp_replicates_edge() {
    let data = [1u8, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3];
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Clamp,
        &rgba_view(&data, 3, 1),
        &job(4, 2),
    );
    assert_eq!(&out[12..16], &[3, 3, 3, 3]);
    // Second row repeats the only source row
    assert_eq!(&out[16..32], &out[0..16]);
}

#[test]
fn test_row_pitch_padding_untouched() {
    let data = [7u8; 4];
    let routine = select(SourceFormat::Rgba8, GpuFormat::Rgba8, EdgeMode::Zero).unwrap();
    let pitch = 8; // one texel of padding per row
    let mut dst = vec![0xAAu8; pitch];
    routine(&rgba_view(&data, 1, 1), &job(1, 1), &mut dst, pitch);
    assert_eq!(&dst[..4], &[7, 7, 7, 7]);
    assert_eq!(&dst[4..], &[0xAA; 4]);
}

#[test]
fn test_step_bits_subsample_with_stride() {
    // 4×1 source, a synthesized 2×1 level with step 1 takes texels 0 and 2
    let data: Vec<u8> = [10u8, 20, 30, 40]
        .iter()
        .flat_map(|&v| [v, v, v, v])
        .collect();
    let stepped = LevelJob {
        step_bits: 1,
        ..job(2, 1)
    };
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Zero,
        &rgba_view(&data, 4, 1),
        &stepped,
    );
    assert_eq!(out, vec![10, 10, 10, 10, 30, 30, 30, 30]);
}

#[test]
fn test_negative_shift_replicates() {
    // 2×1 source grown to 4×1 (min-size clamp)
    let data = [1u8, 1, 1, 1, 2, 2, 2, 2];
    let grown = LevelJob {
        u_shift: -1,
        ..job(4, 1)
    };
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Zero,
        &rgba_view(&data, 2, 1),
        &grown,
    );
    assert_eq!(out, vec![1, 1, 1, 1, 1, 1, 1, 1, 2, 2, 2, 2, 2, 2, 2, 2]);
}

#[test]
fn test_dxt1_passthrough() {
    // 8×4 source: two blocks
    let data: Vec<u8> = (0..16).collect();
    let src = SourceView {
        format: SourceFormat::Dxt1,
        data: &data,
        width: 8,
        height: 4,
        palette: None,
    };
    let out = run(SourceFormat::Dxt1, GpuFormat::Bc1, EdgeMode::Zero, &src, &job(8, 4));
    assert_eq!(out, data);
}

#[test]
fn test_dxt1_block_subsample() {
    // 16×4 source (4 blocks) stored as 8×4: keep blocks 0 and 2
    let data: Vec<u8> = (0..4u8).flat_map(|b| [b; 8]).collect();
    let src = SourceView {
        format: SourceFormat::Dxt1,
        data: &data,
        width: 16,
        height: 4,
        palette: None,
    };
    let halved = LevelJob {
        u_shift: 1,
        ..job(8, 4)
    };
    let out = run(SourceFormat::Dxt1, GpuFormat::Bc1, EdgeMode::Zero, &src, &halved);
    assert_eq!(&out[0..8], &[0; 8]);
    assert_eq!(&out[8..16], &[2; 8]);
}

#[test]
fn test_short_source_data_does_not_panic() {
    let data = [9u8; 4]; // claims 2×2 but only holds one texel
    let out = run(
        SourceFormat::Rgba8,
        GpuFormat::Rgba8,
        EdgeMode::Zero,
        &rgba_view(&data, 2, 2),
        &job(2, 2),
    );
    assert_eq!(&out[0..4], &[9, 9, 9, 9]);
    assert!(out[4..].iter().all(|&b| b == 0));
}

#[test]
fn test_target_format_selection() {
    let all = |_: GpuFormat| true;
    let no_16bit = |f: GpuFormat| f != GpuFormat::Rgb5a1;
    let no_bc = |f: GpuFormat| f != GpuFormat::Bc1;

    assert_eq!(target_format(SourceFormat::Dxt1, false, all), Ok(GpuFormat::Bc1));
    assert!(target_format(SourceFormat::Dxt1, false, no_bc).is_err());

    assert_eq!(target_format(SourceFormat::P8, true, all), Ok(GpuFormat::Rgb5a1));
    assert_eq!(target_format(SourceFormat::P8, true, no_16bit), Ok(GpuFormat::Rgba8));
    assert_eq!(target_format(SourceFormat::P8, false, all), Ok(GpuFormat::Rgba8));

    // Lightmaps keep full precision
    assert_eq!(target_format(SourceFormat::Bgra7777, true, all), Ok(GpuFormat::Rgba8));
}
