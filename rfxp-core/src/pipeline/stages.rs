//! Pure per-stage transforms for the progressive encode chain.
//!
//! Every transform is a deterministic function of its inputs and
//! parameters: same inputs + same params = same tiles, which is what
//! makes partial recomputation equivalent to a full rerun. Arity is
//! validated by the pipeline before a transform runs.

use crate::error::CodecError;
use crate::param::{BAND_COUNT, EntropyAlgorithm, QuantizationFactors, StageParams};
use crate::pipeline::StageKind;
use crate::tile::Tile;

/// Execute one leaf stage.
pub(crate) fn run(
    kind: StageKind,
    params: &StageParams,
    inputs: &[Tile],
) -> Result<Vec<Tile>, CodecError> {
    match kind {
        StageKind::Sequence => Ok(inputs.to_vec()),
        StageKind::ColorConvert => Ok(vec![color_convert(&inputs[0])?]),
        StageKind::Dwt => Ok(vec![dwt(&inputs[0], params.reduce_extrapolate)?]),
        StageKind::Quantize => {
            let quant = params.quant.ok_or_else(|| {
                CodecError::Validation("quantization factors not set".into())
            })?;
            Ok(vec![quantize(&inputs[0], &quant)?])
        }
        StageKind::Linearize => Ok(vec![linearize(&inputs[0])?]),
        StageKind::SubBandDiff => sub_band_diff(params, &inputs[0]),
        StageKind::ProgressiveQuantize => progressive_quantize(params, &inputs[0]),
        StageKind::EntropyEncode => entropy_encode(params, inputs),
    }
}

// ── Color conversion ─────────────────────────────────────────────

/// RGB → YCbCr, BT.601-style integer approximation.
pub(crate) fn color_convert(tile: &Tile) -> Result<Tile, CodecError> {
    let (r, g, b) = (tile.plane(0), tile.plane(1), tile.plane(2));
    let mut y = Vec::with_capacity(r.len());
    let mut cb = Vec::with_capacity(r.len());
    let mut cr = Vec::with_capacity(r.len());

    for i in 0..r.len() {
        let (rv, gv, bv) = (i64::from(r[i]), i64::from(g[i]), i64::from(b[i]));
        y.push(((77 * rv + 150 * gv + 29 * bv) >> 8) as i32);
        cb.push(((-43 * rv - 85 * gv + 128 * bv) >> 8) as i32);
        cr.push(((128 * rv - 107 * gv - 21 * bv) >> 8) as i32);
    }

    Tile::from_planes(tile.width(), tile.height(), [y, cb, cr])
}

// ── Wavelet ──────────────────────────────────────────────────────

/// Three-level 2D Haar lifting. The reduce/extrapolate flag switches
/// the low-pass rounding from floor to round-half-up.
pub(crate) fn dwt(tile: &Tile, reduce_extrapolate: bool) -> Result<Tile, CodecError> {
    let (w, h) = (tile.width(), tile.height());
    let planes = [
        dwt_plane(tile.plane(0), w, h, reduce_extrapolate),
        dwt_plane(tile.plane(1), w, h, reduce_extrapolate),
        dwt_plane(tile.plane(2), w, h, reduce_extrapolate),
    ];
    Tile::from_planes(w, h, planes)
}

fn dwt_plane(samples: &[i32], w: usize, h: usize, round_up: bool) -> Vec<i32> {
    let mut data = samples.to_vec();
    let (mut cw, mut ch) = (w, h);

    for _ in 0..3 {
        if cw < 2 || ch < 2 || cw % 2 != 0 || ch % 2 != 0 {
            break;
        }

        // Row pass: lows into the left half, highs into the right.
        let mut row = vec![0i32; cw];
        for y in 0..ch {
            for x in 0..cw / 2 {
                let a = data[y * w + 2 * x];
                let b = data[y * w + 2 * x + 1];
                row[x] = avg(a, b, round_up);
                row[cw / 2 + x] = diff(a, b);
            }
            data[y * w..y * w + cw].copy_from_slice(&row);
        }

        // Column pass: lows to the top half, highs to the bottom.
        let mut col = vec![0i32; ch];
        for x in 0..cw {
            for y in 0..ch / 2 {
                let a = data[(2 * y) * w + x];
                let b = data[(2 * y + 1) * w + x];
                col[y] = avg(a, b, round_up);
                col[ch / 2 + y] = diff(a, b);
            }
            for (y, &v) in col.iter().enumerate() {
                data[y * w + x] = v;
            }
        }

        cw /= 2;
        ch /= 2;
    }

    data
}

fn avg(a: i32, b: i32, round_up: bool) -> i32 {
    ((i64::from(a) + i64::from(b) + i64::from(round_up)) >> 1) as i32
}

fn diff(a: i32, b: i32) -> i32 {
    (i64::from(a) - i64::from(b)).clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

// ── Band layout ──────────────────────────────────────────────────

/// Band index of a coefficient position in the three-level layout.
///
/// Bands are numbered 0..[`BAND_COUNT`] in the order LL3, HL3, LH3,
/// HH3, HL2, LH2, HH2, HL1, LH1, HH1. Dimensions that stop halving
/// cleanly collapse the remaining levels into the low band, matching
/// the wavelet's early exit.
pub(crate) fn band_of(x: usize, y: usize, w: usize, h: usize) -> usize {
    let (mut w, mut h) = (w, h);
    for level in 0..3 {
        if w < 2 || h < 2 || w % 2 != 0 || h % 2 != 0 {
            return 0;
        }
        let (hw, hh) = (w / 2, h / 2);
        let right = x >= hw;
        let bottom = y >= hh;
        if right || bottom {
            let base = [7, 4, 1][level];
            let offset = if right && bottom {
                2
            } else if bottom {
                1
            } else {
                0
            };
            return base + offset;
        }
        w = hw;
        h = hh;
    }
    0
}

// ── Quantization ─────────────────────────────────────────────────

/// Discard each band's low bits according to its factor.
pub(crate) fn quantize(tile: &Tile, quant: &QuantizationFactors) -> Result<Tile, CodecError> {
    let (w, h) = (tile.width(), tile.height());
    let mut planes: [Vec<i32>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (p, plane) in planes.iter_mut().enumerate() {
        let src = tile.plane(p);
        plane.reserve(src.len());
        for y in 0..h {
            for x in 0..w {
                let shift = quant.shift(band_of(x, y, w, h));
                plane.push(src[y * w + x] >> shift);
            }
        }
    }

    let [a, b, c] = planes;
    Tile::from_planes(w, h, [a, b, c])
}

// ── Linearization ────────────────────────────────────────────────

/// Reorder coefficients into contiguous band runs (band 0 first),
/// preserving row-major order within each band.
pub(crate) fn linearize(tile: &Tile) -> Result<Tile, CodecError> {
    let (w, h) = (tile.width(), tile.height());
    let mut planes: [Vec<i32>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (p, plane) in planes.iter_mut().enumerate() {
        let src = tile.plane(p);
        plane.reserve(src.len());
        for band in 0..BAND_COUNT {
            for y in 0..h {
                for x in 0..w {
                    if band_of(x, y, w, h) == band {
                        plane.push(src[y * w + x]);
                    }
                }
            }
        }
    }

    let [a, b, c] = planes;
    Tile::from_planes(w, h, [a, b, c])
}

// ── Sub-band differencing ────────────────────────────────────────

/// Subtract the previous frame's reference coefficients when temporal
/// differencing is enabled; otherwise pass the tile through.
fn sub_band_diff(params: &StageParams, tile: &Tile) -> Result<Vec<Tile>, CodecError> {
    match &params.previous_frame {
        Some(prev) if params.use_difference_tile => Ok(vec![tile.zip_map(prev, diff)?]),
        _ => Ok(vec![tile.clone()]),
    }
}

// ── Progressive quantization ─────────────────────────────────────

/// One output tile per progressive layer, each the input quantized by
/// that layer's factor set. Layer order follows the request order.
fn progressive_quantize(params: &StageParams, tile: &Tile) -> Result<Vec<Tile>, CodecError> {
    let prog = params
        .prog_quants
        .as_ref()
        .filter(|p| !p.is_empty())
        .ok_or_else(|| {
            CodecError::Validation("at least one progressive layer is required".into())
        })?;

    prog.iter().map(|quant| quantize(tile, quant)).collect()
}

// ── Entropy pre-coding ───────────────────────────────────────────

/// Predictor-residual coding per layer.
///
/// Output layout: index 0 is the first-pass coded tile; every later
/// layer contributes a (coded, raw) pair at consecutive indices.
fn entropy_encode(params: &StageParams, inputs: &[Tile]) -> Result<Vec<Tile>, CodecError> {
    let algo = params.entropy.unwrap_or_default();
    let mut out = Vec::with_capacity(1 + 2 * inputs.len().saturating_sub(1));

    for (idx, layer) in inputs.iter().enumerate() {
        out.push(residual(layer, algo)?);
        if idx > 0 {
            out.push(layer.clone());
        }
    }

    Ok(out)
}

fn residual(tile: &Tile, algo: EntropyAlgorithm) -> Result<Tile, CodecError> {
    let (w, h) = (tile.width(), tile.height());
    let mut planes: [Vec<i32>; 3] = [Vec::new(), Vec::new(), Vec::new()];

    for (p, plane) in planes.iter_mut().enumerate() {
        let src = tile.plane(p);
        plane.reserve(src.len());
        for y in 0..h {
            for x in 0..w {
                let predicted = match algo {
                    EntropyAlgorithm::Rlgr1 => {
                        if x > 0 { src[y * w + x - 1] } else { 0 }
                    }
                    EntropyAlgorithm::Rlgr3 => {
                        let left = if x > 0 { src[y * w + x - 1] } else { 0 };
                        let above = if y > 0 { src[(y - 1) * w + x] } else { 0 };
                        avg(left, above, false)
                    }
                };
                plane.push(diff(src[y * w + x], predicted));
            }
        }
    }

    let [a, b, c] = planes;
    Tile::from_planes(w, h, [a, b, c])
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::param::ProgressiveQuantizationFactors;

    fn gray_tile(w: usize, h: usize, value: i32) -> Tile {
        Tile::from_planes(
            w,
            h,
            [
                vec![value; w * h],
                vec![value; w * h],
                vec![value; w * h],
            ],
        )
        .unwrap()
    }

    #[test]
    fn color_convert_white_maps_to_luma() {
        let white = gray_tile(2, 2, 255);
        let ycc = color_convert(&white).unwrap();
        // 255 * (77 + 150 + 29) >> 8 == 255
        assert!(ycc.plane(0).iter().all(|&v| v == 255));
        // Chroma of a gray pixel is ~0.
        assert!(ycc.plane(1).iter().all(|&v| v.abs() <= 1));
        assert!(ycc.plane(2).iter().all(|&v| v.abs() <= 1));
    }

    #[test]
    fn dwt_of_constant_tile_has_zero_high_bands() {
        let tile = gray_tile(8, 8, 100);
        let out = dwt(&tile, false).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let v = out.plane(0)[y * 8 + x];
                if band_of(x, y, 8, 8) == 0 {
                    assert_eq!(v, 100, "LL3 at ({x},{y})");
                } else {
                    assert_eq!(v, 0, "high band at ({x},{y})");
                }
            }
        }
    }

    #[test]
    fn dwt_zero_tile_stays_zero() {
        let tile = gray_tile(8, 8, 0);
        let out = dwt(&tile, true).unwrap();
        assert!(out.plane(0).iter().all(|&v| v == 0));
    }

    #[test]
    fn reduce_extrapolate_changes_rounding() {
        let tile = Tile::from_planes(
            2,
            2,
            [vec![1, 2, 1, 2], vec![0; 4], vec![0; 4]],
        )
        .unwrap();
        let floor = dwt(&tile, false).unwrap();
        let round = dwt(&tile, true).unwrap();
        // (1 + 2) >> 1 == 1, (1 + 2 + 1) >> 1 == 2 at the low position.
        assert_eq!(floor.plane(0)[0], 1);
        assert_eq!(round.plane(0)[0], 2);
    }

    #[test]
    fn band_layout_covers_all_bands_on_8x8() {
        let mut seen = [false; BAND_COUNT];
        for y in 0..8 {
            for x in 0..8 {
                seen[band_of(x, y, 8, 8)] = true;
            }
        }
        assert!(seen.iter().all(|&s| s), "bands seen: {seen:?}");
    }

    #[test]
    fn band_of_corners() {
        // 8x8, three clean levels: (0,0) is LL3, (7,7) is HH1.
        assert_eq!(band_of(0, 0, 8, 8), 0);
        assert_eq!(band_of(7, 7, 8, 8), 9);
        assert_eq!(band_of(7, 0, 8, 8), 7); // HL1
        assert_eq!(band_of(0, 7, 8, 8), 8); // LH1
    }

    #[test]
    fn odd_dimensions_collapse_to_low_band() {
        assert_eq!(band_of(2, 2, 3, 3), 0);
    }

    #[test]
    fn quantize_shifts_per_band() {
        let tile = gray_tile(8, 8, 64);
        // LL3 keeps all bits, everything else discards 2.
        let mut factors = [8u8; BAND_COUNT];
        factors[0] = 6;
        let quant = QuantizationFactors::new(&factors).unwrap();
        let out = quantize(&tile, &quant).unwrap();
        for y in 0..8 {
            for x in 0..8 {
                let expected = if band_of(x, y, 8, 8) == 0 { 64 } else { 16 };
                assert_eq!(out.plane(0)[y * 8 + x], expected);
            }
        }
    }

    #[test]
    fn linearize_preserves_sample_population() {
        let tile = Tile::from_planes(
            4,
            4,
            [
                (0..16).collect(),
                vec![0; 16],
                vec![0; 16],
            ],
        )
        .unwrap();
        let out = linearize(&tile).unwrap();
        let mut before: Vec<i32> = tile.plane(0).to_vec();
        let mut after: Vec<i32> = out.plane(0).to_vec();
        before.sort_unstable();
        after.sort_unstable();
        assert_eq!(before, after);
    }

    #[test]
    fn linearize_puts_low_band_first() {
        let (w, h) = (8, 8);
        let mut plane = vec![0i32; w * h];
        for y in 0..h {
            for x in 0..w {
                // Tag every sample with its band so the output order is visible.
                plane[y * w + x] = band_of(x, y, w, h) as i32;
            }
        }
        let tile = Tile::from_planes(w, h, [plane, vec![0; 64], vec![0; 64]]).unwrap();
        let out = linearize(&tile).unwrap();
        let tags = out.plane(0);
        assert!(tags.windows(2).all(|p| p[0] <= p[1]), "bands not contiguous");
    }

    #[test]
    fn diff_without_previous_frame_passes_through() {
        let tile = gray_tile(4, 4, 9);
        let params = StageParams {
            use_difference_tile: true,
            ..StageParams::default()
        };
        let out = sub_band_diff(&params, &tile).unwrap();
        assert_eq!(out, vec![tile]);
    }

    #[test]
    fn diff_subtracts_previous_frame() {
        let tile = gray_tile(4, 4, 9);
        let params = StageParams {
            use_difference_tile: true,
            previous_frame: Some(gray_tile(4, 4, 5)),
            ..StageParams::default()
        };
        let out = sub_band_diff(&params, &tile).unwrap();
        assert!(out[0].plane(0).iter().all(|&v| v == 4));
    }

    #[test]
    fn diff_disabled_ignores_previous_frame() {
        let tile = gray_tile(4, 4, 9);
        let params = StageParams {
            use_difference_tile: false,
            previous_frame: Some(gray_tile(4, 4, 5)),
            ..StageParams::default()
        };
        let out = sub_band_diff(&params, &tile).unwrap();
        assert_eq!(out, vec![tile]);
    }

    #[test]
    fn progressive_quantize_emits_one_tile_per_layer() {
        let tile = gray_tile(8, 8, 64);
        let prog = ProgressiveQuantizationFactors::new(vec![
            QuantizationFactors::new(&[8; 10]).unwrap(),
            QuantizationFactors::new(&[7; 10]).unwrap(),
            QuantizationFactors::new(&[6; 10]).unwrap(),
        ]);
        let params = StageParams {
            prog_quants: Some(prog),
            ..StageParams::default()
        };
        let out = progressive_quantize(&params, &tile).unwrap();
        assert_eq!(out.len(), 3);
        // Finer layers keep more precision.
        assert_eq!(out[0].plane(0)[63], 16);
        assert_eq!(out[1].plane(0)[63], 32);
        assert_eq!(out[2].plane(0)[63], 64);
    }

    #[test]
    fn progressive_quantize_requires_layers() {
        let tile = gray_tile(8, 8, 64);
        let err = progressive_quantize(&StageParams::default(), &tile);
        assert!(matches!(err, Err(CodecError::Validation(_))));
    }

    #[test]
    fn entropy_layout_interleaves_raw_companions() {
        let layers = vec![gray_tile(4, 4, 1), gray_tile(4, 4, 2), gray_tile(4, 4, 3)];
        let out = entropy_encode(&StageParams::default(), &layers).unwrap();
        // first pass + 2 coded/raw pairs
        assert_eq!(out.len(), 5);
        assert_eq!(out[2], layers[1]);
        assert_eq!(out[4], layers[2]);
    }

    #[test]
    fn rlgr1_residual_keeps_row_leaders() {
        let tile = Tile::from_planes(
            4,
            1,
            [vec![5, 5, 7, 7], vec![0; 4], vec![0; 4]],
        )
        .unwrap();
        let params = StageParams::default();
        let out = entropy_encode(&params, std::slice::from_ref(&tile)).unwrap();
        assert_eq!(out[0].plane(0), &[5, 0, 2, 0]);
    }

    #[test]
    fn rlgr3_uses_left_above_average() {
        let tile = Tile::from_planes(
            2,
            2,
            [vec![4, 8, 6, 10], vec![0; 4], vec![0; 4]],
        )
        .unwrap();
        let params = StageParams {
            entropy: Some(EntropyAlgorithm::Rlgr3),
            ..StageParams::default()
        };
        let out = entropy_encode(&params, std::slice::from_ref(&tile)).unwrap();
        // (0,0): pred 0 → 4; (1,0): pred (4+0)/2=2 → 6;
        // (0,1): pred (0+4)/2=2 → 4; (1,1): pred (6+8)/2=7 → 3.
        assert_eq!(out[0].plane(0), &[4, 6, 4, 3]);
    }
}
