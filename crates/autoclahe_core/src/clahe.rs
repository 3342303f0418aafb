//! Contrast-limited adaptive histogram equalization (CLAHE) with
//! data-derived clip limit.
//!
//! The image is divided into a fixed grid of tiles, each tile gets its own
//! clipped histogram equalization, and tile boundaries are blended by
//! bilinear interpolation between tile-center lookup tables to avoid block
//! artifacts. `auto_enhance` derives the clip limit from the pattern's mean
//! intensity, so dark diffraction patterns receive stronger limiting than
//! bright ones.

use ndarray::{s, Array2, ArrayView2};

use crate::error::Error;

// =============================================================================
// Constants
// =============================================================================

/// Number of histogram bins for 8-bit data.
const HIST_BINS: usize = 256;

/// Fixed tile grid for the adaptive filter: 4x4 regions, 16 tiles total.
pub const TILE_GRID: usize = 4;

/// Numerator of the adaptive clip-limit formula `round(10 / mean)`.
const CLIP_LIMIT_NUMERATOR: f64 = 10.0;

// =============================================================================
// Adaptive filter entry point
// =============================================================================

/// Enhance one diffraction pattern with CLAHE, deriving the clip limit from
/// the pattern's mean intensity.
///
/// Pure function of its input: same shape and dtype out, no shared state.
///
/// # Errors
///
/// - [`Error::InvalidShape`] if either dimension is smaller than the 4x4
///   tile grid (a tile would be empty).
/// - [`Error::DegenerateInput`] if the pattern mean is zero, which leaves
///   the clip limit undefined.
pub fn auto_enhance(pattern: ArrayView2<u8>) -> Result<Array2<u8>, Error> {
    let (rows, cols) = pattern.dim();
    if rows < TILE_GRID || cols < TILE_GRID {
        return Err(Error::InvalidShape {
            rows,
            cols,
            reason: "pattern is smaller than the 4x4 tile grid",
        });
    }

    let sum: u64 = pattern.iter().map(|&v| v as u64).sum();
    let mean = sum as f64 / pattern.len() as f64;
    if mean == 0.0 {
        return Err(Error::DegenerateInput);
    }

    let clip_limit = (CLIP_LIMIT_NUMERATOR / mean).round() as u32;
    Ok(clahe(pattern, clip_limit, TILE_GRID))
}

// =============================================================================
// CLAHE kernel
// =============================================================================

/// Axis interpolation entry: the two surrounding tile indices and the
/// fractional weight of the second one.
#[derive(Clone, Copy)]
struct AxisBlend {
    t0: usize,
    t1: usize,
    frac: f64,
}

/// Per-axis tile spans `[t*len/grid, (t+1)*len/grid)`.
fn tile_spans(len: usize, grid: usize) -> Vec<(usize, usize)> {
    (0..grid)
        .map(|t| (t * len / grid, (t + 1) * len / grid))
        .collect()
}

/// Precompute, for every coordinate along one axis, which pair of tile
/// centers surrounds it and the blend fraction between them. Coordinates
/// outside the outermost centers clamp to the edge tile.
fn axis_blend(len: usize, spans: &[(usize, usize)]) -> Vec<AxisBlend> {
    let centers: Vec<f64> = spans
        .iter()
        .map(|&(start, end)| (start + end) as f64 * 0.5)
        .collect();
    let last = centers.len() - 1;

    (0..len)
        .map(|p| {
            let p = p as f64;
            if p <= centers[0] {
                AxisBlend { t0: 0, t1: 0, frac: 0.0 }
            } else if p >= centers[last] {
                AxisBlend { t0: last, t1: last, frac: 0.0 }
            } else {
                // centers is strictly increasing; find the enclosing pair.
                let t = centers.iter().rposition(|&c| c <= p).unwrap_or(0);
                let frac = (p - centers[t]) / (centers[t + 1] - centers[t]);
                AxisBlend { t0: t, t1: t + 1, frac }
            }
        })
        .collect()
}

/// Clipped-histogram equalization lookup table for one tile.
///
/// With `clip_limit > 0` every bin is capped at
/// `max(1, clip_limit * tile_area / 256)` and the clipped excess is
/// redistributed uniformly across all bins; `clip_limit == 0` disables
/// clipping entirely (plain adaptive equalization).
fn tile_lut(tile: ArrayView2<u8>, clip_limit: u32) -> [u8; HIST_BINS] {
    let area = tile.len() as u64;
    debug_assert!(area > 0, "tile spans must be non-empty");

    let mut hist = [0u64; HIST_BINS];
    for &v in tile.iter() {
        hist[v as usize] += 1;
    }

    if clip_limit > 0 {
        let cap = (clip_limit as u64 * area / HIST_BINS as u64).max(1);
        let mut excess = 0u64;
        for bin in hist.iter_mut() {
            if *bin > cap {
                excess += *bin - cap;
                *bin = cap;
            }
        }

        // Redistribute the clipped mass uniformly, remainder one per bin
        // starting at bin 0.
        let share = excess / HIST_BINS as u64;
        let remainder = (excess % HIST_BINS as u64) as usize;
        for (i, bin) in hist.iter_mut().enumerate() {
            *bin += share;
            if i < remainder {
                *bin += 1;
            }
        }
    }

    let mut lut = [0u8; HIST_BINS];
    let mut cum = 0u64;
    for (v, entry) in lut.iter_mut().enumerate() {
        cum += hist[v];
        *entry = (cum as f64 * 255.0 / area as f64).round() as u8;
    }
    lut
}

/// Contrast-limited adaptive histogram equalization over a `grid`x`grid`
/// tile layout.
///
/// Each tile's equalization lookup table is computed independently; output
/// pixels bilinearly interpolate between the lookup tables of the (up to)
/// four tiles whose centers surround them.
///
/// Callers must ensure `rows >= grid` and `cols >= grid`; `auto_enhance`
/// validates this for the adaptive path.
pub fn clahe(pattern: ArrayView2<u8>, clip_limit: u32, grid: usize) -> Array2<u8> {
    let (rows, cols) = pattern.dim();
    assert!(grid > 0, "tile grid must be non-empty");
    assert!(
        rows >= grid && cols >= grid,
        "pattern {}x{} is smaller than the {}x{} tile grid",
        rows,
        cols,
        grid,
        grid
    );

    let row_spans = tile_spans(rows, grid);
    let col_spans = tile_spans(cols, grid);

    // One clipped-equalization LUT per tile, row-major over the grid.
    let luts: Vec<[u8; HIST_BINS]> = row_spans
        .iter()
        .flat_map(|&(r0, r1)| {
            col_spans
                .iter()
                .map(move |&(c0, c1)| (r0, r1, c0, c1))
        })
        .map(|(r0, r1, c0, c1)| tile_lut(pattern.slice(s![r0..r1, c0..c1]), clip_limit))
        .collect();

    let row_blend = axis_blend(rows, &row_spans);
    let col_blend = axis_blend(cols, &col_spans);

    Array2::from_shape_fn((rows, cols), |(r, c)| {
        let v = pattern[[r, c]] as usize;
        let rb = row_blend[r];
        let cb = col_blend[c];

        let v00 = luts[rb.t0 * grid + cb.t0][v] as f64;
        let v01 = luts[rb.t0 * grid + cb.t1][v] as f64;
        let v10 = luts[rb.t1 * grid + cb.t0][v] as f64;
        let v11 = luts[rb.t1 * grid + cb.t1][v] as f64;

        let top = v00 * (1.0 - cb.frac) + v01 * cb.frac;
        let bottom = v10 * (1.0 - cb.frac) + v11 * cb.frac;
        (top * (1.0 - rb.frac) + bottom * rb.frac).round() as u8
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;
    use rand::prelude::*;

    fn random_pattern(rows: usize, cols: usize, seed: u64) -> Array2<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        Array2::from_shape_fn((rows, cols), |_| rng.gen())
    }

    #[test]
    fn test_clahe_preserves_shape() {
        for (rows, cols) in [(8, 8), (16, 32), (33, 17)] {
            let pattern = random_pattern(rows, cols, (rows * 100 + cols) as u64);
            let enhanced = clahe(pattern.view(), 2, TILE_GRID);
            assert_eq!(enhanced.dim(), (rows, cols));
        }
    }

    #[test]
    fn test_clahe_uniform_input_uniform_output() {
        // Every tile sees the same histogram, so every pixel maps through
        // the same LUT entry.
        let pattern = Array2::from_elem((16, 16), 100u8);
        let enhanced = clahe(pattern.view(), 2, TILE_GRID);

        let first = enhanced[[0, 0]];
        assert!(enhanced.iter().all(|&v| v == first));
    }

    #[test]
    fn test_clahe_deterministic() {
        let pattern = random_pattern(32, 32, 4242);
        let a = clahe(pattern.view(), 3, TILE_GRID);
        let b = clahe(pattern.view(), 3, TILE_GRID);
        assert_eq!(a, b);
    }

    #[test]
    fn test_clahe_zero_clip_limit_is_plain_ahe() {
        // clip_limit == 0 disables clipping but the pipeline still runs.
        let pattern = random_pattern(16, 16, 99);
        let enhanced = clahe(pattern.view(), 0, TILE_GRID);
        assert_eq!(enhanced.dim(), (16, 16));
    }

    #[test]
    fn test_clahe_equalizes_low_contrast_tile() {
        // A narrow-range pattern should spread toward the full range when
        // clipping is generous.
        let pattern = Array2::from_shape_fn((32, 32), |(r, c)| 100 + ((r + c) % 32) as u8);
        let enhanced = clahe(pattern.view(), 40, TILE_GRID);

        let out_min = *enhanced.iter().min().unwrap();
        let out_max = *enhanced.iter().max().unwrap();
        assert!(
            out_max - out_min > 31,
            "dynamic range did not expand: {}..{}",
            out_min,
            out_max
        );
    }

    #[test]
    fn test_auto_enhance_shape_and_determinism() {
        let pattern = random_pattern(64, 64, 7);
        let a = auto_enhance(pattern.view()).unwrap();
        let b = auto_enhance(pattern.view()).unwrap();
        assert_eq!(a.dim(), (64, 64));
        assert_eq!(a, b);
    }

    #[test]
    fn test_auto_enhance_zero_mean_is_degenerate() {
        let pattern = Array2::<u8>::zeros((8, 8));
        let result = auto_enhance(pattern.view());
        assert!(matches!(result, Err(Error::DegenerateInput)));
    }

    #[test]
    fn test_auto_enhance_rejects_tiny_patterns() {
        let pattern = Array2::from_elem((3, 3), 50u8);
        let result = auto_enhance(pattern.view());
        assert!(matches!(result, Err(Error::InvalidShape { .. })));
    }

    #[test]
    fn test_auto_enhance_uniform_input_uniform_output() {
        let pattern = Array2::from_elem((8, 8), 10u8);
        let enhanced = auto_enhance(pattern.view()).unwrap();
        let first = enhanced[[0, 0]];
        assert!(enhanced.iter().all(|&v| v == first));
    }
}
