//! Virtual bright-field reduction for 4D scanning-diffraction datasets.
//!
//! Each diffraction pattern is reduced to a single intensity value: the
//! pattern is contrast-stretched globally, a centered square window is
//! cropped, and the window mean becomes the navigation-image entry for that
//! scan position. Entries are inverted so high transmitted-beam intensity
//! renders dark, matching bright-field convention.

use ndarray::{s, Array2, ArrayView4};
use tracing::debug;

use crate::autocontrast::{autocontrast, DEFAULT_CUTOFF_PERCENT};
use crate::error::Error;

/// Centered crop window `[H/2 - side/2, H/2 + side/2)` with `side = H/2`.
/// The bounds are evaluated in floating point and truncated, so half-odd
/// bounds land one pixel wider than pure integer division would give.
fn crop_bounds(pattern_rows: usize) -> (usize, usize) {
    let half = pattern_rows as f64 / 2.0;
    let side = half;
    let lo = (half - side / 2.0) as usize;
    let hi = (half + side / 2.0) as usize;
    (lo, hi)
}

/// Reduce a 4D dataset to a 2D virtual bright-field navigation image.
///
/// For every scan position, the full pattern is contrast-stretched (darkest
/// and brightest 1% clipped, remainder rescaled to 0-255), a centered square
/// of side `H/2` is cropped, and the rounded window mean is stored. Once all
/// positions are processed every entry is inverted (`255 - value`).
///
/// The reduction is sequential over scan positions and deterministic.
///
/// # Errors
///
/// [`Error::InvalidShape`] if patterns are smaller than 2x2, or if the crop
/// window (derived from the pattern height) does not fit within the pattern
/// width. An empty scan grid returns an empty image without error.
pub fn reduce_to_bright_field(dataset: ArrayView4<u8>) -> Result<Array2<u8>, Error> {
    let (scan_rows, scan_cols, rows, cols) = dataset.dim();
    if scan_rows == 0 || scan_cols == 0 {
        return Ok(Array2::zeros((scan_rows, scan_cols)));
    }
    if rows < 2 || cols < 2 {
        return Err(Error::InvalidShape {
            rows,
            cols,
            reason: "patterns must be at least 2x2 for bright-field reduction",
        });
    }

    let (lo, hi) = crop_bounds(rows);
    if hi > cols {
        return Err(Error::InvalidShape {
            rows,
            cols,
            reason: "centered crop window exceeds the pattern width",
        });
    }

    debug!(
        scan_rows,
        scan_cols,
        pattern_rows = rows,
        pattern_cols = cols,
        window = hi - lo,
        "reducing dataset to virtual bright-field image"
    );

    let mut navigation = Array2::<u8>::zeros((scan_rows, scan_cols));
    for y in 0..scan_rows {
        for x in 0..scan_cols {
            let pattern = dataset.slice(s![y, x, .., ..]);

            // Stretch the full pattern before cropping; the crop then sees
            // the statistics of the whole image.
            let stretched = autocontrast(pattern, DEFAULT_CUTOFF_PERCENT);
            let window = stretched.slice(s![lo..hi, lo..hi]);

            let sum: u64 = window.iter().map(|&v| v as u64).sum();
            let mean = sum as f64 / window.len() as f64;
            navigation[[y, x]] = mean.round() as u8;
        }
    }

    // Bright-field convention: transmitted-beam-heavy positions render dark.
    navigation.mapv_inplace(|v| 255 - v);
    Ok(navigation)
}
