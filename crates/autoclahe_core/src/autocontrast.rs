//! Global percentile-clipped contrast stretching.
//!
//! Stretches the intensity histogram of a pattern so the darkest and
//! brightest `cutoff` percent of pixels are clipped to the extremes and the
//! surviving range is linearly rescaled to fill 0-255. A flat pattern (or one
//! whose histogram collapses after clipping) is returned unchanged.

use ndarray::{Array2, ArrayView2};

/// Number of histogram bins for 8-bit data.
const HIST_BINS: usize = 256;

/// Fraction of pixels clipped from each end of the histogram, in percent,
/// when stretching patterns for bright-field reduction.
pub const DEFAULT_CUTOFF_PERCENT: f64 = 1.0;

/// Stretch the histogram of an 8-bit pattern, clipping `cutoff_percent` of the
/// pixel population from each end before rescaling.
///
/// The mapping is a monotonic 256-entry lookup table; pixel ordering is
/// preserved. With `cutoff_percent = 0.0` this is a plain min/max stretch.
pub fn autocontrast(pattern: ArrayView2<u8>, cutoff_percent: f64) -> Array2<u8> {
    let n = pattern.len();
    if n == 0 {
        return pattern.to_owned();
    }

    let mut hist = [0u64; HIST_BINS];
    for &v in pattern.iter() {
        hist[v as usize] += 1;
    }

    // Remove `cut` pixels from each end of the histogram.
    let cut = (n as f64 * cutoff_percent / 100.0).floor() as u64;

    let mut remaining = cut;
    for bin in hist.iter_mut() {
        if remaining >= *bin {
            remaining -= *bin;
            *bin = 0;
        } else {
            *bin -= remaining;
            break;
        }
        if remaining == 0 {
            break;
        }
    }

    let mut remaining = cut;
    for bin in hist.iter_mut().rev() {
        if remaining >= *bin {
            remaining -= *bin;
            *bin = 0;
        } else {
            *bin -= remaining;
            break;
        }
        if remaining == 0 {
            break;
        }
    }

    let lo = hist.iter().position(|&c| c > 0);
    let hi = hist.iter().rposition(|&c| c > 0);

    let (lo, hi) = match (lo, hi) {
        (Some(lo), Some(hi)) if hi > lo => (lo, hi),
        // Flat pattern or fully clipped histogram: no dynamic range to
        // stretch, identity mapping.
        _ => return pattern.to_owned(),
    };

    let scale = 255.0 / (hi - lo) as f64;
    let mut lut = [0u8; HIST_BINS];
    for (v, entry) in lut.iter_mut().enumerate() {
        // Fractional levels truncate rather than round.
        let stretched = (v as f64 - lo as f64) * scale;
        *entry = stretched.clamp(0.0, 255.0) as u8;
    }

    pattern.mapv(|v| lut[v as usize])
}
