//! Parallel per-pattern filtering with index-ordered reassembly.
//!
//! The scan grid is flattened to linear indices `i = y * scan_cols + x`, the
//! patterns are filtered independently on a fixed-size worker pool, and the
//! results are written back to `[i / scan_cols][i % scan_cols]`. Workers may
//! complete in any order; positional correctness of the output is guaranteed
//! by reassembling from the submission index, never from completion order.
//!
//! Each worker operates on an independently owned copy of its pattern, so no
//! aliasing exists between workers and the caller's buffer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use ndarray::{s, Array2, Array4, ArrayView2, ArrayView4};
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::clahe::auto_enhance;
use crate::error::Error;

/// What to do when a single pattern's filter fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Fail the whole batch, reporting the lowest failing linear index.
    /// No partially filtered dataset escapes. This is the default.
    #[default]
    Abort,
    /// Substitute an all-zero sentinel pattern at the failing index and
    /// continue; all skipped indices are reported in [`FilterOutcome`].
    SkipAndReport,
}

/// Options for a batch filtering run.
#[derive(Debug, Clone, Default)]
pub struct FilterOptions {
    /// Per-pattern failure handling. Default: [`FailurePolicy::Abort`].
    pub policy: FailurePolicy,
    /// Worker pool size override. `None` uses the available hardware
    /// parallelism (rayon's global pool).
    pub num_threads: Option<usize>,
    /// Cooperative cancellation flag. Raising it makes the batch return
    /// [`Error::Cancelled`] and discard all partial results.
    pub cancel_flag: Option<Arc<AtomicBool>>,
}

/// Result of a batch filtering run.
#[derive(Debug)]
pub struct FilterOutcome {
    /// Filtered dataset, same shape as the input. Positions listed in
    /// `skipped` hold the all-zero sentinel pattern.
    pub data: Array4<u8>,
    /// Linear indices of patterns skipped under
    /// [`FailurePolicy::SkipAndReport`], ascending. Empty under
    /// [`FailurePolicy::Abort`].
    pub skipped: Vec<usize>,
}

/// Filter every pattern of the dataset with the adaptive Auto-CLAHE kernel
/// under default options (abort on first failure).
///
/// See [`filter_all_with`] for the pluggable-filter and policy-aware variant.
pub fn filter_all(dataset: ArrayView4<u8>) -> Result<Array4<u8>, Error> {
    let outcome = filter_all_with(dataset, &auto_enhance, &FilterOptions::default())?;
    Ok(outcome.data)
}

/// Filter every pattern of the dataset with `filter`, in parallel, and
/// reassemble the results in exact scan order.
///
/// `filter` must be a pure function of its single input pattern; it receives
/// a view of an owned per-worker copy and must return a pattern of the same
/// shape. The output satisfies `out[[y, x]] == filter(in[[y, x]])` for every
/// scan position regardless of worker completion order.
///
/// # Errors
///
/// - [`Error::InvalidShape`] if patterns are empty, before any work is
///   scheduled.
/// - [`Error::PatternFailed`] under [`FailurePolicy::Abort`] when any
///   pattern fails, naming the lowest failing linear index.
/// - [`Error::Cancelled`] if the cancel flag was raised; partial results are
///   discarded.
pub fn filter_all_with<F>(
    dataset: ArrayView4<u8>,
    filter: &F,
    options: &FilterOptions,
) -> Result<FilterOutcome, Error>
where
    F: Fn(ArrayView2<u8>) -> Result<Array2<u8>, Error> + Sync,
{
    let (scan_rows, scan_cols, rows, cols) = dataset.dim();
    let total = scan_rows * scan_cols;

    if total == 0 {
        return Ok(FilterOutcome {
            data: Array4::zeros((scan_rows, scan_cols, rows, cols)),
            skipped: Vec::new(),
        });
    }
    if rows == 0 || cols == 0 {
        return Err(Error::InvalidShape {
            rows,
            cols,
            reason: "patterns must be non-empty",
        });
    }

    debug!(
        scan_rows,
        scan_cols,
        pattern_rows = rows,
        pattern_cols = cols,
        policy = ?options.policy,
        "starting batch filter"
    );

    let cancel_flag = options.cancel_flag.as_deref();
    let run = || -> Vec<Result<Array2<u8>, Error>> {
        (0..total)
            .into_par_iter()
            .map(|i| {
                if let Some(flag) = cancel_flag {
                    if flag.load(Ordering::Relaxed) {
                        return Err(Error::Cancelled);
                    }
                }

                let (y, x) = (i / scan_cols, i % scan_cols);
                // Independent copy per unit of work; the filter never sees
                // the caller's buffer.
                let pattern = dataset.slice(s![y, x, .., ..]).to_owned();
                let filtered = filter(pattern.view())?;
                if filtered.dim() != (rows, cols) {
                    return Err(Error::WorkerFailure {
                        reason: format!(
                            "filter produced shape {:?}, expected ({}, {})",
                            filtered.dim(),
                            rows,
                            cols
                        ),
                    });
                }
                Ok(filtered)
            })
            .collect()
    };

    // The indexed parallel map preserves submission order in the collected
    // vector even though workers complete out of order.
    let results = match options.num_threads {
        Some(n) => rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .build()
            .map_err(|e| Error::WorkerFailure {
                reason: format!("failed to build worker pool: {e}"),
            })?
            .install(run),
        None => run(),
    };

    if cancel_flag.is_some_and(|flag| flag.load(Ordering::Relaxed)) {
        return Err(Error::Cancelled);
    }

    // Reassemble by submission index: result `i` lands at
    // `[i / scan_cols][i % scan_cols]`, each index written exactly once.
    let mut data = Array4::<u8>::zeros((scan_rows, scan_cols, rows, cols));
    let mut skipped = Vec::new();
    for (i, result) in results.into_iter().enumerate() {
        let (y, x) = (i / scan_cols, i % scan_cols);
        match result {
            Ok(filtered) => data.slice_mut(s![y, x, .., ..]).assign(&filtered),
            Err(Error::Cancelled) => return Err(Error::Cancelled),
            Err(source) => match options.policy {
                FailurePolicy::Abort => {
                    return Err(Error::PatternFailed {
                        index: i,
                        scan_y: y,
                        scan_x: x,
                        source: Box::new(source),
                    });
                }
                FailurePolicy::SkipAndReport => {
                    warn!(
                        index = i,
                        scan_y = y,
                        scan_x = x,
                        error = %source,
                        "pattern failed; substituting zero sentinel"
                    );
                    skipped.push(i);
                }
            },
        }
    }

    info!(total, skipped = skipped.len(), "batch filter complete");
    Ok(FilterOutcome { data, skipped })
}
