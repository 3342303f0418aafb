//! Error taxonomy for dataset reduction and batch filtering.

use thiserror::Error;

/// Errors reported by the reduction and filtering operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Dataset or pattern dimensions are degenerate. Raised before any work
    /// is scheduled.
    #[error("invalid pattern shape {rows}x{cols}: {reason}")]
    InvalidShape {
        rows: usize,
        cols: usize,
        reason: &'static str,
    },

    /// A pattern has zero mean intensity, so the adaptive clip limit
    /// (`10 / mean`) is undefined.
    #[error("pattern has zero mean intensity; adaptive clip limit is undefined")]
    DegenerateInput,

    /// Unexpected failure inside a parallel unit of work, e.g. a filter
    /// returning a pattern of the wrong shape. Isolated to one pattern.
    #[error("worker failure: {reason}")]
    WorkerFailure { reason: String },

    /// Batch-level wrapper associating a per-pattern failure with its
    /// linear submission index and scan coordinates.
    #[error("pattern at linear index {index} (scan y={scan_y}, x={scan_x}) failed")]
    PatternFailed {
        index: usize,
        scan_y: usize,
        scan_x: usize,
        #[source]
        source: Box<Error>,
    },

    /// The batch was cancelled before completion. Partial results are
    /// discarded, never returned as if complete.
    #[error("batch filtering was cancelled; partial results discarded")]
    Cancelled,
}
