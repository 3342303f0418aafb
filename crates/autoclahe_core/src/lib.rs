//! Auto-CLAHE Core Algorithm Library
//!
//! Pure Rust implementation of the two core operations on 4D scanning-diffraction
//! (4D-STEM) datasets, indexed `[scan_y][scan_x][pixel_row][pixel_col]`:
//!
//! - Virtual bright-field reduction: collapse each diffraction pattern to a
//!   single intensity value, producing a 2D navigation image.
//! - Batch Auto-CLAHE filtering: apply contrast-limited adaptive histogram
//!   equalization with a data-derived clip limit to every pattern in parallel,
//!   reassembling the results into a dataset of identical shape.
//!
//! Dataset loading, display, and persistence are owned by the caller.

pub mod autocontrast;
pub mod batch;
pub mod bright_field;
pub mod clahe;
pub mod error;

// Re-export commonly used items at the crate root
pub use autocontrast::autocontrast;
pub use batch::{filter_all, filter_all_with, FailurePolicy, FilterOptions, FilterOutcome};
pub use bright_field::reduce_to_bright_field;
pub use clahe::{auto_enhance, clahe};
pub use error::Error;
