//! Error types for kernel operations.

use std::collections::TryReserveError;
use thiserror::Error;

/// Error type for kernel operations.
///
/// Precondition violations (`LengthMismatch`, `EmptyInput`) are detected
/// before any partition is dispatched. `Allocation` may also surface at the
/// join barrier, from a partition that failed to grow its local buffer; the
/// call fails as a whole either way.
#[derive(Error, Debug)]
pub enum Error {
    #[error("input shorter than required: {got} < {needed}")]
    LengthMismatch { needed: usize, got: usize }, // required, found
    #[error("empty input")]
    EmptyInput,
    #[error("allocation failed: {0}")]
    Allocation(#[from] TryReserveError),
}
