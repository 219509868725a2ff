//! Error values reported by the map.

use std::collections::TryReserveError;
use thiserror::Error;

/// Failures surfaced by [`HMap`](crate::HMap) operations.
///
/// An absent key is never an error; lookups and deletes report it as `None`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MapError {
    /// A slot array could not be allocated. The map is left as it was.
    #[error("slot array allocation failed: {0}")]
    AllocationFailure(#[from] TryReserveError),

    /// The requested capacity is zero or not a power of two.
    #[error("invalid capacity {requested}: must be a non-zero power of two")]
    InvalidCapacity { requested: usize },

    /// A tuning value in [`Config`](crate::Config) is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}
