//! Error types for the compact map.

use std::collections::TryReserveError;

use thiserror::Error;

/// Error variants for map operations.
#[derive(Debug, Error)]
pub enum Error {
    /// A raw key was outside `[0, 64)`.
    ///
    /// Carried as `i128` so both unsigned and negative signed inputs are
    /// reported exactly as the caller supplied them.
    #[error("key out of range: {0} (keys must be in 0..64)")]
    KeyOutOfRange(i128),

    /// An insert value is wider than the 32 bits an action stream can carry.
    #[error("value too wide to encode: {0} (stream values are at most 32 bits)")]
    ValueTooWide(u64),

    /// Growing the packed value storage failed.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(#[from] TryReserveError),
}

/// A specialized Result type for map operations.
pub type Result<T> = std::result::Result<T, Error>;
