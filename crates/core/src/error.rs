//! Error types for the geofence cache.

use thiserror::Error;

/// Errors produced by the cache and its store adapters.
#[derive(Error, Debug)]
pub enum GeoborderError {
    /// The backing store could not be reached or the fetch failed.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A fetched record's geometry or bounding-box payload could not be
    /// decoded.
    #[error("corrupt geofence data: {0}")]
    DataCorrupt(String),

    /// An operation was issued against a cache that has not completed a
    /// successful load.
    #[error("invalid cache state: {0}")]
    InvalidState(String),

    /// A caller supplied an unusable argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, GeoborderError>;
