//! Geoborder Server
//!
//! RPC server for the geoborder geofence lookup service: answers "which
//! geofences contain point P?" against an in-memory cache refreshed from
//! the backing store in the background.
//!
//! # Example
//!
//! ```ignore
//! use geoborder_server::{run_server, spawn_refresh};
//!
//! let refresh = spawn_refresh(cache.clone(), interval);
//! run_server(listener, cache, shutdown).await?;
//! refresh.abort();
//! ```

pub mod handler;
pub mod protocol;
pub mod refresh;
pub mod transport;

// Re-export protocol types for client usage
pub use protocol::{
    CacheStats, GeofenceInfo, GeofenceService, GeofenceServiceClient, PointMatches, QueryPoint,
};

pub use refresh::{DEFAULT_REFRESH_INTERVAL, spawn_refresh};

// Re-export default transport for convenience
pub use transport::rpc::run_server;
