//! Geoborder Client
//!
//! Native Rust client for the geoborder geofence lookup service.
//!
//! # Example
//!
//! ```ignore
//! use geoborder_client::GeoborderClient;
//!
//! let client = GeoborderClient::connect(addr).await?;
//! let matches = client.find_geofences(points, None, false).await?;
//! ```

pub mod transport;

// Re-export the default (RPC) client for convenience
pub use transport::rpc::{ClientError, GeoborderClient, Result};
