//! In-memory geofence cache: R-tree bounding-box pruning plus exact
//! polygon containment, refreshed from a pluggable backing store.
//!
//! ```rust
//! use std::sync::Arc;
//! use geo::{Point, polygon};
//! use geoborder::{GeoCache, MemoryStore};
//! use geoborder_types::GeofencePayload;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), geoborder::GeoborderError> {
//! let ring = polygon![
//!     (x: 39.593353, y: 47.318345), (x: 39.943542, y: 47.322069),
//!     (x: 39.881744, y: 47.174778), (x: 39.571381, y: 47.173845),
//!     (x: 39.593353, y: 47.318345),
//! ];
//! let store = MemoryStore::with_payloads([GeofencePayload {
//!     polygon_id: 7452,
//!     geofence_id: 221,
//!     title: "Rostov-on-Don".into(),
//!     user_id: 22217,
//!     geometry_full: ring.clone(),
//!     geometry_simplified: ring,
//! }]);
//!
//! let cache = GeoCache::new(Arc::new(store));
//! cache.load().await?;
//!
//! let hits = cache.find_geofences_at(&Point::new(39.70151, 47.23571), None, false)?;
//! assert_eq!(hits[0].title, "Rostov-on-Don");
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod error;
pub mod index;
pub mod predicate;
pub mod store;

pub use cache::GeoCache;
pub use error::{GeoborderError, Result};
pub use index::{IndexedBounds, POINT_QUERY_EPSILON, SpatialIndex};
pub use predicate::{distance_to_boundary, polygon_contains};
pub use store::{DEGENERATE_RING_COORDS, GeofenceStore, MemoryStore, record_from_payload};

pub use geo::{Point, Polygon};

pub use geoborder_types::{BoundingBox, GeofenceMatch, GeofencePayload, GeofenceRecord};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
