//! # geoborder-types
//!
//! Core geometry and geofence record types for the geoborder service.
//!
//! This crate provides the value types shared by the cache core, the store
//! adapters, and the RPC surface:
//!
//! - **Bounding boxes**: [`BoundingBox`], an axis-aligned rectangle derived
//!   from a polygon's full geometry
//! - **Geofence records**: [`GeofenceRecord`] (the authoritative in-memory
//!   record), [`GeofenceMatch`] (a confirmed query hit), and
//!   [`GeofencePayload`] (the shape produced by a store adapter)
//!
//! All types are serializable with Serde and built on top of the `geo`
//! crate's geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use geoborder_types::BoundingBox;
//! use geo::Point;
//!
//! let rostov = BoundingBox::new(39.571381, 47.173845, 39.943542, 47.322069);
//! assert!(rostov.contains_point(&Point::new(39.70151, 47.23571)));
//! ```

pub mod bbox;
pub mod record;

pub use bbox::BoundingBox;
pub use record::{GeofenceMatch, GeofencePayload, GeofenceRecord};

pub use geo::{Point, Polygon};
