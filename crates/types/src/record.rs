use geo::Polygon;
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;

/// A confirmed geofence hit for a query point.
///
/// One geofence (`geofence_id`) may be described by several polygons, each
/// with its own `polygon_id`; a match always names the concrete polygon
/// that contained the point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceMatch {
    pub polygon_id: u64,
    pub geofence_id: u64,
    pub user_id: u64,
    pub title: String,
    /// Distance in meters to the polygon boundary. Only computed when the
    /// caller asked for it; 0.0 otherwise.
    pub distance: f64,
}

/// The authoritative in-memory record for one geofence polygon.
///
/// `geometry` is the polygon used for exact containment tests: the
/// simplified geometry when usable, or the full geometry when
/// simplification collapsed the outer ring. `bounding_box` is always
/// derived from the full geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofenceRecord {
    pub polygon_id: u64,
    pub geofence_id: u64,
    pub title: String,
    pub user_id: u64,
    pub geometry: Polygon,
    pub bounding_box: BoundingBox,
}

impl GeofenceRecord {
    /// Build a match for this record with no distance attached.
    pub fn to_match(&self) -> GeofenceMatch {
        GeofenceMatch {
            polygon_id: self.polygon_id,
            geofence_id: self.geofence_id,
            user_id: self.user_id,
            title: self.title.clone(),
            distance: 0.0,
        }
    }
}

/// A geofence polygon as fetched from a backing store, before load-time
/// normalization.
///
/// Store adapters return both geometries; the cache decides which one is
/// authoritative for containment tests exactly once, at load time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeofencePayload {
    pub polygon_id: u64,
    pub geofence_id: u64,
    pub title: String,
    pub user_id: u64,
    pub geometry_full: Polygon,
    pub geometry_simplified: Polygon,
}
