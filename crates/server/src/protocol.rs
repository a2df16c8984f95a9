//! Protocol definitions for the geoborder RPC service.
//!
//! This module contains the service trait and the wire types used for RPC
//! communication. Every operation takes one-or-many points and returns,
//! per point, the list of geofences that contained it.

use geoborder_types::GeofenceMatch;
use serde::{Deserialize, Serialize};

/// One query point with a caller-chosen correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryPoint {
    pub point_id: u64,
    pub longitude: f64,
    pub latitude: f64,
}

/// One confirmed geofence hit as reported over the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeofenceInfo {
    pub geofence_id: u64,
    pub polygon_id: u64,
    pub title: String,
    pub distance: f64,
}

impl From<GeofenceMatch> for GeofenceInfo {
    fn from(hit: GeofenceMatch) -> Self {
        Self {
            geofence_id: hit.geofence_id,
            polygon_id: hit.polygon_id,
            title: hit.title,
            distance: hit.distance,
        }
    }
}

/// All hits for one query point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointMatches {
    pub point_id: u64,
    pub matches: Vec<GeofenceInfo>,
}

/// Cache health counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub polygon_count: usize,
    pub loaded: bool,
}

#[tarpc::service]
pub trait GeofenceService {
    /// Spatial lookup: which geofences contain each point. With `user_id`
    /// set, only geofences belonging to that user are considered. With
    /// `with_distance` set, boundary distances are attached to matches.
    async fn find_geofences(
        points: Vec<QueryPoint>,
        user_id: Option<u64>,
        with_distance: bool,
    ) -> Result<Vec<PointMatches>, String>;

    /// Targeted check of each point against explicitly named geofences.
    async fn check_geofences(
        points: Vec<QueryPoint>,
        geofence_ids: Vec<u64>,
    ) -> Result<Vec<PointMatches>, String>;

    /// Spatial lookup with boundary distances, no user filter.
    async fn distance_to_geofences(points: Vec<QueryPoint>) -> Result<Vec<PointMatches>, String>;

    async fn stats() -> CacheStats;
}
