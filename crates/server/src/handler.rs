//! Handler implementation for the geoborder RPC service.

use std::sync::Arc;

use geoborder::{GeoCache, GeofenceMatch, Point};
use tarpc::context;

use crate::protocol::{CacheStats, GeofenceService, PointMatches, QueryPoint};

#[derive(Clone)]
pub struct Handler {
    cache: Arc<GeoCache>,
}

impl Handler {
    pub fn new(cache: Arc<GeoCache>) -> Self {
        Self { cache }
    }

    fn per_point<F>(&self, points: Vec<QueryPoint>, lookup: F) -> Result<Vec<PointMatches>, String>
    where
        F: Fn(&GeoCache, &Point) -> geoborder::Result<Vec<GeofenceMatch>>,
    {
        let mut results = Vec::with_capacity(points.len());
        for query in points {
            let point = Point::new(query.longitude, query.latitude);
            let matches = lookup(&self.cache, &point).map_err(|err| err.to_string())?;
            results.push(PointMatches {
                point_id: query.point_id,
                matches: matches.into_iter().map(Into::into).collect(),
            });
        }
        Ok(results)
    }
}

impl GeofenceService for Handler {
    async fn find_geofences(
        self,
        _: context::Context,
        points: Vec<QueryPoint>,
        user_id: Option<u64>,
        with_distance: bool,
    ) -> Result<Vec<PointMatches>, String> {
        self.per_point(points, |cache, point| {
            cache.find_geofences_at(point, user_id, with_distance)
        })
    }

    async fn check_geofences(
        self,
        _: context::Context,
        points: Vec<QueryPoint>,
        geofence_ids: Vec<u64>,
    ) -> Result<Vec<PointMatches>, String> {
        self.per_point(points, |cache, point| {
            cache.check_geofences_at(point, &geofence_ids)
        })
    }

    async fn distance_to_geofences(
        self,
        _: context::Context,
        points: Vec<QueryPoint>,
    ) -> Result<Vec<PointMatches>, String> {
        self.per_point(points, |cache, point| cache.distance_to_geofences(point))
    }

    async fn stats(self, _: context::Context) -> CacheStats {
        CacheStats {
            polygon_count: self.cache.size(),
            loaded: self.cache.is_loaded(),
        }
    }
}
