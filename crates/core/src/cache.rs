//! The in-memory geofence cache.
//!
//! Owns the authoritative polygon-id map, the geofence-id reverse map, and
//! the spatial index as one logical unit behind a single reader-writer
//! lock. Many point queries run concurrently under the shared lock; the
//! periodic refresh takes the exclusive lock only around its merge step,
//! after fetching from the store outside the lock.

use std::sync::Arc;

use geo::Point;
use geoborder_types::{GeofenceMatch, GeofenceRecord};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::error::{GeoborderError, Result};
use crate::index::{IndexedBounds, SpatialIndex};
use crate::predicate::{distance_to_boundary, polygon_contains};
use crate::store::{GeofenceStore, record_from_payload};

struct CacheInner {
    /// Authoritative records, keyed by polygon id.
    records: FxHashMap<u64, GeofenceRecord>,
    /// geofence id -> ids of its constituent polygons.
    geofence_polygons: FxHashMap<u64, Vec<u64>>,
    /// Bounding-box index over everything in `records`.
    index: SpatialIndex,
    /// Set by the first successful load; queries fail until then.
    loaded: bool,
}

impl CacheInner {
    fn empty() -> Self {
        Self {
            records: FxHashMap::default(),
            geofence_polygons: FxHashMap::default(),
            index: SpatialIndex::new(),
            loaded: false,
        }
    }
}

/// Read-heavy geofence cache over an injected backing store.
///
/// Construct one per process and share it as an `Arc<GeoCache>`; queries
/// take a shared lock, [`GeoCache::load`] and [`GeoCache::update`] take
/// the exclusive lock only while swapping or merging state.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use geo::{Point, polygon};
/// use geoborder::{GeoCache, MemoryStore};
/// use geoborder_types::GeofencePayload;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), geoborder::GeoborderError> {
/// let ring = polygon![
///     (x: 0.0, y: 0.0), (x: 0.0, y: 1.0), (x: 1.0, y: 1.0),
///     (x: 1.0, y: 0.0), (x: 0.0, y: 0.0),
/// ];
/// let store = MemoryStore::with_payloads([GeofencePayload {
///     polygon_id: 1,
///     geofence_id: 10,
///     title: "home".into(),
///     user_id: 42,
///     geometry_full: ring.clone(),
///     geometry_simplified: ring,
/// }]);
///
/// let cache = GeoCache::new(Arc::new(store));
/// cache.load().await?;
///
/// let hits = cache.find_geofences_at(&Point::new(0.5, 0.5), None, false)?;
/// assert_eq!(hits[0].geofence_id, 10);
/// # Ok(())
/// # }
/// ```
pub struct GeoCache {
    store: Arc<dyn GeofenceStore>,
    inner: RwLock<CacheInner>,
}

impl GeoCache {
    /// Create an empty, unloaded cache over the given store.
    pub fn new(store: Arc<dyn GeofenceStore>) -> Self {
        Self {
            store,
            inner: RwLock::new(CacheInner::empty()),
        }
    }

    /// Fetch the complete geometry set and rebuild all in-memory state.
    ///
    /// The fetch and the index build happen outside the lock; readers only
    /// block for the final wholesale swap. Returns the number of polygons
    /// indexed. On failure the previous state, if any, is left untouched
    /// and must not be served until a load succeeds.
    pub async fn load(&self) -> Result<usize> {
        let payloads = self.store.fetch_full_geometry().await?;

        let mut records = FxHashMap::default();
        let mut geofence_polygons: FxHashMap<u64, Vec<u64>> = FxHashMap::default();
        let mut entries = Vec::with_capacity(payloads.len());

        for (polygon_id, payload) in payloads {
            let record = match record_from_payload(payload) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("skipping polygon {polygon_id}: {err}");
                    continue;
                }
            };
            entries.push(IndexedBounds::from_record(&record));
            geofence_polygons
                .entry(record.geofence_id)
                .or_default()
                .push(record.polygon_id);
            records.insert(record.polygon_id, record);
        }

        let index = SpatialIndex::bulk_load(entries);
        let count = index.size();

        let mut inner = self.inner.write();
        inner.records = records;
        inner.geofence_polygons = geofence_polygons;
        inner.index = index;
        inner.loaded = true;
        drop(inner);

        log::debug!("loaded {count} geofence polygons");
        Ok(count)
    }

    /// Pull records the cache does not know yet and merge them in.
    ///
    /// Append-only catch-up: existing records are never modified or
    /// removed. A failed fetch leaves the cache exactly as it was; the
    /// caller keeps serving last-known-good data. Returns the number of
    /// newly added polygons, 0 meaning "nothing new".
    pub async fn update(&self) -> Result<usize> {
        let known: Vec<u64> = {
            let inner = self.inner.read();
            if !inner.loaded {
                return Err(unloaded());
            }
            inner.records.keys().copied().collect()
        };

        // Store I/O happens with no lock held; a slow fetch must not
        // stall readers.
        let payloads = self.store.fetch_missing(&known).await?;
        if payloads.is_empty() {
            return Ok(0);
        }

        let mut additions = Vec::with_capacity(payloads.len());
        for (polygon_id, payload) in payloads {
            match record_from_payload(payload) {
                Ok(record) => additions.push(record),
                Err(err) => log::warn!("skipping polygon {polygon_id}: {err}"),
            }
        }

        let mut inner = self.inner.write();
        let mut added = 0;
        for record in additions {
            if inner.records.contains_key(&record.polygon_id) {
                continue;
            }
            inner.index.insert(IndexedBounds::from_record(&record));
            let polygon_ids = inner.geofence_polygons.entry(record.geofence_id).or_default();
            if !polygon_ids.contains(&record.polygon_id) {
                polygon_ids.push(record.polygon_id);
            }
            inner.records.insert(record.polygon_id, record);
            added += 1;
        }
        drop(inner);

        log::debug!("merged {added} new geofence polygons");
        Ok(added)
    }

    /// Find every geofence polygon containing the point.
    ///
    /// Two phases: a coarse bounding-box intersect query over the spatial
    /// index using the epsilon-expanded point box, then an exact
    /// containment test per candidate. With `user_filter` set, candidates
    /// belonging to a different user are excluded before the exact test
    /// (the geofence belongs to the user, not the point). With
    /// `with_distance` set, the boundary distance is computed for
    /// confirmed matches only.
    ///
    /// An empty result is a normal outcome, not an error.
    pub fn find_geofences_at(
        &self,
        point: &Point,
        user_filter: Option<u64>,
        with_distance: bool,
    ) -> Result<Vec<GeofenceMatch>> {
        let inner = self.inner.read();
        if !inner.loaded {
            return Err(unloaded());
        }

        let query_box = SpatialIndex::point_query_box(point);
        let candidates = inner.index.search_intersecting(&query_box);

        let mut matches = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let Some(record) = inner.records.get(&candidate.polygon_id) else {
                continue;
            };
            if let Some(user_id) = user_filter
                && record.user_id != user_id
            {
                continue;
            }
            if !polygon_contains(&record.geometry, point) {
                continue;
            }

            let mut hit = candidate.to_match();
            if with_distance
                && let Some((_, meters)) = distance_to_boundary(&record.geometry, point)
            {
                hit.distance = meters;
            }
            matches.push(hit);
        }

        Ok(matches)
    }

    /// Test the point against explicitly named geofences.
    ///
    /// Resolves each geofence id to its constituent polygons through the
    /// reverse map and runs the containment test directly, bypassing the
    /// spatial index entirely. Unknown geofence ids contribute nothing.
    /// Distance is never computed here.
    pub fn check_geofences_at(&self, point: &Point, geofence_ids: &[u64]) -> Result<Vec<GeofenceMatch>> {
        let inner = self.inner.read();
        if !inner.loaded {
            return Err(unloaded());
        }

        let mut matches = Vec::new();
        for geofence_id in geofence_ids {
            let Some(polygon_ids) = inner.geofence_polygons.get(geofence_id) else {
                continue;
            };
            for polygon_id in polygon_ids {
                let Some(record) = inner.records.get(polygon_id) else {
                    continue;
                };
                if polygon_contains(&record.geometry, point) {
                    matches.push(record.to_match());
                }
            }
        }

        Ok(matches)
    }

    /// Find containing geofences with boundary distances, no user filter.
    pub fn distance_to_geofences(&self, point: &Point) -> Result<Vec<GeofenceMatch>> {
        self.find_geofences_at(point, None, true)
    }

    /// Number of indexed polygons.
    pub fn size(&self) -> usize {
        self.inner.read().index.size()
    }

    /// Whether a load has completed successfully.
    pub fn is_loaded(&self) -> bool {
        self.inner.read().loaded
    }
}

fn unloaded() -> GeoborderError {
    GeoborderError::InvalidState("cache has not been loaded".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use geo::{Polygon, polygon};
    use geoborder_types::GeofencePayload;
    use std::collections::HashMap;

    // Fixtures mirror two production geofences: the Rostov-on-Don city
    // polygon and the Moscow polygon whose simplification collapses to a
    // triangle.

    fn rostov_simplified() -> Polygon {
        polygon![
            (x: 39.593353, y: 47.318345),
            (x: 39.943542, y: 47.322069),
            (x: 39.881744, y: 47.174778),
            (x: 39.571381, y: 47.173845),
            (x: 39.593353, y: 47.318345),
        ]
    }

    fn rostov_payload() -> GeofencePayload {
        GeofencePayload {
            polygon_id: 7452,
            geofence_id: 221,
            title: "Rostov-on-Don".to_string(),
            user_id: 22217,
            geometry_full: rostov_simplified(),
            geometry_simplified: rostov_simplified(),
        }
    }

    fn moscow_full() -> Polygon {
        polygon![
            (x: 37.308213, y: 55.770701),
            (x: 37.310755, y: 55.775369),
            (x: 37.322191, y: 55.776973),
            (x: 37.328227, y: 55.781203),
            (x: 37.31266, y: 55.786308),
            (x: 37.31139, y: 55.79258),
            (x: 37.322826, y: 55.800893),
            (x: 37.333311, y: 55.79958),
            (x: 37.347924, y: 55.806873),
            (x: 37.354595, y: 55.804831),
            (x: 37.352053, y: 55.797101),
            (x: 37.357772, y: 55.792725),
            (x: 37.367938, y: 55.789954),
            (x: 37.352689, y: 55.777848),
            (x: 37.352371, y: 55.774348),
            (x: 37.344429, y: 55.76866),
            (x: 37.320285, y: 55.767055),
            (x: 37.318696, y: 55.769535),
            (x: 37.308213, y: 55.770701),
        ]
    }

    fn moscow_triangle() -> Polygon {
        polygon![
            (x: 37.308213, y: 55.770701),
            (x: 37.322826, y: 55.800893),
            (x: 37.367938, y: 55.789954),
            (x: 37.308213, y: 55.770701),
        ]
    }

    fn moscow_payload() -> GeofencePayload {
        GeofencePayload {
            polygon_id: 3734,
            geofence_id: 50,
            title: "Moscow".to_string(),
            user_id: 0,
            geometry_full: moscow_full(),
            geometry_simplified: moscow_triangle(),
        }
    }

    fn rostov_point() -> Point {
        Point::new(39.70151, 47.23571)
    }

    async fn loaded_cache() -> GeoCache {
        let store = MemoryStore::with_payloads([rostov_payload(), moscow_payload()]);
        let cache = GeoCache::new(Arc::new(store));
        cache.load().await.unwrap();
        cache
    }

    #[tokio::test]
    async fn test_query_before_load_fails() {
        let cache = GeoCache::new(Arc::new(MemoryStore::new()));
        assert!(matches!(
            cache.find_geofences_at(&rostov_point(), None, false),
            Err(GeoborderError::InvalidState(_))
        ));
        assert!(matches!(
            cache.check_geofences_at(&rostov_point(), &[221]),
            Err(GeoborderError::InvalidState(_))
        ));
    }

    #[tokio::test]
    async fn test_find_point_inside_polygon() {
        let cache = loaded_cache().await;
        let hits = cache.find_geofences_at(&rostov_point(), None, false).unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].polygon_id, 7452);
        assert_eq!(hits[0].geofence_id, 221);
        assert_eq!(hits[0].title, "Rostov-on-Don");
        assert_eq!(hits[0].distance, 0.0);
    }

    #[tokio::test]
    async fn test_find_point_outside_everything() {
        let cache = loaded_cache().await;
        let hits = cache
            .find_geofences_at(&Point::new(0.0, 0.0), None, false)
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_find_with_distance() {
        let cache = loaded_cache().await;
        let hits = cache.find_geofences_at(&rostov_point(), None, true).unwrap();

        assert_eq!(hits.len(), 1);
        assert!(
            (11_000.0..13_000.0).contains(&hits[0].distance),
            "unexpected distance: {}",
            hits[0].distance
        );

        let via_wrapper = cache.distance_to_geofences(&rostov_point()).unwrap();
        assert_eq!(via_wrapper, hits);
    }

    #[tokio::test]
    async fn test_user_filter_excludes_other_users() {
        let cache = loaded_cache().await;

        let owner = cache
            .find_geofences_at(&rostov_point(), Some(22217), false)
            .unwrap();
        assert_eq!(owner.len(), 1);

        let stranger = cache
            .find_geofences_at(&rostov_point(), Some(9999), false)
            .unwrap();
        assert!(stranger.is_empty());
    }

    #[tokio::test]
    async fn test_exact_matches_are_subset_of_coarse_candidates() {
        let cache = loaded_cache().await;
        let point = rostov_point();

        let hits = cache.find_geofences_at(&point, None, false).unwrap();

        let inner = cache.inner.read();
        let coarse: Vec<u64> = inner
            .index
            .search_intersecting(&SpatialIndex::point_query_box(&point))
            .iter()
            .map(|e| e.polygon_id)
            .collect();

        for hit in &hits {
            assert!(coarse.contains(&hit.polygon_id));
        }
    }

    #[tokio::test]
    async fn test_check_named_geofences() {
        let cache = loaded_cache().await;

        // The point sits inside Rostov-on-Don (221) and outside Moscow (50).
        let hits = cache.check_geofences_at(&rostov_point(), &[221, 50]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].geofence_id, 221);
        assert_eq!(hits[0].title, "Rostov-on-Don");
        assert_eq!(hits[0].distance, 0.0);

        let unknown = cache.check_geofences_at(&rostov_point(), &[404]).unwrap();
        assert!(unknown.is_empty());
    }

    #[tokio::test]
    async fn test_degenerate_simplification_uses_full_geometry() {
        let cache = loaded_cache().await;

        // Inside Moscow's full polygon but outside the collapsed triangle
        // its simplification produced. The containment test must run
        // against the full geometry.
        let point = Point::new(37.345, 55.803);
        let hits = cache.check_geofences_at(&point, &[50]).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].polygon_id, 3734);
    }

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let cache = loaded_cache().await;
        let first = cache.size();

        let reloaded = cache.load().await.unwrap();
        assert_eq!(reloaded, first);
        assert_eq!(cache.size(), first);

        let hits = cache.find_geofences_at(&rostov_point(), None, false).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_update_is_additive() {
        let store = Arc::new(MemoryStore::with_payloads([rostov_payload()]));
        let cache = GeoCache::new(store.clone());
        cache.load().await.unwrap();
        assert_eq!(cache.size(), 1);

        // Nothing new yet.
        assert_eq!(cache.update().await.unwrap(), 0);
        assert_eq!(cache.size(), 1);

        store.seed([moscow_payload()]);
        assert_eq!(cache.update().await.unwrap(), 1);
        assert_eq!(cache.size(), 2);

        // Unchanged store: immediately repeating stays at zero.
        assert_eq!(cache.update().await.unwrap(), 0);
        assert_eq!(cache.size(), 2);

        // The merged record answers queries.
        let hits = cache
            .check_geofences_at(&Point::new(37.345, 55.803), &[50])
            .unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_update_does_not_duplicate_reverse_map() {
        let store = Arc::new(MemoryStore::with_payloads([rostov_payload()]));
        let cache = GeoCache::new(store.clone());
        cache.load().await.unwrap();

        store.seed([moscow_payload()]);
        cache.update().await.unwrap();
        cache.update().await.unwrap();

        let inner = cache.inner.read();
        assert_eq!(inner.geofence_polygons[&50], vec![3734]);
        assert_eq!(inner.geofence_polygons[&221], vec![7452]);
    }

    #[tokio::test]
    async fn test_corrupt_rows_are_skipped_not_fatal() {
        let mut broken = rostov_payload();
        broken.polygon_id = 9000;
        broken.geometry_full = Polygon::new(geo::LineString::new(vec![]), vec![]);

        let store = MemoryStore::with_payloads([rostov_payload(), broken]);
        let cache = GeoCache::new(Arc::new(store));

        // The bad row is dropped with a warning; the good one loads.
        assert_eq!(cache.load().await.unwrap(), 1);
        let hits = cache.find_geofences_at(&rostov_point(), None, false).unwrap();
        assert_eq!(hits.len(), 1);
    }

    struct FailingStore;

    #[async_trait]
    impl GeofenceStore for FailingStore {
        async fn fetch_full_geometry(&self) -> Result<HashMap<u64, GeofencePayload>> {
            Err(GeoborderError::StoreUnavailable("connection refused".to_string()))
        }

        async fn fetch_missing(&self, _known: &[u64]) -> Result<HashMap<u64, GeofencePayload>> {
            Err(GeoborderError::StoreUnavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_load_failure_leaves_cache_unready() {
        let cache = GeoCache::new(Arc::new(FailingStore));
        assert!(matches!(
            cache.load().await,
            Err(GeoborderError::StoreUnavailable(_))
        ));
        assert!(!cache.is_loaded());
        assert!(cache.find_geofences_at(&rostov_point(), None, false).is_err());
    }

    /// A store whose fetches can be made to fail after a successful load.
    struct FlakyStore {
        inner: MemoryStore,
        fail: std::sync::atomic::AtomicBool,
    }

    #[async_trait]
    impl GeofenceStore for FlakyStore {
        async fn fetch_full_geometry(&self) -> Result<HashMap<u64, GeofencePayload>> {
            self.inner.fetch_full_geometry().await
        }

        async fn fetch_missing(&self, known: &[u64]) -> Result<HashMap<u64, GeofencePayload>> {
            if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
                return Err(GeoborderError::StoreUnavailable("timeout".to_string()));
            }
            self.inner.fetch_missing(known).await
        }
    }

    #[tokio::test]
    async fn test_update_failure_keeps_serving_stale_data() {
        let store = Arc::new(FlakyStore {
            inner: MemoryStore::with_payloads([rostov_payload()]),
            fail: std::sync::atomic::AtomicBool::new(true),
        });
        let cache = GeoCache::new(store.clone());
        cache.load().await.unwrap();

        assert!(cache.update().await.is_err());

        // Last-known-good data still answers queries.
        let hits = cache.find_geofences_at(&rostov_point(), None, false).unwrap();
        assert_eq!(hits.len(), 1);

        // The next cycle proceeds normally once the store recovers.
        store.fail.store(false, std::sync::atomic::Ordering::SeqCst);
        assert_eq!(cache.update().await.unwrap(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_queries_during_refresh() {
        let store = Arc::new(MemoryStore::with_payloads([rostov_payload()]));
        let cache = Arc::new(GeoCache::new(store.clone()));
        cache.load().await.unwrap();

        store.seed([moscow_payload()]);

        let mut readers = Vec::new();
        for _ in 0..4 {
            let cache = cache.clone();
            readers.push(tokio::spawn(async move {
                for _ in 0..200 {
                    // Readers observe either the pre- or post-merge state,
                    // never a torn one: the Rostov hit is always there.
                    let hits = cache.find_geofences_at(&rostov_point(), None, false).unwrap();
                    assert_eq!(hits.len(), 1);
                    let size = cache.size();
                    assert!(size == 1 || size == 2);
                }
            }));
        }

        let writer = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.update().await.unwrap() })
        };

        for reader in readers {
            reader.await.unwrap();
        }
        assert_eq!(writer.await.unwrap(), 1);
        assert_eq!(cache.size(), 2);
    }
}
