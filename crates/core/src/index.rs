//! Spatial index over geofence bounding boxes.
//!
//! This is the coarse half of the two-phase lookup: an R-tree holding one
//! axis-aligned bounding box per geofence polygon, answering "which boxes
//! intersect this query box" in O(log n + k) instead of a linear scan.
//! Exact containment against the polygon geometry is the second phase and
//! lives in [`crate::predicate`].
//!
//! The index stores boxes keyed by `polygon_id` and enforces no uniqueness
//! of its own; the cache is responsible for never inserting the same
//! polygon twice, otherwise searches return duplicates.

use geo::Point;
use geoborder_types::{BoundingBox, GeofenceMatch, GeofenceRecord};
use rstar::{AABB, RTree, RTreeObject};

/// Half-width in degrees of the query box built around a lookup point.
///
/// A point query expands to a box 0.001 degrees wide on each axis,
/// compensating for floating point noise at polygon borders. Tunable
/// constant, not derived from the data.
pub const POINT_QUERY_EPSILON: f64 = 0.0005;

/// One spatial-index entry: a polygon's bounding box plus the display
/// fields needed to report a match without touching the record map.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedBounds {
    pub polygon_id: u64,
    pub geofence_id: u64,
    pub user_id: u64,
    pub title: String,
    pub bounds: BoundingBox,
}

impl IndexedBounds {
    pub fn from_record(record: &GeofenceRecord) -> Self {
        Self {
            polygon_id: record.polygon_id,
            geofence_id: record.geofence_id,
            user_id: record.user_id,
            title: record.title.clone(),
            bounds: record.bounding_box,
        }
    }

    /// Build a match for this entry with no distance attached.
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

impl RTreeObject for IndexedBounds {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bounds.min_x(), self.bounds.min_y()],
            [self.bounds.max_x(), self.bounds.max_y()],
        )
    }
}

/// R-tree over geofence bounding boxes.
pub struct SpatialIndex {
    tree: RTree<IndexedBounds>,
}

impl SpatialIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Build a balanced index from a full entry set in one pass.
    ///
    /// Used on load; cheaper and better balanced than repeated inserts.
    pub fn bulk_load(entries: Vec<IndexedBounds>) -> Self {
        Self {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Add one entry. Node splits happen internally as needed.
    pub fn insert(&mut self, entry: IndexedBounds) {
        self.tree.insert(entry);
    }

    /// Number of stored entries.
    pub fn size(&self) -> usize {
        self.tree.size()
    }

    /// All entries whose bounding box intersects the query box.
    ///
    /// Result order is unspecified; callers must treat it as a set.
    pub fn search_intersecting(&self, query: &BoundingBox) -> Vec<&IndexedBounds> {
        if ![query.min_x(), query.min_y(), query.max_x(), query.max_y()]
            .iter()
            .all(|v| v.is_finite())
        {
            log::warn!("rejecting intersect query with non-finite coordinates");
            return Vec::new();
        }

        let envelope = AABB::from_corners(
            [query.min_x(), query.min_y()],
            [query.max_x(), query.max_y()],
        );
        self.tree.locate_in_envelope_intersecting(&envelope).collect()
    }

    /// The epsilon-expanded query box for a point lookup.
    pub fn point_query_box(point: &Point) -> BoundingBox {
        BoundingBox::around_point(point, POINT_QUERY_EPSILON)
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(polygon_id: u64, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> IndexedBounds {
        IndexedBounds {
            polygon_id,
            geofence_id: polygon_id * 10,
            user_id: 1,
            title: format!("zone-{polygon_id}"),
            bounds: BoundingBox::new(min_x, min_y, max_x, max_y),
        }
    }

    #[test]
    fn test_bulk_load_and_size() {
        let index = SpatialIndex::bulk_load(vec![
            entry(1, 0.0, 0.0, 1.0, 1.0),
            entry(2, 2.0, 2.0, 3.0, 3.0),
            entry(3, 10.0, 10.0, 11.0, 11.0),
        ]);
        assert_eq!(index.size(), 3);
    }

    #[test]
    fn test_insert_is_additive() {
        let mut index = SpatialIndex::new();
        assert_eq!(index.size(), 0);
        index.insert(entry(1, 0.0, 0.0, 1.0, 1.0));
        index.insert(entry(2, 5.0, 5.0, 6.0, 6.0));
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn test_search_intersecting() {
        let index = SpatialIndex::bulk_load(vec![
            entry(1, 0.0, 0.0, 1.0, 1.0),
            entry(2, 0.5, 0.5, 2.0, 2.0),
            entry(3, 10.0, 10.0, 11.0, 11.0),
        ]);

        let hits = index.search_intersecting(&BoundingBox::new(0.6, 0.6, 0.7, 0.7));
        let mut ids: Vec<u64> = hits.iter().map(|e| e.polygon_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);

        let misses = index.search_intersecting(&BoundingBox::new(20.0, 20.0, 21.0, 21.0));
        assert!(misses.is_empty());
    }

    #[test]
    fn test_point_query_box_hits_boundary_neighbors() {
        // A point sitting exactly on a box edge still finds the box thanks
        // to the epsilon expansion.
        let index = SpatialIndex::bulk_load(vec![entry(1, 0.0, 0.0, 1.0, 1.0)]);
        let query = SpatialIndex::point_query_box(&Point::new(1.0 + POINT_QUERY_EPSILON / 2.0, 0.5));
        assert_eq!(index.search_intersecting(&query).len(), 1);
    }

    #[test]
    fn test_non_finite_query_rejected() {
        let index = SpatialIndex::bulk_load(vec![entry(1, 0.0, 0.0, 1.0, 1.0)]);
        let query = BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0);
        assert!(index.search_intersecting(&query).is_empty());
    }
}
