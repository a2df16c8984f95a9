//! Exact geometric predicates for the second query phase.
//!
//! Candidates that survive bounding-box pruning are tested here against
//! the polygon geometry itself.

use geo::{Contains, Distance, Haversine, Point, Polygon};

/// Exact point-in-polygon containment test over the outer ring.
///
/// Points exactly on an edge resolve however `geo` resolves them; callers
/// must not depend on boundary-exact behavior.
pub fn polygon_contains(polygon: &Polygon, point: &Point) -> bool {
    polygon.contains(point)
}

/// Distance from a point to the polygon boundary, in meters.
///
/// Returns the index of the nearest outer-ring vertex and the Haversine
/// distance to that vertex, or `None` for a polygon with no coordinates.
///
/// The distance is measured to the nearest ring VERTEX, not to the
/// perpendicular projection onto the nearest segment. Downstream consumers
/// compare these values against historical output; replacing this with a
/// true point-to-segment distance would silently change every reported
/// distance. Do not "fix" it.
pub fn distance_to_boundary(polygon: &Polygon, point: &Point) -> Option<(usize, f64)> {
    let ring = polygon.exterior();
    if ring.0.is_empty() {
        return None;
    }

    let mut nearest: Option<(usize, f64)> = None;
    for (i, coord) in ring.0.iter().enumerate() {
        let meters = Haversine.distance(*point, Point::new(coord.x, coord.y));
        match nearest {
            Some((_, best)) if best <= meters => {}
            _ => nearest = Some((i, meters)),
        }
    }

    nearest
}
