use geo::{BoundingRect, Point, Polygon, Rect};
use serde::{Deserialize, Serialize};

/// A 2D axis-aligned bounding box.
///
/// Represents the rectangular area enclosing a geofence polygon, defined by
/// minimum and maximum coordinates. This is a wrapper around `geo::Rect`
/// with the accessors the spatial index needs.
///
/// A geofence's bounding box is always derived from its *full* geometry via
/// [`BoundingBox::from_polygon`], never from the simplified geometry used
/// for containment tests, so index-level pruning can never exclude a point
/// the simplified polygon would contain.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// The underlying geometric rectangle
    pub rect: Rect,
}

impl BoundingBox {
    /// Create a new bounding box from minimum and maximum coordinates.
    ///
    /// # Arguments
    ///
    /// * `min_x` - Minimum longitude/x coordinate
    /// * `min_y` - Minimum latitude/y coordinate
    /// * `max_x` - Maximum longitude/x coordinate
    /// * `max_y` - Maximum latitude/y coordinate
    ///
    /// # Examples
    ///
    /// ```
    /// use geoborder_types::BoundingBox;
    ///
    /// let bbox = BoundingBox::new(37.308213, 55.767055, 37.367938, 55.806873);
    /// ```
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
        }
    }

    /// Create a bounding box from a `geo::Rect`.
    pub fn from_rect(rect: Rect) -> Self {
        Self { rect }
    }

    /// Derive the bounding box of a polygon's geometry.
    ///
    /// Returns `None` for a polygon with no coordinates.
    pub fn from_polygon(polygon: &Polygon) -> Option<Self> {
        polygon.bounding_rect().map(Self::from_rect)
    }

    /// Get the minimum x coordinate.
    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    /// Get the minimum y coordinate.
    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    /// Get the maximum x coordinate.
    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    /// Get the maximum y coordinate.
    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains_point(&self, point: &Point) -> bool {
        point.x() >= self.min_x()
            && point.x() <= self.max_x()
            && point.y() >= self.min_y()
            && point.y() <= self.max_y()
    }

    /// Check if this bounding box intersects with another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.max_x() < other.min_x()
            || self.min_x() > other.max_x()
            || self.max_y() < other.min_y()
            || self.min_y() > other.max_y())
    }

    /// Expand the bounding box by a given amount in all directions.
    pub fn expand(&self, amount: f64) -> Self {
        Self::new(
            self.min_x() - amount,
            self.min_y() - amount,
            self.max_x() + amount,
            self.max_y() + amount,
        )
    }

    /// Build a degenerate-point-safe query box around a point.
    ///
    /// The point is expanded by `half_width` degrees on each axis so that
    /// index lookups near polygon borders are not defeated by floating
    /// point noise.
    pub fn around_point(point: &Point, half_width: f64) -> Self {
        Self::new(
            point.x() - half_width,
            point.y() - half_width,
            point.x() + half_width,
            point.y() + half_width,
        )
    }
}
