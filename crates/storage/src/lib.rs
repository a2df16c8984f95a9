//! PostGIS store adapter for the geoborder geofence cache.
//!
//! Implements [`GeofenceStore`] over the `geo.gz_polygon` / `geo.geozone`
//! tables. Geometry travels as GeoJSON produced by `ST_AsGeoJSON`; the
//! simplified variant comes from `ST_Simplify(polygon, 0.1, true)` and may
//! be collapsed, which the cache handles at load time.
//!
//! Row decoding is best-effort: a row whose geometry fails to decode is
//! skipped with a warning rather than failing the whole batch, so one bad
//! geozone cannot take the majority of the dataset down with it.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use geo::Polygon;
use geoborder::{GeoborderError, GeofenceStore, Result};
use geoborder_types::GeofencePayload;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

const FULL_GEOMETRY_SQL: &str = "\
    SELECT gp.id AS polygon_id, \
           g.id AS geofence_id, \
           g.title AS title, \
           g.user_id AS user_id, \
           ST_AsGeoJSON(gp.polygon::geometry) AS geometry_full, \
           ST_AsGeoJSON(ST_Simplify(gp.polygon::geometry, 0.1, true)) AS geometry_simplified \
    FROM geo.gz_polygon gp \
    INNER JOIN geo.geozone g ON gp.gz_id = g.id";

const NEW_RECORDS_SQL: &str = "\
    SELECT gp.id AS polygon_id, \
           g.id AS geofence_id, \
           g.title AS title, \
           g.user_id AS user_id, \
           ST_AsGeoJSON(gp.polygon::geometry) AS geometry_full, \
           ST_AsGeoJSON(ST_Simplify(gp.polygon::geometry, 0.1, true)) AS geometry_simplified \
    FROM geo.gz_polygon gp \
    INNER JOIN geo.geozone g ON gp.gz_id = g.id \
    WHERE NOT (gp.id = ANY($1))";

/// Geofence store backed by a PostGIS database.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and prepare a pool.
    ///
    /// Fails with [`GeoborderError::StoreUnavailable`] when the database
    /// cannot be reached within the acquire timeout.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await
            .map_err(store_unavailable)?;

        tracing::info!("connected to geofence database");
        Ok(Self { pool })
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    fn collect_payloads(rows: Vec<PgRow>) -> HashMap<u64, GeofencePayload> {
        let mut payloads = HashMap::with_capacity(rows.len());
        for row in rows {
            match payload_from_row(&row) {
                Ok(payload) => {
                    payloads.insert(payload.polygon_id, payload);
                }
                Err(err) => {
                    tracing::warn!("skipping geofence row: {err}");
                }
            }
        }
        payloads
    }
}

#[async_trait]
impl GeofenceStore for PgStore {
    async fn fetch_full_geometry(&self) -> Result<HashMap<u64, GeofencePayload>> {
        let rows = sqlx::query(FULL_GEOMETRY_SQL)
            .fetch_all(&self.pool)
            .await
            .map_err(store_unavailable)?;

        Ok(Self::collect_payloads(rows))
    }

    async fn fetch_missing(&self, known: &[u64]) -> Result<HashMap<u64, GeofencePayload>> {
        let known: Vec<i64> = known.iter().map(|id| *id as i64).collect();

        let rows = sqlx::query(NEW_RECORDS_SQL)
            .bind(&known)
            .fetch_all(&self.pool)
            .await
            .map_err(store_unavailable)?;

        Ok(Self::collect_payloads(rows))
    }
}

fn store_unavailable(err: sqlx::Error) -> GeoborderError {
    GeoborderError::StoreUnavailable(err.to_string())
}

fn payload_from_row(row: &PgRow) -> Result<GeofencePayload> {
    let polygon_id: i64 = row.try_get("polygon_id").map_err(decode_error)?;
    let geofence_id: i64 = row.try_get("geofence_id").map_err(decode_error)?;
    let title: String = row.try_get("title").map_err(decode_error)?;
    let user_id: i64 = row.try_get("user_id").map_err(decode_error)?;
    let full: String = row.try_get("geometry_full").map_err(decode_error)?;
    let simplified: Option<String> = row.try_get("geometry_simplified").map_err(decode_error)?;

    let geometry_full = decode_polygon(&full)?;
    let geometry_simplified = match simplified {
        Some(json) => decode_polygon(&json)?,
        None => geometry_full.clone(),
    };

    Ok(GeofencePayload {
        polygon_id: polygon_id as u64,
        geofence_id: geofence_id as u64,
        title,
        user_id: user_id as u64,
        geometry_full,
        geometry_simplified,
    })
}

fn decode_error(err: sqlx::Error) -> GeoborderError {
    GeoborderError::DataCorrupt(err.to_string())
}

/// Decode a GeoJSON geometry string into a polygon.
///
/// Anything that is not a `Polygon` geometry is corrupt as far as this
/// service is concerned; geozones are stored as single polygons. Interior
/// rings are dropped: only the outer boundary participates in containment
/// tests.
pub fn decode_polygon(json: &str) -> Result<Polygon> {
    let geometry: geojson::Geometry = serde_json::from_str(json)
        .map_err(|err| GeoborderError::DataCorrupt(format!("unparseable geometry: {err}")))?;

    let geojson::Value::Polygon(rings) = geometry.value else {
        return Err(GeoborderError::DataCorrupt(
            "geometry is not a polygon".to_string(),
        ));
    };
    let Some(exterior) = rings.first() else {
        return Err(GeoborderError::DataCorrupt(
            "polygon has no rings".to_string(),
        ));
    };

    let mut coords = Vec::with_capacity(exterior.len());
    for position in exterior {
        let [x, y, ..] = position.as_slice() else {
            return Err(GeoborderError::DataCorrupt(
                "ring coordinate with fewer than 2 values".to_string(),
            ));
        };
        coords.push(geo::coord! { x: *x, y: *y });
    }

    Ok(Polygon::new(geo::LineString::from(coords), vec![]))
}
