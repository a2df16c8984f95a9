//! Backing-store contract and load-time payload normalization.
//!
//! The cache never talks to a database directly; it pulls geometry through
//! the [`GeofenceStore`] trait, which a concrete adapter (PostGIS, an
//! in-memory double) implements. The trait is object-safe so the cache can
//! hold an injected `Arc<dyn GeofenceStore>`.

use std::collections::HashMap;

use async_trait::async_trait;
use geoborder_types::{BoundingBox, GeofencePayload, GeofenceRecord};
use parking_lot::RwLock;

use crate::error::{GeoborderError, Result};

/// Read interface the cache requires from a backing store.
#[async_trait]
pub trait GeofenceStore: Send + Sync {
    /// Fetch the complete geometry set, keyed by polygon id.
    async fn fetch_full_geometry(&self) -> Result<HashMap<u64, GeofencePayload>>;

    /// Fetch only the records whose polygon id is absent from `known`.
    async fn fetch_missing(&self, known: &[u64]) -> Result<HashMap<u64, GeofencePayload>>;
}

/// A simplified outer ring at or below this coordinate count (a closed
/// triangle or less) is considered degenerate and the full geometry is
/// used for containment tests instead.
pub const DEGENERATE_RING_COORDS: usize = 4;

/// Normalize one store payload into the authoritative cache record.
///
/// Applies the degenerate-simplification substitution and derives the
/// bounding box from the full geometry. This runs exactly once per record,
/// at load/refresh time, never per query.
pub fn record_from_payload(payload: GeofencePayload) -> Result<GeofenceRecord> {
    let GeofencePayload {
        polygon_id,
        geofence_id,
        title,
        user_id,
        geometry_full,
        geometry_simplified,
    } = payload;

    let bounding_box = BoundingBox::from_polygon(&geometry_full).ok_or_else(|| {
        GeoborderError::DataCorrupt(format!("polygon {polygon_id} has empty full geometry"))
    })?;

    let ring_coords = geometry_simplified.exterior().0.len();
    let geometry = if ring_coords > 0 && ring_coords <= DEGENERATE_RING_COORDS {
        geometry_full
    } else if ring_coords == 0 {
        return Err(GeoborderError::DataCorrupt(format!(
            "polygon {polygon_id} has empty simplified geometry"
        )));
    } else {
        geometry_simplified
    };

    Ok(GeofenceRecord {
        polygon_id,
        geofence_id,
        title,
        user_id,
        geometry,
        bounding_box,
    })
}

/// In-memory store double.
///
/// Used by tests and by the server's mock mode: holds payloads behind a
/// lock so a running cache can be fed new records between refresh cycles.
#[derive(Default)]
pub struct MemoryStore {
    payloads: RwLock<HashMap<u64, GeofencePayload>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-seeded with payloads.
    pub fn with_payloads(payloads: impl IntoIterator<Item = GeofencePayload>) -> Self {
        let store = Self::new();
        store.seed(payloads);
        store
    }

    /// Add or replace payloads.
    pub fn seed(&self, payloads: impl IntoIterator<Item = GeofencePayload>) {
        let mut guard = self.payloads.write();
        for payload in payloads {
            guard.insert(payload.polygon_id, payload);
        }
    }

    /// Number of stored payloads.
    pub fn len(&self) -> usize {
        self.payloads.read().len()
    }

    /// Whether the store holds no payloads.
    pub fn is_empty(&self) -> bool {
        self.payloads.read().is_empty()
    }
}

#[async_trait]
impl GeofenceStore for MemoryStore {
    async fn fetch_full_geometry(&self) -> Result<HashMap<u64, GeofencePayload>> {
        Ok(self.payloads.read().clone())
    }

    async fn fetch_missing(&self, known: &[u64]) -> Result<HashMap<u64, GeofencePayload>> {
        Ok(self
            .payloads
            .read()
            .iter()
            .filter(|(id, _)| !known.contains(id))
            .map(|(id, payload)| (*id, payload.clone()))
            .collect())
    }
}
