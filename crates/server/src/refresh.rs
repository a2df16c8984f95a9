//! Background refresh of the geofence cache.
//!
//! The cache never schedules itself; this task drives
//! [`GeoCache::update`] on a fixed interval. A failed cycle is logged and
//! skipped, leaving the cache serving last-known-good data until the next
//! attempt.

use std::sync::Arc;
use std::time::Duration;

use geoborder::GeoCache;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Default time between refresh cycles.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Spawn the refresh loop. Abort the returned handle to stop it.
pub fn spawn_refresh(cache: Arc<GeoCache>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the startup load already ran.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match cache.update().await {
                Ok(0) => debug!("refresh: nothing new"),
                Ok(count) => info!("refresh: merged {count} new geofence polygons"),
                Err(err) => warn!("refresh failed, serving stale data until next cycle: {err}"),
            }
        }
    })
}
