use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use geoborder::{GeoCache, GeofenceStore, MemoryStore};
use geoborder_server::{run_server, spawn_refresh};
use geoborder_storage::PgStore;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = 50051)]
    port: u16,

    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Seconds between background refresh cycles.
    #[arg(long, default_value_t = 5)]
    refresh_interval: u64,

    /// Run against an empty in-memory store instead of the database.
    #[arg(long)]
    use_mocks: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "geoborder_server=info,geoborder=info,info".into()),
        )
        .init();

    let args = Args::parse();

    let store: Arc<dyn GeofenceStore> = if args.use_mocks {
        warn!("running against an in-memory mock store; no geofences are served until seeded");
        Arc::new(MemoryStore::new())
    } else {
        let url = std::env::var("DATABASE_URL")
            .context("DATABASE_URL must be set (or pass --use-mocks)")?;
        Arc::new(PgStore::connect(&url).await?)
    };

    let cache = Arc::new(GeoCache::new(store));

    // A failed initial load is fatal: never serve queries from an
    // unready cache.
    let count = cache
        .load()
        .await
        .context("initial geofence load failed")?;
    info!("loaded {count} geofence polygons");

    let refresh = spawn_refresh(cache.clone(), Duration::from_secs(args.refresh_interval));

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", args.host, args.port)).await?;
    let shutdown = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl_c signal");
    };

    run_server(listener, cache, Box::pin(shutdown)).await?;

    refresh.abort();
    Ok(())
}
