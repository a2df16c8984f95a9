//! tarpc transport for the geoborder client.

use std::net::SocketAddr;

use geoborder_server::{CacheStats, GeofenceServiceClient, PointMatches, QueryPoint};
use tarpc::client;
use tarpc::context;
use tarpc::tokio_serde::formats::Json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),
    #[error("RPC error: {0}")]
    Rpc(#[from] tarpc::client::RpcError),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[derive(Clone)]
pub struct GeoborderClient {
    client: GeofenceServiceClient,
}

impl GeoborderClient {
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        let transport = tarpc::serde_transport::tcp::connect(addr, Json::default).await?;
        let client = GeofenceServiceClient::new(client::Config::default(), transport).spawn();
        Ok(Self { client })
    }

    /// Which geofences contain each point, optionally restricted to one
    /// user's geofences and optionally with boundary distances.
    pub async fn find_geofences(
        &self,
        points: Vec<QueryPoint>,
        user_id: Option<u64>,
        with_distance: bool,
    ) -> Result<Vec<PointMatches>> {
        let ctx = context::current();
        self.client
            .find_geofences(ctx, points, user_id, with_distance)
            .await?
            .map_err(ClientError::Server)
    }

    /// Check each point against explicitly named geofences.
    pub async fn check_geofences(
        &self,
        points: Vec<QueryPoint>,
        geofence_ids: Vec<u64>,
    ) -> Result<Vec<PointMatches>> {
        let ctx = context::current();
        self.client
            .check_geofences(ctx, points, geofence_ids)
            .await?
            .map_err(ClientError::Server)
    }

    /// Which geofences contain each point, with boundary distances.
    pub async fn distance_to_geofences(&self, points: Vec<QueryPoint>) -> Result<Vec<PointMatches>> {
        let ctx = context::current();
        self.client
            .distance_to_geofences(ctx, points)
            .await?
            .map_err(ClientError::Server)
    }

    pub async fn stats(&self) -> Result<CacheStats> {
        let ctx = context::current();
        Ok(self.client.stats(ctx).await?)
    }
}
