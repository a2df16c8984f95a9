//! tarpc transport for the geoborder server.

use std::sync::Arc;

use futures::prelude::*;
use geoborder::GeoCache;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio_util::codec::{Framed, LengthDelimitedCodec};
use tracing::{error, info};

use crate::handler::Handler;
use crate::protocol::GeofenceService;

/// Run the tarpc RPC server until the shutdown future resolves.
pub async fn run_server(
    listener: tokio::net::TcpListener,
    cache: Arc<GeoCache>,
    mut shutdown: impl Future<Output = ()> + Unpin + Send + 'static,
) -> anyhow::Result<()> {
    let handler = Handler::new(cache);

    info!("geoborder RPC server listening on {}", listener.local_addr()?);

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((socket, _)) => {
                        let server = handler.clone();
                        tokio::spawn(async move {
                            let framed = Framed::new(socket, LengthDelimitedCodec::new());
                            let transport = tarpc::serde_transport::new(
                                framed,
                                Json::default()
                            );

                            server::BaseChannel::with_defaults(transport)
                                .execute(server.serve())
                                .for_each(|response| async move {
                                    tokio::spawn(response);
                                })
                                .await;
                        });
                    }
                    Err(e) => {
                        error!("accept error: {}", e);
                    }
                }
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, stopping server...");
                break;
            }
        }
    }

    Ok(())
}
