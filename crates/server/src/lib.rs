//! HTTP and WebSocket surface over a [`Monitor`].
//!
//! Routes:
//! - `GET /api/network/current` — fresh snapshot from the sampler
//! - `GET /api/network/recent`  — stored history window
//! - `GET /ws`                  — live feed, one JSON record per tick

pub mod feed;
pub mod routes;

use netmon_config::{MonitorConfig, ServerConfig};
use netmon_core::Result;
use netmon_monitor::Monitor;
use poem::{
    get,
    listener::TcpListener,
    middleware::{AddData, Cors},
    Endpoint, EndpointExt, Route, Server,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Grace period for open connections after shutdown is requested.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// State injected into every handler.
pub struct ServerState {
    pub monitor:         Arc<Monitor>,
    /// Outbound queue length per live-feed connection.
    pub listener_buffer: usize,
}

impl ServerState {
    pub fn new(monitor: Arc<Monitor>, config: &MonitorConfig) -> Self {
        Self {
            monitor,
            listener_buffer: config.feed.listener_buffer,
        }
    }
}

/// Build the route tree.
pub fn app(state: Arc<ServerState>) -> impl Endpoint {
    Route::new()
        .at("/api/network/current", get(routes::current))
        .at("/api/network/recent", get(routes::recent))
        .at("/ws", get(feed::live))
        .with(Cors::new())
        .with(AddData::new(state))
}

/// Bind `config.bind_addr()` and serve until `shutdown` resolves.
///
/// Fails immediately with [`MonitorError::Io`](netmon_core::MonitorError::Io)
/// if the address cannot be bound.
pub async fn serve(
    config: &ServerConfig,
    state: Arc<ServerState>,
    shutdown: impl Future<Output = ()> + Send,
) -> Result<()> {
    let addr = config.bind_addr();
    info!("Server listening on {addr}");
    Server::new(TcpListener::bind(addr))
        .run_with_graceful_shutdown(app(state), shutdown, Some(SHUTDOWN_GRACE))
        .await?;
    Ok(())
}
