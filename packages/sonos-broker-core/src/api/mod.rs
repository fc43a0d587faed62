//! HTTP API layer.
//!
//! Thin handlers that delegate to services: the GENA NOTIFY callback plus a
//! small control surface over the zone registry.

use std::net::SocketAddr;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::bootstrap::BootstrappedServices;
use crate::context::NetworkContext;
use crate::publish::Publisher;
use crate::services::{DiscoveryLoop, EventDecoder, SnippetOrchestrator, ZoneController};
use crate::state::Config;
use crate::zone::ZoneRegistry;

pub mod http;

/// First port tried when no preferred port is configured.
const AUTO_PORT_START: u16 = 12901;
/// Last port tried when no preferred port is configured.
const AUTO_PORT_END: u16 = 12911;

/// Errors that can occur when starting or running the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to a TCP port.
    #[error("Failed to bind to port: {0}")]
    Bind(#[from] std::io::Error),

    /// No available ports in the specified range.
    #[error("No available ports in range {start}-{end}")]
    NoAvailablePort { start: u16, end: u16 },
}

/// Shared application state for the API layer.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ZoneRegistry>,
    pub controller: Arc<ZoneController>,
    pub snippets: Arc<SnippetOrchestrator>,
    pub discovery: Arc<DiscoveryLoop>,
    pub decoder: Arc<EventDecoder>,
    pub publisher: Arc<Publisher>,
    /// Network configuration (port, local IP).
    pub network: NetworkContext,
    pub config: Arc<Config>,
    /// Cancelled on shutdown; stops the server loop.
    pub cancel_token: CancellationToken,
}

impl AppState {
    /// Builds the API state from the wired services.
    pub fn new(services: &BootstrappedServices) -> Self {
        Self {
            registry: Arc::clone(&services.registry),
            controller: Arc::clone(&services.controller),
            snippets: Arc::clone(&services.snippets),
            discovery: Arc::clone(&services.discovery),
            decoder: Arc::clone(&services.decoder),
            publisher: Arc::clone(&services.publisher),
            network: services.network.clone(),
            config: Arc::new(services.config.clone()),
            cancel_token: services.cancel_token.clone(),
        }
    }
}

async fn find_available_port(start: u16, end: u16) -> Result<(u16, TcpListener), ServerError> {
    for port in start..=end {
        let addr = SocketAddr::from(([0, 0, 0, 0], port));
        match TcpListener::bind(&addr).await {
            Ok(listener) => return Ok((port, listener)),
            Err(_) => continue,
        }
    }
    Err(ServerError::NoAvailablePort {
        start,
        end,
    })
}

/// Binds the preferred port, or the first free port of the auto range when
/// `preferred` is 0.
pub async fn bind(preferred: u16) -> Result<(u16, TcpListener), ServerError> {
    if preferred > 0 {
        let addr = SocketAddr::from(([0, 0, 0, 0], preferred));
        Ok((preferred, TcpListener::bind(&addr).await?))
    } else {
        find_available_port(AUTO_PORT_START, AUTO_PORT_END).await
    }
}

/// Serves the router on an already bound listener.
///
/// The listener's port is written to the network context first so
/// subscription callback URLs point at it. Returns once the state's
/// cancellation token fires.
pub async fn serve(state: AppState, listener: TcpListener) -> Result<(), ServerError> {
    let port = listener.local_addr()?.port();
    state.network.set_port(port);

    log::info!("[Server] Listening on http://0.0.0.0:{}", port);
    let cancel = state.cancel_token.clone();
    let app = http::create_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await?;
    Ok(())
}

/// Starts the HTTP server on the configured or auto-discovered port.
pub async fn start_server(state: AppState) -> Result<(), ServerError> {
    let (_, listener) = bind(state.config.preferred_port).await?;
    serve(state, listener).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn auto_port_binds_within_range() {
        let (port, listener) = bind(0).await.unwrap();
        assert!((AUTO_PORT_START..=AUTO_PORT_END).contains(&port));
        assert_eq!(listener.local_addr().unwrap().port(), port);
    }
}
