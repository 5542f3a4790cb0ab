mod config;
mod error;
mod room;
mod signaling;

pub use config::*;
pub use error::*;
pub use room::*;
pub use signaling::*;

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;
use tracing::info;

/// Routes of the relay: a single WebSocket endpoint.
pub fn router(service: SignalingService) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(service)
}

/// Bind the address from `config`.
pub async fn bind(config: &ServerConfig) -> Result<TcpListener, RelayError> {
    TcpListener::bind(config.addr)
        .await
        .map_err(|source| RelayError::Bind {
            addr: config.addr,
            source,
        })
}

/// Serve the relay on `listener` until the process stops.
pub async fn serve(listener: TcpListener, config: ServerConfig) -> Result<(), RelayError> {
    let service = SignalingService::new(config.room_capacity);
    if let Ok(addr) = listener.local_addr() {
        info!(
            "Relay listening on ws://{}/ws (rooms hold {} peers)",
            addr, config.room_capacity
        );
    }
    axum::serve(listener, router(service))
        .await
        .map_err(RelayError::Serve)
}
