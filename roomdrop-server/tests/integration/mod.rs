
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::Level;

use roomdrop_server::ServerConfig;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// Start a relay on an ephemeral local port.
pub async fn spawn_test_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("No local address");

    tokio::spawn(async move {
        if let Err(e) = roomdrop_server::serve(listener, ServerConfig::default()).await {
            tracing::error!("Test relay stopped: {}", e);
        }
    });

    addr
}
