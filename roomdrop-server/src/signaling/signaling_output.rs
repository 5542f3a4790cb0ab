use async_trait::async_trait;
use roomdrop_core::{PeerId, SignalMessage};

/// How a room reaches its occupants. Implemented by the WebSocket layer.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    /// Deliver one message to one connected peer.
    async fn send_signal(&self, peer_id: PeerId, msg: SignalMessage);
}
