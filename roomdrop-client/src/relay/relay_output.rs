use async_trait::async_trait;
use roomdrop_core::{RoomId, SignalMessage};
use tracing::warn;

/// Outbound half of the relay link.
///
/// Delivery is best effort: implementations log failures and never report
/// them, so callers cannot block on a dead relay.
#[async_trait]
pub trait RelayOutput: Send + Sync {
    /// Write one message to the relay.
    async fn emit(&self, msg: SignalMessage);

    /// Release the link. Calling it more than once is harmless.
    async fn disconnect(&self);

    /// Ask the relay to place us in `room`.
    async fn join(&self, room: RoomId) {
        self.emit(SignalMessage::Join { room }).await;
    }

    /// Forward a peer-addressed message. Relay-only events are refused.
    async fn send(&self, msg: SignalMessage) {
        if !msg.is_peer_addressed() {
            warn!("Refusing to forward relay-only event '{}'", msg.event_name());
            return;
        }
        self.emit(msg).await;
    }
}
