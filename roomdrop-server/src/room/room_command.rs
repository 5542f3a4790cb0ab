use roomdrop_core::{PeerId, SignalMessage};
use tokio::sync::oneshot;

/// Answer to a join request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    Full,
}

/// Commands a room receives from the WebSocket connections of its peers.
#[derive(Debug)]
pub enum RoomCommand {
    /// A peer asks to enter. The room answers the peer itself and reports the outcome.
    Join {
        peer_id: PeerId,
        reply: oneshot::Sender<JoinOutcome>,
    },

    /// A peer-addressed event to fan out to the other occupants.
    Forward { from: PeerId, msg: SignalMessage },

    /// The peer's WebSocket closed.
    Leave { peer_id: PeerId },
}
