use bytes::Bytes;
use roomdrop_core::{IceCandidate, PeerId};

/// Identifies which transport raised an event.
///
/// A peer may get a fresh transport for every transfer, so the generation
/// lets the engine drop late events from one that was already torn down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportSource {
    pub peer_id: PeerId,
    pub generation: u64,
}

/// Events a transport posts into the engine's loop.
#[derive(Debug)]
pub enum TransportEvent {
    /// A local ICE candidate was gathered and must be signaled to the peer.
    CandidateGenerated(TransportSource, IceCandidate),

    /// The data channel is open and writable.
    ChannelOpen(TransportSource),

    /// A message arrived on the data channel.
    Message(TransportSource, Bytes),

    /// The data channel was closed, by either side.
    ChannelClosed(TransportSource),

    /// The underlying connection failed or was closed.
    Disconnected(TransportSource),
}

impl TransportEvent {
    pub fn source(&self) -> &TransportSource {
        match self {
            TransportEvent::CandidateGenerated(source, _)
            | TransportEvent::ChannelOpen(source)
            | TransportEvent::Message(source, _)
            | TransportEvent::ChannelClosed(source)
            | TransportEvent::Disconnected(source) => source,
        }
    }
}
