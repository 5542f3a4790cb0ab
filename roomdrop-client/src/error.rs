use crate::transfer::TransferState;
use crate::negotiator::NegotiationState;
use roomdrop_core::{PeerId, RoomId};
use thiserror::Error;

/// Failures surfaced to the presentation layer.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to connect to relay at {url}: {source}")]
    RelayConnect {
        url: String,
        #[source]
        source: Box<tokio_tungstenite::tungstenite::Error>,
    },

    #[error("already joined room '{0}'")]
    AlreadyJoined(RoomId),

    #[error("not joined to any room")]
    NotJoined,

    #[error("peer {0} is not in the room")]
    UnknownPeer(PeerId),

    #[error("nobody else is in the room yet")]
    NoRoommate,

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("relay connection was lost")]
    RelayLost,

    #[error("engine has shut down")]
    EngineClosed,
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("no file to send")]
    NoFiles,

    #[error("'{name}' is {size} bytes, above the {limit} byte payload limit")]
    PayloadTooLarge { name: String, size: u64, limit: usize },

    #[error("no file stored for sending (state {0:?})")]
    NothingToSend(TransferState),

    #[error("failed to persist received file: {0}")]
    Persist(#[from] std::io::Error),

    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

#[derive(Debug, Error)]
pub enum NegotiationError {
    #[error("transport is not connected (state {0:?})")]
    NotConnected(NegotiationState),

    #[error(transparent)]
    Transport(#[from] anyhow::Error),
}
