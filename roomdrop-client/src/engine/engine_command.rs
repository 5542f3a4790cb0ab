use crate::error::ClientError;
use crate::transfer::LocalFile;
use roomdrop_core::{FileInfo, PeerId, RoomId};
use tokio::sync::oneshot;

/// Requests from the presentation layer, processed in order by the engine loop.
#[derive(Debug)]
pub enum EngineCommand {
    /// Ask the relay for a place in `room`.
    JoinRoom {
        room: RoomId,
        reply: oneshot::Sender<Result<(), ClientError>>,
    },

    /// Offer the first of `files` to `target`, or to the only roommate.
    SendFiles {
        target: Option<PeerId>,
        files: Vec<LocalFile>,
        reply: oneshot::Sender<Result<FileInfo, ClientError>>,
    },

    /// Tear everything down and stop the loop.
    Shutdown,
}
