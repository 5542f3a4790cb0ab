use crate::transfer::TransferState;
use roomdrop_core::{FileInfo, PeerId, Role, RoomId};
use std::path::PathBuf;

/// Lifecycle notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Joined {
        room: RoomId,
        my_id: PeerId,
        role: Role,
    },

    RoomFull(RoomId),

    PeerJoined(PeerId),

    /// A roommate announced a file; it is accepted automatically.
    IncomingFile { from: PeerId, info: FileInfo },

    /// On the receiving side `saved_to` names the persisted file. On the
    /// sending side it is `None` and the event only means the payload left
    /// this side before the recipient closed the channel; a recipient whose
    /// save failed closes it too.
    TransferCompleted {
        peer_id: PeerId,
        info: Option<FileInfo>,
        saved_to: Option<PathBuf>,
    },

    /// `state` is the step the transfer had reached when it broke.
    TransferFailed {
        peer_id: PeerId,
        state: TransferState,
        reason: String,
    },

    /// The relay link is gone. Established data channels keep running;
    /// transfers still negotiating are reported as failed.
    Disconnected,
}
