use crate::model::{FileInfo, PeerId, RoomId};
use serde::{Deserialize, Serialize};

/// ICE candidate as it travels over the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default, rename = "sdpMLineIndex")]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default)]
    pub username_fragment: Option<String>,
}

/// Every event exchanged between a client and the relay.
///
/// Room events (`Join`, `Joined`, `Roommate`, `RoomFull`) concern the room as a
/// whole. The rest are peer-addressed: they carry the `target` they are meant
/// for, and the relay stamps `from` before forwarding them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "op",
    content = "d",
    rename_all = "camelCase",
    rename_all_fields = "camelCase"
)]
pub enum SignalMessage {
    Join {
        room: RoomId,
    },
    Joined {
        room: RoomId,
        peer_id: PeerId,
        existing_peers: Option<Vec<PeerId>>,
    },
    Roommate {
        room: RoomId,
        peer_id: PeerId,
    },
    RoomFull {
        room: RoomId,
    },
    Offer {
        room: RoomId,
        target: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        sdp: String,
    },
    Answer {
        room: RoomId,
        target: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        sdp: String,
    },
    Candidate {
        room: RoomId,
        target: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        candidate: IceCandidate,
    },
    FileInfo {
        room: RoomId,
        target: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
        info: FileInfo,
    },
    Ready {
        room: RoomId,
        target: PeerId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        from: Option<PeerId>,
    },
}

impl SignalMessage {
    /// Wire name of the event, as it appears in the `op` field.
    pub fn event_name(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Joined { .. } => "joined",
            SignalMessage::Roommate { .. } => "roommate",
            SignalMessage::RoomFull { .. } => "roomFull",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::Candidate { .. } => "candidate",
            SignalMessage::FileInfo { .. } => "fileInfo",
            SignalMessage::Ready { .. } => "ready",
        }
    }

    pub fn room(&self) -> &RoomId {
        match self {
            SignalMessage::Join { room }
            | SignalMessage::Joined { room, .. }
            | SignalMessage::Roommate { room, .. }
            | SignalMessage::RoomFull { room }
            | SignalMessage::Offer { room, .. }
            | SignalMessage::Answer { room, .. }
            | SignalMessage::Candidate { room, .. }
            | SignalMessage::FileInfo { room, .. }
            | SignalMessage::Ready { room, .. } => room,
        }
    }

    /// Addressee of a peer-addressed event, `None` for room events.
    pub fn target(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { target, .. }
            | SignalMessage::Answer { target, .. }
            | SignalMessage::Candidate { target, .. }
            | SignalMessage::FileInfo { target, .. }
            | SignalMessage::Ready { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Sender of a forwarded event, as stamped by the relay.
    pub fn sender(&self) -> Option<&PeerId> {
        match self {
            SignalMessage::Offer { from, .. }
            | SignalMessage::Answer { from, .. }
            | SignalMessage::Candidate { from, .. }
            | SignalMessage::FileInfo { from, .. }
            | SignalMessage::Ready { from, .. } => from.as_ref(),
            _ => None,
        }
    }

    pub fn is_peer_addressed(&self) -> bool {
        self.target().is_some()
    }

    /// Overwrite `from` on a peer-addressed event. Room events are returned untouched.
    pub fn with_sender(mut self, sender: PeerId) -> Self {
        match &mut self {
            SignalMessage::Offer { from, .. }
            | SignalMessage::Answer { from, .. }
            | SignalMessage::Candidate { from, .. }
            | SignalMessage::FileInfo { from, .. }
            | SignalMessage::Ready { from, .. } => *from = Some(sender),
            _ => {}
        }
        self
    }
}
