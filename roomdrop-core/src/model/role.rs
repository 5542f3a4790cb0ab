use crate::model::PeerId;
use serde::{Deserialize, Serialize};

/// Position of a client inside its room, fixed at join time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    /// First occupant: found the room empty.
    Initiator,
    /// Second occupant: found someone already waiting.
    Responder,
}

impl Role {
    /// Role of a joiner given the occupants the relay reported for the room.
    pub fn from_existing_peers(existing: Option<&[PeerId]>) -> Self {
        match existing {
            Some(peers) if !peers.is_empty() => Role::Responder,
            _ => Role::Initiator,
        }
    }

    /// The role the other occupant of a two-party room holds.
    pub fn counterpart(self) -> Self {
        match self {
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }
}
