use roomdrop_core::{PeerId, Role, RoomId};

/// Whether the relay has confirmed our place in a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinState {
    #[default]
    NotJoined,
    Joined,
}

/// What the presentation layer needs to render one roommate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerView {
    pub peer_id: PeerId,
    pub peer_type: Role,
}

/// Observable room state, published after every change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SessionSnapshot {
    pub connection_state: JoinState,
    pub room: Option<RoomId>,
    pub my_id: Option<PeerId>,
    pub peers: Vec<PeerView>,
    pub peer_type: Option<Role>,
}

impl SessionSnapshot {
    pub fn is_joined(&self) -> bool {
        self.connection_state == JoinState::Joined
    }

    pub fn peer_ids(&self) -> Vec<PeerId> {
        self.peers.iter().map(|p| p.peer_id.clone()).collect()
    }
}
