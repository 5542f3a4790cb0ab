use crate::session::{JoinState, PeerView, SessionSnapshot};
use roomdrop_core::{PeerId, Role, RoomId};
use tracing::{debug, info, warn};

/// This client's identity inside one room.
///
/// Only relay events mutate it: `on_joined` once, `on_roommate` for every
/// arrival afterwards. The roster never shrinks.
#[derive(Debug, Default)]
pub struct RoomSession {
    join_state: JoinState,
    requested_room: Option<RoomId>,
    room: Option<RoomId>,
    my_id: Option<PeerId>,
    roster: Vec<PeerId>,
    role: Option<Role>,
}

impl RoomSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join_state(&self) -> JoinState {
        self.join_state
    }

    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn roster(&self) -> &[PeerId] {
        &self.roster
    }

    pub fn contains_peer(&self, peer_id: &PeerId) -> bool {
        self.roster.contains(peer_id)
    }

    /// Remember which room a `join` was emitted for.
    pub fn mark_join_requested(&mut self, room: RoomId) {
        self.requested_room = Some(room);
    }

    /// True once a `join` was emitted or confirmed.
    pub fn join_requested(&self) -> bool {
        self.requested_room.is_some() || self.join_state == JoinState::Joined
    }

    /// The relay turned the join down; a different room may be tried.
    pub fn on_room_full(&mut self, room: &RoomId) {
        if self.requested_room.as_ref() == Some(room) && self.join_state == JoinState::NotJoined {
            warn!("Room '{}' is full", room);
            self.requested_room = None;
        }
    }

    /// True when a peer-addressed event is meant for this client.
    pub fn is_addressed_to_me(&self, target: &PeerId) -> bool {
        self.my_id.as_ref() == Some(target)
    }

    /// Apply the relay's join confirmation. Returns false if it was ignored.
    pub fn on_joined(
        &mut self,
        room: RoomId,
        self_id: PeerId,
        existing_peers: Option<Vec<PeerId>>,
    ) -> bool {
        if self.join_state == JoinState::Joined {
            warn!(
                "Ignoring join confirmation for room '{}': already joined '{:?}'",
                room, self.room
            );
            return false;
        }

        let role = Role::from_existing_peers(existing_peers.as_deref());
        let mut roster = Vec::new();
        for peer in existing_peers.unwrap_or_default() {
            if peer != self_id && !roster.contains(&peer) {
                roster.push(peer);
            }
        }

        info!(
            "Joined room '{}' as {} ({:?}), {} peer(s) already present",
            room,
            self_id,
            role,
            roster.len()
        );

        self.join_state = JoinState::Joined;
        self.room = Some(room);
        self.my_id = Some(self_id);
        self.role = Some(role);
        self.roster = roster;
        true
    }

    /// Append a newly arrived roommate. Returns true if the roster changed.
    pub fn on_roommate(&mut self, room: &RoomId, peer_id: PeerId) -> bool {
        if self.join_state != JoinState::Joined {
            debug!("Roommate {} announced before join confirmation, ignoring", peer_id);
            return false;
        }
        if self.room.as_ref() != Some(room) {
            debug!("Roommate {} announced for foreign room '{}', ignoring", peer_id, room);
            return false;
        }
        if self.my_id.as_ref() == Some(&peer_id) || self.roster.contains(&peer_id) {
            return false;
        }

        info!("New roommate {} in room '{}'", peer_id, room);
        self.roster.push(peer_id);
        true
    }

    /// Resolve the sender of a forwarded event.
    ///
    /// Relays that do not stamp `from` are tolerated while the room holds a
    /// single roommate, since the sender can only be that peer.
    pub fn resolve_sender(&self, from: Option<&PeerId>) -> Option<PeerId> {
        match from {
            Some(peer) => Some(peer.clone()),
            None if self.roster.len() == 1 => self.roster.first().cloned(),
            None => None,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let peer_type = self.role.map(Role::counterpart);
        SessionSnapshot {
            connection_state: self.join_state,
            room: self.room.clone().or_else(|| self.requested_room.clone()),
            my_id: self.my_id.clone(),
            peers: self
                .roster
                .iter()
                .filter_map(|peer_id| {
                    peer_type.map(|peer_type| PeerView {
                        peer_id: peer_id.clone(),
                        peer_type,
                    })
                })
                .collect(),
            peer_type: self.role,
        }
    }
}
