use crate::room::{JoinOutcome, RoomManager};
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use axum::extract::ws::Message;
use dashmap::DashMap;
use roomdrop_core::{PeerId, RoomId, SignalMessage};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{error, warn};

struct PeerEntry {
    tx: mpsc::UnboundedSender<Message>,
    room: Option<RoomId>,
}

struct SignalingInner {
    peers: DashMap<PeerId, PeerEntry>,
}

/// Connected peers plus the rooms they occupy.
#[derive(Clone)]
pub struct SignalingService {
    inner: Arc<SignalingInner>,
    rooms: RoomManager,
}

/// The rooms reach peers through this; a weak reference keeps the
/// service and its rooms from owning each other.
struct PeerDirectory(Weak<SignalingInner>);

impl SignalingService {
    pub fn new(room_capacity: usize) -> Self {
        let inner = Arc::new(SignalingInner {
            peers: DashMap::new(),
        });
        let directory = Arc::new(PeerDirectory(Arc::downgrade(&inner)));
        Self {
            inner,
            rooms: RoomManager::new(room_capacity, directory),
        }
    }

    pub fn add_peer(&self, peer_id: PeerId, tx: mpsc::UnboundedSender<Message>) {
        self.inner.peers.insert(peer_id, PeerEntry { tx, room: None });
    }

    /// Forget the peer and release its seat in its room.
    pub async fn remove_peer(&self, peer_id: &PeerId) {
        let Some((_, entry)) = self.inner.peers.remove(peer_id) else {
            return;
        };
        if let Some(room) = entry.room {
            self.rooms.leave(&room, peer_id.clone()).await;
        }
    }

    /// The room `peer_id` was admitted to, if any.
    pub fn room_of(&self, peer_id: &PeerId) -> Option<RoomId> {
        self.inner
            .peers
            .get(peer_id)
            .and_then(|entry| entry.room.clone())
    }

    pub async fn join(&self, room: &RoomId, peer_id: PeerId) -> JoinOutcome {
        let outcome = self.rooms.join(room, peer_id.clone()).await;
        if outcome == JoinOutcome::Joined {
            let admitted = self
                .inner
                .peers
                .get_mut(&peer_id)
                .map(|mut entry| entry.room = Some(room.clone()))
                .is_some();
            // Gone while the room was admitting it.
            if !admitted {
                self.rooms.leave(room, peer_id).await;
            }
        }
        outcome
    }

    pub async fn forward(&self, room: &RoomId, from: PeerId, msg: SignalMessage) {
        self.rooms.forward(room, from, msg).await;
    }
}

fn send_to(inner: &SignalingInner, peer_id: PeerId, msg: SignalMessage) {
    if let Some(peer) = inner.peers.get(&peer_id) {
        match serde_json::to_string(&msg) {
            Ok(json) => {
                if let Err(e) = peer.tx.send(Message::Text(json.into())) {
                    error!("Failed to send WS message to {:?}: {:?}", peer_id, e);
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    } else {
        warn!(
            "Attempted to send signal to disconnected user {:?}",
            peer_id
        );
    }
}

#[async_trait]
impl SignalingOutput for PeerDirectory {
    async fn send_signal(&self, peer_id: PeerId, msg: SignalMessage) {
        if let Some(inner) = self.0.upgrade() {
            send_to(&inner, peer_id, msg);
        }
    }
}
