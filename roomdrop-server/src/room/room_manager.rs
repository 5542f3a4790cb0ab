use crate::room::{JoinOutcome, Room, RoomCommand, RoomRegistry};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use roomdrop_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

#[derive(Clone)]
pub struct RoomManager {
    rooms: RoomRegistry,
    capacity: usize,
    signaling: Arc<dyn SignalingOutput>,
}

impl RoomManager {
    pub fn new(capacity: usize, signaling: Arc<dyn SignalingOutput>) -> Self {
        Self {
            rooms: Arc::new(DashMap::new()),
            capacity,
            signaling,
        }
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    pub fn get_room_sender(&self, room_id: &RoomId) -> mpsc::Sender<RoomCommand> {
        self.rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                info!("Creating new room: {}", room_id);
                let (tx, rx) = mpsc::channel(100);
                let room = Room::new(
                    room_id.clone(),
                    self.capacity,
                    rx,
                    self.signaling.clone(),
                    self.rooms.clone(),
                );
                tokio::spawn(room.run());
                tx
            })
            .clone()
    }

    /// Place `peer_id` in `room_id`, creating the room on first use.
    pub async fn join(&self, room_id: &RoomId, peer_id: PeerId) -> JoinOutcome {
        loop {
            let (reply, outcome) = oneshot::channel();
            let cmd = RoomCommand::Join {
                peer_id: peer_id.clone(),
                reply,
            };
            if self.get_room_sender(room_id).send(cmd).await.is_err() {
                continue;
            }
            // A room that closed while the request was queued drops the reply.
            if let Ok(outcome) = outcome.await {
                return outcome;
            }
        }
    }

    /// Fan a peer-addressed event out to the rest of the room.
    pub async fn forward(&self, room_id: &RoomId, from: PeerId, msg: SignalMessage) {
        let Some(tx) = self.rooms.get(room_id).map(|r| r.clone()) else {
            warn!("Dropping '{}' for unknown room '{}'", msg.event_name(), room_id);
            return;
        };
        let _ = tx.send(RoomCommand::Forward { from, msg }).await;
    }

    pub async fn leave(&self, room_id: &RoomId, peer_id: PeerId) {
        let Some(tx) = self.rooms.get(room_id).map(|r| r.clone()) else {
            return;
        };
        let _ = tx.send(RoomCommand::Leave { peer_id }).await;
    }
}
