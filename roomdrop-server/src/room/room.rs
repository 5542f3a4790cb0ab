use crate::room::{JoinOutcome, RoomCommand};
use crate::signaling::SignalingOutput;
use dashmap::DashMap;
use roomdrop_core::{PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub(crate) type RoomRegistry = Arc<DashMap<RoomId, mpsc::Sender<RoomCommand>>>;

/// One named room: its occupants in arrival order.
///
/// Runs as its own task and stops once the last occupant leaves, removing
/// itself from the registry first.
pub struct Room {
    id: RoomId,
    capacity: usize,
    occupants: Vec<PeerId>,
    command_rx: mpsc::Receiver<RoomCommand>,
    signaling: Arc<dyn SignalingOutput>,
    registry: RoomRegistry,
}

impl Room {
    pub(crate) fn new(
        id: RoomId,
        capacity: usize,
        command_rx: mpsc::Receiver<RoomCommand>,
        signaling: Arc<dyn SignalingOutput>,
        registry: RoomRegistry,
    ) -> Self {
        Self {
            id,
            capacity,
            occupants: Vec::new(),
            command_rx,
            signaling,
            registry,
        }
    }

    pub async fn run(mut self) {
        info!("Room '{}' opened", self.id);

        while let Some(cmd) = self.command_rx.recv().await {
            self.handle_command(cmd).await;

            if self.occupants.is_empty() {
                // Joins still queued get their reply dropped and retry on a fresh room.
                self.registry.remove(&self.id);
                break;
            }
        }

        info!("Room '{}' closed", self.id);
    }

    async fn handle_command(&mut self, cmd: RoomCommand) {
        match cmd {
            RoomCommand::Join { peer_id, reply } => {
                let outcome = self.join(peer_id).await;
                let _ = reply.send(outcome);
            }

            RoomCommand::Forward { from, msg } => {
                if !self.occupants.contains(&from) {
                    warn!(
                        "Dropping '{}' from {}: not in room '{}'",
                        msg.event_name(),
                        from,
                        self.id
                    );
                    return;
                }
                let msg = msg.with_sender(from.clone());
                for peer in self.occupants.iter().filter(|p| **p != from) {
                    debug!("'{}' {} -> {}", msg.event_name(), from, peer);
                    self.signaling.send_signal(peer.clone(), msg.clone()).await;
                }
            }

            RoomCommand::Leave { peer_id } => {
                self.occupants.retain(|p| *p != peer_id);
                info!(
                    "{} left room '{}' ({} remaining)",
                    peer_id,
                    self.id,
                    self.occupants.len()
                );
            }
        }
    }

    async fn join(&mut self, peer_id: PeerId) -> JoinOutcome {
        if self.occupants.len() >= self.capacity {
            info!("Room '{}' is full, turning {} away", self.id, peer_id);
            self.signaling
                .send_signal(
                    peer_id,
                    SignalMessage::RoomFull {
                        room: self.id.clone(),
                    },
                )
                .await;
            return JoinOutcome::Full;
        }

        let existing = self.occupants.clone();
        self.occupants.push(peer_id.clone());
        info!(
            "{} joined room '{}' ({}/{})",
            peer_id,
            self.id,
            self.occupants.len(),
            self.capacity
        );

        self.signaling
            .send_signal(
                peer_id.clone(),
                SignalMessage::Joined {
                    room: self.id.clone(),
                    peer_id: peer_id.clone(),
                    existing_peers: (!existing.is_empty()).then(|| existing.clone()),
                },
            )
            .await;

        for peer in existing {
            self.signaling
                .send_signal(
                    peer,
                    SignalMessage::Roommate {
                        room: self.id.clone(),
                        peer_id: peer_id.clone(),
                    },
                )
                .await;
        }
        JoinOutcome::Joined
    }
}
