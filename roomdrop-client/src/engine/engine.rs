use crate::config::ClientConfig;
use crate::engine::{ClientEvent, EngineCommand, EngineHandle};
use crate::error::ClientError;
use crate::negotiator::{NegotiationState, PeerNegotiator};
use crate::relay::{RelayLink, RelayOutput};
use crate::session::{RoomSession, SessionSnapshot};
use crate::transfer::{FileSink, LocalFile, TransferController};
use crate::transport::{RtcTransportFactory, TransportEvent, TransportFactory, TransportSource};
use anyhow::Context;
use roomdrop_core::{FileInfo, PeerId, RoomId, SignalMessage};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, error, info, warn};

const COMMAND_QUEUE: usize = 32;
const TRANSPORT_QUEUE: usize = 256;

/// Owns the room session and every per-peer negotiator and transfer.
///
/// Commands, relay messages and transport events all land in one loop, so
/// handlers never run concurrently and per-peer state needs no locks.
pub struct Engine {
    config: ClientConfig,
    session: RoomSession,
    negotiators: HashMap<PeerId, PeerNegotiator>,
    transfers: HashMap<PeerId, TransferController>,
    relay: Arc<dyn RelayOutput>,
    transports: Box<dyn TransportFactory>,
    sink: Arc<dyn FileSink>,
    command_rx: mpsc::Receiver<EngineCommand>,
    signal_rx: mpsc::Receiver<SignalMessage>,
    transport_tx: mpsc::Sender<TransportEvent>,
    transport_rx: mpsc::Receiver<TransportEvent>,
    state_tx: watch::Sender<SessionSnapshot>,
    event_tx: mpsc::UnboundedSender<ClientEvent>,
    next_generation: u64,
    relay_open: bool,
}

impl Engine {
    pub fn new(
        config: ClientConfig,
        relay: Arc<dyn RelayOutput>,
        signal_rx: mpsc::Receiver<SignalMessage>,
        transports: Box<dyn TransportFactory>,
        sink: Arc<dyn FileSink>,
    ) -> (Self, EngineHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (transport_tx, transport_rx) = mpsc::channel(TRANSPORT_QUEUE);
        let (state_tx, state_rx) = watch::channel(SessionSnapshot::default());
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let engine = Self {
            config,
            session: RoomSession::new(),
            negotiators: HashMap::new(),
            transfers: HashMap::new(),
            relay,
            transports,
            sink,
            command_rx,
            signal_rx,
            transport_tx,
            transport_rx,
            state_tx,
            event_tx,
            next_generation: 0,
            relay_open: true,
        };
        (engine, EngineHandle::new(command_tx, state_rx, event_rx))
    }

    /// Connect to the relay named in `config` and spawn the loop with WebRTC transports.
    pub async fn start(
        config: ClientConfig,
        sink: Arc<dyn FileSink>,
    ) -> Result<EngineHandle, ClientError> {
        let (link, signal_rx) = RelayLink::connect(&config.server_url).await?;
        let transports = Box::new(RtcTransportFactory::new(config.transport.clone()));
        let (engine, handle) = Engine::new(config, link, signal_rx, transports, sink);
        tokio::spawn(engine.run());
        Ok(handle)
    }

    pub async fn run(mut self) {
        info!("Engine event loop started");

        loop {
            tokio::select! {
                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(EngineCommand::Shutdown) => {
                            info!("Shutdown requested");
                            break;
                        }
                        Some(c) => self.handle_command(c).await,
                        None => {
                            info!("Every engine handle dropped. Shutting down.");
                            break;
                        }
                    }
                }

                msg = self.signal_rx.recv(), if self.relay_open => {
                    match msg {
                        Some(m) => self.handle_signal(m).await,
                        None => {
                            self.relay_open = false;
                            self.on_relay_lost().await;
                        }
                    }
                }

                evt = self.transport_rx.recv() => {
                    if let Some(e) = evt {
                        self.handle_transport_event(e).await;
                    }
                }
            }
        }

        self.teardown_all().await;
        self.relay.disconnect().await;
        info!("Engine event loop finished");
    }

    async fn handle_command(&mut self, cmd: EngineCommand) {
        match cmd {
            EngineCommand::JoinRoom { room, reply } => {
                let _ = reply.send(self.join_room(room).await);
            }
            EngineCommand::SendFiles {
                target,
                files,
                reply,
            } => {
                let _ = reply.send(self.send_files(target, files).await);
            }
            EngineCommand::Shutdown => {}
        }
    }

    async fn join_room(&mut self, room: RoomId) -> Result<(), ClientError> {
        if !self.relay_open {
            return Err(ClientError::RelayLost);
        }
        if self.session.join_requested() {
            let current = self.session.snapshot().room.unwrap_or_else(|| room.clone());
            return Err(ClientError::AlreadyJoined(current));
        }
        info!("Joining room '{}'", room);
        self.session.mark_join_requested(room.clone());
        self.relay.join(room).await;
        self.publish_state();
        Ok(())
    }

    async fn send_files(
        &mut self,
        target: Option<PeerId>,
        files: Vec<LocalFile>,
    ) -> Result<FileInfo, ClientError> {
        if !self.relay_open {
            return Err(ClientError::RelayLost);
        }
        let Some(room) = self.session.room().cloned() else {
            return Err(ClientError::NotJoined);
        };
        let target = match target {
            Some(peer) if self.session.contains_peer(&peer) => peer,
            Some(peer) => return Err(ClientError::UnknownPeer(peer)),
            None => self
                .session
                .roster()
                .first()
                .cloned()
                .ok_or(ClientError::NoRoommate)?,
        };

        let file = TransferController::select_file(files, self.config.max_payload_bytes)?;

        // A previous attempt's transport must not deliver into this one.
        if let Some(mut stale) = self.negotiators.remove(&target) {
            stale.teardown().await;
        }
        let controller = self
            .transfers
            .entry(target.clone())
            .or_insert_with(|| TransferController::new(room, target, self.relay.clone()));

        Ok(controller.offer(file).await)
    }

    async fn handle_signal(&mut self, msg: SignalMessage) {
        debug!("<- relay: {}", msg.event_name());
        match msg {
            SignalMessage::Joined {
                room,
                peer_id,
                existing_peers,
            } => {
                if !self.session.on_joined(room.clone(), peer_id.clone(), existing_peers) {
                    return;
                }
                self.publish_state();
                if let Some(role) = self.session.role() {
                    self.emit_event(ClientEvent::Joined {
                        room,
                        my_id: peer_id,
                        role,
                    });
                }
            }

            SignalMessage::Roommate { room, peer_id } => {
                if self.session.on_roommate(&room, peer_id.clone()) {
                    self.publish_state();
                    self.emit_event(ClientEvent::PeerJoined(peer_id));
                }
            }

            SignalMessage::RoomFull { room } => {
                self.session.on_room_full(&room);
                self.publish_state();
                self.emit_event(ClientEvent::RoomFull(room));
            }

            SignalMessage::Join { room } => {
                debug!("Unexpected join for '{}' from relay, ignoring", room);
            }

            addressed => self.handle_peer_message(addressed).await,
        }
    }

    /// Dispatch an offer/answer/candidate/fileInfo/ready meant for this client.
    async fn handle_peer_message(&mut self, msg: SignalMessage) {
        let Some(target) = msg.target() else {
            return;
        };
        if !self.session.is_addressed_to_me(target) {
            debug!("'{}' addressed to {}, not to us", msg.event_name(), target);
            return;
        }
        if self.session.room() != Some(msg.room()) {
            debug!("'{}' for foreign room '{}'", msg.event_name(), msg.room());
            return;
        }
        let Some(from) = self.session.resolve_sender(msg.sender()) else {
            warn!("Cannot tell who sent '{}', dropping it", msg.event_name());
            return;
        };

        match msg {
            SignalMessage::FileInfo { info, .. } => self.on_file_info(from, info).await,
            SignalMessage::Ready { .. } => self.on_ready(from).await,

            SignalMessage::Offer { sdp, .. } => {
                let Some(negotiator) = self.negotiators.get_mut(&from) else {
                    debug!("Offer from {} without an accepted file, ignoring", from);
                    return;
                };
                negotiator.on_offer(sdp).await;
                self.check_negotiator(&from).await;
            }

            SignalMessage::Answer { sdp, .. } => {
                let Some(negotiator) = self.negotiators.get_mut(&from) else {
                    debug!("Answer from {} without a negotiation, ignoring", from);
                    return;
                };
                negotiator.on_answer(sdp).await;
                self.check_negotiator(&from).await;
            }

            SignalMessage::Candidate { candidate, .. } => {
                let Some(negotiator) = self.negotiators.get_mut(&from) else {
                    debug!("Candidate from {} without a negotiation, ignoring", from);
                    return;
                };
                negotiator.on_candidate(candidate).await;
                self.check_negotiator(&from).await;
            }

            other => debug!("Unhandled '{}' from {}", other.event_name(), from),
        }
    }

    /// Recipient: accept the announcement, prepare the answering transport, then signal `ready`.
    async fn on_file_info(&mut self, from: PeerId, info: FileInfo) {
        let Some(room) = self.session.room().cloned() else {
            return;
        };
        let relay = self.relay.clone();
        let controller = self
            .transfers
            .entry(from.clone())
            .or_insert_with(|| TransferController::new(room, from.clone(), relay));
        controller.on_file_info(info.clone());
        self.emit_event(ClientEvent::IncomingFile {
            from: from.clone(),
            info,
        });

        if let Err(e) = self.open_negotiator(&from).await {
            self.fail_transfer(&from, format!("{:#}", e)).await;
            return;
        }
        if let Some(controller) = self.transfers.get_mut(&from) {
            controller.emit_ready().await;
        }
    }

    /// Sender: the recipient is prepared, so start offering.
    async fn on_ready(&mut self, from: PeerId) {
        let Some(controller) = self.transfers.get_mut(&from) else {
            debug!("Ready from {} without a pending file, ignoring", from);
            return;
        };
        if !controller.on_ready() {
            return;
        }

        if let Err(e) = self.open_negotiator(&from).await {
            self.fail_transfer(&from, format!("{:#}", e)).await;
            return;
        }
        if let Some(negotiator) = self.negotiators.get_mut(&from) {
            negotiator.start_as_initiator().await;
        }
        self.check_negotiator(&from).await;
    }

    /// Replace any negotiator for `peer` with one over a fresh transport.
    async fn open_negotiator(&mut self, peer: &PeerId) -> anyhow::Result<()> {
        if let Some(mut old) = self.negotiators.remove(peer) {
            old.teardown().await;
        }
        let room = self
            .session
            .room()
            .cloned()
            .context("Not joined to a room")?;

        self.next_generation += 1;
        let source = TransportSource {
            peer_id: peer.clone(),
            generation: self.next_generation,
        };
        let transport = self
            .transports
            .create(source, self.transport_tx.clone())
            .await
            .with_context(|| format!("Failed to create transport for {}", peer))?;

        let negotiator = PeerNegotiator::new(
            room,
            peer.clone(),
            self.next_generation,
            transport,
            self.relay.clone(),
        );
        self.negotiators.insert(peer.clone(), negotiator);
        Ok(())
    }

    /// A negotiator that closed itself after a failed step takes its transfer down with it.
    async fn check_negotiator(&mut self, peer: &PeerId) {
        let closed = self
            .negotiators
            .get(peer)
            .is_some_and(PeerNegotiator::is_closed);
        if closed {
            self.fail_transfer(peer, "negotiation failed".to_owned())
                .await;
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        let source = event.source().clone();
        let current = self
            .negotiators
            .get(&source.peer_id)
            .is_some_and(|n| n.generation() == source.generation);
        if !current {
            debug!(
                "Dropping event from stale transport {} (generation {})",
                source.peer_id, source.generation
            );
            return;
        }
        let peer = source.peer_id;

        match event {
            TransportEvent::CandidateGenerated(_, candidate) => {
                if let Some(negotiator) = self.negotiators.get(&peer) {
                    negotiator.on_local_candidate(candidate).await;
                }
            }

            TransportEvent::ChannelOpen(_) => {
                let Some(negotiator) = self.negotiators.get_mut(&peer) else {
                    return;
                };
                negotiator.on_channel_open();

                let Some(controller) = self.transfers.get_mut(&peer) else {
                    return;
                };
                let sent = controller.on_channel_open(negotiator).await;
                if let Err(e) = sent {
                    self.fail_transfer(&peer, e.to_string()).await;
                }
            }

            TransportEvent::Message(_, data) => {
                let Some(controller) = self.transfers.get_mut(&peer) else {
                    debug!("{} bytes from {} with no transfer, dropping", data.len(), peer);
                    return;
                };
                let received = controller.on_message(data, self.sink.as_ref()).await;
                match received {
                    Ok(Some(path)) => {
                        let info = controller.incoming().cloned();
                        self.finish_transfer(&peer).await;
                        self.emit_event(ClientEvent::TransferCompleted {
                            peer_id: peer,
                            info,
                            saved_to: Some(path),
                        });
                    }
                    Ok(None) => {}
                    Err(e) => self.fail_transfer(&peer, e.to_string()).await,
                }
            }

            TransportEvent::ChannelClosed(_) | TransportEvent::Disconnected(_) => {
                let Some(controller) = self.transfers.get_mut(&peer) else {
                    self.close_negotiator(&peer).await;
                    return;
                };
                if controller.on_channel_closed() {
                    let info = controller.outgoing();
                    self.finish_transfer(&peer).await;
                    self.emit_event(ClientEvent::TransferCompleted {
                        peer_id: peer,
                        info,
                        saved_to: None,
                    });
                } else if controller.state().is_active() {
                    self.fail_transfer(&peer, "connection closed".to_owned())
                        .await;
                } else {
                    self.close_negotiator(&peer).await;
                }
            }
        }
    }

    /// Open data channels keep working without the relay; anything still
    /// negotiating can never finish.
    async fn on_relay_lost(&mut self) {
        warn!("Relay link closed, keeping established channels");
        self.emit_event(ClientEvent::Disconnected);

        let stranded: Vec<PeerId> = self
            .transfers
            .keys()
            .filter(|peer| {
                self.negotiators
                    .get(*peer)
                    .is_none_or(|n| n.state() != NegotiationState::Connected)
            })
            .cloned()
            .collect();
        for peer in stranded {
            self.fail_transfer(&peer, "relay connection lost".to_owned())
                .await;
        }
    }

    async fn close_negotiator(&mut self, peer: &PeerId) {
        if let Some(mut negotiator) = self.negotiators.remove(peer) {
            negotiator.teardown().await;
        }
    }

    /// Release everything held for a completed transfer.
    async fn finish_transfer(&mut self, peer: &PeerId) {
        self.close_negotiator(peer).await;
        if let Some(mut controller) = self.transfers.remove(peer) {
            controller.teardown();
        }
    }

    async fn fail_transfer(&mut self, peer: &PeerId, reason: String) {
        self.close_negotiator(peer).await;
        let Some(mut controller) = self.transfers.remove(peer) else {
            return;
        };
        let state = controller.state();
        controller.teardown();
        error!(
            "Transfer with {} failed in state {:?}: {}",
            peer, state, reason
        );
        self.emit_event(ClientEvent::TransferFailed {
            peer_id: peer.clone(),
            state,
            reason,
        });
    }

    async fn teardown_all(&mut self) {
        for (_, mut negotiator) in self.negotiators.drain() {
            negotiator.teardown().await;
        }
        for (_, mut controller) in self.transfers.drain() {
            controller.teardown();
        }
    }

    fn publish_state(&self) {
        self.state_tx.send_replace(self.session.snapshot());
    }

    fn emit_event(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }
}
