use crate::error::NegotiationError;
use crate::negotiator::NegotiationState;
use crate::relay::RelayOutput;
use crate::transport::Transport;
use bytes::Bytes;
use roomdrop_core::{IceCandidate, PeerId, RoomId, SignalMessage};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Label of the channel that carries the file.
pub const DATA_CHANNEL_LABEL: &str = "sendDataChannel";

/// Drives one transport to a connected data channel for one remote peer.
///
/// Every signaling event is checked against the state it may follow; anything
/// else is dropped instead of being applied speculatively. A failed step
/// closes the transport and parks the negotiator in `Closed` for good.
pub struct PeerNegotiator {
    room: RoomId,
    target: PeerId,
    generation: u64,
    state: NegotiationState,
    transport: Option<Box<dyn Transport>>,
    remote_description_set: bool,
    pending_candidates: Vec<IceCandidate>,
    relay: Arc<dyn RelayOutput>,
}

impl PeerNegotiator {
    pub fn new(
        room: RoomId,
        target: PeerId,
        generation: u64,
        transport: Box<dyn Transport>,
        relay: Arc<dyn RelayOutput>,
    ) -> Self {
        Self {
            room,
            target,
            generation,
            state: NegotiationState::Idle,
            transport: Some(transport),
            remote_description_set: false,
            pending_candidates: Vec::new(),
            relay,
        }
    }

    pub fn state(&self) -> NegotiationState {
        self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_closed(&self) -> bool {
        self.state.is_terminal()
    }

    /// Candidates received before the remote description, still waiting.
    pub fn pending_candidates(&self) -> usize {
        self.pending_candidates.len()
    }

    /// Offering side: create the data channel and send the offer.
    pub async fn start_as_initiator(&mut self) {
        if self.state != NegotiationState::Idle {
            debug!(
                "Negotiation with {} already started ({:?}), not offering again",
                self.target, self.state
            );
            return;
        }
        let Some(transport) = self.transport.as_ref() else {
            return;
        };

        if let Err(e) = transport.open_data_channel(DATA_CHANNEL_LABEL).await {
            self.fail("create data channel", e).await;
            return;
        }

        match transport.create_offer().await {
            Ok(sdp) => {
                info!("Sending offer to {}", self.target);
                self.state = NegotiationState::OfferSent;
                self.relay
                    .send(SignalMessage::Offer {
                        room: self.room.clone(),
                        target: self.target.clone(),
                        from: None,
                        sdp,
                    })
                    .await;
            }
            Err(e) => self.fail("create offer", e).await,
        }
    }

    /// Answering side: apply the remote offer and reply with an answer.
    pub async fn on_offer(&mut self, sdp: String) {
        if self.state != NegotiationState::Idle {
            debug!(
                "Ignoring offer from {} in state {:?}",
                self.target, self.state
            );
            return;
        }
        let Some(transport) = self.transport.as_ref() else {
            return;
        };

        match transport.accept_offer(sdp).await {
            Ok(answer) => {
                info!("Offer from {} applied, sending answer", self.target);
                self.remote_description_set = true;
                self.state = NegotiationState::AnswerSent;
                self.relay
                    .send(SignalMessage::Answer {
                        room: self.room.clone(),
                        target: self.target.clone(),
                        from: None,
                        sdp: answer,
                    })
                    .await;
                self.flush_candidates().await;
            }
            Err(e) => self.fail("apply offer", e).await,
        }
    }

    /// Offering side: apply the answer to our offer.
    pub async fn on_answer(&mut self, sdp: String) {
        if self.state != NegotiationState::OfferSent || self.remote_description_set {
            debug!(
                "Ignoring answer from {} in state {:?}",
                self.target, self.state
            );
            return;
        }
        let Some(transport) = self.transport.as_ref() else {
            return;
        };

        match transport.accept_answer(sdp).await {
            Ok(()) => {
                info!("Answer from {} applied", self.target);
                self.remote_description_set = true;
                self.flush_candidates().await;
            }
            Err(e) => self.fail("apply answer", e).await,
        }
    }

    /// Apply a remote candidate, or hold it until the remote description is set.
    pub async fn on_candidate(&mut self, candidate: IceCandidate) {
        if self.is_closed() {
            return;
        }
        if !self.remote_description_set {
            debug!(
                "Queueing early candidate from {} ({} queued)",
                self.target,
                self.pending_candidates.len() + 1
            );
            self.pending_candidates.push(candidate);
            return;
        }
        self.apply_candidate(candidate).await;
    }

    /// Signal a locally gathered candidate to the remote peer only.
    pub async fn on_local_candidate(&self, candidate: IceCandidate) {
        if self.is_closed() {
            return;
        }
        self.relay
            .send(SignalMessage::Candidate {
                room: self.room.clone(),
                target: self.target.clone(),
                from: None,
                candidate,
            })
            .await;
    }

    pub fn on_channel_open(&mut self) {
        match self.state {
            NegotiationState::OfferSent | NegotiationState::AnswerSent => {
                info!("Connected to {}", self.target);
                self.state = NegotiationState::Connected;
            }
            other => debug!(
                "Channel to {} opened in unexpected state {:?}",
                self.target, other
            ),
        }
    }

    /// Send one message over the connected channel.
    pub async fn send(&self, data: Bytes) -> Result<(), NegotiationError> {
        if self.state != NegotiationState::Connected {
            return Err(NegotiationError::NotConnected(self.state));
        }
        let Some(transport) = self.transport.as_ref() else {
            return Err(NegotiationError::NotConnected(self.state));
        };
        transport.send(data).await?;
        Ok(())
    }

    /// Close channel and connection and release the transport.
    pub async fn teardown(&mut self) {
        self.pending_candidates.clear();
        self.state = NegotiationState::Closed;
        let Some(transport) = self.transport.take() else {
            return;
        };
        if let Err(e) = transport.close().await {
            warn!("Error while closing transport to {}: {:?}", self.target, e);
        }
        debug!("Transport to {} torn down", self.target);
    }

    async fn flush_candidates(&mut self) {
        let queued = std::mem::take(&mut self.pending_candidates);
        if !queued.is_empty() {
            debug!(
                "Applying {} queued candidate(s) from {}",
                queued.len(),
                self.target
            );
        }
        for candidate in queued {
            self.apply_candidate(candidate).await;
            if self.is_closed() {
                return;
            }
        }
    }

    async fn apply_candidate(&mut self, candidate: IceCandidate) {
        let Some(transport) = self.transport.as_ref() else {
            return;
        };
        if let Err(e) = transport.add_ice_candidate(candidate).await {
            self.fail("add ICE candidate", e).await;
        }
    }

    async fn fail(&mut self, step: &str, e: anyhow::Error) {
        error!(
            "Negotiation with {} failed to {}: {:?}",
            self.target, step, e
        );
        self.teardown().await;
    }
}
