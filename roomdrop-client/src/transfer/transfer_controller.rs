use crate::error::TransferError;
use crate::negotiator::PeerNegotiator;
use crate::relay::RelayOutput;
use crate::transfer::{FileSink, LocalFile, TransferState};
use bytes::Bytes;
use roomdrop_core::{FileInfo, PeerId, RoomId, SignalMessage};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Coordinates one file exchange with one remote peer.
///
/// The handshake (`fileInfo` -> `ready` -> channel -> payload) is separate from
/// connection setup: the data channel is only negotiated once both sides have
/// agreed to proceed.
pub struct TransferController {
    room: RoomId,
    peer_id: PeerId,
    state: TransferState,
    outgoing: Option<LocalFile>,
    incoming: Option<FileInfo>,
    relay: Arc<dyn RelayOutput>,
}

impl TransferController {
    pub fn new(room: RoomId, peer_id: PeerId, relay: Arc<dyn RelayOutput>) -> Self {
        Self {
            room,
            peer_id,
            state: TransferState::Idle,
            outgoing: None,
            incoming: None,
            relay,
        }
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn incoming(&self) -> Option<&FileInfo> {
        self.incoming.as_ref()
    }

    pub fn outgoing(&self) -> Option<FileInfo> {
        self.outgoing.as_ref().map(LocalFile::info)
    }

    /// Pick the file a `send_files` call will offer, or say why there is none.
    ///
    /// Nothing is touched here, so a rejected call leaves any running transfer alone.
    pub fn select_file(
        files: Vec<LocalFile>,
        max_payload_bytes: usize,
    ) -> Result<LocalFile, TransferError> {
        let file = files.into_iter().next().ok_or(TransferError::NoFiles)?;
        if file.bytes.len() > max_payload_bytes {
            let info = file.info();
            return Err(TransferError::PayloadTooLarge {
                name: info.name,
                size: info.size,
                limit: max_payload_bytes,
            });
        }
        Ok(file)
    }

    /// Sender, step 1: store the file and announce it.
    ///
    /// Starts over from whatever state a previous attempt was left in.
    pub async fn offer(&mut self, file: LocalFile) -> FileInfo {
        let info = file.info();
        if self.state.is_active() {
            warn!(
                "Restarting transfer with {} from state {:?}",
                self.peer_id, self.state
            );
        }

        info!(
            "Offering '{}' ({} bytes) to {}",
            info.name, info.size, self.peer_id
        );
        self.outgoing = Some(file);
        self.incoming = None;
        self.state = TransferState::InfoSent;
        self.relay
            .send(SignalMessage::FileInfo {
                room: self.room.clone(),
                target: self.peer_id.clone(),
                from: None,
                info: info.clone(),
            })
            .await;
        info
    }

    /// Recipient, step 2a: record the announcement.
    ///
    /// A new announcement replaces whatever was in progress with this peer;
    /// the sender only re-announces after giving up on the previous attempt.
    pub fn on_file_info(&mut self, info: FileInfo) {
        if self.state.is_active() {
            warn!(
                "{} re-announced with '{}', abandoning transfer in state {:?}",
                self.peer_id, info.name, self.state
            );
        }
        info!(
            "{} offers '{}' ({} bytes)",
            self.peer_id, info.name, info.size
        );
        self.outgoing = None;
        self.incoming = Some(info);
        self.state = TransferState::AwaitingReady;
    }

    /// Recipient, step 2b: our transport is prepared, tell the sender.
    pub async fn emit_ready(&mut self) {
        if self.state != TransferState::AwaitingReady {
            debug!("Not emitting ready to {} in state {:?}", self.peer_id, self.state);
            return;
        }
        self.state = TransferState::Receiving;
        self.relay
            .send(SignalMessage::Ready {
                room: self.room.clone(),
                target: self.peer_id.clone(),
                from: None,
            })
            .await;
    }

    /// Sender, step 3: returns true when the data channel should now be negotiated.
    pub fn on_ready(&mut self) -> bool {
        if self.state != TransferState::InfoSent {
            debug!(
                "Ignoring ready from {} in state {:?}",
                self.peer_id, self.state
            );
            return false;
        }
        info!("{} is ready, negotiating data channel", self.peer_id);
        true
    }

    /// Sender, step 4: push the stored payload as a single message.
    pub async fn on_channel_open(
        &mut self,
        negotiator: &PeerNegotiator,
    ) -> Result<(), TransferError> {
        match self.state {
            TransferState::InfoSent => {}
            TransferState::Receiving => {
                debug!("Receive channel from {} open", self.peer_id);
                return Ok(());
            }
            other => {
                debug!(
                    "Channel to {} opened in state {:?}, nothing to do",
                    self.peer_id, other
                );
                return Ok(());
            }
        }

        self.state = TransferState::ChannelOpen;
        let payload = self
            .outgoing
            .as_ref()
            .map(|f| f.bytes.clone())
            .ok_or(TransferError::NothingToSend(self.state))?;

        negotiator.send(payload.clone()).await?;
        info!("Sent {} bytes to {}", payload.len(), self.peer_id);
        self.state = TransferState::Sending;
        Ok(())
    }

    /// Recipient, step 5: persist the payload under the announced name.
    ///
    /// Returns `None` when no payload was expected.
    pub async fn on_message(
        &mut self,
        data: Bytes,
        sink: &dyn FileSink,
    ) -> Result<Option<PathBuf>, TransferError> {
        if self.state != TransferState::Receiving {
            debug!(
                "Dropping {} unexpected bytes from {} in state {:?}",
                data.len(),
                self.peer_id,
                self.state
            );
            return Ok(None);
        }
        let name = self
            .incoming
            .as_ref()
            .map(|info| info.name.clone())
            .unwrap_or_default();

        let path = sink.persist(&name, data).await?;
        self.state = TransferState::Done;
        Ok(Some(path))
    }

    /// The channel went away. Returns true if that completes a send.
    pub fn on_channel_closed(&mut self) -> bool {
        if self.state == TransferState::Sending {
            info!("{} closed the channel, transfer complete", self.peer_id);
            self.state = TransferState::Done;
            return true;
        }
        false
    }

    /// Drop owned payloads. State is left where it is so a failed step stays visible.
    pub fn teardown(&mut self) {
        self.outgoing = None;
    }
}
