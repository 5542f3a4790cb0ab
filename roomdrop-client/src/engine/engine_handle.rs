use crate::engine::{ClientEvent, EngineCommand};
use crate::error::ClientError;
use crate::session::SessionSnapshot;
use crate::transfer::LocalFile;
use roomdrop_core::{FileInfo, PeerId, RoomId};
use tokio::sync::{mpsc, oneshot, watch};

/// The presentation layer's side of a running [`Engine`](crate::Engine).
pub struct EngineHandle {
    command_tx: mpsc::Sender<EngineCommand>,
    state_rx: watch::Receiver<SessionSnapshot>,
    event_rx: mpsc::UnboundedReceiver<ClientEvent>,
}

impl EngineHandle {
    pub(crate) fn new(
        command_tx: mpsc::Sender<EngineCommand>,
        state_rx: watch::Receiver<SessionSnapshot>,
        event_rx: mpsc::UnboundedReceiver<ClientEvent>,
    ) -> Self {
        Self {
            command_tx,
            state_rx,
            event_rx,
        }
    }

    /// Emit `join` for `room`. The confirmation arrives later as
    /// [`ClientEvent::Joined`] or [`ClientEvent::RoomFull`].
    pub async fn join_room(&self, room: impl Into<RoomId>) -> Result<(), ClientError> {
        let (reply, rx) = oneshot::channel();
        self.request(EngineCommand::JoinRoom {
            room: room.into(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::EngineClosed)?
    }

    /// Offer the first of `files` to the only roommate.
    pub async fn send_files(&self, files: Vec<LocalFile>) -> Result<FileInfo, ClientError> {
        self.send_files_inner(None, files).await
    }

    /// Offer the first of `files` to a specific roommate.
    pub async fn send_files_to(
        &self,
        target: PeerId,
        files: Vec<LocalFile>,
    ) -> Result<FileInfo, ClientError> {
        self.send_files_inner(Some(target), files).await
    }

    async fn send_files_inner(
        &self,
        target: Option<PeerId>,
        files: Vec<LocalFile>,
    ) -> Result<FileInfo, ClientError> {
        let (reply, rx) = oneshot::channel();
        self.request(EngineCommand::SendFiles {
            target,
            files,
            reply,
        })
        .await?;
        rx.await.map_err(|_| ClientError::EngineClosed)?
    }

    /// Stop the engine and wait until it has released everything.
    pub async fn shutdown(&self) {
        if self.command_tx.send(EngineCommand::Shutdown).await.is_ok() {
            self.command_tx.closed().await;
        }
    }

    /// Current room state.
    pub fn state(&self) -> SessionSnapshot {
        self.state_rx.borrow().clone()
    }

    /// Wait until the room state satisfies `f`.
    pub async fn wait_for_state(
        &self,
        f: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Result<SessionSnapshot, ClientError> {
        let mut rx = self.state_rx.clone();
        let snapshot = rx.wait_for(f).await.map_err(|_| ClientError::EngineClosed)?;
        Ok(snapshot.clone())
    }

    /// Next lifecycle notification, in the order they happened.
    pub async fn next_event(&mut self) -> Option<ClientEvent> {
        self.event_rx.recv().await
    }

    async fn request(&self, cmd: EngineCommand) -> Result<(), ClientError> {
        self.command_tx
            .send(cmd)
            .await
            .map_err(|_| ClientError::EngineClosed)
    }
}
