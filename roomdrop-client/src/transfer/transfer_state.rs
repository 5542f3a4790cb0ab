/// Steps of the file handshake, for both directions.
///
/// Sender: `Idle -> InfoSent -> ChannelOpen -> Sending -> Done`.
/// Recipient: `Idle -> AwaitingReady -> Receiving -> Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferState {
    Idle,
    /// `fileInfo` emitted, waiting for the recipient's `ready`.
    InfoSent,
    /// `fileInfo` recorded, local transport being prepared before `ready`.
    AwaitingReady,
    ChannelOpen,
    /// Payload handed to the channel, waiting for the recipient to close it.
    Sending,
    /// `ready` emitted, waiting for the payload.
    Receiving,
    Done,
}

impl TransferState {
    /// True while a handshake is underway in either direction.
    pub fn is_active(self) -> bool {
        !matches!(self, TransferState::Idle | TransferState::Done)
    }
}
