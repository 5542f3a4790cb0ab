use crate::transport::{TransportEvent, TransportSource};
use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use roomdrop_core::IceCandidate;
use tokio::sync::mpsc;

/// One direct connection to one remote peer, carrying one data channel.
///
/// Progress is reported asynchronously through the [`TransportEvent`] sender
/// the transport was created with.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Create the local data channel. Only the offering side calls this; the
    /// answering side receives the channel from its peer.
    async fn open_data_channel(&self, label: &str) -> Result<()>;

    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<String>;

    /// Install a remote offer, then create and install the answer.
    async fn accept_offer(&self, sdp: String) -> Result<String>;

    /// Install the remote answer to our offer.
    async fn accept_answer(&self, sdp: String) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Send one message over the open data channel.
    async fn send(&self, data: Bytes) -> Result<()>;

    /// Close the data channel and the connection. Must tolerate repeated calls.
    async fn close(&self) -> Result<()>;
}

/// Builds transports on demand, one per negotiation.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn create(
        &self,
        source: TransportSource,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn Transport>>;
}
