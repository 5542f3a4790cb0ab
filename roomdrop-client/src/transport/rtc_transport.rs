use crate::transport::{
    Transport, TransportConfig, TransportEvent, TransportFactory, TransportSource,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use roomdrop_core::IceCandidate;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::data_channel::RTCDataChannel;
use webrtc::data_channel::data_channel_message::DataChannelMessage;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;

type SharedChannel = Arc<Mutex<Option<Arc<RTCDataChannel>>>>;

/// [`Transport`] backed by a webrtc-rs peer connection.
pub struct RtcTransport {
    source: TransportSource,
    peer_connection: Arc<RTCPeerConnection>,
    data_channel: SharedChannel,
    event_tx: mpsc::Sender<TransportEvent>,
    closed: AtomicBool,
}

impl RtcTransport {
    pub async fn new(
        source: TransportSource,
        config: TransportConfig,
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut media_engine = MediaEngine::default();
        media_engine.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut media_engine)?;

        let api = APIBuilder::new()
            .with_media_engine(media_engine)
            .with_interceptor_registry(registry)
            .build();

        let ice_servers = if config.ice_servers.is_empty() {
            vec![]
        } else {
            vec![RTCIceServer {
                urls: config.ice_servers,
                ..Default::default()
            }]
        };
        let rtc_config = RTCConfiguration {
            ice_servers,
            ..Default::default()
        };

        let peer_connection = Arc::new(
            api.new_peer_connection(rtc_config)
                .await
                .context("Failed to create peer connection")?,
        );
        let data_channel: SharedChannel = Arc::new(Mutex::new(None));

        let state_tx = event_tx.clone();
        let state_source = source.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let source = state_source.clone();
                Box::pin(async move {
                    info!("Peer connection to {} is now {:?}", source.peer_id, s);
                    if matches!(
                        s,
                        RTCPeerConnectionState::Failed
                            | RTCPeerConnectionState::Disconnected
                            | RTCPeerConnectionState::Closed
                    ) {
                        let _ = tx.send(TransportEvent::Disconnected(source)).await;
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let ice_source = source.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let source = ice_source.clone();
            Box::pin(async move {
                let Some(candidate) = c else {
                    debug!("Candidate discovery for {} ended", source.peer_id);
                    return;
                };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(source, from_rtc_init(init)))
                    .await;
            })
        }));

        let dc_tx = event_tx.clone();
        let dc_source = source.clone();
        let dc_slot = data_channel.clone();
        peer_connection.on_data_channel(Box::new(move |dc: Arc<RTCDataChannel>| {
            let tx = dc_tx.clone();
            let source = dc_source.clone();
            let slot = dc_slot.clone();
            Box::pin(async move {
                debug!(
                    "Received data channel '{}' from {}",
                    dc.label(),
                    source.peer_id
                );
                attach_channel_handlers(&dc, &source, &tx);
                *slot.lock().await = Some(dc);
            })
        }));

        Ok(Self {
            source,
            peer_connection,
            data_channel,
            event_tx,
            closed: AtomicBool::new(false),
        })
    }
}

fn attach_channel_handlers(
    dc: &Arc<RTCDataChannel>,
    source: &TransportSource,
    event_tx: &mpsc::Sender<TransportEvent>,
) {
    let tx = event_tx.clone();
    let open_source = source.clone();
    dc.on_open(Box::new(move || {
        let tx = tx.clone();
        let source = open_source.clone();
        Box::pin(async move {
            info!("Data channel to {} open", source.peer_id);
            let _ = tx.send(TransportEvent::ChannelOpen(source)).await;
        })
    }));

    let tx = event_tx.clone();
    let msg_source = source.clone();
    dc.on_message(Box::new(move |msg: DataChannelMessage| {
        let tx = tx.clone();
        let source = msg_source.clone();
        Box::pin(async move {
            let _ = tx.send(TransportEvent::Message(source, msg.data)).await;
        })
    }));

    let tx = event_tx.clone();
    let close_source = source.clone();
    dc.on_close(Box::new(move || {
        let tx = tx.clone();
        let source = close_source.clone();
        Box::pin(async move {
            debug!("Data channel to {} closed", source.peer_id);
            let _ = tx.send(TransportEvent::ChannelClosed(source)).await;
        })
    }));
}

fn to_rtc_init(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn from_rtc_init(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

#[async_trait]
impl Transport for RtcTransport {
    async fn open_data_channel(&self, label: &str) -> Result<()> {
        let dc = self
            .peer_connection
            .create_data_channel(label, None)
            .await
            .context("Failed to create data channel")?;
        attach_channel_handlers(&dc, &self.source, &self.event_tx);
        *self.data_channel.lock().await = Some(dc);
        Ok(())
    }

    async fn create_offer(&self) -> Result<String> {
        let offer = self
            .peer_connection
            .create_offer(None)
            .await
            .context("Failed to create offer")?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await
            .context("Failed to set local description")?;
        Ok(offer.sdp)
    }

    async fn accept_offer(&self, sdp: String) -> Result<String> {
        let offer = RTCSessionDescription::offer(sdp)?;
        self.peer_connection
            .set_remote_description(offer)
            .await
            .context("Failed to set remote offer")?;

        let answer = self
            .peer_connection
            .create_answer(None)
            .await
            .context("Failed to create answer")?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await
            .context("Failed to set local description")?;
        Ok(answer.sdp)
    }

    async fn accept_answer(&self, sdp: String) -> Result<()> {
        let answer = RTCSessionDescription::answer(sdp)?;
        self.peer_connection
            .set_remote_description(answer)
            .await
            .context("Failed to set remote answer")?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_init(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn send(&self, data: Bytes) -> Result<()> {
        let dc = self
            .data_channel
            .lock()
            .await
            .clone()
            .context("Data channel not available")?;
        dc.send(&data).await.context("Failed to send message")?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(dc) = self.data_channel.lock().await.take() {
            dc.close().await.context("Failed to close data channel")?;
        }
        self.peer_connection
            .close()
            .await
            .context("Failed to close peer connection")?;
        Ok(())
    }
}

/// Creates an [`RtcTransport`] for every negotiation.
#[derive(Clone, Default)]
pub struct RtcTransportFactory {
    config: TransportConfig,
}

impl RtcTransportFactory {
    pub fn new(config: TransportConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl TransportFactory for RtcTransportFactory {
    async fn create(
        &self,
        source: TransportSource,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn Transport>> {
        let transport = RtcTransport::new(source, self.config.clone(), events).await?;
        Ok(Box::new(transport))
    }
}
