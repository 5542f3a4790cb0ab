use crate::error::ClientError;
use crate::relay::RelayOutput;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use roomdrop_core::SignalMessage;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Capacity of the inbound queue between the reader task and the engine.
const INBOUND_QUEUE: usize = 256;

/// Persistent WebSocket link to the rendezvous relay.
///
/// Inbound frames are decoded into [`SignalMessage`]s and pushed into a single
/// channel; the engine is the only consumer and fans them out by event type.
pub struct RelayLink {
    outbound: mpsc::UnboundedSender<Message>,
    reader: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl RelayLink {
    pub async fn connect(
        server_uri: &str,
    ) -> Result<(Arc<Self>, mpsc::Receiver<SignalMessage>), ClientError> {
        let (ws_stream, _) =
            connect_async(server_uri)
                .await
                .map_err(|e| ClientError::RelayConnect {
                    url: server_uri.to_owned(),
                    source: Box::new(e),
                })?;
        info!("Connected to relay {}", server_uri);

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);

        tokio::spawn(async move {
            while let Some(msg) = outbound_rx.recv().await {
                let closing = matches!(msg, Message::Close(_));
                if let Err(e) = write.send(msg).await {
                    warn!("Relay send failed: {}", e);
                    break;
                }
                if closing {
                    break;
                }
            }
            debug!("Relay writer finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = read.next().await {
                let text = match frame {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Relay connection lost: {}", e);
                        break;
                    }
                };

                match serde_json::from_str::<SignalMessage>(&text) {
                    Ok(signal) => {
                        if inbound_tx.send(signal).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid message from relay: {} ({})", e, text.as_str()),
                }
            }
            info!("Relay link closed");
        });

        let link = Arc::new(Self {
            outbound: outbound_tx,
            reader: Mutex::new(Some(reader)),
            closed: AtomicBool::new(false),
        });

        Ok((link, inbound_rx))
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[async_trait]
impl RelayOutput for RelayLink {
    async fn emit(&self, msg: SignalMessage) {
        if self.is_closed() {
            debug!("Relay link closed, dropping '{}'", msg.event_name());
            return;
        }
        match serde_json::to_string(&msg) {
            Ok(json) => {
                debug!("-> relay: {}", msg.event_name());
                if self.outbound.send(Message::Text(json.into())).is_err() {
                    error!("Relay writer is gone, '{}' not sent", msg.event_name());
                }
            }
            Err(e) => error!("Failed to serialize signal message: {}", e),
        }
    }

    async fn disconnect(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let _ = self.outbound.send(Message::Close(None));
        if let Some(reader) = self.reader.lock().await.take() {
            reader.abort();
        }
        info!("Disconnected from relay");
    }
}
