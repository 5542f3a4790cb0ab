use crate::signaling::SignalingService;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use roomdrop_core::{PeerId, SignalMessage};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(service): State<SignalingService>,
) -> impl IntoResponse {
    let peer_id = PeerId::new();

    ws.on_upgrade(move |socket| handle_socket(socket, peer_id, service))
}

async fn handle_socket(socket: WebSocket, peer_id: PeerId, service: SignalingService) {
    info!("New WebSocket connection: {}", peer_id);

    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel();

    service.add_peer(peer_id.clone(), tx);

    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender.send(msg).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let service = service.clone();
        let peer_id = peer_id.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<SignalMessage>(&text) {
                        Ok(signal) => handle_signal(&service, &peer_id, signal).await,
                        Err(e) => warn!("Invalid SignalMessage from {}: {:?}", peer_id, e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    service.remove_peer(&peer_id).await;
    info!("WebSocket disconnected: {}", peer_id);
}

async fn handle_signal(
    service: &SignalingService,
    peer_id: &PeerId,
    signal: SignalMessage,
) {
    let room = service.room_of(peer_id);
    match signal {
        SignalMessage::Join { room: requested } => {
            if let Some(current) = room {
                warn!(
                    "{} asked for room '{}' while in '{}', ignoring",
                    peer_id, requested, current
                );
                return;
            }
            info!("Peer {} wants to join room '{}'", peer_id, requested);
            service.join(&requested, peer_id.clone()).await;
        }

        signal if signal.is_peer_addressed() => {
            let Some(current) = room else {
                warn!(
                    "Dropping '{}' from {}: not in a room",
                    signal.event_name(),
                    peer_id
                );
                return;
            };
            if signal.room() != &current {
                warn!(
                    "Dropping '{}' from {} for room '{}' it has not joined",
                    signal.event_name(),
                    peer_id,
                    signal.room()
                );
                return;
            }
            service.forward(&current, peer_id.clone(), signal).await;
        }

        other => debug!(
            "Ignoring relay-only event '{}' from {}",
            other.event_name(),
            peer_id
        ),
    }
}
