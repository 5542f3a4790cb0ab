use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use roomdrop_client::{
    ClientConfig, ClientEvent, DirectorySink, Engine, LocalFile, TransportConfig,
};
use roomdrop_core::{FileInfo, Role};
use roomdrop_server::ServerConfig;

use crate::integration::init_tracing;
use crate::utils::{TRANSFER_TIMEOUT_MS, wait_for_event};

async fn spawn_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind relay");
    let addr = listener.local_addr().expect("No local address");
    tokio::spawn(roomdrop_server::serve(listener, ServerConfig::default()));
    addr
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_file_is_persisted_under_announced_name() {
    init_tracing();
    let addr = spawn_relay().await;
    let dir = tempfile::tempdir().unwrap();

    let config = ClientConfig {
        server_url: format!("ws://{}/ws", addr),
        transport: TransportConfig::local(),
        ..ClientConfig::default()
    };

    let mut sender = Engine::start(
        config.clone(),
        Arc::new(DirectorySink::new(dir.path().join("sender-inbox"))),
    )
    .await
    .expect("Sender failed to start");
    let mut receiver = Engine::start(
        config,
        Arc::new(DirectorySink::new(dir.path().join("inbox"))),
    )
    .await
    .expect("Receiver failed to start");

    sender.join_room("r1").await.unwrap();
    let joined = sender.wait_for_state(|s| s.is_joined()).await.unwrap();
    assert_eq!(joined.peer_type, Some(Role::Initiator));

    receiver.join_room("r1").await.unwrap();
    let joined = receiver.wait_for_state(|s| s.is_joined()).await.unwrap();
    assert_eq!(joined.peer_type, Some(Role::Responder));
    sender
        .wait_for_state(|s| !s.peers.is_empty())
        .await
        .unwrap();

    let source = dir.path().join("a.txt");
    tokio::fs::write(&source, b"hello").await.unwrap();
    let file = LocalFile::read(&source).await.unwrap();

    let info = sender.send_files(vec![file]).await.unwrap();
    assert_eq!(info, FileInfo::new("a.txt", 5));

    let received = wait_for_event(&mut receiver, TRANSFER_TIMEOUT_MS, |e| {
        matches!(
            e,
            ClientEvent::TransferCompleted { .. } | ClientEvent::TransferFailed { .. }
        )
    })
    .await
    .expect("Receiver never finished");
    let path = match received {
        ClientEvent::TransferCompleted {
            saved_to: Some(path),
            ..
        } => path,
        other => panic!("Receiver failed: {:?}", other),
    };
    assert_eq!(path, dir.path().join("inbox").join("a.txt"));
    assert_eq!(tokio::fs::read(&path).await.unwrap(), b"hello");

    let sent = wait_for_event(&mut sender, TRANSFER_TIMEOUT_MS, |e| {
        matches!(
            e,
            ClientEvent::TransferCompleted { .. } | ClientEvent::TransferFailed { .. }
        )
    })
    .await
    .expect("Sender never finished");
    assert!(
        matches!(sent, ClientEvent::TransferCompleted { saved_to: None, .. }),
        "Sender failed: {:?}",
        sent
    );

    sender.shutdown().await;
    receiver.shutdown().await;
}
