use bytes::Bytes;
use roomdrop_client::{ClientError, ClientEvent, LocalFile, TransferError, TransportEvent};
use roomdrop_core::utils::DEFAULT_MAX_PAYLOAD_BYTES;
use roomdrop_core::{FileInfo, IceCandidate, PeerId, RoomId, SignalMessage};
use std::path::PathBuf;

use crate::integration::engine_tests::join_as;
use crate::integration::{TestEngine, create_test_engine, init_tracing};
use crate::utils::{
    ROOM, SIGNAL_TIMEOUT_MS, file_info, offer, settle, wait_for_emitted, wait_for_event,
};

async fn recipient() -> TestEngine {
    let mut engine = create_test_engine();
    join_as(&mut engine, "P2", Some(&["P1"])).await;
    engine
}

fn remote_candidate(n: u8) -> SignalMessage {
    SignalMessage::Candidate {
        room: RoomId::from(ROOM),
        target: PeerId::from("P2"),
        from: Some(PeerId::from("P1")),
        candidate: IceCandidate {
            candidate: format!("candidate:{} 1 udp 1 10.0.0.1 600{} typ host", n, n),
            sdp_mid: Some("0".to_owned()),
            sdp_m_line_index: Some(0),
            username_fragment: None,
        },
    }
}

#[tokio::test]
async fn test_file_info_prepares_transport_then_signals_ready() {
    init_tracing();
    let mut engine = recipient().await;

    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();

    let incoming = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::IncomingFile { .. })
    })
    .await
    .unwrap();
    assert_eq!(
        incoming,
        ClientEvent::IncomingFile {
            from: PeerId::from("P1"),
            info: FileInfo::new("a.txt", 5),
        }
    );

    let ready = wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();
    assert_eq!(ready.target(), Some(&PeerId::from("P1")));
    assert_eq!(engine.transports.created(), 1);
    // The answering side never creates the channel itself.
    assert!(engine.transports.latest().calls.is_empty());

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_offer_answer_and_payload_persisted_under_announced_name() {
    init_tracing();
    let mut engine = recipient().await;

    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();

    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    let answer = wait_for_emitted(&mut engine.relay_out, "answer").await.unwrap();
    assert!(matches!(
        &answer,
        SignalMessage::Answer { target, sdp, .. } if target == &PeerId::from("P1") && sdp == "mock-answer"
    ));

    let source = engine.transports.latest_source();
    engine
        .transports
        .inject(TransportEvent::ChannelOpen(source.clone()))
        .await;
    engine
        .transports
        .inject(TransportEvent::Message(source, Bytes::from_static(b"hello")))
        .await;

    let done = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::TransferCompleted { .. })
    })
    .await
    .unwrap();
    assert_eq!(
        done,
        ClientEvent::TransferCompleted {
            peer_id: PeerId::from("P1"),
            info: Some(FileInfo::new("a.txt", 5)),
            saved_to: Some(PathBuf::from("memory").join("a.txt")),
        }
    );
    assert_eq!(
        engine.sink.files(),
        vec![("a.txt".to_owned(), Bytes::from_static(b"hello"))]
    );
    // The recipient closes once the file is persisted.
    assert_eq!(engine.transports.latest().close_count, 1);

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_early_candidates_wait_for_offer() {
    init_tracing();
    let mut engine = recipient().await;

    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();

    engine.relay_in.send(remote_candidate(1)).await.unwrap();
    engine.relay_in.send(remote_candidate(2)).await.unwrap();
    settle().await;
    assert!(engine.transports.latest().candidates.is_empty());

    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    wait_for_emitted(&mut engine.relay_out, "answer").await.unwrap();
    assert_eq!(engine.transports.latest().candidates.len(), 2);

    engine.relay_in.send(remote_candidate(3)).await.unwrap();
    settle().await;
    assert_eq!(engine.transports.latest().candidates.len(), 3);

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_offer_without_file_info_is_ignored() {
    init_tracing();
    let engine = recipient().await;

    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    settle().await;

    assert_eq!(engine.transports.created(), 0);
    assert!(engine.relay.sent_named("answer").await.is_empty());
    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_new_file_info_restarts_stuck_recipient() {
    init_tracing();
    let mut engine = recipient().await;

    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();
    let first = engine.transports.latest_source();

    // The sender gave up and called send_files again.
    engine
        .relay_in
        .send(file_info("P1", "P2", "b.txt", 3))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();

    assert_eq!(engine.relay.sent_named("ready").await.len(), 2);
    assert_eq!(engine.transports.created(), 2);
    assert_eq!(engine.transports.record(0).close_count, 1);

    // The abandoned transport can no longer deliver anything.
    engine
        .transports
        .inject(TransportEvent::Message(first, Bytes::from_static(b"old")))
        .await;

    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    wait_for_emitted(&mut engine.relay_out, "answer").await.unwrap();
    let source = engine.transports.latest_source();
    engine
        .transports
        .inject(TransportEvent::ChannelOpen(source.clone()))
        .await;
    engine
        .transports
        .inject(TransportEvent::Message(source, Bytes::from_static(b"bye")))
        .await;

    let done = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::TransferCompleted { .. })
    })
    .await
    .unwrap();
    assert!(matches!(
        done,
        ClientEvent::TransferCompleted { info: Some(ref info), .. } if info == &FileInfo::new("b.txt", 3)
    ));
    assert_eq!(
        engine.sink.files(),
        vec![("b.txt".to_owned(), Bytes::from_static(b"bye"))]
    );

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_rejected_send_files_leaves_incoming_transfer_running() {
    init_tracing();
    let mut engine = recipient().await;

    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();
    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    wait_for_emitted(&mut engine.relay_out, "answer").await.unwrap();

    assert!(matches!(
        engine.handle.send_files(vec![]).await,
        Err(ClientError::Transfer(TransferError::NoFiles))
    ));
    let oversized = LocalFile::new("big.bin", vec![0u8; DEFAULT_MAX_PAYLOAD_BYTES + 1]);
    assert!(matches!(
        engine.handle.send_files(vec![oversized]).await,
        Err(ClientError::Transfer(TransferError::PayloadTooLarge { .. }))
    ));
    assert_eq!(engine.transports.latest().close_count, 0);
    assert!(engine.relay.sent_named("fileInfo").await.is_empty());

    let source = engine.transports.latest_source();
    engine
        .transports
        .inject(TransportEvent::ChannelOpen(source.clone()))
        .await;
    engine
        .transports
        .inject(TransportEvent::Message(source, Bytes::from_static(b"hello")))
        .await;

    wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::TransferCompleted { saved_to: Some(_), .. })
    })
    .await
    .unwrap();
    assert_eq!(
        engine.sink.files(),
        vec![("a.txt".to_owned(), Bytes::from_static(b"hello"))]
    );

    engine.handle.shutdown().await;
}
