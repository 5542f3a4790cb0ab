use bytes::Bytes;
use roomdrop_client::{ClientError, ClientEvent, LocalFile, TransferState, TransportEvent};
use roomdrop_core::SignalMessage;

use crate::integration::engine_tests::join_as;
use crate::integration::{create_test_engine, create_test_engine_with, init_tracing};
use crate::utils::{
    MockTransportFactory, SIGNAL_TIMEOUT_MS, file_info, offer, ready, roommate, settle,
    wait_for_emitted, wait_for_event,
};

#[tokio::test]
async fn test_shutdown_releases_transports_once() {
    init_tracing();
    let mut engine = create_test_engine();
    join_as(&mut engine, "P2", Some(&["P1"])).await;
    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();

    engine.handle.shutdown().await;
    engine.handle.shutdown().await;

    assert_eq!(engine.transports.latest().close_count, 1);
    assert_eq!(engine.relay.disconnect_count(), 1);
    assert!(matches!(
        engine.handle.join_room("r2").await,
        Err(ClientError::EngineClosed)
    ));
}

#[tokio::test]
async fn test_relay_loss_keeps_open_channel_delivering() {
    init_tracing();
    let mut engine = create_test_engine();
    join_as(&mut engine, "P2", Some(&["P1"])).await;
    engine
        .relay_in
        .send(file_info("P1", "P2", "a.txt", 5))
        .await
        .unwrap();
    wait_for_emitted(&mut engine.relay_out, "ready").await.unwrap();
    engine.relay_in.send(offer("P1", "P2")).await.unwrap();
    wait_for_emitted(&mut engine.relay_out, "answer").await.unwrap();
    let source = engine.transports.latest_source();
    engine
        .transports
        .inject(TransportEvent::ChannelOpen(source.clone()))
        .await;
    settle().await;

    drop(engine.relay_in);

    let event = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Disconnected | ClientEvent::TransferFailed { .. })
    })
    .await
    .unwrap();
    assert_eq!(event, ClientEvent::Disconnected);
    assert_eq!(engine.transports.latest().close_count, 0);

    engine
        .transports
        .inject(TransportEvent::Message(source, Bytes::from_static(b"hello")))
        .await;
    let done = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(
            e,
            ClientEvent::TransferCompleted { .. } | ClientEvent::TransferFailed { .. }
        )
    })
    .await
    .unwrap();
    assert!(matches!(
        done,
        ClientEvent::TransferCompleted { saved_to: Some(_), .. }
    ));
    assert_eq!(
        engine.sink.files(),
        vec![("a.txt".to_owned(), Bytes::from_static(b"hello"))]
    );

    engine.handle.shutdown().await;
    assert_eq!(engine.relay.disconnect_count(), 1);
}

#[tokio::test]
async fn test_relay_loss_fails_transfers_still_negotiating() {
    init_tracing();
    let mut engine = create_test_engine();
    join_as(&mut engine, "P1", None).await;
    engine.relay_in.send(roommate("P2")).await.unwrap();
    engine
        .handle
        .wait_for_state(|s| !s.peers.is_empty())
        .await
        .unwrap();
    engine
        .handle
        .send_files(vec![LocalFile::new("a.txt", b"hello".to_vec())])
        .await
        .unwrap();

    drop(engine.relay_in);

    wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Disconnected)
    })
    .await
    .unwrap();
    let failed = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::TransferFailed { .. })
    })
    .await
    .unwrap();
    assert!(matches!(
        failed,
        ClientEvent::TransferFailed { state: TransferState::InfoSent, .. }
    ));

    // Still serving commands until shut down, but nothing new can be negotiated.
    assert!(engine.handle.state().is_joined());
    assert!(matches!(
        engine
            .handle
            .send_files(vec![LocalFile::new("a.txt", b"hello".to_vec())])
            .await,
        Err(ClientError::RelayLost)
    ));
    engine.handle.shutdown().await;
    assert!(matches!(
        engine.handle.send_files(vec![]).await,
        Err(ClientError::EngineClosed)
    ));
}

#[tokio::test]
async fn test_transport_creation_failure_fails_transfer() {
    init_tracing();
    let mut engine = create_test_engine_with(MockTransportFactory::failing());
    join_as(&mut engine, "P1", None).await;
    engine.relay_in.send(roommate("P2")).await.unwrap();
    engine
        .handle
        .wait_for_state(|s| !s.peers.is_empty())
        .await
        .unwrap();

    engine
        .handle
        .send_files(vec![LocalFile::new("a.txt", b"hello".to_vec())])
        .await
        .unwrap();
    engine.relay_in.send(ready("P2", "P1")).await.unwrap();

    let failed = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::TransferFailed { .. })
    })
    .await
    .unwrap();
    assert!(matches!(
        failed,
        ClientEvent::TransferFailed { state: TransferState::InfoSent, .. }
    ));
    assert!(
        !engine
            .relay
            .sent()
            .await
            .iter()
            .any(|m| matches!(m, SignalMessage::Offer { .. }))
    );
    engine.handle.shutdown().await;
}
