use roomdrop_client::{ClientError, ClientEvent, JoinState};
use roomdrop_core::{PeerId, Role, RoomId, SignalMessage};

use crate::integration::engine_tests::join_as;
use crate::integration::{create_test_engine, init_tracing};
use crate::utils::{ROOM, SIGNAL_TIMEOUT_MS, roommate, settle, wait_for_event};

#[tokio::test]
async fn test_join_emits_join_and_publishes_requested_room() {
    init_tracing();
    let engine = create_test_engine();

    engine.handle.join_room(ROOM).await.unwrap();

    let sent = engine.relay.sent().await;
    assert_eq!(
        sent,
        vec![SignalMessage::Join {
            room: RoomId::from(ROOM)
        }]
    );
    let state = engine.handle.state();
    assert_eq!(state.connection_state, JoinState::NotJoined);
    assert_eq!(state.room, Some(RoomId::from(ROOM)));

    assert!(matches!(
        engine.handle.join_room("other").await,
        Err(ClientError::AlreadyJoined(room)) if room == RoomId::from(ROOM)
    ));
    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_second_joiner_is_responder_with_roster() {
    init_tracing();
    let mut engine = create_test_engine();

    join_as(&mut engine, "P2", Some(&["P1"])).await;

    let event = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::Joined { .. })
    })
    .await
    .unwrap();
    assert_eq!(
        event,
        ClientEvent::Joined {
            room: RoomId::from(ROOM),
            my_id: PeerId::from("P2"),
            role: Role::Responder,
        }
    );

    let state = engine.handle.state();
    assert_eq!(state.my_id, Some(PeerId::from("P2")));
    assert_eq!(state.peer_type, Some(Role::Responder));
    assert_eq!(state.peer_ids(), vec![PeerId::from("P1")]);
    assert_eq!(state.peers[0].peer_type, Role::Initiator);

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_roommates_are_added_once() {
    init_tracing();
    let mut engine = create_test_engine();
    join_as(&mut engine, "P1", None).await;
    assert_eq!(engine.handle.state().peer_type, Some(Role::Initiator));

    engine.relay_in.send(roommate("P2")).await.unwrap();
    engine.relay_in.send(roommate("P2")).await.unwrap();
    engine.relay_in.send(roommate("P1")).await.unwrap();

    let event = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::PeerJoined(_))
    })
    .await
    .unwrap();
    assert_eq!(event, ClientEvent::PeerJoined(PeerId::from("P2")));

    settle().await;
    assert_eq!(engine.handle.state().peer_ids(), vec![PeerId::from("P2")]);

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_second_joined_confirmation_is_ignored() {
    init_tracing();
    let mut engine = create_test_engine();
    join_as(&mut engine, "P1", None).await;

    engine
        .relay_in
        .send(SignalMessage::Joined {
            room: RoomId::from("elsewhere"),
            peer_id: PeerId::from("X"),
            existing_peers: Some(vec![PeerId::from("Y")]),
        })
        .await
        .unwrap();
    settle().await;

    let state = engine.handle.state();
    assert_eq!(state.room, Some(RoomId::from(ROOM)));
    assert_eq!(state.my_id, Some(PeerId::from("P1")));
    assert!(state.peers.is_empty());

    engine.handle.shutdown().await;
}

#[tokio::test]
async fn test_room_full_allows_another_join() {
    init_tracing();
    let mut engine = create_test_engine();

    engine.handle.join_room(ROOM).await.unwrap();
    engine
        .relay_in
        .send(SignalMessage::RoomFull {
            room: RoomId::from(ROOM),
        })
        .await
        .unwrap();

    let event = wait_for_event(&mut engine.handle, SIGNAL_TIMEOUT_MS, |e| {
        matches!(e, ClientEvent::RoomFull(_))
    })
    .await
    .unwrap();
    assert_eq!(event, ClientEvent::RoomFull(RoomId::from(ROOM)));

    engine.handle.join_room("r2").await.unwrap();
    assert_eq!(engine.handle.state().room, Some(RoomId::from("r2")));

    engine.handle.shutdown().await;
}
