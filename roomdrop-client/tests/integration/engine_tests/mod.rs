pub mod test_join_and_roster;
pub mod test_recipient_handshake;
pub mod test_teardown;

use crate::integration::TestEngine;
use crate::utils::{ROOM, joined, wait_for_emitted};

/// Join `ROOM` and let the mock relay confirm with `me` and `existing`.
pub async fn join_as(engine: &mut TestEngine, me: &str, existing: Option<&[&str]>) {
    engine.handle.join_room(ROOM).await.expect("join_room failed");
    wait_for_emitted(&mut engine.relay_out, "join")
        .await
        .expect("join not emitted");

    engine.relay_in.send(joined(me, existing)).await.unwrap();
    engine
        .handle
        .wait_for_state(|s| s.is_joined())
        .await
        .expect("never joined");
}
