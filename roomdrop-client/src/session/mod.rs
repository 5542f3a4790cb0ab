mod room_session;
mod snapshot;

pub use room_session::*;
pub use snapshot::*;
