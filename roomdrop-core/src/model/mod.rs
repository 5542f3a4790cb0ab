mod file;
mod peer;
mod role;
mod room;
mod signaling;

pub use file::FileInfo;
pub use peer::PeerId;
pub use role::Role;
pub use room::RoomId;
pub use signaling::{IceCandidate, SignalMessage};
