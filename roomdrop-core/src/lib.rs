pub mod model;
pub mod utils;

pub use model::{FileInfo, IceCandidate, PeerId, Role, RoomId, SignalMessage};
