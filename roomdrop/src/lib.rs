pub use roomdrop_core::model::{FileInfo, PeerId, Role, RoomId};

pub mod model {
    pub use roomdrop_core::model::*;
}

#[cfg(feature = "server")]
pub mod server {
    pub use roomdrop_server::*;
}

#[cfg(feature = "client")]
pub mod client {
    pub use roomdrop_client::*;
}
