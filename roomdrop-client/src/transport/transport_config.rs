use roomdrop_core::utils::{DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2};

/// WebRTC settings. Only STUN servers are supported.
#[derive(Clone, Debug)]
pub struct TransportConfig {
    /// An empty list restricts ICE to host candidates, which is enough on one machine.
    pub ice_servers: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_STUN_ADDR.to_owned(), DEFAULT_STUN_ADDR_2.to_owned()],
        }
    }
}

impl TransportConfig {
    pub fn local() -> Self {
        Self {
            ice_servers: Vec::new(),
        }
    }
}
