use crate::transport::TransportConfig;
use roomdrop_core::utils::DEFAULT_MAX_PAYLOAD_BYTES;

/// Settings for one client session.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// WebSocket URL of the relay, e.g. `ws://127.0.0.1:3000/ws`.
    pub server_url: String,
    pub transport: TransportConfig,
    /// Files above this size are refused by `send_files`, since the payload
    /// travels as a single data-channel message.
    pub max_payload_bytes: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "ws://127.0.0.1:3000/ws".to_owned(),
            transport: TransportConfig::default(),
            max_payload_bytes: DEFAULT_MAX_PAYLOAD_BYTES,
        }
    }
}
