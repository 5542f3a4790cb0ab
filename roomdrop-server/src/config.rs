use crate::error::RelayError;
use roomdrop_core::utils::DEFAULT_ROOM_CAPACITY;
use std::net::SocketAddr;

pub const ADDR_ENV: &str = "ROOMDROP_ADDR";
pub const ROOM_CAPACITY_ENV: &str = "ROOMDROP_ROOM_CAPACITY";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    /// Peers admitted per room before `roomFull` is answered.
    pub room_capacity: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            room_capacity: DEFAULT_ROOM_CAPACITY,
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `ROOMDROP_ADDR` and `ROOMDROP_ROOM_CAPACITY` when set.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let mut config = Self::default();

        if let Some(value) = lookup(ADDR_ENV) {
            config.addr = value.parse().map_err(|_| RelayError::InvalidConfig {
                key: ADDR_ENV,
                value: value.clone(),
            })?;
        }

        if let Some(value) = lookup(ROOM_CAPACITY_ENV) {
            config.room_capacity = value
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| RelayError::InvalidConfig {
                    key: ROOM_CAPACITY_ENV,
                    value: value.clone(),
                })?;
        }

        Ok(config)
    }
}
