pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";

/// Rooms are capped at two occupants: one sender and one recipient.
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

/// Largest payload a single data-channel message may carry.
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 65_536;
