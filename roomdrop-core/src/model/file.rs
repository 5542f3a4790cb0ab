use serde::{Deserialize, Serialize};

/// Announcement of the file a sender is about to push.
///
/// Sender-authoritative and informational: the recipient never checks `size`
/// against the bytes that actually arrive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
}

impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
        }
    }
}
