use async_trait::async_trait;
use bytes::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

const FALLBACK_NAME: &str = "download";

/// Where received payloads end up.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Persist `data` under `name`, returning where it was stored.
    async fn persist(&self, name: &str, data: Bytes) -> io::Result<PathBuf>;
}

/// Writes received files into one directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

/// Strip any directory part a sender may have put in the announced name.
pub fn sanitize_file_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_NAME)
        .to_owned()
}

#[async_trait]
impl FileSink for DirectorySink {
    async fn persist(&self, name: &str, data: Bytes) -> io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(sanitize_file_name(name));
        tokio::fs::write(&path, &data).await?;
        info!("Saved {} bytes to {}", data.len(), path.display());
        Ok(path)
    }
}
