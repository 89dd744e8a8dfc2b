use std::fmt::Display;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::error::AppResult;

/// Keys for locally persisted state
///
/// Each key maps to one JSON file under the data directory. Payloads are
/// versionless; anything unreadable is treated as absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    TagWeights,
    Favorites,
}

impl Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreKey::TagWeights => write!(f, "tag_weights"),
            StoreKey::Favorites => write!(f, "favorites"),
        }
    }
}

/// Message for asynchronous store writes
struct StoreWriteMessage {
    path: PathBuf,
    json: String,
}

/// Durable local key-value store backed by JSON files
///
/// The analog of the browser's namespaced localStorage: one file per key
/// under a per-user data directory. Reads happen synchronously at startup;
/// writes go through a background task so mutations never wait on disk.
#[derive(Clone)]
pub struct LocalStore {
    data_dir: PathBuf,
    write_tx: mpsc::UnboundedSender<StoreWriteMessage>,
}

/// Handle for gracefully shutting down the store writer
pub struct StoreWriterHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl StoreWriterHandle {
    /// Initiates a graceful shutdown of the store writer
    ///
    /// Sends a shutdown signal to the writer task and waits for it to flush
    /// all pending writes to disk.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        tracing::info!("Store writer shutdown signal sent");
    }
}

impl LocalStore {
    /// Opens the store, creating the data directory if needed
    ///
    /// Spawns a background task that processes writes asynchronously,
    /// preventing persistence from blocking swipe handling.
    pub async fn open(data_dir: &Path) -> AppResult<(Self, StoreWriterHandle)> {
        std::fs::create_dir_all(data_dir)?;

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(async move {
            Self::store_writer_task(write_rx, shutdown_rx).await;
        });

        let store = Self {
            data_dir: data_dir.to_path_buf(),
            write_tx,
        };

        let handle = StoreWriterHandle { shutdown_tx };

        Ok((store, handle))
    }

    /// Background task that processes store write messages
    ///
    /// Continuously receives write requests from the channel and writes them
    /// to disk. On shutdown signal, flushes all remaining messages before
    /// exiting.
    async fn store_writer_task(
        mut write_rx: mpsc::UnboundedReceiver<StoreWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Store writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = tokio::fs::write(&msg.path, &msg.json).await {
                        tracing::error!(path = %msg.path.display(), error = %e, "Failed to persist local state");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = tokio::fs::write(&msg.path, &msg.json).await {
                            tracing::error!(path = %msg.path.display(), error = %e, "Failed to flush local state during shutdown");
                        }
                    }

                    tracing::debug!("Store writer task stopped");
                    break;
                }
            }
        }
    }

    fn file_path(&self, key: StoreKey) -> PathBuf {
        self.data_dir.join(format!("{}.json", key))
    }

    /// Loads a value from the store by key
    ///
    /// A missing file, unreadable file, or corrupt payload all read as
    /// `None`; callers fall back to their defaults and the next persist
    /// rewrites the file.
    pub fn load<T: serde::de::DeserializeOwned>(&self, key: StoreKey) -> Option<T> {
        let path = self.file_path(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Local state read failed, using defaults");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Local state corrupt, using defaults");
                None
            }
        }
    }

    /// Persists a value asynchronously without blocking
    ///
    /// Serializes the value and hands it to the background writer. The
    /// caller's in-memory state is authoritative; a failed write only logs.
    pub fn persist_in_background<T: serde::Serialize>(&self, key: StoreKey, value: &T) {
        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(key = %key, error = %e, "Local state serialization error");
                return;
            }
        };

        let msg = StoreWriteMessage {
            path: self.file_path(key),
            json,
        };

        if let Err(e) = self.write_tx.send(msg) {
            tracing::error!(key = %key, error = %e, "Failed to send store write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_store_key_display() {
        assert_eq!(format!("{}", StoreKey::TagWeights), "tag_weights");
        assert_eq!(format!("{}", StoreKey::Favorites), "favorites");
    }

    #[tokio::test]
    async fn test_load_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _handle) = LocalStore::open(dir.path()).await.unwrap();

        let loaded: Option<Vec<String>> = store.load(StoreKey::Favorites);
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_persist_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = LocalStore::open(dir.path()).await.unwrap();

        let mut weights = HashMap::new();
        weights.insert("歌".to_string(), 1.0_f64);
        weights.insert("ゲーム".to_string(), -0.3_f64);

        store.persist_in_background(StoreKey::TagWeights, &weights);
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let loaded: Option<HashMap<String, f64>> = store.load(StoreKey::TagWeights);
        assert_eq!(loaded, Some(weights));
    }

    #[tokio::test]
    async fn test_corrupt_payload_reads_as_absence() {
        let dir = tempfile::tempdir().unwrap();
        let (store, _handle) = LocalStore::open(dir.path()).await.unwrap();

        std::fs::write(dir.path().join("tag_weights.json"), "{not json").unwrap();

        let loaded: Option<HashMap<String, f64>> = store.load(StoreKey::TagWeights);
        assert_eq!(loaded, None);
    }

    #[tokio::test]
    async fn test_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let (store, handle) = LocalStore::open(dir.path()).await.unwrap();

        store.persist_in_background(StoreKey::Favorites, &vec!["a".to_string()]);
        store.persist_in_background(
            StoreKey::Favorites,
            &vec!["a".to_string(), "b".to_string()],
        );
        handle.shutdown().await;
        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        let loaded: Option<Vec<String>> = store.load(StoreKey::Favorites);
        assert_eq!(loaded, Some(vec!["a".to_string(), "b".to_string()]));
    }
}
