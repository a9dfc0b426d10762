//! File-backed client-local key-value store.

use super::atomic_json::AtomicJsonFile;
use async_trait::async_trait;
use optimism_core::{KeyValueStore, OptimismError, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

type StateMap = BTreeMap<String, String>;

/// Persists string pairs into a single JSON object on disk.
///
/// Survives process restarts; this is what backs `currentSessionId` and the
/// controls-generation override sets.
#[derive(Clone)]
pub struct FileKeyValueStore {
    file: Arc<AtomicJsonFile<StateMap>>,
}

impl FileKeyValueStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            file: Arc::new(AtomicJsonFile::new(path)),
        }
    }

    /// Opens the store at the default state location.
    pub fn open_default() -> Result<Self> {
        Ok(Self::new(crate::paths::OptimismPaths::state_file()?))
    }

    async fn blocking<R, F>(&self, f: F) -> Result<R>
    where
        R: Send + 'static,
        F: FnOnce(&AtomicJsonFile<StateMap>) -> Result<R> + Send + 'static,
    {
        let file = Arc::clone(&self.file);
        tokio::task::spawn_blocking(move || f(&file))
            .await
            .map_err(|e| OptimismError::internal(format!("State file task failed: {}", e)))?
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.blocking(move |file| Ok(file.load()?.and_then(|mut map| map.remove(&key))))
            .await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let key = key.to_string();
        let value = value.to_string();
        self.blocking(move |file| {
            file.update(StateMap::new(), |map| {
                map.insert(key, value);
            })
        })
        .await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.blocking(move |file| {
            file.update(StateMap::new(), |map| {
                map.remove(&key);
            })
        })
        .await
    }
}
