//! Explicit holder of the currently open session id.

use optimism_core::{KeyValueStore, Result};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Local key remembering the open session across restarts.
pub const CURRENT_SESSION_KEY: &str = "currentSessionId";

/// The client's notion of "the session I am in".
///
/// Loaded once at startup from the local key-value store and written through
/// on every change, so a restarted client resumes the same session.
#[derive(Clone)]
pub struct SessionContext {
    kv: Arc<dyn KeyValueStore>,
    current: Arc<RwLock<Option<String>>>,
}

impl SessionContext {
    /// Reads the remembered session id, if any.
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> Result<Self> {
        let current = kv.get(CURRENT_SESSION_KEY).await?;
        if let Some(id) = &current {
            tracing::debug!("[SessionContext] Resuming remembered session {}", id);
        }
        Ok(Self {
            kv,
            current: Arc::new(RwLock::new(current)),
        })
    }

    pub async fn current(&self) -> Option<String> {
        self.current.read().await.clone()
    }

    pub async fn set_current(&self, session_id: &str) -> Result<()> {
        self.kv.set(CURRENT_SESSION_KEY, session_id).await?;
        *self.current.write().await = Some(session_id.to_string());
        Ok(())
    }

    /// Forgets the open session (logout, replacement).
    pub async fn clear(&self) -> Result<()> {
        self.kv.remove(CURRENT_SESSION_KEY).await?;
        *self.current.write().await = None;
        Ok(())
    }

    pub fn key_value_store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.kv)
    }
}
