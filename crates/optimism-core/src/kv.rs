//! Client-local persistent key-value store.

use crate::error::Result;
use async_trait::async_trait;

/// Small string store that survives client restarts.
///
/// Used for the currently-open session id and for the local override set of
/// the metadata retrier.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> Result<()>;

    async fn remove(&self, key: &str) -> Result<()>;
}
