//! Client configuration model.
//!
//! Loaded from `config.toml` by the infrastructure layer. Every field has a
//! default so a partial (or missing) file is always usable.

use crate::session::AiProvider;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_STORE_URL: &str = "http://localhost:8000";
pub const DEFAULT_USER_ID: &str = "default-user";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1000);
pub const DEFAULT_HEARTBEAT_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_RECONCILE_DELAY: Duration = Duration::from_millis(2000);

/// Environment variable read for the generation API key.
pub const API_KEY_ENV: &str = "OPTIMISM_API_KEY";
/// Environment variable that overrides `store_url`.
pub const STORE_URL_ENV: &str = "OPTIMISM_STORE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub store_url: String,
    pub poll_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_failure_threshold: u32,
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub researcher_id: Option<String>,
    pub generation: GenerationConfig,
    pub retry: RetryConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            store_url: DEFAULT_STORE_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL.as_millis() as u64,
            heartbeat_interval_ms: crate::session::HEARTBEAT_INTERVAL.as_millis() as u64,
            heartbeat_failure_threshold: DEFAULT_HEARTBEAT_FAILURE_THRESHOLD,
            user_id: DEFAULT_USER_ID.to_string(),
            researcher_id: None,
            generation: GenerationConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

/// Which text-generation provider the client talks to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub provider: AiProvider,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Name of an environment variable holding the key. Keys are never
    /// stored in the config file itself.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::Google,
            model: "gemini-2.5-flash".to_string(),
            endpoint: None,
            api_key_env: None,
        }
    }
}

impl GenerationConfig {
    /// Resolves the API key: `OPTIMISM_API_KEY` first, then `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| {
                self.api_key_env
                    .as_deref()
                    .and_then(|name| std::env::var(name).ok())
            })
            .filter(|key| !key.trim().is_empty())
    }
}

/// Backoff policy of the metadata-persistence retrier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub reconcile_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            reconcile_delay_ms: DEFAULT_RECONCILE_DELAY.as_millis() as u64,
        }
    }
}
