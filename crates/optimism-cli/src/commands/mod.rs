pub mod formalize;
pub mod health;
pub mod provider;
pub mod session;
pub mod watch;

use anyhow::{Context, Result};
use optimism_application::MetadataPersister;
use optimism_core::session::Session;
use optimism_core::{ClientConfig, KeyValueStore, TextGenerator, now_millis};
use optimism_infrastructure::{ConfigService, FileKeyValueStore, HttpSessionStore};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared wiring for every subcommand.
pub struct AppContext {
    pub config: ClientConfig,
    pub store: Arc<HttpSessionStore>,
}

impl AppContext {
    pub fn load(config_path: Option<PathBuf>, store_url: Option<String>) -> Result<Self> {
        let service = match config_path {
            Some(path) => ConfigService::with_path(path),
            None => ConfigService::new(),
        };
        let mut config = service.get_config().context("Failed to load config")?;
        if let Some(url) = store_url {
            config.store_url = url.trim_end_matches('/').to_string();
        }

        tracing::debug!("[CLI] Using session store at {}", config.store_url);
        let store = Arc::new(HttpSessionStore::new(config.store_url.clone()));
        Ok(Self { config, store })
    }

    pub fn key_value_store(&self) -> Result<Arc<dyn KeyValueStore>> {
        let kv = FileKeyValueStore::open_default().context("Failed to open local state")?;
        Ok(Arc::new(kv))
    }

    pub fn persister(&self) -> Result<MetadataPersister> {
        Ok(MetadataPersister::from_config(
            self.store.clone(),
            self.key_value_store()?,
            &self.config.retry,
        ))
    }

    /// Generator from the config file, or from the session's stored provider
    /// configuration when no key is configured locally.
    pub async fn generator(&self, session_id: &str) -> Result<Arc<dyn TextGenerator>> {
        let generation = &self.config.generation;
        if let Some(key) = generation.api_key() {
            return Ok(optimism_interaction::build_generator(
                generation.provider,
                Some(&key),
                &generation.model,
                generation.endpoint.as_deref(),
            )?);
        }

        match self.store.ai_config_key(session_id).await? {
            Some(stored) => {
                tracing::info!(
                    "[CLI] Using provider configured on session {}: {} {}",
                    session_id,
                    stored.provider,
                    stored.model
                );
                Ok(optimism_interaction::build_generator(
                    stored.provider,
                    Some(&stored.api_key),
                    &stored.model,
                    stored.endpoint.as_deref(),
                )?)
            }
            None if !generation.provider.requires_api_key() => {
                Ok(optimism_interaction::build_generator(
                    generation.provider,
                    None,
                    &generation.model,
                    generation.endpoint.as_deref(),
                )?)
            }
            None => anyhow::bail!(
                "No API key: set OPTIMISM_API_KEY or configure a provider on session {}",
                session_id
            ),
        }
    }
}

/// One-line summary used by `list` and `watch`.
pub fn summarize(session: &Session) -> String {
    let presence = if optimism_core::session::is_connected(session.last_activity, now_millis()) {
        "connected"
    } else {
        "idle"
    };
    let ready = if session.ready_to_formalize {
        " ready-to-formalize"
    } else {
        ""
    };
    format!(
        "{}  {:<12} {:<10} {:>3} msgs  {}{}",
        session.id,
        session.mode.as_ref(),
        session.status.as_ref(),
        session.messages.len(),
        presence,
        ready
    )
}

pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
