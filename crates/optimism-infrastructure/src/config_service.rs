//! Configuration service implementation.
//!
//! Loads `ClientConfig` from `~/.config/optimism/config.toml` (or an explicit
//! path), applies environment overrides, and caches the result.

use crate::paths::OptimismPaths;
use optimism_core::config::STORE_URL_ENV;
use optimism_core::{ClientConfig, Result};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Loads and caches the client configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration, filled on first access.
    config: Arc<RwLock<Option<ClientConfig>>>,
}

impl ConfigService {
    /// Uses the default config location.
    pub fn new() -> Self {
        Self {
            path: None,
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Uses an explicit config file (the `--config` flag).
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    pub fn get_config(&self) -> Result<ClientConfig> {
        {
            let read_lock = self.config.read().unwrap_or_else(|e| e.into_inner());
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let path = match &self.path {
            Some(path) => path.clone(),
            None => OptimismPaths::config_file()?,
        };
        let mut loaded = Self::load_from(&path)?;
        apply_env_overrides(&mut loaded, |name| std::env::var(name).ok());

        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|e| e.into_inner());
        *write_lock = None;
    }

    /// Reads a config file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<ClientConfig> {
        if !path.exists() {
            tracing::debug!(
                "[ConfigService] No config at {}, using defaults",
                path.display()
            );
            return Ok(ClientConfig::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: ClientConfig = toml::from_str(&content)?;
        tracing::debug!("[ConfigService] Loaded config from {}", path.display());
        Ok(config)
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies `OPTIMISM_STORE_URL`. The API key is resolved lazily by
/// `GenerationConfig::api_key`.
pub fn apply_env_overrides<F>(config: &mut ClientConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(url) = lookup(STORE_URL_ENV).filter(|url| !url.trim().is_empty()) {
        config.store_url = url.trim_end_matches('/').to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = ConfigService::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_cached_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "user_id = \"participant-7\"\n").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config().unwrap().user_id, "participant-7");

        fs::write(&path, "user_id = \"participant-8\"\n").unwrap();
        assert_eq!(service.get_config().unwrap().user_id, "participant-7");

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().user_id, "participant-8");
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "poll_interval_ms = \"fast\"").unwrap();
        assert!(ConfigService::load_from(&path).is_err());
    }

    #[test]
    fn test_store_url_override() {
        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, |name| {
            (name == STORE_URL_ENV).then(|| "http://10.0.0.5:8000/".to_string())
        });
        assert_eq!(config.store_url, "http://10.0.0.5:8000");

        let mut config = ClientConfig::default();
        apply_env_overrides(&mut config, |_| None);
        assert_eq!(config.store_url, "http://localhost:8000");
    }
}
