//! Unified path management for client configuration and local state.
//!
//! # Directory Structure
//!
//! ```text
//! ~/.config/optimism/          # Config directory
//! └── config.toml              # Client configuration
//!
//! ~/.local/share/optimism/     # Data directory
//! └── state.json               # Client-local key-value state
//! ```

use std::path::PathBuf;

const APP_DIR: &str = "optimism";

/// Errors that can occur during path resolution.
#[derive(Debug)]
pub enum PathError {
    /// Home/config directory could not be determined.
    HomeDirNotFound,
}

impl std::fmt::Display for PathError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PathError::HomeDirNotFound => write!(f, "Cannot find home directory"),
        }
    }
}

impl std::error::Error for PathError {}

impl From<PathError> for optimism_core::OptimismError {
    fn from(err: PathError) -> Self {
        optimism_core::OptimismError::config(err.to_string())
    }
}

/// Path resolution for the optimism client.
pub struct OptimismPaths;

impl OptimismPaths {
    /// Returns the configuration directory (e.g., `~/.config/optimism/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the data directory (e.g., `~/.local/share/optimism/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR))
            .ok_or(PathError::HomeDirNotFound)
    }

    /// Returns the path to `config.toml`.
    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the client-local state file.
    pub fn state_file() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("state.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file() {
        let config_file = OptimismPaths::config_file().unwrap();
        assert!(config_file.ends_with("optimism/config.toml"));
        assert!(config_file.starts_with(OptimismPaths::config_dir().unwrap()));
    }

    #[test]
    fn test_state_file() {
        let state_file = OptimismPaths::state_file().unwrap();
        assert!(state_file.ends_with("state.json"));
        assert!(state_file.starts_with(OptimismPaths::data_dir().unwrap()));
    }
}
