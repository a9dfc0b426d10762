//! Infrastructure layer: store clients, client-local storage, paths and config.

pub mod config_service;
pub mod http_session_store;
pub mod memory_session_store;
pub mod paths;
pub mod storage;

pub use config_service::ConfigService;
pub use http_session_store::{HEALTH_PROBE_TIMEOUT, HttpSessionStore};
pub use memory_session_store::InMemorySessionStore;
pub use paths::{OptimismPaths, PathError};
pub use storage::{FileKeyValueStore, InMemoryKeyValueStore};
