//! Domain layer for the AI Optimism session coordination client.
//!
//! Holds the session entity and its state machine, the pure text
//! classifiers, and the traits the outer crates implement.

pub mod config;
pub mod error;
pub mod formalization;
pub mod generation;
pub mod kv;
pub mod readiness;
pub mod session;

pub use config::ClientConfig;
pub use error::{OptimismError, Result};
pub use generation::TextGenerator;
pub use kv::KeyValueStore;
pub use readiness::{ReadinessSignals, detect_readiness};

/// Current wall-clock time in milliseconds since epoch.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
