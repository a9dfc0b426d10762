//! Session domain module.
//!
//! # Module Structure
//!
//! - `model`: Session record, creation request and partial update
//! - `message`: Messages, senders and tagged metadata
//! - `status`: Session mode and the status state machine
//! - `presence`: Heartbeat-based liveness inference
//! - `ai_config`: Per-session provider configuration
//! - `store`: Trait for the store that owns session records

mod ai_config;
mod message;
mod model;
mod presence;
mod status;
mod store;

pub use ai_config::{
    AiConfig, AiConfigKey, AiConfigStatus, AiConfigValidation, AiProvider, ConfiguredBy,
    SetAiConfigRequest,
};
pub use message::{Message, MessageMetadata, Sender};
pub use model::{INITIALIZE_MESSAGE, NewSession, Session, SessionUpdate};
pub use presence::{CONNECTED_THRESHOLD_MS, HEARTBEAT_INTERVAL, is_connected};
pub use status::{SessionMode, SessionStatus, StatusTrigger};
pub use store::SessionStore;
