//! Application layer for the AI Optimism client.
//!
//! Workflows that coordinate the session store, the local key-value store and
//! the text-generation collaborator: session lifecycle, readiness, formalization
//! and durable message metadata.

pub mod formalization;
pub mod metadata_persistence;
pub mod readiness_monitor;
pub mod session;

#[cfg(test)]
mod test_support;

pub use formalization::{FormalizationOutcome, FormalizationWorkflow, reset_formalization};
pub use metadata_persistence::{MetadataPersister, PersistOutcome, RetryPolicy, override_key};
pub use readiness_monitor::{ReadinessAction, ReadinessMonitor};
pub use session::{
    ChangeFeed, CoordinatorEvent, HeartbeatEmitter, PollingChangeFeed, SessionChange,
    SessionContext, SessionCoordinator, Subscription,
};
