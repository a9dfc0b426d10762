//! Session lifecycle on the client side.
//!
//! # Module Structure
//!
//! - `context`: The remembered "current session" id
//! - `change_feed`: Change notification abstraction and its polling implementation
//! - `heartbeat`: Periodic presence signal
//! - `coordinator`: Resume/create, open, replace and terminate
//! - `task`: Cancellable owner for the timer loops

mod change_feed;
mod context;
mod coordinator;
mod heartbeat;
mod task;

pub use change_feed::{
    ChangeCallback, ChangeFeed, PollingChangeFeed, RevisionTracker, SessionChange, Subscription,
};
pub use context::{CURRENT_SESSION_KEY, SessionContext};
pub use coordinator::{CoordinatorEvent, SessionCoordinator};
pub use heartbeat::{HeartbeatCallback, HeartbeatEmitter, HeartbeatEvent, HeartbeatHandle};
pub use task::TaskGuard;
