//! Change notification for a single session.
//!
//! Callers see an abstract [`ChangeFeed`]: "this session changed" or "this
//! session is gone". [`PollingChangeFeed`] implements it by re-fetching on a
//! fixed interval and diffing the revision marker (`updated_at`).

use super::task::TaskGuard;
use optimism_core::config::DEFAULT_POLL_INTERVAL;
use optimism_core::session::{Session, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq)]
pub enum SessionChange {
    /// The session's revision advanced.
    Updated(Session),
    /// The store answered that the session no longer exists.
    Deleted,
}

/// Invoked from the feed's own task. Must not block.
pub type ChangeCallback = Arc<dyn Fn(SessionChange) + Send + Sync>;

/// A source of change events for one session id.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(&self, session_id: &str, callback: ChangeCallback) -> Subscription;
}

/// A live subscription. Dropping it stops delivery;
/// [`Subscription::unsubscribe`] also waits until the feed has stopped.
pub struct Subscription {
    session_id: String,
    task: TaskGuard,
}

impl Subscription {
    pub fn new(session_id: impl Into<String>, task: TaskGuard) -> Self {
        Self {
            session_id: session_id.into(),
            task,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_active(&self) -> bool {
        self.task.is_running()
    }

    pub async fn unsubscribe(self) {
        tracing::debug!("[ChangePoller] Unsubscribing from {}", self.session_id);
        self.task.stop().await;
    }
}

/// Per-subscription dedup state.
///
/// Emits `Updated` only when the revision strictly advances, and `Deleted`
/// at most once for the lifetime of the subscription.
#[derive(Debug, Default)]
pub struct RevisionTracker {
    last_revision: Option<i64>,
    deletion_reported: bool,
}

impl RevisionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one poll result (`None` = authoritative not-found).
    pub fn observe(&mut self, fetched: Option<Session>) -> Option<SessionChange> {
        match fetched {
            None if self.deletion_reported => None,
            None => {
                self.deletion_reported = true;
                Some(SessionChange::Deleted)
            }
            Some(session) => {
                let revision = session.revision();
                if self.last_revision.is_some_and(|last| revision <= last) {
                    return None;
                }
                self.last_revision = Some(revision);
                Some(SessionChange::Updated(session))
            }
        }
    }

    pub fn last_revision(&self) -> Option<i64> {
        self.last_revision
    }
}

/// [`ChangeFeed`] backed by periodic `get` calls.
#[derive(Clone)]
pub struct PollingChangeFeed {
    store: Arc<dyn SessionStore>,
    interval: Duration,
}

impl PollingChangeFeed {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

impl ChangeFeed for PollingChangeFeed {
    fn subscribe(&self, session_id: &str, callback: ChangeCallback) -> Subscription {
        let store = Arc::clone(&self.store);
        let interval = self.interval;
        let id = session_id.to_string();

        tracing::debug!(
            "[ChangePoller] Subscribing to {} every {:?}",
            session_id,
            interval
        );

        let task = TaskGuard::spawn(move |token| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut tracker = RevisionTracker::new();

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let fetched = match store.get(&id).await {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        tracing::warn!("[ChangePoller] Poll of {} failed: {}", id, e);
                        continue;
                    }
                };

                if let Some(change) = tracker.observe(fetched) {
                    if token.is_cancelled() {
                        break;
                    }
                    if change == SessionChange::Deleted {
                        tracing::info!("[ChangePoller] Session {} no longer exists", id);
                    }
                    callback(change);
                }
            }

            tracing::debug!("[ChangePoller] Stopped polling {}", id);
        });

        Subscription::new(session_id, task)
    }
}
