//! Periodic presence signal for the open session.

use super::task::TaskGuard;
use optimism_core::config::DEFAULT_HEARTBEAT_FAILURE_THRESHOLD;
use optimism_core::session::{HEARTBEAT_INTERVAL, SessionStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatEvent {
    /// `failure_threshold` consecutive beats failed.
    SessionLost { session_id: String },
}

pub type HeartbeatCallback = Arc<dyn Fn(HeartbeatEvent) + Send + Sync>;

/// Sends a heartbeat immediately and then every `interval`.
///
/// A heartbeat only moves `last_activity`; it never advances the revision,
/// so change-feed subscribers are not woken by it.
#[derive(Clone)]
pub struct HeartbeatEmitter {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    failure_threshold: u32,
}

impl HeartbeatEmitter {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self {
            store,
            interval: HEARTBEAT_INTERVAL,
            failure_threshold: DEFAULT_HEARTBEAT_FAILURE_THRESHOLD,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold.max(1);
        self
    }

    pub fn start(&self, session_id: &str, on_event: HeartbeatCallback) -> HeartbeatHandle {
        let store = Arc::clone(&self.store);
        let interval = self.interval;
        let threshold = self.failure_threshold;
        let id = session_id.to_string();

        tracing::debug!("[Heartbeat] Starting for {} every {:?}", session_id, interval);

        let task = TaskGuard::spawn(move |token| async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut consecutive_failures = 0u32;
            let mut lost_reported = false;

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                match store.heartbeat(&id).await {
                    Ok(()) => {
                        if consecutive_failures > 0 {
                            tracing::info!(
                                "[Heartbeat] {} recovered after {} failures",
                                id,
                                consecutive_failures
                            );
                        }
                        consecutive_failures = 0;
                        lost_reported = false;
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        tracing::warn!(
                            "[Heartbeat] Beat {} for {} failed: {}",
                            consecutive_failures,
                            id,
                            e
                        );
                        if consecutive_failures >= threshold && !lost_reported {
                            lost_reported = true;
                            if token.is_cancelled() {
                                break;
                            }
                            on_event(HeartbeatEvent::SessionLost {
                                session_id: id.clone(),
                            });
                        }
                    }
                }
            }

            tracing::debug!("[Heartbeat] Stopped for {}", id);
        });

        HeartbeatHandle {
            session_id: session_id.to_string(),
            task,
        }
    }
}

pub struct HeartbeatHandle {
    session_id: String,
    task: TaskGuard,
}

impl HeartbeatHandle {
    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn is_running(&self) -> bool {
        self.task.is_running()
    }

    pub async fn stop(self) {
        self.task.stop().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FlakyStore;
    use optimism_core::session::{NewSession, SessionMode};
    use std::sync::Mutex;
    use std::sync::atomic::Ordering;

    fn recorder() -> (HeartbeatCallback, Arc<Mutex<Vec<HeartbeatEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let callback: HeartbeatCallback = Arc::new(move |event| sink.lock().unwrap().push(event));
        (callback, seen)
    }

    #[tokio::test(start_paused = true)]
    async fn test_beats_immediately_then_every_interval() {
        let store = Arc::new(FlakyStore::new());
        let session = store
            .create(NewSession::new(SessionMode::Ai, "default-user"))
            .await
            .unwrap();

        let (callback, seen) = recorder();
        let handle = HeartbeatEmitter::new(store.clone()).start(&session.id, callback);

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(store.heartbeat_calls.load(Ordering::SeqCst), 3);
        assert!(seen.lock().unwrap().is_empty());

        let stored = store.get(&session.id).await.unwrap().unwrap();
        assert_eq!(stored.updated_at, session.updated_at);

        handle.stop().await;
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.heartbeat_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_lost_fires_once_at_threshold() {
        let store = Arc::new(FlakyStore::new());
        store.failing_heartbeats.store(10, Ordering::SeqCst);

        let (callback, seen) = recorder();
        let handle = HeartbeatEmitter::new(store.clone())
            .with_interval(Duration::from_secs(1))
            .start("s1", callback);

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert!(seen.lock().unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec![HeartbeatEvent::SessionLost {
                session_id: "s1".into()
            }]
        );
        assert!(handle.is_running());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_count() {
        let store = Arc::new(FlakyStore::new());
        let session = store
            .create(NewSession::new(SessionMode::Ai, "default-user"))
            .await
            .unwrap();
        store.failing_heartbeats.store(2, Ordering::SeqCst);

        let (callback, seen) = recorder();
        let handle = HeartbeatEmitter::new(store.clone())
            .with_interval(Duration::from_secs(1))
            .start(&session.id, callback);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        store.failing_heartbeats.store(2, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3)).await;

        assert!(seen.lock().unwrap().is_empty());
        handle.stop().await;
    }
}
