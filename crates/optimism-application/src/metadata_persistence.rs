//! Durable per-message metadata on top of a whole-record update.
//!
//! The store can only replace the full `messages` array, and it may accept a
//! write without applying it. Every attempt therefore re-fetches the record,
//! rewrites one message's metadata, and checks the returned copy. When all
//! attempts fail for a success flag, the message id goes into a client-local
//! override set that the UI overlays until the store catches up.

use optimism_core::config::{DEFAULT_RECONCILE_DELAY, RetryConfig};
use optimism_core::session::{MessageMetadata, Session, SessionStore, SessionUpdate};
use optimism_core::{KeyValueStore, OptimismError, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

pub const OVERRIDE_KEY_PREFIX: &str = "controlsOverrides:";

/// Local key holding the override set for one session.
pub fn override_key(session_id: &str) -> String {
    format!("{}{}", OVERRIDE_KEY_PREFIX, session_id)
}

/// Attempt count and exponential backoff (delay doubles per retry).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    /// Wait before the 1-based `attempt`. The first attempt is immediate.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        self.initial_delay
            .saturating_mul(2u32.saturating_pow(attempt - 2))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// The store holds the metadata and returned it on verification.
    Persisted { attempts: u32 },
    /// Every attempt failed; the success view is kept locally instead.
    LocalOverride { attempts: u32 },
    /// Every attempt failed for a failure flag. Nothing was recorded.
    Failed { attempts: u32, error: OptimismError },
}

#[derive(Clone)]
pub struct MetadataPersister {
    store: Arc<dyn SessionStore>,
    kv: Arc<dyn KeyValueStore>,
    policy: RetryPolicy,
    reconcile_delay: Duration,
    // Serializes read-modify-write of the override sets.
    overrides_lock: Arc<Mutex<()>>,
}

impl MetadataPersister {
    pub fn new(store: Arc<dyn SessionStore>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            kv,
            policy: RetryPolicy::default(),
            reconcile_delay: DEFAULT_RECONCILE_DELAY,
            overrides_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_reconcile_delay(mut self, delay: Duration) -> Self {
        self.reconcile_delay = delay;
        self
    }

    pub fn from_config(
        store: Arc<dyn SessionStore>,
        kv: Arc<dyn KeyValueStore>,
        config: &RetryConfig,
    ) -> Self {
        Self::new(store, kv)
            .with_policy(RetryPolicy::from(config))
            .with_reconcile_delay(Duration::from_millis(config.reconcile_delay_ms))
    }

    /// Writes `metadata` onto one message and verifies it stuck.
    ///
    /// A missing session or message is returned as `NotFound` without
    /// retrying. Transport, server and verification failures are retried.
    /// A success flag is re-checked in the background after the reconcile
    /// delay; the task dies with the runtime, so short-lived callers should
    /// use [`Self::persist_and_reconcile`].
    pub async fn persist(
        &self,
        session_id: &str,
        message_id: &str,
        metadata: MessageMetadata,
    ) -> Result<PersistOutcome> {
        let outcome = self.persist_with_retries(session_id, message_id, &metadata).await?;
        if needs_reconcile(&metadata, &outcome) {
            self.spawn_reconcile(session_id, message_id);
        }
        Ok(outcome)
    }

    /// Like [`Self::persist`], but waits out the reconcile delay and runs the
    /// re-check before returning.
    pub async fn persist_and_reconcile(
        &self,
        session_id: &str,
        message_id: &str,
        metadata: MessageMetadata,
    ) -> Result<PersistOutcome> {
        let outcome = self.persist_with_retries(session_id, message_id, &metadata).await?;
        if needs_reconcile(&metadata, &outcome) {
            tokio::time::sleep(self.reconcile_delay).await;
            if let Err(e) = self.reconcile(session_id, message_id).await {
                tracing::warn!(
                    "[MetadataPersister] Reconcile of {} failed: {}",
                    message_id,
                    e
                );
            }
        }
        Ok(outcome)
    }

    async fn persist_with_retries(
        &self,
        session_id: &str,
        message_id: &str,
        metadata: &MessageMetadata,
    ) -> Result<PersistOutcome> {
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                tracing::debug!(
                    "[MetadataPersister] Retrying {} in {:?} (attempt {})",
                    message_id,
                    delay,
                    attempt
                );
                tokio::time::sleep(delay).await;
            }

            match self.write_once(session_id, message_id, metadata).await {
                Ok(true) => {
                    tracing::info!(
                        "[MetadataPersister] Persisted metadata for {} on attempt {}",
                        message_id,
                        attempt
                    );
                    return Ok(PersistOutcome::Persisted { attempts: attempt });
                }
                Ok(false) => {
                    tracing::warn!(
                        "[MetadataPersister] Store accepted but did not apply metadata for {} (attempt {})",
                        message_id,
                        attempt
                    );
                    last_error = Some(OptimismError::Validation(format!(
                        "metadata for message {} was not applied",
                        message_id
                    )));
                }
                Err(e) if e.is_not_found() => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        "[MetadataPersister] Attempt {} for {} failed: {}",
                        attempt,
                        message_id,
                        e
                    );
                    last_error = Some(e);
                }
            }
        }

        let attempts = self.policy.max_attempts;
        let error = last_error
            .unwrap_or_else(|| OptimismError::internal("metadata persistence made no attempt"));

        if metadata.is_controls_success() {
            tracing::warn!(
                "[MetadataPersister] Falling back to local override for {} after {} attempts",
                message_id,
                attempts
            );
            self.add_override(session_id, message_id).await?;
            Ok(PersistOutcome::LocalOverride { attempts })
        } else {
            tracing::error!(
                "[MetadataPersister] Giving up on {} after {} attempts: {}",
                message_id,
                attempts,
                error
            );
            Ok(PersistOutcome::Failed { attempts, error })
        }
    }

    /// Re-checks one message against the store.
    ///
    /// Clears the override when the store shows the success flag. While an
    /// override is still pending, makes one more write attempt. Returns
    /// whether the store now holds the flag.
    pub async fn reconcile(&self, session_id: &str, message_id: &str) -> Result<bool> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;

        let confirmed = has_success_flag(&session, message_id)
            || (self.is_overridden(session_id, message_id).await?
                && self
                    .write_once(session_id, message_id, &MessageMetadata::controls_generated())
                    .await?);

        if confirmed {
            if self.remove_override(session_id, message_id).await? {
                tracing::info!(
                    "[MetadataPersister] Store caught up for {}; override cleared",
                    message_id
                );
            }
        } else {
            tracing::warn!(
                "[MetadataPersister] Store does not show controls for {}",
                message_id
            );
        }
        Ok(confirmed)
    }

    /// Drops every override the given record already satisfies. Read-only
    /// against the store. Returns how many were cleared.
    pub async fn reconcile_session(&self, session: &Session) -> Result<usize> {
        let mut cleared = 0;
        for message_id in self.overrides(&session.id).await? {
            if has_success_flag(session, &message_id)
                && self.remove_override(&session.id, &message_id).await?
            {
                cleared += 1;
            }
        }
        if cleared > 0 {
            tracing::debug!(
                "[MetadataPersister] Cleared {} overrides for {}",
                cleared,
                session.id
            );
        }
        Ok(cleared)
    }

    pub async fn is_overridden(&self, session_id: &str, message_id: &str) -> Result<bool> {
        Ok(self
            .overrides(session_id)
            .await?
            .iter()
            .any(|id| id == message_id))
    }

    /// Copy of `session` with every locally overridden message shown with the
    /// success flag. Render this rather than the raw record.
    pub async fn apply_overrides(&self, session: &Session) -> Result<Session> {
        let overrides = self.overrides(&session.id).await?;
        let mut view = session.clone();
        for message in view
            .messages
            .iter_mut()
            .filter(|m| overrides.contains(&m.id))
        {
            message.metadata = Some(MessageMetadata::controls_generated());
        }
        Ok(view)
    }

    /// Message ids shown as successful locally for `session_id`.
    pub async fn overrides(&self, session_id: &str) -> Result<Vec<String>> {
        match self.kv.get(&override_key(session_id)).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn write_once(
        &self,
        session_id: &str,
        message_id: &str,
        metadata: &MessageMetadata,
    ) -> Result<bool> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;
        let messages = session
            .messages_with_metadata(message_id, metadata.clone())
            .ok_or_else(|| OptimismError::not_found("Message", message_id))?;

        let updated = self
            .store
            .update(session_id, SessionUpdate::messages(messages))
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;

        Ok(updated
            .find_message(message_id)
            .and_then(|m| m.metadata.as_ref())
            == Some(metadata))
    }

    fn spawn_reconcile(&self, session_id: &str, message_id: &str) {
        let this = self.clone();
        let session_id = session_id.to_string();
        let message_id = message_id.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(this.reconcile_delay).await;
            if let Err(e) = this.reconcile(&session_id, &message_id).await {
                tracing::warn!(
                    "[MetadataPersister] Reconcile of {} failed: {}",
                    message_id,
                    e
                );
            }
        });
    }

    async fn add_override(&self, session_id: &str, message_id: &str) -> Result<()> {
        let _guard = self.overrides_lock.lock().await;
        let mut ids = self.overrides(session_id).await?;
        if !ids.iter().any(|id| id == message_id) {
            ids.push(message_id.to_string());
            self.kv
                .set(&override_key(session_id), &serde_json::to_string(&ids)?)
                .await?;
        }
        Ok(())
    }

    /// Returns whether the id was present.
    async fn remove_override(&self, session_id: &str, message_id: &str) -> Result<bool> {
        let _guard = self.overrides_lock.lock().await;
        let mut ids = self.overrides(session_id).await?;
        let before = ids.len();
        ids.retain(|id| id != message_id);
        if ids.len() == before {
            return Ok(false);
        }

        let key = override_key(session_id);
        if ids.is_empty() {
            self.kv.remove(&key).await?;
        } else {
            self.kv.set(&key, &serde_json::to_string(&ids)?).await?;
        }
        Ok(true)
    }
}

// Failure flags have nothing to reconcile against.
fn needs_reconcile(metadata: &MessageMetadata, outcome: &PersistOutcome) -> bool {
    metadata.is_controls_success() && !matches!(outcome, PersistOutcome::Failed { .. })
}

fn has_success_flag(session: &Session, message_id: &str) -> bool {
    session
        .find_message(message_id)
        .and_then(|m| m.metadata.as_ref())
        .is_some_and(MessageMetadata::is_controls_success)
}
