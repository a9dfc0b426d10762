//! Applies the readiness classifier to a session's latest assistant turn.

use optimism_core::detect_readiness;
use optimism_core::session::{Session, SessionStatus, SessionStore, SessionUpdate};
use optimism_core::{OptimismError, Result};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessAction {
    None,
    /// `readyToFormalize` was set.
    MarkedReady,
}

pub struct ReadinessMonitor {
    store: Arc<dyn SessionStore>,
}

impl ReadinessMonitor {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    /// Decides what, if anything, the latest message implies. Pure.
    ///
    /// Only considered once the user has said something genuine, and only when
    /// the last message is a non-formalization assistant turn.
    pub fn assess(session: &Session) -> Option<(ReadinessAction, SessionUpdate)> {
        if !session.has_genuine_user_message() {
            return None;
        }
        let last = session.last_message()?;
        if !last.sender.is_assistant() || last.is_formalization() {
            return None;
        }

        let ready = matches!(session.status, SessionStatus::Active | SessionStatus::Waiting)
            && !session.ready_to_formalize
            && detect_readiness(&last.content).is_ready;
        ready.then(|| {
            (
                ReadinessAction::MarkedReady,
                SessionUpdate::default().with_ready_to_formalize(true),
            )
        })
    }

    /// Assesses `session` and writes the resulting update, if any.
    pub async fn evaluate(&self, session: &Session) -> Result<ReadinessAction> {
        let Some((action, update)) = Self::assess(session) else {
            return Ok(ReadinessAction::None);
        };

        tracing::info!(
            "[ReadinessMonitor] {:?} for session {}",
            action,
            session.id
        );
        self.store
            .update(&session.id, update)
            .await?
            .ok_or_else(|| OptimismError::session_not_found(&session.id))?;
        Ok(action)
    }
}
