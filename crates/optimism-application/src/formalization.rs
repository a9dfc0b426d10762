//! Turns a conversation into one structured problem description.

use optimism_core::formalization::{is_incomplete_formalization, render_transcript};
use optimism_core::session::{
    Message, MessageMetadata, Sender, Session, SessionStore, SessionUpdate, StatusTrigger,
};
use optimism_core::{OptimismError, Result, TextGenerator};
use optimism_interaction::prompts::formalization_prompt;
use std::sync::Arc;

/// Result of one formalization attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct FormalizationOutcome {
    /// The appended formalization message.
    pub message: Message,
    pub incomplete: bool,
    /// The record after the status change; `None` when the attempt was
    /// incomplete and the status was left alone.
    pub session: Option<Session>,
}

pub struct FormalizationWorkflow {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn TextGenerator>,
}

impl FormalizationWorkflow {
    pub fn new(store: Arc<dyn SessionStore>, generator: Arc<dyn TextGenerator>) -> Self {
        Self { store, generator }
    }

    /// Formalizes the session's current transcript.
    pub async fn formalize(&self, session_id: &str) -> Result<FormalizationOutcome> {
        let session = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;
        self.formalize_messages(session_id, &session.messages).await
    }

    /// Formalizes `messages` and records the result on `session_id`.
    ///
    /// The formalization message is appended whether or not it is complete.
    /// Only a complete one moves the session to `formalized`.
    pub async fn formalize_messages(
        &self,
        session_id: &str,
        messages: &[Message],
    ) -> Result<FormalizationOutcome> {
        let transcript = render_transcript(messages);
        if transcript.trim().is_empty() {
            return Err(OptimismError::Validation(
                "Nothing to formalize yet".to_string(),
            ));
        }

        let prompt = formalization_prompt(&transcript)?;
        tracing::info!(
            "[Formalization] Generating for {} with {} ({} messages)",
            session_id,
            self.generator.expertise(),
            messages.len()
        );
        let text = self.generator.generate(&prompt).await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(OptimismError::EmptyResponse);
        }

        let incomplete = is_incomplete_formalization(text);
        let message = self
            .store
            .add_message(
                session_id,
                Sender::Ai,
                text,
                Some(MessageMetadata::formalization(incomplete)),
            )
            .await?;

        if incomplete {
            tracing::info!(
                "[Formalization] Session {} needs more information",
                session_id
            );
            return Ok(FormalizationOutcome {
                message,
                incomplete,
                session: None,
            });
        }

        let current = self
            .store
            .get(session_id)
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;
        let status = current.status.next(StatusTrigger::FormalizationSucceeded);
        let session = self
            .store
            .update(
                session_id,
                SessionUpdate::status(status).with_ready_to_formalize(false),
            )
            .await?
            .ok_or_else(|| OptimismError::session_not_found(session_id))?;

        tracing::info!("[Formalization] Session {} is now {}", session_id, session.status);
        Ok(FormalizationOutcome {
            message,
            incomplete,
            session: Some(session),
        })
    }

    /// See [`reset_formalization`].
    pub async fn reset(&self, session_id: &str) -> Result<Session> {
        reset_formalization(self.store.as_ref(), session_id).await
    }
}

/// Sends a formalized session back to `active` and clears the readiness flag.
///
/// Sessions in any other status are returned unchanged.
pub async fn reset_formalization(store: &dyn SessionStore, session_id: &str) -> Result<Session> {
    let session = store
        .get(session_id)
        .await?
        .ok_or_else(|| OptimismError::session_not_found(session_id))?;

    if !session.status.accepts(StatusTrigger::FormalizationReset) {
        tracing::debug!(
            "[Formalization] Reset ignored for {} in status {}",
            session_id,
            session.status
        );
        return Ok(session);
    }

    let status = session.status.next(StatusTrigger::FormalizationReset);
    tracing::info!("[Formalization] Resetting session {}", session_id);
    store
        .update(
            session_id,
            SessionUpdate::status(status).with_ready_to_formalize(false),
        )
        .await?
        .ok_or_else(|| OptimismError::session_not_found(session_id))
}
