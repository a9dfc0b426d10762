//! Session domain model.
//!
//! The store owns the canonical record; every client holds a possibly-stale
//! copy refreshed by polling. `updated_at` is the revision marker and
//! `last_activity` is presence-only.

use super::message::{Message, MessageMetadata, Sender};
use super::status::{SessionMode, SessionStatus};
use serde::{Deserialize, Serialize};

/// Content of the bootstrap message some clients send before the user speaks.
pub const INITIALIZE_MESSAGE: &str = "Initialize";

/// A chat session shared between the end-user client and the researcher client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Opaque identifier assigned by the store
    pub id: String,
    pub mode: SessionMode,
    pub status: SessionStatus,
    pub user_id: String,
    #[serde(default)]
    pub researcher_id: Option<String>,
    /// Milliseconds since epoch
    pub created_at: i64,
    /// Revision marker; strictly increases on every accepted mutation
    pub updated_at: i64,
    /// Touched by heartbeats; used only for presence
    pub last_activity: i64,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default)]
    pub is_researcher_typing: Option<bool>,
    #[serde(default, rename = "isAIResponding")]
    pub is_ai_responding: Option<bool>,
    #[serde(default)]
    pub ready_to_formalize: bool,
}

impl Session {
    /// Revision marker used for change detection.
    pub fn revision(&self) -> i64 {
        self.updated_at
    }

    pub fn is_completed(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn find_message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Most recent researcher or AI message.
    pub fn last_assistant_message(&self) -> Option<&Message> {
        self.messages.iter().rev().find(|m| m.sender.is_assistant())
    }

    /// Whether the user has said anything beyond the bootstrap message.
    pub fn has_genuine_user_message(&self) -> bool {
        self.messages
            .iter()
            .any(|m| m.sender == Sender::User && m.content.trim() != INITIALIZE_MESSAGE)
    }

    /// Returns a copy of the message list with one message's metadata replaced.
    ///
    /// Returns `None` when `message_id` is not part of this session.
    pub fn messages_with_metadata(
        &self,
        message_id: &str,
        metadata: MessageMetadata,
    ) -> Option<Vec<Message>> {
        self.find_message(message_id)?;
        Some(
            self.messages
                .iter()
                .map(|m| {
                    if m.id == message_id {
                        Message {
                            metadata: Some(metadata.clone()),
                            ..m.clone()
                        }
                    } else {
                        m.clone()
                    }
                })
                .collect(),
        )
    }
}

/// Request body for creating a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
    pub mode: SessionMode,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researcher_id: Option<String>,
}

impl NewSession {
    pub fn new(mode: SessionMode, user_id: impl Into<String>) -> Self {
        Self {
            mode,
            user_id: user_id.into(),
            researcher_id: None,
        }
    }

    pub fn with_researcher(mut self, researcher_id: impl Into<String>) -> Self {
        self.researcher_id = Some(researcher_id.into());
        self
    }
}

/// Partial update. Every present field overwrites the stored one wholesale;
/// a present `messages` replaces the entire array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SessionMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SessionStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub researcher_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_researcher_typing: Option<bool>,
    #[serde(
        default,
        rename = "isAIResponding",
        skip_serializing_if = "Option::is_none"
    )]
    pub is_ai_responding: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_to_formalize: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<Message>>,
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn messages(messages: Vec<Message>) -> Self {
        Self {
            messages: Some(messages),
            ..Default::default()
        }
    }

    pub fn with_ready_to_formalize(mut self, ready: bool) -> Self {
        self.ready_to_formalize = Some(ready);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Applies the present fields onto `session` (overwrite, not merge).
    pub fn apply_to(self, session: &mut Session) {
        if let Some(mode) = self.mode {
            session.mode = mode;
        }
        if let Some(status) = self.status {
            session.status = status;
        }
        if let Some(researcher_id) = self.researcher_id {
            session.researcher_id = Some(researcher_id);
        }
        if let Some(typing) = self.is_researcher_typing {
            session.is_researcher_typing = Some(typing);
        }
        if let Some(responding) = self.is_ai_responding {
            session.is_ai_responding = Some(responding);
        }
        if let Some(ready) = self.ready_to_formalize {
            session.ready_to_formalize = ready;
        }
        if let Some(messages) = self.messages {
            session.messages = messages;
        }
    }
}
