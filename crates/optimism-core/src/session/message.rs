//! Conversation message types.
//!
//! Messages are ordered by insertion; `timestamp` is non-decreasing within a
//! session and is assigned by the store, never by the client.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Who authored a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Sender {
    /// The end user of the chat client.
    User,
    /// A human researcher replying in Wizard-of-Oz mode.
    Researcher,
    /// The automated text-generation collaborator.
    Ai,
}

impl Sender {
    /// Researcher and AI messages both appear to the end user as assistant turns.
    pub fn is_assistant(&self) -> bool {
        matches!(self, Sender::Researcher | Sender::Ai)
    }
}

/// Workflow-specific payload attached to a message.
///
/// Serialized with a `type` tag so the wire shape stays
/// `{"type": "formalization", "incomplete": false, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum MessageMetadata {
    /// The message is the structured formalization of the conversation.
    #[serde(rename_all = "camelCase")]
    Formalization {
        #[serde(default)]
        incomplete: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured_data: Option<serde_json::Value>,
    },
    /// Outcome of generating optimization controls from a formalization.
    #[serde(rename_all = "camelCase")]
    ControlsGeneration {
        #[serde(default)]
        controls_generated: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        controls_error: Option<String>,
    },
}

impl MessageMetadata {
    pub fn formalization(incomplete: bool) -> Self {
        MessageMetadata::Formalization {
            incomplete,
            structured_data: None,
        }
    }

    pub fn controls_generated() -> Self {
        MessageMetadata::ControlsGeneration {
            controls_generated: true,
            controls_error: None,
        }
    }

    pub fn controls_failed(error: impl Into<String>) -> Self {
        MessageMetadata::ControlsGeneration {
            controls_generated: false,
            controls_error: Some(error.into()),
        }
    }

    /// Whether this is a formalization that was judged complete.
    pub fn is_complete_formalization(&self) -> bool {
        matches!(
            self,
            MessageMetadata::Formalization {
                incomplete: false,
                ..
            }
        )
    }

    /// Whether this records a successful controls generation.
    pub fn is_controls_success(&self) -> bool {
        matches!(
            self,
            MessageMetadata::ControlsGeneration {
                controls_generated: true,
                ..
            }
        )
    }
}

/// A single message in a session transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub session_id: String,
    pub sender: Sender,
    pub content: String,
    /// Milliseconds since epoch, assigned by the store.
    pub timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn is_formalization(&self) -> bool {
        matches!(self.metadata, Some(MessageMetadata::Formalization { .. }))
    }
}
