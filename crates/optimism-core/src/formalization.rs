//! Pure helpers for the formalization workflow.

use crate::session::{INITIALIZE_MESSAGE, Message, Sender};

/// Marker the formalization prompt asks the model to lead with when the
/// conversation lacks information.
pub const INCOMPLETE_MARKER: &str = "[INCOMPLETE]";

/// Lower-case phrases that also flag an incomplete formalization.
pub const INCOMPLETE_PHRASES: &[&str] = &[
    "insufficient information",
    "not enough information",
    "missing information",
];

/// Renders a transcript as alternating `User:` / `Assistant:` turns.
///
/// The bootstrap message and earlier formalization messages are left out.
pub fn render_transcript(messages: &[Message]) -> String {
    messages
        .iter()
        .filter(|m| !m.is_formalization())
        .filter(|m| !(m.sender == Sender::User && m.content.trim() == INITIALIZE_MESSAGE))
        .map(|m| {
            let speaker = if m.sender == Sender::User {
                "User"
            } else {
                "Assistant"
            };
            format!("{}: {}", speaker, m.content.trim())
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Deterministic completeness check over generated formalization text.
pub fn is_incomplete_formalization(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    lower.starts_with(&INCOMPLETE_MARKER.to_lowercase())
        || INCOMPLETE_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MessageMetadata;

    fn msg(sender: Sender, content: &str) -> Message {
        Message {
            id: content.to_string(),
            session_id: "s1".to_string(),
            sender,
            content: content.to_string(),
            timestamp: 0,
            metadata: None,
        }
    }

    #[test]
    fn test_render_transcript() {
        let mut formal = msg(Sender::Ai, "old formalization");
        formal.metadata = Some(MessageMetadata::formalization(false));

        let transcript = render_transcript(&[
            msg(Sender::User, "Initialize"),
            msg(Sender::User, "Minimise shipping cost"),
            msg(Sender::Researcher, "How many depots?"),
            formal,
            msg(Sender::User, " Three "),
        ]);

        assert_eq!(
            transcript,
            "User: Minimise shipping cost\n\nAssistant: How many depots?\n\nUser: Three"
        );
    }

    #[test]
    fn test_incomplete_marker() {
        assert!(is_incomplete_formalization(
            "  [incomplete] The capacity limits are unknown."
        ));
        assert!(is_incomplete_formalization(
            "There is not enough information about demand."
        ));
        assert!(!is_incomplete_formalization(
            "Objective: minimise cost. Variables: x1, x2."
        ));
    }
}
