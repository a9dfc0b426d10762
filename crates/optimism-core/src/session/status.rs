//! Session mode and the status state machine.
//!
//! ```text
//!   active|formalized ──user msg (experimental)──▶ waiting
//!   waiting|formalized ──researcher/ai msg──────▶ active
//!   active|waiting ──formalized ok───▶ formalized
//!   formalized ──reset──▶ active
//!   any ──terminate──▶ completed (terminal)
//! ```

use super::message::Sender;
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// Who answers the end user.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionMode {
    /// An automated text-generation collaborator answers directly.
    Ai,
    /// A human researcher authors the replies (Wizard-of-Oz).
    Experimental,
}

/// Lifecycle status of a session record.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    /// The end user spoke last in an experimental session; a researcher reply is due.
    Waiting,
    Formalized,
    /// Terminal. Observers retire the record and start a new session.
    Completed,
}

/// Events that may move a session between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusTrigger {
    MessageAppended { sender: Sender, mode: SessionMode },
    FormalizationSucceeded,
    /// Manual reset of a formalized session.
    FormalizationReset,
    Terminated,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed)
    }

    /// Returns the status after `trigger`.
    ///
    /// Triggers that do not apply in the current status leave it unchanged;
    /// `Completed` never changes.
    pub fn next(self, trigger: StatusTrigger) -> SessionStatus {
        use SessionStatus::*;

        match (self, trigger) {
            (Completed, _) => Completed,
            (_, StatusTrigger::Terminated) => Completed,
            (
                Active | Formalized,
                StatusTrigger::MessageAppended {
                    sender: Sender::User,
                    mode: SessionMode::Experimental,
                },
            ) => Waiting,
            (Waiting | Formalized, StatusTrigger::MessageAppended { sender, .. })
                if sender.is_assistant() =>
            {
                Active
            }
            (Active | Waiting, StatusTrigger::FormalizationSucceeded) => Formalized,
            (Formalized, StatusTrigger::FormalizationReset) => Active,
            (status, _) => status,
        }
    }

    /// Whether `trigger` would change this status.
    pub fn accepts(self, trigger: StatusTrigger) -> bool {
        self.next(trigger) != self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn appended(sender: Sender, mode: SessionMode) -> StatusTrigger {
        StatusTrigger::MessageAppended { sender, mode }
    }

    #[test]
    fn test_experimental_user_message_waits() {
        let status = SessionStatus::Active.next(appended(Sender::User, SessionMode::Experimental));
        assert_eq!(status, SessionStatus::Waiting);
    }

    #[test]
    fn test_ai_mode_user_message_stays_active() {
        let status = SessionStatus::Active.next(appended(Sender::User, SessionMode::Ai));
        assert_eq!(status, SessionStatus::Active);
    }

    #[test]
    fn test_assistant_reply_reactivates() {
        for sender in [Sender::Researcher, Sender::Ai] {
            let status = SessionStatus::Waiting.next(appended(sender, SessionMode::Experimental));
            assert_eq!(status, SessionStatus::Active);
        }
    }

    #[test]
    fn test_formalized_session_follows_new_messages() {
        let formalized = SessionStatus::Formalized;
        assert_eq!(
            formalized.next(appended(Sender::User, SessionMode::Experimental)),
            SessionStatus::Waiting
        );
        for sender in [Sender::Researcher, Sender::Ai] {
            assert_eq!(
                formalized.next(appended(sender, SessionMode::Experimental)),
                SessionStatus::Active
            );
        }
        assert_eq!(
            formalized.next(appended(Sender::User, SessionMode::Ai)),
            SessionStatus::Formalized
        );
    }

    #[test]
    fn test_formalization_round_trip() {
        let formalized = SessionStatus::Waiting.next(StatusTrigger::FormalizationSucceeded);
        assert_eq!(formalized, SessionStatus::Formalized);
        assert_eq!(
            formalized.next(StatusTrigger::FormalizationReset),
            SessionStatus::Active
        );
    }

    #[test]
    fn test_reset_outside_formalized_is_noop() {
        assert!(!SessionStatus::Active.accepts(StatusTrigger::FormalizationReset));
        assert!(!SessionStatus::Formalized.accepts(StatusTrigger::FormalizationSucceeded));
    }

    #[test]
    fn test_completed_is_terminal() {
        for status in [
            SessionStatus::Active,
            SessionStatus::Waiting,
            SessionStatus::Formalized,
        ] {
            assert_eq!(status.next(StatusTrigger::Terminated), SessionStatus::Completed);
        }

        let completed = SessionStatus::Completed;
        assert!(completed.is_terminal());
        assert_eq!(
            completed.next(appended(Sender::User, SessionMode::Experimental)),
            SessionStatus::Completed
        );
        assert_eq!(
            completed.next(StatusTrigger::FormalizationReset),
            SessionStatus::Completed
        );
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(SessionStatus::Formalized.as_ref(), "formalized");
        assert_eq!(
            "experimental".parse::<SessionMode>().unwrap(),
            SessionMode::Experimental
        );
    }
}
