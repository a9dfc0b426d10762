//! Readiness classifier.
//!
//! Case-insensitive substring matching over fixed phrase tables. Decides
//! whether an assistant/researcher message signals that the conversation is
//! ready to formalize, wants to re-formalize, or wants to restart.

use serde::{Deserialize, Serialize};

/// Phrases claiming enough has been gathered.
pub const SUFFICIENCY_PHRASES: &[&str] = &[
    "enough information",
    "ready to formalize",
    "can now formalize",
    "sufficient information",
];

/// Spellings that count as mentioning formalization.
pub const FORMALIZE_TERMS: &[&str] = &["formalize", "formalise"];

/// Phrases asking the user for permission to proceed.
pub const PERMISSION_PHRASES: &[&str] = &["would you like", "shall i", "should i", "want me to"];

/// Vocabulary accepted alongside a permission phrase.
pub const STRUCTURING_TERMS: &[&str] = &[
    "formalize",
    "formalise",
    "structured",
    "problem definition",
];

pub const REFORMALIZE_TERMS: &[&str] = &[
    "re-formalize",
    "reformalize",
    "re-formalise",
    "reformalise",
    "refine",
    "update",
];

pub const REFORMALIZE_SUBJECTS: &[&str] = &["problem", "definition"];

pub const RESTART_PHRASES: &[&str] = &[
    "start fresh",
    "starting fresh",
    "start over",
    "starting over",
    "new problem",
    "different problem",
    "moving on",
    "move on",
    "let's start",
    "let’s start",
    "let's begin",
    "let’s begin",
];

/// The three independent signals produced by [`detect_readiness`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessSignals {
    pub is_ready: bool,
    pub suggests_reformalizing: bool,
    pub acknowledges_restart: bool,
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Classifies a message. Pure; does not look at session state.
pub fn detect_readiness(text: &str) -> ReadinessSignals {
    let lower = text.to_lowercase();

    let is_ready = (contains_any(&lower, SUFFICIENCY_PHRASES)
        && contains_any(&lower, FORMALIZE_TERMS))
        || (contains_any(&lower, PERMISSION_PHRASES) && contains_any(&lower, STRUCTURING_TERMS));

    ReadinessSignals {
        is_ready,
        suggests_reformalizing: contains_any(&lower, REFORMALIZE_TERMS)
            && contains_any(&lower, REFORMALIZE_SUBJECTS),
        acknowledges_restart: contains_any(&lower, RESTART_PHRASES),
    }
}
