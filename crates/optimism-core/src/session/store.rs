//! Session store trait.
//!
//! Defines the contract of the remote store that owns canonical session state.

use super::message::{Message, MessageMetadata, Sender};
use super::model::{NewSession, Session, SessionUpdate};
use crate::error::Result;
use async_trait::async_trait;

/// An abstract store for session records.
///
/// Implementations do not retry transparently; callers pick the retry policy.
///
/// # Not-found handling
///
/// A well-formed "no such session" answer is reported as `Ok(None)` /
/// `Ok(false)` (or `Err(NotFound)` where a value must be returned), and is
/// never confused with a transport or parsing failure, which is `Err(_)`.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Creates a session in status `active`.
    ///
    /// Fails with `Unreachable` when the store cannot be reached.
    async fn create(&self, request: NewSession) -> Result<Session>;

    /// Fetches a session.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(session))`: Session found
    /// - `Ok(None)`: The store answered that the session does not exist
    /// - `Err(_)`: Transport, server or parsing failure
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Overwrites every field present in `update` and bumps `updated_at`.
    ///
    /// A present `messages` replaces the entire array.
    async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<Option<Session>>;

    /// Appends a message. The store assigns `id` and `timestamp`, and applies
    /// the status side effects of the append.
    ///
    /// Fails with `NotFound` when the session does not exist.
    async fn add_message(
        &self,
        session_id: &str,
        sender: Sender,
        content: &str,
        metadata: Option<MessageMetadata>,
    ) -> Result<Message>;

    /// Lists the messages of a session, `Ok(None)` if the session is unknown.
    async fn messages(&self, session_id: &str) -> Result<Option<Vec<Message>>>;

    /// Touches `last_activity` only. Never changes `status` or `updated_at`.
    ///
    /// Fails with `NotFound` when the session does not exist.
    async fn heartbeat(&self, session_id: &str) -> Result<()>;

    /// Deletes a session. `Ok(false)` if it did not exist.
    async fn delete(&self, session_id: &str) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Session>>;

    /// Sessions whose status is `waiting`.
    async fn list_waiting(&self) -> Result<Vec<Session>>;

    /// Removes every session. Development/testing only.
    async fn clear(&self) -> Result<()>;
}
