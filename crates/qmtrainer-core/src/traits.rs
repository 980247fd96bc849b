//! The persistence seam.
//!
//! `SessionStore` is implemented by the `qmtrainer-store` crate. A store owns
//! each session together with its step results and feedback, so deleting a
//! session removes all of its children in one operation.

use std::cmp::Ordering;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StoreError;
use crate::feedback::FeedbackRecord;
use crate::model::{NewSession, Session, SessionId};

/// Trait for backends that persist training sessions.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Human-readable backend name (e.g. "json").
    fn name(&self) -> &str;

    /// Persist a freshly evaluated session and assign its id.
    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError>;

    /// Fetch a session with its steps and feedback.
    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError>;

    /// All sessions, newest start time first.
    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError>;

    /// Delete a session and everything attached to it.
    ///
    /// Returns `false` if no such session existed.
    async fn delete_session(&self, id: SessionId) -> Result<bool, StoreError>;

    /// Append a feedback entry to an existing session.
    async fn append_feedback(
        &self,
        id: SessionId,
        feedback: FeedbackRecord,
    ) -> Result<(), StoreError>;

    /// Fetch a single feedback entry of a session.
    async fn get_feedback(
        &self,
        id: SessionId,
        feedback_id: Uuid,
    ) -> Result<Option<FeedbackRecord>, StoreError> {
        Ok(self
            .get_session(id)
            .await?
            .and_then(|s| s.feedback(feedback_id).cloned()))
    }
}

/// Listing order: newest start time first, ties broken by the higher id.
pub fn newest_first(
    a: (DateTime<Utc>, SessionId),
    b: (DateTime<Utc>, SessionId),
) -> Ordering {
    b.0.cmp(&a.0).then(b.1.cmp(&a.1))
}

pub fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| newest_first((a.start_time, a.id), (b.start_time, b.id)));
}
