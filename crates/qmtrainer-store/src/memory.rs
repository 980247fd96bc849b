//! In-memory session store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use qmtrainer_core::error::StoreError;
use qmtrainer_core::feedback::FeedbackRecord;
use qmtrainer_core::model::{NewSession, Session, SessionId};
use qmtrainer_core::traits::{sort_newest_first, SessionStore};

/// A session store that keeps everything in process memory.
///
/// Useful for tests and one-off evaluations; nothing survives the process.
pub struct MemoryStore {
    sessions: RwLock<BTreeMap<SessionId, Session>>,
    next_id: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let session = session.into_session(id);
        self.sessions.write().await.insert(id, session.clone());
        tracing::debug!(session = id, "stored session in memory");
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self.sessions.read().await.values().cloned().collect();
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool, StoreError> {
        Ok(self.sessions.write().await.remove(&id).is_some())
    }

    async fn append_feedback(
        &self,
        id: SessionId,
        feedback: FeedbackRecord,
    ) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .get_mut(&id)
            .ok_or(StoreError::SessionNotFound(id))?;
        session.feedback.push(feedback);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{feedback_form, manual_session};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = MemoryStore::new();
        let a = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        let b = store.insert_session(manual_session("B", Utc::now())).await.unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let store = MemoryStore::new();
        let base = Utc::now();
        store.insert_session(manual_session("old", base)).await.unwrap();
        store
            .insert_session(manual_session("new", base + Duration::minutes(5)))
            .await
            .unwrap();
        let list = store.list_sessions().await.unwrap();
        assert_eq!(list[0].disponent, "new");
        assert_eq!(list[1].disponent, "old");
    }

    #[tokio::test]
    async fn two_feedback_entries_are_retrievable() {
        let store = MemoryStore::new();
        let session = store.insert_session(manual_session("A", Utc::now())).await.unwrap();

        let first = FeedbackRecord::new(feedback_form("erstes"), Utc::now()).unwrap();
        let second =
            FeedbackRecord::new(feedback_form("zweites"), Utc::now() + Duration::seconds(1))
                .unwrap();
        let (first_id, second_id) = (first.id, second.id);
        store.append_feedback(session.id, first).await.unwrap();
        store.append_feedback(session.id, second).await.unwrap();

        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.feedback.len(), 2);

        let fb1 = store.get_feedback(session.id, first_id).await.unwrap().unwrap();
        let fb2 = store.get_feedback(session.id, second_id).await.unwrap().unwrap();
        assert_eq!(fb1.overall, "erstes");
        assert_eq!(fb2.overall, "zweites");
        assert!(fb1.created_at < fb2.created_at);
    }

    #[tokio::test]
    async fn feedback_for_unknown_session_fails() {
        let store = MemoryStore::new();
        let record = FeedbackRecord::new(feedback_form("x"), Utc::now()).unwrap();
        let err = store.append_feedback(42, record).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn delete_cascades_to_children() {
        let store = MemoryStore::new();
        let session = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        let record = FeedbackRecord::new(feedback_form("x"), Utc::now()).unwrap();
        let feedback_id = record.id;
        store.append_feedback(session.id, record).await.unwrap();

        assert!(store.delete_session(session.id).await.unwrap());
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert!(store
            .get_feedback(session.id, feedback_id)
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete_session(session.id).await.unwrap());
        assert!(store.is_empty().await);
    }
}
