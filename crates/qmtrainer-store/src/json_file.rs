//! JSON-file session store.
//!
//! Each session lives in its own file, `session-<id>.json`, holding the
//! session row, its step results, and its feedback entries. Deleting the file
//! deletes the whole aggregate. Writes go to a temporary file that is renamed
//! into place, so a reader never sees a half-written session.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;

use qmtrainer_core::error::StoreError;
use qmtrainer_core::feedback::FeedbackRecord;
use qmtrainer_core::model::{NewSession, Session, SessionId};
use qmtrainer_core::traits::{sort_newest_first, SessionStore};

const COUNTER_FILE: &str = "next-id";

/// A session store backed by a directory of JSON files.
pub struct JsonFileStore {
    dir: PathBuf,
    /// Serializes writers within this process.
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        tracing::debug!(dir = %dir.display(), "opened json session store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self, id: SessionId) -> PathBuf {
        self.dir.join(format!("session-{id}.json"))
    }

    async fn read_session(&self, path: &Path) -> Result<Session, StoreError> {
        let content = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&content)?)
    }

    async fn write_session(&self, session: &Session) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(session)?;
        let path = self.session_path(session.id);
        write_atomic(&path, json.as_bytes()).await
    }

    /// Ids of all session files in the store directory.
    async fn session_ids(&self) -> Result<Vec<SessionId>, StoreError> {
        let mut ids = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            if let Some(id) = parse_session_file_name(&entry.file_name().to_string_lossy()) {
                ids.push(id);
            }
        }
        ids.sort_unstable();
        Ok(ids)
    }

    async fn allocate_id(&self) -> Result<SessionId, StoreError> {
        let counter = self.dir.join(COUNTER_FILE);
        let next = match tokio::fs::read_to_string(&counter).await {
            Ok(content) => content.trim().parse::<SessionId>().map_err(|e| {
                StoreError::Backend(format!("corrupt id counter {}: {e}", counter.display()))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                self.session_ids().await?.last().map_or(1, |max| max + 1)
            }
            Err(e) => return Err(e.into()),
        };
        write_atomic(&counter, (next + 1).to_string().as_bytes()).await?;
        Ok(next)
    }
}

async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

fn parse_session_file_name(name: &str) -> Option<SessionId> {
    name.strip_prefix("session-")
        .and_then(|s| s.strip_suffix(".json"))
        .and_then(|s| s.parse().ok())
}

#[async_trait]
impl SessionStore for JsonFileStore {
    fn name(&self) -> &str {
        "json"
    }

    async fn insert_session(&self, session: NewSession) -> Result<Session, StoreError> {
        let _guard = self.write_lock.lock().await;
        let id = self.allocate_id().await?;
        let session = session.into_session(id);
        self.write_session(&session).await?;
        tracing::info!(session = id, disponent = %session.disponent, score = session.score, "stored session");
        Ok(session)
    }

    async fn get_session(&self, id: SessionId) -> Result<Option<Session>, StoreError> {
        match self.read_session(&self.session_path(id)).await {
            Ok(session) => Ok(Some(session)),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        let mut sessions = Vec::new();
        for id in self.session_ids().await? {
            let path = self.session_path(id);
            match self.read_session(&path).await {
                Ok(session) => sessions.push(session),
                Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!("skipping {}: {}", path.display(), e);
                }
            }
        }
        sort_newest_first(&mut sessions);
        Ok(sessions)
    }

    async fn delete_session(&self, id: SessionId) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.session_path(id)).await {
            Ok(()) => {
                tracing::info!(session = id, "deleted session");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn append_feedback(
        &self,
        id: SessionId,
        feedback: FeedbackRecord,
    ) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let mut session = self
            .get_session(id)
            .await?
            .ok_or(StoreError::SessionNotFound(id))?;
        session.feedback.push(feedback);
        self.write_session(&session).await?;
        tracing::info!(session = id, entries = session.feedback.len(), "appended feedback");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{feedback_form, manual_session};
    use chrono::{Duration, Utc};

    async fn open_temp() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("sessions")).await.unwrap();
        (dir, store)
    }

    #[test]
    fn session_file_names() {
        assert_eq!(parse_session_file_name("session-12.json"), Some(12));
        assert_eq!(parse_session_file_name("session-12.tmp"), None);
        assert_eq!(parse_session_file_name("next-id"), None);
        assert_eq!(parse_session_file_name("session-x.json"), None);
    }

    #[tokio::test]
    async fn sessions_survive_reopen() {
        let (dir, store) = open_temp().await;
        let inserted = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        drop(store);

        let reopened = JsonFileStore::open(dir.path().join("sessions")).await.unwrap();
        let loaded = reopened.get_session(inserted.id).await.unwrap().unwrap();
        assert_eq!(loaded, inserted);
        assert_eq!(loaded.steps.len(), 10);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let (_dir, store) = open_temp().await;
        let a = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        assert!(store.delete_session(a.id).await.unwrap());
        let b = store.insert_session(manual_session("B", Utc::now())).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn list_is_newest_first_and_skips_corrupt_files() {
        let (_dir, store) = open_temp().await;
        let base = Utc::now();
        store.insert_session(manual_session("old", base)).await.unwrap();
        store
            .insert_session(manual_session("new", base + Duration::hours(1)))
            .await
            .unwrap();
        tokio::fs::write(store.dir().join("session-99.json"), "{ not json")
            .await
            .unwrap();

        let list = store.list_sessions().await.unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].disponent, "new");
    }

    #[tokio::test]
    async fn delete_cascades_to_feedback() {
        let (_dir, store) = open_temp().await;
        let session = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        let record = FeedbackRecord::new(feedback_form("gut"), Utc::now()).unwrap();
        let feedback_id = record.id;
        store.append_feedback(session.id, record).await.unwrap();

        assert!(store.delete_session(session.id).await.unwrap());
        assert!(store.get_session(session.id).await.unwrap().is_none());
        assert!(store
            .get_feedback(session.id, feedback_id)
            .await
            .unwrap()
            .is_none());
        assert!(store.list_sessions().await.unwrap().is_empty());
        assert!(!store.delete_session(session.id).await.unwrap());
    }

    #[tokio::test]
    async fn feedback_entries_are_appended_in_order() {
        let (_dir, store) = open_temp().await;
        let session = store.insert_session(manual_session("A", Utc::now())).await.unwrap();
        let first = FeedbackRecord::new(feedback_form("eins"), Utc::now()).unwrap();
        let second = FeedbackRecord::new(feedback_form("zwei"), Utc::now()).unwrap();
        let second_id = second.id;
        store.append_feedback(session.id, first).await.unwrap();
        store.append_feedback(session.id, second).await.unwrap();

        let stored = store.get_session(session.id).await.unwrap().unwrap();
        assert_eq!(stored.feedback.len(), 2);
        assert_eq!(stored.feedback[0].overall, "eins");
        let fetched = store.get_feedback(session.id, second_id).await.unwrap().unwrap();
        assert_eq!(fetched.overall, "zwei");
        // Steps are untouched by feedback appends.
        assert_eq!(stored.steps, session.steps);
    }

    #[tokio::test]
    async fn feedback_for_missing_session_fails() {
        let (_dir, store) = open_temp().await;
        let record = FeedbackRecord::new(feedback_form("x"), Utc::now()).unwrap();
        let err = store.append_feedback(5, record).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
