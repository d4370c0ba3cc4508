//! Session Persistence
//!
//! The active lesson, quiz, and progress are projected into a
//! [`SessionSnapshot`] and written to an opaque key/value store under a
//! single well-known key. Chat history is deliberately not part of the
//! snapshot; it resets whenever a new lesson is generated.

use crate::lesson::{LessonRecord, QuizItem};
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

/// The single key under which the active session is persisted.
pub const SNAPSHOT_KEY: &str = "tutor.active-session";

/// The persisted projection of the active lesson, quiz, and progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub topic: String,
    pub lesson: String,
    pub quiz: Vec<QuizItem>,
    pub summary: String,
    #[serde(default)]
    pub selections: BTreeMap<usize, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<usize>,
}

impl SessionSnapshot {
    /// The lesson record this snapshot was projected from.
    pub fn lesson_record(&self) -> LessonRecord {
        LessonRecord {
            topic: self.topic.clone(),
            lesson: self.lesson.clone(),
            quiz: self.quiz.clone(),
            summary: self.summary.clone(),
        }
    }
}

/// An opaque key/value store for session snapshots.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()>;
    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// An in-memory `SessionStore` for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, SessionSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()> {
        self.entries
            .lock()
            .await
            .insert(key.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }
}
