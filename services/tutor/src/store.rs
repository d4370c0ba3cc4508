//! File-Backed Session Store
//!
//! Persists session snapshots as one JSON document per key under the
//! configured data directory. Writes go through a temporary file and a
//! rename so a crash mid-write never leaves a truncated snapshot.

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;
use tutor_core::store::{SessionSnapshot, SessionStore};

pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Opens (and creates, if needed) the store directory.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create data directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn save(&self, key: &str, snapshot: &SessionSnapshot) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(snapshot)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("Failed to move snapshot into place at {}", path.display()))?;
        debug!(key, path = %path.display(), "snapshot saved");
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<SessionSnapshot>> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        let snapshot = serde_json::from_slice(&bytes)
            .with_context(|| format!("Malformed snapshot at {}", path.display()))?;
        Ok(Some(snapshot))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_core::store::SNAPSHOT_KEY;

    fn snapshot() -> SessionSnapshot {
        SessionSnapshot {
            topic: "Recursion".to_string(),
            lesson: "A function that calls itself.".to_string(),
            quiz: vec![],
            summary: "S".to_string(),
            selections: Default::default(),
            score: Some(0),
        }
    }

    #[tokio::test]
    async fn round_trips_through_the_filesystem() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        assert_eq!(store.load(SNAPSHOT_KEY).await.unwrap(), None);
        store.save(SNAPSHOT_KEY, &snapshot()).await.unwrap();
        assert_eq!(store.load(SNAPSHOT_KEY).await.unwrap(), Some(snapshot()));

        store.delete(SNAPSHOT_KEY).await.unwrap();
        assert_eq!(store.load(SNAPSHOT_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn delete_of_missing_key_is_a_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        store.delete("never-saved").await.unwrap();
    }

    #[tokio::test]
    async fn save_overwrites_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();

        store.save(SNAPSHOT_KEY, &snapshot()).await.unwrap();
        let mut updated = snapshot();
        updated.score = Some(2);
        store.save(SNAPSHOT_KEY, &updated).await.unwrap();

        assert_eq!(
            store.load(SNAPSHOT_KEY).await.unwrap().unwrap().score,
            Some(2)
        );
        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn malformed_snapshot_is_an_error_not_a_panic() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path()).unwrap();
        std::fs::write(dir.path().join(format!("{SNAPSHOT_KEY}.json")), b"not json").unwrap();

        assert!(store.load(SNAPSHOT_KEY).await.is_err());
    }

    #[tokio::test]
    async fn new_creates_missing_directories() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = JsonFileStore::new(&nested).unwrap();
        store.save(SNAPSHOT_KEY, &snapshot()).await.unwrap();
        assert!(nested.join(format!("{SNAPSHOT_KEY}.json")).exists());
    }
}
