use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    auth::repo_types::RefreshToken,
    chirps::repo_types::Chirp,
    error::{Error, Result},
    users::repo_types::User,
};

/// Everything the service persists, written to disk as a single JSON object.
///
/// Map keys are entity ids; serde_json writes them as decimal strings.
/// Refresh tokens are keyed by their owner's id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub chirps: BTreeMap<u64, Chirp>,
    #[serde(default)]
    pub users: BTreeMap<u64, User>,
    #[serde(default)]
    pub refresh_tokens: BTreeMap<u64, RefreshToken>,
}

impl Document {
    pub fn next_user_id(&self) -> Result<u64> {
        next_id("user", &self.users)
    }

    pub fn next_chirp_id(&self) -> Result<u64> {
        next_id("chirp", &self.chirps)
    }
}

/// Ids are handed out as `count + 1`, not `max + 1`. A collision with a
/// surviving id is reported instead of overwriting the existing record.
fn next_id<T>(kind: &str, entries: &BTreeMap<u64, T>) -> Result<u64> {
    let id = entries.len() as u64 + 1;
    if entries.contains_key(&id) {
        return Err(Error::CorruptStore(format!("{kind} id {id} is already taken")));
    }
    Ok(id)
}

/// Flat-file datastore guarded by one coarse read/write lock.
///
/// `load` runs under the shared lock; `save`, `mutate` and `reset` under the
/// exclusive one. Mutations must go through `mutate` so that the read, the
/// change and the write happen inside a single exclusive section.
#[derive(Debug)]
pub struct Store {
    path: PathBuf,
    lock: RwLock<()>,
}

impl Store {
    /// Open the store at `path`, creating an empty document if the file is absent.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return Err(Error::StoreUnavailable("path is empty".into()));
        }
        let store = Self {
            path,
            lock: RwLock::new(()),
        };
        store.ensure_initialized().await?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn ensure_initialized(&self) -> Result<()> {
        let _guard = self.lock.write().await;
        let exists = tokio::fs::try_exists(&self.path)
            .await
            .map_err(|e| self.unavailable("stat", e))?;
        if exists {
            return Ok(());
        }
        info!(path = %self.path.display(), "creating empty store");
        self.write_document(&Document::default()).await
    }

    pub async fn load(&self) -> Result<Document> {
        let _guard = self.lock.read().await;
        self.read_document().await
    }

    pub async fn save(&self, doc: &Document) -> Result<()> {
        let _guard = self.lock.write().await;
        self.write_document(doc).await
    }

    /// Load, apply `f` and persist while holding the exclusive lock.
    /// Nothing is written when `f` fails.
    pub async fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Document) -> Result<T>,
    {
        let _guard = self.lock.write().await;
        let mut doc = self.read_document().await?;
        let out = f(&mut doc)?;
        self.write_document(&doc).await?;
        Ok(out)
    }

    /// Replace whatever is on disk with an empty document.
    pub async fn reset(&self) -> Result<()> {
        info!(path = %self.path.display(), "resetting store");
        self.save(&Document::default()).await
    }

    async fn read_document(&self) -> Result<Document> {
        let data = tokio::fs::read(&self.path)
            .await
            .map_err(|e| self.unavailable("read", e))?;
        serde_json::from_slice(&data).map_err(|e| Error::CorruptStore(e.to_string()))
    }

    async fn write_document(&self, doc: &Document) -> Result<()> {
        let payload = serde_json::to_vec(doc)
            .map_err(|e| Error::StoreUnavailable(format!("encode document: {e}")))?;

        // write beside the target, then swap it in
        let temp_path = self
            .path
            .with_extension(format!("{}.tmp", Uuid::new_v4().simple()));
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|e| self.unavailable("write", e))?;
        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.unavailable("rename", e));
        }
        debug!(
            path = %self.path.display(),
            users = doc.users.len(),
            chirps = doc.chirps.len(),
            refresh_tokens = doc.refresh_tokens.len(),
            "store written"
        );
        Ok(())
    }

    fn unavailable(&self, op: &str, e: std::io::Error) -> Error {
        Error::StoreUnavailable(format!("{op} {}: {e}", self.path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    async fn open_temp() -> (Store, TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = Store::open(dir.path().join("database.json"))
            .await
            .expect("open store");
        (store, dir)
    }

    fn chirp(id: u64, author_id: u64, body: &str) -> Chirp {
        Chirp {
            id,
            author_id,
            body: body.into(),
        }
    }

    #[tokio::test]
    async fn open_creates_empty_document() {
        let (store, _dir) = open_temp().await;
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["chirps"], serde_json::json!({}));
        assert_eq!(value["users"], serde_json::json!({}));
        assert_eq!(value["refresh_tokens"], serde_json::json!({}));
        assert_eq!(store.load().await.unwrap(), Document::default());
    }

    #[tokio::test]
    async fn open_rejects_empty_path() {
        let err = Store::open("").await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn ensure_initialized_keeps_existing_data() {
        let (store, dir) = open_temp().await;
        store
            .mutate(|doc| {
                doc.chirps.insert(1, chirp(1, 1, "hello"));
                Ok(())
            })
            .await
            .unwrap();

        store.ensure_initialized().await.unwrap();
        let reopened = Store::open(dir.path().join("database.json")).await.unwrap();
        assert_eq!(reopened.load().await.unwrap().chirps.len(), 1);
    }

    #[tokio::test]
    async fn missing_top_level_keys_load_as_empty() {
        let (store, _dir) = open_temp().await;
        std::fs::write(
            store.path(),
            r#"{"chirps":{"1":{"id":1,"author_id":3,"body":"hi"}}}"#,
        )
        .unwrap();

        let doc = store.load().await.unwrap();
        assert_eq!(doc.chirps[&1], chirp(1, 3, "hi"));
        assert!(doc.users.is_empty());
        assert!(doc.refresh_tokens.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_is_corrupt() {
        let (store, _dir) = open_temp().await;
        std::fs::write(store.path(), "{not json").unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::CorruptStore(_)));
    }

    #[tokio::test]
    async fn vanished_file_is_unavailable() {
        let (store, _dir) = open_temp().await;
        std::fs::remove_file(store.path()).unwrap();
        let err = store.load().await.unwrap_err();
        assert!(matches!(err, Error::StoreUnavailable(_)));
    }

    #[tokio::test]
    async fn save_of_loaded_document_is_unchanged() {
        let (store, _dir) = open_temp().await;
        store
            .mutate(|doc| {
                doc.chirps.insert(1, chirp(1, 2, "first"));
                doc.chirps.insert(2, chirp(2, 1, "second"));
                Ok(())
            })
            .await
            .unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let doc = store.load().await.unwrap();
        store.save(&doc).await.unwrap();

        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[tokio::test]
    async fn failed_mutation_is_not_persisted() {
        let (store, _dir) = open_temp().await;
        let err = store
            .mutate(|doc| {
                doc.chirps.insert(1, chirp(1, 1, "never saved"));
                Err::<(), _>(Error::Forbidden)
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden));
        assert!(store.load().await.unwrap().chirps.is_empty());
    }

    #[tokio::test]
    async fn reset_clears_everything() {
        let (store, _dir) = open_temp().await;
        store
            .mutate(|doc| {
                doc.chirps.insert(1, chirp(1, 1, "gone soon"));
                Ok(())
            })
            .await
            .unwrap();
        store.reset().await.unwrap();
        assert_eq!(store.load().await.unwrap(), Document::default());
    }

    #[test]
    fn next_id_is_count_plus_one() {
        let mut doc = Document::default();
        assert_eq!(doc.next_chirp_id().unwrap(), 1);
        doc.chirps.insert(1, chirp(1, 1, "a"));
        doc.chirps.insert(2, chirp(2, 1, "b"));
        assert_eq!(doc.next_chirp_id().unwrap(), 3);
        assert_eq!(doc.next_user_id().unwrap(), 1);
    }

    #[test]
    fn next_id_reports_collision() {
        let mut doc = Document::default();
        doc.chirps.insert(1, chirp(1, 1, "a"));
        doc.chirps.insert(3, chirp(3, 1, "c"));
        assert!(matches!(doc.next_chirp_id(), Err(Error::CorruptStore(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_mutations_are_serialized() {
        let (store, _dir) = open_temp().await;
        let store = Arc::new(store);

        let mut tasks = Vec::new();
        for n in 0..16u64 {
            let store = Arc::clone(&store);
            tasks.push(tokio::spawn(async move {
                store
                    .mutate(|doc| {
                        let id = doc.next_chirp_id()?;
                        doc.chirps.insert(id, chirp(id, n, "racing"));
                        Ok(id)
                    })
                    .await
            }));
        }

        let mut ids = Vec::new();
        for t in tasks {
            ids.push(t.await.unwrap().unwrap());
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=16).collect::<Vec<_>>());
        assert_eq!(store.load().await.unwrap().chirps.len(), 16);
    }
}
