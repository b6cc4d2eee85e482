//! Durable store: the in-memory keyspace behind a write-ahead log.
//!
//! Mutations go to the WAL first, then to memory. `open()` replays the
//! log to rebuild state; `compact()` rewrites it as the minimal op
//! sequence for the current state.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use super::error::{StoreError, StoreResult};
use super::keyspace::{Keyspace, Mutation};
use super::wal::{Replay, Wal, WalEntry};
use super::{KvStore, ScoredMember};

/// WAL file name inside the data directory.
pub const WAL_FILE: &str = "store.wal";

pub struct DurableStore {
    keyspace: RwLock<Keyspace>,
    wal: Mutex<Wal>,
    closed: AtomicBool,
    data_dir: PathBuf,
}

impl DurableStore {
    /// Open or create the store at the given data directory.
    /// Replays the WAL to recover state.
    pub fn open(data_dir: &Path, sync_writes: bool) -> StoreResult<Self> {
        std::fs::create_dir_all(data_dir)?;

        let mut wal = Wal::open(&data_dir.join(WAL_FILE), sync_writes)?;
        let mut keyspace = Keyspace::new();

        let Replay { entries, torn_at } = wal.replay()?;
        // New appends must not land behind a partial entry
        if let Some(offset) = torn_at {
            warn!("dropping partial WAL entry at offset {offset}");
            wal.truncate(offset)?;
        }
        let mut skipped = 0usize;
        for entry in &entries {
            let applied = entry
                .to_mutation()
                .map(|m| keyspace.apply(m).is_ok())
                .unwrap_or(false);
            if !applied {
                skipped += 1;
            }
        }
        if skipped > 0 {
            warn!("skipped {skipped} undecodable WAL entries during replay");
        }
        info!(
            "store opened at {}: {} entries replayed, {} keys",
            data_dir.display(),
            entries.len() - skipped,
            keyspace.len()
        );

        Ok(Self {
            keyspace: RwLock::new(keyspace),
            wal: Mutex::new(wal),
            closed: AtomicBool::new(false),
            data_dir: data_dir.to_path_buf(),
        })
    }

    /// Rewrite the WAL so it holds only what the current state needs.
    /// Returns the new log size in bytes.
    pub async fn compact(&self) -> StoreResult<u64> {
        self.ensure_open()?;
        // Writers hold the keyspace lock across their WAL append; holding it
        // here keeps the snapshot and the log in step.
        let keyspace = self.keyspace.read().await;
        let entries: Vec<WalEntry> = keyspace
            .snapshot()
            .iter()
            .map(WalEntry::from_mutation)
            .collect();

        let mut wal = self.wal.lock().await;
        let before = wal.size()?;
        wal.rewrite(&entries)?;
        let after = wal.size()?;
        info!("compacted {}: {before} -> {after} bytes", wal.path().display());
        Ok(after)
    }

    /// Data directory path.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Single-writer path. The keyspace write lock is held across the WAL
    /// append (and its fsync), so log order is apply order and readers wait
    /// out an in-flight sync.
    async fn mutate(&self, mutation: Mutation) -> StoreResult<bool> {
        self.ensure_open()?;
        let mut keyspace = self.keyspace.write().await;
        keyspace.check(&mutation)?;

        // WAL first, then apply to state
        self.wal
            .lock()
            .await
            .append(&WalEntry::from_mutation(&mutation))?;
        keyspace.apply(mutation)
    }
}

#[async_trait]
impl KvStore for DurableStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.mutate(Mutation::Set {
            key: key.to_string(),
            value: value.to_string(),
        })
        .await
        .map(|_| ())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.ensure_open()?;
        self.keyspace.read().await.get(key)
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        self.mutate(Mutation::Del {
            key: key.to_string(),
        })
        .await
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.mutate(Mutation::SetAdd {
            key: key.to_string(),
            member: member.to_string(),
        })
        .await
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        self.keyspace.read().await.sismember(key, member)
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        self.keyspace.read().await.smembers(key)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        self.mutate(Mutation::ZSetAdd {
            key: key.to_string(),
            score,
            member: member.to_string(),
        })
        .await
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.ensure_open()?;
        self.keyspace.read().await.zrange(key, start, stop, rev)
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.ensure_open()?;
        self.keyspace.read().await.keys(pattern)
    }

    async fn close(&self) -> StoreResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.wal.lock().await.sync()?;
        info!("store at {} closed", self.data_dir.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn opens_and_creates_dirs() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(&dir.path().join("data"), true).unwrap();
        assert!(dir.path().join("data").join(WAL_FILE).exists());
        assert_eq!(store.data_dir(), dir.path().join("data"));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = DurableStore::open(dir.path(), true).unwrap();
            store.set("chat:1", "{}").await.unwrap();
            store.set("gone", "x").await.unwrap();
            store.del("gone").await.unwrap();
            store.sadd("users", "alice").await.unwrap();
            store.zadd("contacts:alice", 100.0, "bob").await.unwrap();
            store.zadd("contacts:alice", 200.0, "bob").await.unwrap();
            store.close().await.unwrap();
        }

        let store = DurableStore::open(dir.path(), true).unwrap();
        assert_eq!(store.get("chat:1").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(store.get("gone").await.unwrap(), None);
        assert!(store.sismember("users", "alice").await.unwrap());
        let contacts = store
            .zrange_with_scores("contacts:alice", 0, -1, true)
            .await
            .unwrap();
        assert_eq!(
            contacts,
            vec![ScoredMember {
                member: "bob".into(),
                score: 200.0
            }]
        );
    }

    #[tokio::test]
    async fn rejected_mutation_is_not_logged() {
        let dir = TempDir::new().unwrap();
        {
            let store = DurableStore::open(dir.path(), true).unwrap();
            store.set("k", "v").await.unwrap();
            assert!(store.sadd("k", "m").await.is_err());
        }

        let wal = Wal::open(&dir.path().join(WAL_FILE), true).unwrap();
        assert_eq!(wal.replay().unwrap().entries.len(), 1);
    }

    #[tokio::test]
    async fn writes_after_torn_tail_survive_restart() {
        let dir = TempDir::new().unwrap();
        let wal_path = dir.path().join(WAL_FILE);
        {
            let store = DurableStore::open(dir.path(), true).unwrap();
            store.set("kept", "1").await.unwrap();
            store.set("torn", "2").await.unwrap();
            store.close().await.unwrap();
        }
        let len = std::fs::metadata(&wal_path).unwrap().len();
        std::fs::OpenOptions::new()
            .write(true)
            .open(&wal_path)
            .unwrap()
            .set_len(len - 3)
            .unwrap();

        {
            let store = DurableStore::open(dir.path(), true).unwrap();
            assert_eq!(store.get("torn").await.unwrap(), None);
            store.set("chat:1", "{}").await.unwrap();
            store.zadd("contacts:alice", 100.0, "bob").await.unwrap();
            store.close().await.unwrap();
        }

        let store = DurableStore::open(dir.path(), true).unwrap();
        assert_eq!(store.get("kept").await.unwrap().as_deref(), Some("1"));
        assert_eq!(store.get("chat:1").await.unwrap().as_deref(), Some("{}"));
        assert_eq!(
            store
                .zrange_with_scores("contacts:alice", 0, -1, true)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(store.get("torn").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_writers_replay_to_same_state() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DurableStore::open(dir.path(), true).unwrap());

        let mut tasks = Vec::new();
        for i in 0..32 {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.set("last", &i.to_string()).await.unwrap();
                store.zadd("contacts:alice", i as f64, "bob").await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let last = store.get("last").await.unwrap();
        let rank = store
            .zrange_with_scores("contacts:alice", 0, -1, true)
            .await
            .unwrap();
        store.close().await.unwrap();

        let reopened = DurableStore::open(dir.path(), true).unwrap();
        assert_eq!(reopened.get("last").await.unwrap(), last);
        assert_eq!(
            reopened
                .zrange_with_scores("contacts:alice", 0, -1, true)
                .await
                .unwrap(),
            rank
        );
    }

    #[tokio::test]
    async fn compact_shrinks_log_and_keeps_state() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path(), false).unwrap();
        for i in 0..50 {
            store.set("counter", &i.to_string()).await.unwrap();
        }
        store.sadd("users", "alice").await.unwrap();

        let before = std::fs::metadata(dir.path().join(WAL_FILE)).unwrap().len();
        let after = store.compact().await.unwrap();
        assert!(after < before);

        store.set("later", "1").await.unwrap();
        store.close().await.unwrap();

        let reopened = DurableStore::open(dir.path(), true).unwrap();
        assert_eq!(reopened.get("counter").await.unwrap().as_deref(), Some("49"));
        assert_eq!(reopened.get("later").await.unwrap().as_deref(), Some("1"));
        assert!(reopened.sismember("users", "alice").await.unwrap());
    }

    #[tokio::test]
    async fn close_is_idempotent_and_blocks_writes() {
        let dir = TempDir::new().unwrap();
        let store = DurableStore::open(dir.path(), true).unwrap();
        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(matches!(
            store.set("k", "v").await.unwrap_err(),
            StoreError::Closed
        ));
        assert!(matches!(store.compact().await.unwrap_err(), StoreError::Closed));
    }
}
