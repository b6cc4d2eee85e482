//! In-process store. Volatile; used for tests and ephemeral runs.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::{StoreError, StoreResult};
use super::keyspace::{Keyspace, Mutation};
use super::{KvStore, ScoredMember};

#[derive(Debug, Default)]
pub struct MemoryStore {
    keyspace: RwLock<Keyspace>,
    closed: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn mutate(&self, mutation: Mutation) -> StoreResult<bool> {
        self.ensure_open()?;
        self.keyspace.write().await.apply(mutation)
    }
}

#[async_trait]
impl KvStore for MemoryStore {
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
        self.closed.store(true, Ordering::Release);
        Ok(())
    }
}
