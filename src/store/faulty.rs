//! Fault-injecting store for exercising partial-write paths.

use async_trait::async_trait;
use glob::Pattern;

use super::error::{StoreError, StoreResult};
use super::memory::MemoryStore;
use super::{KvStore, ScoredMember};

/// A `MemoryStore` whose writes to keys matching any of the given globs fail.
pub struct FaultyStore {
    inner: MemoryStore,
    failing: Vec<Pattern>,
}

impl FaultyStore {
    pub fn failing_writes(patterns: &[&str]) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing: patterns
                .iter()
                .map(|p| Pattern::new(p).expect("valid fault pattern"))
                .collect(),
        }
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn check(&self, key: &str) -> StoreResult<()> {
        if self.failing.iter().any(|p| p.matches(key)) {
            return Err(StoreError::Unavailable(format!("injected write fault on {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl KvStore for FaultyStore {
    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.check(key)?;
        self.inner.set(key, value).await
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn del(&self, key: &str) -> StoreResult<bool> {
        self.check(key)?;
        self.inner.del(key).await
    }

    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.check(key)?;
        self.inner.sadd(key, member).await
    }

    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool> {
        self.inner.sismember(key, member).await
    }

    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>> {
        self.inner.smembers(key).await
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool> {
        self.check(key)?;
        self.inner.zadd(key, score, member).await
    }

    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>> {
        self.inner.zrange_with_scores(key, start, stop, rev).await
    }

    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>> {
        self.inner.keys(pattern).await
    }

    async fn close(&self) -> StoreResult<()> {
        self.inner.close().await
    }
}
