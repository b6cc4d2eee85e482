//! Store: the primitive key-value backend the chat index is built on.
//!
//! Only point reads/writes, unordered sets, score-ranked sets and a glob
//! key scan. No secondary indexes, no range queries, no transactions.
//! Everything above this module synthesizes those out of individual keys.
//!
//! Two backends:
//! - `MemoryStore`: in-process, volatile
//! - `DurableStore`: the same keyspace fronted by a write-ahead log

pub mod durable;
pub mod error;
#[cfg(test)]
pub mod faulty;
pub mod keyspace;
pub mod memory;
pub mod wal;

use async_trait::async_trait;

pub use durable::DurableStore;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;

/// One member of a ranked set together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

/// Primitive key-value operations. Every call is one round-trip; nothing
/// spans more than a single key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// `SET key value` (last write wins).
    async fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// `GET key`. `None` when absent.
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// `DEL key`. Returns whether a key was removed.
    async fn del(&self, key: &str) -> StoreResult<bool>;

    /// `SADD set member`. Returns whether the member was new.
    async fn sadd(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// `SISMEMBER set member`.
    async fn sismember(&self, key: &str, member: &str) -> StoreResult<bool>;

    /// `SMEMBERS set`, lexicographic.
    async fn smembers(&self, key: &str) -> StoreResult<Vec<String>>;

    /// `ZADD zset score member`. Returns whether the member was new;
    /// an existing member's score is overwritten.
    async fn zadd(&self, key: &str, score: f64, member: &str) -> StoreResult<bool>;

    /// `ZRANGE zset start stop [REV] WITHSCORES`.
    async fn zrange_with_scores(
        &self,
        key: &str,
        start: i64,
        stop: i64,
        rev: bool,
    ) -> StoreResult<Vec<ScoredMember>>;

    /// `KEYS pattern`. Scans the whole key space.
    async fn keys(&self, pattern: &str) -> StoreResult<Vec<String>>;

    /// End the store's lifecycle. Later calls fail with `StoreError::Closed`.
    async fn close(&self) -> StoreResult<()>;
}
