//! Bidirectional lookup index.
//!
//! Every message gets two entries, one per direction of its participant
//! pair, both at the message's timestamp and both pointing at its
//! canonical key. The two writes are independent; a failure between them
//! leaves the index asymmetric and is reported, not undone.
//!
//! Enumeration is a pattern scan over the whole key space. Its cost tracks
//! the number of lookup keys for the pair, not the window asked for.

use std::sync::Arc;

use super::error::{combine_pair_writes, ChatResult};
use super::keys;
use super::model::CanonicalKey;
use crate::store::KvStore;

/// One lookup key, decomposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupEntry {
    pub from: String,
    pub to: String,
    pub timestamp: i64,
}

impl LookupEntry {
    pub fn key(&self) -> String {
        keys::lookup_key(&self.from, &self.to, self.timestamp)
    }
}

#[derive(Clone)]
pub struct LookupIndex {
    store: Arc<dyn KvStore>,
}

impl LookupIndex {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Write both directions for one message.
    pub async fn index(
        &self,
        from: &str,
        to: &str,
        timestamp: i64,
        target: &CanonicalKey,
    ) -> ChatResult<()> {
        let forward = keys::lookup_key(from, to, timestamp);
        let forward_result = self.store.sadd(&forward, target.as_str()).await;

        let reverse = keys::lookup_key(to, from, timestamp);
        let reverse_result = self.store.sadd(&reverse, target.as_str()).await;

        combine_pair_writes("lookup", (forward, forward_result), (reverse, reverse_result))
    }

    /// Every entry of (a, b) and of (b, a), unordered and unfiltered.
    pub async fn enumerate(
        &self,
        user_a: &str,
        user_b: &str,
    ) -> ChatResult<impl Iterator<Item = LookupEntry>> {
        let mut found = self.store.keys(&keys::lookup_pattern(user_a, user_b)).await?;
        if user_a != user_b {
            found.extend(self.store.keys(&keys::lookup_pattern(user_b, user_a)).await?);
        }

        Ok(found.into_iter().filter_map(|key| {
            let (from, to, timestamp) = keys::parse_lookup_key(&key)?;
            Some(LookupEntry {
                from,
                to,
                timestamp,
            })
        }))
    }

    /// Canonical keys an entry points at. Empty if the entry vanished.
    pub async fn targets(&self, entry: &LookupEntry) -> ChatResult<Vec<CanonicalKey>> {
        let members = self.store.smembers(&entry.key()).await?;
        Ok(members.into_iter().map(CanonicalKey::new).collect())
    }
}
