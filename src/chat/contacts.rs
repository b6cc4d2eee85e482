//! Contact recency index: per-user ranked set of contacts.
//!
//! Rank is the last interaction timestamp. A touch overwrites the rank by
//! value, so touching with an older timestamp moves a contact back down.

use std::sync::Arc;

use super::error::{combine_pair_writes, ChatResult};
use super::keys;
use super::model::ContactListEntry;
use crate::store::KvStore;

#[derive(Clone)]
pub struct ContactIndex {
    store: Arc<dyn KvStore>,
}

impl ContactIndex {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Upsert `contact` in `owner`'s list with rank `timestamp`.
    pub async fn touch(&self, owner: &str, contact: &str, timestamp: i64) -> ChatResult<()> {
        self.store
            .zadd(&keys::contact_list_key(owner), timestamp as f64, contact)
            .await?;
        Ok(())
    }

    /// Touch both participants' lists. Independent writes, like the lookup pair.
    pub async fn touch_pair(&self, a: &str, b: &str, timestamp: i64) -> ChatResult<()> {
        let a_key = keys::contact_list_key(a);
        let a_result = self.store.zadd(&a_key, timestamp as f64, b).await;

        let b_key = keys::contact_list_key(b);
        let b_result = self.store.zadd(&b_key, timestamp as f64, a).await;

        combine_pair_writes("contacts", (a_key, a_result), (b_key, b_result))
    }

    /// Full list, most recent first.
    pub async fn list(&self, owner: &str) -> ChatResult<Vec<ContactListEntry>> {
        let ranked = self
            .store
            .zrange_with_scores(&keys::contact_list_key(owner), 0, -1, true)
            .await?;
        Ok(ranked
            .into_iter()
            .map(|m| ContactListEntry {
                username: m.member,
                last_activity: m.score as i64,
            })
            .collect())
    }
}
