//! Range query engine: messages between two users inside a time window.
//!
//! Scan both directions of the pair, drop entries outside the window,
//! collapse entries that point at the same canonical key, dereference,
//! and sort newest first. Dangling pointers are skipped.

use std::collections::HashSet;

use tracing::{debug, warn};

use super::error::{ChatError, ChatResult};
use super::lookup::LookupIndex;
use super::model::ChatMessage;
use super::records::ChatRecordStore;
use super::timestamp::TimeWindow;

#[derive(Clone)]
pub struct RangeQueryEngine {
    lookup: LookupIndex,
    records: ChatRecordStore,
}

impl RangeQueryEngine {
    pub fn new(lookup: LookupIndex, records: ChatRecordStore) -> Self {
        Self { lookup, records }
    }

    /// Query with boundary tokens (`-inf`, `+inf`, or integer seconds).
    pub async fn query_between(
        &self,
        user_a: &str,
        user_b: &str,
        from: &str,
        to: &str,
    ) -> ChatResult<Vec<ChatMessage>> {
        self.query_window(user_a, user_b, TimeWindow::resolve(from, to))
            .await
    }

    /// Query with a resolved window. Inclusive on both ends.
    pub async fn query_window(
        &self,
        user_a: &str,
        user_b: &str,
        window: TimeWindow,
    ) -> ChatResult<Vec<ChatMessage>> {
        let mut seen = HashSet::new();
        let mut messages = Vec::new();

        let candidates = self
            .lookup
            .enumerate(user_a, user_b)
            .await?
            .filter(|entry| window.contains(entry.timestamp));

        for entry in candidates {
            for target in self.lookup.targets(&entry).await? {
                // Both directions point at the same record
                if !seen.insert(target.clone()) {
                    continue;
                }
                match self.records.get(&target).await {
                    Ok(Some(message)) => messages.push(message),
                    Ok(None) => debug!("orphaned lookup {} -> {target}, skipping", entry.key()),
                    Err(e @ ChatError::CorruptRecord { .. }) => warn!("{e}, skipping"),
                    Err(e) => return Err(e),
                }
            }
        }

        // Stable: equal timestamps keep enumeration order
        messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(messages)
    }
}
