//! Chat record store: the canonical copy of every message.

use std::sync::Arc;

use super::error::{ChatError, ChatResult};
use super::keys;
use super::model::{CanonicalKey, ChatMessage};
use crate::store::KvStore;

#[derive(Clone)]
pub struct ChatRecordStore {
    store: Arc<dyn KvStore>,
}

impl ChatRecordStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Serialize and store under a fresh canonical key. No retry.
    pub async fn put(&self, message: &ChatMessage) -> ChatResult<CanonicalKey> {
        let key = keys::new_chat_key();
        let json = serde_json::to_string(message)?;
        self.store.set(key.as_str(), &json).await?;
        Ok(key)
    }

    /// `None` when nothing lives at `key` (an orphaned pointer is normal).
    pub async fn get(&self, key: &CanonicalKey) -> ChatResult<Option<ChatMessage>> {
        let Some(json) = self.store.get(key.as_str()).await? else {
            return Ok(None);
        };
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| ChatError::CorruptRecord {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn put_then_get() {
        let records = ChatRecordStore::new(Arc::new(MemoryStore::new()));
        let msg = ChatMessage::new("alice", "bob", "hi", 100);

        let key = records.put(&msg).await.unwrap();
        assert_eq!(records.get(&key).await.unwrap(), Some(msg));
    }

    #[tokio::test]
    async fn each_put_gets_its_own_key() {
        let records = ChatRecordStore::new(Arc::new(MemoryStore::new()));
        let msg = ChatMessage::new("alice", "bob", "same", 100);
        let a = records.put(&msg).await.unwrap();
        let b = records.put(&msg).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn missing_record_is_none() {
        let records = ChatRecordStore::new(Arc::new(MemoryStore::new()));
        let got = records.get(&CanonicalKey::new("chat:nope")).await.unwrap();
        assert_eq!(got, None);
    }

    #[tokio::test]
    async fn garbage_record_is_corrupt() {
        let store = Arc::new(MemoryStore::new());
        store.set("chat:bad", "not json").await.unwrap();
        let records = ChatRecordStore::new(store);

        let err = records
            .get(&CanonicalKey::new("chat:bad"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CorruptRecord { .. }));
    }
}
