//! Chat index: two-party message history and contact recency on a
//! primitive key-value store.
//!
//! Write path: record → two lookup entries → two contact touches.
//! Only the record write is load-bearing; the derived-index writes are
//! best effort and their failures are logged, not surfaced.
//!
//! Read path: scan lookup keys for both orderings of the pair → window
//! filter → dedup by canonical key → dereference → newest first.

pub mod contacts;
pub mod error;
pub mod keys;
pub mod lookup;
pub mod model;
pub mod query;
pub mod records;
pub mod timestamp;

use std::sync::Arc;

use tracing::{debug, warn};

pub use contacts::ContactIndex;
pub use error::{ChatError, ChatResult};
pub use lookup::{LookupEntry, LookupIndex};
pub use model::{CanonicalKey, ChatMessage, ContactListEntry};
pub use query::RangeQueryEngine;
pub use records::ChatRecordStore;
pub use timestamp::TimeWindow;

use crate::store::KvStore;

/// The chat index: wraps every component over one injected store.
pub struct ChatService {
    store: Arc<dyn KvStore>,
    records: ChatRecordStore,
    lookup: LookupIndex,
    contacts: ContactIndex,
    engine: RangeQueryEngine,
}

impl ChatService {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let records = ChatRecordStore::new(store.clone());
        let lookup = LookupIndex::new(store.clone());
        let contacts = ContactIndex::new(store.clone());
        let engine = RangeQueryEngine::new(lookup.clone(), records.clone());
        Self {
            store,
            records,
            lookup,
            contacts,
            engine,
        }
    }

    /// Persist one message and index it. Returns its canonical key.
    ///
    /// Fails only if the record itself can't be written.
    pub async fn create_chat(&self, message: &ChatMessage) -> ChatResult<CanonicalKey> {
        validate_user_id(&message.from)?;
        validate_user_id(&message.to)?;

        let key = self.records.put(message).await?;
        debug!("chat {key} stored ({} -> {})", message.from, message.to);

        if let Err(e) = self
            .lookup
            .index(&message.from, &message.to, message.timestamp, &key)
            .await
        {
            warn!("lookup index for {key} incomplete: {e}");
        }

        if let Err(e) = self
            .contacts
            .touch_pair(&message.from, &message.to, message.timestamp)
            .await
        {
            warn!(
                "contact lists of {} and {} not fully updated: {e}",
                message.from, message.to
            );
        }

        Ok(key)
    }

    /// Messages between `user_a` and `user_b` in `[from, to]`, newest first.
    /// Tokens: `-inf`, `+inf`/`inf`, or integer seconds.
    pub async fn fetch_chat_between(
        &self,
        user_a: &str,
        user_b: &str,
        from: &str,
        to: &str,
    ) -> ChatResult<Vec<ChatMessage>> {
        validate_user_id(user_a)?;
        validate_user_id(user_b)?;
        self.engine.query_between(user_a, user_b, from, to).await
    }

    /// `user`'s contacts, most recent interaction first.
    pub async fn fetch_contact_list(&self, user: &str) -> ChatResult<Vec<ContactListEntry>> {
        validate_user_id(user)?;
        self.contacts.list(user).await
    }

    /// Mark `contact` as just interacted with in `owner`'s list.
    pub async fn update_contact_list(&self, owner: &str, contact: &str) -> ChatResult<()> {
        self.update_contact_list_at(owner, contact, timestamp::now_secs())
            .await
    }

    pub async fn update_contact_list_at(
        &self,
        owner: &str,
        contact: &str,
        timestamp: i64,
    ) -> ChatResult<()> {
        validate_user_id(owner)?;
        validate_user_id(contact)?;
        self.contacts.touch(owner, contact, timestamp).await
    }

    /// Close the underlying store.
    pub async fn close(&self) -> ChatResult<()> {
        self.store.close().await?;
        Ok(())
    }
}

fn validate_user_id(user: &str) -> ChatResult<()> {
    if keys::is_valid_user_id(user) {
        Ok(())
    } else {
        Err(ChatError::InvalidUserId(user.to_string()))
    }
}
