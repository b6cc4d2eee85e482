//! Chat data model.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One message between two participants. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: String,
    pub to: String,
    #[serde(rename = "message")]
    pub body: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
}

impl ChatMessage {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
        body: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            body: body.into(),
            timestamp,
        }
    }
}

/// Store-unique key of one persisted `ChatMessage`. Never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A contact and the last time the owner interacted with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactListEntry {
    pub username: String,
    pub last_activity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_json_field_names() {
        let msg = ChatMessage::new("alice", "bob", "hi", 100);
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"from": "alice", "to": "bob", "message": "hi", "timestamp": 100})
        );
        let back: ChatMessage = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn canonical_key_serializes_as_plain_string() {
        let key = CanonicalKey::new("chat:abc");
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"chat:abc\"");
        assert_eq!(key.to_string(), "chat:abc");
    }
}
