//! Key schema: how chat entities map onto primitive store keys.
//!
//! ```text
//! chat:<uuid>                   canonical message record (JSON string)
//! lookup:<from>:<to>:<ts>       set of canonical keys sent at <ts> within the ordered pair
//! contacts:<user>               ranked set: contact -> last interaction
//! user:<name>                   registry credential
//! users                         registry membership set
//! ```
//!
//! User ids must not contain `:`; a lookup key is decomposed by splitting on
//! it. This module does not check that; callers validate with
//! [`is_valid_user_id`].

use glob::Pattern;
use uuid::Uuid;

use super::model::CanonicalKey;

pub const DELIMITER: char = ':';

const CHAT_PREFIX: &str = "chat";
const LOOKUP_PREFIX: &str = "lookup";
const CONTACTS_PREFIX: &str = "contacts";
const USER_PREFIX: &str = "user";

/// Registry membership set.
pub const USER_SET_KEY: &str = "users";

/// A fresh canonical key for a new message.
pub fn new_chat_key() -> CanonicalKey {
    CanonicalKey::new(format!("{CHAT_PREFIX}:{}", Uuid::new_v4().simple()))
}

/// `lookup:<from>:<to>:<timestamp>`
pub fn lookup_key(from: &str, to: &str, timestamp: i64) -> String {
    format!("{LOOKUP_PREFIX}:{from}:{to}:{timestamp}")
}

/// Glob matching every lookup key of the ordered pair (from, to).
/// User ids are escaped so glob metacharacters in them match literally.
pub fn lookup_pattern(from: &str, to: &str) -> String {
    format!(
        "{LOOKUP_PREFIX}:{}:{}:*",
        Pattern::escape(from),
        Pattern::escape(to)
    )
}

/// Split a lookup key back into (from, to, timestamp).
/// `None` unless it has exactly the four fields and an integer timestamp.
pub fn parse_lookup_key(key: &str) -> Option<(String, String, i64)> {
    let mut parts = key.split(DELIMITER);
    let (prefix, from, to, ts) = (parts.next()?, parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() || prefix != LOOKUP_PREFIX {
        return None;
    }
    let ts = ts.parse::<i64>().ok()?;
    Some((from.to_string(), to.to_string(), ts))
}

/// `contacts:<user>`
pub fn contact_list_key(user: &str) -> String {
    format!("{CONTACTS_PREFIX}:{user}")
}

/// `user:<name>`
pub fn user_key(name: &str) -> String {
    format!("{USER_PREFIX}:{name}")
}

/// Non-empty and free of the key delimiter.
pub fn is_valid_user_id(user: &str) -> bool {
    !user.is_empty() && !user.contains(DELIMITER)
}
