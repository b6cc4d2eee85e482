//! chatindex: two-party chat history and contact recency over a
//! primitive key-value store.
//!
//! The store offers point reads/writes, sets, ranked sets and a key scan.
//! `chat` builds a bidirectional (pair, time) lookup index and a per-user
//! contact ranking on top of it; `registry` keeps user credentials.

pub mod chat;
pub mod config;
pub mod registry;
pub mod store;
