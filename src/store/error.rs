//! Store-specific error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("WAL error: {0}")]
    Wal(String),

    #[error("wrong kind of value held at key {key}")]
    WrongType { key: String },

    #[error("invalid key pattern: {0}")]
    InvalidPattern(String),

    #[error("store is closed")]
    Closed,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;
