//! Chat-index error types.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// One of a pair of derived-index writes landed, the other did not.
    /// The landed write is not rolled back.
    #[error("partial {index} write: {applied} written, {failed} failed: {source}")]
    PartialIndexWrite {
        index: &'static str,
        applied: String,
        failed: String,
        source: StoreError,
    },

    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("corrupt chat record at {key}: {reason}")]
    CorruptRecord { key: String, reason: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type ChatResult<T> = Result<T, ChatError>;

/// Fold the outcomes of two independent writes to one derived index.
///
/// Both landed: `Ok`. Neither: the first store error. Exactly one:
/// `PartialIndexWrite` naming which key made it and which did not.
pub(crate) fn combine_pair_writes<T, U>(
    index: &'static str,
    first: (String, Result<T, StoreError>),
    second: (String, Result<U, StoreError>),
) -> ChatResult<()> {
    match (first, second) {
        ((_, Ok(_)), (_, Ok(_))) => Ok(()),
        ((_, Err(e)), (_, Err(_))) => Err(e.into()),
        ((applied, Ok(_)), (failed, Err(source))) | ((failed, Err(source)), (applied, Ok(_))) => {
            Err(ChatError::PartialIndexWrite {
                index,
                applied,
                failed,
                source,
            })
        }
    }
}
