//! User registry: plain credential storage plus a membership set.
//!
//! Registration is two writes (credential key, then set membership). If
//! the second fails the first is deleted again.

use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use crate::chat::keys::{self, USER_SET_KEY};
use crate::store::{KvStore, StoreError};

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("user already exists: {0}")]
    UserExists(String),

    #[error("unknown user: {0}")]
    UnknownUser(String),

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("invalid user id: {0:?}")]
    InvalidUserId(String),

    #[error("store unavailable: {0}")]
    Store(#[from] StoreError),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

#[derive(Clone)]
pub struct UserRegistry {
    store: Arc<dyn KvStore>,
}

impl UserRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Register a new user.
    pub async fn register(&self, name: &str, password: &str) -> RegistryResult<()> {
        if !keys::is_valid_user_id(name) {
            return Err(RegistryError::InvalidUserId(name.to_string()));
        }
        if self.exists(name).await? {
            return Err(RegistryError::UserExists(name.to_string()));
        }

        let credential_key = keys::user_key(name);
        self.store.set(&credential_key, password).await?;

        if let Err(e) = self.store.sadd(USER_SET_KEY, name).await {
            warn!("adding {name} to {USER_SET_KEY} failed, rolling back: {e}");
            if let Err(del_err) = self.store.del(&credential_key).await {
                warn!("rollback of {credential_key} failed: {del_err}");
            }
            return Err(e.into());
        }

        info!("registered user {name}");
        Ok(())
    }

    pub async fn exists(&self, name: &str) -> RegistryResult<bool> {
        Ok(self.store.sismember(USER_SET_KEY, name).await?)
    }

    /// Check a password against the stored credential.
    pub async fn authenticate(&self, name: &str, password: &str) -> RegistryResult<()> {
        match self.store.get(&keys::user_key(name)).await? {
            Some(stored) if stored == password => Ok(()),
            _ => Err(RegistryError::InvalidCredentials),
        }
    }

    /// `Ok` if `name` is a registered user someone can chat with.
    pub async fn verify_contact(&self, name: &str) -> RegistryResult<()> {
        if self.exists(name).await? {
            Ok(())
        } else {
            Err(RegistryError::UnknownUser(name.to_string()))
        }
    }
}
