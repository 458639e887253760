//! Username/password verification against an external credential store.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use gatehouse_core::UserId;

use crate::{Identity, PasswordHash, PasswordHashError, PasswordHasher, Role};

/// A stored login credential. Owned by the credential store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub user_id: UserId,
    pub username: String,
    pub password_hash: PasswordHash,
    pub role: Role,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CredentialStoreError {
    #[error("credential store unavailable: {0}")]
    Unavailable(String),
}

/// Lookup side of the credential store.
///
/// Implementations may block on I/O; callers await them per request.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Case-sensitive exact match on username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, CredentialStoreError>;
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// Unknown user and wrong password are deliberately the same value.
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error(transparent)]
    StoreUnavailable(#[from] CredentialStoreError),

    #[error("password verification did not complete: {0}")]
    Internal(String),
}

/// Checks a username/password pair and yields the caller's [`Identity`].
///
/// When the username is unknown a decoy hash is still verified, so both
/// failure paths do the same work and return the same error.
#[derive(Clone)]
pub struct CredentialVerifier {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    decoy: PasswordHash,
}

impl CredentialVerifier {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher) -> Result<Self, PasswordHashError> {
        let decoy = hasher.hash("gatehouse-decoy-password")?;
        Ok(Self { store, hasher, decoy })
    }

    pub async fn verify(&self, username: &str, password: &str) -> Result<Identity, LoginError> {
        let credential = self.store.find_by_username(username).await?;

        let (hash, identity) = match credential {
            Some(c) => (c.password_hash, Some(Identity::new(c.user_id, [c.role]))),
            None => (self.decoy.clone(), None),
        };

        // Argon2 is deliberately slow; keep it off the async workers.
        let hasher = self.hasher.clone();
        let password = password.to_owned();
        let matched = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| LoginError::Internal(e.to_string()))?;

        match identity {
            Some(identity) if matched => {
                tracing::debug!(subject = %identity.subject, "credentials verified");
                Ok(identity)
            }
            _ => {
                tracing::debug!("credential verification failed");
                Err(LoginError::InvalidCredentials)
            }
        }
    }
}

impl core::fmt::Debug for CredentialVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialVerifier")
            .field("hasher", &self.hasher)
            .finish_non_exhaustive()
    }
}
