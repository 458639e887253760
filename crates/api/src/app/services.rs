//! Startup wiring: key material, issuer/verifier, credential store.

use std::sync::Arc;

use thiserror::Error;

use gatehouse_auth::{
    CredentialStore, CredentialVerifier, KeyMaterial, KeyMaterialError, PasswordHashError, PasswordHasher, Role,
    SessionPolicy, TokenIssuer, TokenVerifier,
};
use gatehouse_infra::{InMemoryCredentialStore, UserDirectory, UserStoreError};

use crate::config::{ApiConfig, BootstrapAdmin};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("key material rejected: {0}")]
    Keys(#[from] KeyMaterialError),

    #[error("password hasher misconfigured: {0}")]
    Hashing(#[from] PasswordHashError),

    #[error("failed to seed bootstrap admin: {0}")]
    Bootstrap(#[from] UserStoreError),
}

/// Everything the handlers share. Read-only after construction apart from
/// the credential store's own locking.
pub struct AppServices {
    pub issuer: TokenIssuer,
    pub session: SessionPolicy,
    pub credentials: CredentialVerifier,
    pub users: Arc<dyn UserDirectory>,
    pub hasher: PasswordHasher,
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("issuer", &self.issuer)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

pub fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    let keys = KeyMaterial::from_base64(
        config.keys.key_id.as_str(),
        &config.keys.private_b64,
        &config.keys.public_b64,
    )?;
    let (signing, verification) = keys.split();

    let issuer = TokenIssuer::new(signing, config.tokens.clone());
    let verifier = TokenVerifier::new([verification], config.clock_skew);
    let session = SessionPolicy::new(Arc::new(verifier));

    let hasher = PasswordHasher::new(config.hashing)?;
    let store = Arc::new(InMemoryCredentialStore::new());
    if let Some(admin) = &config.bootstrap_admin {
        seed_admin(store.as_ref(), &hasher, admin)?;
    }

    let lookup: Arc<dyn CredentialStore> = store.clone();
    let credentials = CredentialVerifier::new(lookup, hasher.clone())?;

    Ok(AppServices {
        issuer,
        session,
        credentials,
        users: store,
        hasher,
    })
}

fn seed_admin(
    store: &InMemoryCredentialStore,
    hasher: &PasswordHasher,
    admin: &BootstrapAdmin,
) -> Result<(), StartupError> {
    let hash = hasher.hash(&admin.password)?;
    let credential = store.register(&admin.username, hash, Role::Admin)?;
    tracing::info!(user_id = %credential.user_id, "seeded bootstrap admin");
    Ok(())
}
