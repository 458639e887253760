use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use gatehouse_auth::{Credential, CredentialStore, CredentialStoreError, PasswordHash, Role};
use gatehouse_core::{DomainError, UserId};

const MAX_USERNAME_LEN: usize = 64;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UserStoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("user store unavailable")]
    Unavailable,
}

/// Account management side of the credential store.
pub trait UserDirectory: Send + Sync {
    /// Create a credential under a fresh [`UserId`].
    fn register(&self, username: &str, password_hash: PasswordHash, role: Role) -> Result<Credential, UserStoreError>;
    fn get(&self, user_id: UserId) -> Result<Option<Credential>, UserStoreError>;
    /// All credentials, ordered by user id (and therefore creation time).
    fn list(&self) -> Result<Vec<Credential>, UserStoreError>;
    /// Replace the username and password of an existing account. The id and role are kept.
    fn update(&self, user_id: UserId, username: &str, password_hash: PasswordHash) -> Result<Credential, UserStoreError>;
    fn remove(&self, user_id: UserId) -> Result<Credential, UserStoreError>;
}

impl<S> UserDirectory for Arc<S>
where
    S: UserDirectory + ?Sized,
{
    fn register(&self, username: &str, password_hash: PasswordHash, role: Role) -> Result<Credential, UserStoreError> {
        (**self).register(username, password_hash, role)
    }

    fn get(&self, user_id: UserId) -> Result<Option<Credential>, UserStoreError> {
        (**self).get(user_id)
    }

    fn list(&self) -> Result<Vec<Credential>, UserStoreError> {
        (**self).list()
    }

    fn update(&self, user_id: UserId, username: &str, password_hash: PasswordHash) -> Result<Credential, UserStoreError> {
        (**self).update(user_id, username, password_hash)
    }

    fn remove(&self, user_id: UserId) -> Result<Credential, UserStoreError> {
        (**self).remove(user_id)
    }
}

/// Validate a username for registration.
///
/// Usernames are matched case-sensitively and stored as given.
pub fn validate_username(username: &str) -> Result<(), DomainError> {
    if username.trim().is_empty() {
        return Err(DomainError::validation("username must not be blank"));
    }
    if username.len() > MAX_USERNAME_LEN {
        return Err(DomainError::validation(format!(
            "username must be at most {MAX_USERNAME_LEN} bytes"
        )));
    }
    if username.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(DomainError::validation("username must not contain whitespace"));
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Users {
    by_id: HashMap<UserId, Credential>,
    by_username: HashMap<String, UserId>,
}

/// In-memory credential store for dev and tests.
///
/// A poisoned lock is reported as the store being unavailable rather than
/// propagated as a panic.
#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: RwLock<Users>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl UserDirectory for InMemoryCredentialStore {
    fn register(&self, username: &str, password_hash: PasswordHash, role: Role) -> Result<Credential, UserStoreError> {
        validate_username(username)?;

        let mut users = self.inner.write().map_err(|_| UserStoreError::Unavailable)?;
        if users.by_username.contains_key(username) {
            return Err(DomainError::conflict(format!("username '{username}' is taken")).into());
        }

        let credential = Credential {
            user_id: UserId::new(),
            username: username.to_string(),
            password_hash,
            role,
        };
        users.by_username.insert(credential.username.clone(), credential.user_id);
        users.by_id.insert(credential.user_id, credential.clone());

        tracing::info!(user_id = %credential.user_id, role = %role, "user registered");
        Ok(credential)
    }

    fn get(&self, user_id: UserId) -> Result<Option<Credential>, UserStoreError> {
        let users = self.inner.read().map_err(|_| UserStoreError::Unavailable)?;
        Ok(users.by_id.get(&user_id).cloned())
    }

    fn list(&self) -> Result<Vec<Credential>, UserStoreError> {
        let users = self.inner.read().map_err(|_| UserStoreError::Unavailable)?;
        let mut all: Vec<Credential> = users.by_id.values().cloned().collect();
        all.sort_by_key(|c| c.user_id);
        Ok(all)
    }

    fn update(&self, user_id: UserId, username: &str, password_hash: PasswordHash) -> Result<Credential, UserStoreError> {
        validate_username(username)?;

        let mut users = self.inner.write().map_err(|_| UserStoreError::Unavailable)?;
        if users.by_username.get(username).is_some_and(|holder| *holder != user_id) {
            return Err(DomainError::conflict(format!("username '{username}' is taken")).into());
        }

        let Users { by_id, by_username } = &mut *users;
        let credential = by_id.get_mut(&user_id).ok_or(DomainError::NotFound)?;
        by_username.remove(&credential.username);
        by_username.insert(username.to_string(), user_id);
        credential.username = username.to_string();
        credential.password_hash = password_hash;

        tracing::info!(user_id = %user_id, "user updated");
        Ok(credential.clone())
    }

    fn remove(&self, user_id: UserId) -> Result<Credential, UserStoreError> {
        let mut users = self.inner.write().map_err(|_| UserStoreError::Unavailable)?;
        let credential = users.by_id.remove(&user_id).ok_or(DomainError::NotFound)?;
        users.by_username.remove(&credential.username);

        tracing::info!(user_id = %user_id, "user removed");
        Ok(credential)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Credential>, CredentialStoreError> {
        let users = self
            .inner
            .read()
            .map_err(|_| CredentialStoreError::Unavailable("credential lock poisoned".into()))?;
        Ok(users
            .by_username
            .get(username)
            .and_then(|id| users.by_id.get(id))
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_auth::testing::cheap_hasher;

    use super::*;

    fn hash(password: &str) -> PasswordHash {
        cheap_hasher().hash(password).unwrap()
    }

    #[test]
    fn register_then_get_and_list() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::User).unwrap();
        let root = store.register("root", hash("pw"), Role::Admin).unwrap();

        assert_eq!(store.get(alice.user_id).unwrap(), Some(alice.clone()));

        let ids: Vec<UserId> = store.list().unwrap().into_iter().map(|c| c.user_id).collect();
        let mut expected = vec![alice.user_id, root.user_id];
        expected.sort();
        assert_eq!(ids, expected);
    }

    #[test]
    fn duplicate_username_conflicts() {
        let store = InMemoryCredentialStore::new();
        store.register("alice", hash("pw"), Role::User).unwrap();

        let err = store.register("alice", hash("other"), Role::Admin).unwrap_err();
        assert!(matches!(err, UserStoreError::Domain(DomainError::Conflict(_))));
    }

    #[test]
    fn usernames_differing_in_case_are_distinct() {
        let store = InMemoryCredentialStore::new();
        store.register("alice", hash("pw"), Role::User).unwrap();
        assert!(store.register("Alice", hash("pw"), Role::User).is_ok());
    }

    #[test]
    fn blank_or_spaced_usernames_are_invalid() {
        for name in ["", "   ", "al ice", "tab\tbed"] {
            assert!(matches!(validate_username(name), Err(DomainError::Validation(_))), "{name:?}");
        }
        assert!(validate_username(&"x".repeat(MAX_USERNAME_LEN + 1)).is_err());
    }

    #[test]
    fn remove_frees_the_username() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::User).unwrap();

        store.remove(alice.user_id).unwrap();
        assert_eq!(store.get(alice.user_id).unwrap(), None);
        assert_eq!(
            store.remove(alice.user_id),
            Err(UserStoreError::Domain(DomainError::NotFound))
        );
        assert!(store.register("alice", hash("pw"), Role::User).is_ok());
    }

    #[tokio::test]
    async fn update_moves_the_username_index() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::Admin).unwrap();

        let renamed = store.update(alice.user_id, "alicia", hash("new")).unwrap();
        assert_eq!(renamed.user_id, alice.user_id);
        assert_eq!(renamed.role, Role::Admin);
        assert_eq!(renamed.username, "alicia");

        assert_eq!(store.find_by_username("alice").await.unwrap(), None);
        assert_eq!(store.find_by_username("alicia").await.unwrap(), Some(renamed));
        assert!(store.register("alice", hash("pw"), Role::User).is_ok());
    }

    #[test]
    fn update_can_keep_the_same_username() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::User).unwrap();

        let updated = store.update(alice.user_id, "alice", hash("new")).unwrap();
        assert_eq!(updated.username, "alice");
        assert_ne!(updated.password_hash, alice.password_hash);
    }

    #[test]
    fn update_rejects_taken_names_and_missing_accounts() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::User).unwrap();
        store.register("bob", hash("pw"), Role::User).unwrap();

        let err = store.update(alice.user_id, "bob", hash("pw")).unwrap_err();
        assert!(matches!(err, UserStoreError::Domain(DomainError::Conflict(_))));
        assert_eq!(store.get(alice.user_id).unwrap().map(|c| c.username), Some("alice".to_string()));

        let err = store.update(alice.user_id, " ", hash("pw")).unwrap_err();
        assert!(matches!(err, UserStoreError::Domain(DomainError::Validation(_))));

        assert_eq!(
            store.update(UserId::new(), "carol", hash("pw")),
            Err(UserStoreError::Domain(DomainError::NotFound))
        );
    }

    #[tokio::test]
    async fn lookup_by_username_is_exact() {
        let store = InMemoryCredentialStore::new();
        let alice = store.register("alice", hash("pw"), Role::User).unwrap();

        assert_eq!(store.find_by_username("alice").await.unwrap(), Some(alice));
        assert_eq!(store.find_by_username("ALICE").await.unwrap(), None);
    }

    #[test]
    fn directory_is_usable_through_arc() {
        let store: Arc<dyn UserDirectory> = Arc::new(InMemoryCredentialStore::new());
        let bob = store.register("bob", hash("pw"), Role::User).unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
        assert_eq!(store.get(bob.user_id).unwrap().map(|c| c.username), Some("bob".to_string()));
    }
}
