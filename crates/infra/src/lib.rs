//! Infrastructure layer: the credential store behind login and account management.

pub mod credential_store;

pub use credential_store::{InMemoryCredentialStore, UserDirectory, UserStoreError, validate_username};
