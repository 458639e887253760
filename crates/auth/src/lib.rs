//! `gatehouse-auth`: stateless authentication/authorization core.
//!
//! Login: [`CredentialVerifier`] → [`TokenIssuer`] → signed bearer token.
//! Every later request: [`SessionPolicy`] / [`TokenVerifier`] → [`Principal`]
//! → [`authorize`] against the [`Capability`] the [`RoutePolicy`] assigns.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod authorize;
pub mod claims;
pub mod credentials;
pub mod issuer;
pub mod keys;
pub mod password;
pub mod policy;
pub mod principal;
pub mod roles;
pub mod session;
pub mod verifier;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use authorize::{AuthorizationExplanation, AuthzError, Capability, authorize, explain_authorization};
pub use claims::{TokenClaims, TokenError, validate_claims};
pub use credentials::{Credential, CredentialStore, CredentialStoreError, CredentialVerifier, LoginError};
pub use issuer::{IssuedToken, TokenIssueError, TokenIssuer, TokenSettings};
pub use keys::{EncodedKeyPair, KeyId, KeyMaterial, KeyMaterialError, SigningKey, VerificationKey};
pub use password::{HashingParams, PasswordHash, PasswordHashError, PasswordHasher};
pub use policy::{PathPattern, RoutePolicy, RouteRule};
pub use principal::{Identity, Principal};
pub use roles::{Role, RoleSet, UnknownRole};
pub use session::{SessionPolicy, bearer_token};
pub use verifier::TokenVerifier;
