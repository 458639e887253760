use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use gatehouse_auth::{Credential, IssuedToken, Role};
use gatehouse_core::UserId;

// -------------------------
// Request DTOs
// -------------------------

/// Body of `POST /request-token`, `POST /users` and `PUT /users/:id`.
#[derive(Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for CredentialsRequest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialsRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Serialize)]
pub struct TokenResponse {
    pub token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
    pub user_id: UserId,
}

impl TokenResponse {
    pub fn bearer(issued: IssuedToken, user_id: UserId) -> Self {
        Self {
            token: issued.token,
            token_type: "Bearer",
            expires_at: issued.expires_at,
            user_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: UserId,
    pub username: String,
    pub role: Role,
}

impl From<&Credential> for UserResponse {
    fn from(c: &Credential) -> Self {
        Self {
            id: c.user_id,
            username: c.username.clone(),
            role: c.role,
        }
    }
}
