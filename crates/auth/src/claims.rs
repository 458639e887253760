use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{Identity, Principal, Role, RoleSet};

/// Wire prefix on every role tag in the `scope` claim.
pub const ROLE_PREFIX: &str = "ROLE_";

/// Signed claim set carried in a token's payload segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer name.
    pub iss: String,

    /// Subject: the user's stable id.
    pub sub: String,

    /// Space-separated, prefixed role tags, e.g. `"ROLE_ADMIN ROLE_USER"`.
    pub scope: String,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiration, unix seconds.
    pub exp: i64,

    /// Unique token id.
    pub jti: String,
}

/// Why a presented token was not accepted.
///
/// Callers must not reveal which variant occurred to the client.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,

    #[error("token was signed with an unknown key")]
    UnknownKey,

    #[error("token signature is invalid")]
    BadSignature,

    #[error("token has expired")]
    Expired,
}

impl TokenClaims {
    pub fn for_identity(
        identity: &Identity,
        issuer: &str,
        token_id: Uuid,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            iss: issuer.to_string(),
            sub: identity.subject.to_string(),
            scope: encode_scope(&identity.roles),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: token_id.to_string(),
        }
    }

    /// Decode the base64url payload segment of a token.
    pub fn from_segment(segment: &str) -> Result<Self, TokenError> {
        let json = URL_SAFE_NO_PAD.decode(segment).map_err(|_| TokenError::Malformed)?;
        serde_json::from_slice(&json).map_err(|_| TokenError::Malformed)
    }

    pub fn into_principal(self) -> Result<Principal, TokenError> {
        Ok(Principal {
            subject: self.sub.parse().map_err(|_| TokenError::Malformed)?,
            roles: decode_scope(&self.scope)?,
            token_id: self.jti.parse().map_err(|_| TokenError::Malformed)?,
            issued_at: timestamp(self.iat)?,
            expires_at: timestamp(self.exp)?,
        })
    }
}

fn timestamp(secs: i64) -> Result<DateTime<Utc>, TokenError> {
    DateTime::from_timestamp(secs, 0).ok_or(TokenError::Malformed)
}

pub fn encode_scope(roles: &RoleSet) -> String {
    roles
        .iter()
        .map(|role| format!("{ROLE_PREFIX}{role}"))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn decode_scope(scope: &str) -> Result<RoleSet, TokenError> {
    scope
        .split_whitespace()
        .map(|tag| {
            tag.strip_prefix(ROLE_PREFIX)
                .and_then(|name| name.parse::<Role>().ok())
                .ok_or(TokenError::Malformed)
        })
        .collect()
}

/// Reject claims whose expiry lies more than `skew` before `now`.
///
/// Signature verification happens before this and is not repeated here.
pub fn validate_claims(claims: &TokenClaims, now: DateTime<Utc>, skew: Duration) -> Result<(), TokenError> {
    if now.timestamp() > claims.exp.saturating_add(skew.num_seconds()) {
        return Err(TokenError::Expired);
    }
    Ok(())
}
