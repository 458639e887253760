//! Token issuance.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use jsonwebtoken::Header;
use thiserror::Error;
use uuid::Uuid;

use crate::keys::SIGNING_ALGORITHM;
use crate::{Identity, KeyId, SigningKey, TokenClaims};

/// Deployment-wide issuance policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSettings {
    /// Value of the `iss` claim.
    pub issuer: String,
    /// Lifetime of every issued token.
    pub ttl: Duration,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            issuer: "self".to_string(),
            ttl: Duration::hours(1),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenIssueError {
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// A freshly signed token and the facts it asserts.
#[derive(Clone)]
pub struct IssuedToken {
    pub token: String,
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl core::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("token_id", &self.token_id)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Signs identity claims with the process's private key.
///
/// Sole owner of the [`SigningKey`].
#[derive(Debug)]
pub struct TokenIssuer {
    key: SigningKey,
    settings: TokenSettings,
}

impl TokenIssuer {
    pub fn new(key: SigningKey, settings: TokenSettings) -> Self {
        Self { key, settings }
    }

    pub fn key_id(&self) -> &KeyId {
        self.key.key_id()
    }

    pub fn issue(&self, identity: &Identity) -> Result<IssuedToken, TokenIssueError> {
        self.issue_at(identity, Utc::now())
    }

    /// Issue as if the current time were `now`. Timestamps are whole seconds.
    pub fn issue_at(&self, identity: &Identity, now: DateTime<Utc>) -> Result<IssuedToken, TokenIssueError> {
        let token_id = Uuid::now_v7();
        let issued_at = now.trunc_subsecs(0);
        let expires_at = issued_at + self.settings.ttl;
        let claims = TokenClaims::for_identity(identity, &self.settings.issuer, token_id, issued_at, expires_at);

        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(self.key.key_id().as_str().to_string());

        let token = jsonwebtoken::encode(&header, &claims, self.key.encoding_key())?;

        tracing::debug!(
            subject = %identity.subject,
            key_id = %self.key.key_id(),
            token_id = %token_id,
            expires_at = %expires_at,
            "issued access token"
        );

        Ok(IssuedToken {
            token,
            token_id,
            issued_at,
            expires_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use gatehouse_core::UserId;

    use super::*;
    use crate::{Role, testing};

    fn issuer() -> TokenIssuer {
        let (signing, _) = testing::key_material().split();
        TokenIssuer::new(signing, TokenSettings::default())
    }

    #[test]
    fn header_names_algorithm_and_key() {
        let identity = Identity::new(UserId::new(), [Role::User]);
        let issued = issuer().issue(&identity).unwrap();

        let header = jsonwebtoken::decode_header(&issued.token).unwrap();
        assert_eq!(header.alg, jsonwebtoken::Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some(testing::KEY_ID));
        assert_eq!(header.typ.as_deref(), Some("JWT"));
    }

    #[test]
    fn expiry_is_issue_time_plus_ttl() {
        let identity = Identity::new(UserId::new(), [Role::Admin]);
        let issued = issuer().issue(&identity).unwrap();
        assert_eq!(issued.expires_at - issued.issued_at, Duration::hours(1));
    }

    #[test]
    fn reported_times_and_id_match_the_signed_claims() {
        let identity = Identity::new(UserId::new(), [Role::User]);
        let now = Utc::now();
        let issued = issuer().issue_at(&identity, now).unwrap();

        let payload = issued.token.split('.').nth(1).unwrap();
        let claims = TokenClaims::from_segment(payload).unwrap();

        assert_eq!(claims.jti, issued.token_id.to_string());
        assert_eq!(claims.iat, issued.issued_at.timestamp());
        assert_eq!(claims.exp, issued.expires_at.timestamp());
        assert_eq!(issued.issued_at.timestamp(), now.timestamp());
        assert_eq!(issued.issued_at.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn repeated_logins_never_collide() {
        let issuer = issuer();
        let identity = Identity::new(UserId::new(), [Role::User]);
        let now = Utc::now();

        let a = issuer.issue_at(&identity, now).unwrap();
        let b = issuer.issue_at(&identity, now).unwrap();

        assert_ne!(a.token, b.token);
        assert_ne!(a.token_id, b.token_id);
    }

    #[test]
    fn debug_output_omits_the_token() {
        let identity = Identity::new(UserId::new(), [Role::User]);
        let issued = issuer().issue(&identity).unwrap();
        assert!(!format!("{issued:?}").contains(&issued.token));
    }
}
