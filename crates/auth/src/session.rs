//! Per-request authentication without server-side sessions.
//!
//! Nothing here is keyed by user or token: there is no session map and no
//! revocation list. A token stays valid until its `exp` even if the
//! credential behind it is later removed. Logout is the client discarding
//! its token.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::{Principal, TokenError, TokenVerifier};

/// Extract the token from an `Authorization` header value.
///
/// The scheme is matched case-insensitively. Returns `None` for any other
/// scheme or an empty token.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[derive(Debug, Clone)]
pub struct SessionPolicy {
    verifier: Arc<TokenVerifier>,
}

impl SessionPolicy {
    pub fn new(verifier: Arc<TokenVerifier>) -> Self {
        Self { verifier }
    }

    /// Resolve the caller from the raw `Authorization` header.
    ///
    /// - absent header: `Ok(None)` (anonymous)
    /// - anything other than a well-formed bearer credential: `Malformed`
    /// - otherwise whatever the verifier decides
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Option<Principal>, TokenError> {
        self.authenticate_at(authorization, Utc::now())
    }

    pub fn authenticate_at(
        &self,
        authorization: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Option<Principal>, TokenError> {
        let Some(header) = authorization else {
            return Ok(None);
        };
        let token = bearer_token(header).ok_or(TokenError::Malformed)?;
        self.verifier.verify_at(token, now).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use gatehouse_core::UserId;

    use super::*;
    use crate::{Identity, Role, TokenIssuer, TokenSettings, testing};

    fn setup() -> (TokenIssuer, SessionPolicy) {
        let (signing, verification) = testing::key_material().split();
        let issuer = TokenIssuer::new(signing, TokenSettings::default());
        let verifier = TokenVerifier::new([verification], Duration::seconds(5));
        (issuer, SessionPolicy::new(Arc::new(verifier)))
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer   abc "), Some("abc"));
        assert_eq!(bearer_token("BEARER abc"), Some("abc"));
    }

    #[test]
    fn other_schemes_and_empty_tokens_are_rejected() {
        assert_eq!(bearer_token("Basic YWRtaW46cGFzc3dvcmQ="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer    "), None);
        assert_eq!(bearer_token(""), None);
    }

    #[test]
    fn missing_header_is_anonymous() {
        let (_, session) = setup();
        assert_eq!(session.authenticate(None), Ok(None));
    }

    #[test]
    fn non_bearer_header_is_malformed() {
        let (_, session) = setup();
        assert_eq!(
            session.authenticate(Some("Basic YWRtaW46cGFzc3dvcmQ=")),
            Err(TokenError::Malformed)
        );
    }

    #[test]
    fn valid_bearer_yields_principal() {
        let (issuer, session) = setup();
        let identity = Identity::new(UserId::new(), [Role::User]);
        let token = issuer.issue(&identity).unwrap().token;

        let principal = session.authenticate(Some(&format!("Bearer {token}"))).unwrap().unwrap();
        assert_eq!(principal.subject, identity.subject);
    }

    #[test]
    fn token_outlives_nothing_but_its_expiry() {
        let (issuer, session) = setup();
        let identity = Identity::new(UserId::new(), [Role::Admin]);
        let issued = issuer.issue(&identity).unwrap();
        let header = format!("Bearer {}", issued.token);

        // Same token, many requests, no server state consulted in between.
        for _ in 0..3 {
            assert!(session.authenticate(Some(&header)).unwrap().is_some());
        }

        let after_expiry = issued.expires_at + Duration::seconds(10);
        assert_eq!(
            session.authenticate_at(Some(&header), after_expiry),
            Err(TokenError::Expired)
        );
    }
}
