//! Stateless token verification.
//!
//! A verification attempt moves through fixed stages, each with its own
//! failure: parse → key select → signature → expiry → claims extraction.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::DecodingKey;

use crate::keys::SIGNING_ALGORITHM;
use crate::{KeyId, Principal, TokenClaims, TokenError, VerificationKey, validate_claims};

/// Default tolerance for clock drift between issuer and verifier.
pub const DEFAULT_CLOCK_SKEW_SECS: i64 = 5;

/// Validates bearer tokens against a fixed set of public keys.
///
/// Holds only read-only key material, so one instance can be shared across
/// all concurrent requests without locking.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: HashMap<KeyId, DecodingKey>,
    clock_skew: Duration,
}

impl TokenVerifier {
    pub fn new(keys: impl IntoIterator<Item = VerificationKey>, clock_skew: Duration) -> Self {
        let keys = keys
            .into_iter()
            .map(|key| (key.key_id().clone(), key.decoding_key().clone()))
            .collect();
        Self { keys, clock_skew }
    }

    pub fn clock_skew(&self) -> Duration {
        self.clock_skew
    }

    pub fn verify(&self, token: &str) -> Result<Principal, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify as if the current time were `now`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Principal, TokenError> {
        // Parse: structure and header only. The payload is not decoded until
        // the signature over it has been checked.
        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, payload_segment, signature] = segments.as_slice() else {
            return Err(TokenError::Malformed);
        };
        if header_segment.is_empty() || payload_segment.is_empty() || signature.is_empty() {
            return Err(TokenError::Malformed);
        }

        let header = jsonwebtoken::decode_header(token).map_err(|_| TokenError::Malformed)?;
        if header.alg != SIGNING_ALGORITHM {
            return Err(TokenError::Malformed);
        }

        // KeySelect
        let key = header
            .kid
            .as_deref()
            .and_then(|kid| self.keys.get(kid))
            .ok_or(TokenError::UnknownKey)?;

        // SignatureCheck over the exact bytes that were signed.
        let message = &token[..header_segment.len() + 1 + payload_segment.len()];
        let valid = jsonwebtoken::crypto::verify(signature, message.as_bytes(), key, SIGNING_ALGORITHM)
            .map_err(|_| TokenError::BadSignature)?;
        if !valid {
            return Err(TokenError::BadSignature);
        }

        // ExpiryCheck
        let claims = TokenClaims::from_segment(payload_segment)?;
        validate_claims(&claims, now, self.clock_skew)?;

        // ClaimsExtract
        claims.into_principal()
    }
}

impl core::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("key_ids", &self.keys.keys().collect::<Vec<_>>())
            .field("clock_skew", &self.clock_skew)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use gatehouse_core::UserId;
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use proptest::prelude::*;

    use super::*;
    use crate::{Identity, Role, TokenIssuer, TokenSettings, testing};

    fn pair(ttl: Duration) -> (TokenIssuer, TokenVerifier) {
        let (signing, verification) = testing::key_material().split();
        let issuer = TokenIssuer::new(
            signing,
            TokenSettings {
                issuer: "self".into(),
                ttl,
            },
        );
        let verifier = TokenVerifier::new([verification], Duration::seconds(DEFAULT_CLOCK_SKEW_SECS));
        (issuer, verifier)
    }

    fn user() -> Identity {
        Identity::new(UserId::new(), [Role::User])
    }

    fn claims_for(identity: &Identity) -> TokenClaims {
        let now = Utc::now();
        TokenClaims::for_identity(identity, "self", uuid::Uuid::now_v7(), now, now + Duration::hours(1))
    }

    /// Replace the character at `index` with a different base64url character.
    fn flip_char(token: &str, index: usize) -> String {
        let mut bytes = token.as_bytes().to_vec();
        bytes[index] = if bytes[index] == b'A' { b'B' } else { b'A' };
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn issued_token_round_trips_to_same_subject_and_roles() {
        let (issuer, verifier) = pair(Duration::hours(1));
        let identity = Identity::new(UserId::new(), [Role::Admin]);

        let issued = issuer.issue(&identity).unwrap();
        let principal = verifier.verify(&issued.token).unwrap();

        assert_eq!(principal.subject, identity.subject);
        assert_eq!(principal.roles, identity.roles);
        assert_eq!(principal.token_id, issued.token_id);
        assert_eq!(principal.issued_at, issued.issued_at);
        assert_eq!(principal.expires_at, issued.expires_at);
    }

    #[test]
    fn token_from_the_distant_past_is_expired() {
        let (issuer, verifier) = pair(Duration::hours(1));
        let long_ago = Utc::now() - Duration::days(30);

        let issued = issuer.issue_at(&user(), long_ago).unwrap();
        assert_eq!(verifier.verify(&issued.token), Err(TokenError::Expired));
    }

    #[test]
    fn zero_ttl_token_expires_once_skew_is_exceeded() {
        let (issuer, verifier) = pair(Duration::zero());
        let now = Utc::now();
        let issued = issuer.issue_at(&user(), now).unwrap();

        let within_skew = now + Duration::seconds(DEFAULT_CLOCK_SKEW_SECS);
        assert!(verifier.verify_at(&issued.token, within_skew).is_ok());

        let beyond_skew = now + Duration::seconds(DEFAULT_CLOCK_SKEW_SECS + 2);
        assert_eq!(verifier.verify_at(&issued.token, beyond_skew), Err(TokenError::Expired));
    }

    #[test]
    fn token_signed_by_another_key_is_bad_signature() {
        let (_, verifier) = pair(Duration::hours(1));
        let (forger_key, _) = testing::foreign_key_material(testing::KEY_ID).split();
        let forger = TokenIssuer::new(forger_key, TokenSettings::default());

        let forged = forger.issue(&user()).unwrap();
        assert_eq!(verifier.verify(&forged.token), Err(TokenError::BadSignature));
    }

    #[test]
    fn expired_forgery_reports_signature_first() {
        let (_, verifier) = pair(Duration::hours(1));
        let (forger_key, _) = testing::foreign_key_material(testing::KEY_ID).split();
        let forger = TokenIssuer::new(forger_key, TokenSettings::default());

        let forged = forger.issue_at(&user(), Utc::now() - Duration::days(1)).unwrap();
        assert_eq!(verifier.verify(&forged.token), Err(TokenError::BadSignature));
    }

    #[test]
    fn unknown_key_id_is_rejected() {
        let (_, verifier) = pair(Duration::hours(1));
        let (other_key, _) = testing::foreign_key_material("rotated-away").split();
        let issuer = TokenIssuer::new(other_key, TokenSettings::default());

        let token = issuer.issue(&user()).unwrap().token;
        assert_eq!(verifier.verify(&token), Err(TokenError::UnknownKey));
    }

    #[test]
    fn missing_key_id_is_unknown_key() {
        let (_, verifier) = pair(Duration::hours(1));
        let (signing, _) = testing::key_material().split();
        let claims = claims_for(&user());

        let token = jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, signing.encoding_key()).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::UnknownKey));
    }

    #[test]
    fn symmetric_algorithm_is_malformed() {
        let (_, verifier) = pair(Duration::hours(1));
        let claims = claims_for(&user());
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(testing::KEY_ID.into());

        let token = jsonwebtoken::encode(&header, &claims, &EncodingKey::from_secret(b"guessable")).unwrap();
        assert_eq!(verifier.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn structural_garbage_is_malformed() {
        let (_, verifier) = pair(Duration::hours(1));
        for token in ["", "abc", "a.b", "a.b.c.d", "..", "a..c", "not-base64!.x.y"] {
            assert_eq!(verifier.verify(token), Err(TokenError::Malformed), "token {token:?}");
        }
    }

    #[test]
    fn unsigned_alg_none_is_malformed() {
        let (_, verifier) = pair(Duration::hours(1));
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","kid":"test-key-1"}"#);
        let payload = URL_SAFE_NO_PAD.encode(br#"{"sub":"x"}"#);
        let token = format!("{header}.{payload}.sig");
        assert_eq!(verifier.verify(&token), Err(TokenError::Malformed));
    }

    #[test]
    fn tampered_signature_is_bad_signature() {
        let (issuer, verifier) = pair(Duration::hours(1));
        let token = issuer.issue(&user()).unwrap().token;
        let last = token.len() - 10;
        assert_eq!(verifier.verify(&flip_char(&token, last)), Err(TokenError::BadSignature));
    }

    #[test]
    fn escalated_scope_without_resigning_is_bad_signature() {
        let (issuer, verifier) = pair(Duration::hours(1));
        let token = issuer.issue(&user()).unwrap().token;
        let parts: Vec<&str> = token.split('.').collect();

        let mut claims = TokenClaims::from_segment(parts[1]).unwrap();
        claims.scope = "ROLE_ADMIN".into();
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());

        let tampered = format!("{}.{}.{}", parts[0], payload, parts[2]);
        assert_eq!(verifier.verify(&tampered), Err(TokenError::BadSignature));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_single_claims_byte_tamper_is_bad_signature(offset in 0usize..4096) {
            let (issuer, verifier) = pair(Duration::hours(1));
            let token = issuer.issue(&user()).unwrap().token;

            let header_len = token.find('.').unwrap();
            let payload_len = token[header_len + 1..].find('.').unwrap();
            let index = header_len + 1 + offset % payload_len;

            prop_assert_eq!(verifier.verify(&flip_char(&token, index)), Err(TokenError::BadSignature));
        }
    }
}
