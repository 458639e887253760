//! Asymmetric signing key material.
//!
//! One RSA keypair is loaded (or generated) at process start and never
//! changes afterwards. The private half is moved into the issuer; the public
//! half can be cloned into any number of verifiers, in this process or
//! elsewhere.

use std::borrow::Borrow;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};
use rand::rngs::OsRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use thiserror::Error;

/// Smallest accepted RSA modulus.
pub const MIN_RSA_BITS: usize = 2048;

/// Key id used when the deployment does not configure one.
pub const DEFAULT_KEY_ID: &str = "jwt-key-1";

pub(crate) const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// Stable identifier of a keypair, carried in every token header as `kid`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyId(String);

impl KeyId {
    pub fn new(id: impl Into<String>) -> Result<Self, KeyMaterialError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(KeyMaterialError::EmptyKeyId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for KeyId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for KeyId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which half of the keypair an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHalf {
    Private,
    Public,
}

impl core::fmt::Display for KeyHalf {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            KeyHalf::Private => f.write_str("private"),
            KeyHalf::Public => f.write_str("public"),
        }
    }
}

/// Startup failure loading key material. Never recoverable.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyMaterialError {
    #[error("key id must not be empty")]
    EmptyKeyId,

    #[error("{0} key is not valid base64: {1}")]
    Base64(KeyHalf, String),

    #[error("{0} key is not a DER-encoded RSA key: {1}")]
    Undecodable(KeyHalf, String),

    #[error("RSA key is {bits} bits; at least {min} required", min = MIN_RSA_BITS)]
    WeakKey { bits: usize },

    #[error("private and public keys do not form a pair")]
    Mismatch,

    #[error("failed to generate RSA key pair: {0}")]
    Generation(String),
}

/// Private half of the keypair. Deliberately not `Clone`.
pub struct SigningKey {
    key_id: KeyId,
    key: EncodingKey,
}

impl SigningKey {
    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub(crate) fn encoding_key(&self) -> &EncodingKey {
        &self.key
    }
}

impl core::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Public half of the keypair. Safe to share and distribute.
#[derive(Clone)]
pub struct VerificationKey {
    key_id: KeyId,
    key: DecodingKey,
    modulus_bits: usize,
}

impl VerificationKey {
    /// Load a public key on its own (X.509 SubjectPublicKeyInfo, DER, base64).
    ///
    /// This is what a verifying-only service uses; it never sees the private half.
    pub fn from_base64(key_id: impl Into<String>, public_b64: &str) -> Result<Self, KeyMaterialError> {
        let key_id = KeyId::new(key_id)?;
        let public = decode_public(public_b64)?;
        Self::from_rsa(key_id, &public)
    }

    fn from_rsa(key_id: KeyId, public: &RsaPublicKey) -> Result<Self, KeyMaterialError> {
        let modulus_bits = public.size() * 8;
        if modulus_bits < MIN_RSA_BITS {
            return Err(KeyMaterialError::WeakKey { bits: modulus_bits });
        }

        let pkcs1 = public
            .to_pkcs1_der()
            .map_err(|e| KeyMaterialError::Undecodable(KeyHalf::Public, e.to_string()))?;

        Ok(Self {
            key_id,
            key: DecodingKey::from_rsa_der(pkcs1.as_bytes()),
            modulus_bits,
        })
    }

    pub fn key_id(&self) -> &KeyId {
        &self.key_id
    }

    pub fn modulus_bits(&self) -> usize {
        self.modulus_bits
    }

    pub(crate) fn decoding_key(&self) -> &DecodingKey {
        &self.key
    }
}

impl core::fmt::Debug for VerificationKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerificationKey")
            .field("key_id", &self.key_id)
            .field("modulus_bits", &self.modulus_bits)
            .finish_non_exhaustive()
    }
}

/// A keypair in the configuration encoding: base64 PKCS#8 DER private key
/// and base64 SubjectPublicKeyInfo DER public key.
#[derive(Clone)]
pub struct EncodedKeyPair {
    pub private_b64: String,
    pub public_b64: String,
}

impl EncodedKeyPair {
    /// Generate a fresh RSA keypair of [`MIN_RSA_BITS`] bits.
    pub fn generate() -> Result<Self, KeyMaterialError> {
        let private = RsaPrivateKey::new(&mut OsRng, MIN_RSA_BITS)
            .map_err(|e| KeyMaterialError::Generation(e.to_string()))?;

        let private_der = private
            .to_pkcs8_der()
            .map_err(|e| KeyMaterialError::Generation(e.to_string()))?;
        let public_der = private
            .to_public_key()
            .to_public_key_der()
            .map_err(|e| KeyMaterialError::Generation(e.to_string()))?;

        Ok(Self {
            private_b64: STANDARD.encode(private_der.as_bytes()),
            public_b64: STANDARD.encode(public_der.as_bytes()),
        })
    }
}

impl core::fmt::Debug for EncodedKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EncodedKeyPair")
            .field("public_b64", &self.public_b64)
            .finish_non_exhaustive()
    }
}

/// The process's one signing keypair.
#[derive(Debug)]
pub struct KeyMaterial {
    signing: SigningKey,
    verification: VerificationKey,
}

impl KeyMaterial {
    /// Load the keypair from two base64 blobs.
    ///
    /// `private_b64` is a PKCS#8 DER private key and `public_b64` an X.509
    /// SubjectPublicKeyInfo DER public key, i.e. what [`EncodedKeyPair::generate`]
    /// and `openssl pkcs8 -topk8 -nocrypt -outform DER` /
    /// `openssl pkey -pubout -outform DER` produce.
    pub fn from_base64(
        key_id: impl Into<String>,
        private_b64: &str,
        public_b64: &str,
    ) -> Result<Self, KeyMaterialError> {
        let key_id = KeyId::new(key_id)?;
        let public = decode_public(public_b64)?;
        let verification = VerificationKey::from_rsa(key_id, &public)?;

        let private_der = decode_blob(KeyHalf::Private, private_b64)?;
        let private = RsaPrivateKey::from_pkcs8_der(&private_der)
            .map_err(|e| KeyMaterialError::Undecodable(KeyHalf::Private, e.to_string()))?;
        if private.to_public_key() != public {
            return Err(KeyMaterialError::Mismatch);
        }

        let pkcs1 = private
            .to_pkcs1_der()
            .map_err(|e| KeyMaterialError::Undecodable(KeyHalf::Private, e.to_string()))?;
        let signing = SigningKey {
            key_id: verification.key_id.clone(),
            key: EncodingKey::from_rsa_der(pkcs1.as_bytes()),
        };

        tracing::info!(
            key_id = %verification.key_id,
            modulus_bits = verification.modulus_bits,
            "loaded signing key material"
        );

        Ok(Self {
            signing,
            verification,
        })
    }

    /// Generate a fresh keypair in process.
    ///
    /// Tokens signed with it stop verifying once the process exits, so this
    /// only suits single-instance or throwaway deployments.
    pub fn generate(key_id: impl Into<String>) -> Result<Self, KeyMaterialError> {
        let pair = EncodedKeyPair::generate()?;
        Self::from_base64(key_id, &pair.private_b64, &pair.public_b64)
    }

    pub fn key_id(&self) -> &KeyId {
        &self.verification.key_id
    }

    pub fn verification_key(&self) -> VerificationKey {
        self.verification.clone()
    }

    /// Hand the private half to its single owner and keep the public half shareable.
    pub fn split(self) -> (SigningKey, VerificationKey) {
        (self.signing, self.verification)
    }
}

fn decode_public(public_b64: &str) -> Result<RsaPublicKey, KeyMaterialError> {
    let der = decode_blob(KeyHalf::Public, public_b64)?;
    RsaPublicKey::from_public_key_der(&der).map_err(|e| KeyMaterialError::Undecodable(KeyHalf::Public, e.to_string()))
}

fn decode_blob(half: KeyHalf, blob: &str) -> Result<Vec<u8>, KeyMaterialError> {
    let compact: String = blob.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if compact.is_empty() {
        return Err(KeyMaterialError::Base64(half, "empty".into()));
    }
    STANDARD
        .decode(compact)
        .map_err(|e| KeyMaterialError::Base64(half, e.to_string()))
}
