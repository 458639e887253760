//! One-way password hashing (Argon2id, PHC strings).

use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher as _, PasswordVerifier as _, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

const SALT_LEN: usize = 16;

/// Argon2 cost parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingParams {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of passes.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Default for HashingParams {
    fn default() -> Self {
        Self {
            m_cost: Params::DEFAULT_M_COST,
            t_cost: Params::DEFAULT_T_COST,
            p_cost: Params::DEFAULT_P_COST,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordHashError {
    #[error("invalid argon2 parameters: {0}")]
    InvalidParams(String),

    #[error("failed to gather salt entropy: {0}")]
    Entropy(String),

    #[error("failed to hash password: {0}")]
    Hashing(String),

    #[error("stored hash is not a valid PHC string: {0}")]
    InvalidPhc(String),
}

/// A stored password hash in PHC string format.
///
/// `Debug` never prints the hash.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a PHC string read from storage, rejecting anything unparseable.
    pub fn from_phc(phc: impl Into<String>) -> Result<Self, PasswordHashError> {
        let phc = phc.into();
        PhcString::new(&phc).map_err(|e| PasswordHashError::InvalidPhc(e.to_string()))?;
        Ok(Self(phc))
    }

    pub fn as_phc(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Hashes and verifies passwords with a fixed set of Argon2id parameters.
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
    params: HashingParams,
}

impl PasswordHasher {
    pub fn new(params: HashingParams) -> Result<Self, PasswordHashError> {
        let argon_params = Params::new(params.m_cost, params.t_cost, params.p_cost, None)
            .map_err(|e| PasswordHashError::InvalidParams(e.to_string()))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, argon_params),
            params,
        })
    }

    /// Hash `plaintext` under a fresh random salt.
    pub fn hash(&self, plaintext: &str) -> Result<PasswordHash, PasswordHashError> {
        let mut salt_bytes = [0u8; SALT_LEN];
        getrandom::getrandom(&mut salt_bytes).map_err(|e| PasswordHashError::Entropy(e.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| PasswordHashError::Hashing(e.to_string()))?;

        let phc = self
            .argon2
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| PasswordHashError::Hashing(e.to_string()))?
            .to_string();

        Ok(PasswordHash(phc))
    }

    /// Check `plaintext` against a stored hash.
    ///
    /// Uses the parameters recorded in the hash itself and argon2's own
    /// constant-time comparison.
    pub fn verify(&self, plaintext: &str, hash: &PasswordHash) -> bool {
        match PhcString::new(hash.as_phc()) {
            Ok(parsed) => self.argon2.verify_password(plaintext.as_bytes(), &parsed).is_ok(),
            Err(_) => false,
        }
    }
}

impl core::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
