//! Process configuration, read once from the environment at startup.

use std::net::SocketAddr;

use chrono::Duration;
use thiserror::Error;

use gatehouse_auth::keys::DEFAULT_KEY_ID;
use gatehouse_auth::verifier::DEFAULT_CLOCK_SKEW_SECS;
use gatehouse_auth::{HashingParams, TokenSettings};

pub const JWT_PRIVATE_KEY: &str = "JWT_PRIVATE_KEY";
pub const JWT_PUBLIC_KEY: &str = "JWT_PUBLIC_KEY";
pub const JWT_KEY_ID: &str = "JWT_KEY_ID";
pub const JWT_ISSUER: &str = "JWT_ISSUER";
pub const TOKEN_TTL_SECS: &str = "TOKEN_TTL_SECS";
pub const TOKEN_CLOCK_SKEW_SECS: &str = "TOKEN_CLOCK_SKEW_SECS";
pub const BIND_ADDR: &str = "BIND_ADDR";
pub const ARGON2_M_COST: &str = "ARGON2_M_COST";
pub const ARGON2_T_COST: &str = "ARGON2_T_COST";
pub const ARGON2_P_COST: &str = "ARGON2_P_COST";
pub const BOOTSTRAP_ADMIN_USERNAME: &str = "BOOTSTRAP_ADMIN_USERNAME";
pub const BOOTSTRAP_ADMIN_PASSWORD: &str = "BOOTSTRAP_ADMIN_PASSWORD";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_TTL_SECS: i64 = 3600;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} is invalid: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Base64 key blobs as supplied; decoded and checked by `KeyMaterial`.
#[derive(Clone)]
pub struct KeyConfig {
    pub key_id: String,
    pub private_b64: String,
    pub public_b64: String,
}

impl core::fmt::Debug for KeyConfig {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyConfig")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Credential seeded with the ADMIN role at startup.
#[derive(Clone)]
pub struct BootstrapAdmin {
    pub username: String,
    pub password: String,
}

impl core::fmt::Debug for BootstrapAdmin {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BootstrapAdmin")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub keys: KeyConfig,
    pub tokens: TokenSettings,
    pub clock_skew: Duration,
    pub bind_addr: SocketAddr,
    pub hashing: HashingParams,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key → value source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let require = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let keys = KeyConfig {
            key_id: get(JWT_KEY_ID).unwrap_or_else(|| DEFAULT_KEY_ID.to_string()),
            private_b64: require(JWT_PRIVATE_KEY)?,
            public_b64: require(JWT_PUBLIC_KEY)?,
        };

        let defaults = TokenSettings::default();
        let ttl_secs: i64 = parse_or(get(TOKEN_TTL_SECS), TOKEN_TTL_SECS, DEFAULT_TTL_SECS)?;
        if ttl_secs < 0 {
            return Err(invalid(TOKEN_TTL_SECS, "must not be negative"));
        }
        let tokens = TokenSettings {
            issuer: get(JWT_ISSUER).unwrap_or(defaults.issuer),
            ttl: Duration::seconds(ttl_secs),
        };

        let skew_secs: i64 = parse_or(get(TOKEN_CLOCK_SKEW_SECS), TOKEN_CLOCK_SKEW_SECS, DEFAULT_CLOCK_SKEW_SECS)?;
        if skew_secs < 0 {
            return Err(invalid(TOKEN_CLOCK_SKEW_SECS, "must not be negative"));
        }

        let bind_addr = get(BIND_ADDR)
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid(BIND_ADDR, e.to_string()))?;

        let hashing_defaults = HashingParams::default();
        let hashing = HashingParams {
            m_cost: parse_or(get(ARGON2_M_COST), ARGON2_M_COST, hashing_defaults.m_cost)?,
            t_cost: parse_or(get(ARGON2_T_COST), ARGON2_T_COST, hashing_defaults.t_cost)?,
            p_cost: parse_or(get(ARGON2_P_COST), ARGON2_P_COST, hashing_defaults.p_cost)?,
        };

        let bootstrap_admin = match (get(BOOTSTRAP_ADMIN_USERNAME), get(BOOTSTRAP_ADMIN_PASSWORD)) {
            (Some(username), Some(password)) => Some(BootstrapAdmin { username, password }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_PASSWORD)),
            (None, Some(_)) => return Err(ConfigError::Missing(BOOTSTRAP_ADMIN_USERNAME)),
        };

        Ok(Self {
            keys,
            tokens,
            clock_skew: Duration::seconds(skew_secs),
            bind_addr,
            hashing,
            bootstrap_admin,
        })
    }
}

fn invalid(key: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        reason: reason.into(),
    }
}

fn parse_or<T>(value: Option<String>, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: core::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| invalid(key, e.to_string())),
        None => Ok(default),
    }
}
