//! Fixed key fixtures for tests. Never use these outside tests.

use crate::{HashingParams, KeyMaterial, PasswordHasher};

pub const KEY_ID: &str = "test-key-1";

const PRIVATE_B64: &str = include_str!("../fixtures/rsa_a.pk8.b64");
const PUBLIC_B64: &str = include_str!("../fixtures/rsa_a.spki.b64");
const FOREIGN_PRIVATE_B64: &str = include_str!("../fixtures/rsa_b.pk8.b64");
const FOREIGN_PUBLIC_B64: &str = include_str!("../fixtures/rsa_b.spki.b64");

pub const WEAK_PRIVATE_B64: &str = include_str!("../fixtures/rsa_1024.pk8.b64");
pub const WEAK_PUBLIC_B64: &str = include_str!("../fixtures/rsa_1024.spki.b64");

pub fn private_b64() -> &'static str {
    PRIVATE_B64.trim()
}

pub fn public_b64() -> &'static str {
    PUBLIC_B64.trim()
}

pub fn foreign_private_b64() -> &'static str {
    FOREIGN_PRIVATE_B64.trim()
}

pub fn foreign_public_b64() -> &'static str {
    FOREIGN_PUBLIC_B64.trim()
}

/// The primary test keypair under [`KEY_ID`].
pub fn key_material() -> KeyMaterial {
    KeyMaterial::from_base64(KEY_ID, private_b64(), public_b64()).expect("test key pair loads")
}

/// A second, unrelated keypair. Pass the same `key_id` to forge tokens that
/// claim to come from the primary key.
pub fn foreign_key_material(key_id: &str) -> KeyMaterial {
    KeyMaterial::from_base64(key_id, foreign_private_b64(), foreign_public_b64())
        .expect("foreign test key pair loads")
}

/// Argon2 with the smallest costs it accepts, so tests stay fast.
pub fn cheap_hasher() -> PasswordHasher {
    PasswordHasher::new(HashingParams {
        m_cost: 1024,
        t_cost: 1,
        p_cost: 1,
    })
    .expect("cheap argon2 params are valid")
}
