//! Prints a fresh RSA keypair in the form `gatehouse-api` reads from the environment.

use anyhow::Context;

use gatehouse_api::config::{JWT_PRIVATE_KEY, JWT_PUBLIC_KEY};
use gatehouse_auth::EncodedKeyPair;

fn main() -> anyhow::Result<()> {
    let pair = EncodedKeyPair::generate().context("key generation failed")?;

    println!("{JWT_PRIVATE_KEY}={}", pair.private_b64);
    println!("{JWT_PUBLIC_KEY}={}", pair.public_b64);
    Ok(())
}
