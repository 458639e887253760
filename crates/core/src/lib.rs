//! `gatehouse-core`: identifiers and the domain error model shared by every crate.
//!
//! This crate has no security or infrastructure concerns.

pub mod error;
pub mod id;

pub use error::DomainError;
pub use id::UserId;
