use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use gatehouse_core::UserId;

use crate::{Role, RoleSet};

/// Who a successful login proved the caller to be.
///
/// This is what [`crate::TokenIssuer`] signs; it carries no timing information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: UserId,
    pub roles: RoleSet,
}

impl Identity {
    pub fn new(subject: UserId, roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            subject,
            roles: roles.into_iter().collect(),
        }
    }
}

/// The authenticated identity derived from one valid token.
///
/// Exists only for the duration of one request and is never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub subject: UserId,
    pub roles: RoleSet,
    /// Unique id of the token this principal was read from.
    pub token_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Principal {
    pub fn has_any_role(&self, roles: &RoleSet) -> bool {
        !self.roles.is_disjoint(roles)
    }
}
