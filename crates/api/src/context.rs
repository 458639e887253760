use chrono::{DateTime, Utc};

use gatehouse_auth::Principal;
use gatehouse_core::UserId;

/// Principal context for a request (authenticated identity + roles).
///
/// Inserted by the auth middleware on every non-public route. Lives only for
/// the request it was derived for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    principal: Principal,
}

impl PrincipalContext {
    pub fn new(principal: Principal) -> Self {
        Self { principal }
    }

    pub fn user_id(&self) -> UserId {
        self.principal.subject
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.principal.expires_at
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }
}
