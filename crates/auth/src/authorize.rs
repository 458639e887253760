use serde::Serialize;
use thiserror::Error;

use crate::{Principal, Role, RoleSet};

/// The access requirement a route declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Capability {
    /// No token needed.
    Public,
    /// Any valid token.
    Authenticated,
    /// A valid token holding at least one of these roles.
    AnyRole(RoleSet),
}

impl Capability {
    pub fn role(role: Role) -> Self {
        Self::AnyRole([role].into_iter().collect())
    }

    pub fn any_of(roles: impl IntoIterator<Item = Role>) -> Self {
        Self::AnyRole(roles.into_iter().collect())
    }
}

impl core::fmt::Display for Capability {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Capability::Public => f.write_str("public"),
            Capability::Authenticated => f.write_str("authenticated"),
            Capability::AnyRole(roles) => write!(f, "any of [{}]", join_roles(roles)),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("authentication required")]
    AuthenticationRequired,

    #[error("forbidden: requires any of [{}]", join_roles(.required))]
    AuthorizationDenied { required: RoleSet },
}

/// Decide whether `principal` satisfies `required`.
///
/// - No IO
/// - No panics
/// - Absence of a principal is checked before roles, so an anonymous caller
///   always gets `AuthenticationRequired`, never a role mismatch.
pub fn authorize(principal: Option<&Principal>, required: &Capability) -> Result<(), AuthzError> {
    match required {
        Capability::Public => Ok(()),
        Capability::Authenticated => principal.map(|_| ()).ok_or(AuthzError::AuthenticationRequired),
        Capability::AnyRole(roles) => {
            let principal = principal.ok_or(AuthzError::AuthenticationRequired)?;
            if principal.has_any_role(roles) {
                Ok(())
            } else {
                Err(AuthzError::AuthorizationDenied {
                    required: roles.clone(),
                })
            }
        }
    }
}

fn join_roles(roles: &RoleSet) -> String {
    roles.iter().map(Role::as_str).collect::<Vec<_>>().join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization Explanation (Audit Trail)
// ─────────────────────────────────────────────────────────────────────────────

/// Why a decision came out the way it did. Server-side logging only.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required: String,
    pub granted: bool,
    pub reason: String,
    pub principal_roles: Vec<Role>,
}

pub fn explain_authorization(principal: Option<&Principal>, required: &Capability) -> AuthorizationExplanation {
    let principal_roles = principal
        .map(|p| p.roles.iter().copied().collect())
        .unwrap_or_default();

    let (granted, reason) = match authorize(principal, required) {
        Ok(()) => match (required, principal) {
            (Capability::Public, _) => (true, "route is public".to_string()),
            (_, Some(p)) => (true, format!("principal {} satisfies {required}", p.subject)),
            (_, None) => (true, "allowed".to_string()),
        },
        Err(AuthzError::AuthenticationRequired) => (false, "no valid token presented".to_string()),
        Err(AuthzError::AuthorizationDenied { required: roles }) => (
            false,
            format!("principal holds none of [{}]", join_roles(&roles)),
        ),
    };

    AuthorizationExplanation {
        required: required.to_string(),
        granted,
        reason,
        principal_roles,
    }
}
