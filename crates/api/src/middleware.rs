use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header::{AUTHORIZATION, SET_COOKIE},
    middleware::Next,
    response::Response,
};

use gatehouse_auth::{AuthzError, Capability, RoutePolicy, SessionPolicy, authorize, explain_authorization};

use crate::app::errors;
use crate::context::PrincipalContext;

#[derive(Clone)]
pub struct AuthState {
    pub session: SessionPolicy,
    pub routes: Arc<RoutePolicy>,
}

/// Resolve the caller from the bearer token and apply the route table.
///
/// Public routes never look at the `Authorization` header.
pub async fn auth_middleware(State(state): State<AuthState>, mut req: Request, next: Next) -> Response {
    let required = state.routes.required(req.method().as_str(), req.uri().path()).clone();
    if required == Capability::Public {
        return next.run(req).await;
    }

    // A header that is not valid UTF-8 cannot carry a bearer token.
    let header = match req.headers().get(AUTHORIZATION).map(|v| v.to_str()) {
        Some(Ok(value)) => Some(value),
        Some(Err(_)) => Some(""),
        None => None,
    };

    let principal = match state.session.authenticate(header) {
        Ok(principal) => principal,
        Err(err) => {
            tracing::debug!(reason = %err, path = %req.uri().path(), "token rejected");
            return errors::unauthenticated();
        }
    };

    if let Err(err) = authorize(principal.as_ref(), &required) {
        let explanation = explain_authorization(principal.as_ref(), &required);
        tracing::debug!(
            path = %req.uri().path(),
            required = %explanation.required,
            reason = %explanation.reason,
            "access denied"
        );
        return match err {
            AuthzError::AuthenticationRequired => errors::unauthenticated(),
            AuthzError::AuthorizationDenied { .. } => errors::forbidden(),
        };
    }

    if let Some(principal) = principal {
        req.extensions_mut().insert(PrincipalContext::new(principal));
    }

    next.run(req).await
}

/// No response ever establishes server-side session state.
pub async fn strip_session_cookies(mut res: Response) -> Response {
    res.headers_mut().remove(SET_COOKIE);
    res
}
