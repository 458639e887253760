//! Token issuance and logout.

use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
};

use crate::app::dto::{CredentialsRequest, TokenResponse};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /request-token
pub async fn request_token(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let identity = match services.credentials.verify(&body.username, &body.password).await {
        Ok(identity) => identity,
        Err(e) => return errors::login_error_to_response(e),
    };

    let issued = match services.issuer.issue(&identity) {
        Ok(issued) => issued,
        Err(e) => return errors::internal("token signing failed", e),
    };

    tracing::info!(
        user_id = %identity.subject,
        token_id = %issued.token_id,
        expires_at = %issued.expires_at,
        "token issued"
    );

    let mut res = Json(TokenResponse::bearer(issued, identity.subject)).into_response();
    res.headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    res
}

/// POST /logout
///
/// Nothing to tear down server-side; the client discards its token, which
/// stays valid until it expires.
pub async fn logout(Extension(principal): Extension<PrincipalContext>) -> StatusCode {
    tracing::info!(
        user_id = %principal.user_id(),
        expires_at = %principal.expires_at(),
        "logout acknowledged"
    );
    StatusCode::NO_CONTENT
}
