use axum::{Json, extract::Extension, http::StatusCode, response::Response};

use gatehouse_auth::Principal;

use crate::app::errors;
use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

/// Echo what the presented token asserts. Reads nothing from the store.
pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> Json<Principal> {
    Json(principal.principal().clone())
}

/// Router fallback. Unknown paths sit behind the auth layer like any other
/// unlisted path, so only an authenticated caller gets this far.
pub async fn not_found() -> Response {
    errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found")
}
