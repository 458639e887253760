use axum::http::{HeaderValue, StatusCode, header::WWW_AUTHENTICATE};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use gatehouse_auth::LoginError;
use gatehouse_core::DomainError;
use gatehouse_infra::UserStoreError;

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Every token failure looks the same from outside.
pub fn unauthenticated() -> Response {
    let mut res = json_error(StatusCode::UNAUTHORIZED, "unauthenticated", "authentication required");
    res.headers_mut()
        .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    res
}

pub fn forbidden() -> Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", "insufficient role")
}

pub fn login_error_to_response(err: LoginError) -> Response {
    match err {
        LoginError::InvalidCredentials => json_error(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "invalid username or password",
        ),
        LoginError::StoreUnavailable(e) => {
            tracing::warn!(error = %e, "login failed: credential store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "try again later")
        }
        LoginError::Internal(e) => {
            tracing::error!(error = %e, "login failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
        }
    }
}

pub fn user_store_error_to_response(err: UserStoreError) -> Response {
    match err {
        UserStoreError::Domain(DomainError::Validation(msg)) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", msg)
        }
        UserStoreError::Domain(DomainError::InvalidId(msg)) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        UserStoreError::Domain(DomainError::NotFound) => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        UserStoreError::Domain(DomainError::Conflict(msg)) => json_error(StatusCode::CONFLICT, "conflict", msg),
        UserStoreError::Unavailable => {
            tracing::warn!("user store unavailable");
            json_error(StatusCode::SERVICE_UNAVAILABLE, "unavailable", "try again later")
        }
    }
}

pub fn internal(context: &'static str, err: impl core::fmt::Display) -> Response {
    tracing::error!(error = %err, "{context}");
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal error")
}
