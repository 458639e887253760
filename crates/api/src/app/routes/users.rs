//! Account creation, lookup, update and removal.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use gatehouse_auth::{PasswordHash, Role};
use gatehouse_core::UserId;
use gatehouse_infra::{UserStoreError, validate_username};

use crate::app::dto::{CredentialsRequest, UserResponse};
use crate::app::{errors, services::AppServices};
use crate::context::PrincipalContext;

/// POST /users
///
/// Self-registration. The new account is always a plain USER.
pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let hash = match validated_hash(&services, body.username.as_str(), body.password).await {
        Ok(hash) => hash,
        Err(response) => return response,
    };

    match services.users.register(&body.username, hash, Role::User) {
        Ok(credential) => (StatusCode::CREATED, Json(UserResponse::from(&credential))).into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// GET /users
pub async fn list_users(Extension(services): Extension<Arc<AppServices>>) -> Response {
    match services.users.list() {
        Ok(all) => Json(all.iter().map(UserResponse::from).collect::<Vec<_>>()).into_response(),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// GET /users/me
///
/// A token for a removed account still authenticates, but there is no
/// record left to show.
pub async fn me(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> Response {
    match services.users.get(principal.user_id()) {
        Ok(Some(credential)) => Json(UserResponse::from(&credential)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "account no longer exists"),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// GET /users/:id
pub async fn get_user(Extension(services): Extension<Arc<AppServices>>, Path(id): Path<String>) -> Response {
    let user_id: UserId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::user_store_error_to_response(UserStoreError::Domain(e)),
    };

    match services.users.get(user_id) {
        Ok(Some(credential)) => Json(UserResponse::from(&credential)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// PUT /users/:id
///
/// Replaces username and password; the id and role stay. Tokens carry the
/// id, so ones issued before a rename keep resolving to the account.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    Json(body): Json<CredentialsRequest>,
) -> Response {
    let user_id: UserId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::user_store_error_to_response(UserStoreError::Domain(e)),
    };

    let hash = match validated_hash(&services, body.username.as_str(), body.password).await {
        Ok(hash) => hash,
        Err(response) => return response,
    };

    match services.users.update(user_id, &body.username, hash) {
        Ok(credential) => {
            tracing::info!(user_id = %user_id, updated_by = %principal.user_id(), "user updated");
            Json(UserResponse::from(&credential)).into_response()
        }
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// DELETE /users/:id
///
/// Tokens already issued to the account are not revoked.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> Response {
    let user_id: UserId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::user_store_error_to_response(UserStoreError::Domain(e)),
    };

    match services.users.remove(user_id) {
        Ok(_) => {
            tracing::info!(user_id = %user_id, removed_by = %principal.user_id(), "user deleted");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => errors::user_store_error_to_response(e),
    }
}

/// Check the submitted username and password, then hash the password off the
/// async executor.
async fn validated_hash(services: &AppServices, username: &str, password: String) -> Result<PasswordHash, Response> {
    if let Err(e) = validate_username(username) {
        return Err(errors::user_store_error_to_response(e.into()));
    }
    if password.trim().is_empty() {
        return Err(errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "password must not be blank",
        ));
    }

    let hasher = services.hasher.clone();
    match tokio::task::spawn_blocking(move || hasher.hash(&password)).await {
        Ok(Ok(hash)) => Ok(hash),
        Ok(Err(e)) => Err(errors::internal("password hashing failed", e)),
        Err(e) => Err(errors::internal("password hashing task failed", e)),
    }
}
