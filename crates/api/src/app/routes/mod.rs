use axum::{
    Router,
    routing::{get, post},
};

use gatehouse_auth::{Capability, Role, RoutePolicy};

pub mod admin;
pub mod auth;
pub mod system;
pub mod users;

/// Every endpoint. Access is decided by [`route_policy`], not here.
pub fn router() -> Router {
    Router::new()
        .route("/health", get(system::health))
        .route("/whoami", get(system::whoami))
        .route("/request-token", post(auth::request_token))
        .route("/logout", post(auth::logout))
        .route("/users", post(users::create_user).get(users::list_users))
        .route("/users/me", get(users::me))
        .route(
            "/users/:id",
            get(users::get_user).put(users::update_user).delete(users::delete_user),
        )
        .route("/admin", get(admin::admin_page))
        .fallback(system::not_found)
}

/// Ordered access rules for [`router`]. Unlisted paths require a valid token.
pub fn route_policy() -> RoutePolicy {
    let admin = Capability::role(Role::Admin);

    RoutePolicy::new()
        .any("/health", Capability::Public)
        .any("/request-token", Capability::Public)
        .method("POST", "/users", Capability::Public)
        .method("GET", "/users/me", Capability::any_of([Role::User, Role::Admin]))
        .any("/users", admin.clone())
        .any("/users/*", admin.clone())
        .any("/admin/**", admin)
}
