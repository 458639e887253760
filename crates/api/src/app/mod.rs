//! HTTP application wiring (Axum router + service wiring).
//!
//! - `services.rs`: startup wiring (keys, issuer/verifier, credential store)
//! - `routes/`: HTTP handlers and the ordered access rules
//! - `dto.rs`: request/response bodies
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::{AppServices, StartupError, build_services};

/// Build the full HTTP router (public entrypoint used by `main.rs`).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let auth_state = middleware::AuthState {
        session: services.session.clone(),
        routes: Arc::new(routes::route_policy()),
    };

    routes::router().layer(
        ServiceBuilder::new()
            .layer(axum::middleware::map_response(middleware::strip_session_cookies))
            .layer(axum::middleware::from_fn_with_state(
                auth_state,
                middleware::auth_middleware,
            ))
            .layer(Extension(services)),
    )
}
