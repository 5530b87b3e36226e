//! HTTP application wiring (Axum router + service wiring).
//!
//! Layer order, outermost first: identity extraction, abuse enforcement,
//! per-route authorization guards, handler.

use std::sync::Arc;

use axum::{routing::get, Extension, Router};

use crate::middleware;

pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router against freshly wired in-memory services.
pub fn build_app() -> Router {
    build_app_with(Arc::new(services::build_services()))
}

/// Build the router against pre-wired services (tests seed the directory
/// first).
pub fn build_app_with(services: Arc<AppServices>) -> Router {
    let state = services.auth.clone();

    let protected = routes::router(&state)
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::abuse_middleware,
        ))
        .layer(axum::middleware::from_fn(middleware::identity_middleware));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
}

pub use services::AppServices;
