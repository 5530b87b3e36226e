//! HTTP routes, one file per area, each guarded by a [`RouteGuard`].

use axum::Router;

use crate::middleware::{self, AuthLayerState, RouteGuard};

pub mod invoices;
pub mod members;
pub mod ops;
pub mod reports;
pub mod system;

/// Attach a guard to a route group.
fn guarded(router: Router, state: &AuthLayerState, guard: RouteGuard) -> Router {
    router.route_layer(axum::middleware::from_fn_with_state(
        (state.clone(), guard),
        middleware::authorize_middleware,
    ))
}

/// All tenant-scoped routes. Identity and abuse layers are applied by the
/// caller, outside this router.
pub fn router(state: &AuthLayerState) -> Router {
    Router::new()
        .merge(invoices::router(state))
        .merge(members::router(state))
        .merge(reports::router(state))
        .merge(ops::router(state))
}
