//! Member routes.
//!
//! Profiles are owned by the member they describe: admins reach any profile
//! through `admin:members:read`, everyone else only their own via the
//! self-access shortcut on the guard.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use ledgergate_authz::registry;
use ledgergate_authz::TenantContext;
use ledgergate_core::ResourceKind;

use crate::middleware::{AuthLayerState, RouteGuard};

use super::guarded;

pub fn router(state: &AuthLayerState) -> Router {
    guarded(
        Router::new().route("/members/:id/profile", get(get_profile)),
        state,
        RouteGuard::permission(registry::ADMIN_MEMBERS_READ)
            .on_resource(ResourceKind::MemberProfile, "id")
            .or_self(),
    )
}

/// GET /members/:id/profile - fetch one member profile.
pub async fn get_profile(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "memberId": id })),
    )
        .into_response()
}
