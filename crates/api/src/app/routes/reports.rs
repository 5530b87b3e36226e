//! Report routes.
//!
//! Exporting needs both the read and the export grant; the export listing is
//! open to anyone holding either the export grant or audit administration.

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use ledgergate_authz::registry;
use ledgergate_authz::TenantContext;

use crate::middleware::{AuthLayerState, RouteGuard};

use super::guarded;

pub fn router(state: &AuthLayerState) -> Router {
    let export = guarded(
        Router::new().route("/reports/export", post(export_report)),
        state,
        RouteGuard::all_of(&[registry::REPORTS_READ, registry::REPORTS_EXPORT]),
    );
    let exports = guarded(
        Router::new().route("/reports/exports", get(list_exports)),
        state,
        RouteGuard::any_of(&[registry::REPORTS_EXPORT, registry::ADMIN_AUDIT_READ]),
    );
    export.merge(exports)
}

/// POST /reports/export - start a report export.
pub async fn export_report(Extension(ctx): Extension<TenantContext>) -> axum::response::Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "status": "queued" })),
    )
        .into_response()
}

/// GET /reports/exports - list recent exports.
pub async fn list_exports(Extension(ctx): Extension<TenantContext>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "exports": [] })),
    )
        .into_response()
}
