//! Invoice routes.
//!
//! The handlers are deliberately thin; the interesting behavior is the guard
//! chain in front of them: permission checks on the collection routes,
//! resource-scoped ownership validation on the item routes.

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;

use ledgergate_authz::registry;
use ledgergate_authz::TenantContext;
use ledgergate_core::ResourceKind;

use crate::middleware::{AuthLayerState, RouteGuard};

use super::guarded;

pub fn router(state: &AuthLayerState) -> Router {
    let list = guarded(
        Router::new().route("/invoices", get(list_invoices)),
        state,
        RouteGuard::permission(registry::INVOICES_READ),
    );
    let create = guarded(
        Router::new().route("/invoices", post(create_invoice)),
        state,
        RouteGuard::permission(registry::INVOICES_WRITE),
    );
    let item = guarded(
        Router::new().route("/invoices/:id", get(get_invoice)),
        state,
        RouteGuard::permission(registry::INVOICES_READ).on_resource(ResourceKind::Invoice, "id"),
    );
    let remove = guarded(
        Router::new().route("/invoices/:id", delete(delete_invoice)),
        state,
        RouteGuard::permission(registry::INVOICES_DELETE)
            .on_resource(ResourceKind::Invoice, "id"),
    );
    // The target invoice travels in the payment body, not the path.
    let payment = guarded(
        Router::new().route("/invoices/payments", post(record_payment)),
        state,
        RouteGuard::permission(registry::INVOICES_WRITE)
            .on_resource_body(ResourceKind::Invoice, "invoiceId"),
    );
    list.merge(create).merge(item).merge(remove).merge(payment)
}

/// GET /invoices - list invoices visible to the tenant.
pub async fn list_invoices(Extension(ctx): Extension<TenantContext>) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "invoices": [] })),
    )
        .into_response()
}

/// POST /invoices - create an invoice.
pub async fn create_invoice(Extension(ctx): Extension<TenantContext>) -> axum::response::Response {
    (
        StatusCode::CREATED,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "status": "created" })),
    )
        .into_response()
}

/// GET /invoices/:id - fetch one invoice, ownership-checked.
pub async fn get_invoice(
    Extension(ctx): Extension<TenantContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(json!({ "tenantId": ctx.tenant_id.to_string(), "invoiceId": id })),
    )
        .into_response()
}

/// DELETE /invoices/:id - remove one invoice, ownership-checked.
pub async fn delete_invoice(Path(_id): Path<String>) -> axum::response::Response {
    StatusCode::NO_CONTENT.into_response()
}

/// POST /invoices/payments - record a payment against the invoice named in
/// the body, ownership-checked by the guard before the handler runs.
pub async fn record_payment(
    Extension(ctx): Extension<TenantContext>,
    Json(payload): Json<serde_json::Value>,
) -> axum::response::Response {
    (
        StatusCode::ACCEPTED,
        Json(json!({
            "tenantId": ctx.tenant_id.to_string(),
            "invoiceId": payload["invoiceId"],
            "status": "recorded",
        })),
    )
        .into_response()
}
