//! Operator endpoints: audit metrics, security summary, abuse metrics.

use std::sync::Arc;

use axum::{extract::Extension, routing::get, Json, Router};
use serde_json::json;

use ledgergate_authz::registry;

use crate::app::services::AppServices;
use crate::middleware::{AuthLayerState, RouteGuard};

use super::guarded;

pub fn router(state: &AuthLayerState) -> Router {
    guarded(
        Router::new()
            .route("/ops/audit/metrics", get(audit_metrics))
            .route("/ops/audit/summary", get(audit_summary))
            .route("/ops/abuse/metrics", get(abuse_metrics)),
        state,
        RouteGuard::permission(registry::ADMIN_AUDIT_READ),
    )
}

/// GET /ops/audit/metrics - raw audit counters.
pub async fn audit_metrics(
    Extension(services): Extension<Arc<AppServices>>,
) -> Json<serde_json::Value> {
    Json(json!({ "metrics": services.auth.audit.metrics() }))
}

/// GET /ops/audit/summary - risk assessment with recommendations.
pub async fn audit_summary(
    Extension(services): Extension<Arc<AppServices>>,
) -> Json<serde_json::Value> {
    Json(json!({ "summary": services.auth.audit.security_summary() }))
}

/// GET /ops/abuse/metrics - per-tier subject counts.
pub async fn abuse_metrics(
    Extension(services): Extension<Arc<AppServices>>,
) -> Json<serde_json::Value> {
    Json(json!({ "metrics": services.auth.abuse.metrics() }))
}
