use axum::Json;
use serde_json::json;

/// GET /health - liveness probe, unauthenticated.
pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}
