//! Consistent error envelopes.
//!
//! Every non-2xx response carries the same shape:
//! `{ "error", "code", "requestId", "timestamp" }`. Messages come from the
//! sanitizer's safe vocabulary; nothing here ever echoes internal reasons.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{Duration, Utc};
use serde_json::json;

use ledgergate_authz::request::DecisionReason;
use ledgergate_authz::sanitize::{public_code, public_message};
use ledgergate_core::RequestId;

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    request_id: Option<&RequestId>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": message.into(),
            "code": code,
            "requestId": request_id.map(|r| r.as_str().to_owned()),
            "timestamp": Utc::now().to_rfc3339(),
        })),
    )
        .into_response()
}

/// Denial envelope for an authorization decision. Infrastructure failures
/// surface as 500 so operators can tell them from policy denials; every
/// policy denial is an indistinguishable 403.
pub fn denial_response(
    reason: DecisionReason,
    request_id: Option<&RequestId>,
) -> axum::response::Response {
    let status = match reason {
        DecisionReason::AuthorizationError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::FORBIDDEN,
    };
    json_error(status, public_code(reason), public_message(reason), request_id)
}

/// Enforcement envelope for throttled/blocked subjects; same shape plus
/// `retryAfterMs`.
pub fn abuse_response(
    status: StatusCode,
    code: &'static str,
    retry_after: Duration,
    request_id: Option<&RequestId>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": "Too many requests",
            "code": code,
            "requestId": request_id.map(|r| r.as_str().to_owned()),
            "timestamp": Utc::now().to_rfc3339(),
            "retryAfterMs": retry_after.num_milliseconds().max(0),
        })),
    )
        .into_response()
}
