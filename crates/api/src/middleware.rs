//! Request-path middleware: identity, abuse enforcement, and per-route
//! authorization guards.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{ConnectInfo, RawPathParams, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use tracing::error;

use ledgergate_abuse::{AbuseProtectionEngine, EnforcementDecision, SubjectKey};
use ledgergate_audit::RbacAuditLogger;
use ledgergate_authz::request::DecisionReason;
use ledgergate_authz::validator::{ResourceCheck, ResourceScopedPermissionValidator};
use ledgergate_authz::{AuthorizationEngine, AuthorizationRequest, Permission, TenantContext};
use ledgergate_core::{ResourceId, ResourceKind};

use crate::app::errors;
use crate::context;

/// Shared handles for the whole authorization layer.
#[derive(Clone)]
pub struct AuthLayerState {
    pub engine: Arc<AuthorizationEngine>,
    pub validator: Arc<ResourceScopedPermissionValidator>,
    pub audit: Arc<RbacAuditLogger>,
    pub abuse: Arc<AbuseProtectionEngine>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Install the forwarded identity as a request extension.
///
/// Anonymous requests pass through without a context; the per-route guards
/// reject them. Malformed identity headers are rejected here.
pub async fn identity_middleware(mut req: Request<Body>, next: Next) -> Response {
    match context::context_from_headers(req.headers()) {
        Ok(Some(ctx)) => {
            req.extensions_mut().insert(ctx);
        }
        Ok(None) => {}
        Err(msg) => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "UNAUTHENTICATED", msg, None);
        }
    }
    next.run(req).await
}

// ─────────────────────────────────────────────────────────────────────────────
// Abuse enforcement
// ─────────────────────────────────────────────────────────────────────────────

/// Enforce the subject's abuse tier before the handler runs and feed the
/// detectors afterwards. Rejected requests never reach the handler and are
/// not recorded against the subject's windows.
pub async fn abuse_middleware(
    State(state): State<AuthLayerState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let ctx = req.extensions().get::<TenantContext>().cloned();
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let ip = context::client_ip(req.headers(), peer);
    let subject = SubjectKey::resolve(
        ctx.as_ref().map(|c| c.tenant_id),
        ctx.as_ref().map(|c| c.user_id),
        ip,
    );
    let path = req.uri().path().to_string();
    let request_id = ctx
        .as_ref()
        .map(|c| c.request_id.clone())
        .unwrap_or_default();

    match state.abuse.check_request(&subject, Utc::now()) {
        EnforcementDecision::Blocked { retry_after } => {
            return errors::abuse_response(
                StatusCode::FORBIDDEN,
                "ABUSE_BLOCKED",
                retry_after,
                Some(&request_id),
            );
        }
        EnforcementDecision::Throttled { retry_after } => {
            return errors::abuse_response(
                StatusCode::TOO_MANY_REQUESTS,
                "ABUSE_THROTTLED",
                retry_after,
                Some(&request_id),
            );
        }
        EnforcementDecision::Allow => {}
    }

    state.abuse.record_request(&subject, &path, Utc::now());
    let response = next.run(req).await;
    state.abuse.record_response(
        &subject,
        &path,
        response.status().as_u16(),
        &request_id,
        Utc::now(),
    );
    response
}

// ─────────────────────────────────────────────────────────────────────────────
// Authorization guards
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum PermissionRequirement {
    Single(&'static str),
    Any(&'static [&'static str]),
    All(&'static [&'static str]),
}

/// Where a route's resource id comes from.
#[derive(Debug, Clone)]
enum ResourceSelector {
    PathParam(&'static str),
    BodyField(&'static str),
}

/// Per-route resource scoping: what kind the resource is and where its id is
/// extracted from.
#[derive(Debug, Clone)]
pub struct ResourceGuard {
    kind: ResourceKind,
    selector: ResourceSelector,
    allow_self: bool,
}

/// Upper bound on a request body the guard will buffer to read a resource id.
const GUARD_BODY_LIMIT: usize = 256 * 1024;

/// Declarative description of what a route requires.
#[derive(Debug, Clone)]
pub struct RouteGuard {
    requirement: PermissionRequirement,
    resource: Option<ResourceGuard>,
}

impl RouteGuard {
    pub fn permission(permission: &'static str) -> Self {
        Self {
            requirement: PermissionRequirement::Single(permission),
            resource: None,
        }
    }

    pub fn any_of(permissions: &'static [&'static str]) -> Self {
        Self {
            requirement: PermissionRequirement::Any(permissions),
            resource: None,
        }
    }

    pub fn all_of(permissions: &'static [&'static str]) -> Self {
        Self {
            requirement: PermissionRequirement::All(permissions),
            resource: None,
        }
    }

    /// Scope the check to the resource named by a path parameter.
    pub fn on_resource(mut self, kind: ResourceKind, param: &'static str) -> Self {
        self.resource = Some(ResourceGuard {
            kind,
            selector: ResourceSelector::PathParam(param),
            allow_self: false,
        });
        self
    }

    /// Scope the check to the resource named by a top-level JSON body field.
    /// The body is buffered, inspected, and handed on to the handler intact.
    pub fn on_resource_body(mut self, kind: ResourceKind, field: &'static str) -> Self {
        self.resource = Some(ResourceGuard {
            kind,
            selector: ResourceSelector::BodyField(field),
            allow_self: false,
        });
        self
    }

    /// Let a caller through when the path parameter is their own user id.
    pub fn or_self(mut self) -> Self {
        if let Some(resource) = &mut self.resource {
            resource.allow_self = true;
        }
        self
    }

    fn primary(&self) -> &'static str {
        match self.requirement {
            PermissionRequirement::Single(p) => p,
            PermissionRequirement::Any(ps) | PermissionRequirement::All(ps) => {
                ps.first().copied().unwrap_or("")
            }
        }
    }
}

/// Guard middleware applied per route via
/// `axum::middleware::from_fn_with_state((state, guard), authorize_middleware)`.
pub async fn authorize_middleware(
    State((state, guard)): State<(AuthLayerState, RouteGuard)>,
    params: RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(ctx) = req.extensions().get::<TenantContext>().cloned() else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "UNAUTHENTICATED",
            "Authentication required",
            None,
        );
    };

    if let Some(resource) = &guard.resource {
        return authorize_resource(&state, &guard, resource, &ctx, &params, req, next).await;
    }

    let result = match guard.requirement {
        PermissionRequirement::Single(permission) => {
            let request = AuthorizationRequest::new(ctx.clone(), Permission::new(permission));
            state.engine.authorize(&request).await
        }
        PermissionRequirement::Any(permissions) => {
            state.engine.has_any_permission(&ctx, permissions).await
        }
        PermissionRequirement::All(permissions) => {
            state.engine.has_all_permissions(&ctx, permissions).await
        }
    };

    if !result.authorized {
        return errors::denial_response(result.reason, Some(&ctx.request_id));
    }
    next.run(req).await
}

async fn authorize_resource(
    state: &AuthLayerState,
    guard: &RouteGuard,
    resource: &ResourceGuard,
    ctx: &TenantContext,
    params: &RawPathParams,
    req: Request<Body>,
    next: Next,
) -> Response {
    let (raw_id, req) = match resource.selector {
        ResourceSelector::PathParam(param) => {
            let Some(value) = params
                .iter()
                .find(|(name, _)| *name == param)
                .map(|(_, value)| value.to_string())
            else {
                // Route wired with a parameter name that does not exist; deny.
                error!(param, "resource guard parameter missing from route");
                return errors::denial_response(
                    DecisionReason::AuthorizationError,
                    Some(&ctx.request_id),
                );
            };
            (value, req)
        }
        ResourceSelector::BodyField(field) => {
            let (parts, body) = req.into_parts();
            let bytes = match axum::body::to_bytes(body, GUARD_BODY_LIMIT).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return errors::denial_response(
                        DecisionReason::ValidationError,
                        Some(&ctx.request_id),
                    );
                }
            };
            let value = serde_json::from_slice::<serde_json::Value>(&bytes)
                .ok()
                .and_then(|json| json.get(field)?.as_str().map(str::to_string));
            let req = Request::from_parts(parts, Body::from(bytes));
            match value {
                Some(value) => (value, req),
                None => {
                    return errors::denial_response(
                        DecisionReason::ValidationError,
                        Some(&ctx.request_id),
                    );
                }
            }
        }
    };

    if resource.allow_self && raw_id == ctx.user_id.to_string() {
        return next.run(req).await;
    }

    let resource_id = match ResourceId::parse(raw_id) {
        Ok(id) => id,
        Err(_) => {
            return errors::denial_response(
                DecisionReason::ValidationError,
                Some(&ctx.request_id),
            );
        }
    };

    let check = ResourceCheck {
        context: ctx.clone(),
        permission: Permission::new(guard.primary()),
        kind: resource.kind,
        resource_id,
    };
    let outcome = state.validator.validate_resource_permission(&check).await;
    if !outcome.authorized {
        return errors::denial_response(outcome.reason, Some(&ctx.request_id));
    }
    next.run(req).await
}
