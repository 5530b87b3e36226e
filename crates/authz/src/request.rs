//! Authorization request/result value objects and the reason-code taxonomy.

use serde::{Deserialize, Serialize};

use ledgergate_core::{ResourceId, ResourceKind, TenantId, UserId};

use crate::context::TenantContext;
use crate::permission::Permission;

/// Reference to a resource attached to an authorization request.
///
/// `owner_id` / `tenant_id` are the caller's claims about the resource; the
/// engine always re-derives both from the tenant-scoped existence query and
/// treats a mismatch as denial.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: ResourceId,
    pub owner_id: Option<UserId>,
    pub tenant_id: Option<TenantId>,
}

/// Transient input to [`AuthorizationEngine::authorize`](crate::AuthorizationEngine::authorize).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationRequest {
    pub context: TenantContext,
    pub permission: Permission,
    pub resource: Option<ResourceRef>,
}

impl AuthorizationRequest {
    pub fn new(context: TenantContext, permission: impl Into<Permission>) -> Self {
        Self {
            context,
            permission: permission.into(),
            resource: None,
        }
    }

    pub fn with_resource(mut self, resource: ResourceRef) -> Self {
        self.resource = Some(resource);
        self
    }
}

/// One step of the decision trail (diagnostic only, never exposed
/// externally).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationCheck {
    pub name: &'static str,
    pub passed: bool,
    pub detail: Option<String>,
}

impl ValidationCheck {
    pub(crate) fn passed(name: &'static str) -> Self {
        Self {
            name,
            passed: true,
            detail: None,
        }
    }

    pub(crate) fn failed(name: &'static str, detail: impl Into<String>) -> Self {
        Self {
            name,
            passed: false,
            detail: Some(detail.into()),
        }
    }
}

/// Internal reason codes. Retained in full in logs and audit records; never
/// externally distinguishable (see [`crate::sanitize`]).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionReason {
    Granted,
    // Structural
    InvalidPermission,
    ValidationError,
    // Tenant state
    TenantNotFound,
    TenantInactive,
    UserNotTenantMember,
    UserMembershipInactive,
    RoleMismatch,
    // Decision
    PermissionDenied,
    AnyPermissionDenied,
    AllPermissionDenied,
    // Resource
    ResourceNotFound,
    ResourceTenantMismatch,
    ResourceOwnershipDenied,
    CrossTenantAccess,
    ProbingDetected,
    // Infrastructure
    AuthorizationError,
}

impl DecisionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Granted => "GRANTED",
            Self::InvalidPermission => "INVALID_PERMISSION",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::TenantNotFound => "TENANT_NOT_FOUND",
            Self::TenantInactive => "TENANT_INACTIVE",
            Self::UserNotTenantMember => "USER_NOT_TENANT_MEMBER",
            Self::UserMembershipInactive => "USER_MEMBERSHIP_INACTIVE",
            Self::RoleMismatch => "ROLE_MISMATCH",
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::AnyPermissionDenied => "ANY_PERMISSION_DENIED",
            Self::AllPermissionDenied => "ALL_PERMISSION_DENIED",
            Self::ResourceNotFound => "RESOURCE_NOT_FOUND",
            Self::ResourceTenantMismatch => "RESOURCE_TENANT_MISMATCH",
            Self::ResourceOwnershipDenied => "RESOURCE_OWNERSHIP_DENIED",
            Self::CrossTenantAccess => "CROSS_TENANT_ACCESS",
            Self::ProbingDetected => "PROBING_DETECTED",
            Self::AuthorizationError => "AUTHORIZATION_ERROR",
        }
    }
}

impl core::fmt::Display for DecisionReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single `authorize()` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub reason: DecisionReason,
    /// Diagnostic trail of every check performed, in order.
    pub checks: Vec<ValidationCheck>,
}

impl AuthorizationResult {
    pub(crate) fn granted(checks: Vec<ValidationCheck>) -> Self {
        Self {
            authorized: true,
            reason: DecisionReason::Granted,
            checks,
        }
    }

    pub(crate) fn denied(reason: DecisionReason, checks: Vec<ValidationCheck>) -> Self {
        Self {
            authorized: false,
            reason,
            checks,
        }
    }
}
