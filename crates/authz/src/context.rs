//! Per-request tenant context.

use serde::{Deserialize, Serialize};

use ledgergate_core::{RequestId, TenantId, UserId};

use crate::permission::Permission;
use crate::role::Role;

/// The per-request bundle identifying the acting tenant, user, and role.
///
/// Built by the upstream authentication layer and passed by reference through
/// the whole decision chain; this core never persists it. The asserted `role`
/// is re-verified against the membership record on every decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantContext {
    pub tenant_id: TenantId,
    pub user_id: UserId,
    /// Role asserted by the caller's token. Trusted only after it matches the
    /// membership record.
    pub role: Role,
    pub request_id: RequestId,
    /// Permissions upstream already resolved, if any. Advisory/diagnostic
    /// only: the engine grants strictly from the registry plus the membership
    /// record, so a stale or forged hint can never widen access.
    pub resolved_permissions: Option<Vec<Permission>>,
}

impl TenantContext {
    pub fn new(tenant_id: TenantId, user_id: UserId, role: Role, request_id: RequestId) -> Self {
        Self {
            tenant_id,
            user_id,
            role,
            request_id,
            resolved_permissions: None,
        }
    }

    pub fn with_resolved_permissions(mut self, permissions: Vec<Permission>) -> Self {
        self.resolved_permissions = Some(permissions);
        self
    }
}
