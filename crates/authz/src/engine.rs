//! Central authorization decision engine.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use ledgergate_audit::logger::Details;
use ledgergate_audit::RbacAuditLogger;
use ledgergate_core::{TenantId, UserId};

use crate::context::TenantContext;
use crate::permission::Permission;
use crate::registry::PermissionRegistry;
use crate::request::{
    AuthorizationRequest, AuthorizationResult, DecisionReason, ValidationCheck,
};
use crate::role::Role;
use crate::store::{ResourceDirectory, StoreError, TenantDirectory};

/// Engine configuration. All knobs have production defaults.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Cache resolved permission sets per (user, tenant, role).
    pub cache_permissions: bool,
    /// Cache entry lifetime. Expiry is the only implicit invalidation.
    pub cache_ttl: Duration,
    /// Cache capacity bound; the oldest entry is evicted when full.
    pub cache_capacity: usize,
    pub enable_resource_ownership_validation: bool,
    pub enable_audit_logging: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_permissions: true,
            cache_ttl: Duration::from_secs(300),
            cache_capacity: 10_000,
            enable_resource_ownership_validation: true,
            enable_audit_logging: true,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    permissions: HashSet<String>,
    inserted_at: Instant,
}

type CacheKey = (UserId, TenantId, Role);

/// The central `authorize()` decision function.
///
/// Constructed explicitly and shared via `Arc`; holds no hidden global state.
/// Every internal failure in the decision chain yields a denial with reason
/// `AUTHORIZATION_ERROR`; the engine never fails open.
pub struct AuthorizationEngine {
    registry: PermissionRegistry,
    tenants: Arc<dyn TenantDirectory>,
    resources: Arc<dyn ResourceDirectory>,
    audit: Option<Arc<RbacAuditLogger>>,
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
    config: EngineConfig,
}

impl AuthorizationEngine {
    pub fn new(
        registry: PermissionRegistry,
        tenants: Arc<dyn TenantDirectory>,
        resources: Arc<dyn ResourceDirectory>,
        audit: Option<Arc<RbacAuditLogger>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            registry,
            tenants,
            resources,
            audit,
            cache: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn registry(&self) -> &PermissionRegistry {
        &self.registry
    }

    /// Authorize one request. Never errors; failure is denial.
    pub async fn authorize(&self, request: &AuthorizationRequest) -> AuthorizationResult {
        let started = Instant::now();

        let result = match self.decide(request).await {
            Ok(result) => result,
            Err(err) => {
                warn!(
                    error = %err,
                    request_id = %request.context.request_id,
                    "authorization failed internally; denying"
                );
                AuthorizationResult::denied(
                    DecisionReason::AuthorizationError,
                    vec![ValidationCheck::failed("internal", err.to_string())],
                )
            }
        };

        let latency_us = started.elapsed().as_micros() as u64;
        info!(
            authorized = result.authorized,
            reason = result.reason.as_str(),
            latency_us,
            trail = result.checks.len(),
            tenant_id = %request.context.tenant_id,
            user_id = %request.context.user_id,
            request_id = %request.context.request_id,
            permission = request.permission.as_str(),
            "authorization decision"
        );

        if self.config.enable_audit_logging {
            self.emit_audit(request, &result);
        }

        result
    }

    /// `true` iff the permission is granted. Composes `authorize()`.
    pub async fn has_permission(&self, context: &TenantContext, permission: &str) -> bool {
        let request = AuthorizationRequest::new(
            context.clone(),
            Permission::new(permission.to_string()),
        );
        self.authorize(&request).await.authorized
    }

    /// Grant if any of the permissions is granted; first grant wins.
    pub async fn has_any_permission(
        &self,
        context: &TenantContext,
        permissions: &[&str],
    ) -> AuthorizationResult {
        let mut last_checks = Vec::new();
        for permission in permissions {
            let request = AuthorizationRequest::new(
                context.clone(),
                Permission::new((*permission).to_string()),
            );
            let result = self.authorize(&request).await;
            if result.authorized {
                return result;
            }
            last_checks = result.checks;
        }
        AuthorizationResult::denied(DecisionReason::AnyPermissionDenied, last_checks)
    }

    /// Grant only if every permission is granted; short-circuits on the first
    /// denial.
    pub async fn has_all_permissions(
        &self,
        context: &TenantContext,
        permissions: &[&str],
    ) -> AuthorizationResult {
        let mut checks = Vec::new();
        for permission in permissions {
            let request = AuthorizationRequest::new(
                context.clone(),
                Permission::new((*permission).to_string()),
            );
            let result = self.authorize(&request).await;
            if !result.authorized {
                return AuthorizationResult::denied(DecisionReason::AllPermissionDenied, result.checks);
            }
            checks = result.checks;
        }
        AuthorizationResult::granted(checks)
    }

    /// Drop every cached permission set.
    pub fn clear_permission_cache(&self) {
        self.cache.write().unwrap().clear();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Decision chain
    // ─────────────────────────────────────────────────────────────────────

    async fn decide(
        &self,
        request: &AuthorizationRequest,
    ) -> Result<AuthorizationResult, StoreError> {
        let ctx = &request.context;
        let mut checks = Vec::new();

        // 1. Structural validation.
        if ctx.tenant_id.as_uuid().is_nil() || ctx.user_id.as_uuid().is_nil() {
            checks.push(ValidationCheck::failed("structure", "nil identifier"));
            return Ok(AuthorizationResult::denied(DecisionReason::ValidationError, checks));
        }
        if request.permission.is_empty() {
            checks.push(ValidationCheck::failed("structure", "empty permission"));
            return Ok(AuthorizationResult::denied(DecisionReason::ValidationError, checks));
        }
        checks.push(ValidationCheck::passed("structure"));

        // 2. Permission-name validity.
        if !self.registry.is_known(request.permission.as_str()) {
            checks.push(ValidationCheck::failed(
                "permission_name",
                format!("unknown permission '{}'", request.permission),
            ));
            return Ok(AuthorizationResult::denied(DecisionReason::InvalidPermission, checks));
        }
        checks.push(ValidationCheck::passed("permission_name"));

        // 3. Tenant-context validation. Runs before any cache read so a
        //    deactivated tenant is never served from a stale permission set.
        let Some(status) = self.tenants.tenant_status(ctx.tenant_id).await? else {
            checks.push(ValidationCheck::failed("tenant", "tenant not found"));
            return Ok(AuthorizationResult::denied(DecisionReason::TenantNotFound, checks));
        };
        if !status.active {
            checks.push(ValidationCheck::failed("tenant", "tenant is inactive"));
            return Ok(AuthorizationResult::denied(DecisionReason::TenantInactive, checks));
        }
        checks.push(ValidationCheck::passed("tenant"));

        let Some(membership) = self.tenants.membership(ctx.tenant_id, ctx.user_id).await? else {
            checks.push(ValidationCheck::failed("membership", "not a member"));
            return Ok(AuthorizationResult::denied(
                DecisionReason::UserNotTenantMember,
                checks,
            ));
        };
        if !membership.active {
            checks.push(ValidationCheck::failed("membership", "membership inactive"));
            return Ok(AuthorizationResult::denied(
                DecisionReason::UserMembershipInactive,
                checks,
            ));
        }
        if membership.role != ctx.role {
            checks.push(ValidationCheck::failed(
                "membership_role",
                format!("asserted {} but membership is {}", ctx.role, membership.role),
            ));
            return Ok(AuthorizationResult::denied(DecisionReason::RoleMismatch, checks));
        }
        checks.push(ValidationCheck::passed("membership"));

        // 4. Permission resolution via the read-through cache.
        let granted = self.effective_permissions(ctx, &membership.extra_permissions);
        if !granted.contains(request.permission.as_str()) {
            checks.push(ValidationCheck::failed(
                "permission",
                format!("role {} lacks '{}'", ctx.role, request.permission),
            ));
            return Ok(AuthorizationResult::denied(DecisionReason::PermissionDenied, checks));
        }
        checks.push(ValidationCheck::passed("permission"));

        // 5. Resource ownership validation.
        if let Some(resource) = &request.resource {
            if self.config.enable_resource_ownership_validation {
                if let Some(claimed_tenant) = resource.tenant_id {
                    if claimed_tenant != ctx.tenant_id {
                        checks.push(ValidationCheck::failed(
                            "resource_tenant",
                            "cross-tenant resource reference",
                        ));
                        return Ok(AuthorizationResult::denied(
                            DecisionReason::CrossTenantAccess,
                            checks,
                        ));
                    }
                }

                let lookup = self
                    .resources
                    .lookup(resource.kind, &resource.id, ctx.tenant_id)
                    .await?;
                if !lookup.exists_in_tenant {
                    let reason = match lookup.actual_tenant_id {
                        Some(actual) if actual != ctx.tenant_id => {
                            checks.push(ValidationCheck::failed(
                                "resource_exists",
                                "resource belongs to another tenant",
                            ));
                            DecisionReason::ResourceTenantMismatch
                        }
                        _ => {
                            checks.push(ValidationCheck::failed(
                                "resource_exists",
                                "resource does not exist in tenant",
                            ));
                            DecisionReason::ResourceNotFound
                        }
                    };
                    return Ok(AuthorizationResult::denied(reason, checks));
                }
                checks.push(ValidationCheck::passed("resource_exists"));

                let owner = lookup.owner_id.or(resource.owner_id);
                if let Some(owner_id) = owner {
                    let admin_override = ctx.role.is_admin_tier()
                        || self.registry.is_admin_grade(request.permission.as_str());
                    if owner_id != ctx.user_id && !admin_override {
                        checks.push(ValidationCheck::failed(
                            "resource_ownership",
                            "caller does not own resource",
                        ));
                        return Ok(AuthorizationResult::denied(
                            DecisionReason::ResourceOwnershipDenied,
                            checks,
                        ));
                    }
                }
                checks.push(ValidationCheck::passed("resource_ownership"));
            }
        }

        Ok(AuthorizationResult::granted(checks))
    }

    /// Resolve the effective permission set for the context: the role's
    /// registry grants plus the membership's explicit extras, read through the
    /// TTL cache when enabled.
    fn effective_permissions(
        &self,
        ctx: &TenantContext,
        extra: &[Permission],
    ) -> HashSet<String> {
        let key: CacheKey = (ctx.user_id, ctx.tenant_id, ctx.role);

        if self.config.cache_permissions {
            let cache = self.cache.read().unwrap();
            if let Some(entry) = cache.get(&key) {
                if entry.inserted_at.elapsed() <= self.config.cache_ttl {
                    return entry.permissions.clone();
                }
            }
        }

        let mut permissions: HashSet<String> = self
            .registry
            .permissions_for(ctx.role)
            .iter()
            .map(|p| (*p).to_string())
            .collect();
        for p in extra {
            // Extras outside the vocabulary are ignored, not granted.
            if self.registry.is_known(p.as_str()) {
                permissions.insert(p.as_str().to_string());
            }
        }

        if self.config.cache_permissions {
            let mut cache = self.cache.write().unwrap();
            if cache.len() >= self.config.cache_capacity && !cache.contains_key(&key) {
                if let Some(oldest) = cache
                    .iter()
                    .min_by_key(|(_, e)| e.inserted_at)
                    .map(|(k, _)| *k)
                {
                    cache.remove(&oldest);
                }
            }
            cache.insert(
                key,
                CacheEntry {
                    permissions: permissions.clone(),
                    inserted_at: Instant::now(),
                },
            );
        }

        permissions
    }

    fn emit_audit(&self, request: &AuthorizationRequest, result: &AuthorizationResult) {
        let Some(audit) = &self.audit else { return };
        let ctx = &request.context;

        let mut details = Details::new();
        details.insert("role".to_string(), ctx.role.as_str().into());
        if let Some(resource) = &request.resource {
            details.insert("resource_kind".to_string(), resource.kind.as_str().into());
            details.insert("resource_id".to_string(), resource.id.as_str().into());
        }

        if result.authorized {
            audit.permission_granted(
                ctx.tenant_id,
                ctx.user_id,
                ctx.user_id,
                &ctx.request_id,
                request.permission.as_str(),
                details,
            );
        } else if result.reason == DecisionReason::RoleMismatch {
            // An asserted role above the membership role is an escalation
            // attempt, not an ordinary denial.
            audit.privilege_escalation(
                ctx.tenant_id,
                ctx.user_id,
                ctx.user_id,
                &ctx.request_id,
                result.reason.as_str(),
                details,
            );
        } else {
            audit.permission_denied(
                ctx.tenant_id,
                ctx.user_id,
                ctx.user_id,
                &ctx.request_id,
                request.permission.as_str(),
                result.reason.as_str(),
                details,
            );
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
