//! Resource-scoped permission validation with probing detection.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, Utc};
use tracing::warn;

use ledgergate_audit::{Details, RbacAuditLogger};
use ledgergate_core::{ResourceId, ResourceKind, TenantId, UserId};

use crate::context::TenantContext;
use crate::engine::AuthorizationEngine;
use crate::permission::Permission;
use crate::request::{AuthorizationRequest, DecisionReason, ResourceRef};
use crate::sanitize::{public_message, ACCESS_DENIED};
use crate::store::ResourceDirectory;

/// Probing-detection window configuration.
#[derive(Debug, Clone)]
pub struct ProbingConfig {
    /// Attempts tolerated inside the window; the attempt after this is denied.
    pub threshold: u32,
    pub window: Duration,
}

impl Default for ProbingConfig {
    fn default() -> Self {
        Self {
            threshold: 10,
            window: Duration::minutes(5),
        }
    }
}

/// Input to a resource-scoped check.
#[derive(Debug, Clone)]
pub struct ResourceCheck {
    pub context: TenantContext,
    pub permission: Permission,
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
}

/// Outcome of a resource-scoped check.
///
/// `resource_exists` / `belongs_to_tenant` are internal diagnostics;
/// `sanitized_error` is the only text safe to surface to the caller, and it is
/// identical for missing, cross-tenant, and not-owned resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceCheckOutcome {
    pub authorized: bool,
    pub reason: DecisionReason,
    pub resource_exists: bool,
    pub belongs_to_tenant: bool,
    pub sanitized_error: Option<&'static str>,
}

impl ResourceCheckOutcome {
    fn denied(reason: DecisionReason, resource_exists: bool, belongs_to_tenant: bool) -> Self {
        Self {
            authorized: false,
            reason,
            resource_exists,
            belongs_to_tenant,
            sanitized_error: Some(match reason {
                DecisionReason::AuthorizationError => public_message(reason),
                _ => ACCESS_DENIED,
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ProbeWindow {
    attempts: u32,
    window_started: DateTime<Utc>,
    last_attempt: DateTime<Utc>,
}

type ProbeKey = (TenantId, UserId, ResourceKind);

/// Adds probing detection and resource-existence/tenant-ownership checks
/// ahead of [`AuthorizationEngine`].
pub struct ResourceScopedPermissionValidator {
    engine: Arc<AuthorizationEngine>,
    resources: Arc<dyn ResourceDirectory>,
    audit: Option<Arc<RbacAuditLogger>>,
    probes: RwLock<HashMap<ProbeKey, ProbeWindow>>,
    config: ProbingConfig,
}

impl ResourceScopedPermissionValidator {
    pub fn new(
        engine: Arc<AuthorizationEngine>,
        resources: Arc<dyn ResourceDirectory>,
        audit: Option<Arc<RbacAuditLogger>>,
        config: ProbingConfig,
    ) -> Self {
        Self {
            engine,
            resources,
            audit,
            probes: RwLock::new(HashMap::new()),
            config,
        }
    }

    /// Run the full resource-scoped chain: probing guard, existence and
    /// tenant-ownership verification, then the underlying permission decision.
    pub async fn validate_resource_permission(
        &self,
        check: &ResourceCheck,
    ) -> ResourceCheckOutcome {
        let now = Utc::now();

        // (a) Probing guard. The counter advances on every resource-scoped
        // check, so a probe burst is denied even when each individual check
        // would have been authorized.
        if self.note_attempt(check, now) {
            warn!(
                tenant_id = %check.context.tenant_id,
                user_id = %check.context.user_id,
                resource_kind = check.kind.as_str(),
                "resource probing threshold exceeded"
            );
            if let Some(audit) = &self.audit {
                let mut details = Details::new();
                details.insert("resource_kind".to_string(), check.kind.as_str().into());
                details.insert("resource_id".to_string(), check.resource_id.as_str().into());
                details.insert(
                    "threshold".to_string(),
                    serde_json::Value::from(self.config.threshold),
                );
                audit.suspicious_access(
                    check.context.tenant_id,
                    check.context.user_id,
                    check.context.user_id,
                    &check.context.request_id,
                    DecisionReason::ProbingDetected.as_str(),
                    details,
                );
            }
            return ResourceCheckOutcome::denied(DecisionReason::ProbingDetected, false, false);
        }

        // (b) Existence + tenant ownership, before the permission decision.
        let lookup = match self
            .resources
            .lookup(check.kind, &check.resource_id, check.context.tenant_id)
            .await
        {
            Ok(lookup) => lookup,
            Err(err) => {
                warn!(error = %err, "resource lookup failed; denying");
                return ResourceCheckOutcome::denied(
                    DecisionReason::AuthorizationError,
                    false,
                    false,
                );
            }
        };

        let exists_somewhere = lookup.actual_tenant_id.is_some();
        if !lookup.exists_in_tenant {
            let reason = if exists_somewhere {
                DecisionReason::ResourceTenantMismatch
            } else {
                DecisionReason::ResourceNotFound
            };
            return ResourceCheckOutcome::denied(reason, exists_somewhere, false);
        }

        // Delegate the actual permission decision, resource attached so the
        // engine applies its ownership rules.
        let request = AuthorizationRequest::new(check.context.clone(), check.permission.clone())
            .with_resource(ResourceRef {
                kind: check.kind,
                id: check.resource_id.clone(),
                owner_id: lookup.owner_id,
                tenant_id: Some(check.context.tenant_id),
            });
        let result = self.engine.authorize(&request).await;

        if result.authorized {
            ResourceCheckOutcome {
                authorized: true,
                reason: DecisionReason::Granted,
                resource_exists: true,
                belongs_to_tenant: true,
                sanitized_error: None,
            }
        } else {
            ResourceCheckOutcome::denied(result.reason, true, true)
        }
    }

    /// Advance the sliding counter; returns `true` when the threshold is
    /// exceeded. Idle windows reset on next contact.
    fn note_attempt(&self, check: &ResourceCheck, now: DateTime<Utc>) -> bool {
        let key: ProbeKey = (check.context.tenant_id, check.context.user_id, check.kind);
        let mut probes = self.probes.write().unwrap();
        let window = probes.entry(key).or_insert(ProbeWindow {
            attempts: 0,
            window_started: now,
            last_attempt: now,
        });

        if now - window.last_attempt > self.config.window {
            window.attempts = 0;
            window.window_started = now;
        }
        window.attempts += 1;
        window.last_attempt = now;
        window.attempts > self.config.threshold
    }

    /// Drop idle probe windows (housekeeping; safe to call at any cadence).
    pub fn purge_idle_probes(&self) {
        let now = Utc::now();
        self.probes
            .write()
            .unwrap()
            .retain(|_, w| now - w.last_attempt <= self.config.window);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
