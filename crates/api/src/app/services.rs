//! Service wiring: directory, audit pipeline, authorization engine, abuse
//! protection.

use std::sync::Arc;

use ledgergate_abuse::{AbuseConfig, AbuseProtectionEngine, TokenBucketLimiter};
use ledgergate_audit::{AuditLoggerConfig, InMemoryAuditSink, RbacAuditLogger};
use ledgergate_authz::validator::ProbingConfig;
use ledgergate_authz::{
    AuthorizationEngine, EngineConfig, InMemoryDirectory, PermissionRegistry,
    ResourceScopedPermissionValidator,
};

use crate::middleware::AuthLayerState;

/// Everything the HTTP layer needs, plus the backing handles tests seed.
pub struct AppServices {
    pub directory: Arc<InMemoryDirectory>,
    pub sink: Arc<InMemoryAuditSink>,
    pub auth: AuthLayerState,
}

/// Wire the full stack against the in-memory directory.
///
/// A deployment with real backing stores swaps the directory for its own
/// [`TenantDirectory`]/[`ResourceDirectory`] implementations and the sink for
/// a durable one; everything downstream is trait-typed.
pub fn build_services() -> AppServices {
    let directory = Arc::new(InMemoryDirectory::new());
    let sink = Arc::new(InMemoryAuditSink::new());

    let audit = Arc::new(RbacAuditLogger::new(
        sink.clone(),
        AuditLoggerConfig::default(),
    ));

    let engine = Arc::new(AuthorizationEngine::new(
        PermissionRegistry::new(),
        directory.clone(),
        directory.clone(),
        Some(audit.clone()),
        EngineConfig::default(),
    ));

    let validator = Arc::new(ResourceScopedPermissionValidator::new(
        engine.clone(),
        directory.clone(),
        Some(audit.clone()),
        ProbingConfig::default(),
    ));

    let abuse = Arc::new(AbuseProtectionEngine::new(
        AbuseConfig::default(),
        Arc::new(TokenBucketLimiter::new()),
        Some(audit.clone()),
    ));

    AppServices {
        directory,
        sink,
        auth: AuthLayerState {
            engine,
            validator,
            audit,
            abuse,
        },
    }
}
