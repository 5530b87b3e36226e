//! Abstract tenant/membership and resource-existence stores.
//!
//! The relational store itself is out of scope; the engine only speaks these
//! two traits. Resource lookups dispatch on the closed
//! [`ResourceKind`] set to dedicated per-kind tables; no user-influenced
//! string is ever interpolated into query text.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use ledgergate_core::{ResourceId, ResourceKind, TenantId, UserId};

use crate::permission::Permission;
use crate::role::Role;

/// Store-layer failure. Always mapped to a denial by the engine.
#[derive(Debug, Error, Clone)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("query failed: {0}")]
    Query(String),
}

/// Tenant lifecycle state relevant to authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantStatus {
    pub active: bool,
}

/// A user's membership record within a tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub role: Role,
    pub active: bool,
    /// Per-user grants beyond the role's registry set.
    pub extra_permissions: Vec<Permission>,
}

/// Result of a tenant-scoped resource-existence query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLookup {
    /// The resource exists within the queried tenant.
    pub exists_in_tenant: bool,
    pub owner_id: Option<UserId>,
    /// The tenant the resource actually lives in, when it exists anywhere.
    /// Internal only; denial responses never reveal it.
    pub actual_tenant_id: Option<TenantId>,
}

impl ResourceLookup {
    pub fn missing() -> Self {
        Self {
            exists_in_tenant: false,
            owner_id: None,
            actual_tenant_id: None,
        }
    }
}

/// Tenant and membership lookups.
#[async_trait]
pub trait TenantDirectory: Send + Sync {
    async fn tenant_status(&self, tenant_id: TenantId) -> Result<Option<TenantStatus>, StoreError>;

    async fn membership(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError>;
}

/// Tenant-scoped resource-existence queries over the closed kind set.
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn lookup(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        tenant_id: TenantId,
    ) -> Result<ResourceLookup, StoreError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory implementation (tests/dev)
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct StoredResource {
    tenant_id: TenantId,
    owner_id: Option<UserId>,
}

/// In-memory directory for tests and local development.
///
/// One table per resource kind, selected by an exhaustive match, the same
/// shape a SQL-backed implementation takes with one prepared statement per
/// kind.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tenants: RwLock<HashMap<TenantId, TenantStatus>>,
    memberships: RwLock<HashMap<(TenantId, UserId), Membership>>,
    invoices: RwLock<HashMap<ResourceId, StoredResource>>,
    ledger_accounts: RwLock<HashMap<ResourceId, StoredResource>>,
    customers: RwLock<HashMap<ResourceId, StoredResource>>,
    reports: RwLock<HashMap<ResourceId, StoredResource>>,
    api_tokens: RwLock<HashMap<ResourceId, StoredResource>>,
    attachments: RwLock<HashMap<ResourceId, StoredResource>>,
    member_profiles: RwLock<HashMap<ResourceId, StoredResource>>,
    /// When set, every lookup fails (for fail-closed testing).
    outage: RwLock<bool>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_tenant(&self, tenant_id: TenantId, active: bool) {
        self.tenants
            .write()
            .unwrap()
            .insert(tenant_id, TenantStatus { active });
    }

    pub fn add_membership(&self, tenant_id: TenantId, user_id: UserId, membership: Membership) {
        self.memberships
            .write()
            .unwrap()
            .insert((tenant_id, user_id), membership);
    }

    pub fn add_resource(
        &self,
        kind: ResourceKind,
        id: ResourceId,
        tenant_id: TenantId,
        owner_id: Option<UserId>,
    ) {
        self.table(kind)
            .write()
            .unwrap()
            .insert(id, StoredResource { tenant_id, owner_id });
    }

    /// Simulate a store outage; subsequent lookups return `StoreError`.
    pub fn set_outage(&self, outage: bool) {
        *self.outage.write().unwrap() = outage;
    }

    fn table(&self, kind: ResourceKind) -> &RwLock<HashMap<ResourceId, StoredResource>> {
        match kind {
            ResourceKind::Invoice => &self.invoices,
            ResourceKind::LedgerAccount => &self.ledger_accounts,
            ResourceKind::Customer => &self.customers,
            ResourceKind::Report => &self.reports,
            ResourceKind::ApiToken => &self.api_tokens,
            ResourceKind::Attachment => &self.attachments,
            ResourceKind::MemberProfile => &self.member_profiles,
        }
    }

    fn check_outage(&self) -> Result<(), StoreError> {
        if *self.outage.read().unwrap() {
            return Err(StoreError::Unavailable("simulated outage".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl TenantDirectory for InMemoryDirectory {
    async fn tenant_status(&self, tenant_id: TenantId) -> Result<Option<TenantStatus>, StoreError> {
        self.check_outage()?;
        Ok(self.tenants.read().unwrap().get(&tenant_id).cloned())
    }

    async fn membership(
        &self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Membership>, StoreError> {
        self.check_outage()?;
        Ok(self
            .memberships
            .read()
            .unwrap()
            .get(&(tenant_id, user_id))
            .cloned())
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryDirectory {
    async fn lookup(
        &self,
        kind: ResourceKind,
        id: &ResourceId,
        tenant_id: TenantId,
    ) -> Result<ResourceLookup, StoreError> {
        self.check_outage()?;
        let table = self.table(kind).read().unwrap();
        Ok(match table.get(id) {
            Some(stored) => ResourceLookup {
                exists_in_tenant: stored.tenant_id == tenant_id,
                owner_id: stored.owner_id,
                actual_tenant_id: Some(stored.tenant_id),
            },
            None => ResourceLookup::missing(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lookup_is_tenant_scoped() {
        let dir = InMemoryDirectory::new();
        let t1 = TenantId::new();
        let t2 = TenantId::new();
        let id = ResourceId::parse("inv-123").unwrap();
        dir.add_resource(ResourceKind::Invoice, id.clone(), t2, None);

        let from_t1 = dir.lookup(ResourceKind::Invoice, &id, t1).await.unwrap();
        assert!(!from_t1.exists_in_tenant);
        assert_eq!(from_t1.actual_tenant_id, Some(t2));

        let from_t2 = dir.lookup(ResourceKind::Invoice, &id, t2).await.unwrap();
        assert!(from_t2.exists_in_tenant);
    }

    #[tokio::test]
    async fn kinds_do_not_share_tables() {
        let dir = InMemoryDirectory::new();
        let tenant = TenantId::new();
        let id = ResourceId::parse("r-1").unwrap();
        dir.add_resource(ResourceKind::Invoice, id.clone(), tenant, None);

        let as_report = dir.lookup(ResourceKind::Report, &id, tenant).await.unwrap();
        assert!(!as_report.exists_in_tenant);
        assert!(as_report.actual_tenant_id.is_none());
    }

    #[tokio::test]
    async fn outage_surfaces_as_store_error() {
        let dir = InMemoryDirectory::new();
        dir.set_outage(true);
        let err = dir.tenant_status(TenantId::new()).await;
        assert!(err.is_err());
    }
}
