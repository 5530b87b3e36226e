//! Static role→permission mapping and permission-name validation.
//!
//! All registry data is `'static` and compiled in: there is no I/O and no
//! interior mutability, so the registry can be shared freely and consulted on
//! every decision without caching concerns of its own.

use crate::role::Role;

// ─────────────────────────────────────────────────────────────────────────────
// Permission vocabulary
// ─────────────────────────────────────────────────────────────────────────────

pub const ACCOUNTING_READ: &str = "accounting:read";
pub const ACCOUNTING_WRITE: &str = "accounting:write";
pub const ACCOUNTING_DELETE: &str = "accounting:delete";
pub const INVOICES_READ: &str = "invoices:read";
pub const INVOICES_WRITE: &str = "invoices:write";
pub const INVOICES_DELETE: &str = "invoices:delete";
pub const CUSTOMERS_READ: &str = "customers:read";
pub const CUSTOMERS_WRITE: &str = "customers:write";
pub const REPORTS_READ: &str = "reports:read";
pub const REPORTS_EXPORT: &str = "reports:export";
pub const ATTACHMENTS_READ: &str = "attachments:read";
pub const ATTACHMENTS_WRITE: &str = "attachments:write";
pub const API_TOKENS_READ: &str = "api_tokens:read";
pub const API_TOKENS_WRITE: &str = "api_tokens:write";
pub const ADMIN_MEMBERS_READ: &str = "admin:members:read";
pub const ADMIN_MEMBERS_WRITE: &str = "admin:members:write";
pub const ADMIN_AUDIT_READ: &str = "admin:audit:read";

/// Every permission the platform knows about. The single source of truth for
/// permission-name validation.
const ALL_PERMISSIONS: &[&str] = &[
    ACCOUNTING_READ,
    ACCOUNTING_WRITE,
    ACCOUNTING_DELETE,
    INVOICES_READ,
    INVOICES_WRITE,
    INVOICES_DELETE,
    CUSTOMERS_READ,
    CUSTOMERS_WRITE,
    REPORTS_READ,
    REPORTS_EXPORT,
    ATTACHMENTS_READ,
    ATTACHMENTS_WRITE,
    API_TOKENS_READ,
    API_TOKENS_WRITE,
    ADMIN_MEMBERS_READ,
    ADMIN_MEMBERS_WRITE,
    ADMIN_AUDIT_READ,
];

// ─────────────────────────────────────────────────────────────────────────────
// Role grants
// ─────────────────────────────────────────────────────────────────────────────

const VIEWER_GRANTS: &[&str] = &[ACCOUNTING_READ, INVOICES_READ, CUSTOMERS_READ, REPORTS_READ];

const MEMBER_GRANTS: &[&str] = &[
    ACCOUNTING_READ,
    INVOICES_READ,
    INVOICES_WRITE,
    CUSTOMERS_READ,
    CUSTOMERS_WRITE,
    REPORTS_READ,
    ATTACHMENTS_READ,
    ATTACHMENTS_WRITE,
];

const MANAGER_GRANTS: &[&str] = &[
    ACCOUNTING_READ,
    ACCOUNTING_WRITE,
    INVOICES_READ,
    INVOICES_WRITE,
    INVOICES_DELETE,
    CUSTOMERS_READ,
    CUSTOMERS_WRITE,
    REPORTS_READ,
    REPORTS_EXPORT,
    ATTACHMENTS_READ,
    ATTACHMENTS_WRITE,
    API_TOKENS_READ,
];

const ADMIN_GRANTS: &[&str] = &[
    ACCOUNTING_READ,
    ACCOUNTING_WRITE,
    ACCOUNTING_DELETE,
    INVOICES_READ,
    INVOICES_WRITE,
    INVOICES_DELETE,
    CUSTOMERS_READ,
    CUSTOMERS_WRITE,
    REPORTS_READ,
    REPORTS_EXPORT,
    ATTACHMENTS_READ,
    ATTACHMENTS_WRITE,
    API_TOKENS_READ,
    API_TOKENS_WRITE,
    ADMIN_MEMBERS_READ,
    ADMIN_MEMBERS_WRITE,
    ADMIN_AUDIT_READ,
];

/// Registry of the platform's roles and permissions.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermissionRegistry;

impl PermissionRegistry {
    pub fn new() -> Self {
        Self
    }

    /// Permissions granted by a role. Owners hold the full vocabulary.
    pub fn permissions_for(&self, role: Role) -> &'static [&'static str] {
        match role {
            Role::Viewer => VIEWER_GRANTS,
            Role::Member => MEMBER_GRANTS,
            Role::Manager => MANAGER_GRANTS,
            Role::Admin => ADMIN_GRANTS,
            Role::Owner => ALL_PERMISSIONS,
        }
    }

    /// Whether a permission name belongs to the closed vocabulary.
    pub fn is_known(&self, permission: &str) -> bool {
        ALL_PERMISSIONS.contains(&permission)
    }

    /// Whether a permission sits in the admin namespace or is destructive
    /// enough to override resource ownership.
    pub fn is_admin_grade(&self, permission: &str) -> bool {
        permission.starts_with("admin:") || permission.ends_with(":delete")
    }

    /// The full vocabulary, for diagnostics and operator listings.
    pub fn all_permissions(&self) -> &'static [&'static str] {
        ALL_PERMISSIONS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_permission_is_rejected() {
        let registry = PermissionRegistry::new();
        assert!(registry.is_known("accounting:delete"));
        assert!(!registry.is_known("accounting:explode"));
        assert!(!registry.is_known(""));
    }

    #[test]
    fn grants_widen_up_the_hierarchy() {
        let registry = PermissionRegistry::new();
        let viewer = registry.permissions_for(Role::Viewer);
        let owner = registry.permissions_for(Role::Owner);
        for p in viewer {
            assert!(owner.contains(p), "owner missing viewer grant {p}");
        }
        assert!(viewer.len() < owner.len());
    }

    #[test]
    fn viewer_cannot_delete_accounting_records() {
        let registry = PermissionRegistry::new();
        assert!(!registry.permissions_for(Role::Viewer).contains(&ACCOUNTING_DELETE));
        assert!(registry.permissions_for(Role::Admin).contains(&ACCOUNTING_DELETE));
    }

    #[test]
    fn every_role_grant_is_in_the_vocabulary() {
        let registry = PermissionRegistry::new();
        for role in [Role::Viewer, Role::Member, Role::Manager, Role::Admin, Role::Owner] {
            for p in registry.permissions_for(role) {
                assert!(registry.is_known(p), "{role} grants unknown permission {p}");
            }
        }
    }
}
