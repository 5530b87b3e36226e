//! `ledgergate-authz`: fail-closed, tenant-aware authorization.
//!
//! The decision chain, outermost first:
//!
//! 1. [`ResourceScopedPermissionValidator`]: probing detection and
//!    resource-existence/tenant-ownership checks ahead of the engine;
//! 2. [`AuthorizationEngine`]: the central `authorize()` decision over the
//!    static [`PermissionRegistry`] and the abstract tenant/membership store;
//! 3. [`ServiceAuthorizationGuard`]: the call-site adapter for privileged
//!    service methods.
//!
//! Every internal failure anywhere in the chain is a denial; this crate never
//! fails open. Reason codes stay fully detailed in logs and audit records and
//! are collapsed by [`sanitize`] before they cross the trust boundary.

pub mod context;
pub mod engine;
pub mod guard;
pub mod permission;
pub mod registry;
pub mod request;
pub mod role;
pub mod sanitize;
pub mod store;
pub mod validator;

pub use context::TenantContext;
pub use engine::{AuthorizationEngine, EngineConfig};
pub use guard::{GuardDecision, GuardError, ServiceAuthorizationGuard};
pub use permission::Permission;
pub use registry::PermissionRegistry;
pub use request::{
    AuthorizationRequest, AuthorizationResult, DecisionReason, ResourceRef, ValidationCheck,
};
pub use role::Role;
pub use sanitize::{public_code, sanitize_reason, ACCESS_DENIED};
pub use store::{
    InMemoryDirectory, Membership, ResourceDirectory, ResourceLookup, StoreError, TenantDirectory,
    TenantStatus,
};
pub use validator::{
    ProbingConfig, ResourceCheck, ResourceCheckOutcome, ResourceScopedPermissionValidator,
};
