//! Service-layer authorization guard.
//!
//! The canonical call pattern for privileged service methods:
//!
//! ```ignore
//! let invoice = guard
//!     .execute_with_authorization(&ctx, "invoices:write", Some(resource), || async {
//!         invoices.update(&ctx, draft).await
//!     })
//!     .await??;
//! ```

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;

use crate::context::TenantContext;
use crate::engine::AuthorizationEngine;
use crate::permission::Permission;
use crate::request::{AuthorizationRequest, DecisionReason, ResourceRef};
use crate::sanitize::{public_code, public_message};

/// Structured decision for composition inside business services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardDecision {
    pub authorized: bool,
    /// Full internal reason; callers must sanitize before re-surfacing.
    pub reason: DecisionReason,
}

/// Tagged, code-bearing error thrown on denial. The message is already
/// sanitized and safe to show to less-trusted callers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GuardError {
    #[error("{message}")]
    Denied {
        code: &'static str,
        message: &'static str,
    },
    /// Internal failure during the decision; still a denial.
    #[error("authorization failed")]
    Internal,
}

impl GuardError {
    fn from_reason(reason: DecisionReason) -> Self {
        match reason {
            DecisionReason::AuthorizationError => Self::Internal,
            reason => Self::Denied {
                code: public_code(reason),
                message: public_message(reason),
            },
        }
    }
}

/// Call-site adapter translating `authorize()` results into structured
/// decisions or thrown errors for the service layer.
#[derive(Clone)]
pub struct ServiceAuthorizationGuard {
    engine: Arc<AuthorizationEngine>,
}

impl ServiceAuthorizationGuard {
    pub fn new(engine: Arc<AuthorizationEngine>) -> Self {
        Self { engine }
    }

    /// Check a permission and return the structured decision.
    pub async fn require_permission(
        &self,
        context: &TenantContext,
        permission: impl Into<Permission>,
        resource: Option<ResourceRef>,
    ) -> GuardDecision {
        let mut request = AuthorizationRequest::new(context.clone(), permission);
        if let Some(resource) = resource {
            request = request.with_resource(resource);
        }
        let result = self.engine.authorize(&request).await;
        GuardDecision {
            authorized: result.authorized,
            reason: result.reason,
        }
    }

    /// Authorize, then run the operation. Denial never invokes the operation.
    pub async fn execute_with_authorization<T, F, Fut>(
        &self,
        context: &TenantContext,
        permission: impl Into<Permission>,
        resource: Option<ResourceRef>,
        op: F,
    ) -> Result<T, GuardError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let decision = self.require_permission(context, permission, resource).await;
        if !decision.authorized {
            return Err(GuardError::from_reason(decision.reason));
        }
        Ok(op().await)
    }
}
