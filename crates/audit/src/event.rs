//! Audit event model, severity classification, and integrity hashing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use ledgergate_core::{RequestId, TenantId, UserId};

/// What happened.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    PermissionDenied,
    PermissionGranted,
    PrivilegeEscalation,
    SuspiciousAccess,
    RoleChange,
}

impl AuditEventKind {
    /// Stable wire name. Also the first field of the integrity-hash tuple, so
    /// renaming a variant here is a breaking change for stored hashes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PermissionDenied => "PERMISSION_DENIED",
            Self::PermissionGranted => "PERMISSION_GRANTED",
            Self::PrivilegeEscalation => "PRIVILEGE_ESCALATION",
            Self::SuspiciousAccess => "SUSPICIOUS_ACCESS",
            Self::RoleChange => "ROLE_CHANGE",
        }
    }
}

/// How bad it is. Ordered: `Low < Medium < High < Critical`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

/// A single, fully-formed audit record.
///
/// Construct via the typed constructors on
/// [`RbacAuditLogger`](crate::RbacAuditLogger); severity and the integrity
/// hash are never caller-supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub kind: AuditEventKind,
    pub severity: Severity,
    pub tenant_id: TenantId,
    /// The user the event is about (e.g. the target of a role change).
    pub subject_id: UserId,
    /// The user who performed the action. Often equal to `subject_id`.
    pub actor_id: UserId,
    pub request_id: RequestId,
    pub permission: Option<String>,
    pub reason: Option<String>,
    /// Free-form context, already sanitized (secrets redacted, ids masked).
    pub details: serde_json::Map<String, serde_json::Value>,
    pub occurred_at: DateTime<Utc>,
    /// Hex SHA-256 over the identifying tuple; see [`integrity_hash`].
    pub integrity_hash: String,
}

impl AuditEvent {
    /// Recompute the integrity hash and compare against the stored one.
    pub fn verify_integrity(&self) -> bool {
        self.integrity_hash
            == integrity_hash(
                self.kind,
                &self.tenant_id,
                &self.subject_id,
                &self.actor_id,
                &self.request_id,
            )
    }
}

/// Deterministic hash over an event's identifying fields.
///
/// The tuple is (kind, tenant, subject, actor, request), joined with an ASCII
/// unit separator so field boundaries cannot collide. Two events built from
/// identical fields always hash identically; changing any one field changes
/// the hash.
pub fn integrity_hash(
    kind: AuditEventKind,
    tenant_id: &TenantId,
    subject_id: &UserId,
    actor_id: &UserId,
    request_id: &RequestId,
) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_str().as_bytes());
    hasher.update([0x1f]);
    hasher.update(tenant_id.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(subject_id.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(actor_id.to_string().as_bytes());
    hasher.update([0x1f]);
    hasher.update(request_id.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

// ─────────────────────────────────────────────────────────────────────────────
// Severity classification
// ─────────────────────────────────────────────────────────────────────────────

/// Permissions whose denial (or grant via role change) is worth a louder
/// signal: destructive verbs and anything under the admin namespace.
pub(crate) fn is_sensitive_permission(permission: &str) -> bool {
    permission.starts_with("admin:")
        || permission.ends_with(":delete")
        || permission.ends_with(":export")
}

/// Fixed (kind × reason × permission-sensitivity) classification table.
///
/// Callers never pick severity; this function is the single source of truth.
pub(crate) fn classify(
    kind: AuditEventKind,
    reason: Option<&str>,
    permission: Option<&str>,
) -> Severity {
    let sensitive = permission.is_some_and(is_sensitive_permission);
    match kind {
        AuditEventKind::PrivilegeEscalation => Severity::Critical,
        AuditEventKind::SuspiciousAccess => {
            if reason.is_some_and(|r| r.contains("PROBING")) {
                Severity::Critical
            } else {
                Severity::High
            }
        }
        AuditEventKind::PermissionDenied => {
            if sensitive {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        AuditEventKind::RoleChange => {
            if sensitive || reason.is_some_and(|r| r.contains("admin")) {
                Severity::High
            } else {
                Severity::Medium
            }
        }
        AuditEventKind::PermissionGranted => Severity::Low,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids() -> (TenantId, UserId, UserId, RequestId) {
        (
            TenantId::new(),
            UserId::new(),
            UserId::new(),
            RequestId::from_upstream("req-1"),
        )
    }

    #[test]
    fn identical_fields_hash_identically() {
        let (t, s, a, r) = ids();
        let h1 = integrity_hash(AuditEventKind::PermissionDenied, &t, &s, &a, &r);
        let h2 = integrity_hash(AuditEventKind::PermissionDenied, &t, &s, &a, &r);
        assert_eq!(h1, h2);
    }

    #[test]
    fn changing_any_field_changes_hash() {
        let (t, s, a, r) = ids();
        let base = integrity_hash(AuditEventKind::PermissionDenied, &t, &s, &a, &r);

        assert_ne!(
            base,
            integrity_hash(AuditEventKind::PermissionGranted, &t, &s, &a, &r)
        );
        assert_ne!(
            base,
            integrity_hash(AuditEventKind::PermissionDenied, &TenantId::new(), &s, &a, &r)
        );
        assert_ne!(
            base,
            integrity_hash(AuditEventKind::PermissionDenied, &t, &UserId::new(), &a, &r)
        );
        assert_ne!(
            base,
            integrity_hash(AuditEventKind::PermissionDenied, &t, &s, &UserId::new(), &r)
        );
        assert_ne!(
            base,
            integrity_hash(
                AuditEventKind::PermissionDenied,
                &t,
                &s,
                &a,
                &RequestId::from_upstream("req-2")
            )
        );
    }

    #[test]
    fn privilege_escalation_is_always_critical() {
        assert_eq!(
            classify(AuditEventKind::PrivilegeEscalation, None, None),
            Severity::Critical
        );
    }

    #[test]
    fn denial_severity_tracks_permission_sensitivity() {
        assert_eq!(
            classify(
                AuditEventKind::PermissionDenied,
                Some("PERMISSION_DENIED"),
                Some("accounting:read")
            ),
            Severity::Medium
        );
        assert_eq!(
            classify(
                AuditEventKind::PermissionDenied,
                Some("PERMISSION_DENIED"),
                Some("accounting:delete")
            ),
            Severity::High
        );
        assert_eq!(
            classify(
                AuditEventKind::PermissionDenied,
                Some("PERMISSION_DENIED"),
                Some("admin:members:write")
            ),
            Severity::High
        );
    }

    #[test]
    fn probing_suspicious_access_is_critical() {
        assert_eq!(
            classify(AuditEventKind::SuspiciousAccess, Some("PROBING_DETECTED"), None),
            Severity::Critical
        );
        assert_eq!(
            classify(AuditEventKind::SuspiciousAccess, Some("odd traffic"), None),
            Severity::High
        );
    }
}
