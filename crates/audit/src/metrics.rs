//! Running audit metrics and the operator-facing security summary.

use std::collections::HashMap;

use serde::Serialize;

use crate::event::{AuditEvent, AuditEventKind, Severity};

/// Mutable counters, updated on every recorded event. Owned by the logger
/// behind a mutex; snapshots are cheap clones.
#[derive(Debug, Default)]
pub(crate) struct MetricsState {
    total_events: u64,
    by_kind: HashMap<&'static str, u64>,
    by_severity: HashMap<&'static str, u64>,
    by_tenant: HashMap<String, u64>,
    by_user: HashMap<String, u64>,
    by_permission: HashMap<String, u64>,
    /// Denial signatures: `kind|permission|reason` → count.
    violation_signatures: HashMap<String, u64>,
    pub(crate) flushed_events: u64,
    pub(crate) failed_flushes: u64,
    pub(crate) dropped_events: u64,
}

impl MetricsState {
    pub(crate) fn record(&mut self, event: &AuditEvent) {
        self.total_events += 1;
        *self.by_kind.entry(event.kind.as_str()).or_default() += 1;
        *self.by_severity.entry(event.severity.as_str()).or_default() += 1;
        *self.by_tenant.entry(event.tenant_id.to_string()).or_default() += 1;
        *self.by_user.entry(event.subject_id.to_string()).or_default() += 1;
        if let Some(permission) = &event.permission {
            *self.by_permission.entry(permission.clone()).or_default() += 1;
        }
        if event.kind != AuditEventKind::PermissionGranted {
            let signature = format!(
                "{}|{}|{}",
                event.kind.as_str(),
                event.permission.as_deref().unwrap_or("-"),
                event.reason.as_deref().unwrap_or("-"),
            );
            *self.violation_signatures.entry(signature).or_default() += 1;
        }
    }

    fn count_kind(&self, kind: AuditEventKind) -> u64 {
        self.by_kind.get(kind.as_str()).copied().unwrap_or(0)
    }

    fn count_severity(&self, severity: Severity) -> u64 {
        self.by_severity.get(severity.as_str()).copied().unwrap_or(0)
    }

    pub(crate) fn snapshot(&self) -> AuditMetrics {
        let mut top: Vec<(String, u64)> = self
            .violation_signatures
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect();
        top.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top.truncate(10);

        AuditMetrics {
            total_events: self.total_events,
            by_kind: self.by_kind.iter().map(|(k, v)| ((*k).to_string(), *v)).collect(),
            by_severity: self
                .by_severity
                .iter()
                .map(|(k, v)| ((*k).to_string(), *v))
                .collect(),
            by_tenant: self.by_tenant.clone(),
            by_user: self.by_user.clone(),
            by_permission: self.by_permission.clone(),
            top_violations: top
                .into_iter()
                .map(|(signature, count)| ViolationSignature { signature, count })
                .collect(),
            flushed_events: self.flushed_events,
            failed_flushes: self.failed_flushes,
            dropped_events: self.dropped_events,
        }
    }

    pub(crate) fn security_summary(&self) -> SecuritySummary {
        let critical = self.count_severity(Severity::Critical);
        let high = self.count_severity(Severity::High);
        let denials = self.count_kind(AuditEventKind::PermissionDenied);
        let escalations = self.count_kind(AuditEventKind::PrivilegeEscalation);
        let suspicious = self.count_kind(AuditEventKind::SuspiciousAccess);

        let risk_level = if escalations >= 3 || critical >= 5 {
            RiskLevel::Critical
        } else if critical >= 1 || high >= 10 || suspicious >= 5 {
            RiskLevel::High
        } else if denials >= 10 || high >= 1 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        SecuritySummary {
            risk_level,
            permission_denials: denials,
            privilege_escalations: escalations,
            suspicious_access_events: suspicious,
            critical_events: critical,
            high_events: high,
            recommendations: recommendations_for(risk_level),
        }
    }
}

/// Point-in-time counters, serializable for operator dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct AuditMetrics {
    pub total_events: u64,
    pub by_kind: HashMap<String, u64>,
    pub by_severity: HashMap<String, u64>,
    pub by_tenant: HashMap<String, u64>,
    pub by_user: HashMap<String, u64>,
    pub by_permission: HashMap<String, u64>,
    /// Top-10 denial signatures by count.
    pub top_violations: Vec<ViolationSignature>,
    pub flushed_events: u64,
    pub failed_flushes: u64,
    pub dropped_events: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViolationSignature {
    pub signature: String,
    pub count: u64,
}

/// Overall risk posture computed from running counters.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

/// Operator-facing rollup: risk level plus the counters that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct SecuritySummary {
    pub risk_level: RiskLevel,
    pub permission_denials: u64,
    pub privilege_escalations: u64,
    pub suspicious_access_events: u64,
    pub critical_events: u64,
    pub high_events: u64,
    pub recommendations: Vec<&'static str>,
}

fn recommendations_for(level: RiskLevel) -> Vec<&'static str> {
    match level {
        RiskLevel::Low => vec!["No action required; posture nominal."],
        RiskLevel::Medium => vec![
            "Review the top denial signatures for misconfigured roles.",
            "Confirm recently changed role assignments were intended.",
        ],
        RiskLevel::High => vec![
            "Investigate suspicious-access events for the affected tenants.",
            "Consider tightening abuse-protection thresholds for noisy subjects.",
            "Review high-severity denials for sensitive permissions.",
        ],
        RiskLevel::Critical => vec![
            "Privilege escalation activity detected; begin incident response.",
            "Rotate credentials for affected users and audit their sessions.",
            "Export the audit trail for the affected window before it rotates.",
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{integrity_hash, AuditEventKind};
    use ledgergate_core::{RequestId, TenantId, UserId};

    fn event(kind: AuditEventKind, severity: Severity, reason: &str) -> AuditEvent {
        let tenant_id = TenantId::new();
        let subject_id = UserId::new();
        let actor_id = subject_id;
        let request_id = RequestId::from_upstream("req-1");
        AuditEvent {
            id: uuid::Uuid::now_v7(),
            kind,
            severity,
            tenant_id,
            subject_id,
            actor_id,
            request_id: request_id.clone(),
            permission: Some("accounting:read".to_string()),
            reason: Some(reason.to_string()),
            details: serde_json::Map::new(),
            occurred_at: chrono::Utc::now(),
            integrity_hash: integrity_hash(kind, &tenant_id, &subject_id, &actor_id, &request_id),
        }
    }

    #[test]
    fn risk_level_starts_low_and_escalates() {
        let mut state = MetricsState::default();
        assert_eq!(state.security_summary().risk_level, RiskLevel::Low);

        for _ in 0..10 {
            state.record(&event(
                AuditEventKind::PermissionDenied,
                Severity::Medium,
                "PERMISSION_DENIED",
            ));
        }
        assert_eq!(state.security_summary().risk_level, RiskLevel::Medium);

        for _ in 0..3 {
            state.record(&event(
                AuditEventKind::PrivilegeEscalation,
                Severity::Critical,
                "ROLE_MISMATCH",
            ));
        }
        assert_eq!(state.security_summary().risk_level, RiskLevel::Critical);
    }

    #[test]
    fn top_violations_are_capped_at_ten() {
        let mut state = MetricsState::default();
        for i in 0..15 {
            let mut e = event(
                AuditEventKind::PermissionDenied,
                Severity::Medium,
                "PERMISSION_DENIED",
            );
            e.permission = Some(format!("module{i}:read"));
            state.record(&e);
        }
        assert_eq!(state.snapshot().top_violations.len(), 10);
    }

    #[test]
    fn grants_do_not_count_as_violations() {
        let mut state = MetricsState::default();
        state.record(&event(AuditEventKind::PermissionGranted, Severity::Low, "GRANTED"));
        assert!(state.snapshot().top_violations.is_empty());
    }
}
