//! Buffered audit logger with a background flush worker.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{error, warn};
use uuid::Uuid;

use ledgergate_core::{RequestId, TenantId, UserId};

use crate::event::{classify, integrity_hash, AuditEvent, AuditEventKind, Severity};
use crate::metrics::{AuditMetrics, MetricsState, SecuritySummary};
use crate::sanitize::sanitize_details;
use crate::sink::AuditSink;

/// Free-form event context. Sanitized before buffering.
pub type Details = serde_json::Map<String, serde_json::Value>;

/// Buffering and flush cadence configuration.
#[derive(Debug, Clone)]
pub struct AuditLoggerConfig {
    /// Maximum buffered events; reaching it triggers a flush, and sustained
    /// sink outage beyond it drops oldest events.
    pub buffer_capacity: usize,
    /// Timer-driven flush interval.
    pub flush_interval: Duration,
}

impl Default for AuditLoggerConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            flush_interval: Duration::from_secs(60),
        }
    }
}

enum WorkerMsg {
    Flush,
    Shutdown,
}

struct Shared {
    config: AuditLoggerConfig,
    sink: Arc<dyn AuditSink>,
    buffer: Mutex<VecDeque<AuditEvent>>,
    metrics: Mutex<MetricsState>,
}

impl Shared {
    /// Drain the buffer and append to the sink. On failure the whole batch is
    /// requeued at the front, preserving order; anything beyond capacity is
    /// dropped oldest-first.
    fn flush(&self) {
        let batch: Vec<AuditEvent> = {
            let mut buffer = self.buffer.lock().unwrap();
            if buffer.is_empty() {
                return;
            }
            buffer.drain(..).collect()
        };

        match self.sink.append(&batch) {
            Ok(()) => {
                self.metrics.lock().unwrap().flushed_events += batch.len() as u64;
            }
            Err(err) => {
                warn!(error = %err, batch = batch.len(), "audit flush failed; requeueing batch");
                let mut buffer = self.buffer.lock().unwrap();
                for event in batch.into_iter().rev() {
                    buffer.push_front(event);
                }
                let mut metrics = self.metrics.lock().unwrap();
                metrics.failed_flushes += 1;
                while buffer.len() > self.config.buffer_capacity {
                    buffer.pop_front();
                    metrics.dropped_events += 1;
                }
            }
        }
    }
}

struct FlushWorker {
    tx: mpsc::Sender<WorkerMsg>,
    join: Option<thread::JoinHandle<()>>,
}

/// Sanitized, severity-scored audit event sink with buffering and metrics.
///
/// Construct explicitly and hold in the application's service graph (no
/// hidden globals); call [`shutdown`](Self::shutdown) during teardown to stop
/// the flush thread and drain the buffer.
pub struct RbacAuditLogger {
    shared: Arc<Shared>,
    worker: Mutex<Option<FlushWorker>>,
}

impl RbacAuditLogger {
    /// Create a logger with a background flush thread.
    pub fn new(sink: Arc<dyn AuditSink>, config: AuditLoggerConfig) -> Self {
        let shared = Arc::new(Shared {
            config,
            sink,
            buffer: Mutex::new(VecDeque::new()),
            metrics: Mutex::new(MetricsState::default()),
        });

        let (tx, rx) = mpsc::channel();
        let worker_shared = Arc::clone(&shared);
        let join = thread::Builder::new()
            .name("audit-flush".to_string())
            .spawn(move || flush_loop(&worker_shared, &rx))
            .expect("failed to spawn audit flush thread");

        Self {
            shared,
            worker: Mutex::new(Some(FlushWorker {
                tx,
                join: Some(join),
            })),
        }
    }

    /// Create a logger without a background thread; flushing only happens via
    /// [`flush`](Self::flush). Intended for tests.
    pub fn with_manual_flush(sink: Arc<dyn AuditSink>, config: AuditLoggerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                config,
                sink,
                buffer: Mutex::new(VecDeque::new()),
                metrics: Mutex::new(MetricsState::default()),
            }),
            worker: Mutex::new(None),
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Typed event constructors
    // ─────────────────────────────────────────────────────────────────────

    pub fn permission_denied(
        &self,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        permission: &str,
        reason: &str,
        details: Details,
    ) {
        self.record(self.build(
            AuditEventKind::PermissionDenied,
            tenant_id,
            subject_id,
            actor_id,
            request_id,
            Some(permission),
            Some(reason),
            details,
        ));
    }

    pub fn permission_granted(
        &self,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        permission: &str,
        details: Details,
    ) {
        self.record(self.build(
            AuditEventKind::PermissionGranted,
            tenant_id,
            subject_id,
            actor_id,
            request_id,
            Some(permission),
            None,
            details,
        ));
    }

    pub fn privilege_escalation(
        &self,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        reason: &str,
        details: Details,
    ) {
        self.record(self.build(
            AuditEventKind::PrivilegeEscalation,
            tenant_id,
            subject_id,
            actor_id,
            request_id,
            None,
            Some(reason),
            details,
        ));
    }

    pub fn suspicious_access(
        &self,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        reason: &str,
        details: Details,
    ) {
        self.record(self.build(
            AuditEventKind::SuspiciousAccess,
            tenant_id,
            subject_id,
            actor_id,
            request_id,
            None,
            Some(reason),
            details,
        ));
    }

    pub fn role_change(
        &self,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        old_role: &str,
        new_role: &str,
    ) {
        let mut details = Details::new();
        details.insert("old_role".to_string(), old_role.into());
        details.insert("new_role".to_string(), new_role.into());
        self.record(self.build(
            AuditEventKind::RoleChange,
            tenant_id,
            subject_id,
            actor_id,
            request_id,
            None,
            Some(new_role),
            details,
        ));
    }

    // ─────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────

    #[allow(clippy::too_many_arguments)]
    fn build(
        &self,
        kind: AuditEventKind,
        tenant_id: TenantId,
        subject_id: UserId,
        actor_id: UserId,
        request_id: &RequestId,
        permission: Option<&str>,
        reason: Option<&str>,
        details: Details,
    ) -> AuditEvent {
        AuditEvent {
            id: Uuid::now_v7(),
            kind,
            severity: classify(kind, reason, permission),
            tenant_id,
            subject_id,
            actor_id,
            request_id: request_id.clone(),
            permission: permission.map(str::to_string),
            reason: reason.map(str::to_string),
            details: sanitize_details(details),
            occurred_at: Utc::now(),
            integrity_hash: integrity_hash(kind, &tenant_id, &subject_id, &actor_id, request_id),
        }
    }

    fn record(&self, event: AuditEvent) {
        // High/critical events bypass the flush cadence via the process log.
        match event.severity {
            Severity::Critical => error!(
                kind = event.kind.as_str(),
                severity = event.severity.as_str(),
                tenant_id = %event.tenant_id,
                subject_id = %event.subject_id,
                request_id = %event.request_id,
                reason = event.reason.as_deref().unwrap_or("-"),
                "audit event"
            ),
            Severity::High => warn!(
                kind = event.kind.as_str(),
                severity = event.severity.as_str(),
                tenant_id = %event.tenant_id,
                subject_id = %event.subject_id,
                request_id = %event.request_id,
                reason = event.reason.as_deref().unwrap_or("-"),
                "audit event"
            ),
            Severity::Low | Severity::Medium => {}
        }

        self.shared.metrics.lock().unwrap().record(&event);

        let at_capacity = {
            let mut buffer = self.shared.buffer.lock().unwrap();
            buffer.push_back(event);
            buffer.len() >= self.shared.config.buffer_capacity
        };

        if at_capacity {
            // Nudge the worker; if it is gone, flush on this thread instead.
            let worker = self.worker.lock().unwrap();
            match worker.as_ref() {
                Some(w) => {
                    let _ = w.tx.send(WorkerMsg::Flush);
                }
                None => self.shared.flush(),
            }
        }
    }

    /// Flush the buffer to the sink immediately (best-effort).
    pub fn flush(&self) {
        self.shared.flush();
    }

    /// Current buffered (not yet flushed) event count.
    pub fn buffered(&self) -> usize {
        self.shared.buffer.lock().unwrap().len()
    }

    pub fn metrics(&self) -> AuditMetrics {
        self.shared.metrics.lock().unwrap().snapshot()
    }

    pub fn security_summary(&self) -> SecuritySummary {
        self.shared.metrics.lock().unwrap().security_summary()
    }

    /// Stop the flush thread and drain the buffer. Idempotent.
    pub fn shutdown(&self) {
        let worker = self.worker.lock().unwrap().take();
        if let Some(mut w) = worker {
            let _ = w.tx.send(WorkerMsg::Shutdown);
            if let Some(join) = w.join.take() {
                let _ = join.join();
            }
        }
        self.shared.flush();
    }
}

impl Drop for RbacAuditLogger {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn flush_loop(shared: &Arc<Shared>, rx: &mpsc::Receiver<WorkerMsg>) {
    let tick = Duration::from_millis(250);
    let mut last_flush = Instant::now();

    loop {
        match rx.recv_timeout(tick) {
            Ok(WorkerMsg::Flush) => {
                shared.flush();
                last_flush = Instant::now();
            }
            Ok(WorkerMsg::Shutdown) => {
                shared.flush();
                break;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if last_flush.elapsed() >= shared.config.flush_interval {
                    shared.flush();
                    last_flush = Instant::now();
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                shared.flush();
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::InMemoryAuditSink;
    use proptest::prelude::*;

    fn logger_with_sink(capacity: usize) -> (RbacAuditLogger, Arc<InMemoryAuditSink>) {
        let sink = Arc::new(InMemoryAuditSink::new());
        let logger = RbacAuditLogger::with_manual_flush(
            Arc::clone(&sink) as Arc<dyn AuditSink>,
            AuditLoggerConfig {
                buffer_capacity: capacity,
                flush_interval: Duration::from_secs(60),
            },
        );
        (logger, sink)
    }

    fn ids() -> (TenantId, UserId, RequestId) {
        (TenantId::new(), UserId::new(), RequestId::from_upstream("req-1"))
    }

    #[test]
    fn events_buffer_until_flush() {
        let (logger, sink) = logger_with_sink(100);
        let (tenant, user, request) = ids();

        logger.permission_denied(
            tenant,
            user,
            user,
            &request,
            "accounting:delete",
            "PERMISSION_DENIED",
            Details::new(),
        );
        assert_eq!(logger.buffered(), 1);
        assert!(sink.is_empty());

        logger.flush();
        assert_eq!(logger.buffered(), 0);
        assert_eq!(sink.len(), 1);

        let event = &sink.events()[0];
        assert_eq!(event.kind, AuditEventKind::PermissionDenied);
        assert_eq!(event.severity, Severity::High);
        assert!(event.verify_integrity());
    }

    #[test]
    fn capacity_triggers_flush() {
        let (logger, sink) = logger_with_sink(3);
        let (tenant, user, request) = ids();

        for _ in 0..3 {
            logger.permission_granted(
                tenant,
                user,
                user,
                &request,
                "invoices:read",
                Details::new(),
            );
        }
        // Third record hit capacity and flushed inline (no worker in tests).
        assert_eq!(sink.len(), 3);
        assert_eq!(logger.buffered(), 0);
    }

    #[test]
    fn failed_flush_requeues_at_front() {
        let (logger, sink) = logger_with_sink(100);
        let (tenant, user, request) = ids();

        logger.permission_granted(tenant, user, user, &request, "invoices:read", Details::new());
        logger.permission_denied(
            tenant,
            user,
            user,
            &request,
            "invoices:write",
            "PERMISSION_DENIED",
            Details::new(),
        );

        sink.fail_next_appends(1);
        logger.flush();
        assert_eq!(sink.len(), 0);
        assert_eq!(logger.buffered(), 2);
        assert_eq!(logger.metrics().failed_flushes, 1);

        logger.flush();
        let events = sink.events();
        assert_eq!(events.len(), 2);
        // Original order preserved across the requeue.
        assert_eq!(events[0].kind, AuditEventKind::PermissionGranted);
        assert_eq!(events[1].kind, AuditEventKind::PermissionDenied);
    }

    #[test]
    fn sustained_outage_drops_oldest() {
        let (logger, sink) = logger_with_sink(2);
        let (tenant, user, request) = ids();
        sink.fail_next_appends(10);

        for i in 0..4 {
            logger.permission_denied(
                tenant,
                user,
                user,
                &request,
                &format!("module{i}:read"),
                "PERMISSION_DENIED",
                Details::new(),
            );
        }

        assert!(logger.buffered() <= 2);
        assert!(logger.metrics().dropped_events >= 1);
    }

    #[test]
    fn role_change_carries_old_and_new_role() {
        let (logger, sink) = logger_with_sink(100);
        let (tenant, user, request) = ids();

        logger.role_change(tenant, user, user, &request, "viewer", "manager");
        logger.flush();

        let event = &sink.events()[0];
        assert_eq!(event.kind, AuditEventKind::RoleChange);
        assert_eq!(event.details["old_role"], serde_json::json!("viewer"));
        assert_eq!(event.details["new_role"], serde_json::json!("manager"));
    }

    #[test]
    fn details_are_sanitized_before_buffering() {
        let (logger, sink) = logger_with_sink(100);
        let (tenant, user, request) = ids();

        let mut details = Details::new();
        details.insert("session_token".to_string(), serde_json::json!("tok_secret"));
        details.insert("resource_id".to_string(), serde_json::json!("inv-20240817-0042"));
        logger.suspicious_access(tenant, user, user, &request, "PROBING_DETECTED", details);
        logger.flush();

        let event = &sink.events()[0];
        assert_eq!(event.severity, Severity::Critical);
        assert_eq!(event.details["session_token"], serde_json::json!("[REDACTED]"));
        assert_eq!(event.details["resource_id"], serde_json::json!("inv-...0042"));
    }

    proptest! {
        #[test]
        fn integrity_hash_is_deterministic_per_request_id(req in "[a-z0-9-]{1,32}") {
            let tenant = TenantId::new();
            let user = UserId::new();
            let request = RequestId::from_upstream(req);

            let a = crate::event::integrity_hash(
                AuditEventKind::PermissionDenied, &tenant, &user, &user, &request,
            );
            let b = crate::event::integrity_hash(
                AuditEventKind::PermissionDenied, &tenant, &user, &user, &request,
            );
            prop_assert_eq!(a, b);
        }
    }
}
