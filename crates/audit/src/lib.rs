//! `ledgergate-audit`: tamper-evident RBAC audit pipeline.
//!
//! Every authorization decision in the platform flows through this crate as a
//! typed [`AuditEvent`]: sanitized, severity-scored by a fixed classification
//! table, stamped with a deterministic integrity hash, and buffered toward an
//! append-only [`AuditSink`].
//!
//! Delivery is at-least-once: a failed flush requeues the batch at the front
//! of the bounded buffer. Events are lost only if a sink outage outlasts the
//! buffer capacity or the process crashes mid-buffer, both acknowledged
//! limitations. High and critical events are additionally mirrored to the
//! process log synchronously at record time, so operators never depend on the
//! flush cadence for the signals that matter.

pub mod event;
pub mod logger;
pub mod metrics;
pub mod sanitize;
pub mod sink;

pub use event::{AuditEvent, AuditEventKind, Severity};
pub use logger::{AuditLoggerConfig, Details, RbacAuditLogger};
pub use metrics::{AuditMetrics, RiskLevel, SecuritySummary};
pub use sink::{AuditSink, InMemoryAuditSink, SinkError};
