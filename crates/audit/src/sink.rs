//! Append-only audit sink abstraction.

use std::sync::{Mutex, RwLock};

use thiserror::Error;

use crate::event::AuditEvent;

/// Sink write failure. The pipeline treats every failure as retryable by
/// requeueing the batch; permanently poisoned batches are not distinguished.
#[derive(Debug, Error, Clone)]
pub enum SinkError {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
    #[error("audit sink rejected batch: {0}")]
    Rejected(String),
}

/// Durable, append-only destination for audit batches.
///
/// Implementations must tolerate duplicate deliveries (at-least-once).
pub trait AuditSink: Send + Sync {
    fn append(&self, batch: &[AuditEvent]) -> Result<(), SinkError>;
}

/// In-memory sink for tests and local development.
#[derive(Debug, Default)]
pub struct InMemoryAuditSink {
    events: RwLock<Vec<AuditEvent>>,
    /// When > 0, the next N appends fail (for requeue testing).
    fail_next: Mutex<u32>,
}

impl InMemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make the next `n` append calls fail.
    pub fn fail_next_appends(&self, n: u32) {
        *self.fail_next.lock().unwrap() = n;
    }
}

impl AuditSink for InMemoryAuditSink {
    fn append(&self, batch: &[AuditEvent]) -> Result<(), SinkError> {
        {
            let mut fail = self.fail_next.lock().unwrap();
            if *fail > 0 {
                *fail -= 1;
                return Err(SinkError::Unavailable("simulated outage".to_string()));
            }
        }
        self.events.write().unwrap().extend_from_slice(batch);
        Ok(())
    }
}
