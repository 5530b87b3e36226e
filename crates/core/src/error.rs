//! Shared error model for the authorization core.

use thiserror::Error;

/// Result type used across the core crates.
pub type CoreResult<T> = Result<T, CoreError>;

/// Deterministic, domain-level failures.
///
/// Infrastructure failures (store outages, sink write errors) are modeled by
/// the crates that own those seams; this enum stays small on purpose.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// A value failed validation (e.g. malformed input).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// An unknown resource kind name was supplied.
    #[error("unknown resource kind: {0}")]
    UnknownResourceKind(String),
}

impl CoreError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
