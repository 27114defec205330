//! Lifecycle error model.

use thiserror::Error;

/// Result type used across the lifecycle layer.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Lifecycle-level error.
///
/// Keep this focused on deterministic lifecycle failures (setup preconditions,
/// lookup misses, strict-destroy escalation). Storage concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// The record type is misconfigured (e.g. missing deletion-marker column).
    /// Raised at setup time; the type must not be used.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// A strict destroy was requested but the soft-destroy chain aborted.
    #[error("record was not destroyed")]
    NotDestroyed,

    /// No discarded record matched the requested identifier.
    #[error("no discarded record matches: {0}")]
    NotFound(String),
}

impl LifecycleError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }
}
