//! Error types for the reconciler crate.

use thiserror::Error;

/// Result type alias for reconciler operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Reconciler error types.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory relation is not established yet.
    ///
    /// This is an expected steady state, not a failure: the reconciler maps it
    /// to a `Blocked` status and stops the pass.
    #[error("relation '{relation}' is not established")]
    PreconditionMissing { relation: String },

    /// A signal is present but has an unexpected shape.
    #[error("malformed {signal} signal: {reason}")]
    MalformedSignal { signal: String, reason: String },

    /// A service-manager operation failed.
    #[error("{operation} failed: {reason}")]
    ApplyFailed { operation: String, reason: String },

    /// A collector could not read its signal.
    #[error("{signal} signal unavailable: {reason}")]
    SignalUnavailable { signal: String, reason: String },

    /// Invalid configuration.
    #[error("invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification of an [`Error`], used for status reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Mandatory relation absent.
    PreconditionMissing,
    /// Present signal with an unexpected shape.
    MalformedSignal,
    /// Service-manager or filesystem step of the apply failed.
    ApplyFailure,
    /// Signal collector failed to read.
    Collector,
    /// Bad configuration.
    Config,
}

impl Error {
    /// Create a precondition missing error.
    pub fn precondition_missing(relation: impl Into<String>) -> Self {
        Self::PreconditionMissing {
            relation: relation.into(),
        }
    }

    /// Create a malformed signal error.
    pub fn malformed_signal(signal: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedSignal {
            signal: signal.into(),
            reason: reason.into(),
        }
    }

    /// Create an apply failed error.
    pub fn apply_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ApplyFailed {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Create a signal unavailable error.
    pub fn signal_unavailable(signal: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SignalUnavailable {
            signal: signal.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid config error.
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::PreconditionMissing { .. } => ErrorKind::PreconditionMissing,
            Self::MalformedSignal { .. } => ErrorKind::MalformedSignal,
            Self::ApplyFailed { .. } | Self::Io(_) => ErrorKind::ApplyFailure,
            Self::SignalUnavailable { .. } | Self::Json(_) => ErrorKind::Collector,
            Self::InvalidConfig { .. } => ErrorKind::Config,
        }
    }
}
