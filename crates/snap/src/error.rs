//! Error types for the snap crate.

use thiserror::Error;

/// Result type for snap operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while driving snapd.
#[derive(Error, Debug)]
pub enum Error {
    /// The snap command could not be run or exited unsuccessfully.
    #[error("snap {operation} failed: {reason}")]
    CommandFailed {
        operation: String,
        reason: String,
        is_not_found: bool,
    },

    /// Output of a snap command could not be understood.
    #[error("failed to parse snap output: {reason}")]
    ParseError { reason: String },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Create a command failed error.
    pub fn command_failed(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            operation: operation.into(),
            reason: reason.into(),
            is_not_found: false,
        }
    }

    /// Create a parse error.
    pub fn parse_error(reason: impl Into<String>) -> Self {
        Self::ParseError {
            reason: reason.into(),
        }
    }

    /// Name of the failed operation.
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            Self::CommandFailed { operation, .. } => operation,
            Self::ParseError { .. } => "parse",
            Self::Io(_) => "io",
        }
    }
}

impl From<Error> for asciinema_reconciler::Error {
    fn from(err: Error) -> Self {
        match &err {
            Error::CommandFailed {
                operation, reason, ..
            } => Self::apply_failed(format!("snap {operation}"), reason.clone()),
            Error::ParseError { .. } | Error::Io(_) => {
                Self::apply_failed(format!("snap {}", err.operation()), err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use asciinema_reconciler::ErrorKind;

    use super::*;

    #[test]
    fn test_converts_to_apply_failure() {
        let err: asciinema_reconciler::Error =
            Error::command_failed("restart", "error: unknown service").into();
        assert_eq!(err.kind(), ErrorKind::ApplyFailure);
        assert_eq!(err.to_string(), "snap restart failed: error: unknown service");
    }
}
