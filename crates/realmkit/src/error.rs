//! Error types for admin API operations.
//!
//! Errors are categorized so callers can tell "the resource is simply not
//! there" (often tolerable) apart from genuine remote failures (fatal).
//! Nothing in this crate retries.

use std::fmt;
use thiserror::Error;

/// Categories of admin API errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Resource does not exist (possibly already deleted)
    NotFound,
    /// Name clash or state conflict on the platform
    Conflict,
    /// Credentials missing, expired or insufficient
    Auth,
    /// Any other failure talking to the platform
    Remote,
}

impl ErrorCategory {
    /// Whether the caller may treat this as absence rather than failure.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// Get a user-friendly description of this error category.
    pub fn description(&self) -> &'static str {
        match self {
            Self::NotFound => "Resource not found",
            Self::Conflict => "Conflicting resource",
            Self::Auth => "Not authorized",
            Self::Remote => "Remote operation failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    pub fn advice(&self) -> &'static str {
        match self {
            Self::NotFound => "Check the realm name and that the resource was not removed concurrently",
            Self::Conflict => "Another resource already uses this name; rename or remove it",
            Self::Auth => "Issue a fresh admin token with realm-management rights",
            Self::Remote => "Check the server URL and server logs, then re-run",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Errors that can occur talking to the admin API.
#[derive(Debug, Error)]
pub enum Error {
    /// The addressed resource does not exist
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Resource kind, e.g. "flow", "execution"
        kind: &'static str,
        /// Identifier or alias that was looked up
        id: String,
    },

    /// The platform refused because of a clash
    #[error("conflict: {message}")]
    Conflict {
        /// What clashed
        message: String,
    },

    /// Authentication or authorization failure
    #[error("not authorized (HTTP {status})")]
    Unauthorized {
        /// 401 or 403
        status: u16,
    },

    /// The platform answered with an error status
    #[error("request rejected: {message}")]
    Rejected {
        /// Error message
        message: String,
        /// HTTP status code if available
        status: Option<u16>,
    },

    /// Transport-level failure (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// Response could not be understood
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Get the error category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::NotFound { .. } => ErrorCategory::NotFound,
            Error::Conflict { .. } => ErrorCategory::Conflict,
            Error::Unauthorized { .. } => ErrorCategory::Auth,
            Error::Rejected { .. } | Error::Transport(_) | Error::InvalidResponse(_) => {
                ErrorCategory::Remote
            }
        }
    }

    /// Whether this error just means "the resource is not there".
    pub fn is_not_found(&self) -> bool {
        self.category().is_absence()
    }

    /// Map an HTTP status to an error for the resource being addressed.
    pub fn from_status(status: u16, kind: &'static str, id: &str) -> Self {
        match status {
            404 => Self::not_found(kind, id),
            409 => Self::Conflict {
                message: format!("{kind} {id}"),
            },
            401 | 403 => Self::Unauthorized { status },
            _ => Self::Rejected {
                message: format!("HTTP {status} for {kind} {id}"),
                status: Some(status),
            },
        }
    }
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Self::Rejected {
                message: format!("HTTP {code}"),
                status: Some(code),
            },
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}

/// Result type for admin API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(Error::from_status(404, "flow", "x").is_not_found());
        assert_eq!(
            Error::from_status(409, "flow", "x").category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            Error::from_status(403, "flow", "x").category(),
            ErrorCategory::Auth
        );
        assert_eq!(
            Error::from_status(500, "flow", "x").category(),
            ErrorCategory::Remote
        );
    }

    #[test]
    fn test_only_not_found_is_absence() {
        assert!(ErrorCategory::NotFound.is_absence());
        assert!(!ErrorCategory::Remote.is_absence());
        assert!(!ErrorCategory::Conflict.is_absence());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::not_found("execution", "abc");
        assert_eq!(err.to_string(), "execution not found: abc");
    }
}
