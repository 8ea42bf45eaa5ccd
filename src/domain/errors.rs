//! Domain errors for the agent dispatcher.

use thiserror::Error;

use super::models::RunStatus;

/// Errors raised by an [`AgentRuntime`](super::ports::AgentRuntime) implementation
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// Connection, DNS or TLS failure
    #[error("Network error: {0}")]
    Network(String),

    /// Request or run exceeded its time limit
    #[error("Timed out: {0}")]
    Timeout(String),

    /// HTTP 429
    #[error("Rate limit exceeded - too many requests")]
    RateLimited,

    /// HTTP 5xx
    #[error("Server error ({0}): {1}")]
    Server(u16, String),

    /// HTTP 401
    #[error("Authentication failed")]
    Unauthorized,

    /// HTTP 403
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// HTTP 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// HTTP 400 and other non-retryable 4xx
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(String),

    /// Run reached a terminal state other than `completed`
    #[error("Run ended with status {status}: {}", .detail.as_deref().unwrap_or("no details"))]
    RunFailed {
        status: RunStatus,
        detail: Option<String>,
    },

    /// Run completed without an assistant message
    #[error("Run completed without an assistant reply")]
    EmptyReply,

    /// Could not obtain an access token
    #[error("Credential error: {0}")]
    Credential(String),
}

impl RuntimeError {
    /// Returns true if this error is transient and should be retried
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(_)
                | Self::RateLimited
                | Self::Server(_, _)
                | Self::RunFailed { .. }
        )
    }

    /// Classifies an HTTP status code with its response body
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            400 => Self::InvalidRequest(body),
            401 => Self::Unauthorized,
            403 => Self::Forbidden(body),
            404 => Self::NotFound(body),
            408 => Self::Timeout(body),
            429 => Self::RateLimited,
            500..=599 => Self::Server(status, body),
            _ => Self::InvalidRequest(format!("HTTP {status}: {body}")),
        }
    }
}

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Empty or oversized message; rejected before any remote call
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Thread or run creation failed after retries
    #[error("Remote agent runtime unavailable: {0}")]
    RemoteUnavailable(String),

    /// No session with this id is tracked
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Agent ids or credentials absent
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

pub type DomainResult<T> = Result<T, DomainError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(RuntimeError::RateLimited.is_transient());
        assert!(RuntimeError::Server(503, "busy".to_string()).is_transient());
        assert!(RuntimeError::Timeout("run".to_string()).is_transient());
        assert!(RuntimeError::Network("reset".to_string()).is_transient());
        assert!(RuntimeError::RunFailed {
            status: RunStatus::Failed,
            detail: None
        }
        .is_transient());
    }

    #[test]
    fn test_permanent_errors() {
        assert!(!RuntimeError::Unauthorized.is_transient());
        assert!(!RuntimeError::NotFound("asst_x".to_string()).is_transient());
        assert!(!RuntimeError::InvalidRequest("bad".to_string()).is_transient());
        assert!(!RuntimeError::EmptyReply.is_transient());
        assert!(!RuntimeError::Decode("eof".to_string()).is_transient());
    }

    #[test]
    fn test_from_status() {
        assert_eq!(
            RuntimeError::from_status(400, "bad".to_string()),
            RuntimeError::InvalidRequest("bad".to_string())
        );
        assert_eq!(
            RuntimeError::from_status(401, String::new()),
            RuntimeError::Unauthorized
        );
        assert_eq!(
            RuntimeError::from_status(429, String::new()),
            RuntimeError::RateLimited
        );
        assert!(RuntimeError::from_status(502, String::new()).is_transient());
        assert!(RuntimeError::from_status(408, String::new()).is_transient());
        assert!(!RuntimeError::from_status(409, String::new()).is_transient());
    }

    #[test]
    fn test_run_failed_message() {
        let err = RuntimeError::RunFailed {
            status: RunStatus::Expired,
            detail: None,
        };
        assert_eq!(err.to_string(), "Run ended with status expired: no details");
    }
}
