use std::time::Duration;

use thiserror::Error;

/// Classified upstream failure surfaced to callers of
/// [`RateLimitedGateway::fetch`](crate::gateway::RateLimitedGateway::fetch).
///
/// No variant is retried internally; the boundary layer decides how to
/// present each kind to the user.
#[derive(Error, Debug, Clone)]
pub enum UpstreamError {
    /// Upstream rejected the credential in use (401/403).
    #[error("upstream rejected the credential (status {status})")]
    Auth { status: u16 },

    /// Upstream signalled a rate limit (429). The retry hint comes from
    /// the `Retry-After` header when the upstream provided one.
    #[error("upstream rate limited")]
    RateLimited { retry_after: Option<Duration> },

    /// Upstream responded not-found, distinct from a generic failure so
    /// callers can render "not found" rather than an error page.
    #[error("resource not found")]
    NotFound,

    /// Any other non-success status (5xx, unexpected 4xx).
    #[error("upstream error (status {status}): {message}")]
    Status { status: u16, message: String },

    /// Network failure or malformed response body.
    #[error("transport error: {0}")]
    Transport(String),
}

impl UpstreamError {
    /// Map an HTTP status to the error taxonomy.
    pub fn from_status(status: u16, message: String, retry_after: Option<Duration>) -> Self {
        match status {
            401 | 403 => UpstreamError::Auth { status },
            404 => UpstreamError::NotFound,
            429 => UpstreamError::RateLimited { retry_after },
            _ => UpstreamError::Status { status, message },
        }
    }
}

pub type Result<T> = std::result::Result<T, UpstreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_statuses() {
        assert!(matches!(
            UpstreamError::from_status(401, String::new(), None),
            UpstreamError::Auth { status: 401 }
        ));
        assert!(matches!(
            UpstreamError::from_status(403, String::new(), None),
            UpstreamError::Auth { status: 403 }
        ));
        assert!(matches!(
            UpstreamError::from_status(404, String::new(), None),
            UpstreamError::NotFound
        ));
        let limited = UpstreamError::from_status(429, String::new(), Some(Duration::from_secs(5)));
        match limited {
            UpstreamError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(5)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
        assert!(matches!(
            UpstreamError::from_status(503, "overloaded".into(), None),
            UpstreamError::Status { status: 503, .. }
        ));
    }
}
