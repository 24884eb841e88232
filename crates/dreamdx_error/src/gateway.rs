//! Errors raised by the API gateway client.

/// Network failure classes seen by the gateway client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, derive_more::Display)]
pub enum GatewayErrorKind {
    /// Could not establish a connection
    #[display("Connection error: {}", _0)]
    Connection(String),
    /// Request or response exceeded the configured timeout
    #[display("Request timed out: {}", _0)]
    Timeout(String),
    /// 4xx answer from the service
    #[display("Client error: {} - {}", status, message)]
    ClientStatus {
        /// HTTP status code
        status: u16,
        /// `error` field of the body, or the reason phrase
        message: String,
    },
    /// 5xx answer from the service
    #[display("Server error: {} - {}", status, message)]
    ServerStatus {
        /// HTTP status code
        status: u16,
        /// `error` field of the body, or the reason phrase
        message: String,
    },
    /// Body could not be decoded into the expected shape
    #[display("Unexpected response body: {}", _0)]
    Decode(String),
    /// Any other transport failure
    #[display("An unexpected error occurred: {}", _0)]
    Request(String),
}

impl GatewayErrorKind {
    /// Status codes that are retried with backoff.
    pub const RETRY_STATUSES: [u16; 4] = [500, 502, 503, 504];

    /// Whether the failure is transient and the call may be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayErrorKind::Connection(_) | GatewayErrorKind::Timeout(_) => true,
            GatewayErrorKind::ServerStatus { status, .. } => Self::RETRY_STATUSES.contains(status),
            GatewayErrorKind::ClientStatus { .. }
            | GatewayErrorKind::Decode(_)
            | GatewayErrorKind::Request(_) => false,
        }
    }

    /// HTTP status carried by the failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayErrorKind::ClientStatus { status, .. }
            | GatewayErrorKind::ServerStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Gateway error with location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Gateway Error: {} at {}:{}", kind, file, line)]
pub struct GatewayError {
    /// The specific error kind.
    pub kind: GatewayErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// File where error occurred.
    pub file: &'static str,
}

impl GatewayError {
    /// Creates a new error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GatewayErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [500, 502, 503, 504] {
            let kind = GatewayErrorKind::ServerStatus {
                status,
                message: String::new(),
            };
            assert!(kind.is_retryable(), "{status} should retry");
        }
        let not_implemented = GatewayErrorKind::ServerStatus {
            status: 501,
            message: String::new(),
        };
        assert!(!not_implemented.is_retryable());
    }

    #[test]
    fn test_client_errors_fail_fast() {
        let kind = GatewayErrorKind::ClientStatus {
            status: 409,
            message: "exists".to_string(),
        };
        assert!(!kind.is_retryable());
        assert_eq!(kind.status(), Some(409));
    }

    #[test]
    fn test_transport_errors_retry() {
        assert!(GatewayErrorKind::Connection("refused".into()).is_retryable());
        assert!(GatewayErrorKind::Timeout("30s".into()).is_retryable());
        assert!(!GatewayErrorKind::Decode("eof".into()).is_retryable());
    }
}
