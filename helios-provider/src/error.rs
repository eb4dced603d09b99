use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all remote resource operations.
///
/// Each variant carries the URL that produced it plus variant-specific
/// context. All variants are serializable for structured error reporting.
///
/// # Retryable Errors
///
/// The following variants represent transient failures that may succeed on retry:
/// - [`NetworkError`](Self::NetworkError) — connection failures and gateway errors (HTTP 502-504)
/// - [`Timeout`](Self::Timeout) — request timed out
///
/// Nothing retries automatically unless the client was configured with
/// `max_retries > 0`.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "code")]
pub enum ResourceError {
    /// A network-level error occurred (connection refused, gateway error, etc.).
    #[error("Network error on {url}: {detail}")]
    NetworkError {
        /// Request URL.
        url: String,
        /// Error details.
        detail: String,
    },

    /// The HTTP request timed out.
    #[error("Request to {url} timed out: {detail}")]
    Timeout {
        /// Request URL.
        url: String,
        /// Error details.
        detail: String,
    },

    /// The resource does not exist (HTTP 404).
    #[error("Resource not found: {url}")]
    NotFound {
        /// Request URL.
        url: String,
    },

    /// The server refused the request (HTTP 4xx other than 404).
    #[error("Request to {url} rejected (HTTP {status}): {message}")]
    Rejected {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body, usually a human readable reason.
        message: String,
    },

    /// The server failed to handle the request (HTTP 5xx).
    ///
    /// The catalog server reports validation failures ("Ids don't match",
    /// "No album with that id") this way, so the message is kept verbatim.
    #[error("Server error on {url} (HTTP {status}): {message}")]
    ServerError {
        /// Request URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body.
        message: String,
    },

    /// Failed to parse the server's response.
    #[error("Failed to parse response from {url}: {detail}")]
    ParseError {
        /// Request URL.
        url: String,
        /// Details about the parse failure.
        detail: String,
    },

    /// A member operation was requested on a record that was never saved.
    #[error("Record has no identity, cannot {operation}")]
    UnsavedRecord {
        /// The refused operation (`fetch`, `update`, ...).
        operation: String,
    },
}

impl ResourceError {
    /// Whether this is expected behavior (user input, missing resource, ...), used for log levels.
    ///
    /// Use `warn` when this returns `true` and `error` otherwise.
    /// **Update this method whenever a variant is added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. }
                | Self::Rejected { .. }
                | Self::ServerError { .. }
                | Self::UnsavedRecord { .. }
        )
    }

    /// Whether the failure is transient and the request may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError { .. } | Self::Timeout { .. })
    }
}

/// Convenience type alias for `Result<T, ResourceError>`.
pub type Result<T> = std::result::Result<T, ResourceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_network_error() {
        let e = ResourceError::NetworkError {
            url: "/api/album".to_string(),
            detail: "connection refused".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Network error on /api/album: connection refused"
        );
    }

    #[test]
    fn display_server_error_keeps_message() {
        let e = ResourceError::ServerError {
            url: "/api/album/3".to_string(),
            status: 500,
            message: "Ids don't match".to_string(),
        };
        assert_eq!(
            e.to_string(),
            "Server error on /api/album/3 (HTTP 500): Ids don't match"
        );
    }

    #[test]
    fn display_unsaved_record() {
        let e = ResourceError::UnsavedRecord {
            operation: "fetch".to_string(),
        };
        assert_eq!(e.to_string(), "Record has no identity, cannot fetch");
    }

    #[test]
    fn serialize_carries_code_tag() {
        let e = ResourceError::Rejected {
            url: "/api/photograph".to_string(),
            status: 400,
            message: "bad".to_string(),
        };
        let json = serde_json::to_string(&e).unwrap();
        assert!(json.contains("\"code\":\"Rejected\""));
        assert!(json.contains("\"status\":400"));
    }

    #[test]
    fn deserialize_restores_variant() {
        let original = ResourceError::Timeout {
            url: "/api/album".to_string(),
            detail: "30s elapsed".to_string(),
        };
        let json = serde_json::to_string(&original).unwrap();
        let back: ResourceError = serde_json::from_str(&json).unwrap();
        assert_eq!(back.to_string(), original.to_string());
    }

    #[test]
    fn expected_and_retryable_are_disjoint() {
        let variants = vec![
            ResourceError::NetworkError {
                url: "u".into(),
                detail: "d".into(),
            },
            ResourceError::Timeout {
                url: "u".into(),
                detail: "d".into(),
            },
            ResourceError::NotFound { url: "u".into() },
            ResourceError::Rejected {
                url: "u".into(),
                status: 400,
                message: "m".into(),
            },
            ResourceError::ServerError {
                url: "u".into(),
                status: 500,
                message: "m".into(),
            },
            ResourceError::ParseError {
                url: "u".into(),
                detail: "d".into(),
            },
            ResourceError::UnsavedRecord {
                operation: "fetch".into(),
            },
        ];

        for v in &variants {
            assert!(
                !(v.is_expected() && v.is_retryable()),
                "{v} is both expected and retryable"
            );
        }
        assert!(variants[0].is_retryable());
        assert!(variants[1].is_retryable());
        assert!(!variants[5].is_retryable());
        assert!(!variants[5].is_expected());
    }
}
