//! Error types for the gold price service.
//!
//! This module defines custom error types using `thiserror` for precise error handling.

use thiserror::Error;

/// Errors that can occur when fetching a quote from the upstream provider.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Upstream unreachable (DNS, connection refused, TLS, ...)
    #[error("Network error: {0}")]
    Network(String),

    /// Network timeout
    #[error("Request timeout")]
    Timeout,

    /// Upstream returned a non-success status code
    #[error("Upstream error (status {status}): {message}")]
    Upstream { status: u16, message: String },

    /// Response body did not contain a usable price
    #[error("Parse error: {0}")]
    Parse(String),

    /// Response body was not valid JSON
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Coarse failure category, used for logging and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    Network,
    Upstream,
    Parse,
}

impl FetchErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchErrorKind::Network => "network",
            FetchErrorKind::Upstream => "upstream",
            FetchErrorKind::Parse => "parse",
        }
    }
}

impl std::fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FetchError {
    /// Category of this error.
    pub fn kind(&self) -> FetchErrorKind {
        match self {
            FetchError::Network(_) | FetchError::Timeout => FetchErrorKind::Network,
            FetchError::Upstream { .. } => FetchErrorKind::Upstream,
            FetchError::Parse(_) | FetchError::Json(_) => FetchErrorKind::Parse,
        }
    }
}

/// Errors that can occur during configuration loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Required environment variable is missing
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    /// Environment variable has invalid value
    #[error("Invalid value for {var}: {reason}")]
    InvalidValue { var: String, reason: String },
}

/// Convenience type alias for Results with FetchError
pub type FetchResult<T> = Result<T, FetchError>;

/// Convenience type alias for Results with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FetchError::Parse("missing field /price".to_string());
        assert_eq!(err.to_string(), "Parse error: missing field /price");

        let err = ConfigError::MissingVar("PRICE_API_KEY".to_string());
        assert_eq!(
            err.to_string(),
            "Missing required environment variable: PRICE_API_KEY"
        );

        assert_eq!(FetchError::Timeout.to_string(), "Request timeout");
    }

    #[test]
    fn test_upstream_error_display() {
        let err = FetchError::Upstream {
            status: 503,
            message: "Service Unavailable".to_string(),
        };
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("Service Unavailable"));
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            FetchError::Network("refused".into()).kind(),
            FetchErrorKind::Network
        );
        assert_eq!(FetchError::Timeout.kind(), FetchErrorKind::Network);
        assert_eq!(
            FetchError::Upstream {
                status: 500,
                message: String::new()
            }
            .kind(),
            FetchErrorKind::Upstream
        );
        assert_eq!(
            FetchError::Parse("bad".into()).kind(),
            FetchErrorKind::Parse
        );

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(FetchError::from(json_err).kind(), FetchErrorKind::Parse);
        assert_eq!(FetchErrorKind::Upstream.to_string(), "upstream");
    }
}
