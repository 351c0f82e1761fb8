//! Error types for the chat client.

use thiserror::Error;

/// Primary error type for all client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A 401 that survived its single refresh attempt.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Refresh failed or was impossible; stored credentials have been cleared.
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Credential storage error: {0}")]
    Storage(String),

    #[error("No route matches {0}")]
    RouteNotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Coarse classification of a [`ClientError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No response was received.
    Network,
    /// The server rejected the credentials.
    Authentication,
    /// Recovery failed; the user must log in again.
    SessionExpired,
    /// 4xx application error with a structured body.
    Api,
    /// 5xx server error.
    Server,
    /// Timeout or explicit cancellation.
    Cancelled,
    Configuration,
    Serialization,
    Storage,
    Navigation,
    Unknown,
}

impl ClientError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Unauthorized(_) => Some(401),
            Self::Network(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network(_) => ErrorCategory::Network,
            Self::Unauthorized(_) | Self::Authentication(_) => ErrorCategory::Authentication,
            Self::SessionExpired(_) => ErrorCategory::SessionExpired,
            Self::Api { status, .. } => match status {
                401 | 403 => ErrorCategory::Authentication,
                500..=599 => ErrorCategory::Server,
                _ => ErrorCategory::Api,
            },
            Self::Timeout(_) | Self::Cancelled => ErrorCategory::Cancelled,
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::Serialization(_) => ErrorCategory::Serialization,
            Self::Io(_) | Self::Storage(_) => ErrorCategory::Storage,
            Self::RouteNotFound(_) => ErrorCategory::Navigation,
            Self::Stream(_) | Self::InvalidArgument(_) => ErrorCategory::Unknown,
        }
    }

    /// Whether the caller has to send the user back through login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthorized(_) | Self::SessionExpired(_))
    }

    /// Normalized, human-readable message suitable for a notification.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } => message.clone(),
            Self::Unauthorized(message) => message.clone(),
            Self::SessionExpired(_) => "Session expired, please log in again".to_string(),
            Self::Timeout(ms) if *ms < 1000 => format!("Request timed out after {ms}ms"),
            Self::Timeout(ms) => format!("Request timed out after {}s", ms.div_ceil(1000)),
            other => other.to_string(),
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_errors_split_by_status_class() {
        assert_eq!(ClientError::api(404, "missing").category(), ErrorCategory::Api);
        assert_eq!(ClientError::api(502, "bad gateway").category(), ErrorCategory::Server);
        assert_eq!(
            ClientError::api(403, "forbidden").category(),
            ErrorCategory::Authentication
        );
    }

    #[test]
    fn only_terminal_auth_failures_require_login() {
        assert!(ClientError::SessionExpired("refresh rejected".into()).requires_login());
        assert!(ClientError::Unauthorized("token invalid".into()).requires_login());
        assert!(!ClientError::api(400, "bad").requires_login());
        assert!(!ClientError::Timeout(30_000).requires_login());
    }

    #[test]
    fn user_message_prefers_server_text() {
        assert_eq!(ClientError::api(400, "title too long").user_message(), "title too long");
        assert_eq!(
            ClientError::Timeout(300_000).user_message(),
            "Request timed out after 300s"
        );
    }

    #[test]
    fn timeout_message_never_rounds_to_zero() {
        assert_eq!(
            ClientError::Timeout(250).user_message(),
            "Request timed out after 250ms"
        );
        assert_eq!(
            ClientError::Timeout(1_500).user_message(),
            "Request timed out after 2s"
        );
    }
}
