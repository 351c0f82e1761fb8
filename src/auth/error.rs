use thiserror::Error;

use crate::error::ClientError;

/// Errors raised by credential storage and token inspection.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Not logged in")]
    NotLoggedIn,
    #[error("No refresh token stored")]
    MissingRefreshToken,
    #[error("Malformed token: {0}")]
    MalformedToken(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<std::io::Error> for AuthError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(error: serde_json::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::de::Error> for AuthError {
    fn from(error: toml::de::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<toml::ser::Error> for AuthError {
    fn from(error: toml::ser::Error) -> Self {
        Self::Serialization(error.to_string())
    }
}

impl From<base64::DecodeError> for AuthError {
    fn from(error: base64::DecodeError) -> Self {
        Self::MalformedToken(error.to_string())
    }
}

impl From<AuthError> for ClientError {
    fn from(error: AuthError) -> Self {
        match error {
            AuthError::NotLoggedIn | AuthError::MissingRefreshToken => {
                ClientError::SessionExpired(error.to_string())
            }
            AuthError::MalformedToken(_) => ClientError::Authentication(error.to_string()),
            AuthError::Io(_) | AuthError::Serialization(_) => {
                ClientError::Storage(error.to_string())
            }
        }
    }
}
