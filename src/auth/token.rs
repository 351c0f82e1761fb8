use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::AuthError;

/// The access/refresh credential pair held by a [`TokenStore`](super::TokenStore).
///
/// An absent access token means the user is unauthenticated, whatever the
/// refresh token says.
///
/// # Example
/// ```
/// use aichat::auth::Credentials;
///
/// let creds = Credentials::new("access", "refresh");
/// assert!(creds.is_authenticated());
/// assert!(!Credentials::default().is_authenticated());
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: Some(access_token.into()),
            refresh_token: Some(refresh_token.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Decode the access token's JWT payload without verifying its signature.
    ///
    /// Diagnostic only: the server remains the authority on validity.
    pub fn access_claims(&self) -> Result<AccessClaims, AuthError> {
        let token = self.access_token.as_deref().ok_or(AuthError::NotLoggedIn)?;
        AccessClaims::decode(token)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &self.access_token.as_deref().map(redact))
            .field("refresh_token", &self.refresh_token.as_deref().map(redact))
            .finish()
    }
}

/// Claims read from an access token payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub user_id: Option<serde_json::Value>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl AccessClaims {
    pub fn decode(token: &str) -> Result<Self, AuthError> {
        let payload = token
            .split('.')
            .nth(1)
            .ok_or_else(|| AuthError::MalformedToken("expected three dot-separated parts".into()))?;
        let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
        serde_json::from_slice(&bytes).map_err(|e| AuthError::MalformedToken(e.to_string()))
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp.and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    /// Tokens without an `exp` claim never report as expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|exp| exp <= now)
    }
}

/// First few characters of a secret, for logs.
///
/// Shows at most a quarter of the secret and never more than 8 characters.
pub(crate) fn redact(secret: &str) -> String {
    let shown = (secret.chars().count() / 4).min(8);
    let prefix: String = secret.chars().take(shown).collect();
    format!("{prefix}...")
}
