//! Account and token payloads.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A backend user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub date_joined: Option<DateTime<Utc>>,
}

/// Body of `POST /auth/login/`.
#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .field("password", &"..")
            .finish()
    }
}

/// Body of `POST /auth/register/`.
#[derive(Clone, Serialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

/// Response of login and registration: the user plus a fresh token pair.
#[derive(Clone, Deserialize)]
pub struct AuthResponse {
    pub user: User,
    pub access: String,
    pub refresh: String,
    #[serde(default)]
    pub message: Option<String>,
}

impl fmt::Debug for AuthResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthResponse")
            .field("user", &self.user)
            .field("message", &self.message)
            .finish_non_exhaustive()
    }
}

/// Body of `POST /auth/token/refresh/` and `POST /auth/logout/`.
#[derive(Clone, Serialize)]
pub struct RefreshRequest {
    pub refresh: String,
}

/// Response of `POST /auth/token/refresh/`. Only the access token rotates.
#[derive(Clone, Deserialize)]
pub struct RefreshResponse {
    pub access: String,
}

/// Response of `GET /auth/user-info/`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub user: User,
    #[serde(default)]
    pub profile: Option<serde_json::Value>,
}
