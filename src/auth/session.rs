//! Account lifecycle on top of the authenticated client.

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::client::{ApiClient, PendingRequest};
use crate::error::{ClientError, Result};
use crate::types::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest, User, UserInfo};

use super::token::redact;

const LOGIN_PATH: &str = "/auth/login/";
const REGISTER_PATH: &str = "/auth/register/";
const LOGOUT_PATH: &str = "/auth/logout/";
const USER_INFO_PATH: &str = "/auth/user-info/";

/// The logged-in user and their credentials.
///
/// Tokens live in the client's [`TokenStore`](super::TokenStore); this type
/// adds the user record and the login/logout/validate flows.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use aichat::auth::{AuthSession, TokenStore};
/// use aichat::client::ApiClient;
/// use aichat::config::ClientConfig;
/// use aichat::types::LoginRequest;
///
/// # async fn example() -> aichat::error::Result<()> {
/// let client = ApiClient::builder()
///     .config(ClientConfig::from_env()?)
///     .tokens(Arc::new(TokenStore::in_memory()))
///     .build()?;
/// let session = AuthSession::new(client);
/// session.login(&LoginRequest::new("alice", "secret")).await?;
/// assert!(session.is_logged_in());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct AuthSession {
    client: ApiClient,
    user: RwLock<Option<User>>,
}

impl AuthSession {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            user: RwLock::new(None),
        }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn user(&self) -> Option<User> {
        self.user.read().clone()
    }

    /// Empty when no user record has been loaded.
    pub fn username(&self) -> String {
        self.user
            .read()
            .as_ref()
            .map(|user| user.username.clone())
            .unwrap_or_default()
    }

    /// Token presence, not validity. See [`is_token_valid`](Self::is_token_valid).
    pub fn is_logged_in(&self) -> bool {
        self.client.tokens().has_stored_token()
    }

    pub fn has_stored_token(&self) -> bool {
        self.client.tokens().has_stored_token()
    }

    pub async fn login(&self, credentials: &LoginRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self.client.post(LOGIN_PATH, credentials).await?;
        self.apply(&response)?;
        info!(username = %response.user.username, "logged in");
        Ok(response)
    }

    pub async fn register(&self, form: &RegisterRequest) -> Result<AuthResponse> {
        let response: AuthResponse = self.client.post(REGISTER_PATH, form).await?;
        self.apply(&response)?;
        info!(username = %response.user.username, "registered");
        Ok(response)
    }

    /// Tell the server to revoke the refresh token, then forget everything.
    ///
    /// A failed server call is logged and otherwise ignored.
    pub async fn logout(&self) -> Result<()> {
        if let Some(refresh) = self.client.tokens().refresh_token() {
            let request = PendingRequest::post(LOGOUT_PATH, &RefreshRequest { refresh })?;
            if let Err(err) = self.client.execute(request).await {
                warn!(error = %err, "logout request failed");
            }
        }
        self.clear()?;
        info!("logged out");
        Ok(())
    }

    pub async fn fetch_user_info(&self) -> Result<UserInfo> {
        let info: UserInfo = self.client.get(USER_INFO_PATH).await?;
        *self.user.write() = Some(info.user.clone());
        Ok(info)
    }

    /// Explicit refresh. Any failure clears the session.
    pub async fn refresh_access_token(&self) -> Result<String> {
        match self.client.refresh_access_token().await {
            Ok(access) => Ok(access),
            Err(err) => {
                warn!(error = %err, "explicit token refresh failed");
                self.clear()?;
                Err(ClientError::SessionExpired(err.to_string()))
            }
        }
    }

    /// Ask the server whether the stored token is still accepted.
    ///
    /// An authentication rejection clears the session; any other failure
    /// leaves it alone. Both report `false`.
    pub async fn is_token_valid(&self) -> bool {
        if !self.has_stored_token() {
            return false;
        }
        match self.fetch_user_info().await {
            Ok(info) => {
                debug!(username = %info.user.username, "token accepted");
                true
            }
            Err(err) if err.requires_login() => {
                debug!(error = %err, "token rejected");
                if let Err(err) = self.clear() {
                    warn!(error = %err, "failed to clear session");
                }
                false
            }
            Err(err) => {
                debug!(error = %err, "token check failed");
                false
            }
        }
    }

    /// Startup check; reports what was loaded from storage.
    pub fn init(&self) {
        match self.client.tokens().access_token() {
            Some(token) => info!(token = %redact(&token), "restored access token"),
            None => info!("no stored access token"),
        }
    }

    fn apply(&self, response: &AuthResponse) -> Result<()> {
        self.client
            .tokens()
            .set(response.access.clone(), response.refresh.clone())?;
        *self.user.write() = Some(response.user.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.user.write() = None;
        self.client.tokens().clear()?;
        Ok(())
    }
}
