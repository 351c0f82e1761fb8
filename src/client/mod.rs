//! Authenticated HTTP client.
//!
//! Every request is built with the access token read from the shared
//! [`TokenStore`] at send time. A `401` triggers at most one refresh per
//! original request: on success the request is resubmitted with the new
//! token, on failure the stored credentials are cleared, the user is told
//! and the application is sent to the login view.

pub mod http;
pub mod notify;
pub mod request;

pub use notify::{Navigator, Notice, NoticeLog, Notifier, TracingNotifier};
pub use request::PendingRequest;

use std::sync::Arc;
use std::time::Duration;

use bon::bon;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{AuthError, TokenStore};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::router::{Route, Router};
use crate::types::{RefreshRequest, RefreshResponse};

/// Dedicated, unauthenticated refresh endpoint.
pub const REFRESH_PATH: &str = "/auth/token/refresh/";
/// Endpoint class that waits on model inference and gets the longer timeout.
pub const CHAT_PATH: &str = "/chat/chat/";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully read, successful response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transport {
    /// Bounded by the endpoint-class timeout.
    Buffered,
    /// Unbounded at the transport; the caller arms its own cancellation.
    Streaming,
}

/// Client for the chat backend. Cheap to clone; clones share state.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use aichat::auth::TokenStore;
/// use aichat::client::ApiClient;
/// use aichat::config::ClientConfig;
///
/// # async fn example() -> aichat::error::Result<()> {
/// let tokens = Arc::new(TokenStore::in_memory());
/// let client = ApiClient::builder()
///     .config(ClientConfig::default())
///     .tokens(tokens)
///     .build()?;
/// let info: serde_json::Value = client.get("/auth/user-info/").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: reqwest::Client,
    config: ClientConfig,
    tokens: Arc<TokenStore>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    refresh_gate: tokio::sync::Mutex<()>,
}

#[bon]
impl ApiClient {
    /// Without a navigator, a private [`Router`] over the same token store
    /// tracks the location; without a notifier, notices go to `tracing`.
    #[builder]
    pub fn new(
        config: ClientConfig,
        tokens: Arc<TokenStore>,
        navigator: Option<Arc<dyn Navigator>>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .pool_max_idle_per_host(10)
            .build()?;
        let navigator =
            navigator.unwrap_or_else(|| Arc::new(Router::new(tokens.clone())) as Arc<dyn Navigator>);
        let notifier = notifier.unwrap_or_else(|| Arc::new(TracingNotifier) as Arc<dyn Notifier>);
        Ok(Self {
            inner: Arc::new(Inner {
                http,
                config,
                tokens,
                navigator,
                notifier,
                refresh_gate: tokio::sync::Mutex::new(()),
            }),
        })
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.inner.config)
            .field("tokens", &self.inner.tokens)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn tokens(&self) -> &Arc<TokenStore> {
        &self.inner.tokens
    }

    pub fn navigator(&self) -> &Arc<dyn Navigator> {
        &self.inner.navigator
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute(PendingRequest::get(path)).await?.json()
    }

    pub async fn post<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        self.execute(PendingRequest::post(path, body)?).await?.json()
    }

    pub async fn delete(&self, path: &str) -> Result<()> {
        self.execute(PendingRequest::delete(path)).await?;
        Ok(())
    }

    /// Send a request through the refresh protocol and read its body.
    pub async fn execute(&self, request: PendingRequest) -> Result<ApiResponse> {
        let timeout = self.timeout_for(&request);
        let response = self.dispatch(request, Transport::Buffered).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.fail(http::transport_error(e, timeout)))?;
        Ok(ApiResponse {
            status,
            body: body.to_vec(),
        })
    }

    /// Ask the refresh endpoint for a new access token and store it.
    ///
    /// The refresh token is left as it was. Failures have no side effects
    /// here; the recovery path and [`AuthSession`](crate::auth::AuthSession)
    /// decide what to clear.
    pub async fn refresh_access_token(&self) -> Result<String> {
        let refresh = self
            .inner
            .tokens
            .refresh_token()
            .ok_or(AuthError::MissingRefreshToken)?;
        let timeout = self.inner.config.request_timeout;

        debug!("requesting new access token");
        let response = self
            .inner
            .http
            .post(self.inner.config.url(REFRESH_PATH))
            .headers(http::request_headers(None))
            .timeout(timeout)
            .json(&RefreshRequest { refresh })
            .send()
            .await
            .map_err(|e| http::transport_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(http::status_to_error(status.as_u16(), &body));
        }
        let payload: RefreshResponse = response.json().await?;
        self.inner.tokens.set_access_token(payload.access.clone())?;
        info!("access token refreshed");
        Ok(payload.access)
    }

    /// Send `request`, absorbing one `401` through a refresh.
    ///
    /// Returns the successful response with its body unread.
    pub(crate) async fn dispatch(
        &self,
        mut request: PendingRequest,
        transport: Transport,
    ) -> Result<reqwest::Response> {
        loop {
            let sent_with = self.inner.tokens.authorization();
            let response = match self.send_once(&request, sent_with.as_deref(), transport).await {
                Ok(response) => response,
                Err(err) => return Err(self.fail(err)),
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let err = http::status_to_error(status.as_u16(), &body);
            if status != StatusCode::UNAUTHORIZED {
                return Err(self.fail(err));
            }
            if request.is_retried() {
                debug!(path = %request.path, "unauthorized after refresh");
                return Err(err);
            }

            // Marked before the refresh is issued so this request can never
            // start a second one.
            request.mark_retried();
            self.recover(sent_with.as_deref()).await?;
        }
    }

    async fn send_once(
        &self,
        request: &PendingRequest,
        authorization: Option<&str>,
        transport: Transport,
    ) -> Result<reqwest::Response> {
        let timeout = self.timeout_for(request);
        debug!(
            method = %request.method,
            path = %request.path,
            authenticated = authorization.is_some(),
            retried = request.is_retried(),
            "sending request"
        );

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), self.inner.config.url(&request.path))
            .headers(http::request_headers(authorization));
        if transport == Transport::Buffered {
            builder = builder.timeout(timeout);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder
            .send()
            .await
            .map_err(|e| http::transport_error(e, timeout))
    }

    /// One recovery cycle for a request rejected while sending the `stale` header.
    async fn recover(&self, stale: Option<&str>) -> Result<()> {
        let _gate = if self.inner.config.coalesce_refresh {
            let gate = self.inner.refresh_gate.lock().await;
            if let Some(current) = self.inner.tokens.authorization() {
                if stale != Some(current.as_str()) {
                    debug!("access token rotated while waiting; skipping refresh");
                    return Ok(());
                }
            }
            Some(gate)
        } else {
            None
        };

        if self.inner.tokens.refresh_token().is_none() {
            warn!("request unauthorized and no refresh token stored");
            self.expire_session();
            return Err(ClientError::SessionExpired(
                AuthError::MissingRefreshToken.to_string(),
            ));
        }

        match self.refresh_access_token().await {
            Ok(_) => Ok(()),
            Err(err) => {
                warn!(error = %err, "token refresh failed");
                self.expire_session();
                Err(ClientError::SessionExpired(err.to_string()))
            }
        }
    }

    /// Forget the credentials and send the user back to log in.
    fn expire_session(&self) {
        if let Err(err) = self.inner.tokens.clear() {
            warn!(error = %err, "failed to clear stored credentials");
        }
        let login = Route::Login.path();
        if self.inner.navigator.current_path() != login {
            self.inner.notifier.notify(Notice::SessionExpired);
            self.inner.navigator.redirect(login);
        }
    }

    /// Report a non-auth failure to the user and hand it back.
    fn fail(&self, err: ClientError) -> ClientError {
        if !matches!(err, ClientError::Unauthorized(_) | ClientError::SessionExpired(_)) {
            self.inner.notifier.notify(Notice::RequestFailed {
                status: err.status(),
                message: err.user_message(),
            });
        }
        err
    }

    fn timeout_for(&self, request: &PendingRequest) -> Duration {
        request.timeout.unwrap_or_else(|| {
            if request.path.starts_with(CHAT_PATH) {
                self.inner.config.chat_timeout
            } else {
                self.inner.config.request_timeout
            }
        })
    }
}
