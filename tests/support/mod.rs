#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use aichat::auth::{Credentials, MemoryCredentialStorage, TokenStore};
use aichat::client::{ApiClient, Navigator, NoticeLog};
use aichat::config::ClientConfig;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use parking_lot::Mutex;
use serde_json::{json, Value};
use wiremock::MockServer;

/// Navigator that records every redirect.
pub struct RecordingNavigator {
    path: Mutex<String>,
    redirects: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn at(path: &str) -> Self {
        Self {
            path: Mutex::new(path.to_string()),
            redirects: Mutex::new(Vec::new()),
        }
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn current_path(&self) -> String {
        self.path.lock().clone()
    }

    fn redirect(&self, path: &str) {
        *self.path.lock() = path.to_string();
        self.redirects.lock().push(path.to_string());
    }
}

/// A client wired to a mock server with observable side channels.
pub struct Harness {
    pub client: ApiClient,
    pub tokens: Arc<TokenStore>,
    pub navigator: Arc<RecordingNavigator>,
    pub notices: Arc<NoticeLog>,
}

pub fn api_base(server: &MockServer) -> String {
    format!("{}/api", server.uri())
}

pub fn config(server: &MockServer) -> ClientConfig {
    ClientConfig::builder().api_base(api_base(server)).build()
}

pub fn store_with(access: Option<&str>, refresh: Option<&str>) -> Arc<TokenStore> {
    let storage = MemoryCredentialStorage::with_credentials(Credentials {
        access_token: access.map(str::to_string),
        refresh_token: refresh.map(str::to_string),
    });
    Arc::new(TokenStore::open(Arc::new(storage)).unwrap())
}

pub fn harness_with(config: ClientConfig, tokens: Arc<TokenStore>, location: &str) -> Harness {
    let navigator = Arc::new(RecordingNavigator::at(location));
    let notices = Arc::new(NoticeLog::new());
    let client = ApiClient::builder()
        .config(config)
        .tokens(tokens.clone())
        .navigator(navigator.clone())
        .notifier(notices.clone())
        .build()
        .unwrap();
    Harness {
        client,
        tokens,
        navigator,
        notices,
    }
}

/// Logged in as `A1`/`R`, looking at the chat view.
pub fn logged_in(server: &MockServer) -> Harness {
    harness_with(config(server), store_with(Some("A1"), Some("R")), "/chat")
}

pub fn anonymous(server: &MockServer) -> Harness {
    harness_with(config(server), store_with(None, None), "/login")
}

pub fn short_timeout(server: &MockServer, timeout: Duration) -> ClientConfig {
    ClientConfig::builder()
        .api_base(api_base(server))
        .request_timeout(timeout)
        .stream_timeout(timeout)
        .build()
}

pub fn user_json(id: i64, username: &str) -> Value {
    json!({
        "id": id,
        "username": username,
        "email": format!("{username}@example.com"),
        "first_name": "",
        "last_name": "",
        "date_joined": "2024-05-01T08:00:00Z"
    })
}

pub fn auth_json(username: &str, access: &str, refresh: &str) -> Value {
    json!({
        "message": "ok",
        "user": user_json(1, username),
        "access": access,
        "refresh": refresh
    })
}

/// Unsigned JWT with the given payload.
pub fn jwt(payload: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{header}.{body}.sig")
}

/// `Authorization` header values of every request the server saw, in order.
pub async fn authorization_headers(server: &MockServer) -> Vec<Option<String>> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .map(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        })
        .collect()
}
